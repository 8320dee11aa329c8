// Slipstream Harness - Run reports
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Textual report of one harness run.

use std::fmt;
use std::time::Duration;

use slipstream::StreamId;

use crate::timing::Timings;
use crate::validate::Mismatch;

/// How samples were submitted to the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Whole buffer in one call
    Bulk,
    /// One sample per call
    Incremental,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Bulk => write!(f, "perform encoding of all samples"),
            RunMode::Incremental => write!(f, "perform iterative encoding of samples"),
        }
    }
}

/// Outcome of one run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Submission mode
    pub mode: RunMode,
    /// Stream identity used
    pub stream_id: StreamId,
    /// Samples covered by the encoded message
    pub samples_encoded: usize,
    /// Encoded message length in bytes (0 if no message completed)
    pub encoded_length: usize,
    /// Encoded size over raw size, see [`slipstream::compression_ratio`]
    pub compression_ratio: f64,
    /// Whether the message decoded
    pub decoded: bool,
    /// Differences found by validation
    pub mismatches: Vec<Mismatch>,
    /// Phase durations
    pub timings: Timings,
}

impl RunReport {
    /// Decoded with no mismatches
    pub fn passed(&self) -> bool {
        self.decoded && self.mismatches.is_empty()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "samples encoded: {}, length: {} bytes",
            self.samples_encoded, self.encoded_length
        )?;
        writeln!(
            f,
            "compression efficiency: {:.2}% of original size",
            self.compression_ratio * 100.0
        )?;
        if self.decoded {
            writeln!(f, "decoding successful")?;
        } else {
            writeln!(f, "decoding not successful")?;
        }
        if !self.mismatches.is_empty() {
            writeln!(f, "mismatches: {}", self.mismatches.len())?;
        }
        writeln!(f)?;

        writeln!(f, "total duration:\t\t{}", millis(self.timings.total))?;
        writeln!(f, "encode:\t\t\t{}", millis(self.timings.encode))?;
        writeln!(f, "decode:\t\t\t{}", millis(self.timings.decode))?;
        write!(
            f,
            "decode with processing:\t{}",
            millis(self.timings.decode_with_processing)
        )
    }
}

fn millis(duration: Option<Duration>) -> String {
    match duration {
        Some(d) => format!("{:.2} ms", d.as_secs_f64() * 1000.0),
        None => "n/a".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::Field;

    fn report(decoded: bool) -> RunReport {
        RunReport {
            mode: RunMode::Bulk,
            stream_id: StreamId::nil(),
            samples_encoded: 4000,
            encoded_length: 51_200,
            compression_ratio: 0.1,
            decoded,
            mismatches: Vec::new(),
            timings: Timings {
                total: Some(Duration::from_micros(2500)),
                encode: Some(Duration::from_millis(1)),
                decode: None,
                decode_with_processing: None,
            },
        }
    }

    #[test]
    fn test_display_success() {
        let text = report(true).to_string();
        assert!(text.contains("samples encoded: 4000, length: 51200 bytes"));
        assert!(text.contains("compression efficiency: 10.00% of original size"));
        assert!(text.contains("decoding successful"));
        assert!(text.contains("total duration:\t\t2.50 ms"));
        assert!(text.contains("decode:\t\t\tn/a"));
    }

    #[test]
    fn test_display_failure() {
        let r = report(false);
        assert!(r.to_string().contains("decoding not successful"));
        assert!(!r.passed());
    }

    #[test]
    fn test_mismatches_fail_run() {
        let mut r = report(true);
        assert!(r.passed());
        r.mismatches.push(Mismatch {
            sample: 0,
            channel: 0,
            field: Field::Value,
            expected: 1,
            actual: 2,
        });
        assert!(!r.passed());
        assert!(r.to_string().contains("mismatches: 1"));
    }

    #[test]
    fn test_mode_headings() {
        assert_eq!(RunMode::Bulk.to_string(), "perform encoding of all samples");
        assert_eq!(
            RunMode::Incremental.to_string(),
            "perform iterative encoding of samples"
        );
    }
}
