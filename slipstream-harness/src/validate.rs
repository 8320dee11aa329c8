// Slipstream Harness - Round-trip validation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Sample-by-sample comparison of an original buffer with its decoded copy.
//!
//! [`compare`] never stops at the first difference: every sample and channel
//! in the region both buffers share is checked, and a shape difference is
//! reported alongside the content differences.

use std::fmt;

use slipstream::SampleBuffer;

/// Compared field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Sample timestamp
    Timestamp,
    /// Channel value
    Value,
    /// Channel quality word
    Quality,
    /// Number of samples in the buffer
    SampleCount,
    /// Number of channels per sample
    ChannelCount,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Timestamp => "timestamp",
            Field::Value => "value",
            Field::Quality => "quality",
            Field::SampleCount => "sample count",
            Field::ChannelCount => "channel count",
        };
        f.write_str(name)
    }
}

/// One difference between original and decoded data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    /// Sample index (0 for shape mismatches)
    pub sample: usize,
    /// Channel index (0 for timestamp and shape mismatches)
    pub channel: usize,
    /// Which field differs
    pub field: Field,
    /// Original value
    pub expected: i64,
    /// Decoded value
    pub actual: i64,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "decode mismatch: sample {}, channel {}, {}: expected {}, got {}",
            self.sample, self.channel, self.field, self.expected, self.actual
        )
    }
}

/// Compare `original` with `decoded`, returning every difference found.
pub fn compare(original: &SampleBuffer, decoded: &SampleBuffer) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();

    if original.len() != decoded.len() {
        mismatches.push(shape(Field::SampleCount, original.len(), decoded.len()));
    }
    if original.channel_count() != decoded.channel_count() {
        mismatches.push(shape(
            Field::ChannelCount,
            original.channel_count(),
            decoded.channel_count(),
        ));
    }

    let samples = original.len().min(decoded.len());
    let channels = original.channel_count().min(decoded.channel_count());

    for s in 0..samples {
        let (expected_ts, actual_ts) = (original.timestamp(s), decoded.timestamp(s));
        if expected_ts != actual_ts {
            mismatches.push(Mismatch {
                sample: s,
                channel: 0,
                field: Field::Timestamp,
                expected: expected_ts as i64,
                actual: actual_ts as i64,
            });
        }

        for i in 0..channels {
            let (expected, actual) = (original.value(s, i), decoded.value(s, i));
            if expected != actual {
                mismatches.push(Mismatch {
                    sample: s,
                    channel: i,
                    field: Field::Value,
                    expected: expected as i64,
                    actual: actual as i64,
                });
            }

            let (expected, actual) = (original.quality(s, i), decoded.quality(s, i));
            if expected != actual {
                mismatches.push(Mismatch {
                    sample: s,
                    channel: i,
                    field: Field::Quality,
                    expected: expected as i64,
                    actual: actual as i64,
                });
            }
        }
    }

    mismatches
}

fn shape(field: Field, expected: usize, actual: usize) -> Mismatch {
    Mismatch {
        sample: 0,
        channel: 0,
        field,
        expected: expected as i64,
        actual: actual as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_buffers() {
        let a = SampleBuffer::allocate(8, 100);
        assert!(compare(&a, &a.clone()).is_empty());
    }

    #[test]
    fn test_collects_every_difference() {
        let original = SampleBuffer::allocate(2, 4);
        let mut decoded = original.clone();
        decoded.values_mut(1)[0] = 5;
        decoded.values_mut(3)[1] = -5;
        decoded.qualities_mut(2)[1] = 0x41;
        decoded.set_timestamp(0, 99);

        let mismatches = compare(&original, &decoded);
        assert_eq!(mismatches.len(), 4);
        assert_eq!(
            mismatches[0],
            Mismatch {
                sample: 0,
                channel: 0,
                field: Field::Timestamp,
                expected: 0,
                actual: 99
            }
        );
        assert_eq!(mismatches[1].field, Field::Value);
        assert_eq!(mismatches[1].sample, 1);
        assert_eq!(mismatches[2].field, Field::Quality);
        assert_eq!(mismatches[2].actual, 0x41);
        assert_eq!(mismatches[3].actual, -5);
    }

    #[test]
    fn test_shape_difference_still_compares_overlap() {
        let original = SampleBuffer::allocate(3, 5);
        let mut decoded = SampleBuffer::allocate(2, 4);
        decoded.values_mut(0)[1] = 1;

        let mismatches = compare(&original, &decoded);
        let fields: Vec<Field> = mismatches.iter().map(|m| m.field).collect();
        assert_eq!(
            fields,
            vec![Field::SampleCount, Field::ChannelCount, Field::Value]
        );
        assert_eq!(mismatches[0].expected, 5);
        assert_eq!(mismatches[0].actual, 4);
    }

    #[test]
    fn test_mismatch_display() {
        let m = Mismatch {
            sample: 3,
            channel: 7,
            field: Field::Value,
            expected: 10,
            actual: 11,
        };
        assert_eq!(
            m.to_string(),
            "decode mismatch: sample 3, channel 7, value: expected 10, got 11"
        );
    }
}
