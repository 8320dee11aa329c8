// Slipstream Harness - Phase timing
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Wall-clock marks for the phases of one run.

use std::time::{Duration, Instant};

/// Timestamps of the phases of one run
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseTimer {
    start: Option<Instant>,
    encode_end: Option<Instant>,
    decode_start: Option<Instant>,
    decode_end: Option<Instant>,
    processed_end: Option<Instant>,
    end: Option<Instant>,
}

/// Durations derived from a [`PhaseTimer`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Timings {
    /// Start to end of the run
    pub total: Option<Duration>,
    /// Start to end of encoding
    pub encode: Option<Duration>,
    /// Decode call alone
    pub decode: Option<Duration>,
    /// Decode plus output retrieval and validation
    pub decode_with_processing: Option<Duration>,
}

impl PhaseTimer {
    /// Create a timer with no marks
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the start of the run
    pub fn mark_start(&mut self) {
        self.start = Some(Instant::now());
    }

    /// Mark the end of encoding
    pub fn mark_encode_end(&mut self) {
        self.encode_end = Some(Instant::now());
    }

    /// Mark the start of decoding
    pub fn mark_decode_start(&mut self) {
        self.decode_start = Some(Instant::now());
    }

    /// Mark the end of decoding
    pub fn mark_decode_end(&mut self) {
        self.decode_end = Some(Instant::now());
    }

    /// Mark the end of output retrieval and validation
    pub fn mark_processed_end(&mut self) {
        self.processed_end = Some(Instant::now());
    }

    /// Mark the end of the run
    pub fn mark_end(&mut self) {
        self.end = Some(Instant::now());
    }

    /// Total run time
    pub fn total(&self) -> Option<Duration> {
        between(self.start, self.end)
    }

    /// Encoding time, measured from the start of the run
    pub fn encode(&self) -> Option<Duration> {
        between(self.start, self.encode_end)
    }

    /// Decode call time
    pub fn decode(&self) -> Option<Duration> {
        between(self.decode_start, self.decode_end)
    }

    /// Decode time including output retrieval and validation
    pub fn decode_with_processing(&self) -> Option<Duration> {
        between(self.decode_start, self.processed_end)
    }

    /// All derived durations
    pub fn timings(&self) -> Timings {
        Timings {
            total: self.total(),
            encode: self.encode(),
            decode: self.decode(),
            decode_with_processing: self.decode_with_processing(),
        }
    }
}

fn between(from: Option<Instant>, to: Option<Instant>) -> Option<Duration> {
    Some(to?.saturating_duration_since(from?))
}
