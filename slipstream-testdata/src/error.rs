// Slipstream Testdata - Error types
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for waveform generation.

use thiserror::Error;

/// Result type for waveform generation.
pub type Result<T> = std::result::Result<T, WaveformError>;

/// Errors in a waveform configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WaveformError {
    /// Sampling rate must be positive.
    #[error("Sampling rate must be greater than zero")]
    InvalidSamplingRate,

    /// At least one sample must be generated.
    #[error("Sample count must be greater than zero")]
    NoSamples,

    /// Frequency is not a finite number.
    #[error("Invalid frequency: {0}")]
    InvalidFrequency(f64),

    /// Noise amplitude is negative or not finite.
    #[error("Invalid noise amplitude: {0}")]
    InvalidNoise(f64),

    /// Timestamps of the generated samples would exceed `u64::MAX`.
    #[error("{samples} samples starting at timestamp {start} overflow u64")]
    TimestampOverflow { start: u64, samples: usize },
}
