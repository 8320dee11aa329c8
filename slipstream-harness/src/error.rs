// Slipstream Harness - Error types
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for the harness.

use thiserror::Error;

/// Result type for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Harness errors.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Codec rejected an operation outside the decode step.
    #[error("Codec error: {0}")]
    Codec(#[from] slipstream::SlipstreamError),

    /// Waveform generation failed.
    #[error("Waveform error: {0}")]
    Waveform(#[from] slipstream_testdata::WaveformError),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Config file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
