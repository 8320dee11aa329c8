// Slipstream Testdata - Deterministic waveform generator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # Slipstream Testdata
//!
//! Deterministic three-phase power-system waveforms for exercising the
//! Slipstream codec.
//!
//! - **Eight channels**: three phase currents, their sum, three phase
//!   voltages, their sum
//! - **Seeded noise**: identical seeds produce identical buffers
//! - **Quality impairments**: optional quality changes on channel 0
//!
//! ## Quick Start
//!
//! ```rust
//! use slipstream_testdata::{generate_three_phase, ThreePhaseConfig, NOISE_MAX};
//!
//! // The reference fixture: 4000 samples at 4000 Hz
//! let buffer = generate_three_phase(4000, 4000, NOISE_MAX, 0).unwrap();
//! assert_eq!(buffer.channel_count(), 8);
//!
//! // Or with the builder
//! let buffer = ThreePhaseConfig::new()
//!     .with_samples(100)
//!     .with_quality_change(true)
//!     .generate()
//!     .unwrap();
//! assert_eq!(buffer.quality(3, 0), 0x41);
//! ```

pub mod error;
pub mod waveform;

// Re-exports for convenience
pub use error::{Result, WaveformError};
pub use waveform::{
    generate_three_phase, phase_value, NoiseModel, Quantity, ThreePhaseConfig, CHANNELS, FNOM,
    NOISE_MAX,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
