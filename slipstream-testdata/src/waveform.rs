// Slipstream Testdata - Three-phase waveform generator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Three-phase current and voltage waveforms.
//!
//! A generated buffer always has eight channels:
//!
//! | channel | content          |
//! |---------|------------------|
//! | 0..3    | Ia, Ib, Ic       |
//! | 3       | In = Ia + Ib + Ic |
//! | 4..7    | Va, Vb, Vc       |
//! | 7       | Vn = Va + Vb + Vc |
//!
//! Each phase value is `trunc(scale * (magnitude * sin(2π·f·t + phase) + noise))`
//! with `t = s / sampling_rate`.

use std::f64::consts::TAU;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Normal, Uniform};
use serde::{Deserialize, Serialize};
use slipstream::SampleBuffer;

use crate::error::{Result, WaveformError};

/// Channels in a generated buffer
pub const CHANNELS: usize = 8;

/// Nominal system frequency in Hz
pub const FNOM: f64 = 50.01;

/// Current integer scaling (mA resolution)
pub const CURRENT_SCALE: f64 = 1000.0;

/// Peak phase current in A
pub const CURRENT_MAGNITUDE: f64 = 500.0;

/// Voltage integer scaling (10 mV resolution)
pub const VOLTAGE_SCALE: f64 = 100.0;

/// Peak phase voltage of a 400 kV system: 400000 / √3 · √2
pub const VOLTAGE_MAGNITUDE: f64 = 326_598.63;

/// Default noise amplitude, in measurement units before scaling
pub const NOISE_MAX: f64 = 0.01;

/// Phase offsets of A, B and C
pub const PHASES: [f64; 3] = [0.0, -TAU / 3.0, TAU / 3.0];

/// Quality word set on channel 0 at sample 2 by [`ThreePhaseConfig::with_quality_change`]
pub const QUALITY_DERIVED: u32 = 0x01;

/// Quality word set on channel 0 at sample 3 by [`ThreePhaseConfig::with_quality_change`]
pub const QUALITY_INVALID: u32 = 0x41;

/// Measured quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    /// Phase current
    Current,
    /// Phase-to-neutral voltage
    Voltage,
}

impl Quantity {
    /// Integer scaling applied before truncation
    pub fn scale(self) -> f64 {
        match self {
            Quantity::Current => CURRENT_SCALE,
            Quantity::Voltage => VOLTAGE_SCALE,
        }
    }

    /// Peak amplitude
    pub fn magnitude(self) -> f64 {
        match self {
            Quantity::Current => CURRENT_MAGNITUDE,
            Quantity::Voltage => VOLTAGE_MAGNITUDE,
        }
    }

    /// First channel of this quantity's group
    pub fn first_channel(self) -> usize {
        match self {
            Quantity::Current => 0,
            Quantity::Voltage => 4,
        }
    }
}

/// Distribution of the additive measurement noise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseModel {
    /// Uniform in `[-amplitude, +amplitude]`
    #[default]
    Uniform,
    /// Normal with standard deviation `amplitude`
    Gaussian,
}

/// Waveform generator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreePhaseConfig {
    /// Samples per second.
    pub sampling_rate: u32,
    /// Number of samples to generate.
    pub samples: usize,
    /// System frequency in Hz.
    pub frequency: f64,
    /// Noise amplitude before scaling.
    pub noise_amplitude: f64,
    /// Noise distribution.
    pub noise_model: NoiseModel,
    /// Random seed.
    pub seed: u64,
    /// Timestamp of the first sample.
    pub start_timestamp: u64,
    /// Impair channel 0 at samples 2 and 3.
    pub quality_change: bool,
}

impl Default for ThreePhaseConfig {
    fn default() -> Self {
        Self {
            sampling_rate: 4000,
            samples: 4000,
            frequency: FNOM,
            noise_amplitude: NOISE_MAX,
            noise_model: NoiseModel::Uniform,
            seed: 0,
            start_timestamp: 0,
            quality_change: false,
        }
    }
}

impl ThreePhaseConfig {
    /// Create a new generator config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set sampling rate.
    pub fn with_sampling_rate(mut self, sampling_rate: u32) -> Self {
        self.sampling_rate = sampling_rate;
        self
    }

    /// Set number of samples.
    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    /// Set system frequency.
    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = frequency;
        self
    }

    /// Set noise amplitude.
    pub fn with_noise_amplitude(mut self, amplitude: f64) -> Self {
        self.noise_amplitude = amplitude;
        self
    }

    /// Set noise distribution.
    pub fn with_noise_model(mut self, model: NoiseModel) -> Self {
        self.noise_model = model;
        self
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the first timestamp.
    pub fn with_start_timestamp(mut self, timestamp: u64) -> Self {
        self.start_timestamp = timestamp;
        self
    }

    /// Enable or disable the quality change on channel 0.
    pub fn with_quality_change(mut self, enabled: bool) -> Self {
        self.quality_change = enabled;
        self
    }

    /// Check the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.sampling_rate == 0 {
            return Err(WaveformError::InvalidSamplingRate);
        }
        if self.samples == 0 {
            return Err(WaveformError::NoSamples);
        }
        if !self.frequency.is_finite() {
            return Err(WaveformError::InvalidFrequency(self.frequency));
        }
        // The uniform model samples from a range 2a wide
        let amplitude = self.noise_amplitude;
        if !(2.0 * amplitude).is_finite() || amplitude < 0.0 {
            return Err(WaveformError::InvalidNoise(amplitude));
        }
        if self
            .start_timestamp
            .checked_add(self.samples as u64 - 1)
            .is_none()
        {
            return Err(WaveformError::TimestampOverflow {
                start: self.start_timestamp,
                samples: self.samples,
            });
        }
        Ok(())
    }

    /// Generate the waveform buffer.
    pub fn generate(&self) -> Result<SampleBuffer> {
        self.validate()?;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let noise = Noise::new(self.noise_model, self.noise_amplitude)?;
        let mut buffer = SampleBuffer::allocate(CHANNELS, self.samples);

        for s in 0..self.samples {
            let t = s as f64 / self.sampling_rate as f64;
            buffer.set_timestamp(s, self.start_timestamp + s as u64);

            let values = buffer.values_mut(s);
            for quantity in [Quantity::Current, Quantity::Voltage] {
                let first = quantity.first_channel();
                let mut sum = 0i32;
                for (p, &phase) in PHASES.iter().enumerate() {
                    let value = phase_value(quantity, self.frequency, t, phase, noise.sample(&mut rng));
                    values[first + p] = value;
                    sum = sum.wrapping_add(value);
                }
                values[first + 3] = sum;
            }
        }

        if self.quality_change {
            for (s, quality) in [(2, QUALITY_DERIVED), (3, QUALITY_INVALID)] {
                if s < self.samples {
                    buffer.qualities_mut(s)[0] = quality;
                }
            }
        }

        Ok(buffer)
    }
}

/// Scaled, truncated value of one phase at time `t`
pub fn phase_value(quantity: Quantity, frequency: f64, t: f64, phase: f64, noise: f64) -> i32 {
    let analog = quantity.magnitude() * (TAU * frequency * t + phase).sin() + noise;
    (quantity.scale() * analog) as i32
}

/// Generate an eight-channel three-phase buffer with the reference constants.
pub fn generate_three_phase(
    sampling_rate: u32,
    samples_per_message: usize,
    noise_amplitude: f64,
    seed: u64,
) -> Result<SampleBuffer> {
    ThreePhaseConfig::new()
        .with_sampling_rate(sampling_rate)
        .with_samples(samples_per_message)
        .with_noise_amplitude(noise_amplitude)
        .with_seed(seed)
        .generate()
}

enum Noise {
    Silent,
    Uniform(Uniform<f64>),
    Gaussian(Normal<f64>),
}

impl Noise {
    fn new(model: NoiseModel, amplitude: f64) -> Result<Self> {
        if amplitude == 0.0 {
            return Ok(Noise::Silent);
        }
        Ok(match model {
            NoiseModel::Uniform => Noise::Uniform(Uniform::new_inclusive(-amplitude, amplitude)),
            NoiseModel::Gaussian => Noise::Gaussian(
                Normal::new(0.0, amplitude).map_err(|_| WaveformError::InvalidNoise(amplitude))?,
            ),
        })
    }

    fn sample(&self, rng: &mut StdRng) -> f64 {
        match self {
            Noise::Silent => 0.0,
            Noise::Uniform(d) => d.sample(rng),
            Noise::Gaussian(d) => d.sample(rng),
        }
    }
}
