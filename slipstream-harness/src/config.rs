// Slipstream Harness - Configuration
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Harness configuration.
//!
//! Defaults reproduce the reference fixture: eight channels at 4000 Hz,
//! 4000 samples per message, noise amplitude 0.01, the bulk run on identity
//! `00…00` and the incremental run on `02 01 00…00 05`. A JSON file named
//! by [`CONFIG_ENV`] overrides any subset of the fields.

use std::path::Path;

use serde::{Deserialize, Serialize};
use slipstream::{CodecOptions, StreamConfig, StreamId};
use slipstream_testdata::{ThreePhaseConfig, CHANNELS};

use crate::error::{HarnessError, Result};

/// Environment variable naming a JSON config file
pub const CONFIG_ENV: &str = "SLIPSTREAM_HARNESS_CONFIG";

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Waveform parameters; `samples` is the message length
    pub waveform: ThreePhaseConfig,
    /// Identity of the bulk run, 32 hex digits
    pub bulk_id: String,
    /// Identity of the incremental run, 32 hex digits
    pub incremental_id: String,
    /// Delta layers override
    pub delta_layers: Option<usize>,
    /// Use XOR deltas
    pub xor: bool,
    /// Per-channel spatial reference; empty disables spatial residuals
    pub spatial_refs: Vec<Option<usize>>,
    /// Log level used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            waveform: ThreePhaseConfig::default(),
            bulk_id: StreamId::nil().to_string(),
            incremental_id: "02010000000000000000000000000005".to_string(),
            delta_layers: None,
            xor: false,
            spatial_refs: Vec::new(),
            log_level: "info".to_string(),
        }
    }
}

impl HarnessConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the file named by [`CONFIG_ENV`], or use defaults when unset
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Set the waveform parameters
    pub fn with_waveform(mut self, waveform: ThreePhaseConfig) -> Self {
        self.waveform = waveform;
        self
    }

    /// Set both stream identities
    pub fn with_ids(mut self, bulk: StreamId, incremental: StreamId) -> Self {
        self.bulk_id = bulk.to_string();
        self.incremental_id = incremental.to_string();
        self
    }

    /// Check every field can be used
    pub fn validate(&self) -> Result<()> {
        self.waveform.validate()?;
        let stream = self.stream_config()?;
        self.codec_options()
            .validate(&stream)
            .map_err(|e| HarnessError::Codec(e.into()))?;
        self.bulk_stream_id()?;
        self.incremental_stream_id()?;
        Ok(())
    }

    /// Stream configuration shared by both runs
    pub fn stream_config(&self) -> Result<StreamConfig> {
        StreamConfig::new(CHANNELS, self.waveform.sampling_rate, self.waveform.samples)
            .map_err(|e| HarnessError::Codec(e.into()))
    }

    /// Codec options shared by both runs
    pub fn codec_options(&self) -> CodecOptions {
        let mut options = CodecOptions::new().with_xor(self.xor);
        if let Some(layers) = self.delta_layers {
            options = options.with_delta_layers(layers);
        }
        options.with_refs(self.spatial_refs.clone())
    }

    /// Identity of the bulk run
    pub fn bulk_stream_id(&self) -> Result<StreamId> {
        parse_id("bulk_id", &self.bulk_id)
    }

    /// Identity of the incremental run
    pub fn incremental_stream_id(&self) -> Result<StreamId> {
        parse_id("incremental_id", &self.incremental_id)
    }
}

fn parse_id(field: &str, value: &str) -> Result<StreamId> {
    value
        .parse()
        .map_err(|e| HarnessError::InvalidConfig(format!("{} '{}': {}", field, value, e)))
}
