//! Protocol definitions for Slipstream
//!
//! This module defines the core types shared by the encoder and decoder:
//! - Stream identity and configuration
//! - Codec options (delta layers, XOR deltas, spatial references)
//! - The owned encoded message
//! - Wire format constants

use crate::error::ConfigError;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

/// Size of a stream identity in bytes
pub const STREAM_ID_SIZE: usize = 16;

/// Fixed part of the message header: stream ID + first timestamp
pub const HEADER_PREFIX_SIZE: usize = STREAM_ID_SIZE + 8;

/// Upper bound of the header including the sample count varint
pub const MAX_HEADER_SIZE: usize = 36;

/// Messages with more samples than this per message pack values with simple-8b
pub const SIMPLE8B_THRESHOLD_SAMPLES: usize = 16;

/// Messages with more encoded samples than this gzip their payload
pub const GZIP_THRESHOLD_SAMPLES: usize = 4096;

/// Default number of delta encoding layers. 0 disables delta encoding.
pub const DEFAULT_DELTA_LAYERS: usize = 3;

/// Delta encoding layers for high sampling rate streams. Kept equal to
/// [`DEFAULT_DELTA_LAYERS`] so existing streams decode unchanged; raise it
/// here to give high-rate streams deeper deltas.
pub const HIGH_DELTA_LAYERS: usize = 3;

/// Sampling rate above which [`HIGH_DELTA_LAYERS`] applies
pub const HIGH_SAMPLING_RATE: u32 = 100_000;

/// Number of delta layers used for a given sampling rate
pub fn delta_layers_for(sampling_rate: u32) -> usize {
    if sampling_rate > HIGH_SAMPLING_RATE {
        HIGH_DELTA_LAYERS
    } else {
        DEFAULT_DELTA_LAYERS
    }
}

/// 16-byte identity naming one encoder and one decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StreamId([u8; STREAM_ID_SIZE]);

impl StreamId {
    /// Identity of 16 zero bytes
    pub const fn nil() -> Self {
        Self([0; STREAM_ID_SIZE])
    }

    /// Wrap raw identity bytes
    pub const fn from_bytes(bytes: [u8; STREAM_ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Build an identity from a slice, which must be exactly 16 bytes long
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; STREAM_ID_SIZE] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Raw identity bytes
    pub fn as_bytes(&self) -> &[u8; STREAM_ID_SIZE] {
        &self.0
    }
}

impl From<[u8; STREAM_ID_SIZE]> for StreamId {
    fn from(bytes: [u8; STREAM_ID_SIZE]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for StreamId {
    type Err = hex::FromHexError;

    /// Parse 32 hex digits
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut bytes = [0u8; STREAM_ID_SIZE];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

/// Per-stream parameters, fixed when a session is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamConfig {
    /// Values per sample
    pub channel_count: usize,
    /// Samples per second
    pub sampling_rate: u32,
    /// Samples that make up one message
    pub samples_per_message: usize,
}

impl StreamConfig {
    /// Create a validated configuration
    pub fn new(
        channel_count: usize,
        sampling_rate: u32,
        samples_per_message: usize,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            channel_count,
            sampling_rate,
            samples_per_message,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration can be encoded
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_count == 0 {
            return Err(ConfigError::NoChannels);
        }
        if self.samples_per_message == 0 {
            return Err(ConfigError::EmptyMessage);
        }
        if self.samples_per_message > i32::MAX as usize {
            return Err(ConfigError::MessageTooLarge(self.samples_per_message));
        }
        Ok(())
    }

    /// Whether sample data is packed with simple-8b
    pub fn uses_simple8b(&self) -> bool {
        self.samples_per_message > SIMPLE8B_THRESHOLD_SAMPLES
    }

    /// Size of one message before encoding, see [`crate::metrics::BYTES_PER_RAW_VALUE`]
    pub fn raw_message_size(&self) -> usize {
        self.channel_count * crate::metrics::BYTES_PER_RAW_VALUE * self.samples_per_message
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            channel_count: 8,
            sampling_rate: 4000,
            samples_per_message: 4000,
        }
    }
}

/// Tuning shared by an encoder and its matching decoder
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodecOptions {
    /// Delta layers; `None` picks [`delta_layers_for`] the sampling rate
    pub delta_layers: Option<usize>,
    /// Use XOR instead of arithmetic differences
    pub xor: bool,
    /// Per-channel reference channel for spatial residuals (empty = none)
    pub spatial_refs: Vec<Option<usize>>,
}

impl CodecOptions {
    /// Create default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an explicit number of delta layers
    pub fn with_delta_layers(mut self, layers: usize) -> Self {
        self.delta_layers = Some(layers);
        self
    }

    /// Use XOR deltas
    pub fn with_xor(mut self, xor: bool) -> Self {
        self.xor = xor;
        self
    }

    /// Map adjacent three-phase groups onto each other.
    ///
    /// Channels are laid out as `count_v` voltage groups followed by
    /// `count_i` current groups, each group 3 phases wide (4 with neutral).
    /// Every group except the first of its kind references the same phase of
    /// the preceding group.
    pub fn with_spatial_refs(
        mut self,
        count: usize,
        count_v: usize,
        count_i: usize,
        include_neutral: bool,
    ) -> Self {
        let group = if include_neutral { 4 } else { 3 };
        self.spatial_refs = (0..count)
            .map(|i| {
                let in_voltages = i >= group && i < count_v * group;
                let in_currents = i >= (count_v + 1) * group && i < (count_v + count_i) * group;
                (in_voltages || in_currents).then(|| i - group)
            })
            .collect();
        self
    }

    /// Set explicit spatial references
    pub fn with_refs(mut self, refs: Vec<Option<usize>>) -> Self {
        self.spatial_refs = refs;
        self
    }

    /// Resolve the delta layer count for a stream
    pub fn layers(&self, config: &StreamConfig) -> usize {
        self.delta_layers
            .unwrap_or_else(|| delta_layers_for(config.sampling_rate))
    }

    /// Spatial reference of `channel`, if any
    pub fn spatial_ref(&self, channel: usize) -> Option<usize> {
        self.spatial_refs.get(channel).copied().flatten()
    }

    /// References must point at an earlier channel so decoding can run in order
    pub fn validate(&self, config: &StreamConfig) -> Result<(), ConfigError> {
        for (channel, reference) in self.spatial_refs.iter().enumerate() {
            if let Some(reference) = *reference {
                if reference >= channel || channel >= config.channel_count {
                    return Err(ConfigError::InvalidSpatialRef { channel, reference });
                }
            }
        }
        Ok(())
    }
}

/// A complete encoded message, owned by whoever holds it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedMessage(Vec<u8>);

impl EncodedMessage {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Encoded length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the message is empty (never true for codec output)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the encoded bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Take ownership of the encoded bytes
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl Deref for EncodedMessage {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for EncodedMessage {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
