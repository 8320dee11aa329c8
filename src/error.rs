//! Error types for Slipstream
//!
//! This module defines all error types used throughout the codec.

use crate::protocol::StreamId;
use thiserror::Error;

/// Result type alias for Slipstream operations
pub type Result<T> = std::result::Result<T, SlipstreamError>;

/// Main error type for Slipstream operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SlipstreamError {
    /// Encoding error
    #[error("Encoding error: {0}")]
    Encode(#[from] EncodeError),

    /// Decoding error
    #[error("Decoding error: {0}")]
    Decode(#[from] DecodeError),

    /// Session registry error
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Invalid stream configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors in a stream configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A stream needs at least one channel
    #[error("Channel count must be at least 1")]
    NoChannels,

    /// A message needs at least one sample
    #[error("Samples per message must be at least 1")]
    EmptyMessage,

    /// Message size does not fit the wire format
    #[error("Samples per message {0} exceeds the maximum {max}", max = i32::MAX)]
    MessageTooLarge(usize),

    /// Spatial reference points at itself or a later channel
    #[error("Invalid spatial reference: channel {channel} -> {reference}")]
    InvalidSpatialRef { channel: usize, reference: usize },
}

/// Errors during encoding
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Sample width differs from the stream configuration
    #[error("Channel count mismatch: stream has {expected}, sample has {actual}")]
    ChannelCount { expected: usize, actual: usize },

    /// Values and qualities have different lengths
    #[error("Sample has {values} values but {qualities} qualities")]
    RaggedSample { values: usize, qualities: usize },

    /// Buffer holds more samples than the pending message can take
    #[error("Buffer of {len} samples exceeds remaining message capacity {capacity}")]
    BufferOverflow { len: usize, capacity: usize },

    /// Value too wide for simple-8b packing
    #[error("Value {0:#x} does not fit in 60 bits")]
    ValueTooLarge(u64),

    /// Payload compression failed
    #[error("Compression failed: {0}")]
    Compression(String),
}

/// Errors during decoding
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Buffer too short
    #[error("Buffer too short: need at least {needed} bytes, got {available}")]
    BufferTooShort { needed: usize, available: usize },

    /// Message was produced for another stream
    #[error("Stream ID mismatch: expected {expected}, message has {actual}")]
    StreamMismatch { expected: StreamId, actual: StreamId },

    /// Sample count in the header is out of range
    #[error("Invalid sample count {count} (message holds at most {max})")]
    InvalidSampleCount { count: i64, max: usize },

    /// Malformed message
    #[error("Malformed message at offset {offset}: {reason}")]
    MalformedMessage { offset: usize, reason: String },

    /// Payload decompression failed
    #[error("Decompression failed: {0}")]
    Decompression(String),

    /// No successfully decoded message is available
    #[error("No decoded message available")]
    NoOutput,

    /// Output buffer does not match the stream configuration
    #[error("Output buffer shape {samples}x{channels} does not match {expected_samples}x{expected_channels}")]
    OutputShape {
        samples: usize,
        channels: usize,
        expected_samples: usize,
        expected_channels: usize,
    },
}

/// Errors related to the session registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No session registered for this identity
    #[error("No {role} session for stream {id}")]
    NotFound { role: Role, id: StreamId },

    /// Encoder already live for this identity
    #[error("Encoder already exists for stream {0}")]
    EncoderExists(StreamId),

    /// Decoder already live for this identity
    #[error("Decoder already exists for stream {0}")]
    DecoderExists(StreamId),

    /// Identity already live with a different configuration
    #[error("Configuration mismatch for stream {0}")]
    ConfigMismatch(StreamId),
}

/// Which half of a stream a session serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Encoder side
    Encoder,
    /// Decoder side
    Decoder,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Encoder => write!(f, "encoder"),
            Role::Decoder => write!(f, "decoder"),
        }
    }
}
