//! # Slipstream - streaming codec for power-system samples
//!
//! A lossless codec for fixed-width, timestamped samples such as the phase
//! currents and voltages of a three-phase power system. Samples are grouped
//! into messages of a configured length and sent as layered deltas packed
//! with simple-8b, with per-channel quality words run-length encoded.
//!
//! ## Key Features
//!
//! - **Bulk or incremental**: submit a whole buffer or one sample at a time;
//!   both paths produce byte-identical messages
//! - **Session registry**: independent encoder and decoder sessions keyed by a
//!   16-byte stream identity
//! - **Spatial references**: optionally encode a channel against another
//! - **Owned output**: messages are plain owned byte buffers
//!
//! ## Quick Start
//!
//! ```rust
//! use slipstream::{SampleBuffer, SessionRegistry, StreamConfig, StreamId};
//!
//! let id = StreamId::nil();
//! let config = StreamConfig::new(8, 4000, 100).unwrap();
//!
//! let mut registry = SessionRegistry::new();
//! registry.create_encoder(id, config).unwrap();
//! registry.create_decoder(id, config).unwrap();
//!
//! let input = SampleBuffer::allocate(8, 100);
//! let message = registry.encode_all(id, &input).unwrap().expect("message complete");
//!
//! registry.decode(id, &message).unwrap();
//! let mut output = SampleBuffer::allocate(8, 100);
//! registry.get_decoded(id, &mut output).unwrap();
//! assert_eq!(output, input);
//! ```
//!
//! ## Modules
//!
//! - [`protocol`]: Stream identity, configuration and wire constants
//! - [`buffer`]: Sample buffers and borrowed sample views
//! - [`encoder`]: Message encoding
//! - [`decoder`]: Message decoding
//! - [`session`]: Registry of live encoder and decoder sessions
//! - [`metrics`]: Compression statistics

// Modules
pub mod buffer;
pub mod decoder;
pub mod delta;
pub mod encoder;
pub mod error;
pub mod metrics;
pub mod protocol;
pub mod session;
pub mod simple8b;
pub mod varint;

// Re-exports for convenient access
pub use buffer::{SampleBuffer, SampleRef};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::{
    ConfigError, DecodeError, EncodeError, Result, Role, SessionError, SlipstreamError,
};
pub use metrics::{compression_ratio, CompressionMetrics, BYTES_PER_RAW_VALUE};
pub use protocol::{CodecOptions, EncodedMessage, StreamConfig, StreamId};
pub use session::SessionRegistry;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_registry_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<SessionRegistry>();
        assert_send::<EncodedMessage>();
    }
}
