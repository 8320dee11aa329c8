//! Session registry
//!
//! [`SessionRegistry`] owns the live encoder and decoder sessions, keyed by
//! [`StreamId`]. The two halves of an identity are independent: either may
//! be created, used and released without the other. When both are live they
//! must agree on configuration and codec options.

use std::collections::HashMap;

use log::{debug, info};

use crate::buffer::{SampleBuffer, SampleRef};
use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::{Result, Role, SessionError};
use crate::protocol::{CodecOptions, EncodedMessage, StreamConfig, StreamId};

/// Live codec sessions
#[derive(Debug, Default)]
pub struct SessionRegistry {
    encoders: HashMap<StreamId, Encoder>,
    decoders: HashMap<StreamId, Decoder>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an encoder with default codec options
    pub fn create_encoder(&mut self, id: StreamId, config: StreamConfig) -> Result<()> {
        self.create_encoder_with_options(id, config, CodecOptions::default())
    }

    /// Create an encoder
    pub fn create_encoder_with_options(
        &mut self,
        id: StreamId,
        config: StreamConfig,
        options: CodecOptions,
    ) -> Result<()> {
        if let Some(existing) = self.encoders.get(&id) {
            if *existing.config() == config && *existing.options() == options {
                return Err(SessionError::EncoderExists(id).into());
            }
            return Err(SessionError::ConfigMismatch(id).into());
        }
        if let Some(decoder) = self.decoders.get(&id) {
            if *decoder.config() != config || *decoder.options() != options {
                return Err(SessionError::ConfigMismatch(id).into());
            }
        }

        let encoder = Encoder::with_options(id, config, options)?;
        self.encoders.insert(id, encoder);
        info!(
            "created encoder {} ({} channels, {} Hz, {} samples/message)",
            id, config.channel_count, config.sampling_rate, config.samples_per_message
        );
        Ok(())
    }

    /// Create a decoder with default codec options
    pub fn create_decoder(&mut self, id: StreamId, config: StreamConfig) -> Result<()> {
        self.create_decoder_with_options(id, config, CodecOptions::default())
    }

    /// Create a decoder
    pub fn create_decoder_with_options(
        &mut self,
        id: StreamId,
        config: StreamConfig,
        options: CodecOptions,
    ) -> Result<()> {
        if let Some(existing) = self.decoders.get(&id) {
            if *existing.config() == config && *existing.options() == options {
                return Err(SessionError::DecoderExists(id).into());
            }
            return Err(SessionError::ConfigMismatch(id).into());
        }
        if let Some(encoder) = self.encoders.get(&id) {
            if *encoder.config() != config || *encoder.options() != options {
                return Err(SessionError::ConfigMismatch(id).into());
            }
        }

        let decoder = Decoder::with_options(id, config, options)?;
        self.decoders.insert(id, decoder);
        info!(
            "created decoder {} ({} channels, {} Hz, {} samples/message)",
            id, config.channel_count, config.sampling_rate, config.samples_per_message
        );
        Ok(())
    }

    /// Submit a whole buffer to the encoder of `id`
    pub fn encode_all(&mut self, id: StreamId, buffer: &SampleBuffer) -> Result<Option<EncodedMessage>> {
        self.encoder_mut(id)?.encode_all(buffer)
    }

    /// Submit one sample to the encoder of `id`
    pub fn encode_one(&mut self, id: StreamId, sample: SampleRef<'_>) -> Result<Option<EncodedMessage>> {
        self.encoder_mut(id)?.encode(sample)
    }

    /// Finish the pending message of `id` early
    pub fn end_encode(&mut self, id: StreamId) -> Result<Option<EncodedMessage>> {
        self.encoder_mut(id)?.end_encode()
    }

    /// Drop the pending message of `id`
    pub fn cancel_encode(&mut self, id: StreamId) -> Result<()> {
        self.encoder_mut(id)?.cancel_encode();
        Ok(())
    }

    /// Decode a message with the decoder of `id`
    pub fn decode(&mut self, id: StreamId, message: &[u8]) -> Result<()> {
        self.decoder_mut(id)?.decode(message)
    }

    /// Copy the last decoded message of `id` into `buffer`, returning the sample count
    pub fn get_decoded(&self, id: StreamId, buffer: &mut SampleBuffer) -> Result<usize> {
        self.decoder(id)?.get_decoded(buffer)
    }

    /// Remove the encoder of `id`
    pub fn release_encoder(&mut self, id: StreamId) -> Result<()> {
        self.encoders.remove(&id).ok_or(SessionError::NotFound {
            role: Role::Encoder,
            id,
        })?;
        debug!("released encoder {}", id);
        Ok(())
    }

    /// Remove the decoder of `id`
    pub fn release_decoder(&mut self, id: StreamId) -> Result<()> {
        self.decoders.remove(&id).ok_or(SessionError::NotFound {
            role: Role::Decoder,
            id,
        })?;
        debug!("released decoder {}", id);
        Ok(())
    }

    /// Whether an encoder is live for `id`
    pub fn has_encoder(&self, id: StreamId) -> bool {
        self.encoders.contains_key(&id)
    }

    /// Whether a decoder is live for `id`
    pub fn has_decoder(&self, id: StreamId) -> bool {
        self.decoders.contains_key(&id)
    }

    /// Encoder of `id`
    pub fn encoder(&self, id: StreamId) -> Result<&Encoder> {
        self.encoders.get(&id).ok_or_else(|| not_found(Role::Encoder, id))
    }

    /// Decoder of `id`
    pub fn decoder(&self, id: StreamId) -> Result<&Decoder> {
        self.decoders.get(&id).ok_or_else(|| not_found(Role::Decoder, id))
    }

    fn encoder_mut(&mut self, id: StreamId) -> Result<&mut Encoder> {
        self.encoders.get_mut(&id).ok_or_else(|| not_found(Role::Encoder, id))
    }

    fn decoder_mut(&mut self, id: StreamId) -> Result<&mut Decoder> {
        self.decoders.get_mut(&id).ok_or_else(|| not_found(Role::Decoder, id))
    }
}

fn not_found(role: Role, id: StreamId) -> crate::SlipstreamError {
    SessionError::NotFound { role, id }.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use crate::SlipstreamError;

    fn config() -> StreamConfig {
        StreamConfig::new(2, 4000, 4).unwrap()
    }

    fn id(last: u8) -> StreamId {
        let mut bytes = [0u8; 16];
        bytes[15] = last;
        StreamId::from_bytes(bytes)
    }

    #[test]
    fn test_create_and_release() {
        let mut registry = SessionRegistry::new();
        registry.create_encoder(id(1), config()).unwrap();
        assert!(registry.has_encoder(id(1)));
        assert!(!registry.has_decoder(id(1)));

        registry.release_encoder(id(1)).unwrap();
        assert!(!registry.has_encoder(id(1)));
        assert_eq!(
            registry.release_encoder(id(1)),
            Err(SlipstreamError::Session(SessionError::NotFound {
                role: Role::Encoder,
                id: id(1)
            }))
        );
    }

    #[test]
    fn test_duplicate_create() {
        let mut registry = SessionRegistry::new();
        registry.create_encoder(id(1), config()).unwrap();
        assert_eq!(
            registry.create_encoder(id(1), config()),
            Err(SessionError::EncoderExists(id(1)).into())
        );

        let other = StreamConfig::new(3, 4000, 4).unwrap();
        assert_eq!(
            registry.create_encoder(id(1), other),
            Err(SessionError::ConfigMismatch(id(1)).into())
        );
        assert_eq!(
            registry.create_decoder(id(1), other),
            Err(SessionError::ConfigMismatch(id(1)).into())
        );

        registry.create_decoder(id(1), config()).unwrap();
        assert_eq!(
            registry.create_decoder(id(1), config()),
            Err(SessionError::DecoderExists(id(1)).into())
        );
    }

    #[test]
    fn test_unknown_identity() {
        let mut registry = SessionRegistry::new();
        let buffer = SampleBuffer::allocate(2, 4);
        assert!(matches!(
            registry.encode_all(id(7), &buffer),
            Err(SlipstreamError::Session(SessionError::NotFound { role: Role::Encoder, .. }))
        ));
        assert!(matches!(
            registry.decode(id(7), &[1, 2, 3]),
            Err(SlipstreamError::Session(SessionError::NotFound { role: Role::Decoder, .. }))
        ));
    }

    #[test]
    fn test_identities_are_independent() {
        let mut registry = SessionRegistry::new();
        for k in [1, 2] {
            registry.create_encoder(id(k), config()).unwrap();
            registry.create_decoder(id(k), config()).unwrap();
        }

        let a = SampleBuffer::allocate(2, 4);
        let mut b = SampleBuffer::allocate(2, 4);
        b.values_mut(0)[1] = 99;

        // interleave the two streams sample by sample
        let mut messages = Vec::new();
        for j in 0..4 {
            let ma = registry.encode_one(id(1), a.get(j).unwrap()).unwrap();
            let mb = registry.encode_one(id(2), b.get(j).unwrap()).unwrap();
            messages.extend(ma.map(|m| (id(1), m)));
            messages.extend(mb.map(|m| (id(2), m)));
        }
        assert_eq!(messages.len(), 2);

        for (k, message) in &messages {
            registry.decode(*k, message).unwrap();
        }
        let mut out = SampleBuffer::allocate(2, 4);
        registry.get_decoded(id(1), &mut out).unwrap();
        assert_eq!(out, a);
        registry.get_decoded(id(2), &mut out).unwrap();
        assert_eq!(out, b);

        // a message for stream 1 is rejected by stream 2
        assert!(registry.decode(id(2), &messages[0].1).is_err());
    }

    #[test]
    fn test_empty_decode_then_no_output() {
        let mut registry = SessionRegistry::new();
        registry.create_encoder(id(3), config()).unwrap();
        registry.create_decoder(id(3), config()).unwrap();

        assert!(registry.decode(id(3), &[]).is_err());
        let mut out = SampleBuffer::allocate(2, 4);
        assert_eq!(
            registry.get_decoded(id(3), &mut out),
            Err(DecodeError::NoOutput.into())
        );

        let input = SampleBuffer::allocate(2, 4);
        let message = registry.encode_all(id(3), &input).unwrap().unwrap();
        registry.decode(id(3), &message).unwrap();
        assert_eq!(registry.get_decoded(id(3), &mut out).unwrap(), 4);
    }

    #[test]
    fn test_cancel_and_end() {
        let mut registry = SessionRegistry::new();
        registry.create_encoder(id(4), config()).unwrap();
        let buffer = SampleBuffer::allocate(2, 2);
        assert!(registry.encode_all(id(4), &buffer).unwrap().is_none());
        registry.cancel_encode(id(4)).unwrap();
        assert_eq!(registry.encoder(id(4)).unwrap().pending(), 0);
        assert!(registry.end_encode(id(4)).unwrap().is_none());
    }

    #[test]
    fn test_options_must_match() {
        let mut registry = SessionRegistry::new();
        registry
            .create_encoder_with_options(id(5), config(), CodecOptions::new().with_xor(true))
            .unwrap();
        assert_eq!(
            registry.create_decoder(id(5), config()),
            Err(SessionError::ConfigMismatch(id(5)).into())
        );
    }
}
