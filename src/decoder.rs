//! Decoder module
//!
//! This module reconstructs the samples of one message produced by the
//! matching [`Encoder`](crate::encoder::Encoder). The most recent successful
//! decode is kept until the next call to [`Decoder::decode`]; a failed decode
//! discards it.

use std::io::Read;

use flate2::bufread::GzDecoder;
use log::{debug, warn};

use crate::buffer::{SampleBuffer, SampleRef};
use crate::delta::DeltaState;
use crate::error::{DecodeError, Result};
use crate::protocol::{
    CodecOptions, StreamConfig, StreamId, GZIP_THRESHOLD_SAMPLES, HEADER_PREFIX_SIZE,
};
use crate::simple8b;
use crate::varint::{read_uvarint32, read_varint32, zigzag_decode, MAX_VARINT32_LEN};

/// Decoder for one stream
#[derive(Debug, Clone)]
pub struct Decoder {
    id: StreamId,
    config: StreamConfig,
    options: CodecOptions,
    delta: DeltaState,
    /// Reconstructed samples, sized for a full message
    output: SampleBuffer,
    /// Samples in `output` from the last successful decode
    decoded: Option<usize>,
    /// Scratch for one channel of simple-8b values
    scratch: Vec<u64>,
}

impl Decoder {
    /// Create a decoder with default options
    pub fn new(id: StreamId, config: StreamConfig) -> Result<Self> {
        Self::with_options(id, config, CodecOptions::default())
    }

    /// Create a decoder with explicit codec options
    pub fn with_options(id: StreamId, config: StreamConfig, options: CodecOptions) -> Result<Self> {
        config.validate()?;
        options.validate(&config)?;

        let layers = options.layers(&config);
        Ok(Self {
            id,
            config,
            delta: DeltaState::new(config.channel_count, layers, options.xor),
            options,
            output: SampleBuffer::allocate(config.channel_count, config.samples_per_message),
            decoded: None,
            scratch: Vec::with_capacity(config.samples_per_message),
        })
    }

    /// Stream identity
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Stream configuration
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Codec options
    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    /// Samples held from the last successful decode
    pub fn decoded_samples(&self) -> Option<usize> {
        self.decoded
    }

    /// Decoded sample `index`, if the last decode produced it
    pub fn sample(&self, index: usize) -> Option<SampleRef<'_>> {
        match self.decoded {
            Some(n) if index < n => self.output.get(index),
            _ => None,
        }
    }

    /// Decode one complete message
    pub fn decode(&mut self, message: &[u8]) -> Result<()> {
        self.decoded = None;
        match self.decode_message(message) {
            Ok(samples) => {
                debug!(
                    "stream {}: decoded {} samples from {} bytes",
                    self.id,
                    samples,
                    message.len()
                );
                self.decoded = Some(samples);
                Ok(())
            }
            Err(e) => {
                warn!("stream {}: rejected message: {}", self.id, e);
                Err(e.into())
            }
        }
    }

    /// Copy the last decoded message into `buffer`, returning the sample count.
    ///
    /// `buffer` must be shaped for a full message. A message finished early
    /// fills only its leading samples.
    pub fn get_decoded(&self, buffer: &mut SampleBuffer) -> Result<usize> {
        let samples = self.decoded.ok_or(DecodeError::NoOutput)?;
        if buffer.len() != self.config.samples_per_message
            || buffer.channel_count() != self.config.channel_count
        {
            return Err(DecodeError::OutputShape {
                samples: buffer.len(),
                channels: buffer.channel_count(),
                expected_samples: self.config.samples_per_message,
                expected_channels: self.config.channel_count,
            }
            .into());
        }
        buffer.copy_prefix_from(&self.output, samples);
        Ok(samples)
    }

    fn decode_message(&mut self, message: &[u8]) -> std::result::Result<usize, DecodeError> {
        if message.len() <= HEADER_PREFIX_SIZE {
            return Err(DecodeError::BufferTooShort {
                needed: HEADER_PREFIX_SIZE + 1,
                available: message.len(),
            });
        }

        let actual = StreamId::from_slice(&message[..16]).ok_or(DecodeError::BufferTooShort {
            needed: 16,
            available: message.len(),
        })?;
        if actual != self.id {
            return Err(DecodeError::StreamMismatch {
                expected: self.id,
                actual,
            });
        }

        let mut ts = [0u8; 8];
        ts.copy_from_slice(&message[16..HEADER_PREFIX_SIZE]);
        let start_timestamp = u64::from_be_bytes(ts);

        let (count, consumed) = read_varint32(message, HEADER_PREFIX_SIZE)?;
        let max = self.config.samples_per_message;
        if count <= 0 || count as usize > max {
            return Err(DecodeError::InvalidSampleCount {
                count: count as i64,
                max,
            });
        }
        let samples = count as usize;

        let body_offset = HEADER_PREFIX_SIZE + consumed;
        let body = &message[body_offset..];
        let inflated;
        let payload = if samples > GZIP_THRESHOLD_SAMPLES {
            let limit = max_payload_size(self.config.channel_count, samples);
            inflated = gunzip(body, body_offset, limit)?;
            &inflated[..]
        } else {
            body
        };

        self.delta.reset();
        let mut offset = if self.config.uses_simple8b() {
            self.read_packed(payload, samples)?
        } else {
            self.read_varints(payload, samples)?
        };
        self.restore_spatial(samples);
        offset = self.read_quality_runs(payload, offset, samples)?;

        if offset != payload.len() {
            return Err(DecodeError::MalformedMessage {
                offset,
                reason: format!("{} trailing bytes", payload.len() - offset),
            });
        }

        for j in 0..samples {
            self.output
                .set_timestamp(j, start_timestamp.wrapping_add(j as u64));
        }
        Ok(samples)
    }

    /// Channel-major simple-8b words
    fn read_packed(&mut self, payload: &[u8], samples: usize) -> std::result::Result<usize, DecodeError> {
        let mut offset = 0;
        for i in 0..self.config.channel_count {
            self.scratch.clear();
            offset += simple8b::decode(&payload[offset..], samples, &mut self.scratch)
                .map_err(|e| shift_offset(e, offset))?;

            for (j, &packed) in self.scratch.iter().enumerate() {
                let zigzag = u32::try_from(packed).map_err(|_| DecodeError::MalformedMessage {
                    offset,
                    reason: format!("Residual {packed:#x} exceeds 32 bits"),
                })?;
                let value = self.delta.decode(i, j, zigzag_decode(zigzag));
                self.output.values_mut(j)[i] = value;
            }
        }
        Ok(offset)
    }

    /// Sample-major varints
    fn read_varints(&mut self, payload: &[u8], samples: usize) -> std::result::Result<usize, DecodeError> {
        let mut offset = 0;
        for j in 0..samples {
            for i in 0..self.config.channel_count {
                let (zigzag, consumed) = read_uvarint32(payload, offset)?;
                offset += consumed;
                let value = self.delta.decode(i, j, zigzag_decode(zigzag));
                self.output.values_mut(j)[i] = value;
            }
        }
        Ok(offset)
    }

    /// References always point at a lower channel, so ascending order sees
    /// every reference already restored.
    fn restore_spatial(&mut self, samples: usize) {
        let channels = self.config.channel_count;
        for i in 0..channels {
            if let Some(r) = self.options.spatial_ref(i) {
                for j in 0..samples {
                    let values = self.output.values_mut(j);
                    values[i] = values[i].wrapping_add(values[r]);
                }
            }
        }
    }

    fn read_quality_runs(
        &mut self,
        payload: &[u8],
        mut offset: usize,
        samples: usize,
    ) -> std::result::Result<usize, DecodeError> {
        for i in 0..self.config.channel_count {
            let mut s = 0;
            while s < samples {
                let (quality, consumed) = read_uvarint32(payload, offset)?;
                offset += consumed;
                let (run, consumed) = read_uvarint32(payload, offset)?;
                offset += consumed;

                let end = if run == 0 { samples } else { s + run as usize };
                if end > samples {
                    return Err(DecodeError::MalformedMessage {
                        offset,
                        reason: format!(
                            "Quality run of {} on channel {} overflows {} samples",
                            run, i, samples
                        ),
                    });
                }
                for j in s..end {
                    self.output.qualities_mut(j)[i] = quality;
                }
                s = end;
            }
        }
        Ok(offset)
    }
}

/// Largest payload a well-formed message of `samples` samples can carry:
/// one simple-8b word per value plus two 5-byte varints per quality run.
fn max_payload_size(channels: usize, samples: usize) -> usize {
    channels
        .saturating_mul(samples)
        .saturating_mul(simple8b::WORD_SIZE + 2 * MAX_VARINT32_LEN)
}

/// Inflate a single gzip member of at most `limit` bytes that must span all
/// of `body`. `base` is the offset of `body` within the message.
fn gunzip(body: &[u8], base: usize, limit: usize) -> std::result::Result<Vec<u8>, DecodeError> {
    let mut decoder = GzDecoder::new(body);
    let mut payload = Vec::with_capacity(body.len().saturating_mul(4).min(limit));
    (&mut decoder)
        .take(limit as u64 + 1)
        .read_to_end(&mut payload)
        .map_err(|e| DecodeError::Decompression(e.to_string()))?;
    if payload.len() > limit {
        return Err(DecodeError::Decompression(format!(
            "Payload inflates past {} bytes",
            limit
        )));
    }

    let rest = decoder.into_inner();
    if !rest.is_empty() {
        return Err(DecodeError::MalformedMessage {
            offset: base + body.len() - rest.len(),
            reason: format!("{} trailing bytes after gzip stream", rest.len()),
        });
    }
    Ok(payload)
}

/// Make simple-8b offsets relative to the whole payload
fn shift_offset(error: DecodeError, base: usize) -> DecodeError {
    match error {
        DecodeError::BufferTooShort { needed, available } => DecodeError::BufferTooShort {
            needed: needed + base,
            available: available + base,
        },
        DecodeError::MalformedMessage { offset, reason } => DecodeError::MalformedMessage {
            offset: offset + base,
            reason,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Encoder;
    use crate::SlipstreamError;

    fn pair(channels: usize, spm: usize) -> (Encoder, Decoder) {
        let config = StreamConfig::new(channels, 4000, spm).unwrap();
        (
            Encoder::new(StreamId::nil(), config).unwrap(),
            Decoder::new(StreamId::nil(), config).unwrap(),
        )
    }

    fn ramp(channels: usize, samples: usize) -> SampleBuffer {
        let mut buffer = SampleBuffer::allocate(channels, samples);
        for j in 0..samples {
            for i in 0..channels {
                buffer.values_mut(j)[i] = (j as i32 * 37 - 500) * (i as i32 + 1);
            }
            buffer.set_timestamp(j, 1_000 + j as u64);
        }
        buffer
    }

    #[test]
    fn test_roundtrip_varint_layout() {
        let (mut encoder, mut decoder) = pair(3, 10);
        let input = ramp(3, 10);
        let message = encoder.encode_all(&input).unwrap().unwrap();
        decoder.decode(&message).unwrap();

        let mut output = SampleBuffer::allocate(3, 10);
        assert_eq!(decoder.get_decoded(&mut output).unwrap(), 10);
        assert_eq!(output, input);
    }

    #[test]
    fn test_roundtrip_simple8b_layout() {
        let (mut encoder, mut decoder) = pair(4, 100);
        let mut input = ramp(4, 100);
        input.qualities_mut(50)[2] = 7;
        let message = encoder.encode_all(&input).unwrap().unwrap();
        decoder.decode(&message).unwrap();

        let mut output = SampleBuffer::allocate(4, 100);
        decoder.get_decoded(&mut output).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_no_output_before_decode() {
        let (_, decoder) = pair(2, 4);
        let mut output = SampleBuffer::allocate(2, 4);
        assert_eq!(
            decoder.get_decoded(&mut output),
            Err(SlipstreamError::Decode(DecodeError::NoOutput))
        );
    }

    #[test]
    fn test_empty_message() {
        let (_, mut decoder) = pair(2, 4);
        assert!(matches!(
            decoder.decode(&[]),
            Err(SlipstreamError::Decode(DecodeError::BufferTooShort { .. }))
        ));
    }

    #[test]
    fn test_failed_decode_clears_output() {
        let (mut encoder, mut decoder) = pair(2, 4);
        let message = encoder.encode_all(&ramp(2, 4)).unwrap().unwrap();
        decoder.decode(&message).unwrap();
        assert_eq!(decoder.decoded_samples(), Some(4));

        assert!(decoder.decode(&message[..message.len() - 1]).is_err());
        assert_eq!(decoder.decoded_samples(), None);
        let mut output = SampleBuffer::allocate(2, 4);
        assert!(decoder.get_decoded(&mut output).is_err());
    }

    #[test]
    fn test_foreign_stream_rejected() {
        let config = StreamConfig::new(1, 4000, 2).unwrap();
        let mut encoder = Encoder::new(StreamId::from_bytes([9; 16]), config).unwrap();
        let mut decoder = Decoder::new(StreamId::nil(), config).unwrap();
        let message = encoder.encode_all(&SampleBuffer::allocate(1, 2)).unwrap().unwrap();
        assert!(matches!(
            decoder.decode(&message),
            Err(SlipstreamError::Decode(DecodeError::StreamMismatch { .. }))
        ));
    }

    #[test]
    fn test_sample_count_out_of_range() {
        let (mut encoder, _) = pair(1, 8);
        let message = encoder.encode_all(&SampleBuffer::allocate(1, 8)).unwrap().unwrap();
        let config = StreamConfig::new(1, 4000, 4).unwrap();
        let mut decoder = Decoder::new(StreamId::nil(), config).unwrap();
        assert!(matches!(
            decoder.decode(&message),
            Err(SlipstreamError::Decode(DecodeError::InvalidSampleCount { count: 8, max: 4 }))
        ));
    }

    #[test]
    fn test_output_shape_checked() {
        let (mut encoder, mut decoder) = pair(2, 4);
        let message = encoder.encode_all(&ramp(2, 4)).unwrap().unwrap();
        decoder.decode(&message).unwrap();
        let mut output = SampleBuffer::allocate(3, 4);
        assert!(matches!(
            decoder.get_decoded(&mut output),
            Err(SlipstreamError::Decode(DecodeError::OutputShape { .. }))
        ));
    }

    #[test]
    fn test_quality_run_overflow_rejected() {
        let (mut encoder, mut decoder) = pair(1, 2);
        let mut message = encoder
            .encode_all(&SampleBuffer::allocate(1, 2))
            .unwrap()
            .unwrap()
            .into_vec();
        // last two bytes are the single quality run (0, 0); claim a run of 5
        let len = message.len();
        message[len - 1] = 5;
        assert!(matches!(
            decoder.decode(&message),
            Err(SlipstreamError::Decode(DecodeError::MalformedMessage { .. }))
        ));
    }

    #[test]
    fn test_timestamps_reconstructed_from_start() {
        let (mut encoder, mut decoder) = pair(1, 3);
        encoder.encode(SampleRef::new(500, &[1], &[0])).unwrap();
        encoder.encode(SampleRef::new(501, &[2], &[0])).unwrap();
        let message = encoder.encode(SampleRef::new(502, &[3], &[0])).unwrap().unwrap();
        decoder.decode(&message).unwrap();
        assert_eq!(decoder.sample(2).unwrap().timestamp, 502);
        assert!(decoder.sample(3).is_none());
    }

    #[test]
    fn test_early_end_decodes_prefix() {
        let (mut encoder, mut decoder) = pair(2, 50);
        let input = ramp(2, 50);
        for sample in input.iter().take(20) {
            assert!(encoder.encode(sample).unwrap().is_none());
        }
        let message = encoder.end_encode().unwrap().unwrap();
        decoder.decode(&message).unwrap();

        let mut output = SampleBuffer::allocate(2, 50);
        assert_eq!(decoder.get_decoded(&mut output).unwrap(), 20);
        for j in 0..20 {
            assert_eq!(output.get(j), input.get(j));
        }
    }
}
