//! Encoder module
//!
//! This module turns a stream of samples into complete messages. Samples are
//! accumulated one at a time; once `samples_per_message` samples have been
//! submitted the message is finished and returned, and accumulation starts
//! over.
//!
//! Message layout:
//!
//! ```text
//! [stream id: 16][first timestamp: u64 BE][sample count: varint]
//! [sample data][quality runs]          <- gzip'd above 4096 samples
//! ```

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, error, warn};

use crate::buffer::{SampleBuffer, SampleRef};
use crate::delta::DeltaState;
use crate::error::{EncodeError, Result};
use crate::protocol::{
    CodecOptions, EncodedMessage, StreamConfig, StreamId, GZIP_THRESHOLD_SAMPLES, MAX_HEADER_SIZE,
};
use crate::simple8b;
use crate::varint::{put_uvarint32, put_varint32, zigzag_encode};

/// A run of identical quality words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QualityRun {
    value: u32,
    samples: u32,
}

/// Encoder for one stream
#[derive(Debug, Clone)]
pub struct Encoder {
    id: StreamId,
    config: StreamConfig,
    options: CodecOptions,
    delta: DeltaState,
    /// Samples accumulated in the pending message
    encoded_samples: usize,
    start_timestamp: u64,
    timestamp_gap_logged: bool,
    /// Zig-zag encoded residuals: channel-major for simple-8b, sample-major otherwise
    residuals: Vec<u64>,
    quality_runs: Vec<Vec<QualityRun>>,
}

impl Encoder {
    /// Create an encoder with default options
    pub fn new(id: StreamId, config: StreamConfig) -> Result<Self> {
        Self::with_options(id, config, CodecOptions::default())
    }

    /// Create an encoder with explicit codec options
    pub fn with_options(id: StreamId, config: StreamConfig, options: CodecOptions) -> Result<Self> {
        config.validate()?;
        options.validate(&config)?;

        let layers = options.layers(&config);
        Ok(Self {
            id,
            config,
            delta: DeltaState::new(config.channel_count, layers, options.xor),
            options,
            encoded_samples: 0,
            start_timestamp: 0,
            timestamp_gap_logged: false,
            residuals: vec![0; config.channel_count * config.samples_per_message],
            quality_runs: vec![Vec::with_capacity(16); config.channel_count],
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

    /// Samples accumulated in the pending message
    pub fn pending(&self) -> usize {
        self.encoded_samples
    }

    /// Samples still needed to complete the pending message
    pub fn capacity(&self) -> usize {
        self.config.samples_per_message - self.encoded_samples
    }

    /// Submit one sample.
    ///
    /// Returns `Ok(None)` while the message is incomplete and the finished
    /// message once this sample completes it.
    pub fn encode(&mut self, sample: SampleRef<'_>) -> Result<Option<EncodedMessage>> {
        sample.check(self.config.channel_count)?;

        let j = self.encoded_samples;
        if j == 0 {
            self.start_timestamp = sample.timestamp;
            self.timestamp_gap_logged = false;
        } else if sample.timestamp != self.start_timestamp.wrapping_add(j as u64)
            && !self.timestamp_gap_logged
        {
            warn!(
                "stream {}: sample {} has timestamp {}, decoder will reconstruct {}",
                self.id,
                j,
                sample.timestamp,
                self.start_timestamp.wrapping_add(j as u64)
            );
            self.timestamp_gap_logged = true;
        }

        self.record_qualities(j, sample.qualities);

        let spm = self.config.samples_per_message;
        let channels = self.config.channel_count;
        let simple8b = self.config.uses_simple8b();
        for (i, &value) in sample.values.iter().enumerate() {
            let value = match self.options.spatial_ref(i) {
                Some(r) => value.wrapping_sub(sample.values[r]),
                None => value,
            };
            let residual = zigzag_encode(self.delta.encode(i, j, value)) as u64;
            let slot = if simple8b { i * spm + j } else { j * channels + i };
            self.residuals[slot] = residual;
        }

        self.encoded_samples += 1;
        if self.encoded_samples >= spm {
            return self.finish().map(Some);
        }
        Ok(None)
    }

    /// Submit every sample of `buffer`.
    ///
    /// The buffer may not hold more samples than the pending message has room
    /// for; it is rejected whole in that case. Returns the message completed by
    /// the final sample, if any.
    pub fn encode_all(&mut self, buffer: &SampleBuffer) -> Result<Option<EncodedMessage>> {
        if buffer.channel_count() != self.config.channel_count {
            return Err(EncodeError::ChannelCount {
                expected: self.config.channel_count,
                actual: buffer.channel_count(),
            }
            .into());
        }
        if buffer.len() > self.capacity() {
            return Err(EncodeError::BufferOverflow {
                len: buffer.len(),
                capacity: self.capacity(),
            }
            .into());
        }

        let mut message = None;
        for sample in buffer.iter() {
            message = self.encode(sample)?;
        }
        Ok(message)
    }

    /// Finish the pending message early with the samples accumulated so far
    pub fn end_encode(&mut self) -> Result<Option<EncodedMessage>> {
        if self.encoded_samples == 0 {
            return Ok(None);
        }
        self.finish().map(Some)
    }

    /// Drop the pending message
    pub fn cancel_encode(&mut self) {
        self.reset();
    }

    fn record_qualities(&mut self, index: usize, qualities: &[u32]) {
        for (runs, &q) in self.quality_runs.iter_mut().zip(qualities) {
            if index == 0 {
                runs.clear();
                runs.push(QualityRun {
                    value: q,
                    samples: 1,
                });
                continue;
            }
            match runs.last_mut() {
                Some(run) if run.value == q => run.samples += 1,
                _ => runs.push(QualityRun {
                    value: q,
                    samples: 1,
                }),
            }
        }
    }

    fn finish(&mut self) -> Result<EncodedMessage> {
        let result = self.write_message();
        self.reset();
        result
    }

    fn write_message(&self) -> Result<EncodedMessage> {
        let samples = self.encoded_samples;
        let spm = self.config.samples_per_message;
        let channels = self.config.channel_count;

        let mut header = Vec::with_capacity(MAX_HEADER_SIZE);
        header.extend_from_slice(self.id.as_bytes());
        header.extend_from_slice(&self.start_timestamp.to_be_bytes());
        put_varint32(&mut header, samples as i32);

        let mut payload = Vec::with_capacity(samples * channels * 2);
        if self.config.uses_simple8b() {
            for i in 0..channels {
                let start = i * spm;
                simple8b::encode(&self.residuals[start..start + samples], &mut payload)?;
            }
        } else {
            for &residual in &self.residuals[..samples * channels] {
                put_uvarint32(&mut payload, residual as u32);
            }
        }

        for runs in &self.quality_runs {
            let last = runs.len().saturating_sub(1);
            for (k, run) in runs.iter().enumerate() {
                put_uvarint32(&mut payload, run.value);
                // zero length: run continues to the end of the message
                put_uvarint32(&mut payload, if k == last { 0 } else { run.samples });
            }
        }

        let mut message = header;
        if samples > GZIP_THRESHOLD_SAMPLES {
            let compressed = gzip(&payload).map_err(|e| {
                error!("stream {}: could not gzip payload: {}", self.id, e);
                EncodeError::Compression(e.to_string())
            })?;
            if compressed.len() > payload.len() {
                warn!(
                    "stream {}: gzip grew payload from {} to {} bytes",
                    self.id,
                    payload.len(),
                    compressed.len()
                );
            }
            message.extend_from_slice(&compressed);
        } else {
            message.extend_from_slice(&payload);
        }

        debug!(
            "stream {}: encoded {} samples into {} bytes",
            self.id,
            samples,
            message.len()
        );
        Ok(EncodedMessage::new(message))
    }

    fn reset(&mut self) {
        self.encoded_samples = 0;
        self.timestamp_gap_logged = false;
        self.delta.reset();
        for runs in &mut self.quality_runs {
            runs.clear();
        }
    }
}

fn gzip(payload: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(payload.len() / 2), Compression::best());
    encoder.write_all(payload)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::HEADER_PREFIX_SIZE;

    fn config(channels: usize, spm: usize) -> StreamConfig {
        StreamConfig::new(channels, 4000, spm).unwrap()
    }

    #[test]
    fn test_message_completes_on_last_sample() {
        let mut encoder = Encoder::new(StreamId::nil(), config(2, 3)).unwrap();
        assert!(encoder.encode(SampleRef::new(0, &[1, 2], &[0, 0])).unwrap().is_none());
        assert!(encoder.encode(SampleRef::new(1, &[2, 3], &[0, 0])).unwrap().is_none());
        assert_eq!(encoder.pending(), 2);
        let message = encoder.encode(SampleRef::new(2, &[3, 4], &[0, 0])).unwrap();
        assert!(message.is_some());
        assert_eq!(encoder.pending(), 0);
    }

    #[test]
    fn test_header_layout() {
        let id = StreamId::from_bytes([7; 16]);
        let mut encoder = Encoder::new(id, config(1, 1)).unwrap();
        let message = encoder
            .encode(SampleRef::new(0x0102, &[5], &[0]))
            .unwrap()
            .unwrap();
        assert_eq!(&message[..16], &[7; 16]);
        assert_eq!(&message[16..24], &0x0102u64.to_be_bytes());
        // sample count 1 as zig-zag varint
        assert_eq!(message[HEADER_PREFIX_SIZE], 2);
    }

    #[test]
    fn test_wrong_width_rejected_without_state_change() {
        let mut encoder = Encoder::new(StreamId::nil(), config(3, 4)).unwrap();
        let result = encoder.encode(SampleRef::new(0, &[1, 2], &[0, 0]));
        assert!(result.is_err());
        assert_eq!(encoder.pending(), 0);
    }

    #[test]
    fn test_encode_all_rejects_overflow() {
        let mut encoder = Encoder::new(StreamId::nil(), config(1, 4)).unwrap();
        encoder.encode(SampleRef::new(0, &[1], &[0])).unwrap();
        let buffer = SampleBuffer::allocate(1, 4);
        let result = encoder.encode_all(&buffer);
        assert!(matches!(
            result,
            Err(crate::SlipstreamError::Encode(EncodeError::BufferOverflow {
                len: 4,
                capacity: 3
            }))
        ));
        assert_eq!(encoder.pending(), 1);
    }

    #[test]
    fn test_encode_all_short_buffer_stays_pending() {
        let mut encoder = Encoder::new(StreamId::nil(), config(2, 10)).unwrap();
        let buffer = SampleBuffer::allocate(2, 4);
        assert!(encoder.encode_all(&buffer).unwrap().is_none());
        assert_eq!(encoder.pending(), 4);
        assert_eq!(encoder.capacity(), 6);
    }

    #[test]
    fn test_end_and_cancel() {
        let mut encoder = Encoder::new(StreamId::nil(), config(1, 10)).unwrap();
        assert!(encoder.end_encode().unwrap().is_none());

        encoder.encode(SampleRef::new(0, &[1], &[0])).unwrap();
        encoder.cancel_encode();
        assert_eq!(encoder.pending(), 0);

        encoder.encode(SampleRef::new(0, &[1], &[0])).unwrap();
        encoder.encode(SampleRef::new(1, &[2], &[0])).unwrap();
        let message = encoder.end_encode().unwrap().unwrap();
        assert!(!message.is_empty());
        assert_eq!(encoder.pending(), 0);
    }

    #[test]
    fn test_constant_signal_compresses() {
        let spm = 1000;
        let mut encoder = Encoder::new(StreamId::nil(), config(8, spm)).unwrap();
        let buffer = SampleBuffer::allocate(8, spm);
        let message = encoder.encode_all(&buffer).unwrap().unwrap();
        // all-zero residuals collapse to a handful of run words per channel
        assert!(message.len() < 8 * 16 * spm / 100);
    }

    #[test]
    fn test_invalid_options_rejected() {
        let options = CodecOptions::new().with_refs(vec![None, Some(5)]);
        assert!(Encoder::with_options(StreamId::nil(), config(2, 4), options).is_err());
    }
}
