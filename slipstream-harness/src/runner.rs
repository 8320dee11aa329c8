// Slipstream Harness - Reference runs
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! The two reference runs: bulk and incremental submission.
//!
//! Both runs create an encoder and decoder for the identity, encode the
//! buffer, decode the message once it completes, validate the decoded output
//! and release both sessions. A decode failure is part of the report, not an
//! error; validation is then skipped.

use slipstream::{
    compression_ratio, CodecOptions, EncodedMessage, SampleBuffer, SessionRegistry, StreamConfig,
    StreamId,
};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::report::{RunMode, RunReport};
use crate::timing::PhaseTimer;
use crate::validate::compare;

/// Encode `buffer` with one bulk call, then decode and validate.
pub fn run_bulk(
    registry: &mut SessionRegistry,
    config: StreamConfig,
    id: StreamId,
    buffer: &SampleBuffer,
) -> Result<RunReport> {
    run_bulk_with_options(registry, config, CodecOptions::default(), id, buffer)
}

/// [`run_bulk`] with explicit codec options
pub fn run_bulk_with_options(
    registry: &mut SessionRegistry,
    config: StreamConfig,
    options: CodecOptions,
    id: StreamId,
    buffer: &SampleBuffer,
) -> Result<RunReport> {
    with_sessions(registry, config, options, id, |registry| {
        let mut run = Run::new(RunMode::Bulk, id, config);
        run.timer.mark_start();

        let message = registry.encode_all(id, buffer)?;
        run.timer.mark_encode_end();

        if let Some(message) = message {
            run.samples_encoded = buffer.len();
            run.finish_message(registry, &message, buffer)?;
        } else {
            warn!("stream {}: buffer did not complete a message", id);
        }

        Ok(run.into_report())
    })
}

/// Encode `buffer` one sample at a time, then decode and validate the first
/// message that completes.
pub fn run_incremental(
    registry: &mut SessionRegistry,
    config: StreamConfig,
    id: StreamId,
    buffer: &SampleBuffer,
) -> Result<RunReport> {
    run_incremental_with_options(registry, config, CodecOptions::default(), id, buffer)
}

/// [`run_incremental`] with explicit codec options
pub fn run_incremental_with_options(
    registry: &mut SessionRegistry,
    config: StreamConfig,
    options: CodecOptions,
    id: StreamId,
    buffer: &SampleBuffer,
) -> Result<RunReport> {
    with_sessions(registry, config, options, id, |registry| {
        let mut run = Run::new(RunMode::Incremental, id, config);
        run.timer.mark_start();

        for (s, sample) in buffer.iter().enumerate() {
            if let Some(message) = registry.encode_one(id, sample)? {
                run.timer.mark_encode_end();
                run.samples_encoded = s + 1;
                run.finish_message(registry, &message, buffer)?;
                break;
            }
        }
        if run.samples_encoded == 0 {
            warn!("stream {}: buffer did not complete a message", id);
        }

        Ok(run.into_report())
    })
}

/// Create both sessions, run `body`, and release both sessions whatever the outcome.
fn with_sessions<F>(
    registry: &mut SessionRegistry,
    config: StreamConfig,
    options: CodecOptions,
    id: StreamId,
    body: F,
) -> Result<RunReport>
where
    F: FnOnce(&mut SessionRegistry) -> Result<RunReport>,
{
    registry.create_encoder_with_options(id, config, options.clone())?;
    if let Err(e) = registry.create_decoder_with_options(id, config, options) {
        registry.release_encoder(id)?;
        return Err(e.into());
    }

    let result = body(registry);

    registry.release_encoder(id)?;
    registry.release_decoder(id)?;
    result
}

/// State accumulated during one run
struct Run {
    mode: RunMode,
    id: StreamId,
    config: StreamConfig,
    timer: PhaseTimer,
    samples_encoded: usize,
    encoded_length: usize,
    decoded: bool,
    mismatches: Vec<crate::validate::Mismatch>,
}

impl Run {
    fn new(mode: RunMode, id: StreamId, config: StreamConfig) -> Self {
        Self {
            mode,
            id,
            config,
            timer: PhaseTimer::new(),
            samples_encoded: 0,
            encoded_length: 0,
            decoded: false,
            mismatches: Vec::new(),
        }
    }

    /// Decode `message`, then fetch and validate the output against `original`
    fn finish_message(
        &mut self,
        registry: &mut SessionRegistry,
        message: &EncodedMessage,
        original: &SampleBuffer,
    ) -> Result<()> {
        self.encoded_length = message.len();
        debug!(
            "stream {}: {} samples encoded into {} bytes",
            self.id,
            self.samples_encoded,
            message.len()
        );

        self.timer.mark_decode_start();
        let decoded = registry.decode(self.id, message);
        self.timer.mark_decode_end();

        match decoded {
            Ok(()) => {
                self.decoded = true;
                let mut output = SampleBuffer::allocate(
                    self.config.channel_count,
                    self.config.samples_per_message,
                );
                registry.get_decoded(self.id, &mut output)?;
                self.mismatches = compare(original, &output);
                for mismatch in &self.mismatches {
                    error!("stream {}: {}", self.id, mismatch);
                }
            }
            Err(e) => warn!("stream {}: decode failed: {}", self.id, e),
        }
        Ok(())
    }

    fn into_report(mut self) -> RunReport {
        self.timer.mark_processed_end();
        self.timer.mark_end();

        let report = RunReport {
            mode: self.mode,
            stream_id: self.id,
            samples_encoded: self.samples_encoded,
            encoded_length: self.encoded_length,
            compression_ratio: compression_ratio(
                self.encoded_length,
                self.config.channel_count,
                self.config.samples_per_message,
            ),
            decoded: self.decoded,
            mismatches: self.mismatches,
            timings: self.timer.timings(),
        };
        info!(
            "stream {}: {} run finished, decoded={}, mismatches={}",
            report.stream_id,
            match report.mode {
                RunMode::Bulk => "bulk",
                RunMode::Incremental => "incremental",
            },
            report.decoded,
            report.mismatches.len()
        );
        report
    }
}
