// Slipstream FFI - C bindings
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! C/C++ bindings for the Slipstream codec
//!
//! This crate exposes a [`SessionRegistry`] behind an opaque handle so C and
//! C++ hosts can drive encoder and decoder sessions.
//!
//! # Safety
//!
//! All functions in this module use raw pointers.
//! Callers must ensure:
//! - Pointers are valid and non-null (unless documented otherwise)
//! - Stream identities point at 16 readable bytes
//! - Every sample's `values` and `qualities` point at `channel_count` elements
//! - Handles and buffers are not used after being freed
//! - A registry is used from one thread at a time

use std::ffi::c_char;
use std::ptr;
use std::slice;

use log::debug;
use slipstream::{
    DecodeError, EncodeError, EncodedMessage, SampleBuffer, SampleRef, SessionError,
    SessionRegistry, SlipstreamError, StreamConfig, StreamId,
};

/// Result codes for Slipstream FFI functions
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlipstreamResult {
    /// Operation completed successfully
    Ok = 0,
    /// Null pointer was provided
    ErrorNullPointer = 1,
    /// Invalid stream configuration or codec options
    ErrorInvalidConfig = 2,
    /// Sample width or buffer length does not fit the stream
    ErrorInvalidInput = 3,
    /// Encoding operation failed
    ErrorEncodingFailed = 4,
    /// Message could not be decoded
    ErrorDecodingFailed = 5,
    /// A session already exists for the identity
    ErrorSessionExists = 6,
    /// No session exists for the identity
    ErrorSessionNotFound = 7,
    /// Encoder and decoder configurations differ
    ErrorConfigMismatch = 8,
    /// No decoded message is available
    ErrorNoOutput = 9,
}

/// One sample as laid out by C callers
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SlipstreamSample {
    /// Sample timestamp
    pub t: u64,
    /// `channel_count` values
    pub values: *mut i32,
    /// `channel_count` quality words
    pub qualities: *mut u32,
}

/// Encoded bytes owned by the caller until `slipstream_buffer_free()`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SlipstreamBuffer {
    /// Encoded bytes, NULL when no message completed
    pub data: *mut u8,
    /// Length of `data` in bytes, 0 when no message completed
    pub len: usize,
}

impl SlipstreamBuffer {
    fn empty() -> Self {
        Self {
            data: ptr::null_mut(),
            len: 0,
        }
    }

    fn from_message(message: EncodedMessage) -> Self {
        let bytes = message.into_vec().into_boxed_slice();
        let len = bytes.len();
        Self {
            data: Box::into_raw(bytes) as *mut u8,
            len,
        }
    }
}

/// Opaque registry handle
///
/// Created with `slipstream_registry_new()`, freed with
/// `slipstream_registry_free()`. Do not access internal fields directly.
pub struct SlipstreamRegistry {
    sessions: SessionRegistry,
}

impl From<&SlipstreamError> for SlipstreamResult {
    fn from(error: &SlipstreamError) -> Self {
        match error {
            SlipstreamError::Config(_) => SlipstreamResult::ErrorInvalidConfig,
            SlipstreamError::Encode(EncodeError::ChannelCount { .. })
            | SlipstreamError::Encode(EncodeError::RaggedSample { .. })
            | SlipstreamError::Encode(EncodeError::BufferOverflow { .. }) => {
                SlipstreamResult::ErrorInvalidInput
            }
            SlipstreamError::Encode(_) => SlipstreamResult::ErrorEncodingFailed,
            SlipstreamError::Decode(DecodeError::NoOutput) => SlipstreamResult::ErrorNoOutput,
            SlipstreamError::Decode(DecodeError::OutputShape { .. }) => {
                SlipstreamResult::ErrorInvalidInput
            }
            SlipstreamError::Decode(_) => SlipstreamResult::ErrorDecodingFailed,
            SlipstreamError::Session(SessionError::NotFound { .. }) => {
                SlipstreamResult::ErrorSessionNotFound
            }
            SlipstreamError::Session(SessionError::EncoderExists(_))
            | SlipstreamError::Session(SessionError::DecoderExists(_)) => {
                SlipstreamResult::ErrorSessionExists
            }
            SlipstreamError::Session(SessionError::ConfigMismatch(_)) => {
                SlipstreamResult::ErrorConfigMismatch
            }
        }
    }
}

fn report(function: &str, error: SlipstreamError) -> SlipstreamResult {
    debug!("{}: {}", function, error);
    SlipstreamResult::from(&error)
}

/// Read a 16-byte identity
///
/// # Safety
///
/// `id` must be non-null and point at 16 readable bytes.
unsafe fn read_id(id: *const u8) -> StreamId {
    let mut bytes = [0u8; 16];
    ptr::copy_nonoverlapping(id, bytes.as_mut_ptr(), 16);
    StreamId::from_bytes(bytes)
}

/// Borrow a C sample as a [`SampleRef`]
///
/// # Safety
///
/// `sample.values` and `sample.qualities` must point at `channels` elements
/// that stay valid for the returned lifetime.
unsafe fn sample_ref<'a>(sample: &SlipstreamSample, channels: usize) -> Option<SampleRef<'a>> {
    if sample.values.is_null() || sample.qualities.is_null() {
        return None;
    }
    Some(SampleRef::new(
        sample.t,
        slice::from_raw_parts(sample.values, channels),
        slice::from_raw_parts(sample.qualities, channels),
    ))
}

// ============================================================================
// Version and Utility Functions
// ============================================================================

/// Get the Slipstream library version string
///
/// # Returns
///
/// A null-terminated string containing the version (e.g., "0.3.0").
/// The returned pointer is valid for the lifetime of the program.
///
/// # Example (C)
///
/// ```c
/// printf("Slipstream version: %s\n", slipstream_version());
/// ```
#[no_mangle]
pub extern "C" fn slipstream_version() -> *const c_char {
    static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
    VERSION.as_ptr() as *const c_char
}

/// Convert a result code to a human-readable string
///
/// The returned pointer is valid for the lifetime of the program.
#[no_mangle]
pub extern "C" fn slipstream_result_to_string(result: SlipstreamResult) -> *const c_char {
    let msg: &'static [u8] = match result {
        SlipstreamResult::Ok => b"Success\0",
        SlipstreamResult::ErrorNullPointer => b"Null pointer provided\0",
        SlipstreamResult::ErrorInvalidConfig => b"Invalid stream configuration\0",
        SlipstreamResult::ErrorInvalidInput => b"Invalid input data\0",
        SlipstreamResult::ErrorEncodingFailed => b"Encoding failed\0",
        SlipstreamResult::ErrorDecodingFailed => b"Decoding failed\0",
        SlipstreamResult::ErrorSessionExists => b"Session already exists\0",
        SlipstreamResult::ErrorSessionNotFound => b"Session not found\0",
        SlipstreamResult::ErrorConfigMismatch => b"Configuration mismatch\0",
        SlipstreamResult::ErrorNoOutput => b"No decoded output available\0",
    };
    msg.as_ptr() as *const c_char
}

// ============================================================================
// Registry Functions
// ============================================================================

/// Create a new session registry
///
/// The registry must be freed with `slipstream_registry_free()`.
#[no_mangle]
pub extern "C" fn slipstream_registry_new() -> *mut SlipstreamRegistry {
    Box::into_raw(Box::new(SlipstreamRegistry {
        sessions: SessionRegistry::new(),
    }))
}

/// Free a registry and every session it holds
///
/// `registry` may be NULL (no-op). It must not be used afterwards.
#[no_mangle]
pub extern "C" fn slipstream_registry_free(registry: *mut SlipstreamRegistry) {
    if !registry.is_null() {
        unsafe {
            drop(Box::from_raw(registry));
        }
    }
}

fn stream_config(
    channel_count: u32,
    sampling_rate: u32,
    samples_per_message: u32,
) -> Result<StreamConfig, SlipstreamError> {
    Ok(StreamConfig::new(
        channel_count as usize,
        sampling_rate,
        samples_per_message as usize,
    )?)
}

/// Create an encoder session
///
/// # Arguments
///
/// * `registry` - Registry handle
/// * `id` - Pointer to the 16-byte stream identity
/// * `channel_count` - Values per sample
/// * `sampling_rate` - Samples per second
/// * `samples_per_message` - Samples per encoded message
#[no_mangle]
pub extern "C" fn slipstream_encoder_new(
    registry: *mut SlipstreamRegistry,
    id: *const u8,
    channel_count: u32,
    sampling_rate: u32,
    samples_per_message: u32,
) -> SlipstreamResult {
    if registry.is_null() || id.is_null() {
        return SlipstreamResult::ErrorNullPointer;
    }
    let reg = unsafe { &mut *registry };
    let id = unsafe { read_id(id) };

    let result = stream_config(channel_count, sampling_rate, samples_per_message)
        .and_then(|config| reg.sessions.create_encoder(id, config));
    match result {
        Ok(()) => SlipstreamResult::Ok,
        Err(e) => report("slipstream_encoder_new", e),
    }
}

/// Create a decoder session
///
/// Arguments as for `slipstream_encoder_new()`.
#[no_mangle]
pub extern "C" fn slipstream_decoder_new(
    registry: *mut SlipstreamRegistry,
    id: *const u8,
    channel_count: u32,
    sampling_rate: u32,
    samples_per_message: u32,
) -> SlipstreamResult {
    if registry.is_null() || id.is_null() {
        return SlipstreamResult::ErrorNullPointer;
    }
    let reg = unsafe { &mut *registry };
    let id = unsafe { read_id(id) };

    let result = stream_config(channel_count, sampling_rate, samples_per_message)
        .and_then(|config| reg.sessions.create_decoder(id, config));
    match result {
        Ok(()) => SlipstreamResult::Ok,
        Err(e) => report("slipstream_decoder_new", e),
    }
}

/// Remove an encoder session, discarding any pending samples
#[no_mangle]
pub extern "C" fn slipstream_encoder_remove(
    registry: *mut SlipstreamRegistry,
    id: *const u8,
) -> SlipstreamResult {
    if registry.is_null() || id.is_null() {
        return SlipstreamResult::ErrorNullPointer;
    }
    let reg = unsafe { &mut *registry };
    let id = unsafe { read_id(id) };

    match reg.sessions.release_encoder(id) {
        Ok(()) => SlipstreamResult::Ok,
        Err(e) => report("slipstream_encoder_remove", e),
    }
}

/// Remove a decoder session
#[no_mangle]
pub extern "C" fn slipstream_decoder_remove(
    registry: *mut SlipstreamRegistry,
    id: *const u8,
) -> SlipstreamResult {
    if registry.is_null() || id.is_null() {
        return SlipstreamResult::ErrorNullPointer;
    }
    let reg = unsafe { &mut *registry };
    let id = unsafe { read_id(id) };

    match reg.sessions.release_decoder(id) {
        Ok(()) => SlipstreamResult::Ok,
        Err(e) => report("slipstream_decoder_remove", e),
    }
}

// ============================================================================
// Encoder Functions
// ============================================================================

fn write_output(output: *mut SlipstreamBuffer, message: Option<EncodedMessage>) {
    let buffer = match message {
        Some(message) => SlipstreamBuffer::from_message(message),
        None => SlipstreamBuffer::empty(),
    };
    unsafe {
        *output = buffer;
    }
}

/// Encode one sample
///
/// On success `output` receives the completed message, or an empty buffer
/// (`data` NULL, `len` 0) while the message is still incomplete.
///
/// # Example (C)
///
/// ```c
/// SlipstreamBuffer out;
/// if (slipstream_encode(reg, id, &samples[s], &out) == Ok && out.len > 0) {
///     slipstream_decode(reg, id, out.data, out.len);
///     slipstream_buffer_free(&out);
/// }
/// ```
#[no_mangle]
pub extern "C" fn slipstream_encode(
    registry: *mut SlipstreamRegistry,
    id: *const u8,
    sample: *const SlipstreamSample,
    output: *mut SlipstreamBuffer,
) -> SlipstreamResult {
    if registry.is_null() || id.is_null() || sample.is_null() || output.is_null() {
        return SlipstreamResult::ErrorNullPointer;
    }
    let reg = unsafe { &mut *registry };
    let id = unsafe { read_id(id) };

    let channels = match reg.sessions.encoder(id) {
        Ok(encoder) => encoder.config().channel_count,
        Err(e) => return report("slipstream_encode", e),
    };
    let sample = match unsafe { sample_ref(&*sample, channels) } {
        Some(sample) => sample,
        None => return SlipstreamResult::ErrorNullPointer,
    };

    match reg.sessions.encode_one(id, sample) {
        Ok(message) => {
            write_output(output, message);
            SlipstreamResult::Ok
        }
        Err(e) => report("slipstream_encode", e),
    }
}

/// Encode `count` samples
///
/// `count` may not exceed the room left in the pending message. On success
/// `output` receives the completed message or an empty buffer.
#[no_mangle]
pub extern "C" fn slipstream_encode_all(
    registry: *mut SlipstreamRegistry,
    id: *const u8,
    samples: *const SlipstreamSample,
    count: usize,
    output: *mut SlipstreamBuffer,
) -> SlipstreamResult {
    if registry.is_null() || id.is_null() || output.is_null() || (samples.is_null() && count > 0) {
        return SlipstreamResult::ErrorNullPointer;
    }
    let reg = unsafe { &mut *registry };
    let id = unsafe { read_id(id) };

    let channels = match reg.sessions.encoder(id) {
        Ok(encoder) => encoder.config().channel_count,
        Err(e) => return report("slipstream_encode_all", e),
    };

    let mut buffer = SampleBuffer::with_capacity(channels, count);
    if count > 0 {
        let samples = unsafe { slice::from_raw_parts(samples, count) };
        for sample in samples {
            let sample = match unsafe { sample_ref(sample, channels) } {
                Some(sample) => sample,
                None => return SlipstreamResult::ErrorNullPointer,
            };
            if let Err(e) = buffer.push(sample) {
                return report("slipstream_encode_all", e.into());
            }
        }
    }

    match reg.sessions.encode_all(id, &buffer) {
        Ok(message) => {
            write_output(output, message);
            SlipstreamResult::Ok
        }
        Err(e) => report("slipstream_encode_all", e),
    }
}

/// Finish the pending message early
///
/// `output` receives an empty buffer if nothing was pending.
#[no_mangle]
pub extern "C" fn slipstream_end_encode(
    registry: *mut SlipstreamRegistry,
    id: *const u8,
    output: *mut SlipstreamBuffer,
) -> SlipstreamResult {
    if registry.is_null() || id.is_null() || output.is_null() {
        return SlipstreamResult::ErrorNullPointer;
    }
    let reg = unsafe { &mut *registry };
    let id = unsafe { read_id(id) };

    match reg.sessions.end_encode(id) {
        Ok(message) => {
            write_output(output, message);
            SlipstreamResult::Ok
        }
        Err(e) => report("slipstream_end_encode", e),
    }
}

/// Free a buffer returned by an encode function
///
/// `buffer` may be NULL, and its `data` may be NULL (no-op). The buffer is
/// reset to empty so a repeated call is harmless.
#[no_mangle]
pub extern "C" fn slipstream_buffer_free(buffer: *mut SlipstreamBuffer) {
    if buffer.is_null() {
        return;
    }
    let buf = unsafe { &mut *buffer };
    if !buf.data.is_null() {
        unsafe {
            drop(Box::from_raw(ptr::slice_from_raw_parts_mut(buf.data, buf.len)));
        }
    }
    *buf = SlipstreamBuffer::empty();
}

// ============================================================================
// Decoder Functions
// ============================================================================

/// Decode one message
#[no_mangle]
pub extern "C" fn slipstream_decode(
    registry: *mut SlipstreamRegistry,
    id: *const u8,
    data: *const u8,
    len: usize,
) -> SlipstreamResult {
    if registry.is_null() || id.is_null() || (data.is_null() && len > 0) {
        return SlipstreamResult::ErrorNullPointer;
    }
    let reg = unsafe { &mut *registry };
    let id = unsafe { read_id(id) };
    let message: &[u8] = if len == 0 {
        &[]
    } else {
        unsafe { slice::from_raw_parts(data, len) }
    };

    match reg.sessions.decode(id, message) {
        Ok(()) => SlipstreamResult::Ok,
        Err(e) => report("slipstream_decode", e),
    }
}

/// Copy the last decoded message into `count` caller samples
///
/// `count` must equal the stream's samples per message. Samples beyond the
/// decoded length of an early-ended message are left untouched.
#[no_mangle]
pub extern "C" fn slipstream_get_decoded(
    registry: *mut SlipstreamRegistry,
    id: *const u8,
    samples: *mut SlipstreamSample,
    count: usize,
) -> SlipstreamResult {
    if registry.is_null() || id.is_null() || samples.is_null() {
        return SlipstreamResult::ErrorNullPointer;
    }
    let reg = unsafe { &*registry };
    let id = unsafe { read_id(id) };

    let config = match reg.sessions.decoder(id) {
        Ok(decoder) => *decoder.config(),
        Err(e) => return report("slipstream_get_decoded", e),
    };
    if count != config.samples_per_message {
        debug!(
            "slipstream_get_decoded: {} samples requested, stream has {}",
            count, config.samples_per_message
        );
        return SlipstreamResult::ErrorInvalidInput;
    }

    let mut output = SampleBuffer::allocate(config.channel_count, count);
    let decoded = match reg.sessions.get_decoded(id, &mut output) {
        Ok(n) => n,
        Err(e) => return report("slipstream_get_decoded", e),
    };

    let targets = unsafe { slice::from_raw_parts_mut(samples, count) };
    for (s, target) in targets.iter_mut().take(decoded).enumerate() {
        if let Err(result) = copy_sample(&output, s, target) {
            return result;
        }
    }
    SlipstreamResult::Ok
}

/// Copy decoded sample `index` into one caller sample
#[no_mangle]
pub extern "C" fn slipstream_get_decoded_index(
    registry: *mut SlipstreamRegistry,
    id: *const u8,
    index: usize,
    sample: *mut SlipstreamSample,
) -> SlipstreamResult {
    if registry.is_null() || id.is_null() || sample.is_null() {
        return SlipstreamResult::ErrorNullPointer;
    }
    let reg = unsafe { &*registry };
    let id = unsafe { read_id(id) };

    let decoder = match reg.sessions.decoder(id) {
        Ok(decoder) => decoder,
        Err(e) => return report("slipstream_get_decoded_index", e),
    };
    if decoder.decoded_samples().is_none() {
        return SlipstreamResult::ErrorNoOutput;
    }
    let source = match decoder.sample(index) {
        Some(source) => source,
        None => return SlipstreamResult::ErrorInvalidInput,
    };

    let target = unsafe { &mut *sample };
    if target.values.is_null() || target.qualities.is_null() {
        return SlipstreamResult::ErrorNullPointer;
    }
    let channels = source.channel_count();
    target.t = source.timestamp;
    unsafe {
        slice::from_raw_parts_mut(target.values, channels).copy_from_slice(source.values);
        slice::from_raw_parts_mut(target.qualities, channels).copy_from_slice(source.qualities);
    }
    SlipstreamResult::Ok
}

fn copy_sample(
    output: &SampleBuffer,
    index: usize,
    target: &mut SlipstreamSample,
) -> Result<(), SlipstreamResult> {
    if target.values.is_null() || target.qualities.is_null() {
        return Err(SlipstreamResult::ErrorNullPointer);
    }
    let channels = output.channel_count();
    target.t = output.timestamp(index);
    unsafe {
        slice::from_raw_parts_mut(target.values, channels).copy_from_slice(output.values(index));
        slice::from_raw_parts_mut(target.qualities, channels)
            .copy_from_slice(output.qualities(index));
    }
    Ok(())
}

// ============================================================================
// Sample Storage
// ============================================================================

/// Allocate `count` samples of `channel_count` zeroed channels
///
/// Timestamps are `0..count`. The array must be freed with
/// `slipstream_samples_free()` using the same `channel_count` and `count`.
/// Returns NULL when `count` is 0.
#[no_mangle]
pub extern "C" fn slipstream_samples_alloc(
    channel_count: usize,
    count: usize,
) -> *mut SlipstreamSample {
    if count == 0 {
        return ptr::null_mut();
    }
    let samples: Box<[SlipstreamSample]> = (0..count)
        .map(|s| SlipstreamSample {
            t: s as u64,
            values: Box::into_raw(vec![0i32; channel_count].into_boxed_slice()) as *mut i32,
            qualities: Box::into_raw(vec![0u32; channel_count].into_boxed_slice()) as *mut u32,
        })
        .collect();
    Box::into_raw(samples) as *mut SlipstreamSample
}

/// Free samples from `slipstream_samples_alloc()`
///
/// `samples` may be NULL (no-op). Each array must be freed exactly once.
#[no_mangle]
pub extern "C" fn slipstream_samples_free(
    samples: *mut SlipstreamSample,
    channel_count: usize,
    count: usize,
) {
    if samples.is_null() {
        return;
    }
    unsafe {
        let samples = Box::from_raw(ptr::slice_from_raw_parts_mut(samples, count));
        for sample in samples.iter() {
            if !sample.values.is_null() {
                drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
                    sample.values,
                    channel_count,
                )));
            }
            if !sample.qualities.is_null() {
                drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
                    sample.qualities,
                    channel_count,
                )));
            }
        }
    }
}
