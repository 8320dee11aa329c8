//! End-to-end tests of the session registry

use slipstream::*;

const FNOM: f64 = 50.01;

/// Sine waves with a per-channel phase, no noise
fn waveform(channels: usize, samples: usize, sampling_rate: u32) -> SampleBuffer {
    let mut buffer = SampleBuffer::allocate(channels, samples);
    for j in 0..samples {
        let t = j as f64 / sampling_rate as f64;
        for i in 0..channels {
            let phase = i as f64 * std::f64::consts::TAU / 3.0;
            let value = 500_000.0 * (std::f64::consts::TAU * FNOM * t + phase).sin();
            buffer.values_mut(j)[i] = value as i32;
        }
    }
    buffer
}

fn setup(id: StreamId, config: StreamConfig) -> SessionRegistry {
    let mut registry = SessionRegistry::new();
    registry.create_encoder(id, config).unwrap();
    registry.create_decoder(id, config).unwrap();
    registry
}

#[test]
fn boundary_scenario_bulk() {
    let id = StreamId::nil();
    let config = StreamConfig::default();
    let mut registry = setup(id, config);

    let input = waveform(8, 4000, 4000);
    let message = registry.encode_all(id, &input).unwrap().unwrap();
    assert!(!message.is_empty());

    registry.decode(id, &message).unwrap();
    let mut output = SampleBuffer::allocate(8, 4000);
    assert_eq!(registry.get_decoded(id, &mut output).unwrap(), 4000);
    assert_eq!(output, input);

    let ratio = compression_ratio(message.len(), 8, 4000);
    assert!(ratio > 0.0 && ratio < 1.0, "ratio {}", ratio);

    registry.release_encoder(id).unwrap();
    registry.release_decoder(id).unwrap();
}

#[test]
fn bulk_and_incremental_messages_identical() {
    let config = StreamConfig::default();
    let bulk_id = StreamId::nil();
    let inc_id = StreamId::nil();
    let mut bulk = setup(bulk_id, config);
    let mut inc = setup(inc_id, config);

    let mut input = waveform(8, 4000, 4000);
    input.qualities_mut(2)[0] = 0x01;
    input.qualities_mut(3)[0] = 0x41;

    let from_bulk = bulk.encode_all(bulk_id, &input).unwrap().unwrap();

    let mut from_inc = None;
    for (j, sample) in input.iter().enumerate() {
        let message = inc.encode_one(inc_id, sample).unwrap();
        if j + 1 < input.len() {
            assert!(message.is_none(), "early message at sample {}", j);
        } else {
            from_inc = message;
        }
    }

    assert_eq!(from_inc.as_ref(), Some(&from_bulk));
}

#[test]
fn completion_every_message() {
    let id = StreamId::from_bytes([2, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 5]);
    let config = StreamConfig::new(3, 4000, 25).unwrap();
    let mut registry = setup(id, config);
    let input = waveform(3, 100, 4000);

    let mut completed = Vec::new();
    for (j, sample) in input.iter().enumerate() {
        if let Some(message) = registry.encode_one(id, sample).unwrap() {
            completed.push((j, message));
        }
    }
    let at: Vec<usize> = completed.iter().map(|(j, _)| *j).collect();
    assert_eq!(at, vec![24, 49, 74, 99]);

    let mut output = SampleBuffer::allocate(3, 25);
    for (k, (_, message)) in completed.iter().enumerate() {
        registry.decode(id, message).unwrap();
        registry.get_decoded(id, &mut output).unwrap();
        for j in 0..25 {
            assert_eq!(output.values(j), input.values(k * 25 + j));
            assert_eq!(output.timestamp(j), (k * 25 + j) as u64);
        }
    }
}

#[test]
fn gzip_path_above_threshold() {
    let id = StreamId::nil();
    let config = StreamConfig::new(2, 8000, 5000).unwrap();
    let mut registry = setup(id, config);

    let input = waveform(2, 5000, 8000);
    let message = registry.encode_all(id, &input).unwrap().unwrap();
    // gzip magic follows the 24-byte prefix and the two-byte count varint
    assert_eq!(&message[26..28], &[0x1f, 0x8b]);

    registry.decode(id, &message).unwrap();
    let mut output = SampleBuffer::allocate(2, 5000);
    registry.get_decoded(id, &mut output).unwrap();
    assert_eq!(output, input);
}

#[test]
fn gzip_message_with_trailing_bytes_rejected() {
    let id = StreamId::nil();
    let config = StreamConfig::new(1, 4000, 5000).unwrap();
    let mut registry = setup(id, config);

    let input = SampleBuffer::allocate(1, 5000);
    let message = registry.encode_all(id, &input).unwrap().unwrap();
    let mut padded = message.to_vec();
    padded.extend_from_slice(b"GARBAGE-TRAILER");

    let result = registry.decode(id, &padded);
    assert!(matches!(
        result,
        Err(SlipstreamError::Decode(DecodeError::MalformedMessage { offset, .. }))
            if offset == message.len()
    ));

    registry.decode(id, &message).unwrap();
    let mut output = SampleBuffer::allocate(1, 5000);
    assert_eq!(registry.get_decoded(id, &mut output).unwrap(), 5000);
}

#[test]
fn gzip_payload_size_is_bounded() {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let id = StreamId::nil();
    let config = StreamConfig::new(1, 4000, 5000).unwrap();
    let mut registry = setup(id, config);

    // Header for 4097 samples, then far more zeros than 4097 values can need
    let mut message = vec![0u8; 24];
    slipstream::varint::put_varint32(&mut message, 4097);
    let mut gz = GzEncoder::new(Vec::new(), Compression::best());
    gz.write_all(&vec![0u8; 4 << 20]).unwrap();
    message.extend_from_slice(&gz.finish().unwrap());

    let result = registry.decode(id, &message);
    assert!(matches!(
        result,
        Err(SlipstreamError::Decode(DecodeError::Decompression(_)))
    ));
    let mut output = SampleBuffer::allocate(1, 5000);
    assert!(registry.get_decoded(id, &mut output).is_err());
}

#[test]
fn spatial_references_roundtrip() {
    let id = StreamId::nil();
    let config = StreamConfig::new(16, 4000, 400).unwrap();
    let options = CodecOptions::new().with_spatial_refs(16, 2, 2, true);

    let mut registry = SessionRegistry::new();
    registry
        .create_encoder_with_options(id, config, options.clone())
        .unwrap();
    registry
        .create_decoder_with_options(id, config, options)
        .unwrap();

    let input = waveform(16, 400, 4000);
    let message = registry.encode_all(id, &input).unwrap().unwrap();
    registry.decode(id, &message).unwrap();
    let mut output = SampleBuffer::allocate(16, 400);
    registry.get_decoded(id, &mut output).unwrap();
    assert_eq!(output, input);
}

#[test]
fn xor_deltas_roundtrip() {
    let id = StreamId::nil();
    let config = StreamConfig::new(4, 4000, 200).unwrap();
    let options = CodecOptions::new().with_xor(true).with_delta_layers(1);

    let mut registry = SessionRegistry::new();
    registry
        .create_encoder_with_options(id, config, options.clone())
        .unwrap();
    registry
        .create_decoder_with_options(id, config, options)
        .unwrap();

    let input = waveform(4, 200, 4000);
    let message = registry.encode_all(id, &input).unwrap().unwrap();
    registry.decode(id, &message).unwrap();
    let mut output = SampleBuffer::allocate(4, 200);
    registry.get_decoded(id, &mut output).unwrap();
    assert_eq!(output, input);
}

#[test]
fn extreme_values_roundtrip() {
    let id = StreamId::nil();
    for spm in [8, 64] {
        let config = StreamConfig::new(2, 4000, spm).unwrap();
        let mut registry = setup(id, config);

        let mut input = SampleBuffer::allocate(2, spm);
        for j in 0..spm {
            let v = if j % 2 == 0 { i32::MAX } else { i32::MIN };
            input.values_mut(j).copy_from_slice(&[v, v.wrapping_neg()]);
            input.qualities_mut(j).copy_from_slice(&[u32::MAX, j as u32]);
        }
        let message = registry.encode_all(id, &input).unwrap().unwrap();
        registry.decode(id, &message).unwrap();
        let mut output = SampleBuffer::allocate(2, spm);
        registry.get_decoded(id, &mut output).unwrap();
        assert_eq!(output, input);
    }
}

#[test]
fn invalid_input_blocks_output_until_valid_cycle() {
    let id = StreamId::nil();
    let config = StreamConfig::new(8, 4000, 100).unwrap();
    let mut registry = setup(id, config);
    let mut output = SampleBuffer::allocate(8, 100);

    let input = waveform(8, 100, 4000);
    let message = registry.encode_all(id, &input).unwrap().unwrap();
    registry.decode(id, &message).unwrap();
    registry.get_decoded(id, &mut output).unwrap();

    for bad in [&message[..0], &message[..10], &message[..message.len() / 2]] {
        assert!(registry.decode(id, bad).is_err());
        assert!(registry.get_decoded(id, &mut output).is_err());
    }

    let mut corrupted = message.clone().into_vec();
    corrupted[0] ^= 0xFF;
    assert!(matches!(
        registry.decode(id, &corrupted),
        Err(SlipstreamError::Decode(DecodeError::StreamMismatch { .. }))
    ));

    registry.decode(id, &message).unwrap();
    assert!(registry.get_decoded(id, &mut output).is_ok());
}

#[test]
fn compression_metrics_over_messages() {
    let id = StreamId::nil();
    let config = StreamConfig::new(8, 4000, 500).unwrap();
    let mut registry = setup(id, config);
    let input = waveform(8, 2000, 4000);

    let mut metrics = CompressionMetrics::new();
    for sample in input.iter() {
        if let Some(message) = registry.encode_one(id, sample).unwrap() {
            metrics.record_message(message.len(), 8, 500);
        }
    }
    assert_eq!(metrics.message_count, 4);
    assert_eq!(metrics.sample_count, 2000);
    assert!(metrics.compression_ratio() < 1.0);
}
