//! Simple-8b word packing
//!
//! Each 64-bit word carries a 4-bit selector in its top bits and 60 bits of
//! payload. The selector fixes how many equally wide values share the
//! payload. Selectors 0 and 1 are run-length words of 240 and 120 zeros.
//!
//! Packing is greedy: at every position the densest selector whose slots
//! are all filled by upcoming values wins. A word never carries padding, so
//! a sequence of `n` values always decodes back to exactly `n` values.

use crate::error::{DecodeError, EncodeError};

/// Largest value that can be packed
pub const MAX_VALUE: u64 = (1 << 60) - 1;

/// Bytes per packed word
pub const WORD_SIZE: usize = 8;

/// (values per word, bits per value) indexed by selector
const SELECTORS: [(usize, u32); 16] = [
    (240, 0),
    (120, 0),
    (60, 1),
    (30, 2),
    (20, 3),
    (15, 4),
    (12, 5),
    (10, 6),
    (8, 7),
    (7, 8),
    (6, 10),
    (5, 12),
    (4, 15),
    (3, 20),
    (2, 30),
    (1, 60),
];

/// Pack `values`, appending big-endian words to `output`. Returns the word count.
pub fn encode(values: &[u64], output: &mut Vec<u8>) -> Result<usize, EncodeError> {
    let mut position = 0;
    let mut words = 0;

    while position < values.len() {
        let remaining = &values[position..];
        let (selector, count) = select(remaining)?;
        let (_, bits) = SELECTORS[selector];

        let mut word = (selector as u64) << 60;
        if bits > 0 {
            for (slot, &value) in remaining[..count].iter().enumerate() {
                word |= value << (slot as u32 * bits);
            }
        }

        output.extend_from_slice(&word.to_be_bytes());
        position += count;
        words += 1;
    }

    Ok(words)
}

/// Pick the densest selector for the head of `values`
fn select(values: &[u64]) -> Result<(usize, usize), EncodeError> {
    for (selector, &(count, bits)) in SELECTORS.iter().enumerate() {
        if values.len() < count {
            continue;
        }
        let limit = if bits == 0 { 0 } else { (1u64 << bits) - 1 };
        if values[..count].iter().all(|&v| v <= limit) {
            return Ok((selector, count));
        }
    }
    // Only reachable when the head value needs more than 60 bits
    Err(EncodeError::ValueTooLarge(values[0]))
}

/// Unpack exactly `count` values from the words at the start of `input`,
/// appending them to `output`. Returns the number of bytes consumed.
pub fn decode(input: &[u8], count: usize, output: &mut Vec<u64>) -> Result<usize, DecodeError> {
    let mut decoded = 0;
    let mut offset = 0;

    while decoded < count {
        let bytes = input
            .get(offset..offset + WORD_SIZE)
            .ok_or(DecodeError::BufferTooShort {
                needed: offset + WORD_SIZE,
                available: input.len(),
            })?;
        let mut raw = [0u8; WORD_SIZE];
        raw.copy_from_slice(bytes);
        let word = u64::from_be_bytes(raw);

        let (n, bits) = SELECTORS[(word >> 60) as usize];
        if decoded + n > count {
            return Err(DecodeError::MalformedMessage {
                offset,
                reason: format!(
                    "Simple-8b word holds {} values, only {} expected",
                    n,
                    count - decoded
                ),
            });
        }

        if bits == 0 {
            output.extend(std::iter::repeat(0).take(n));
        } else {
            let mask = (1u64 << bits) - 1;
            output.extend((0..n as u32).map(|slot| (word >> (slot * bits)) & mask));
        }

        decoded += n;
        offset += WORD_SIZE;
    }

    Ok(offset)
}
