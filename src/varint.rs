//! Varint encoding/decoding
//!
//! LEB128-style variable-length integers: 7 data bits per byte, MSB set
//! when more bytes follow. Signed values are zig-zag mapped first so small
//! magnitudes stay short.

use crate::error::DecodeError;

/// Longest encoding of a 32-bit value
pub const MAX_VARINT32_LEN: usize = 5;

/// Map a signed value onto an unsigned one: 0, -1, 1, -2, ... -> 0, 1, 2, 3, ...
#[inline]
pub fn zigzag_encode(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

/// Inverse of [`zigzag_encode`]
#[inline]
pub fn zigzag_decode(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

/// Append an unsigned varint
pub fn put_uvarint32(output: &mut Vec<u8>, value: u32) {
    let mut v = value;
    while v >= 0x80 {
        output.push((v as u8 & 0x7F) | 0x80);
        v >>= 7;
    }
    output.push(v as u8);
}

/// Append a zig-zag signed varint
pub fn put_varint32(output: &mut Vec<u8>, value: i32) {
    put_uvarint32(output, zigzag_encode(value));
}

/// Read an unsigned varint at `offset`, returning the value and bytes consumed
pub fn read_uvarint32(buffer: &[u8], offset: usize) -> Result<(u32, usize), DecodeError> {
    let mut result: u32 = 0;
    let mut shift = 0;
    let mut consumed = 0;

    loop {
        let position = offset + consumed;
        let byte = *buffer.get(position).ok_or(DecodeError::BufferTooShort {
            needed: position + 1,
            available: buffer.len(),
        })?;
        consumed += 1;

        if consumed == MAX_VARINT32_LEN && byte > 0x0F {
            return Err(DecodeError::MalformedMessage {
                offset: position,
                reason: "Varint overflows 32 bits".to_string(),
            });
        }

        result |= ((byte & 0x7F) as u32) << shift;
        if byte & 0x80 == 0 {
            return Ok((result, consumed));
        }
        shift += 7;
    }
}

/// Read a zig-zag signed varint at `offset`
pub fn read_varint32(buffer: &[u8], offset: usize) -> Result<(i32, usize), DecodeError> {
    let (value, consumed) = read_uvarint32(buffer, offset)?;
    Ok((zigzag_decode(value), consumed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zigzag() {
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_encode(-2), 3);
        assert_eq!(zigzag_encode(i32::MAX), u32::MAX - 1);
        assert_eq!(zigzag_encode(i32::MIN), u32::MAX);
        for v in [0, 1, -1, 1000, -65536, i32::MAX, i32::MIN] {
            assert_eq!(zigzag_decode(zigzag_encode(v)), v);
        }
    }

    #[test]
    fn test_varint_lengths() {
        let mut out = Vec::new();
        put_uvarint32(&mut out, 42);
        assert_eq!(out.len(), 1);

        out.clear();
        put_uvarint32(&mut out, 200);
        assert_eq!(out.len(), 2);

        out.clear();
        put_uvarint32(&mut out, u32::MAX);
        assert_eq!(out.len(), MAX_VARINT32_LEN);
        assert_eq!(read_uvarint32(&out, 0).unwrap(), (u32::MAX, 5));
    }

    #[test]
    fn test_read_at_offset() {
        let mut out = vec![0xAA];
        put_varint32(&mut out, -300);
        let (value, consumed) = read_varint32(&out, 1).unwrap();
        assert_eq!(value, -300);
        assert_eq!(consumed, out.len() - 1);
    }

    #[test]
    fn test_truncated_varint() {
        let result = read_uvarint32(&[0x80, 0x80], 0);
        assert_eq!(
            result,
            Err(DecodeError::BufferTooShort {
                needed: 3,
                available: 2
            })
        );
    }

    #[test]
    fn test_overlong_varint() {
        let result = read_uvarint32(&[0xFF, 0xFF, 0xFF, 0xFF, 0x7F], 0);
        assert!(matches!(result, Err(DecodeError::MalformedMessage { .. })));
    }
}
