//! Canonical encodings shared by storage keys and stored values.
//!
//! Round counters are persisted in the recursive-length-prefix form of an
//! unsigned integer: minimal big-endian bytes, a single byte below `0x80`
//! stands for itself, zero is the empty string (`0x80`), and anything else is
//! prefixed with `0x80 + len`. Decoding is strict: every value has exactly
//! one accepted encoding, otherwise two nodes could disagree on whether a
//! stored counter is valid.

/// Error type for decoding and parsing primitives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("invalid {what} length: expected {expected}, got {actual}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid {what} hex: {reason}")]
    InvalidHex { what: &'static str, reason: String },
    #[error("non-canonical integer encoding")]
    NonCanonical,
    #[error("integer does not fit in {0} bits")]
    Overflow(u32),
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
    #[error("invalid value: {0}")]
    InvalidValue(&'static str),
}

const EMPTY_STRING: u8 = 0x80;
const SHORT_STRING_MAX: u8 = 0xb7;

/// Encode a `u16` counter in canonical form.
pub fn encode_u16(value: u16) -> Vec<u8> {
    match value {
        0 => vec![EMPTY_STRING],
        1..=0x7f => vec![value as u8],
        0x80..=0xff => vec![EMPTY_STRING + 1, value as u8],
        _ => {
            let be = value.to_be_bytes();
            vec![EMPTY_STRING + 2, be[0], be[1]]
        }
    }
}

/// Decode a `u16` counter, rejecting any non-canonical form and trailing
/// bytes.
pub fn decode_u16(input: &[u8]) -> Result<u16, CodecError> {
    let (&tag, rest) = input.split_first().ok_or(CodecError::UnexpectedEof)?;

    if tag < EMPTY_STRING {
        if !rest.is_empty() {
            return Err(CodecError::TrailingBytes(rest.len()));
        }
        // A bare zero byte is the encoding of the byte string [0x00], not of
        // the integer zero.
        if tag == 0 {
            return Err(CodecError::NonCanonical);
        }
        return Ok(u16::from(tag));
    }

    if tag > SHORT_STRING_MAX {
        return Err(CodecError::InvalidValue("expected a string item"));
    }

    let len = usize::from(tag - EMPTY_STRING);
    if len > 2 {
        return Err(CodecError::Overflow(16));
    }
    if rest.len() < len {
        return Err(CodecError::UnexpectedEof);
    }
    if rest.len() > len {
        return Err(CodecError::TrailingBytes(rest.len() - len));
    }

    match len {
        0 => Ok(0),
        1 => {
            if rest[0] < EMPTY_STRING {
                return Err(CodecError::NonCanonical);
            }
            Ok(u16::from(rest[0]))
        }
        _ => {
            if rest[0] == 0 {
                return Err(CodecError::NonCanonical);
            }
            Ok(u16::from_be_bytes([rest[0], rest[1]]))
        }
    }
}

/// Append a `u64` in big-endian order (8 bytes).
pub fn put_u64_be(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_be_bytes());
}
