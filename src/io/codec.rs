//! Attribute value codecs
//!
//! The world model carries attribute values as opaque byte strings. Booleans
//! are a single byte, 0x00 = false and 0x01 = true. Anything else is a decode
//! error so a corrupted payload is skipped rather than silently coerced.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("boolean payload has {0} bytes, expected 1")]
    BadLength(usize),
    #[error("boolean payload byte {0:#04x} is neither 0 nor 1")]
    BadByte(u8),
}

/// Encode a boolean as a one-byte payload
pub fn encode_boolean(value: bool) -> Vec<u8> {
    vec![u8::from(value)]
}

/// Decode a one-byte boolean payload
pub fn decode_boolean(raw: &[u8]) -> Result<bool, CodecError> {
    match raw {
        [0] => Ok(false),
        [1] => Ok(true),
        [b] => Err(CodecError::BadByte(*b)),
        _ => Err(CodecError::BadLength(raw.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_encoding() {
        assert_eq!(encode_boolean(true), vec![1]);
        assert_eq!(encode_boolean(false), vec![0]);
        assert_eq!(decode_boolean(&[1]), Ok(true));
        assert_eq!(decode_boolean(&[0]), Ok(false));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(decode_boolean(&[]), Err(CodecError::BadLength(0)));
        assert_eq!(decode_boolean(&[1, 0]), Err(CodecError::BadLength(2)));
        assert_eq!(decode_boolean(&[0x42]), Err(CodecError::BadByte(0x42)));
    }
}
