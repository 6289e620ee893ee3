//! Primitive BEJ value encodings: Integer, Boolean, String, Enum, Real,
//! ResourceLink, Null.

use rde_nnint::{self as nnint, NnintError};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("truncated value: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("invalid boolean byte {0:#04x}")]
    InvalidBoolean(u8),
    #[error("string value is missing its NUL terminator")]
    MissingNulTerminator,
    #[error("string value is not valid UTF-8")]
    InvalidUtf8,
    #[error(transparent)]
    Nnint(#[from] NnintError),
}

/// Minimal two's-complement little-endian bytes for `value`, padding with a
/// leading zero byte when the natural minimal encoding would flip the sign
/// (i.e. the top bit of the highest retained byte is set but `value >= 0`).
#[must_use]
pub fn pack_integer(value: i64) -> Vec<u8> {
    let full = value.to_le_bytes();
    let mut len = full.len();
    while len > 1 {
        let msb = full[len - 1];
        let next_msb = full[len - 2];
        let redundant =
            (msb == 0x00 && next_msb & 0x80 == 0) || (msb == 0xFF && next_msb & 0x80 != 0);
        if redundant {
            len -= 1;
        } else {
            break;
        }
    }
    full[..len].to_vec()
}

/// Parses a two's-complement little-endian integer of the given byte slice.
///
/// # Errors
///
/// Returns [`ValueError::Truncated`] if `bytes` is empty or wider than 8 bytes.
pub fn unpack_integer(bytes: &[u8]) -> Result<i64, ValueError> {
    if bytes.is_empty() || bytes.len() > 8 {
        return Err(ValueError::Truncated {
            expected: 1,
            actual: bytes.len(),
        });
    }
    let sign_byte = if bytes[bytes.len() - 1] & 0x80 != 0 {
        0xFF
    } else {
        0x00
    };
    let mut buf = [sign_byte; 8];
    buf[..bytes.len()].copy_from_slice(bytes);
    Ok(i64::from_le_bytes(buf))
}

#[must_use]
pub fn pack_boolean(value: bool) -> [u8; 1] {
    [u8::from(value)]
}

/// # Errors
///
/// Returns [`ValueError::InvalidBoolean`] if `byte` is neither 0x00 nor 0x01.
pub fn unpack_boolean(byte: u8) -> Result<bool, ValueError> {
    match byte {
        0x00 => Ok(false),
        0x01 => Ok(true),
        other => Err(ValueError::InvalidBoolean(other)),
    }
}

/// Packs a string value as UTF-8 bytes followed by a single NUL terminator.
/// Callers are responsible for escaping embedded `"` characters before
/// calling this (the wire format has no opinion on JSON quoting).
#[must_use]
pub fn pack_string(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len() + 1);
    out.extend_from_slice(value.as_bytes());
    out.push(0);
    out
}

/// # Errors
///
/// Returns [`ValueError::MissingNulTerminator`] if `bytes` does not end in a
/// NUL byte, or [`ValueError::InvalidUtf8`] if the remainder is not UTF-8.
pub fn unpack_string(bytes: &[u8]) -> Result<String, ValueError> {
    let (&last, body) = bytes
        .split_last()
        .ok_or(ValueError::MissingNulTerminator)?;
    if last != 0 {
        return Err(ValueError::MissingNulTerminator);
    }
    core::str::from_utf8(body)
        .map(str::to_owned)
        .map_err(|_| ValueError::InvalidUtf8)
}

/// Enum values are packed as the plain nnint sequence number of the chosen
/// member within the enum's dictionary sub-tree.
#[must_use]
pub fn pack_enum(value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    nnint::pack(&mut out, value);
    out
}

/// # Errors
///
/// Returns [`ValueError::Nnint`] if `bytes` is not a well-formed nnint.
pub fn unpack_enum(bytes: &[u8]) -> Result<u64, ValueError> {
    let (value, _) = nnint::unpack(bytes)?;
    Ok(value)
}

#[must_use]
pub fn pack_resource_link(pdr: u64) -> Vec<u8> {
    let mut out = Vec::new();
    nnint::pack(&mut out, pdr);
    out
}

/// # Errors
///
/// Returns [`ValueError::Nnint`] if `bytes` is not a well-formed nnint.
pub fn unpack_resource_link(bytes: &[u8]) -> Result<u64, ValueError> {
    let (value, _) = nnint::unpack(bytes)?;
    Ok(value)
}

/// Decomposed BEJ `Real` value: `whole.leading_zeros*0 + frac`, with an
/// optional base-10 exponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RealValue {
    pub whole: i64,
    pub leading_zero_count: u64,
    pub frac: u64,
    pub exponent: Option<i64>,
}

impl RealValue {
    #[must_use]
    pub fn integer(whole: i64) -> Self {
        Self {
            whole,
            leading_zero_count: 0,
            frac: 0,
            exponent: None,
        }
    }
}

/// Packs a [`RealValue`] as
/// `nnint whole_len | integer whole | nnint leading_zero_count | nnint frac | nnint exp_len | [integer exp]`.
#[must_use]
pub fn pack_real(value: RealValue) -> Vec<u8> {
    let whole_bytes = pack_integer(value.whole);
    let mut out = Vec::new();
    nnint::pack(&mut out, whole_bytes.len() as u64);
    out.extend_from_slice(&whole_bytes);
    nnint::pack(&mut out, value.leading_zero_count);
    nnint::pack(&mut out, value.frac);
    match value.exponent {
        None => {
            nnint::pack(&mut out, 0);
        }
        Some(exp) => {
            let exp_bytes = pack_integer(exp);
            nnint::pack(&mut out, exp_bytes.len() as u64);
            out.extend_from_slice(&exp_bytes);
        }
    }
    out
}

/// # Errors
///
/// Returns [`ValueError`] if `bytes` does not contain a well-formed `Real`
/// value encoding.
pub fn unpack_real(bytes: &[u8]) -> Result<RealValue, ValueError> {
    let mut offset = 0;
    let (whole_len, consumed) = nnint::unpack(&bytes[offset..])?;
    offset += consumed;
    let whole_len = whole_len as usize;
    let whole_bytes =
        bytes
            .get(offset..offset + whole_len)
            .ok_or(ValueError::Truncated {
                expected: whole_len,
                actual: bytes.len().saturating_sub(offset),
            })?;
    let whole = unpack_integer(whole_bytes)?;
    offset += whole_len;

    let (leading_zero_count, consumed) = nnint::unpack(&bytes[offset..])?;
    offset += consumed;

    let (frac, consumed) = nnint::unpack(&bytes[offset..])?;
    offset += consumed;

    let (exp_len, consumed) = nnint::unpack(&bytes[offset..])?;
    offset += consumed;
    let exp_len = exp_len as usize;
    let exponent = if exp_len == 0 {
        None
    } else {
        let exp_bytes = bytes
            .get(offset..offset + exp_len)
            .ok_or(ValueError::Truncated {
                expected: exp_len,
                actual: bytes.len().saturating_sub(offset),
            })?;
        Some(unpack_integer(exp_bytes)?)
    };

    Ok(RealValue {
        whole,
        leading_zero_count,
        frac,
        exponent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_boundary_128() {
        assert_eq!(pack_integer(128), vec![0x80, 0x00]);
    }

    #[test]
    fn integer_boundary_neg_one() {
        assert_eq!(pack_integer(-1), vec![0xFF]);
    }

    #[test]
    fn integer_boundary_zero() {
        assert_eq!(pack_integer(0), vec![0x00]);
    }

    #[test]
    fn integer_round_trip() {
        for v in [0i64, 1, -1, 127, 128, -128, -129, 32767, 32768, i64::MIN, i64::MAX] {
            let bytes = pack_integer(v);
            assert_eq!(unpack_integer(&bytes).unwrap(), v);
        }
    }

    #[test]
    fn string_round_trip() {
        let bytes = pack_string("hello");
        assert_eq!(bytes, b"hello\0");
        assert_eq!(unpack_string(&bytes).unwrap(), "hello");
    }

    #[test]
    fn string_missing_nul_errors() {
        assert_eq!(
            unpack_string(b"hello").unwrap_err(),
            ValueError::MissingNulTerminator
        );
    }

    #[test]
    fn boolean_round_trip() {
        assert!(unpack_boolean(pack_boolean(true)[0]).unwrap());
        assert!(!unpack_boolean(pack_boolean(false)[0]).unwrap());
    }

    #[test]
    fn real_round_trip_no_exponent() {
        let value = RealValue {
            whole: -3,
            leading_zero_count: 2,
            frac: 14,
            exponent: None,
        };
        let bytes = pack_real(value);
        assert_eq!(unpack_real(&bytes).unwrap(), value);
    }

    #[test]
    fn real_round_trip_with_exponent() {
        let value = RealValue {
            whole: 1,
            leading_zero_count: 0,
            frac: 5,
            exponent: Some(-2),
        };
        let bytes = pack_real(value);
        assert_eq!(unpack_real(&bytes).unwrap(), value);
    }
}
