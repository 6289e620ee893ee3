//! Non-negative integer (nnint) codec used throughout BEJ.
//!
//! An nnint is encoded as a one-byte length prefix followed by that many
//! little-endian bytes: `len(1) | value(len bytes)`. `len` is always the
//! minimum number of bytes needed to hold `value` (one byte for zero).

use thiserror::Error;

/// Errors produced while unpacking an nnint from a byte stream.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NnintError {
    #[error("truncated nnint: expected length prefix byte")]
    MissingLengthByte,
    #[error("truncated nnint: expected {expected} value bytes, got {actual}")]
    TruncatedValue { expected: usize, actual: usize },
    #[error("nnint value does not fit in a u64 (needs {0} bytes)")]
    TooWide(usize),
}

/// Minimum number of bytes needed to hold `value` in little-endian form.
#[must_use]
pub fn byte_len(value: u64) -> u8 {
    if value == 0 {
        return 1;
    }
    let bits = 64 - value.leading_zeros();
    u8::try_from(bits.div_ceil(8)).expect("u64 fits in at most 8 bytes")
}

/// Appends the nnint encoding of `value` to `out` and returns the number of
/// bytes written.
pub fn pack(out: &mut Vec<u8>, value: u64) -> usize {
    let len = byte_len(value);
    out.push(len);
    let bytes = value.to_le_bytes();
    out.extend_from_slice(&bytes[..len as usize]);
    1 + len as usize
}

/// Reads an nnint from the front of `input`, returning the parsed value and
/// the number of bytes consumed.
///
/// # Errors
///
/// Returns [`NnintError`] if `input` is too short or the encoded width
/// exceeds 8 bytes.
pub fn unpack(input: &[u8]) -> Result<(u64, usize), NnintError> {
    let &len = input.first().ok_or(NnintError::MissingLengthByte)?;
    let len = len as usize;
    if len > 8 {
        return Err(NnintError::TooWide(len));
    }
    let value_bytes = input.get(1..1 + len).ok_or(NnintError::TruncatedValue {
        expected: len,
        actual: input.len().saturating_sub(1),
    })?;
    let mut buf = [0u8; 8];
    buf[..len].copy_from_slice(value_bytes);
    Ok((u64::from_le_bytes(buf), 1 + len))
}
