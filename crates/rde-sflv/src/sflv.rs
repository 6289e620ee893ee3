//! The outer `Seq | FormatByte | Length | Value` framing shared by every BEJ
//! element.

use rde_nnint as nnint;
use thiserror::Error;

use crate::format::{BejFormat, ValueFlags, pack_format_byte, unpack_format_byte};
use crate::seq::Seq;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SflvError {
    #[error("truncated SFLV element: {0}")]
    Nnint(#[from] rde_nnint::NnintError),
    #[error("missing FormatByte")]
    MissingFormatByte,
    #[error("unrecognized format code {0:#04x}")]
    UnknownFormat(u8),
    #[error("declared length {declared} exceeds remaining input ({remaining} bytes)")]
    LengthExceedsInput { declared: usize, remaining: usize },
}

/// A parsed `Seq | FormatByte | Length` header, with the `Value` bytes left
/// as a borrowed slice for the caller to interpret per `format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SflvHeader {
    pub seq: Seq,
    pub format: BejFormat,
    pub flags: ValueFlags,
    pub length: usize,
}

/// Appends a complete SFLV element (`Seq | FormatByte | Length | Value`) to
/// `out`.
pub fn pack_sflv(out: &mut Vec<u8>, seq: Seq, format: BejFormat, flags: ValueFlags, value: &[u8]) {
    nnint::pack(out, seq.to_raw());
    out.push(pack_format_byte(format, flags));
    nnint::pack(out, value.len() as u64);
    out.extend_from_slice(value);
}

/// Reads one SFLV element from the front of `input`.
///
/// Returns the parsed header, the slice of `input` holding exactly `Length`
/// value bytes, and the total number of bytes consumed (header + value).
///
/// # Errors
///
/// Returns [`SflvError`] if the header is truncated, the format code is
/// unrecognized, or `Length` exceeds the remaining input.
pub fn read_sflv(input: &[u8]) -> Result<(SflvHeader, &[u8], usize), SflvError> {
    let (seq_raw, consumed) = nnint::unpack(input)?;
    let mut offset = consumed;

    let &format_byte = input
        .get(offset)
        .ok_or(SflvError::MissingFormatByte)?;
    offset += 1;
    let (format, flags) =
        unpack_format_byte(format_byte).ok_or(SflvError::UnknownFormat(format_byte))?;

    let (length, consumed) = nnint::unpack(&input[offset..])?;
    offset += consumed;
    let length = length as usize;

    let remaining = input.len() - offset;
    if length > remaining {
        return Err(SflvError::LengthExceedsInput {
            declared: length,
            remaining,
        });
    }
    let value = &input[offset..offset + length];
    offset += length;

    Ok((
        SflvHeader {
            seq: Seq::from_raw(seq_raw),
            format,
            flags,
            length,
        },
        value,
        offset,
    ))
}
