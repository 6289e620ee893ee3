//! BEJ Sequence-Format-Length-Value codec.
//!
//! This crate is the wire-format layer shared by the encoder and decoder: it
//! knows how to frame an SFLV element and how to pack/unpack each primitive
//! BEJ value type. It has no knowledge of dictionaries, CSDL, or JSON — see
//! `rde-dictionary` and `rde-bej-encoder`/`rde-bej-decoder` for those.

pub mod format;
pub mod seq;
pub mod sflv;
pub mod value;

pub use format::{BejFormat, ValueFlags, pack_format_byte, unpack_format_byte};
pub use seq::{Selector, Seq};
pub use sflv::{SflvError, SflvHeader, pack_sflv, read_sflv};
pub use value::{
    RealValue, ValueError, pack_boolean, pack_enum, pack_integer, pack_real, pack_resource_link,
    pack_string, unpack_boolean, unpack_enum, unpack_integer, unpack_real, unpack_resource_link,
    unpack_string,
};
