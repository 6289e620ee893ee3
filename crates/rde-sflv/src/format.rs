//! BEJ format codes and the low-nibble value flags carried alongside them.

/// The BEJ format of a dictionary entry or SFLV element.
///
/// Numeric codes match the PLDM-for-RDE specification; `Choice` and
/// `ResourceLink` in particular keep the DMTF-assigned codes rather than a
/// dense enumeration, since they round-trip through the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BejFormat {
    Set = 0x00,
    Array = 0x01,
    Null = 0x02,
    Integer = 0x03,
    Enum = 0x04,
    String = 0x05,
    Real = 0x06,
    Boolean = 0x07,
    Choice = 0x09,
    PropertyAnnotation = 0x0A,
    ResourceLink = 0x0E,
}

impl BejFormat {
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0x00 => Self::Set,
            0x01 => Self::Array,
            0x02 => Self::Null,
            0x03 => Self::Integer,
            0x04 => Self::Enum,
            0x05 => Self::String,
            0x06 => Self::Real,
            0x07 => Self::Boolean,
            0x09 => Self::Choice,
            0x0A => Self::PropertyAnnotation,
            0x0E => Self::ResourceLink,
            _ => return None,
        })
    }

    /// Whether this format is a container whose value is `nnint count | children`.
    #[must_use]
    pub fn is_container(self) -> bool {
        matches!(self, Self::Set | Self::Array)
    }
}

/// Low-nibble flag bits carried in a BEJ `FormatByte` (distinct from the
/// dictionary entry's read-only/nullable flags in [`rde_dictionary`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValueFlags {
    /// Bit 0: the value is a string containing deferred-binding tokens
    /// (`%L`, `%T`, `%P`, `%I`, `%M`) to be resolved against a PDR/binding map.
    pub deferred_binding: bool,
    /// Bit 1: implementation hint that this is a top-level annotation nesting.
    pub annotation_nesting: bool,
}

impl ValueFlags {
    pub const DEFERRED_BINDING: u8 = 0x01;
    pub const ANNOTATION_NESTING: u8 = 0x02;

    #[must_use]
    pub fn deferred_binding() -> Self {
        Self {
            deferred_binding: true,
            annotation_nesting: false,
        }
    }

    #[must_use]
    pub fn to_nibble(self) -> u8 {
        let mut bits = 0u8;
        if self.deferred_binding {
            bits |= Self::DEFERRED_BINDING;
        }
        if self.annotation_nesting {
            bits |= Self::ANNOTATION_NESTING;
        }
        bits
    }

    #[must_use]
    pub fn from_nibble(nibble: u8) -> Self {
        Self {
            deferred_binding: nibble & Self::DEFERRED_BINDING != 0,
            annotation_nesting: nibble & Self::ANNOTATION_NESTING != 0,
        }
    }
}

/// Packs `format` and `flags` into a single `FormatByte`.
#[must_use]
pub fn pack_format_byte(format: BejFormat, flags: ValueFlags) -> u8 {
    (format.code() << 4) | flags.to_nibble()
}

/// Splits a `FormatByte` back into its format code and flag nibble.
///
/// # Errors
///
/// Returns `None` if the high nibble is not a recognized [`BejFormat`].
#[must_use]
pub fn unpack_format_byte(byte: u8) -> Option<(BejFormat, ValueFlags)> {
    let format = BejFormat::from_code(byte >> 4)?;
    Some((format, ValueFlags::from_nibble(byte & 0x0F)))
}
