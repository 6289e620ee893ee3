//! Dictionary entry flags: the low nibble of a `FormatByte` in the dictionary
//! wire format (distinct from the SFLV stream's [`rde_sflv::ValueFlags`]).

/// Bit 2 (`0x02`): the property is read-only (`OData.Permissions` = `Read`).
pub const READ_ONLY: u8 = 0x02;
/// Bit 3 (`0x04`): the property is nullable.
pub const NULLABLE: u8 = 0x04;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryFlags {
    pub read_only: bool,
    pub nullable: bool,
}

impl EntryFlags {
    #[must_use]
    pub fn to_nibble_bits(self) -> u8 {
        let mut bits = 0u8;
        if self.read_only {
            bits |= READ_ONLY;
        }
        if self.nullable {
            bits |= NULLABLE;
        }
        bits
    }

    #[must_use]
    pub fn from_nibble_bits(bits: u8) -> Self {
        Self {
            read_only: bits & READ_ONLY != 0,
            nullable: bits & NULLABLE != 0,
        }
    }
}
