//! Dictionary header: `VersionTag | DictionaryFlags | EntryCount | SchemaVersion | DictionarySize`.

/// Length in bytes of the fixed dictionary header.
pub const HEADER_LEN: usize = 12;

/// `SchemaVersion` value used when the entity the dictionary describes has
/// no version (e.g. an annotation dictionary, or an un-versioned namespace).
pub const UNVERSIONED: u32 = 0xFFFF_FFFF;

/// Bit 0 of `DictionaryFlags`: set when the dictionary has been truncated by
/// profile pruning.
pub const FLAG_TRUNCATED: u8 = 0x01;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DictionaryFlags {
    pub truncated: bool,
}

impl DictionaryFlags {
    #[must_use]
    pub fn to_byte(self) -> u8 {
        if self.truncated { FLAG_TRUNCATED } else { 0 }
    }

    #[must_use]
    pub fn from_byte(byte: u8) -> Self {
        Self {
            truncated: byte & FLAG_TRUNCATED != 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictionaryHeader {
    pub version_tag: u8,
    pub flags: DictionaryFlags,
    pub entry_count: u16,
    pub schema_version: u32,
    pub dictionary_size: u32,
}

impl DictionaryHeader {
    #[must_use]
    pub fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0] = self.version_tag;
        out[1] = self.flags.to_byte();
        out[2..4].copy_from_slice(&self.entry_count.to_le_bytes());
        out[4..8].copy_from_slice(&self.schema_version.to_le_bytes());
        out[8..12].copy_from_slice(&self.dictionary_size.to_le_bytes());
        out
    }

    /// # Errors
    ///
    /// Returns `None` if `bytes` is shorter than [`HEADER_LEN`].
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN {
            return None;
        }
        Some(Self {
            version_tag: bytes[0],
            flags: DictionaryFlags::from_byte(bytes[1]),
            entry_count: u16::from_le_bytes([bytes[2], bytes[3]]),
            schema_version: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            dictionary_size: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        })
    }
}

/// Encodes a Redfish `vMAJOR_MINOR_ERRATA` version triple into the 32-bit
/// `SchemaVersion` wire form: `((MAJOR|0xF0)<<24) | ((MINOR|0xF0)<<16) | ((ERRATA|0xF0)<<8)`.
#[must_use]
pub fn encode_schema_version(major: u8, minor: u8, errata: u8) -> u32 {
    (u32::from(major | 0xF0) << 24) | (u32::from(minor | 0xF0) << 16) | (u32::from(errata | 0xF0) << 8)
}

/// Converts a 32-bit `SchemaVersion` back to its Redfish `vMAJOR_MINOR_ERRATA`
/// text form (dropping the `0xF0` packing bits), or `""` for [`UNVERSIONED`].
#[must_use]
pub fn to_redfish_version(schema_version: u32) -> String {
    if schema_version == UNVERSIONED {
        return String::new();
    }
    let major = (schema_version >> 24) & 0x0F;
    let minor = (schema_version >> 16) & 0x0F;
    let errata = (schema_version >> 8) & 0x0F;
    format!("v{major}_{minor}_{errata}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let header = DictionaryHeader {
            version_tag: 0,
            flags: DictionaryFlags { truncated: true },
            entry_count: 12,
            schema_version: encode_schema_version(1, 7, 0),
            dictionary_size: 256,
        };
        let bytes = header.to_bytes();
        assert_eq!(DictionaryHeader::from_bytes(&bytes), Some(header));
    }

    #[test]
    fn schema_version_encoding() {
        // v1_7_0
        assert_eq!(encode_schema_version(1, 7, 0), 0xF1_F7_F0_00);
    }

    #[test]
    fn schema_version_round_trips_through_text() {
        assert_eq!(to_redfish_version(encode_schema_version(1, 7, 0)), "v1_7_0");
        assert_eq!(to_redfish_version(UNVERSIONED), "");
    }
}
