//! JSON dictionary summary emitted alongside the binary dictionary.

use serde::Serialize;

/// `{ schema_name, schema_version, schema_url, schema_dictionary_length_bytes, schema_dictionary_crc_32, schema_dictionary_bytes }`
#[derive(Debug, Clone, Serialize)]
pub struct DictionarySummary {
    pub schema_name: String,
    pub schema_version: u32,
    pub schema_url: String,
    pub schema_dictionary_length_bytes: u32,
    pub schema_dictionary_crc_32: u32,
    pub schema_dictionary_bytes: Vec<u8>,
}

impl DictionarySummary {
    #[must_use]
    pub fn new(schema_name: String, schema_version: u32, schema_url: String, bytes: &[u8]) -> Self {
        Self {
            schema_name,
            schema_version,
            schema_url,
            schema_dictionary_length_bytes: bytes.len() as u32,
            schema_dictionary_crc_32: crc32fast::hash(bytes),
            schema_dictionary_bytes: bytes.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc_matches_independent_computation() {
        let bytes = [1u8, 2, 3, 4];
        let summary = DictionarySummary::new("Drive".into(), 0xFFFF_FFFF, "https://x/Drive.json".into(), &bytes);
        assert_eq!(summary.schema_dictionary_crc_32, crc32fast::hash(&bytes));
        assert_eq!(summary.schema_dictionary_length_bytes, 4);
    }
}
