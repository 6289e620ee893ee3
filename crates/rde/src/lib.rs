//! End-to-end Redfish Device Enablement pipeline: wires the individual
//! `rde-*` crates (CSDL loading, dictionary building, profile pruning, BEJ
//! encode/decode, URL resolution) into the handful of operations a CLI or
//! embedding application actually needs.
//!
//! Each stage is independently usable through its own crate; this crate
//! only adds the glue a full run needs (schema-version text conversion,
//! dictionary summaries, deciding which dictionary a payload's
//! `SchemaClass` byte names).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rde_dictionary::{Dictionary, DictionarySummary, to_redfish_version};
use rde_diagnostics::RdeError;
use rde_entity_repo::FinalizedRepository;
use serde_json::Value;

pub use rde_annotation_builder::{AnnotationSchema, build_annotation_dictionary};
pub use rde_bej_decoder::decode as decode_bej;
pub use rde_bej_encoder::{PdrMap, SchemaClass, encode as encode_bej};
pub use rde_csdl::Loader as CsdlLoader;
pub use rde_dictionary_builder::build_dictionary;
pub use rde_profile_pruner::prune_profile;
pub use rde_url_resolver::resolve_schema_url;

/// Loads a root CSDL file (and everything it transitively references via
/// `edmx:Reference`) into a finalized entity repository.
///
/// # Errors
///
/// See [`rde_csdl::Loader::load_file`] and
/// [`rde_csdl::Loader::build_repository`].
pub fn load_csdl_repository(search_dirs: &[PathBuf], root_file: &Path) -> Result<FinalizedRepository, RdeError> {
    let mut loader = CsdlLoader::new(search_dirs.to_vec());
    loader.load_file(root_file)?;
    loader.build_repository()
}

/// Builds `entity`'s binary dictionary from `repo` and pairs it with the
/// JSON summary: `schema_name`, `schema_version`, `schema_url` (resolved
/// against `json_schema_dirs`), and the CRC-checked byte payload.
///
/// # Errors
///
/// Returns [`RdeError::DictionaryBuild`] if `entity` (or anything it
/// references) is missing from `repo`, or an I/O/JSON error from schema
/// URL resolution.
pub fn generate_dictionary_with_summary(
    repo: &FinalizedRepository,
    entity: &str,
    schema_version: u32,
    copyright: Option<&str>,
    json_schema_dirs: &[PathBuf],
) -> Result<(Vec<u8>, DictionarySummary), RdeError> {
    let bytes = build_dictionary(repo, entity, schema_version, false, copyright)?;
    let schema_url = resolve_entity_schema_url(entity, schema_version, json_schema_dirs)?;
    let summary = DictionarySummary::new(entity.to_string(), schema_version, schema_url, &bytes);
    Ok((bytes, summary))
}

/// Resolves the `schema_url` field for `entity` at `schema_version`,
/// splitting `entity` (`"Namespace.Entity"`) into its URL-resolver
/// arguments. Returns `""` rather than an error when no matching schema
/// document names the entity — an unresolved URL degrades the summary, it
/// doesn't invalidate the dictionary.
///
/// # Errors
///
/// Returns an I/O or JSON parse error from a candidate schema document.
pub fn resolve_entity_schema_url(
    entity: &str,
    schema_version: u32,
    json_schema_dirs: &[PathBuf],
) -> Result<String, RdeError> {
    let (namespace, local) = entity.split_once('.').unwrap_or((entity, entity));
    let version = to_redfish_version(schema_version);
    Ok(resolve_schema_url(json_schema_dirs, namespace, &version, local)?.unwrap_or_default())
}

/// Which binary dictionary a decoded BEJ stream's `SchemaClass` byte names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSchemaClass {
    Major,
    Error,
}

/// Peeks a BEJ stream's 7-byte header to decide whether the major or error
/// dictionary should be passed to [`decode_bej`], without fully decoding
/// the payload.
///
/// # Errors
///
/// Returns [`RdeError::BejDecode`] if `input` is shorter than the header,
/// or the `SchemaClass` byte is neither `0x00` nor `0x04`.
pub fn peek_schema_class(input: &[u8]) -> Result<PayloadSchemaClass, RdeError> {
    let byte = *input.get(6).ok_or_else(|| RdeError::BejDecode {
        message: "BEJ stream shorter than its 7-byte header".to_string(),
    })?;
    match byte {
        0x00 => Ok(PayloadSchemaClass::Major),
        0x04 => Ok(PayloadSchemaClass::Error),
        other => Err(RdeError::BejDecode {
            message: format!("unknown BEJ schema class byte {other:#04x}"),
        }),
    }
}

/// Parses dictionary bytes for use with [`encode_bej`]/[`decode_bej`].
///
/// # Errors
///
/// Returns [`RdeError::BejDecode`] wrapping the underlying
/// [`rde_dictionary::ReaderError`] if `bytes` is not a well-formed
/// dictionary.
pub fn parse_dictionary(bytes: &[u8]) -> Result<Dictionary<'_>, RdeError> {
    Dictionary::parse(bytes).map_err(|e| RdeError::BejDecode {
        message: format!("malformed dictionary: {e}"),
    })
}

/// Loads a PDR map previously written by [`encode_bej`] (a flat `{uri:
/// id}` JSON object) back into a [`PdrMap`], preserving each URI's
/// original id regardless of the object's key order.
///
/// # Errors
///
/// Returns [`RdeError::Json`] if `value` isn't a flat string-keyed object
/// of non-negative integers.
pub fn pdr_map_from_json(value: &Value) -> Result<PdrMap, RdeError> {
    let Value::Object(map) = value else {
        return Err(RdeError::BejDecode {
            message: "PDR map JSON must be a flat object of URI to id".to_string(),
        });
    };
    let mut entries = Vec::with_capacity(map.len());
    for (uri, id) in map {
        let id = id.as_u64().ok_or_else(|| RdeError::BejDecode {
            message: format!("PDR map entry {uri:?} has a non-integer id"),
        })?;
        entries.push((uri.clone(), id));
    }
    Ok(PdrMap::from_entries(entries))
}

/// Serializes a [`PdrMap`] back to the flat `{uri: id}` JSON object
/// [`encode_bej`]'s callers write to `-op`.
#[must_use]
pub fn pdr_map_to_json(pdr_map: &PdrMap) -> Value {
    Value::Object(
        pdr_map
            .iter()
            .map(|(uri, id)| (uri.to_string(), Value::from(id)))
            .collect(),
    )
}

/// Deferred-binding map keyed by token (`%L3`, `%M`, …); threaded through
/// to [`decode_bej`] unchanged, kept here only so callers importing `rde`
/// don't also need `std::collections::HashMap` for this one parameter.
pub type Bindings = HashMap<String, String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_schema_class_reads_major() {
        let mut header = vec![0u8; 7];
        header[6] = 0x00;
        assert_eq!(peek_schema_class(&header).unwrap(), PayloadSchemaClass::Major);
    }

    #[test]
    fn peek_schema_class_reads_error() {
        let mut header = vec![0u8; 7];
        header[6] = 0x04;
        assert_eq!(peek_schema_class(&header).unwrap(), PayloadSchemaClass::Error);
    }

    #[test]
    fn peek_schema_class_rejects_truncated_input() {
        assert!(peek_schema_class(&[0u8; 3]).is_err());
    }

    #[test]
    fn peek_schema_class_rejects_unknown_byte() {
        let mut header = vec![0u8; 7];
        header[6] = 0x09;
        assert!(peek_schema_class(&header).is_err());
    }

    #[test]
    fn pdr_map_round_trips_through_json() {
        let mut pdr_map = PdrMap::default();
        pdr_map.assign("/redfish/v1/Chassis/1");
        pdr_map.assign("/redfish/v1/Chassis/2");
        let value = pdr_map_to_json(&pdr_map);
        let parsed = pdr_map_from_json(&value).unwrap();
        assert_eq!(parsed.len(), 2);
    }
}
