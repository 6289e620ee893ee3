//! Builds the shared annotation dictionary (the `@odata.*`, `@Message.*`
//! etc. property set every BEJ payload can reference) from one or more
//! versioned `redfish-payload-annotations.vX_Y_Z.json` JSON Schema
//! documents.
//!
//! Documents newer than the requested version are dropped; the remaining
//! ones are folded oldest-to-newest into a single `Annotations` entity, so
//! a key defined in an earlier version wins over a later redefinition and
//! sequence numbers come out in alphabetical (not file-arrival) order once
//! the repository is finalized.

use std::collections::HashSet;

use rde_dictionary::EntryFlags;
use rde_dictionary_builder::build_dictionary;
use rde_diagnostics::RdeError;
use rde_entity_repo::{EntityRepository, FinalizedRepository, PropertyRef, RawProperty};
use rde_sflv::BejFormat;
use serde_json::Value;

/// The entity name the annotation dictionary is rooted at.
pub const ANNOTATIONS_ROOT: &str = "Annotations";

/// One parsed `redfish-payload-annotations.vX_Y_Z.json` document, tagged
/// with the Redfish version token from its filename (e.g. `"v1_0_0"`).
#[derive(Debug, Clone)]
pub struct AnnotationSchema {
    pub version: String,
    pub document: Value,
}

/// Parses a `vMAJOR_MINOR_ERRATA` token into a comparable tuple.
fn ver_key(version: &str) -> Option<(u32, u32, u32)> {
    let rest = version.strip_prefix('v')?;
    let mut parts = rest.split('_');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let errata = parts.next()?.parse().ok()?;
    Some((major, minor, errata))
}

/// Builds the merged `Annotations` entity repository from `schemas`,
/// keeping only documents whose version is `<= max_version`.
///
/// # Errors
///
/// Returns [`RdeError::BejEncode`] if `max_version` is malformed, or if a
/// property's JSON Schema shape can't be converted to a BEJ format.
pub fn build_annotation_repository(
    schemas: &[AnnotationSchema],
    max_version: &str,
) -> Result<EntityRepository, RdeError> {
    let max_key = ver_key(max_version).ok_or_else(|| RdeError::BejEncode {
        message: format!("malformed annotation version {max_version}"),
    })?;

    let mut ordered: Vec<&AnnotationSchema> = schemas
        .iter()
        .filter(|s| ver_key(&s.version).is_some_and(|key| key <= max_key))
        .collect();
    ordered.sort_by_key(|s| ver_key(&s.version));

    let mut repo = EntityRepository::new();
    repo.ensure_set(ANNOTATIONS_ROOT);
    for schema in ordered {
        let mut seen = HashSet::new();
        for section in ["properties", "patternProperties"] {
            let Some(Value::Object(map)) = schema.document.get(section) else {
                continue;
            };
            for (raw_key, value) in map {
                let name = strip_key(raw_key);
                if !seen.insert(name.clone()) {
                    continue;
                }
                let (format, reference) = convert_json_type(value)?;
                let mut prop = RawProperty::scalar(name, format, EntryFlags::default());
                prop.reference = reference;
                repo.add_property(ANNOTATIONS_ROOT, prop);
            }
        }
    }
    Ok(repo)
}

/// Builds the merged repository and serializes it straight to the binary
/// annotation dictionary.
///
/// # Errors
///
/// See [`build_annotation_repository`] and
/// [`rde_dictionary_builder::build_dictionary`].
pub fn build_annotation_dictionary(
    schemas: &[AnnotationSchema],
    max_version: &str,
    schema_version: u32,
    copyright: Option<&str>,
) -> Result<Vec<u8>, RdeError> {
    let repo: FinalizedRepository = build_annotation_repository(schemas, max_version)?.finalize();
    build_dictionary(&repo, ANNOTATIONS_ROOT, schema_version, false, copyright)
}

/// Strips a `properties`/`patternProperties` key down to its `@...` form.
///
/// `patternProperties` keys are regexes anchored with a trailing `$`
/// (e.g. `^@(\w+\.)?ActionInfo$`); the text before the first `@` is the
/// pattern's anchor and is dropped along with a trailing `$`, matching the
/// original generator's stripping logic exactly (including its quirk of
/// dropping the last character whenever `$` appears anywhere in the
/// remainder, not only when it's the final character).
fn strip_key(raw_key: &str) -> String {
    let start = raw_key.find('@').unwrap_or(0);
    let mut key = raw_key[start..].to_string();
    if key.contains('$') {
        key.pop();
    }
    key
}

/// Converts one JSON Schema property definition to `(BejFormat,
/// reference)`, recursing into `items` for `array` types.
fn convert_json_type(value: &Value) -> Result<(BejFormat, Option<PropertyRef>), RdeError> {
    if let Some(ty) = value.get("type").and_then(Value::as_str) {
        return match ty {
            "string" => Ok((BejFormat::String, None)),
            "integer" | "number" => Ok((BejFormat::Integer, None)),
            "boolean" => Ok((BejFormat::Boolean, None)),
            "object" => {
                let reference = value
                    .get("$ref")
                    .and_then(Value::as_str)
                    .map(entity_name_from_ref)
                    .transpose()?
                    .map(PropertyRef::Entity);
                Ok((BejFormat::Set, reference))
            }
            "array" => {
                let items = value.get("items").ok_or_else(|| RdeError::BejEncode {
                    message: "annotation array property is missing items".to_string(),
                })?;
                let (item_format, item_reference) = convert_json_type(items)?;
                let reference = item_reference.unwrap_or(PropertyRef::Primitive(item_format));
                Ok((BejFormat::Array, Some(reference)))
            }
            other => Err(RdeError::BejEncode {
                message: format!("unsupported annotation property type {other}"),
            }),
        };
    }
    if let Some(r) = value.get("$ref").and_then(Value::as_str) {
        return Ok((BejFormat::Set, Some(PropertyRef::Entity(entity_name_from_ref(r)?))));
    }
    // A bare `{}` schema (the common shape for a wildcard `@...`
    // patternProperties catch-all): treated as an untyped, unexpanded Set.
    Ok((BejFormat::Set, None))
}

/// `"http://redfish.dmtf.org/schemas/v1/Settings.json#/definitions/Settings"`
/// -> `"Settings.Settings"`.
fn entity_name_from_ref(r: &str) -> Result<String, RdeError> {
    let (schema_url, fragment) = r.split_once('#').ok_or_else(|| RdeError::BejEncode {
        message: format!("malformed $ref {r}"),
    })?;
    let entity = fragment.rsplit('/').next().unwrap_or(fragment);
    let file_stem = schema_url.rsplit('/').next().unwrap_or(schema_url);
    let file_stem = file_stem.strip_suffix(".json").unwrap_or(file_stem);
    let namespace = file_stem.split('.').next().unwrap_or(file_stem);
    Ok(format!("{namespace}.{entity}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rde_entity_repo::Entity;
    use serde_json::json;

    fn schema(version: &str, document: Value) -> AnnotationSchema {
        AnnotationSchema {
            version: version.to_string(),
            document,
        }
    }

    #[test]
    fn strips_pattern_property_keys() {
        assert_eq!(strip_key(r"^@(\w+\.)?ActionInfo$"), "@ActionInfo");
        assert_eq!(strip_key("@odata.id"), "@odata.id");
    }

    #[test]
    fn maps_json_schema_types_to_bej_formats() {
        assert_eq!(
            convert_json_type(&json!({"type": "string"})).unwrap().0,
            BejFormat::String
        );
        assert_eq!(
            convert_json_type(&json!({"type": "integer"})).unwrap().0,
            BejFormat::Integer
        );
        assert_eq!(
            convert_json_type(&json!({"type": "boolean"})).unwrap().0,
            BejFormat::Boolean
        );
        assert_eq!(convert_json_type(&json!({})).unwrap().0, BejFormat::Set);
    }

    #[test]
    fn array_items_resolve_to_a_primitive_reference() {
        let (format, reference) =
            convert_json_type(&json!({"type": "array", "items": {"type": "string"}})).unwrap();
        assert_eq!(format, BejFormat::Array);
        assert_eq!(reference, Some(PropertyRef::Primitive(BejFormat::String)));
    }

    #[test]
    fn newer_than_requested_version_is_dropped() {
        let schemas = vec![
            schema(
                "v1_0_0",
                json!({"properties": {"@odata.id": {"type": "string"}}, "patternProperties": {}}),
            ),
            schema(
                "v1_1_0",
                json!({"properties": {"@odata.etag": {"type": "string"}}, "patternProperties": {}}),
            ),
        ];
        let repo = build_annotation_repository(&schemas, "v1_0_0").unwrap().finalize();
        let Entity::Set(props) = repo.get(ANNOTATIONS_ROOT).unwrap() else {
            panic!("expected Set");
        };
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].name, "@odata.id");
    }

    #[test]
    fn earlier_version_wins_on_conflicting_key() {
        let schemas = vec![
            schema(
                "v1_0_0",
                json!({"properties": {"@odata.id": {"type": "string"}}, "patternProperties": {}}),
            ),
            schema(
                "v1_1_0",
                json!({"properties": {"@odata.id": {"type": "integer"}}, "patternProperties": {}}),
            ),
        ];
        let repo = build_annotation_repository(&schemas, "v1_1_0").unwrap().finalize();
        let Entity::Set(props) = repo.get(ANNOTATIONS_ROOT).unwrap() else {
            panic!("expected Set");
        };
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].format, BejFormat::String);
    }

    #[test]
    fn sequence_numbers_come_out_alphabetical() {
        let schemas = vec![schema(
            "v1_0_0",
            json!({
                "properties": {
                    "@odata.id": {"type": "string"},
                    "@Redfish.Copyright": {"type": "string"}
                },
                "patternProperties": {}
            }),
        )];
        let repo = build_annotation_repository(&schemas, "v1_0_0").unwrap().finalize();
        let Entity::Set(props) = repo.get(ANNOTATIONS_ROOT).unwrap() else {
            panic!("expected Set");
        };
        assert_eq!(props[0].name, "@odata.id");
        assert_eq!(props[1].name, "@Redfish.Copyright");
    }
}
