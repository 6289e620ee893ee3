//! Resolves an `(entity, version)` pair to its canonical Redfish JSON
//! Schema URL, by scanning each entity's *unversioned* JSON Schema document
//! (`<Namespace>.json`) for the `anyOf` list of versioned `$ref`s its
//! `definitions` entry carries.
//!
//! Used to fill in the `schema_url` field of a dictionary's JSON summary.

use std::path::{Path, PathBuf};

use rde_diagnostics::RdeError;
use serde_json::Value;
use tracing::debug;

/// Parses a `vMAJOR_MINOR_ERRATA` token into a comparable tuple.
fn ver_key(version: &str) -> Option<(u32, u32, u32)> {
    let rest = version.strip_prefix('v')?;
    let mut parts = rest.split('_');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let errata = parts.next()?.parse().ok()?;
    Some((major, minor, errata))
}

/// Splits a `$ref` of the form
/// `".../Volume.v1_0_0.json#/definitions/Volume"` into
/// `(namespace, version, entity)`, e.g. `("Volume", "v1_0_0", "Volume")`.
/// The version segment is empty for an unversioned ref.
fn ref_parts(r: &str) -> Option<(String, String, String)> {
    let (schema_url, fragment) = r.split_once('#')?;
    let entity = fragment.rsplit('/').next().unwrap_or(fragment).to_string();
    let file_stem = schema_url.rsplit('/').next().unwrap_or(schema_url);
    let file_stem = file_stem.strip_suffix(".json").unwrap_or(file_stem);
    let mut parts = file_stem.splitn(2, '.');
    let namespace = parts.next().unwrap_or(file_stem).to_string();
    let version = parts.next().unwrap_or("").to_string();
    Some((namespace, version, entity))
}

/// Resolves the schema URL for `namespace.entity` at `version` (Redfish
/// format, e.g. `"v1_0_0"`, or `""` for an unversioned request), searching
/// `json_schema_dirs` in order for `<namespace>.json`.
///
/// If no document in any of `json_schema_dirs` names `namespace`, or none
/// of its `anyOf` refs matches `entity`, returns `Ok(None)` rather than an
/// error — an unresolved schema URL degrades the JSON summary, it doesn't
/// invalidate the dictionary itself.
///
/// For a versioned request with no exact match, falls back to the
/// closest version below the one requested, substituting the requested
/// version into that URL's text. For an unversioned request, returns the
/// greatest version found verbatim.
///
/// # Errors
///
/// Returns [`RdeError::Io`] if a candidate schema file exists but can't be
/// read, or [`RdeError::Json`] if it isn't valid JSON.
pub fn resolve_schema_url(
    json_schema_dirs: &[PathBuf],
    namespace: &str,
    version: &str,
    entity: &str,
) -> Result<Option<String>, RdeError> {
    let filename = format!("{namespace}.json");
    let target = ver_key(version);
    let mut best: Option<(String, String, (u32, u32, u32))> = None;

    for dir in json_schema_dirs {
        let path = dir.join(&filename);
        if !path.is_file() {
            continue;
        }
        let schema = load_schema(&path)?;

        if version.is_empty() {
            if let Some(id) = schema.get("$id").and_then(Value::as_str) {
                return Ok(Some(id.to_string()));
            }
        }

        let Some(any_of) = schema
            .get("definitions")
            .and_then(|d| d.get(entity))
            .and_then(|e| e.get("anyOf"))
            .and_then(Value::as_array)
        else {
            continue;
        };

        for candidate in any_of {
            let Some(r) = candidate.get("$ref").and_then(Value::as_str) else {
                continue;
            };
            let Some((ref_namespace, ref_version, ref_entity)) = ref_parts(r) else {
                continue;
            };
            if ref_namespace != namespace || ref_entity != entity {
                continue;
            }
            if !version.is_empty() && ref_version == version {
                return Ok(Some(r.to_string()));
            }
            let Some(ref_key) = ver_key(&ref_version) else {
                continue;
            };
            let eligible = match target {
                Some(target_key) => ref_key < target_key,
                None => true,
            };
            if !eligible {
                continue;
            }
            let is_better = match &best {
                None => true,
                Some((_, _, best_key)) => ref_key > *best_key,
            };
            if is_better {
                best = Some((r.to_string(), ref_version, ref_key));
            }
        }
    }

    Ok(best.map(|(url, ref_version, _)| {
        if version.is_empty() {
            debug!(namespace, entity, url, "resolved unversioned schema url");
            url
        } else {
            let resolved = url.replace(&ref_version, version);
            debug!(namespace, entity, version, resolved, "resolved nearest schema url");
            resolved
        }
    }))
}

fn load_schema(path: &Path) -> Result<Value, RdeError> {
    let bytes = std::fs::read(path).map_err(|e| RdeError::io(path, e))?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn write_schema(dir: &Path, filename: &str, body: &Value) {
        std::fs::write(dir.join(filename), serde_json::to_vec(body).unwrap()).unwrap();
    }

    #[test]
    fn resolves_exact_version_match() {
        let dir = tempdir().unwrap();
        write_schema(
            dir.path(),
            "Drive.json",
            &json!({
                "definitions": {
                    "Drive": {
                        "anyOf": [
                            {"$ref": "http://redfish.dmtf.org/schemas/v1/Drive.v1_0_0.json#/definitions/Drive"},
                            {"$ref": "http://redfish.dmtf.org/schemas/v1/Drive.v1_1_0.json#/definitions/Drive"}
                        ]
                    }
                }
            }),
        );
        let url = resolve_schema_url(
            &[dir.path().to_path_buf()],
            "Drive",
            "v1_1_0",
            "Drive",
        )
        .unwrap();
        assert_eq!(
            url.as_deref(),
            Some("http://redfish.dmtf.org/schemas/v1/Drive.v1_1_0.json#/definitions/Drive")
        );
    }

    #[test]
    fn falls_back_to_closest_version_below_target() {
        let dir = tempdir().unwrap();
        write_schema(
            dir.path(),
            "Drive.json",
            &json!({
                "definitions": {
                    "Drive": {
                        "anyOf": [
                            {"$ref": "http://redfish.dmtf.org/schemas/v1/Drive.v1_0_0.json#/definitions/Drive"}
                        ]
                    }
                }
            }),
        );
        let url = resolve_schema_url(
            &[dir.path().to_path_buf()],
            "Drive",
            "v1_2_0",
            "Drive",
        )
        .unwrap();
        assert_eq!(
            url.as_deref(),
            Some("http://redfish.dmtf.org/schemas/v1/Drive.v1_2_0.json#/definitions/Drive")
        );
    }

    #[test]
    fn unversioned_request_prefers_dollar_id() {
        let dir = tempdir().unwrap();
        write_schema(
            dir.path(),
            "Drive.json",
            &json!({"$id": "http://redfish.dmtf.org/schemas/v1/Drive.json"}),
        );
        let url = resolve_schema_url(&[dir.path().to_path_buf()], "Drive", "", "Drive").unwrap();
        assert_eq!(url.as_deref(), Some("http://redfish.dmtf.org/schemas/v1/Drive.json"));
    }

    #[test]
    fn missing_schema_file_resolves_to_none() {
        let dir = tempdir().unwrap();
        let url = resolve_schema_url(&[dir.path().to_path_buf()], "Missing", "v1_0_0", "Missing").unwrap();
        assert_eq!(url, None);
    }
}
