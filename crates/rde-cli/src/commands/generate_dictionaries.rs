//! `rde-cli generate-dictionaries`: scans CSDL directories for schema files,
//! emits one binary dictionary (plus a human-readable `.map`) per file, and
//! always emits the merged `annotation.bin`/`annotation.map`.

use std::path::{Path, PathBuf};

use bpaf::Bpaf;
use rde_config::Config;
use rde_diagnostics::RdeError;
use tracing::{info, warn};

use crate::map_file;

#[derive(Debug, Clone, Bpaf)]
pub struct GenerateDictionariesArgs {
    /// Source directories for local CSDL (XML) schema files
    #[bpaf(short('x'), long("input-csdl"), argument("DIR"))]
    pub csdl_dirs: Vec<PathBuf>,

    /// Source directories for local JSON Schema files
    #[bpaf(short('j'), long("input-json-schema"), argument("DIR"))]
    pub json_dirs: Vec<PathBuf>,

    /// Config file for Copyright/DoNotWrite/ExplicitEntities
    #[bpaf(short('c'), long("config"), argument("FILE"))]
    pub config: Option<PathBuf>,

    /// Output directory/directories, matched by position to `--input-csdl`
    #[bpaf(short('o'), long("output"), argument("DIR"))]
    pub out_dirs: Vec<PathBuf>,
}

/// Runs the command, returning `Ok(())` on success. Any fatal error is
/// reported to the caller so it can exit 1; per-file reference-resolution
/// warnings are logged and do not abort the whole run.
///
/// # Errors
///
/// Returns [`RdeError`] if the config file is malformed, a CSDL directory
/// cannot be read, or a dictionary/annotation build fails.
pub fn run(args: &GenerateDictionariesArgs) -> Result<(), RdeError> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    for (csdl_dir, out_dir) in args.csdl_dirs.iter().zip(&args.out_dirs) {
        std::fs::create_dir_all(out_dir).map_err(|e| RdeError::io(out_dir, e))?;
        let entries = std::fs::read_dir(csdl_dir).map_err(|e| RdeError::io(csdl_dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| RdeError::io(csdl_dir, e))?;
            let filename = entry.file_name().to_string_lossy().into_owned();
            if !filename.ends_with(".xml") || !config.should_write(&filename) {
                continue;
            }
            for (entity, output_basename) in targets_for(&filename, &config) {
                generate_one(
                    &args.csdl_dirs,
                    &args.json_dirs,
                    &csdl_dir.join(&filename),
                    out_dir,
                    &entity,
                    &output_basename,
                    &config,
                )?;
            }
        }
    }

    info!("generating annotation dictionary");
    generate_annotations(&args.json_dirs, args.out_dirs.first().map(PathBuf::as_path), &config)?;

    Ok(())
}

/// `entity`/`output_basename` pairs for one CSDL filename: explicit
/// overrides from the config file take priority; otherwise the filename is
/// parsed as `<Name>_v<major>[_<minor>[_<errata>]].xml`, yielding entity
/// `Name.Name`.
fn targets_for(filename: &str, config: &Config) -> Vec<(String, String)> {
    if let Some(explicit) = config.explicit_entities_for(filename) {
        return explicit.iter().map(|(entity, out)| (entity.clone(), out.clone())).collect();
    }
    let stem = filename.strip_suffix(".xml").unwrap_or(filename);
    let Some((name, _version)) = split_versioned_stem(stem) else {
        return Vec::new();
    };
    vec![(format!("{name}.{name}"), stem.to_string())]
}

/// Splits `"Foo_v1_0_0"` into `("Foo", "v1_0_0")`, or `None` if `stem` has
/// no `_v<digits>` version suffix.
fn split_versioned_stem(stem: &str) -> Option<(&str, &str)> {
    let idx = stem.find("_v")?;
    let (name, rest) = stem.split_at(idx);
    let version = &rest[1..];
    if version.strip_prefix('v').is_some_and(|v| v.split('_').all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))) {
        Some((name, version))
    } else {
        None
    }
}

/// Parses a `vMAJOR[_MINOR[_ERRATA]]` token into the packed `SchemaVersion`,
/// or [`rde_dictionary::UNVERSIONED`] if it doesn't parse.
fn schema_version_of(version: &str) -> u32 {
    let mut parts = version.strip_prefix('v').unwrap_or(version).split('_');
    let Some(major) = parts.next().and_then(|p| p.parse().ok()) else {
        return rde_dictionary::UNVERSIONED;
    };
    let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let errata = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    rde_dictionary::encode_schema_version(major, minor, errata)
}

#[allow(clippy::too_many_arguments)]
fn generate_one(
    csdl_dirs: &[PathBuf],
    json_dirs: &[PathBuf],
    root_file: &Path,
    out_dir: &Path,
    entity: &str,
    output_basename: &str,
    config: &Config,
) -> Result<(), RdeError> {
    let repo = match rde::load_csdl_repository(csdl_dirs, root_file) {
        Ok(repo) => repo,
        Err(e) => {
            warn!(%entity, error = %e, "could not load CSDL, skipping");
            return Ok(());
        }
    };

    let version = output_basename.rsplit_once("_v").map(|(_, v)| format!("v{v}"));
    let schema_version = version.as_deref().map_or(rde_dictionary::UNVERSIONED, schema_version_of);

    let (bytes, _summary) = rde::generate_dictionary_with_summary(
        &repo,
        entity,
        schema_version,
        config.copyright.as_deref(),
        json_dirs,
    )?;

    write_dictionary_files(out_dir, output_basename, &bytes)?;
    info!(entity, bytes = bytes.len(), "wrote dictionary");
    Ok(())
}

fn generate_annotations(json_dirs: &[PathBuf], out_dir: Option<&Path>, config: &Config) -> Result<(), RdeError> {
    let Some(out_dir) = out_dir else { return Ok(()) };
    let schemas = load_annotation_schemas(json_dirs)?;
    if schemas.is_empty() {
        warn!("no redfish-payload-annotations documents found, skipping annotation.bin");
        return Ok(());
    }
    let max_version = schemas
        .iter()
        .map(|s| s.version.as_str())
        .max_by_key(|v| version_key(v))
        .unwrap_or("v1_0_0")
        .to_string();
    let schema_version = schema_version_of(&max_version);
    let bytes = rde::build_annotation_dictionary(&schemas, &max_version, schema_version, config.copyright.as_deref())?;
    write_dictionary_files(out_dir, "annotation", &bytes)?;
    Ok(())
}

/// Parses a `vMAJOR_MINOR_ERRATA` token into a comparable tuple, sorting
/// unparseable tokens before every valid one.
fn version_key(version: &str) -> (u32, u32, u32) {
    let mut parts = version.strip_prefix('v').unwrap_or(version).split('_');
    let major = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let errata = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    (major, minor, errata)
}

fn load_annotation_schemas(json_dirs: &[PathBuf]) -> Result<Vec<rde::AnnotationSchema>, RdeError> {
    let mut schemas = Vec::new();
    for dir in json_dirs {
        let Ok(entries) = std::fs::read_dir(dir) else { continue };
        for entry in entries {
            let entry = entry.map_err(|e| RdeError::io(dir, e))?;
            let filename = entry.file_name().to_string_lossy().into_owned();
            let Some(version) = filename
                .strip_prefix("redfish-payload-annotations.")
                .and_then(|rest| rest.strip_suffix(".json"))
            else {
                continue;
            };
            let bytes = std::fs::read(entry.path()).map_err(|e| RdeError::io(entry.path(), e))?;
            let document = serde_json::from_slice(&bytes)?;
            schemas.push(rde::AnnotationSchema {
                version: version.to_string(),
                document,
            });
        }
    }
    Ok(schemas)
}

fn write_dictionary_files(out_dir: &Path, basename: &str, bytes: &[u8]) -> Result<(), RdeError> {
    let bin_path = out_dir.join(format!("{basename}.bin"));
    write_atomically(&bin_path, bytes)?;

    let dict = rde::parse_dictionary(bytes)?;
    let map_text = map_file::render(&dict, bytes);
    write_atomically(&out_dir.join(format!("{basename}.map")), map_text.as_bytes())?;
    Ok(())
}

/// Writes `bytes` to a sibling temp file and renames it into place, so a
/// failed write never leaves a partial file at `path`.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), RdeError> {
    let tmp_path = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("out")
    ));
    std::fs::write(&tmp_path, bytes).map_err(|e| RdeError::io(&tmp_path, e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| RdeError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_versioned_stem() {
        assert_eq!(split_versioned_stem("Drive_v1_7_0"), Some(("Drive", "v1_7_0")));
        assert_eq!(split_versioned_stem("Drive_v1"), Some(("Drive", "v1")));
        assert_eq!(split_versioned_stem("Drive"), None);
    }

    #[test]
    fn unversioned_filename_yields_no_targets() {
        assert!(targets_for("Resource.xml", &Config::default()).is_empty());
    }

    #[test]
    fn versioned_filename_yields_self_named_entity() {
        let targets = targets_for("Drive_v1_7_0.xml", &Config::default());
        assert_eq!(targets, vec![("Drive.Drive".to_string(), "Drive_v1_7_0".to_string())]);
    }

    #[test]
    fn schema_version_of_parses_major_minor_errata() {
        assert_eq!(schema_version_of("v1_7_2"), rde_dictionary::encode_schema_version(1, 7, 2));
    }

    #[test]
    fn schema_version_of_defaults_minor_errata_to_zero() {
        assert_eq!(schema_version_of("v1"), rde_dictionary::encode_schema_version(1, 0, 0));
    }
}
