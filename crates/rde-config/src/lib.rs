//! Configuration file model for the `generate-dictionaries` CLI, e.g.:
//!
//! ```json
//! {
//!   "Copyright": "Copyright 2014-2020 MyCompany",
//!   "DoNotWrite": ["ExcludeFile1_v1.xml", "ExcludeFile2_v1.xml"],
//!   "ExplicitEntities": {
//!     "AnXMLSchemaFile_v1.xml": {
//!       "Namespace.SomeEntity1": "DictionaryForSomeEntity1.bin",
//!       "Namespace.SomeEntity2": "DictionaryForSomeEntity2.bin"
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use rde_diagnostics::RdeError;
use serde::Deserialize;

/// Per-CSDL-file entity/output-filename overrides: normally a CSDL file's
/// sole entity and output basename are derived from the filename itself
/// (`Foo_v1.xml` -> entity `Foo.Foo`, output `Foo_v1`), but a file that
/// defines more than one dictionary-worthy entity needs this to say so
/// explicitly.
pub type ExplicitEntities = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default, rename = "Copyright")]
    pub copyright: Option<String>,
    #[serde(default, rename = "DoNotWrite")]
    pub do_not_write: Vec<String>,
    #[serde(default, rename = "ExplicitEntities")]
    pub explicit_entities: ExplicitEntities,
}

impl Config {
    /// Loads a config file from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RdeError::Io`] if the file can't be read, or
    /// [`RdeError::Json`] if it isn't valid JSON or doesn't match the
    /// expected shape.
    pub fn load(path: &Path) -> Result<Self, RdeError> {
        let bytes = std::fs::read(path).map_err(|e| RdeError::io(path, e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Whether `filename` (as it appears in the input CSDL directory
    /// listing) should be skipped per `DoNotWrite`.
    #[must_use]
    pub fn should_write(&self, filename: &str) -> bool {
        !self.do_not_write.iter().any(|excluded| excluded == filename)
    }

    /// The explicit `entity -> output basename` overrides for `filename`,
    /// if any were configured.
    #[must_use]
    pub fn explicit_entities_for(&self, filename: &str) -> Option<&BTreeMap<String, String>> {
        self.explicit_entities.get(filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_complete_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "Copyright": "Copyright 2014-2020 MyCompany",
                "DoNotWrite": ["Excluded_v1.xml"],
                "ExplicitEntities": {
                    "Foo_v1.xml": {"NS.Foo1": "Foo1.bin", "NS.Foo2": "Foo2.bin"}
                }
            }"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.copyright.as_deref(), Some("Copyright 2014-2020 MyCompany"));
        assert!(!config.should_write("Excluded_v1.xml"));
        assert!(config.should_write("Other_v1.xml"));
        assert_eq!(
            config.explicit_entities_for("Foo_v1.xml").unwrap().get("NS.Foo1"),
            Some(&"Foo1.bin".to_string())
        );
    }

    #[test]
    fn defaults_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{}").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.copyright, None);
        assert!(config.do_not_write.is_empty());
        assert!(config.explicit_entities.is_empty());
    }

    #[test]
    fn unknown_field_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"Bogus": true}"#).unwrap();
        assert!(Config::load(&path).is_err());
    }
}
