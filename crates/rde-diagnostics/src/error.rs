//! The toolchain-wide error type.
//!
//! Every fallible operation across `rde-csdl`, `rde-dictionary-builder`,
//! `rde-annotation-builder`, `rde-profile-pruner`, `rde-bej-encoder` and
//! `rde-bej-decoder` returns `Result<T, RdeError>`, so CLI frontends can
//! render any failure with a single `miette` handler.

use std::path::PathBuf;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Severity of a diagnostic. Only [`Severity::Fatal`] aborts the operation
/// that produced it; [`Severity::Warning`] is logged and the caller
/// continues (e.g. an unresolved `edmx:Reference`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Fatal,
}

/// The unified error type for the RDE toolchain.
#[derive(Debug, Error, Diagnostic)]
pub enum RdeError {
    #[error("{path}: {message}")]
    Io {
        path: PathBuf,
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSDL/EDMX document: {message}")]
    #[diagnostic(code(rde::csdl::malformed))]
    MalformedXml {
        #[source_code]
        src: NamedSource<String>,
        #[label("{message}")]
        span: SourceSpan,
        message: String,
    },

    #[error("{qualified_name}: {message}")]
    #[diagnostic(code(rde::csdl::schema_integrity))]
    SchemaIntegrity {
        qualified_name: String,
        message: String,
    },

    #[error("entity {entity} has no dictionary representation: {message}")]
    #[diagnostic(code(rde::dictionary::build))]
    DictionaryBuild { entity: String, message: String },

    #[error("profile references unknown property {property} on {entity}")]
    #[diagnostic(code(rde::profile::unknown_property))]
    ProfileUnknownProperty { entity: String, property: String },

    #[error("{message}")]
    #[diagnostic(code(rde::bej::encode))]
    BejEncode { message: String },

    #[error("{message}")]
    #[diagnostic(code(rde::bej::decode))]
    BejDecode { message: String },

    #[error("{message}")]
    #[diagnostic(code(rde::config))]
    Config { message: String },

    #[error(transparent)]
    #[diagnostic(code(rde::json))]
    Json(#[from] serde_json::Error),
}

impl RdeError {
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        Self::Io {
            message: source.to_string(),
            path,
            source,
        }
    }

    #[must_use]
    pub fn schema_integrity(qualified_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaIntegrity {
            qualified_name: qualified_name.into(),
            message: message.into(),
        }
    }
}
