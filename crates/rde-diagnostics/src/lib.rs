//! Shared error and diagnostic types for the RDE toolchain.

pub mod error;
pub mod tracing_setup;

pub use error::{RdeError, Severity};
pub use tracing_setup::{LogLevel, init_miette, init_tracing};
