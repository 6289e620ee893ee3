//! CSDL/EDMX (OData XML schema) loader.
//!
//! Walks `edmx:Edmx` documents starting from a root file, follows
//! `edmx:Reference`s against a set of local search directories, and
//! populates an [`rde_entity_repo::EntityRepository`] with the `Set`,
//! `Enum`, `Array`, and scalar shapes the dictionary builder expands.

pub mod edm;
pub mod loader;
pub mod xml;

pub use loader::Loader;
