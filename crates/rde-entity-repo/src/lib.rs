//! In-memory entity repository: the only stateful intermediate between CSDL
//! parsing (`rde-csdl`) and dictionary emission (`rde-dictionary-builder`).

pub mod model;
pub mod repository;

pub use model::{
    Entity, EnumMember, ExpandHint, PropLookup, PropertyDef, PropertyRef, RawEnumMember,
    RawProperty,
};
pub use repository::{EntityRepository, FinalizedRepository};
