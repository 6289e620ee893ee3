//! Raw and finalized entity shapes.

use rde_dictionary::EntryFlags;
use rde_sflv::BejFormat;

/// How a navigation/collection property should be treated by downstream
/// consumers; carried through for CSDL-loader fidelity even though the core
/// dictionary builder only consults `reference`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandHint {
    AutoExpand,
    AutoExpandRef,
}

/// What a `Set`/`Enum`/`Array` property's dictionary sub-tree expands into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyRef {
    /// Expand via the named entity in the repository (a `Set` or `Enum`).
    Entity(String),
    /// The single child row is itself a primitive of this format (used for
    /// `Array`s of `Edm.*` primitives, which have no repository entity).
    Primitive(BejFormat),
}

/// A property as collected by the CSDL loader, before sequence numbers are
/// assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawProperty {
    pub name: String,
    pub format: BejFormat,
    pub flags: EntryFlags,
    /// `Some` for `Set`/`Enum`/`Array` formats; `None` for scalar formats.
    pub reference: Option<PropertyRef>,
    pub expand_hint: Option<ExpandHint>,
}

impl RawProperty {
    #[must_use]
    pub fn scalar(name: impl Into<String>, format: BejFormat, flags: EntryFlags) -> Self {
        Self {
            name: name.into(),
            format,
            flags,
            reference: None,
            expand_hint: None,
        }
    }

    #[must_use]
    pub fn reference(
        name: impl Into<String>,
        format: BejFormat,
        flags: EntryFlags,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            format,
            flags,
            reference: Some(PropertyRef::Entity(reference.into())),
            expand_hint: None,
        }
    }
}

/// An enum member as collected by the CSDL loader: its CSDL revision
/// ("Added" version, or empty string if unversioned) determines sort bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEnumMember {
    pub name: String,
    pub revision: String,
}

/// A property with its final, dense sequence number assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDef {
    pub sequence_number: u32,
    pub name: String,
    pub format: BejFormat,
    pub flags: EntryFlags,
    pub reference: Option<PropertyRef>,
    pub expand_hint: Option<ExpandHint>,
}

/// An enum member with its final, dense sequence number assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    pub sequence_number: u32,
    pub name: String,
}

/// The finalized shape of one entity: either a property `Set` or an `Enum`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Set(Vec<PropertyDef>),
    Enum(Vec<EnumMember>),
}

impl Entity {
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<PropLookup<'_>> {
        match self {
            Self::Set(props) => props
                .iter()
                .find(|p| p.name == name)
                .map(PropLookup::Property),
            Self::Enum(members) => members
                .iter()
                .find(|m| m.name == name)
                .map(PropLookup::EnumMember),
        }
    }

    #[must_use]
    pub fn by_sequence(&self, sequence_number: u32) -> Option<PropLookup<'_>> {
        match self {
            Self::Set(props) => props
                .iter()
                .find(|p| p.sequence_number == sequence_number)
                .map(PropLookup::Property),
            Self::Enum(members) => members
                .iter()
                .find(|m| m.sequence_number == sequence_number)
                .map(PropLookup::EnumMember),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Set(props) => props.len(),
            Self::Enum(members) => members.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy)]
pub enum PropLookup<'a> {
    Property(&'a PropertyDef),
    EnumMember(&'a EnumMember),
}
