//! The entity repository: the only stateful intermediate between CSDL
//! parsing and dictionary emission.

use indexmap::IndexMap;
use tracing::debug;

use crate::model::{Entity, EnumMember, PropertyDef, RawEnumMember, RawProperty};

#[derive(Debug, Clone, Default)]
enum RawEntity {
    #[default]
    Empty,
    Set(Vec<RawProperty>),
    Enum(Vec<RawEnumMember>),
}

/// Accumulates raw properties/enum members as the CSDL loader walks schema
/// documents. Duplicate names are suppressed in favor of the first
/// definition loaded (base-type-wins for Sets; first bundle wins across
/// overlapping CSDL documents).
#[derive(Debug, Default)]
pub struct EntityRepository {
    entities: IndexMap<String, RawEntity>,
}

impl EntityRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures `name` is registered as a `Set` entity (idempotent).
    pub fn ensure_set(&mut self, name: &str) {
        self.entities
            .entry(name.to_string())
            .or_insert(RawEntity::Set(Vec::new()));
    }

    /// Ensures `name` is registered as an `Enum` entity (idempotent).
    pub fn ensure_enum(&mut self, name: &str) {
        self.entities
            .entry(name.to_string())
            .or_insert(RawEntity::Enum(Vec::new()));
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    /// Adds a property to a `Set` entity. If a property with the same name
    /// already exists (e.g. inherited from a base type, or from an
    /// overlapping schema document loaded earlier), the new definition is
    /// dropped and the existing one is retained.
    pub fn add_property(&mut self, entity: &str, property: RawProperty) {
        let raw = self
            .entities
            .entry(entity.to_string())
            .or_insert_with(|| RawEntity::Set(Vec::new()));
        let RawEntity::Set(props) = raw else {
            panic!("entity {entity} was previously registered as an Enum, not a Set");
        };
        if props.iter().any(|p| p.name == property.name) {
            debug!(entity, property = %property.name, "duplicate property suppressed");
            return;
        }
        props.push(property);
    }

    /// Adds an enum member to an `Enum` entity. Duplicate names (across
    /// revisions) are suppressed, first occurrence wins.
    pub fn add_enum_member(&mut self, entity: &str, member: RawEnumMember) {
        let raw = self
            .entities
            .entry(entity.to_string())
            .or_insert_with(|| RawEntity::Enum(Vec::new()));
        let RawEntity::Enum(members) = raw else {
            panic!("entity {entity} was previously registered as a Set, not an Enum");
        };
        if members.iter().any(|m| m.name == member.name) {
            debug!(entity, member = %member.name, "duplicate enum member suppressed");
            return;
        }
        members.push(member);
    }

    /// Assigns dense sequence numbers to every entity's property/member
    /// list and returns the immutable, finalized repository.
    ///
    /// Sets sort alphabetically (case-insensitive) by name. Enums sort by
    /// revision bucket first (in ascending string order, empty/unversioned
    /// first), then alphabetically (case-insensitive) by name within a
    /// bucket — so members added in later CSDL revisions always sort after
    /// earlier ones.
    #[must_use]
    pub fn finalize(self) -> FinalizedRepository {
        let mut entities = IndexMap::new();
        for (name, raw) in self.entities {
            let entity = match raw {
                RawEntity::Empty => Entity::Set(Vec::new()),
                RawEntity::Set(mut props) => {
                    props.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
                    let resolved = props
                        .into_iter()
                        .enumerate()
                        .map(|(i, p)| PropertyDef {
                            sequence_number: i as u32,
                            name: p.name,
                            format: p.format,
                            flags: p.flags,
                            reference: p.reference,
                            expand_hint: p.expand_hint,
                        })
                        .collect();
                    Entity::Set(resolved)
                }
                RawEntity::Enum(mut members) => {
                    members.sort_by(|a, b| {
                        a.revision
                            .cmp(&b.revision)
                            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
                    });
                    let resolved = members
                        .into_iter()
                        .enumerate()
                        .map(|(i, m)| EnumMember {
                            sequence_number: i as u32,
                            name: m.name,
                        })
                        .collect();
                    Entity::Enum(resolved)
                }
            };
            entities.insert(name, entity);
        }
        FinalizedRepository { entities }
    }
}

/// A repository whose entities all have dense, assigned sequence numbers.
/// Read-only; consumed by the dictionary builder and profile pruner.
#[derive(Debug, Clone, Default)]
pub struct FinalizedRepository {
    entities: IndexMap<String, Entity>,
}

impl FinalizedRepository {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Entity> {
        self.entities.get_mut(name)
    }

    #[must_use]
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RawProperty;
    use rde_dictionary::EntryFlags;
    use rde_sflv::BejFormat;

    #[test]
    fn sequence_numbers_are_dense_and_alphabetical() {
        let mut repo = EntityRepository::new();
        repo.add_property(
            "NS.Drive",
            RawProperty::scalar("Zebra", BejFormat::String, EntryFlags::default()),
        );
        repo.add_property(
            "NS.Drive",
            RawProperty::scalar("apple", BejFormat::String, EntryFlags::default()),
        );
        let repo = repo.finalize();
        let Entity::Set(props) = repo.get("NS.Drive").unwrap() else {
            panic!("expected Set");
        };
        assert_eq!(props[0].name, "apple");
        assert_eq!(props[0].sequence_number, 0);
        assert_eq!(props[1].name, "Zebra");
        assert_eq!(props[1].sequence_number, 1);
    }

    #[test]
    fn base_type_property_wins_over_duplicate() {
        let mut repo = EntityRepository::new();
        repo.add_property(
            "NS.Drive",
            RawProperty::scalar("Id", BejFormat::String, EntryFlags::default()),
        );
        repo.add_property(
            "NS.Drive",
            RawProperty::scalar(
                "Id",
                BejFormat::Integer,
                EntryFlags::default(),
            ),
        );
        let repo = repo.finalize();
        let Entity::Set(props) = repo.get("NS.Drive").unwrap() else {
            panic!("expected Set");
        };
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].format, BejFormat::String);
    }

    #[test]
    fn enum_revisions_sort_after_earlier_ones() {
        let mut repo = EntityRepository::new();
        repo.add_enum_member(
            "NS.Color",
            RawEnumMember {
                name: "Banana".into(),
                revision: "v1_0_0".into(),
            },
        );
        repo.add_enum_member(
            "NS.Color",
            RawEnumMember {
                name: "Apple".into(),
                revision: "v1_0_0".into(),
            },
        );
        repo.add_enum_member(
            "NS.Color",
            RawEnumMember {
                name: "Cherry".into(),
                revision: "v1_1_0".into(),
            },
        );
        let repo = repo.finalize();
        let Entity::Enum(members) = repo.get("NS.Color").unwrap() else {
            panic!("expected Enum");
        };
        let names: Vec<_> = members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Apple", "Banana", "Cherry"]);
        assert_eq!(members[0].sequence_number, 0);
        assert_eq!(members[2].sequence_number, 2);
    }
}
