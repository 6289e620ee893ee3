//! Fixed-point expansion of a [`FinalizedRepository`] into a binary RDE
//! dictionary.
//!
//! Starting from a root entity, appends rows for its properties, then
//! repeatedly scans for rows whose `Set`/`Enum`/`Array` target still names
//! an unresolved entity and expands it, reusing an offset cache so that two
//! properties referencing the same entity (or two arrays of the same
//! entity) share one sub-tree.

use std::collections::HashMap;

use rde_dictionary::{ENTRY_LEN, EntryFlags, HEADER_LEN, RowInput, write_dictionary};
use rde_diagnostics::RdeError;
use rde_entity_repo::{Entity, FinalizedRepository, PropertyRef};
use rde_sflv::BejFormat;
use tracing::debug;

/// Converts a row index (position in the in-progress row list) to the
/// absolute byte offset it will occupy in the serialized entry table.
fn byte_offset_of_row(index: usize) -> u16 {
    u16::try_from(HEADER_LEN + index * ENTRY_LEN).expect("dictionary exceeds 64KiB")
}

/// What a row's child sub-tree still needs before it can be serialized.
#[derive(Debug, Clone)]
enum Target {
    /// No children (a scalar property, or an already-placed leaf row).
    Leaf,
    /// A `Set`/`Enum` property (or a dummy array-wrapper row) whose
    /// offset/count come from expanding the named entity.
    Entity(String),
    /// An `Array` property whose single child row wraps either an entity
    /// sub-tree or a bare primitive format.
    ArrayElement(PropertyRef),
    /// Fully resolved: row index of the child sub-tree, plus its reported
    /// child count (ignored for `Array` rows; the writer always emits
    /// `0xFFFF` for those regardless of what is recorded here).
    Resolved { offset: usize, count: u16 },
}

#[derive(Debug, Clone)]
struct BuilderRow {
    format: BejFormat,
    flags: EntryFlags,
    sequence_number: u16,
    name: String,
    target: Target,
}

#[derive(Debug, Clone, Copy)]
struct EntityOffsetCacheEntry {
    /// Row index of the entity's first property/member row.
    offset: usize,
    child_count: u16,
    /// Row index of the anonymous array-wrapper row, once one has been
    /// created for this entity (shared by every array of it).
    array_header_offset: Option<usize>,
}

/// Builds a complete binary dictionary for `root_entity`.
///
/// # Errors
///
/// Returns [`RdeError::DictionaryBuild`] if `root_entity` (or any entity it
/// transitively references) is not present in `repo`.
pub fn build_dictionary(
    repo: &FinalizedRepository,
    root_entity: &str,
    schema_version: u32,
    truncated: bool,
    copyright: Option<&str>,
) -> Result<Vec<u8>, RdeError> {
    let rows = build_rows(repo, root_entity)?;
    Ok(write_dictionary(&rows, schema_version, truncated, copyright))
}

/// Runs the fixed-point expansion and returns fully-resolved [`RowInput`]s
/// (byte offsets, in final emission order), without serializing them.
///
/// # Errors
///
/// Returns [`RdeError::DictionaryBuild`] if an entity reference cannot be
/// found in `repo`.
pub fn build_rows(repo: &FinalizedRepository, root_entity: &str) -> Result<Vec<RowInput>, RdeError> {
    let mut rows = vec![BuilderRow {
        format: entity_format(repo, root_entity)?,
        flags: EntryFlags::default(),
        sequence_number: 0,
        name: leaf_name(root_entity).to_string(),
        target: Target::Entity(root_entity.to_string()),
    }];
    let mut entity_cache: HashMap<String, EntityOffsetCacheEntry> = HashMap::new();
    let mut primitive_cache: HashMap<BejFormat, usize> = HashMap::new();

    loop {
        let scan_len = rows.len();
        let mut changed = false;
        for i in 0..scan_len {
            match rows[i].target.clone() {
                Target::Leaf | Target::Resolved { .. } => {}
                Target::Entity(name) => {
                    let (offset, count) =
                        resolve_entity(repo, &name, &mut rows, &mut entity_cache)?;
                    rows[i].target = Target::Resolved { offset, count };
                    changed = true;
                }
                Target::ArrayElement(PropertyRef::Entity(name)) => {
                    let offset = resolve_array_entity(repo, &name, &mut rows, &mut entity_cache)?;
                    rows[i].target = Target::Resolved { offset, count: 1 };
                    changed = true;
                }
                Target::ArrayElement(PropertyRef::Primitive(format)) => {
                    let offset = *primitive_cache.entry(format).or_insert_with(|| {
                        let index = rows.len();
                        rows.push(BuilderRow {
                            format,
                            flags: EntryFlags::default(),
                            sequence_number: 0,
                            name: String::new(),
                            target: Target::Leaf,
                        });
                        index
                    });
                    rows[i].target = Target::Resolved { offset, count: 1 };
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
    debug!(rows = rows.len(), root_entity, "dictionary rows resolved");

    Ok(rows
        .into_iter()
        .map(|row| {
            let (child_pointer_offset, child_count) = match row.target {
                Target::Leaf => (0u16, 0u16),
                Target::Resolved { offset, count } => {
                    let byte_offset = byte_offset_of_row(offset);
                    let count = if row.format == BejFormat::Array { 1 } else { count };
                    (byte_offset, count)
                }
                Target::Entity(_) | Target::ArrayElement(_) => {
                    unreachable!("fixed point loop leaves no unresolved targets")
                }
            };
            RowInput {
                format: row.format,
                flags: row.flags,
                sequence_number: row.sequence_number,
                child_pointer_offset,
                child_count,
                name: row.name,
            }
        })
        .collect())
}

/// Resolves a direct (non-array) `Set`/`Enum` property's target, expanding
/// the entity's properties into new rows on first use.
fn resolve_entity(
    repo: &FinalizedRepository,
    name: &str,
    rows: &mut Vec<BuilderRow>,
    cache: &mut HashMap<String, EntityOffsetCacheEntry>,
) -> Result<(usize, u16), RdeError> {
    if let Some(cached) = cache.get(name) {
        return Ok((cached.offset, cached.child_count));
    }
    let entity = repo
        .get(name)
        .ok_or_else(|| RdeError::DictionaryBuild {
            entity: name.to_string(),
            message: "referenced entity not found in repository".to_string(),
        })?;
    let offset = rows.len();
    let count = append_entity_rows(entity, rows);
    cache.insert(
        name.to_string(),
        EntityOffsetCacheEntry {
            offset,
            child_count: count,
            array_header_offset: None,
        },
    );
    Ok((offset, count))
}

/// Resolves an `Array`-of-entity property's target: the row index of the
/// shared anonymous wrapper row for this entity, creating it (and, if
/// necessary, the entity's own rows) on first use.
fn resolve_array_entity(
    repo: &FinalizedRepository,
    name: &str,
    rows: &mut Vec<BuilderRow>,
    cache: &mut HashMap<String, EntityOffsetCacheEntry>,
) -> Result<usize, RdeError> {
    if let Some(cached) = cache.get(name) {
        if let Some(header) = cached.array_header_offset {
            return Ok(header);
        }
    }
    let (offset, count) = resolve_entity(repo, name, rows, cache)?;
    let format = entity_format(repo, name)?;
    let header_index = rows.len();
    rows.push(BuilderRow {
        format,
        flags: EntryFlags::default(),
        sequence_number: 0,
        name: String::new(),
        target: Target::Resolved { offset, count },
    });
    cache
        .entry(name.to_string())
        .and_modify(|e| e.array_header_offset = Some(header_index));
    Ok(header_index)
}

/// Appends one row per property/member of `entity` and returns the count.
fn append_entity_rows(entity: &Entity, rows: &mut Vec<BuilderRow>) -> u16 {
    match entity {
        Entity::Set(props) => {
            for prop in props {
                let target = match &prop.reference {
                    None => Target::Leaf,
                    Some(PropertyRef::Entity(name)) if prop.format == BejFormat::Array => {
                        Target::ArrayElement(PropertyRef::Entity(name.clone()))
                    }
                    Some(PropertyRef::Primitive(format)) => {
                        Target::ArrayElement(PropertyRef::Primitive(*format))
                    }
                    Some(PropertyRef::Entity(name)) => Target::Entity(name.clone()),
                };
                rows.push(BuilderRow {
                    format: prop.format,
                    flags: prop.flags,
                    sequence_number: u16::try_from(prop.sequence_number).unwrap_or(u16::MAX),
                    name: prop.name.clone(),
                    target,
                });
            }
            u16::try_from(props.len()).unwrap_or(u16::MAX)
        }
        Entity::Enum(members) => {
            for member in members {
                rows.push(BuilderRow {
                    format: BejFormat::String,
                    flags: EntryFlags::default(),
                    sequence_number: u16::try_from(member.sequence_number).unwrap_or(u16::MAX),
                    name: member.name.clone(),
                    target: Target::Leaf,
                });
            }
            u16::try_from(members.len()).unwrap_or(u16::MAX)
        }
    }
}

fn entity_format(repo: &FinalizedRepository, name: &str) -> Result<BejFormat, RdeError> {
    match repo.get(name) {
        Some(Entity::Set(_)) => Ok(BejFormat::Set),
        Some(Entity::Enum(_)) => Ok(BejFormat::Enum),
        None => Err(RdeError::DictionaryBuild {
            entity: name.to_string(),
            message: "referenced entity not found in repository".to_string(),
        }),
    }
}

fn leaf_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rde_entity_repo::{EntityRepository, ExpandHint, RawProperty};

    fn flags() -> EntryFlags {
        EntryFlags::default()
    }

    #[test]
    fn scalar_root_produces_anonymous_head_row_plus_properties() {
        let mut repo = EntityRepository::new();
        repo.add_property(
            "NS.Drive",
            RawProperty::scalar("CapacityBytes", BejFormat::Integer, flags()),
        );
        repo.add_property("NS.Drive", RawProperty::scalar("Id", BejFormat::String, flags()));
        let repo = repo.finalize();

        let rows = build_rows(&repo, "NS.Drive").expect("build rows");
        assert_eq!(rows.len(), 3, "1 anonymous head + 2 properties");
        assert_eq!(rows[0].format, BejFormat::Set);
        assert_eq!(rows[0].name, "Drive");
        assert_eq!(rows[0].child_count, 2);
        assert_eq!(rows[1].name, "CapacityBytes");
        assert_eq!(rows[2].name, "Id");
    }

    #[test]
    fn two_properties_referencing_same_set_share_one_subtree() {
        let mut repo = EntityRepository::new();
        repo.add_property(
            "NS.Drive",
            RawProperty::reference("Status", BejFormat::Set, flags(), "NS.DriveStatus"),
        );
        repo.add_property(
            "NS.Drive",
            RawProperty::reference("OldStatus", BejFormat::Set, flags(), "NS.DriveStatus"),
        );
        repo.add_property(
            "NS.DriveStatus",
            RawProperty::scalar("Health", BejFormat::String, flags()),
        );
        let repo = repo.finalize();

        let rows = build_rows(&repo, "NS.Drive").expect("build rows");
        let status_row = &rows[1];
        let old_status_row = &rows[2];
        assert_eq!(status_row.child_pointer_offset, old_status_row.child_pointer_offset);
        assert_eq!(status_row.child_count, 1);
    }

    #[test]
    fn array_of_set_gets_anonymous_wrapper_row() {
        let mut repo = EntityRepository::new();
        let mut links = RawProperty::scalar("Links", BejFormat::Array, flags());
        links.reference = Some(PropertyRef::Entity("NS.OemLink".to_string()));
        links.expand_hint = Some(ExpandHint::AutoExpandRef);
        repo.add_property("NS.Drive", links);
        repo.add_property(
            "NS.OemLink",
            RawProperty::scalar("Href", BejFormat::String, flags()),
        );
        let repo = repo.finalize();

        let rows = build_rows(&repo, "NS.Drive").expect("build rows");
        let links_row = &rows[1];
        assert_eq!(links_row.format, BejFormat::Array);
        assert_eq!(links_row.child_count, 1);
        // The wrapper row it points to must itself be format Set, not a leaf.
        let wrapper_index =
            (links_row.child_pointer_offset as usize - rde_dictionary::HEADER_LEN) / rde_dictionary::ENTRY_LEN;
        assert_eq!(rows[wrapper_index].format, BejFormat::Set);
    }

    #[test]
    fn array_of_primitive_shares_one_wrapper_across_properties() {
        let mut repo = EntityRepository::new();
        let mut tags = RawProperty::scalar("Tags", BejFormat::Array, flags());
        tags.reference = Some(PropertyRef::Primitive(BejFormat::String));
        repo.add_property("NS.Drive", tags);
        let mut aliases = RawProperty::scalar("Aliases", BejFormat::Array, flags());
        aliases.reference = Some(PropertyRef::Primitive(BejFormat::String));
        repo.add_property("NS.Drive", aliases);
        let repo = repo.finalize();

        let rows = build_rows(&repo, "NS.Drive").expect("build rows");
        let tags_row = rows.iter().find(|r| r.name == "Tags").unwrap();
        let aliases_row = rows.iter().find(|r| r.name == "Aliases").unwrap();
        assert_eq!(tags_row.child_pointer_offset, aliases_row.child_pointer_offset);
    }

    #[test]
    fn missing_referenced_entity_is_fatal() {
        let mut repo = EntityRepository::new();
        repo.add_property(
            "NS.Drive",
            RawProperty::reference("Status", BejFormat::Set, flags(), "NS.Missing"),
        );
        let repo = repo.finalize();
        let result = build_rows(&repo, "NS.Drive");
        assert!(matches!(result, Err(RdeError::DictionaryBuild { .. })));
    }
}
