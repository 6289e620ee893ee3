//! Prunes a [`FinalizedRepository`] down to the properties (and, for enums,
//! the member values) named by a Redfish Interoperability Profile's
//! `PropertyRequirements`, so a generated dictionary only carries the
//! properties a given profile actually requires.

use indexmap::IndexMap;
use rde_diagnostics::RdeError;
use rde_entity_repo::{Entity, FinalizedRepository, PropertyRef};
use rde_sflv::BejFormat;
use serde_json::Value;
use tracing::debug;

/// Prunes `repo` to the properties required by `profile` for `root_entity`
/// (and, recursively, for every `Set`/`Enum`/`Array` entity it references),
/// renumbering each pruned entity's surviving properties/members densely
/// from zero.
///
/// # Errors
///
/// Returns [`RdeError::Config`] if `profile` names no requirements for
/// `root_entity`, or [`RdeError::ProfileUnknownProperty`] if a required,
/// non-annotation property isn't present in `repo`.
pub fn prune_profile(
    repo: FinalizedRepository,
    root_entity: &str,
    profile: &Value,
) -> Result<FinalizedRepository, RdeError> {
    let profile_key = root_entity.split('.').nth(1).unwrap_or(root_entity);
    let resource = profile.get("Resources").and_then(|r| r.get(profile_key));
    let Some(resource) = resource else {
        return Err(RdeError::Config {
            message: format!("profile has no requirements for entity {root_entity}"),
        });
    };

    let mut required: IndexMap<String, Vec<String>> = IndexMap::new();
    build_requirements(resource, &mut required, root_entity, &repo)?;
    Ok(prune(repo, &required))
}

/// Walks one `PropertyRequirements`/`Values` node of a profile, recording
/// the allowed property (or enum member) names per entity into `required`.
fn build_requirements(
    obj: &Value,
    required: &mut IndexMap<String, Vec<String>>,
    entity: &str,
    repo: &FinalizedRepository,
) -> Result<(), RdeError> {
    if let Some(Value::Object(prop_reqs)) = obj.get("PropertyRequirements") {
        required.entry(entity.to_string()).or_default();
        let Some(Entity::Set(props)) = repo.get(entity) else {
            return Err(RdeError::Config {
                message: format!("profile entity {entity} is not a property Set in the schema"),
            });
        };
        for (prop_name, requirement) in prop_reqs {
            if !requirement.is_object() {
                continue;
            }
            match props.iter().find(|p| &p.name == prop_name) {
                Some(p) => {
                    required.get_mut(entity).expect("just inserted").push(prop_name.clone());
                    let referenced_entity = matches!(
                        p.format,
                        BejFormat::Set | BejFormat::Enum | BejFormat::Array
                    )
                    .then(|| match &p.reference {
                        Some(PropertyRef::Entity(name)) => Some(name.as_str()),
                        _ => None,
                    })
                    .flatten();
                    if let Some(referenced_entity) = referenced_entity {
                        build_requirements(requirement, required, referenced_entity, repo)?;
                    }
                }
                None => {
                    if !prop_name.contains('@') {
                        return Err(RdeError::ProfileUnknownProperty {
                            entity: entity.to_string(),
                            property: prop_name.clone(),
                        });
                    }
                }
            }
        }
    }

    if let Some(Value::Array(values)) = obj.get("Values") {
        let entry = required.entry(entity.to_string()).or_default();
        for value in values {
            if let Some(name) = value.as_str() {
                entry.push(name.to_string());
            }
        }
    }

    Ok(())
}

fn prune(mut repo: FinalizedRepository, required: &IndexMap<String, Vec<String>>) -> FinalizedRepository {
    for (entity, allowed) in required {
        let Some(entity_ref) = repo.get_mut(entity) else {
            continue;
        };
        match entity_ref {
            Entity::Set(props) => {
                let before = props.len();
                props.retain(|p| allowed.contains(&p.name));
                for (i, p) in props.iter_mut().enumerate() {
                    p.sequence_number = i as u32;
                }
                debug!(entity, before, after = props.len(), "pruned property set");
            }
            Entity::Enum(members) => {
                let before = members.len();
                members.retain(|m| allowed.contains(&m.name));
                for (i, m) in members.iter_mut().enumerate() {
                    m.sequence_number = i as u32;
                }
                debug!(entity, before, after = members.len(), "pruned enum members");
            }
        }
    }
    repo
}
