//! The CSDL/EDMX loader: walks `edmx:Edmx` documents, resolves references,
//! and populates an [`EntityRepository`].

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rde_dictionary::EntryFlags;
use rde_diagnostics::RdeError;
use rde_entity_repo::{EntityRepository, ExpandHint, FinalizedRepository, PropertyRef, RawEnumMember, RawProperty};
use rde_sflv::BejFormat;
use tracing::{debug, warn};

use crate::edm::{collection_element, edm_primitive_format, strip_version};
use crate::xml::{self, Element};

/// Known OASIS/Redfish core-vocabulary namespaces whose CSDL files are not
/// shipped alongside product schemas; an unresolved reference to one of
/// these is expected and silently skipped rather than warned about.
const OASIS_CORE_HINTS: &[&str] = &[
    "Org.OData",
    "Capabilities",
    "Validation",
    "Core",
    "Measures",
];

/// Parses CSDL/EDMX documents and builds a [`FinalizedRepository`].
///
/// `search_dirs` are consulted, in order, to resolve `edmx:Reference/@Uri`
/// values against local files (first match wins).
pub struct Loader {
    search_dirs: Vec<PathBuf>,
    namespaces: IndexMap<String, Element>,
    loaded_files: HashSet<PathBuf>,
}

impl Loader {
    #[must_use]
    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        Self {
            search_dirs,
            namespaces: IndexMap::new(),
            loaded_files: HashSet::new(),
        }
    }

    /// Loads a root CSDL file and recursively follows its `edmx:Reference`s.
    ///
    /// # Errors
    ///
    /// Returns [`RdeError::Io`] if the file cannot be read, or
    /// [`RdeError::MalformedXml`] if it is not well-formed XML.
    pub fn load_file(&mut self, path: &Path) -> Result<(), RdeError> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if !self.loaded_files.insert(canonical) {
            return Ok(());
        }
        debug!(path = %path.display(), "loading CSDL document");
        let bytes = std::fs::read(path).map_err(|e| RdeError::io(path, e))?;
        let root = xml::parse(&bytes).map_err(|e| RdeError::MalformedXml {
            src: miette::NamedSource::new(path.display().to_string(), String::from_utf8_lossy(&bytes).into_owned()),
            span: (0, 0).into(),
            message: e.to_string(),
        })?;
        self.index_schemas(&root);
        self.follow_references(&root);
        Ok(())
    }

    fn index_schemas(&mut self, root: &Element) {
        for data_services in root.children_named("DataServices") {
            for schema in data_services.children_named("Schema") {
                let Some(namespace) = schema.attr("Namespace") else {
                    continue;
                };
                if self.namespaces.contains_key(namespace) {
                    debug!(namespace, "duplicate namespace definition ignored");
                    continue;
                }
                self.namespaces.insert(namespace.to_string(), schema.clone());
            }
        }
    }

    fn follow_references(&mut self, root: &Element) {
        for reference in root.children_named("Reference") {
            let Some(uri) = reference.attr("Uri") else {
                continue;
            };
            match self.resolve_uri(uri) {
                Some(path) => {
                    if let Err(err) = self.load_file(&path) {
                        warn!(uri, error = %err, "failed to load referenced CSDL file");
                    }
                }
                None => {
                    if looks_like_oasis_core(uri) {
                        debug!(uri, "skipping unresolvable OASIS core reference");
                    } else {
                        warn!(uri, "unresolved edmx:Reference, continuing without it");
                    }
                }
            }
        }
    }

    fn resolve_uri(&self, uri: &str) -> Option<PathBuf> {
        let filename = uri.rsplit('/').next().unwrap_or(uri);
        let pattern = glob_set::Glob::new(&glob_set::escape(filename)).ok()?;
        let matcher = pattern.compile_matcher();
        for dir in &self.search_dirs {
            let Ok(entries) = std::fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let name = entry.file_name();
                if let Some(name) = name.to_str() {
                    if matcher.is_match(name) {
                        return Some(entry.path());
                    }
                }
            }
        }
        None
    }

    /// Interprets every indexed schema and returns the finalized repository.
    ///
    /// # Errors
    ///
    /// Returns [`RdeError::SchemaIntegrity`] on a missing base type, an
    /// unresolvable `Type` reference in an indexed schema, or an enum member
    /// without a name.
    pub fn build_repository(&self) -> Result<FinalizedRepository, RdeError> {
        let mut repo = EntityRepository::new();
        let type_defs = self.collect_type_definitions();

        for (namespace, schema) in &self.namespaces {
            for enum_el in schema.children_named("EnumType") {
                self.load_enum_type(namespace, enum_el, &mut repo)?;
            }
        }

        for (namespace, schema) in &self.namespaces {
            for entity_el in schema
                .children_named("EntityType")
                .chain(schema.children_named("ComplexType"))
            {
                if entity_el.attr("Abstract") == Some("true") {
                    continue;
                }
                let Some(name) = entity_el.attr("Name") else {
                    continue;
                };
                let qualified = strip_version(&format!("{namespace}.{name}"));
                repo.ensure_set(&qualified);
                let mut visiting = HashSet::new();
                self.collect_properties(
                    &qualified,
                    entity_el,
                    namespace,
                    &type_defs,
                    &mut repo,
                    &mut visiting,
                )?;
            }
        }

        for (namespace, schema) in &self.namespaces {
            for action_el in schema.children_named("Action") {
                self.load_action(namespace, action_el, &type_defs, &mut repo)?;
            }
        }

        for (namespace, schema) in &self.namespaces {
            for term_el in schema.children_named("Term") {
                self.load_term(namespace, term_el, &type_defs, &mut repo)?;
            }
        }

        Ok(repo.finalize())
    }

    fn collect_type_definitions(&self) -> HashMap<String, BejFormat> {
        let mut type_defs = HashMap::new();
        for (namespace, schema) in &self.namespaces {
            for td in schema.children_named("TypeDefinition") {
                let (Some(name), Some(underlying)) = (td.attr("Name"), td.attr("UnderlyingType"))
                else {
                    continue;
                };
                if let Some(format) = edm_primitive_format(underlying) {
                    type_defs.insert(format!("{namespace}.{name}"), format);
                }
            }
        }
        type_defs
    }

    fn load_enum_type(
        &self,
        namespace: &str,
        enum_el: &Element,
        repo: &mut EntityRepository,
    ) -> Result<(), RdeError> {
        let Some(name) = enum_el.attr("Name") else {
            return Err(RdeError::schema_integrity(
                namespace,
                "EnumType without a Name attribute",
            ));
        };
        let qualified = strip_version(&format!("{namespace}.{name}"));
        repo.ensure_enum(&qualified);
        for member in enum_el.children_named("Member") {
            let Some(member_name) = member.attr("Name") else {
                return Err(RdeError::schema_integrity(
                    &qualified,
                    "EnumType Member without a Name attribute",
                ));
            };
            let revision = revision_of(member).unwrap_or_default();
            repo.add_enum_member(
                &qualified,
                RawEnumMember {
                    name: member_name.to_string(),
                    revision,
                },
            );
        }
        Ok(())
    }

    fn collect_properties(
        &self,
        target_entity: &str,
        entity_el: &Element,
        namespace: &str,
        type_defs: &HashMap<String, BejFormat>,
        repo: &mut EntityRepository,
        visiting: &mut HashSet<String>,
    ) -> Result<(), RdeError> {
        let own_name = match entity_el.attr("Name") {
            Some(name) => format!("{namespace}.{name}"),
            None => target_entity.to_string(),
        };
        if !visiting.insert(own_name) {
            return Ok(());
        }

        if let Some(base) = entity_el.attr("BaseType") {
            let (base_namespace, base_local) = split_qualified(base);
            let base_schema = self.namespaces.get(base_namespace).ok_or_else(|| {
                RdeError::schema_integrity(base, "missing base type: namespace not loaded")
            })?;
            let base_el = base_schema
                .children_named("EntityType")
                .chain(base_schema.children_named("ComplexType"))
                .find(|e| e.attr("Name") == Some(base_local))
                .ok_or_else(|| RdeError::schema_integrity(base, "missing base type"))?;
            self.collect_properties(
                target_entity,
                base_el,
                base_namespace,
                type_defs,
                repo,
                visiting,
            )?;
        }

        for prop_el in entity_el
            .children_named("Property")
            .chain(entity_el.children_named("NavigationProperty"))
        {
            let property = self.build_property(prop_el, namespace, type_defs)?;
            repo.add_property(target_entity, property);
        }
        Ok(())
    }

    fn build_property(
        &self,
        prop_el: &Element,
        namespace: &str,
        type_defs: &HashMap<String, BejFormat>,
    ) -> Result<RawProperty, RdeError> {
        let name = prop_el
            .attr("Name")
            .ok_or_else(|| RdeError::schema_integrity(namespace, "Property without a Name"))?;
        let type_name = prop_el
            .attr("Type")
            .ok_or_else(|| RdeError::schema_integrity(name, "Property without a Type"))?;
        let nullable = prop_el.attr("Nullable") != Some("false");
        let flags = EntryFlags {
            read_only: permission_of(prop_el).is_some_and(|p| p == "Read"),
            nullable,
        };
        let is_navigation = prop_el.name == "NavigationProperty";

        if let Some(element_type) = collection_element(type_name) {
            let element_qualified = strip_version(element_type);
            let reference = if let Some(primitive) = edm_primitive_format(element_type)
                .or_else(|| type_defs.get(element_type).copied())
            {
                PropertyRef::Primitive(primitive)
            } else {
                self.ensure_resolvable(element_type)?;
                PropertyRef::Entity(element_qualified)
            };
            let auto_expand = has_annotation(prop_el, "OData.AutoExpand");
            let expand_hint = if is_navigation && !auto_expand {
                Some(ExpandHint::AutoExpandRef)
            } else if is_navigation {
                Some(ExpandHint::AutoExpand)
            } else {
                None
            };
            return Ok(RawProperty {
                name: name.to_string(),
                format: BejFormat::Array,
                flags,
                reference: Some(reference),
                expand_hint,
            });
        }

        if let Some(format) = edm_primitive_format(type_name) {
            return Ok(RawProperty::scalar(name, format, flags));
        }
        if let Some(&format) = type_defs.get(type_name) {
            return Ok(RawProperty::scalar(name, format, flags));
        }

        self.ensure_resolvable(type_name)?;
        let qualified = strip_version(type_name);
        let format = if self.is_enum_type(type_name) {
            BejFormat::Enum
        } else {
            BejFormat::Set
        };
        Ok(RawProperty::reference(name, format, flags, qualified))
    }

    /// Verifies a non-primitive type reference (namespace-qualified, as
    /// written in CSDL, version segment included) names an entity or type
    /// defined in some already-indexed namespace; fatal otherwise.
    fn ensure_resolvable(&self, type_name: &str) -> Result<(), RdeError> {
        let (namespace, local) = split_qualified(type_name);
        let Some(schema) = self.namespaces.get(namespace) else {
            return Err(RdeError::schema_integrity(
                type_name,
                "unresolvable Type reference: namespace not loaded",
            ));
        };
        let found = schema
            .children_named("EntityType")
            .chain(schema.children_named("ComplexType"))
            .chain(schema.children_named("EnumType"))
            .any(|e| e.attr("Name") == Some(local));
        if found {
            Ok(())
        } else {
            Err(RdeError::schema_integrity(
                type_name,
                "unresolvable Type reference: no matching type in namespace",
            ))
        }
    }

    /// Whether `type_name` (namespace-qualified, version segment included,
    /// as written in CSDL) names an `EnumType` in its namespace.
    fn is_enum_type(&self, type_name: &str) -> bool {
        let (namespace, local) = split_qualified(type_name);
        self.namespaces
            .get(namespace)
            .is_some_and(|schema| schema.children_named("EnumType").any(|e| e.attr("Name") == Some(local)))
    }

    fn load_action(
        &self,
        namespace: &str,
        action_el: &Element,
        type_defs: &HashMap<String, BejFormat>,
        repo: &mut EntityRepository,
    ) -> Result<(), RdeError> {
        let Some(name) = action_el.attr("Name") else {
            return Ok(());
        };
        let params: Vec<&Element> = action_el.children_named("Parameter").collect();
        let Some(binding) = params.first() else {
            return Ok(());
        };
        let Some(bound_type) = binding.attr("Type") else {
            return Ok(());
        };
        let host_entity = strip_version(collection_element(bound_type).unwrap_or(bound_type));
        let action_entity = format!("{namespace}.{name}");

        repo.add_property(
            &host_entity,
            RawProperty::reference(name, BejFormat::Set, EntryFlags::default(), action_entity.clone()),
        );

        repo.ensure_set(&action_entity);
        for param_el in params.iter().skip(1) {
            let property = self.build_property(param_el, namespace, type_defs)?;
            repo.add_property(&action_entity, property);
        }
        Ok(())
    }

    fn load_term(
        &self,
        namespace: &str,
        term_el: &Element,
        type_defs: &HashMap<String, BejFormat>,
        repo: &mut EntityRepository,
    ) -> Result<(), RdeError> {
        let Some(name) = term_el.attr("Name") else {
            return Ok(());
        };
        let host_namespace = if namespace == "RedfishExtensions" {
            "Redfish"
        } else {
            namespace
        };
        let host_entity = host_namespace.to_string();
        let Some(type_name) = term_el.attr("Type") else {
            return Ok(());
        };
        let flags = EntryFlags::default();
        let format = edm_primitive_format(type_name)
            .or_else(|| type_defs.get(type_name).copied())
            .unwrap_or(BejFormat::String);
        repo.ensure_set(&host_entity);
        repo.add_property(&host_entity, RawProperty::scalar(name, format, flags));
        Ok(())
    }
}

/// Qualified-name split on the *last* dot: Redfish version segments
/// (`v1_0_0`) never contain dots, so `Resource.v1_0_0.Resource` splits into
/// namespace `Resource.v1_0_0` and local name `Resource`.
fn split_qualified(qualified: &str) -> (&str, &str) {
    qualified
        .rsplit_once('.')
        .unwrap_or(("", qualified))
}

fn looks_like_oasis_core(uri: &str) -> bool {
    OASIS_CORE_HINTS.iter().any(|hint| uri.contains(hint))
}

fn permission_of(element: &Element) -> Option<&str> {
    let raw = has_annotation_value(element, "OData.Permissions")?;
    let permission = raw.rsplit('/').next().unwrap_or(raw);
    Some(match permission {
        "Read" => "Read",
        "ReadWrite" => "ReadWrite",
        "Write" => "Write",
        other => other,
    })
}

fn has_annotation(element: &Element, term: &str) -> bool {
    element
        .children_named("Annotation")
        .any(|a| a.attr("Term") == Some(term))
}

fn has_annotation_value<'a>(element: &'a Element, term: &str) -> Option<&'a str> {
    element
        .children_named("Annotation")
        .find(|a| a.attr("Term") == Some(term))
        .and_then(|a| a.attr("EnumMember"))
}

/// Extracts the `Version` of a `Redfish.Revisions` "Added" entry from an
/// `EnumType`'s `Member`, if present.
fn revision_of(member: &Element) -> Option<String> {
    for annotation in member.children_named("Annotation") {
        if annotation.attr("Term") != Some("Redfish.Revisions") {
            continue;
        }
        for collection in &annotation.children {
            for record in collection.children_named("Record") {
                let kind = record
                    .children_named("PropertyValue")
                    .find(|pv| pv.attr("Property") == Some("Kind"))
                    .and_then(|pv| pv.attr("String"));
                if kind != Some("Added") {
                    continue;
                }
                if let Some(version) = record
                    .children_named("PropertyValue")
                    .find(|pv| pv.attr("Property") == Some("Version"))
                    .and_then(|pv| pv.attr("String"))
                {
                    return Some(version.to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rde_entity_repo::Entity;
    use std::io::Write;

    fn write_csdl(dir: &std::path::Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).expect("create csdl");
        file.write_all(contents.as_bytes()).expect("write csdl");
        path
    }

    const RESOURCE_CSDL: &str = r#"<edmx:Edmx xmlns:edmx="http://docs.oasis-open.org/odata/ns/edmx" Version="4.0">
  <edmx:DataServices>
    <Schema xmlns="http://docs.oasis-open.org/odata/ns/edm" Namespace="Resource.v1_0_0">
      <EntityType Name="Resource" Abstract="true">
        <Property Name="Id" Type="Edm.String" Nullable="false"/>
      </EntityType>
    </Schema>
  </edmx:DataServices>
</edmx:Edmx>"#;

    const DRIVE_CSDL: &str = r#"<edmx:Edmx xmlns:edmx="http://docs.oasis-open.org/odata/ns/edmx" Version="4.0">
  <edmx:Reference Uri="Resource_v1.xml">
    <edmx:Include Namespace="Resource.v1_0_0"/>
  </edmx:Reference>
  <edmx:DataServices>
    <Schema xmlns="http://docs.oasis-open.org/odata/ns/edm" Namespace="Drive.v1_7_0">
      <EntityType Name="Drive" BaseType="Resource.v1_0_0.Resource">
        <Property Name="CapacityBytes" Type="Edm.Int64"/>
        <Property Name="Protocol" Type="Drive.v1_7_0.DriveProtocol"/>
        <Property Name="Status" Type="Drive.v1_7_0.DriveStatus">
          <Annotation Term="OData.Permissions" EnumMember="OData.Permission/Read"/>
        </Property>
        <NavigationProperty Name="Links" Type="Collection(Drive.v1_7_0.OemLink)"/>
      </EntityType>
      <EnumType Name="DriveProtocol">
        <Member Name="SAS"/>
        <Member Name="NVMe">
          <Annotation Term="Redfish.Revisions">
            <Collection>
              <Record>
                <PropertyValue Property="Kind" String="Added"/>
                <PropertyValue Property="Version" String="v1_5_0"/>
              </Record>
            </Collection>
          </Annotation>
        </Member>
      </EnumType>
      <ComplexType Name="DriveStatus">
        <Property Name="Health" Type="Edm.String"/>
      </ComplexType>
      <ComplexType Name="OemLink">
        <Property Name="Href" Type="Edm.String"/>
      </ComplexType>
    </Schema>
  </edmx:DataServices>
</edmx:Edmx>"#;

    #[test]
    fn loads_inheritance_and_references_across_documents() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_csdl(dir.path(), "Resource_v1.xml", RESOURCE_CSDL);
        let drive_path = write_csdl(dir.path(), "Drive_v1.xml", DRIVE_CSDL);

        let mut loader = Loader::new(vec![dir.path().to_path_buf()]);
        loader.load_file(&drive_path).expect("load drive csdl");
        let repo = loader.build_repository().expect("build repository");

        let Entity::Set(props) = repo.get("Drive.Drive").expect("Drive entity") else {
            panic!("expected Set");
        };
        let names: Vec<_> = props.iter().map(|p| p.name.as_str()).collect();
        assert!(names.contains(&"Id"), "inherited Resource.Id missing: {names:?}");
        assert!(names.contains(&"CapacityBytes"));
        assert!(names.contains(&"Protocol"));
        assert!(names.contains(&"Links"));

        let status_prop = props.iter().find(|p| p.name == "Status").unwrap();
        assert!(status_prop.flags.read_only);
        assert_eq!(status_prop.format, BejFormat::Set);

        let protocol_prop = props.iter().find(|p| p.name == "Protocol").unwrap();
        assert_eq!(protocol_prop.format, BejFormat::Enum);

        let links_prop = props.iter().find(|p| p.name == "Links").unwrap();
        assert_eq!(links_prop.format, BejFormat::Array);
        assert_eq!(links_prop.expand_hint, Some(ExpandHint::AutoExpandRef));

        let Entity::Enum(members) = repo.get("Drive.DriveProtocol").expect("enum entity") else {
            panic!("expected Enum");
        };
        let member_names: Vec<_> = members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(member_names, vec!["SAS", "NVMe"]);
    }

    #[test]
    fn oasis_core_reference_is_silently_skipped() {
        assert!(looks_like_oasis_core(
            "http://docs.oasis-open.org/odata/odata/v4.0/cs01/schema/Org.OData.Core.V1.xml"
        ));
        assert!(!looks_like_oasis_core("Resource_v1.xml"));
    }

    #[test]
    fn missing_base_type_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_csdl(
            dir.path(),
            "Orphan.xml",
            r#"<edmx:Edmx xmlns:edmx="http://docs.oasis-open.org/odata/ns/edmx" Version="4.0">
  <edmx:DataServices>
    <Schema xmlns="http://docs.oasis-open.org/odata/ns/edm" Namespace="Orphan.v1_0_0">
      <EntityType Name="Orphan" BaseType="Nowhere.v1_0_0.Nowhere">
        <Property Name="Id" Type="Edm.String"/>
      </EntityType>
    </Schema>
  </edmx:DataServices>
</edmx:Edmx>"#,
        );
        let mut loader = Loader::new(vec![dir.path().to_path_buf()]);
        loader.load_file(&path).expect("load orphan csdl");
        let result = loader.build_repository();
        assert!(matches!(result, Err(RdeError::SchemaIntegrity { .. })));
    }
}

