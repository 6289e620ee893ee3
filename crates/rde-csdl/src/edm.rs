//! `Edm.*` primitive type mapping and qualified-name helpers.

use rde_sflv::BejFormat;

/// Maps an `Edm.*` primitive type name to its BEJ format, if it is a
/// primitive OData understands natively (as opposed to a reference to a
/// ComplexType, EntityType, EnumType or TypeDefinition in the schema).
#[must_use]
pub fn edm_primitive_format(type_name: &str) -> Option<BejFormat> {
    Some(match type_name {
        "Edm.String" | "Edm.Guid" | "Edm.DateTimeOffset" | "Edm.Duration" | "Edm.TimeOfDay" => {
            BejFormat::String
        }
        "Edm.SByte" | "Edm.Byte" | "Edm.Int16" | "Edm.Int32" | "Edm.Int64" | "Edm.Decimal" => {
            BejFormat::Integer
        }
        "Edm.Boolean" => BejFormat::Boolean,
        "Edm.Double" | "Edm.Single" => BejFormat::Real,
        "Edm.PrimitiveType" => BejFormat::Choice,
        _ => return None,
    })
}

/// Strips the `Collection(...)` wrapper from a CSDL type name, returning the
/// element type name, or `None` if `type_name` is not a collection.
#[must_use]
pub fn collection_element(type_name: &str) -> Option<&str> {
    type_name
        .strip_prefix("Collection(")
        .and_then(|rest| rest.strip_suffix(')'))
}

/// Strips a CSDL version segment (`Drive.v1_7_0.Drive` -> `Drive.Drive`) from
/// a qualified type name, matching the loader's `strip_version` helper used
/// when recording array element types.
#[must_use]
pub fn strip_version(qualified_name: &str) -> String {
    let parts: Vec<&str> = qualified_name.split('.').collect();
    if parts.len() >= 3 && parts[1].starts_with('v') {
        format!("{}.{}", parts[0], parts[2..].join("."))
    } else {
        qualified_name.to_string()
    }
}

/// The bare (unqualified) entity/type name: the final `.`-separated segment.
#[must_use]
pub fn local_name(qualified_name: &str) -> &str {
    qualified_name.rsplit('.').next().unwrap_or(qualified_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_mapping() {
        assert_eq!(edm_primitive_format("Edm.String"), Some(BejFormat::String));
        assert_eq!(edm_primitive_format("Edm.Int32"), Some(BejFormat::Integer));
        assert_eq!(edm_primitive_format("Edm.Boolean"), Some(BejFormat::Boolean));
        assert_eq!(edm_primitive_format("Drive.Drive"), None);
    }

    #[test]
    fn collection_unwrap() {
        assert_eq!(collection_element("Collection(Edm.String)"), Some("Edm.String"));
        assert_eq!(collection_element("Edm.String"), None);
    }

    #[test]
    fn version_stripping() {
        assert_eq!(strip_version("Drive.v1_7_0.Drive"), "Drive.Drive");
        assert_eq!(strip_version("Resource.Item"), "Resource.Item");
    }

    #[test]
    fn local_name_extraction() {
        assert_eq!(local_name("Drive.v1_7_0.Drive"), "Drive");
    }
}
