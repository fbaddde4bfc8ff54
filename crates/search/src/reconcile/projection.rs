//! Field selection and renaming
//!
//! A mapping whose source names a top-level field copies that field under
//! the target name. Otherwise a dotted source walks into nested objects:
//!
//! - kept under its own name (`address.city` → `address.city`), the nested
//!   structure is rebuilt with only the selected leaves;
//! - renamed (`address.city` → `city`), the leaf is lifted to the top level
//!   under the target name.
//!
//! An intermediate segment that is not an object stops the walk and the
//! field it names is copied whole. Sources that match nothing are skipped.

use verity_core::{Field, FieldMap, FieldValue, SelectFieldMapping};

/// Build a fresh field map holding only the selected fields
pub fn project(fields: &FieldMap, mappings: &[SelectFieldMapping]) -> FieldMap {
    let mut out = FieldMap::new();
    for mapping in mappings {
        if let Some(field) = fields.get(&mapping.source) {
            out.insert(mapping.target.clone(), field.renamed(mapping.target.clone()));
            continue;
        }
        if !mapping.source.contains('.') {
            continue;
        }
        let path: Vec<&str> = mapping.source.split('.').collect();
        if mapping.source == mapping.target {
            if reaches(fields, &path) {
                copy_nested(fields, &path, &mut out);
            }
        } else if let Some(leaf) = lookup(fields, &path) {
            out.insert(mapping.target.clone(), leaf.renamed(mapping.target.clone()));
        }
    }
    out
}

fn lookup<'a>(fields: &'a FieldMap, path: &[&str]) -> Option<&'a Field> {
    let (first, rest) = path.split_first()?;
    let field = fields.get(*first)?;
    if rest.is_empty() {
        return Some(field);
    }
    lookup(field.value.as_object()?, rest)
}

/// Whether walking `path` ends on a field rather than a missing key
fn reaches(fields: &FieldMap, path: &[&str]) -> bool {
    let Some((first, rest)) = path.split_first() else {
        return false;
    };
    match fields.get(*first) {
        None => false,
        Some(field) => match &field.value {
            FieldValue::Object(inner) if !rest.is_empty() => reaches(inner, rest),
            _ => true,
        },
    }
}

fn copy_nested(fields: &FieldMap, path: &[&str], out: &mut FieldMap) {
    let Some((first, rest)) = path.split_first() else {
        return;
    };
    let Some(field) = fields.get(*first) else {
        return;
    };
    let nested = match &field.value {
        FieldValue::Object(inner) if !rest.is_empty() => inner,
        _ => {
            out.insert(field.name.clone(), field.clone());
            return;
        }
    };

    let slot = out.entry(field.name.clone()).or_insert_with(|| Field {
        name: field.name.clone(),
        value: FieldValue::Object(FieldMap::new()),
        unique: field.unique,
    });
    // Already copied whole by an earlier mapping
    if let FieldValue::Object(target) = &mut slot.value {
        copy_nested(nested, rest, target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use verity_core::{Entity, Id};

    fn fields() -> FieldMap {
        Entity::from_json(
            Id::generate("user"),
            json!({
                "name": "alice",
                "email": "a@x.io",
                "tags": "x",
                "address": {"city": "Lisbon", "zip": "1000", "geo": {"lat": 1, "lon": 2}}
            }),
            &["email"],
        )
        .fields()
        .clone()
    }

    fn string(map: &FieldMap, name: &str) -> Option<String> {
        map.get(name).and_then(|f| f.value.as_str()).map(str::to_string)
    }

    #[test]
    fn test_top_level_rename() {
        let out = project(&fields(), &[SelectFieldMapping::rename("email", "contact")]);
        assert_eq!(out.len(), 1);
        let contact = &out["contact"];
        assert_eq!(contact.name, "contact");
        assert!(contact.unique);
        assert_eq!(contact.value.as_str(), Some("a@x.io"));
    }

    #[test]
    fn test_nested_keep_rebuilds_structure() {
        let out = project(
            &fields(),
            &[
                SelectFieldMapping::keep("address.city"),
                SelectFieldMapping::keep("address.geo.lat"),
            ],
        );
        let address = out["address"].value.as_object().unwrap();
        assert_eq!(string(address, "city").as_deref(), Some("Lisbon"));
        assert!(address.get("zip").is_none());
        let geo = address["geo"].value.as_object().unwrap();
        assert_eq!(geo.len(), 1);
        assert_eq!(geo["lat"].value, FieldValue::Int(1));
    }

    #[test]
    fn test_nested_rename_lifts_leaf() {
        let out = project(&fields(), &[SelectFieldMapping::rename("address.city", "city")]);
        assert_eq!(string(&out, "city").as_deref(), Some("Lisbon"));
        assert!(out.get("address").is_none());
    }

    #[test]
    fn test_non_object_intermediate_copied_whole() {
        let out = project(&fields(), &[SelectFieldMapping::keep("tags.first")]);
        assert_eq!(string(&out, "tags").as_deref(), Some("x"));
    }

    #[test]
    fn test_path_ending_on_object_copies_object() {
        let out = project(&fields(), &[SelectFieldMapping::keep("address.geo")]);
        let address = out["address"].value.as_object().unwrap();
        assert_eq!(address["geo"].value.as_object().map(|m| m.len()), Some(2));
    }

    #[test]
    fn test_missing_source_skipped() {
        let out = project(
            &fields(),
            &[
                SelectFieldMapping::keep("phone"),
                SelectFieldMapping::keep("address.country"),
                SelectFieldMapping::rename("address.country", "country"),
            ],
        );
        assert!(out.get("phone").is_none());
        assert!(out.get("country").is_none());
        assert!(out.get("address").is_none());
    }

    #[test]
    fn test_missing_nested_source_leaves_map_empty() {
        let mut fields = FieldMap::new();
        fields.insert("name".to_string(), Field::new("name", FieldValue::String("alice".into())));
        let mut address = FieldMap::new();
        address.insert("city".to_string(), Field::new("city", FieldValue::String("Lisbon".into())));
        fields.insert("address".to_string(), Field::new("address", FieldValue::Object(address)));

        let out = project(&fields, &[SelectFieldMapping::keep("address.country")]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_missing_leaf_keeps_sibling_selection() {
        let out = project(
            &fields(),
            &[
                SelectFieldMapping::keep("address.city"),
                SelectFieldMapping::keep("address.geo.alt"),
            ],
        );
        let address = out["address"].value.as_object().unwrap();
        assert_eq!(address.len(), 1);
        assert_eq!(string(address, "city").as_deref(), Some("Lisbon"));
    }
}
