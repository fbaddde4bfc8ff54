//! Entity payload model
//!
//! An [`Entity`] is a typed bag of named [`Field`]s. Fields may be marked
//! unique, in which case the write path claims their value per scope before
//! the write may commit.
//!
//! ## Nested fields
//!
//! `FieldValue::Object` holds a nested [`FieldMap`], which is what dotted
//! projection paths (`address.city`) walk into on the read path.

use crate::types::Id;
use crate::contract::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Name of the field that stores an entity's human-readable name
///
/// Direct-by-name lookups resolve against this field.
pub const NAME_FIELD: &str = "name";

/// Name of the computed field attached to geo search results
pub const DISTANCE_FIELD: &str = "distance";

/// Field name → field
pub type FieldMap = BTreeMap<String, Field>;

/// A single field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Explicit null
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// UTF-8 string
    String(String),
    /// UUID
    Uuid(Uuid),
    /// Geographic point
    Location {
        /// Latitude in degrees
        latitude: f64,
        /// Longitude in degrees
        longitude: f64,
    },
    /// Ordered list of values
    Array(Vec<FieldValue>),
    /// Nested object
    Object(FieldMap),
}

impl FieldValue {
    /// Whether this value can back a uniqueness claim
    ///
    /// Only scalars with a stable textual form may be claimed.
    pub fn is_claimable(&self) -> bool {
        matches!(
            self,
            FieldValue::Bool(_) | FieldValue::Int(_) | FieldValue::String(_) | FieldValue::Uuid(_)
        )
    }

    /// Canonical textual form used to key uniqueness claims
    ///
    /// Returns `None` for values that cannot be claimed.
    pub fn claim_key(&self) -> Option<String> {
        match self {
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Int(i) => Some(i.to_string()),
            // Claims on strings are case-insensitive, matching name lookups
            FieldValue::String(s) => Some(s.to_lowercase()),
            FieldValue::Uuid(u) => Some(u.to_string()),
            _ => None,
        }
    }

    /// Borrow the nested map of an object value
    pub fn as_object(&self) -> Option<&FieldMap> {
        match self {
            FieldValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow the inner string of a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a JSON value into a field value
    ///
    /// Objects become nested field maps whose fields are never unique.
    /// Strings that parse as UUIDs stay strings; use `FieldValue::Uuid`
    /// explicitly when the distinction matters.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Int(i),
                None => FieldValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => FieldValue::String(s),
            serde_json::Value::Array(items) => {
                FieldValue::Array(items.into_iter().map(FieldValue::from_json).collect())
            }
            serde_json::Value::Object(obj) => FieldValue::Object(
                obj.into_iter()
                    .map(|(name, v)| {
                        let field = Field::new(name.clone(), FieldValue::from_json(v));
                        (name, field)
                    })
                    .collect(),
            ),
        }
    }
}

/// A named field, optionally marked unique
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name (matches its key in the owning map)
    pub name: String,
    /// Field value
    pub value: FieldValue,
    /// Whether the value must be unique per (scope, entity type, field name)
    pub unique: bool,
}

impl Field {
    /// Create a non-unique field
    pub fn new(name: impl Into<String>, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            value,
            unique: false,
        }
    }

    /// Create a field marked unique
    pub fn unique(name: impl Into<String>, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            value,
            unique: true,
        }
    }

    /// Return a copy of this field under a different name
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: self.value.clone(),
            unique: self.unique,
        }
    }
}

/// An entity as supplied by a writer or returned to a reader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    id: Id,
    version: Option<Version>,
    fields: FieldMap,
}

impl Entity {
    /// Create an entity with no fields and no prior version
    pub fn new(id: Id) -> Self {
        Self {
            id,
            version: None,
            fields: FieldMap::new(),
        }
    }

    /// Build an entity from a JSON object
    ///
    /// Top-level names listed in `unique` are marked unique.
    pub fn from_json(id: Id, json: serde_json::Value, unique: &[&str]) -> Self {
        let mut entity = Entity::new(id);
        if let serde_json::Value::Object(obj) = json {
            for (name, value) in obj {
                let mut field = Field::new(name, FieldValue::from_json(value));
                field.unique = unique.contains(&field.name.as_str());
                entity.set_field(field);
            }
        }
        entity
    }

    /// The entity's Id
    pub fn id(&self) -> &Id {
        &self.id
    }

    /// The version this entity was last written at, if any
    pub fn version(&self) -> Option<Version> {
        self.version
    }

    /// Stamp the entity with a version
    pub fn set_version(&mut self, version: Version) {
        self.version = Some(version);
    }

    /// Builder-style field insertion
    pub fn with_field(mut self, field: Field) -> Self {
        self.set_field(field);
        self
    }

    /// Insert or replace a field, keyed by its name
    pub fn set_field(&mut self, field: Field) {
        self.fields.insert(field.name.clone(), field);
    }

    /// Look up a top-level field
    ///
    /// Dotted names are looked up literally; use projection for nested paths.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// All fields
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Replace the whole field map
    pub fn set_fields(&mut self, fields: FieldMap) {
        self.fields = fields;
    }

    /// Fields marked unique
    pub fn unique_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values().filter(|f| f.unique)
    }

    /// The entity's name field, when it is a string
    pub fn name(&self) -> Option<&str> {
        self.field(NAME_FIELD).and_then(|f| f.value.as_str())
    }
}
