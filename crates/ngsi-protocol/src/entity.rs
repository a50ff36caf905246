//! Entities, attributes and metadata.
//!
//! An entity is serialized as a flat JSON object: `id` and `type` are fixed
//! keys and every other key is an attribute name. Attributes always carry a
//! `metadata` object (empty when unset) and omit `type` when it is absent.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::errors::NgsiError;

const ID_KEY: &str = "id";
const TYPE_KEY: &str = "type";

/// Metadata attached to an attribute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    /// Metadata value.
    pub value: Value,

    /// Optional type tag.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
}

impl Metadata {
    /// Create metadata with a value and no type.
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            type_: None,
        }
    }

    /// Set the type tag.
    pub fn with_type(mut self, type_: impl Into<String>) -> Self {
        self.type_ = Some(type_.into());
        self
    }
}

/// A named value on an entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attribute {
    /// Attribute value (any JSON value, including null).
    pub value: Value,

    /// Optional type tag.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    /// Metadata by name. Always serialized, even when empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub metadata: BTreeMap<String, Metadata>,
}

impl Attribute {
    /// Create an attribute with a value, no type and no metadata.
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            type_: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Set the type tag.
    pub fn with_type(mut self, type_: impl Into<String>) -> Self {
        self.type_ = Some(type_.into());
        self
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, name: impl Into<String>, metadata: Metadata) -> Self {
        self.metadata.insert(name.into(), metadata);
        self
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeMap<String, Metadata>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeMap<String, Metadata>>::deserialize(deserializer)?.unwrap_or_default())
}

/// The primary addressable object: an id, a type and named attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Entity identifier.
    pub id: String,

    /// Entity type.
    pub type_: String,

    attributes: BTreeMap<String, Attribute>,
}

impl Entity {
    /// Create an entity with no attributes.
    pub fn new(id: impl Into<String>, type_: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_: type_.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add an attribute (builder pattern).
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        attribute: Attribute,
    ) -> Result<Self, NgsiError> {
        self.insert_attribute(name, attribute)?;
        Ok(self)
    }

    /// Insert or replace an attribute, returning the previous one.
    ///
    /// Fails for the reserved names `id` and `type`.
    pub fn insert_attribute(
        &mut self,
        name: impl Into<String>,
        attribute: Attribute,
    ) -> Result<Option<Attribute>, NgsiError> {
        let name = name.into();
        if is_reserved(&name) {
            return Err(NgsiError::BadRequest(format!(
                "Attribute name '{}' is reserved",
                name
            )));
        }
        Ok(self.attributes.insert(name, attribute))
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Look up an attribute by name for modification.
    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.attributes.get_mut(name)
    }

    /// Remove an attribute.
    pub fn remove_attribute(&mut self, name: &str) -> Option<Attribute> {
        self.attributes.remove(name)
    }

    /// All attributes by name.
    pub fn attributes(&self) -> &BTreeMap<String, Attribute> {
        &self.attributes
    }

    /// Keep only the listed attributes. An empty list keeps everything.
    pub fn project(mut self, attrs: &[String]) -> Self {
        if !attrs.is_empty() {
            self.attributes.retain(|name, _| attrs.contains(name));
        }
        self
    }
}

fn is_reserved(name: &str) -> bool {
    name == ID_KEY || name == TYPE_KEY
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.attributes.len() + 2))?;
        map.serialize_entry(ID_KEY, &self.id)?;
        map.serialize_entry(TYPE_KEY, &self.type_)?;
        for (name, attribute) in &self.attributes {
            map.serialize_entry(name, attribute)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Entity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(EntityVisitor)
    }
}

struct EntityVisitor;

impl<'de> Visitor<'de> for EntityVisitor {
    type Value = Entity;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an entity object with `id`, `type` and attributes")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Entity, A::Error> {
        let mut id: Option<String> = None;
        let mut type_: Option<String> = None;
        let mut attributes = BTreeMap::new();

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                ID_KEY => {
                    if id.is_some() {
                        return Err(de::Error::duplicate_field(ID_KEY));
                    }
                    id = Some(map.next_value()?);
                }
                TYPE_KEY => {
                    if type_.is_some() {
                        return Err(de::Error::duplicate_field(TYPE_KEY));
                    }
                    type_ = Some(map.next_value()?);
                }
                _ => {
                    let attribute: Attribute = map.next_value()?;
                    attributes.insert(key, attribute);
                }
            }
        }

        let id = id.ok_or_else(|| de::Error::missing_field(ID_KEY))?;
        if id.is_empty() {
            return Err(de::Error::invalid_value(
                de::Unexpected::Str(""),
                &"a non-empty entity id",
            ));
        }
        let type_ = type_.ok_or_else(|| de::Error::missing_field(TYPE_KEY))?;

        Ok(Entity {
            id,
            type_,
            attributes,
        })
    }
}
