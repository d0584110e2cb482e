//! Identity, properties and attached components shared by every addressable entity

use crate::attribute::Attribute;
use crate::component::{rename_key, ComponentDefinition, ComponentInstance};
use crate::error::GenericError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Name, id, properties and components of a map, layer, object, tileset or tile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub id: Uuid,
    pub name: String,
    /// Properties ordered by name
    #[serde(default)]
    pub properties: BTreeMap<String, Attribute>,
    /// Attached components keyed by their definition id
    #[serde(default)]
    pub components: IndexMap<Uuid, ComponentInstance>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new("")
    }
}

impl Metadata {
    /// Create a metadata block with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            properties: BTreeMap::new(),
            components: IndexMap::new(),
        }
    }

    /// Create or replace a property with an empty string value
    pub fn add_property(&mut self, name: &str) -> &mut Attribute {
        let slot = self.properties.entry(name.to_string()).or_default();
        *slot = Attribute::default();
        slot
    }

    /// Insert or overwrite a property, returning the previous value
    pub fn set_property(&mut self, name: &str, value: Attribute) -> Option<Attribute> {
        self.properties.insert(name.to_string(), value)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn get_property(&self, name: &str) -> Result<&Attribute, GenericError> {
        self.properties.get(name).ok_or(GenericError::NotFound)
    }

    pub fn get_property_mut(&mut self, name: &str) -> Result<&mut Attribute, GenericError> {
        self.properties.get_mut(name).ok_or(GenericError::NotFound)
    }

    pub fn remove_property(&mut self, name: &str) -> Option<Attribute> {
        self.properties.remove(name)
    }

    /// Rename a property, returns `false` if `old` is missing or `new` exists
    pub fn rename_property(&mut self, old: &str, new: &str) -> bool {
        rename_key(&mut self.properties, old, new)
    }

    /// Attach a snapshot of `definition`, returns `false` if already attached
    pub fn attach_component(&mut self, definition: &ComponentDefinition) -> bool {
        if self.components.contains_key(&definition.id) {
            return false;
        }
        self.components
            .insert(definition.id, definition.instantiate());
        true
    }

    pub fn detach_component(&mut self, definition: Uuid) -> Option<ComponentInstance> {
        self.components.shift_remove(&definition)
    }

    pub fn has_component(&self, definition: Uuid) -> bool {
        self.components.contains_key(&definition)
    }

    pub fn component(&self, definition: Uuid) -> Option<&ComponentInstance> {
        self.components.get(&definition)
    }

    pub fn component_mut(&mut self, definition: Uuid) -> Option<&mut ComponentInstance> {
        self.components.get_mut(&definition)
    }
}
