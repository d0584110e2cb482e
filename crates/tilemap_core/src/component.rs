//! Component definitions and the per-entity instances attached from them
//!
//! A [`ComponentDefinition`] is a named attribute schema with default values.
//! Attaching it to a [`Metadata`](crate::Metadata) block copies the current
//! attributes into a [`ComponentInstance`], which is then edited on its own.
//! Instances point back at their definition by id only.

use crate::attribute::{Attribute, AttributeType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A named attribute schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDefinition {
    pub id: Uuid,
    pub name: String,
    /// Attribute names mapped to their default values
    pub attributes: BTreeMap<String, Attribute>,
}

impl ComponentDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add an attribute, returns `false` if the name is taken
    pub fn add_attribute(&mut self, name: &str, default: Attribute) -> bool {
        if self.attributes.contains_key(name) {
            return false;
        }
        self.attributes.insert(name.to_string(), default);
        true
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<Attribute> {
        self.attributes.remove(name)
    }

    /// Rename an attribute, returns `false` if `old` is missing or `new` exists
    pub fn rename_attribute(&mut self, old: &str, new: &str) -> bool {
        rename_key(&mut self.attributes, old, new)
    }

    /// Change an attribute's type, resetting its default value
    pub fn set_attribute_type(&mut self, name: &str, ty: AttributeType) -> bool {
        let Some(attr) = self.attributes.get_mut(name) else {
            return false;
        };
        attr.set_type(ty);
        true
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Snapshot the current attributes into a fresh instance
    pub fn instantiate(&self) -> ComponentInstance {
        ComponentInstance {
            definition: self.id,
            values: self.attributes.clone(),
        }
    }
}

/// A component attached to an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInstance {
    /// Id of the [`ComponentDefinition`] this was created from
    pub definition: Uuid,
    pub values: BTreeMap<String, Attribute>,
}

impl ComponentInstance {
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.values.get(name)
    }

    /// Overwrite an existing value, returning the previous one
    pub fn set(&mut self, name: &str, value: Attribute) -> Option<Attribute> {
        let slot = self.values.get_mut(name)?;
        Some(std::mem::replace(slot, value))
    }

    /// Rename a value, returns `false` if `old` is missing or `new` exists
    pub fn rename(&mut self, old: &str, new: &str) -> bool {
        rename_key(&mut self.values, old, new)
    }
}

pub(crate) fn rename_key<V>(map: &mut BTreeMap<String, V>, old: &str, new: &str) -> bool {
    if old == new {
        return map.contains_key(old);
    }
    if map.contains_key(new) {
        return false;
    }
    let Some(value) = map.remove(old) else {
        return false;
    };
    map.insert(new.to_string(), value);
    true
}

/// Document-wide table of component definitions, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentRegistry {
    definitions: IndexMap<Uuid, ComponentDefinition>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a new component, returns `None` if the name is already used
    pub fn define(&mut self, name: &str) -> Option<Uuid> {
        if self.find_by_name(name).is_some() {
            return None;
        }
        let definition = ComponentDefinition::new(name);
        let id = definition.id;
        self.definitions.insert(id, definition);
        Some(id)
    }

    /// Insert a complete definition at `index` (clamped to the end)
    ///
    /// Fails if the id or the name is already registered.
    pub fn insert(&mut self, index: usize, definition: ComponentDefinition) -> bool {
        if self.definitions.contains_key(&definition.id)
            || self.find_by_name(&definition.name).is_some()
        {
            return false;
        }
        let index = index.min(self.definitions.len());
        self.definitions
            .shift_insert(index, definition.id, definition);
        true
    }

    /// Remove a definition, returning its former position and contents
    pub fn remove(&mut self, id: Uuid) -> Option<(usize, ComponentDefinition)> {
        self.definitions
            .shift_remove_full(&id)
            .map(|(index, _, definition)| (index, definition))
    }

    /// Rename a definition, returns `false` on a missing id or a name collision
    pub fn rename(&mut self, id: Uuid, name: &str) -> bool {
        if let Some(existing) = self.find_by_name(name) {
            return existing.id == id;
        }
        let Some(definition) = self.definitions.get_mut(&id) else {
            return false;
        };
        definition.name = name.to_string();
        true
    }

    pub fn get(&self, id: Uuid) -> Option<&ComponentDefinition> {
        self.definitions.get(&id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut ComponentDefinition> {
        self.definitions.get_mut(&id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&ComponentDefinition> {
        self.definitions.values().find(|def| def.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentDefinition> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_rejects_duplicate_names() {
        let mut registry = ComponentRegistry::new();
        let health = registry.define("Health").unwrap();
        assert!(registry.define("Health").is_none());
        assert!(registry.define("Armor").is_some());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.find_by_name("Health").unwrap().id, health);
    }

    #[test]
    fn test_rename_collision() {
        let mut registry = ComponentRegistry::new();
        let health = registry.define("Health").unwrap();
        let armor = registry.define("Armor").unwrap();

        assert!(!registry.rename(armor, "Health"));
        assert!(registry.rename(health, "Hp"));
        assert_eq!(registry.get(health).unwrap().name, "Hp");
        assert!(!registry.rename(Uuid::new_v4(), "Ghost"));
    }

    #[test]
    fn test_remove_and_reinsert_keeps_order() {
        let mut registry = ComponentRegistry::new();
        let a = registry.define("A").unwrap();
        let b = registry.define("B").unwrap();
        let c = registry.define("C").unwrap();

        let (index, definition) = registry.remove(b).unwrap();
        assert_eq!(index, 1);
        assert!(registry.insert(index, definition));

        let order: Vec<Uuid> = registry.iter().map(|d| d.id).collect();
        assert_eq!(order, vec![a, b, c]);
    }

    #[test]
    fn test_instance_is_a_snapshot() {
        let mut definition = ComponentDefinition::new("Health");
        definition.add_attribute("hp", Attribute::Int(10));
        let mut instance = definition.instantiate();

        definition.set_attribute_type("hp", AttributeType::Float);
        assert_eq!(instance.get("hp"), Some(&Attribute::Int(10)));

        assert_eq!(instance.set("hp", Attribute::Int(3)), Some(Attribute::Int(10)));
        assert_eq!(instance.set("missing", Attribute::Int(3)), None);
    }

    #[test]
    fn test_attribute_rename() {
        let mut definition = ComponentDefinition::new("Stats");
        assert!(definition.add_attribute("a", Attribute::Int(1)));
        assert!(definition.add_attribute("b", Attribute::Int(2)));
        assert!(!definition.add_attribute("a", Attribute::Int(3)));
        assert!(!definition.rename_attribute("a", "b"));
        assert!(!definition.rename_attribute("zzz", "c"));
        assert!(definition.rename_attribute("a", "c"));
        assert_eq!(definition.attribute("c"), Some(&Attribute::Int(1)));
    }
}
