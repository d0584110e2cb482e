//! Property edits on any metadata context: the map, a layer, an object,
//! a tileset or a tile definition

use super::{context_mut, Command, CommandKind};
use crate::document::MapDocument;
use tilemap_core::{Attribute, AttributeType};
use uuid::Uuid;

/// Add a property, replacing any existing one of the same name
#[derive(Debug, Clone)]
pub struct AddProperty {
    context: Uuid,
    name: String,
    value: Attribute,
    /// `Some(None)` when the property did not exist before
    previous: Option<Option<Attribute>>,
}

impl AddProperty {
    /// A new string property with an empty value
    pub fn new(context: Uuid, name: impl Into<String>) -> Self {
        Self::with_value(context, name, Attribute::default())
    }

    pub fn with_value(context: Uuid, name: impl Into<String>, value: Attribute) -> Self {
        Self {
            context,
            name: name.into(),
            value,
            previous: None,
        }
    }
}

impl Command<MapDocument> for AddProperty {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some(metadata) = context_mut(&mut doc.map, self.context) else {
            return;
        };
        self.previous = Some(metadata.set_property(&self.name, self.value.clone()));
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        let (Some(previous), Some(metadata)) =
            (self.previous.take(), context_mut(&mut doc.map, self.context))
        else {
            return;
        };
        match previous {
            Some(value) => {
                metadata.set_property(&self.name, value);
            }
            None => {
                metadata.remove_property(&self.name);
            }
        }
    }

    fn kind(&self) -> CommandKind {
        CommandKind::AddProperty
    }
}

#[derive(Debug, Clone)]
pub struct RemoveProperty {
    context: Uuid,
    name: String,
    removed: Option<Attribute>,
}

impl RemoveProperty {
    pub fn new(context: Uuid, name: impl Into<String>) -> Self {
        Self {
            context,
            name: name.into(),
            removed: None,
        }
    }
}

impl Command<MapDocument> for RemoveProperty {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some(metadata) = context_mut(&mut doc.map, self.context) else {
            return;
        };
        self.removed = metadata.remove_property(&self.name);
        if self.removed.is_none() {
            tracing::warn!("No property '{}' to remove", self.name);
        }
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        let (Some(value), Some(metadata)) =
            (self.removed.take(), context_mut(&mut doc.map, self.context))
        else {
            return;
        };
        metadata.set_property(&self.name, value);
    }

    fn kind(&self) -> CommandKind {
        CommandKind::RemoveProperty
    }
}

#[derive(Debug, Clone)]
pub struct RenameProperty {
    context: Uuid,
    old: String,
    new: String,
    applied: bool,
}

impl RenameProperty {
    pub fn new(context: Uuid, old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            context,
            old: old.into(),
            new: new.into(),
            applied: false,
        }
    }
}

impl Command<MapDocument> for RenameProperty {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some(metadata) = context_mut(&mut doc.map, self.context) else {
            return;
        };
        self.applied = metadata.rename_property(&self.old, &self.new);
        if !self.applied {
            tracing::warn!("Cannot rename property '{}' to '{}'", self.old, self.new);
        }
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        if !self.applied {
            return;
        }
        if let Some(metadata) = context_mut(&mut doc.map, self.context) {
            metadata.rename_property(&self.new, &self.old);
            self.applied = false;
        }
    }

    fn kind(&self) -> CommandKind {
        CommandKind::RenameProperty
    }
}

/// Set a property's value; edits of the same property merge
#[derive(Debug, Clone)]
pub struct UpdateProperty {
    context: Uuid,
    name: String,
    value: Attribute,
    old: Option<Attribute>,
}

impl UpdateProperty {
    pub fn new(context: Uuid, name: impl Into<String>, value: Attribute) -> Self {
        Self {
            context,
            name: name.into(),
            value,
            old: None,
        }
    }

    pub(super) fn merge(&mut self, other: &Self) -> bool {
        if self.context != other.context || self.name != other.name {
            return false;
        }
        self.value = other.value.clone();
        true
    }
}

impl Command<MapDocument> for UpdateProperty {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some(metadata) = context_mut(&mut doc.map, self.context) else {
            return;
        };
        match metadata.get_property_mut(&self.name) {
            Ok(slot) => self.old = Some(std::mem::replace(slot, self.value.clone())),
            Err(e) => tracing::error!("Cannot update property '{}': {}", self.name, e),
        }
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        let (Some(old), Some(metadata)) =
            (self.old.take(), context_mut(&mut doc.map, self.context))
        else {
            return;
        };
        if let Ok(slot) = metadata.get_property_mut(&self.name) {
            *slot = old;
        }
    }

    fn kind(&self) -> CommandKind {
        CommandKind::UpdateProperty
    }
}

/// Retype a property, resetting it to the default of the new type
#[derive(Debug, Clone)]
pub struct ChangePropertyType {
    context: Uuid,
    name: String,
    ty: AttributeType,
    old: Option<Attribute>,
}

impl ChangePropertyType {
    pub fn new(context: Uuid, name: impl Into<String>, ty: AttributeType) -> Self {
        Self {
            context,
            name: name.into(),
            ty,
            old: None,
        }
    }
}

impl Command<MapDocument> for ChangePropertyType {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some(metadata) = context_mut(&mut doc.map, self.context) else {
            return;
        };
        match metadata.get_property_mut(&self.name) {
            Ok(slot) => {
                self.old = Some(slot.clone());
                slot.set_type(self.ty);
            }
            Err(e) => tracing::error!("Cannot retype property '{}': {}", self.name, e),
        }
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        let (Some(old), Some(metadata)) =
            (self.old.take(), context_mut(&mut doc.map, self.context))
        else {
            return;
        };
        if let Ok(slot) = metadata.get_property_mut(&self.name) {
            *slot = old;
        }
    }

    fn kind(&self) -> CommandKind {
        CommandKind::ChangePropertyType
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{check_inverse, document, layer_id};
    use crate::commands::{CommandStack, MapCommand};

    #[test]
    fn test_add_property_replaces_and_restores() {
        let mut doc = document();
        let map = doc.map.metadata.id;
        doc.map.metadata.set_property("hp", Attribute::Int(5));

        check_inverse(&mut doc, AddProperty::new(map, "hp"));
        assert_eq!(doc.map.metadata.get_property("hp"), Ok(&Attribute::default()));
        check_inverse(&mut doc, AddProperty::new(map, "fresh"));
        assert!(doc.map.metadata.has_property("fresh"));
    }

    #[test]
    fn test_properties_on_a_layer() {
        let mut doc = document();
        let ground = layer_id(&doc, "ground");
        let mut stack = CommandStack::new(10);
        stack.push(&mut doc, MapCommand::from(AddProperty::new(ground, "speed")));
        stack.push(
            &mut doc,
            MapCommand::from(ChangePropertyType::new(ground, "speed", AttributeType::Float)),
        );
        stack.push(
            &mut doc,
            MapCommand::from(UpdateProperty::new(ground, "speed", Attribute::Float(1.5))),
        );
        stack.push(
            &mut doc,
            MapCommand::from(RenameProperty::new(ground, "speed", "velocity")),
        );

        let metadata = &doc.map.find_layer(ground).unwrap().metadata;
        assert_eq!(metadata.get_property("velocity"), Ok(&Attribute::Float(1.5)));

        stack.undo(&mut doc);
        stack.undo(&mut doc);
        let metadata = &doc.map.find_layer(ground).unwrap().metadata;
        assert_eq!(metadata.get_property("speed"), Ok(&Attribute::Float(0.0)));
        stack.undo(&mut doc);
        stack.undo(&mut doc);
        assert!(doc.map.find_layer(ground).unwrap().metadata.properties.is_empty());
    }

    #[test]
    fn test_updates_merge_per_property() {
        let mut doc = document();
        let map = doc.map.metadata.id;
        doc.map.metadata.set_property("a", Attribute::Int(0));
        doc.map.metadata.set_property("b", Attribute::Int(0));
        let mut stack = CommandStack::new(10);
        for value in 1..=3 {
            let update = UpdateProperty::new(map, "a", Attribute::Int(value));
            stack.push(&mut doc, MapCommand::from(update));
        }
        stack.push(&mut doc, MapCommand::from(UpdateProperty::new(map, "b", Attribute::Int(9))));
        assert_eq!(stack.len(), 2);

        stack.undo(&mut doc);
        stack.undo(&mut doc);
        assert_eq!(doc.map.metadata.get_property("a"), Ok(&Attribute::Int(0)));
        stack.redo(&mut doc);
        assert_eq!(doc.map.metadata.get_property("a"), Ok(&Attribute::Int(3)));
    }

    #[test]
    fn test_failed_edits_leave_model_unchanged() {
        let mut doc = document();
        let map = doc.map.metadata.id;
        doc.map.metadata.set_property("a", Attribute::Int(1));
        doc.map.metadata.set_property("b", Attribute::Int(2));

        check_inverse(&mut doc, RenameProperty::new(map, "a", "b"));
        check_inverse(&mut doc, RenameProperty::new(map, "missing", "c"));
        check_inverse(&mut doc, RemoveProperty::new(map, "missing"));
        check_inverse(&mut doc, UpdateProperty::new(map, "missing", Attribute::Int(3)));
        check_inverse(&mut doc, AddProperty::new(Uuid::new_v4(), "x"));
        assert_eq!(doc.map.metadata.get_property("a"), Ok(&Attribute::Int(1)));
    }

    #[test]
    fn test_remove_property() {
        let mut doc = document();
        let map = doc.map.metadata.id;
        doc.map.metadata.set_property("a", Attribute::Bool(true));
        check_inverse(&mut doc, RemoveProperty::new(map, "a"));
        assert!(!doc.map.metadata.has_property("a"));
    }
}
