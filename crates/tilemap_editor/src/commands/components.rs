//! Component definitions and the instances attached to map entities
//!
//! Definition edits reach every instance of the definition in the map, so
//! commands that change an attribute's name, type or existence also record
//! the affected instance values for undo.

use super::{context_mut, Command, CommandKind};
use crate::document::MapDocument;
use tilemap_core::{
    Attribute, AttributeType, ComponentDefinition, ComponentInstance, Map, Metadata,
};
use uuid::Uuid;

/// Call `f` with the context id and instance of every attachment of `definition`
fn for_each_instance<F>(map: &mut Map, definition: Uuid, mut f: F)
where
    F: FnMut(Uuid, &mut ComponentInstance),
{
    map.visit_metadata_mut(&mut |metadata: &mut Metadata| {
        let context = metadata.id;
        if let Some(instance) = metadata.components.get_mut(&definition) {
            f(context, instance);
        }
    });
}

fn instance_mut(map: &mut Map, context: Uuid, definition: Uuid) -> Option<&mut ComponentInstance> {
    map.find_metadata_mut(context)?.component_mut(definition)
}

fn definition_mut(doc: &mut MapDocument, id: Uuid) -> Option<&mut ComponentDefinition> {
    let definition = doc.components.get_mut(id);
    if definition.is_none() {
        tracing::error!("Component definition {} not found", id);
    }
    definition
}

#[derive(Debug, Clone)]
pub struct DefineComponent {
    name: String,
    id: Option<Uuid>,
    removed: Option<(usize, ComponentDefinition)>,
}

impl DefineComponent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            removed: None,
        }
    }

    /// Id of the new definition, once the command has run
    pub fn definition_id(&self) -> Option<Uuid> {
        self.id
    }
}

impl Command<MapDocument> for DefineComponent {
    fn redo(&mut self, doc: &mut MapDocument) {
        if let Some((index, definition)) = self.removed.take() {
            if !doc.components.insert(index, definition.clone()) {
                tracing::error!("Cannot redefine component '{}': name is taken", self.name);
                self.removed = Some((index, definition));
            }
            return;
        }
        self.id = doc.components.define(&self.name);
        if self.id.is_none() {
            tracing::warn!("Component '{}' is already defined", self.name);
        }
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        if let Some(id) = self.id {
            self.removed = doc.components.remove(id);
        }
    }

    fn kind(&self) -> CommandKind {
        CommandKind::DefineComponent
    }
}

/// Delete a definition and detach it from every entity
#[derive(Debug, Clone)]
pub struct UndefComponent {
    id: Uuid,
    removed: Option<(usize, ComponentDefinition)>,
    /// Context, position in the context's component list, and instance
    instances: Vec<(Uuid, usize, ComponentInstance)>,
}

impl UndefComponent {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            removed: None,
            instances: Vec::new(),
        }
    }
}

impl Command<MapDocument> for UndefComponent {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some(removed) = doc.components.remove(self.id) else {
            tracing::error!("Cannot remove component definition {}: not found", self.id);
            return;
        };
        self.removed = Some(removed);
        let id = self.id;
        let instances = &mut self.instances;
        instances.clear();
        doc.map.visit_metadata_mut(&mut |metadata: &mut Metadata| {
            if let Some((index, _, instance)) = metadata.components.shift_remove_full(&id) {
                instances.push((metadata.id, index, instance));
            }
        });
        tracing::debug!(
            "Removed component definition {} and {} instances",
            self.id,
            self.instances.len()
        );
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        let Some((index, definition)) = self.removed.take() else {
            return;
        };
        if !doc.components.insert(index, definition.clone()) {
            tracing::error!("Cannot restore component '{}': name is taken", definition.name);
            self.removed = Some((index, definition));
            return;
        }
        for (context, index, instance) in self.instances.drain(..) {
            match doc.map.find_metadata_mut(context) {
                Some(metadata) => {
                    let index = index.min(metadata.components.len());
                    metadata.components.shift_insert(index, self.id, instance);
                }
                None => tracing::error!("Cannot reattach component: context {} not found", context),
            }
        }
    }

    fn kind(&self) -> CommandKind {
        CommandKind::UndefComponent
    }
}

#[derive(Debug, Clone)]
pub struct RenameComponent {
    id: Uuid,
    name: String,
    old: Option<String>,
}

impl RenameComponent {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            old: None,
        }
    }
}

impl Command<MapDocument> for RenameComponent {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some(old) = doc.components.get(self.id).map(|d| d.name.clone()) else {
            tracing::error!("Cannot rename component {}: not found", self.id);
            return;
        };
        if doc.components.rename(self.id, &self.name) {
            self.old = Some(old);
        } else {
            tracing::warn!("Cannot rename component '{}': '{}' exists", old, self.name);
        }
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        if let Some(old) = self.old.take() {
            doc.components.rename(self.id, &old);
        }
    }

    fn kind(&self) -> CommandKind {
        CommandKind::RenameComponent
    }
}

/// Add an attribute to a definition and to every attached instance
#[derive(Debug, Clone)]
pub struct AddComponentAttr {
    definition: Uuid,
    name: String,
    default: Attribute,
    applied: bool,
    /// Contexts whose instance received the attribute
    extended: Vec<Uuid>,
}

impl AddComponentAttr {
    /// A new string attribute with an empty default
    pub fn new(definition: Uuid, name: impl Into<String>) -> Self {
        Self::with_default(definition, name, Attribute::default())
    }

    pub fn with_default(definition: Uuid, name: impl Into<String>, default: Attribute) -> Self {
        Self {
            definition,
            name: name.into(),
            default,
            applied: false,
            extended: Vec::new(),
        }
    }
}

impl Command<MapDocument> for AddComponentAttr {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some(definition) = definition_mut(doc, self.definition) else {
            return;
        };
        self.applied = definition.add_attribute(&self.name, self.default.clone());
        if !self.applied {
            tracing::warn!("Attribute '{}' already exists", self.name);
            return;
        }
        let (name, default, extended) = (&self.name, &self.default, &mut self.extended);
        extended.clear();
        for_each_instance(&mut doc.map, self.definition, |context, instance| {
            if !instance.values.contains_key(name) {
                instance.values.insert(name.clone(), default.clone());
                extended.push(context);
            }
        });
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        if !self.applied {
            return;
        }
        if let Some(definition) = doc.components.get_mut(self.definition) {
            definition.remove_attribute(&self.name);
        }
        for context in self.extended.drain(..) {
            if let Some(instance) = instance_mut(&mut doc.map, context, self.definition) {
                instance.values.remove(&self.name);
            }
        }
        self.applied = false;
    }

    fn kind(&self) -> CommandKind {
        CommandKind::AddComponentAttr
    }
}

#[derive(Debug, Clone)]
pub struct RemoveComponentAttr {
    definition: Uuid,
    name: String,
    removed: Option<Attribute>,
    values: Vec<(Uuid, Attribute)>,
}

impl RemoveComponentAttr {
    pub fn new(definition: Uuid, name: impl Into<String>) -> Self {
        Self {
            definition,
            name: name.into(),
            removed: None,
            values: Vec::new(),
        }
    }
}

impl Command<MapDocument> for RemoveComponentAttr {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some(definition) = definition_mut(doc, self.definition) else {
            return;
        };
        self.removed = definition.remove_attribute(&self.name);
        if self.removed.is_none() {
            tracing::warn!("No attribute '{}' to remove", self.name);
            return;
        }
        let (name, values) = (&self.name, &mut self.values);
        values.clear();
        for_each_instance(&mut doc.map, self.definition, |context, instance| {
            if let Some(value) = instance.values.remove(name) {
                values.push((context, value));
            }
        });
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        let Some(default) = self.removed.take() else {
            return;
        };
        if let Some(definition) = doc.components.get_mut(self.definition) {
            definition.add_attribute(&self.name, default);
        }
        for (context, value) in self.values.drain(..) {
            if let Some(instance) = instance_mut(&mut doc.map, context, self.definition) {
                instance.values.insert(self.name.clone(), value);
            }
        }
    }

    fn kind(&self) -> CommandKind {
        CommandKind::RemoveComponentAttr
    }
}

#[derive(Debug, Clone)]
pub struct RenameComponentAttr {
    definition: Uuid,
    old: String,
    new: String,
    applied: bool,
    renamed: Vec<Uuid>,
}

impl RenameComponentAttr {
    pub fn new(definition: Uuid, old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            definition,
            old: old.into(),
            new: new.into(),
            applied: false,
            renamed: Vec::new(),
        }
    }
}

impl Command<MapDocument> for RenameComponentAttr {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some(definition) = definition_mut(doc, self.definition) else {
            return;
        };
        self.applied = definition.rename_attribute(&self.old, &self.new);
        if !self.applied {
            tracing::warn!("Cannot rename attribute '{}' to '{}'", self.old, self.new);
            return;
        }
        let (old, new, renamed) = (&self.old, &self.new, &mut self.renamed);
        renamed.clear();
        for_each_instance(&mut doc.map, self.definition, |context, instance| {
            if instance.rename(old, new) {
                renamed.push(context);
            }
        });
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        if !self.applied {
            return;
        }
        if let Some(definition) = doc.components.get_mut(self.definition) {
            definition.rename_attribute(&self.new, &self.old);
        }
        for context in self.renamed.drain(..) {
            if let Some(instance) = instance_mut(&mut doc.map, context, self.definition) {
                instance.rename(&self.new, &self.old);
            }
        }
        self.applied = false;
    }

    fn kind(&self) -> CommandKind {
        CommandKind::RenameComponentAttr
    }
}

/// Retype a definition attribute and every instance value of it
///
/// Values are reset to the default of the new type; undo restores the old
/// default and each instance's old value.
#[derive(Debug, Clone)]
pub struct SetComponentAttrType {
    definition: Uuid,
    name: String,
    ty: AttributeType,
    old_default: Option<Attribute>,
    values: Vec<(Uuid, Attribute)>,
}

impl SetComponentAttrType {
    pub fn new(definition: Uuid, name: impl Into<String>, ty: AttributeType) -> Self {
        Self {
            definition,
            name: name.into(),
            ty,
            old_default: None,
            values: Vec::new(),
        }
    }
}

impl Command<MapDocument> for SetComponentAttrType {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some(definition) = definition_mut(doc, self.definition) else {
            return;
        };
        let Some(old) = definition.attribute(&self.name).cloned() else {
            tracing::error!("Cannot retype attribute '{}': not found", self.name);
            return;
        };
        definition.set_attribute_type(&self.name, self.ty);
        self.old_default = Some(old);

        let (name, ty, values) = (&self.name, self.ty, &mut self.values);
        values.clear();
        for_each_instance(&mut doc.map, self.definition, |context, instance| {
            if let Some(value) = instance.values.get_mut(name) {
                values.push((context, value.clone()));
                value.set_type(ty);
            }
        });
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        let Some(old) = self.old_default.take() else {
            return;
        };
        if let Some(definition) = doc.components.get_mut(self.definition) {
            definition.attributes.insert(self.name.clone(), old);
        }
        for (context, value) in self.values.drain(..) {
            if let Some(instance) = instance_mut(&mut doc.map, context, self.definition) {
                instance.set(&self.name, value);
            }
        }
    }

    fn kind(&self) -> CommandKind {
        CommandKind::SetComponentAttrType
    }
}

/// Change a definition attribute's default value
///
/// Attached instances keep their values; only future attachments see the
/// new default. Edits of the same attribute merge.
#[derive(Debug, Clone)]
pub struct UpdateComponentAttr {
    definition: Uuid,
    name: String,
    value: Attribute,
    old: Option<Attribute>,
}

impl UpdateComponentAttr {
    pub fn new(definition: Uuid, name: impl Into<String>, value: Attribute) -> Self {
        Self {
            definition,
            name: name.into(),
            value,
            old: None,
        }
    }

    pub(super) fn merge(&mut self, other: &Self) -> bool {
        if self.definition != other.definition || self.name != other.name {
            return false;
        }
        self.value = other.value.clone();
        true
    }
}

impl Command<MapDocument> for UpdateComponentAttr {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some(definition) = definition_mut(doc, self.definition) else {
            return;
        };
        match definition.attributes.get_mut(&self.name) {
            Some(slot) => self.old = Some(std::mem::replace(slot, self.value.clone())),
            None => tracing::error!("Cannot update attribute '{}': not found", self.name),
        }
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        let Some(old) = self.old.take() else {
            return;
        };
        if let Some(slot) = doc
            .components
            .get_mut(self.definition)
            .and_then(|definition| definition.attributes.get_mut(&self.name))
        {
            *slot = old;
        }
    }

    fn kind(&self) -> CommandKind {
        CommandKind::UpdateComponentAttr
    }
}

/// Attach a snapshot of a definition to a metadata context
#[derive(Debug, Clone)]
pub struct AttachComponent {
    context: Uuid,
    definition: Uuid,
    applied: bool,
}

impl AttachComponent {
    pub fn new(context: Uuid, definition: Uuid) -> Self {
        Self {
            context,
            definition,
            applied: false,
        }
    }
}

impl Command<MapDocument> for AttachComponent {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some(definition) = doc.components.get(self.definition) else {
            tracing::error!("Cannot attach component {}: not defined", self.definition);
            return;
        };
        let Some(metadata) = context_mut(&mut doc.map, self.context) else {
            return;
        };
        self.applied = metadata.attach_component(definition);
        if !self.applied {
            tracing::warn!("Component '{}' is already attached", definition.name);
        }
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        if !self.applied {
            return;
        }
        if let Some(metadata) = context_mut(&mut doc.map, self.context) {
            metadata.detach_component(self.definition);
            self.applied = false;
        }
    }

    fn kind(&self) -> CommandKind {
        CommandKind::AttachComponent
    }
}

#[derive(Debug, Clone)]
pub struct DetachComponent {
    context: Uuid,
    definition: Uuid,
    removed: Option<(usize, ComponentInstance)>,
}

impl DetachComponent {
    pub fn new(context: Uuid, definition: Uuid) -> Self {
        Self {
            context,
            definition,
            removed: None,
        }
    }
}

impl Command<MapDocument> for DetachComponent {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some(metadata) = context_mut(&mut doc.map, self.context) else {
            return;
        };
        self.removed = metadata
            .components
            .shift_remove_full(&self.definition)
            .map(|(index, _, instance)| (index, instance));
        if self.removed.is_none() {
            tracing::warn!("Component {} is not attached", self.definition);
        }
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        let (Some((index, instance)), Some(metadata)) =
            (self.removed.take(), context_mut(&mut doc.map, self.context))
        else {
            return;
        };
        let index = index.min(metadata.components.len());
        metadata
            .components
            .shift_insert(index, self.definition, instance);
    }

    fn kind(&self) -> CommandKind {
        CommandKind::DetachComponent
    }
}

/// Set one value of an attached component; edits of the same value merge
#[derive(Debug, Clone)]
pub struct UpdateAttachedComponent {
    context: Uuid,
    definition: Uuid,
    name: String,
    value: Attribute,
    old: Option<Attribute>,
}

impl UpdateAttachedComponent {
    pub fn new(context: Uuid, definition: Uuid, name: impl Into<String>, value: Attribute) -> Self {
        Self {
            context,
            definition,
            name: name.into(),
            value,
            old: None,
        }
    }

    pub(super) fn merge(&mut self, other: &Self) -> bool {
        if self.context != other.context
            || self.definition != other.definition
            || self.name != other.name
        {
            return false;
        }
        self.value = other.value.clone();
        true
    }
}

impl Command<MapDocument> for UpdateAttachedComponent {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some(instance) = instance_mut(&mut doc.map, self.context, self.definition) else {
            tracing::error!(
                "Cannot update component value '{}': component {} not attached to {}",
                self.name,
                self.definition,
                self.context
            );
            return;
        };
        self.old = instance.set(&self.name, self.value.clone());
        if self.old.is_none() {
            tracing::error!("Cannot update component value '{}': not found", self.name);
        }
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        let Some(old) = self.old.take() else {
            return;
        };
        if let Some(instance) = instance_mut(&mut doc.map, self.context, self.definition) {
            instance.set(&self.name, old);
        }
    }

    fn kind(&self) -> CommandKind {
        CommandKind::UpdateAttachedComponent
    }
}

/// Reset an attached component to its definition's current defaults
#[derive(Debug, Clone)]
pub struct ResetAttachedComponent {
    context: Uuid,
    definition: Uuid,
    old: Option<ComponentInstance>,
}

impl ResetAttachedComponent {
    pub fn new(context: Uuid, definition: Uuid) -> Self {
        Self {
            context,
            definition,
            old: None,
        }
    }
}

impl Command<MapDocument> for ResetAttachedComponent {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some(definition) = doc.components.get(self.definition) else {
            tracing::error!("Cannot reset component {}: not defined", self.definition);
            return;
        };
        let Some(instance) = instance_mut(&mut doc.map, self.context, self.definition) else {
            tracing::error!("Cannot reset component '{}': not attached", definition.name);
            return;
        };
        self.old = Some(std::mem::replace(instance, definition.instantiate()));
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        let Some(old) = self.old.take() else {
            return;
        };
        if let Some(instance) = instance_mut(&mut doc.map, self.context, self.definition) {
            *instance = old;
        }
    }

    fn kind(&self) -> CommandKind {
        CommandKind::ResetAttachedComponent
    }
}
