use super::{Command, CommandKind};
use crate::document::MapDocument;
use tilemap_core::{Layer, Object, Vec2};
use uuid::Uuid;

/// Place an object on an object layer
///
/// The object gets a persistent id the first time it is added.
#[derive(Debug, Clone)]
pub struct AddObject {
    layer: Uuid,
    id: Uuid,
    /// The object while it is not in the layer
    object: Option<Object>,
    index: Option<usize>,
}

impl AddObject {
    pub fn new(layer: Uuid, object: Object) -> Self {
        Self {
            layer,
            id: object.metadata.id,
            object: Some(object),
            index: None,
        }
    }

    pub fn object_id(&self) -> Uuid {
        self.id
    }
}

impl Command<MapDocument> for AddObject {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some(mut object) = self.object.take() else {
            return;
        };
        if object.persistent_id.is_none() {
            object.persistent_id = Some(doc.map.take_object_id());
        }
        let Some(objects) = doc.map.find_layer_mut(self.layer).and_then(Layer::as_objects_mut)
        else {
            tracing::error!("Cannot add object: no object layer {}", self.layer);
            self.object = Some(object);
            return;
        };
        match self.index {
            Some(index) => objects.insert_at(index, object),
            None => {
                objects.insert(object);
            }
        }
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        let removed = doc
            .map
            .find_layer_mut(self.layer)
            .and_then(Layer::as_objects_mut)
            .and_then(|objects| objects.remove(self.id));
        let Some((index, object)) = removed else {
            tracing::error!("Cannot undo object placement: object {} not found", self.id);
            return;
        };
        self.index = Some(index);
        self.object = Some(object);
    }

    fn kind(&self) -> CommandKind {
        CommandKind::AddObject
    }
}

#[derive(Debug, Clone)]
pub struct RemoveObject {
    id: Uuid,
    /// Owning layer, position and contents of the removed object
    removed: Option<(Uuid, usize, Object)>,
}

impl RemoveObject {
    pub fn new(id: Uuid) -> Self {
        Self { id, removed: None }
    }
}

impl Command<MapDocument> for RemoveObject {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some((layer, _)) = doc.map.root.find_object(self.id) else {
            tracing::error!("Cannot remove object {}: not found", self.id);
            return;
        };
        let removed = doc
            .map
            .find_layer_mut(layer)
            .and_then(Layer::as_objects_mut)
            .and_then(|objects| objects.remove(self.id));
        if let Some((index, object)) = removed {
            self.removed = Some((layer, index, object));
        }
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        let Some((layer, index, object)) = self.removed.take() else {
            return;
        };
        match doc.map.find_layer_mut(layer).and_then(Layer::as_objects_mut) {
            Some(objects) => objects.insert_at(index, object),
            None => {
                tracing::error!("Cannot restore object {}: layer {} not found", self.id, layer);
                self.removed = Some((layer, index, object));
            }
        }
    }

    fn kind(&self) -> CommandKind {
        CommandKind::RemoveObject
    }
}

/// Move an object; consecutive moves of the same object merge
#[derive(Debug, Clone)]
pub struct MoveObject {
    id: Uuid,
    position: Vec2,
    old: Option<Vec2>,
}

impl MoveObject {
    pub fn new(id: Uuid, position: Vec2) -> Self {
        Self {
            id,
            position,
            old: None,
        }
    }

    pub(super) fn merge(&mut self, other: &Self) -> bool {
        if self.id != other.id {
            return false;
        }
        self.position = other.position;
        true
    }
}

impl Command<MapDocument> for MoveObject {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some(object) = doc.map.root.find_object_mut(self.id) else {
            tracing::error!("Cannot move object {}: not found", self.id);
            return;
        };
        self.old = Some(std::mem::replace(&mut object.position, self.position));
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        if let (Some(old), Some(object)) = (self.old, doc.map.root.find_object_mut(self.id)) {
            object.position = old;
        }
    }

    fn kind(&self) -> CommandKind {
        CommandKind::MoveObject
    }
}

#[derive(Debug, Clone)]
pub struct SetObjectName {
    id: Uuid,
    name: String,
    old: Option<String>,
}

impl SetObjectName {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            old: None,
        }
    }
}

impl Command<MapDocument> for SetObjectName {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some(object) = doc.map.root.find_object_mut(self.id) else {
            tracing::error!("Cannot rename object {}: not found", self.id);
            return;
        };
        self.old = Some(std::mem::replace(
            &mut object.metadata.name,
            self.name.clone(),
        ));
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        if let (Some(old), Some(object)) = (self.old.take(), doc.map.root.find_object_mut(self.id))
        {
            object.metadata.name = old;
        }
    }

    fn kind(&self) -> CommandKind {
        CommandKind::SetObjectName
    }
}

/// Set an object's free-form tag (Tiled's object class)
#[derive(Debug, Clone)]
pub struct SetObjectTag {
    id: Uuid,
    tag: String,
    old: Option<String>,
}

impl SetObjectTag {
    pub fn new(id: Uuid, tag: impl Into<String>) -> Self {
        Self {
            id,
            tag: tag.into(),
            old: None,
        }
    }
}

impl Command<MapDocument> for SetObjectTag {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some(object) = doc.map.root.find_object_mut(self.id) else {
            tracing::error!("Cannot tag object {}: not found", self.id);
            return;
        };
        self.old = Some(std::mem::replace(&mut object.tag, self.tag.clone()));
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        if let (Some(old), Some(object)) = (self.old.take(), doc.map.root.find_object_mut(self.id))
        {
            object.tag = old;
        }
    }

    fn kind(&self) -> CommandKind {
        CommandKind::SetObjectTag
    }
}

#[derive(Debug, Clone)]
pub struct SetObjectVisible {
    id: Uuid,
    visible: bool,
    old: Option<bool>,
}

impl SetObjectVisible {
    pub fn new(id: Uuid, visible: bool) -> Self {
        Self {
            id,
            visible,
            old: None,
        }
    }
}

impl Command<MapDocument> for SetObjectVisible {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some(object) = doc.map.root.find_object_mut(self.id) else {
            tracing::error!("Cannot change visibility of object {}: not found", self.id);
            return;
        };
        self.old = Some(std::mem::replace(&mut object.visible, self.visible));
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        if let (Some(old), Some(object)) = (self.old, doc.map.root.find_object_mut(self.id)) {
            object.visible = old;
        }
    }

    fn kind(&self) -> CommandKind {
        CommandKind::SetObjectVisible
    }
}
