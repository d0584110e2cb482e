use super::{Command, CommandKind};
use crate::document::MapDocument;
use tilemap_core::{Layer, LayerType};
use uuid::Uuid;

/// Add a new layer to the active group, or the root
#[derive(Debug, Clone)]
pub struct CreateLayer {
    ty: LayerType,
    name: String,
    /// The created layer while it is undone
    layer: Option<Layer>,
    id: Option<Uuid>,
    parent: Option<Uuid>,
    previous_active: Option<Uuid>,
}

impl CreateLayer {
    pub fn new(ty: LayerType, name: impl Into<String>) -> Self {
        Self {
            ty,
            name: name.into(),
            layer: None,
            id: None,
            parent: None,
            previous_active: None,
        }
    }

    /// Id of the created layer, once the command has run
    pub fn layer_id(&self) -> Option<Uuid> {
        self.id
    }
}

impl Command<MapDocument> for CreateLayer {
    fn redo(&mut self, doc: &mut MapDocument) {
        let layer = match self.layer.take() {
            Some(layer) => layer,
            None => {
                self.parent = doc.map.insertion_group();
                doc.map.new_layer(self.ty, self.name.as_str())
            }
        };
        let id = layer.id();
        let index = doc
            .map
            .root
            .group_mut(self.parent)
            .map_or(0, |group| group.len());
        if let Err(layer) = doc.map.root.insert(self.parent, index, layer) {
            tracing::error!("Cannot create layer '{}': parent group is gone", self.name);
            self.layer = Some(layer);
            return;
        }
        self.id = Some(id);
        self.previous_active = doc.map.active_layer;
        doc.map.active_layer = Some(id);
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        let Some((_, _, layer)) = self.id.and_then(|id| doc.map.root.remove(id)) else {
            tracing::error!("Cannot undo layer creation: layer '{}' not found", self.name);
            return;
        };
        self.layer = Some(layer);
        doc.map.active_layer = self.previous_active;
    }

    fn kind(&self) -> CommandKind {
        CommandKind::CreateLayer
    }
}

#[derive(Debug, Clone)]
pub struct RemoveLayer {
    layer: Uuid,
    removed: Option<(Option<Uuid>, usize, Layer)>,
    /// Active layer that went away with the removed one
    lost_active: Option<Uuid>,
}

impl RemoveLayer {
    pub fn new(layer: Uuid) -> Self {
        Self {
            layer,
            removed: None,
            lost_active: None,
        }
    }
}

impl Command<MapDocument> for RemoveLayer {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some(removed) = doc.map.root.remove(self.layer) else {
            tracing::error!("Cannot remove layer {}: not found", self.layer);
            return;
        };
        self.removed = Some(removed);
        // the active layer may be the removed one or nested inside it
        self.lost_active = doc
            .map
            .active_layer
            .filter(|&active| doc.map.find_layer(active).is_none());
        if self.lost_active.is_some() {
            doc.map.active_layer = None;
        }
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        let Some((parent, index, layer)) = self.removed.take() else {
            return;
        };
        if let Err(layer) = doc.map.root.insert(parent, index, layer) {
            tracing::error!("Cannot restore layer {}: parent group is gone", self.layer);
            self.removed = Some((parent, index, layer));
            return;
        }
        if let Some(active) = self.lost_active.take() {
            doc.map.active_layer = Some(active);
        }
    }

    fn kind(&self) -> CommandKind {
        CommandKind::RemoveLayer
    }
}

/// Insert a deep copy of a layer right after it
#[derive(Debug, Clone)]
pub struct DuplicateLayer {
    source: Uuid,
    copy: Option<Layer>,
    id: Option<Uuid>,
}

impl DuplicateLayer {
    pub fn new(source: Uuid) -> Self {
        Self {
            source,
            copy: None,
            id: None,
        }
    }
}

impl Command<MapDocument> for DuplicateLayer {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some((parent, index)) = doc.map.root.locate(self.source) else {
            tracing::error!("Cannot duplicate layer {}: not found", self.source);
            return;
        };
        let copy = match self.copy.take() {
            Some(copy) => copy,
            None => {
                let Some(source) = doc.map.find_layer(self.source) else {
                    return;
                };
                let mut copy = source.duplicate();
                copy.metadata.name = format!("{} copy", source.name());
                doc.map.assign_persistent_ids(&mut copy);
                copy
            }
        };
        let id = copy.id();
        if let Err(copy) = doc.map.root.insert(parent, index + 1, copy) {
            self.copy = Some(copy);
            return;
        }
        self.id = Some(id);
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        let Some((_, _, copy)) = self.id.and_then(|id| doc.map.root.remove(id)) else {
            tracing::error!("Cannot undo duplicate of layer {}: copy not found", self.source);
            return;
        };
        if doc.map.active_layer == self.id {
            doc.map.active_layer = Some(self.source);
        }
        self.copy = Some(copy);
    }

    fn kind(&self) -> CommandKind {
        CommandKind::DuplicateLayer
    }
}

#[derive(Debug, Clone)]
pub struct RenameLayer {
    layer: Uuid,
    name: String,
    old: Option<String>,
}

impl RenameLayer {
    pub fn new(layer: Uuid, name: impl Into<String>) -> Self {
        Self {
            layer,
            name: name.into(),
            old: None,
        }
    }
}

impl Command<MapDocument> for RenameLayer {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some(layer) = doc.map.find_layer_mut(self.layer) else {
            tracing::error!("Cannot rename layer {}: not found", self.layer);
            return;
        };
        self.old = Some(std::mem::replace(
            &mut layer.metadata.name,
            self.name.clone(),
        ));
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        let (Some(old), Some(layer)) = (self.old.take(), doc.map.find_layer_mut(self.layer))
        else {
            return;
        };
        layer.metadata.name = old;
    }

    fn kind(&self) -> CommandKind {
        CommandKind::RenameLayer
    }
}

/// Change a layer's opacity; slider drags on one layer merge
#[derive(Debug, Clone)]
pub struct SetLayerOpacity {
    layer: Uuid,
    opacity: f32,
    old: Option<f32>,
}

impl SetLayerOpacity {
    pub fn new(layer: Uuid, opacity: f32) -> Self {
        Self {
            layer,
            opacity,
            old: None,
        }
    }

    pub(super) fn merge(&mut self, other: &Self) -> bool {
        if self.layer != other.layer {
            return false;
        }
        self.opacity = other.opacity;
        true
    }
}

impl Command<MapDocument> for SetLayerOpacity {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some(layer) = doc.map.find_layer_mut(self.layer) else {
            tracing::error!("Cannot set opacity of layer {}: not found", self.layer);
            return;
        };
        self.old = Some(layer.opacity());
        layer.set_opacity(self.opacity);
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        let (Some(old), Some(layer)) = (self.old, doc.map.find_layer_mut(self.layer)) else {
            return;
        };
        layer.set_opacity(old);
    }

    fn kind(&self) -> CommandKind {
        CommandKind::SetLayerOpacity
    }
}

#[derive(Debug, Clone)]
pub struct SetLayerVisible {
    layer: Uuid,
    visible: bool,
    old: Option<bool>,
}

impl SetLayerVisible {
    pub fn new(layer: Uuid, visible: bool) -> Self {
        Self {
            layer,
            visible,
            old: None,
        }
    }
}

impl Command<MapDocument> for SetLayerVisible {
    fn redo(&mut self, doc: &mut MapDocument) {
        let Some(layer) = doc.map.find_layer_mut(self.layer) else {
            tracing::error!("Cannot change visibility of layer {}: not found", self.layer);
            return;
        };
        self.old = Some(std::mem::replace(&mut layer.visible, self.visible));
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        let (Some(old), Some(layer)) = (self.old, doc.map.find_layer_mut(self.layer)) else {
            return;
        };
        layer.visible = old;
    }

    fn kind(&self) -> CommandKind {
        CommandKind::SetLayerVisible
    }
}

/// Swap a layer with a sibling; backs both `MoveLayerUp` and `MoveLayerDown`
#[derive(Debug, Clone)]
pub struct MoveLayer {
    layer: Uuid,
    offset: isize,
    moved: bool,
}

impl MoveLayer {
    pub fn new(layer: Uuid, offset: isize) -> Self {
        Self {
            layer,
            offset,
            moved: false,
        }
    }
}

impl Command<MapDocument> for MoveLayer {
    fn redo(&mut self, doc: &mut MapDocument) {
        self.moved = doc.map.root.move_layer(self.layer, self.offset);
        if !self.moved {
            tracing::warn!("Layer {} cannot move by {}", self.layer, self.offset);
        }
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        if self.moved {
            doc.map.root.move_layer(self.layer, -self.offset);
            self.moved = false;
        }
    }

    fn kind(&self) -> CommandKind {
        if self.offset < 0 {
            CommandKind::MoveLayerUp
        } else {
            CommandKind::MoveLayerDown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{check_inverse, document, layer_id};
    use crate::commands::{CommandStack, MapCommand};

    fn names(doc: &MapDocument) -> Vec<String> {
        doc.map.layers().iter().map(|l| l.name().to_string()).collect()
    }

    #[test]
    fn test_create_layer_goes_into_active_group() {
        let mut doc = document();
        let mut stack = CommandStack::new(10);
        stack.push(&mut doc, MapCommand::from(CreateLayer::new(LayerType::Group, "props")));
        let group = doc.map.active_layer.unwrap();
        stack.push(&mut doc, MapCommand::from(CreateLayer::new(LayerType::Tile, "detail")));

        let detail = doc.map.active_layer.unwrap();
        assert_eq!(doc.map.root.locate(detail), Some((Some(group), 0)));
        assert_eq!(names(&doc), ["ground", "objects", "props", "detail"]);

        stack.undo(&mut doc);
        assert_eq!(doc.map.active_layer, Some(group));
        assert!(doc.map.find_layer(detail).is_none());
        stack.redo(&mut doc);
        assert_eq!(doc.map.root.locate(detail), Some((Some(group), 0)));
    }

    #[test]
    fn test_create_layer_inverse() {
        let mut doc = document();
        check_inverse(&mut doc, CreateLayer::new(LayerType::Object, "enemies"));
    }

    #[test]
    fn test_remove_layer_restores_position() {
        let mut doc = document();
        let ground = layer_id(&doc, "ground");
        let mut stack = CommandStack::new(10);
        stack.push(&mut doc, MapCommand::from(RemoveLayer::new(ground)));
        assert_eq!(names(&doc), ["objects"]);
        assert_eq!(doc.map.active_layer, None);

        stack.undo(&mut doc);
        assert_eq!(names(&doc), ["ground", "objects"]);
        assert_eq!(doc.map.active_layer, Some(ground));

        check_inverse(&mut doc, RemoveLayer::new(ground));
    }

    #[test]
    fn test_remove_group_clears_nested_active_layer() {
        let mut doc = document();
        let group = doc.map.new_layer(LayerType::Group, "props");
        let group_id = group.id();
        let detail = doc.map.new_layer(LayerType::Tile, "detail");
        let detail_id = detail.id();
        doc.map.root.push(group);
        doc.map.root.insert(Some(group_id), 0, detail).unwrap();
        doc.map.active_layer = Some(detail_id);

        let mut stack = CommandStack::new(10);
        stack.push(&mut doc, MapCommand::from(RemoveLayer::new(group_id)));
        assert_eq!(names(&doc), ["ground", "objects"]);
        assert_eq!(doc.map.active_layer, None);

        stack.undo(&mut doc);
        assert_eq!(doc.map.active_layer, Some(detail_id));
        assert_eq!(doc.map.root.locate(detail_id), Some((Some(group_id), 0)));

        check_inverse(&mut doc, RemoveLayer::new(group_id));
    }

    #[test]
    fn test_remove_layer_keeps_unrelated_active_layer() {
        let mut doc = document();
        let objects = layer_id(&doc, "objects");
        let ground = layer_id(&doc, "ground");
        let mut command = RemoveLayer::new(objects);
        command.redo(&mut doc);
        assert_eq!(doc.map.active_layer, Some(ground));
        command.undo(&mut doc);
        assert_eq!(doc.map.active_layer, Some(ground));
    }

    #[test]
    fn test_remove_missing_layer_is_a_noop() {
        let mut doc = document();
        check_inverse(&mut doc, RemoveLayer::new(Uuid::new_v4()));
    }

    #[test]
    fn test_duplicate_layer() {
        let mut doc = document();
        let objects = layer_id(&doc, "objects");
        let mut stack = CommandStack::new(10);
        stack.push(&mut doc, MapCommand::from(DuplicateLayer::new(objects)));
        assert_eq!(names(&doc), ["ground", "objects", "objects copy"]);
        let layers = doc.map.layers();
        assert_ne!(layers[1].id(), layers[2].id());
        assert_ne!(layers[1].persistent_id, layers[2].persistent_id);

        check_inverse(&mut doc, DuplicateLayer::new(objects));
    }

    #[test]
    fn test_rename_and_visibility() {
        let mut doc = document();
        let ground = layer_id(&doc, "ground");
        check_inverse(&mut doc, RenameLayer::new(ground, "floor"));
        assert_eq!(doc.map.find_layer(ground).unwrap().name(), "floor");
        check_inverse(&mut doc, SetLayerVisible::new(ground, false));
        assert!(!doc.map.find_layer(ground).unwrap().visible);
    }

    #[test]
    fn test_opacity_changes_merge() {
        let mut doc = document();
        let ground = layer_id(&doc, "ground");
        let objects = layer_id(&doc, "objects");
        let mut stack = CommandStack::new(10);
        stack.push(&mut doc, MapCommand::from(SetLayerOpacity::new(ground, 0.8)));
        stack.push(&mut doc, MapCommand::from(SetLayerOpacity::new(ground, 0.5)));
        assert_eq!(stack.len(), 1);
        stack.push(&mut doc, MapCommand::from(SetLayerOpacity::new(objects, 0.5)));
        assert_eq!(stack.len(), 2);

        stack.undo(&mut doc);
        stack.undo(&mut doc);
        assert_eq!(doc.map.find_layer(ground).unwrap().opacity(), 1.0);
        stack.redo(&mut doc);
        assert_eq!(doc.map.find_layer(ground).unwrap().opacity(), 0.5);
    }

    #[test]
    fn test_move_layer() {
        let mut doc = document();
        let ground = layer_id(&doc, "ground");
        let objects = layer_id(&doc, "objects");
        let mut stack = CommandStack::new(10);

        stack.push(&mut doc, MapCommand::move_layer_up(objects));
        assert_eq!(names(&doc), ["objects", "ground"]);
        assert_eq!(stack.undo_kind(), Some(CommandKind::MoveLayerUp));

        // already at the top
        stack.push(&mut doc, MapCommand::move_layer_up(objects));
        assert_eq!(names(&doc), ["objects", "ground"]);
        stack.undo(&mut doc);
        assert_eq!(names(&doc), ["objects", "ground"]);
        stack.undo(&mut doc);
        assert_eq!(names(&doc), ["ground", "objects"]);

        check_inverse(&mut doc, MapCommand::move_layer_down(ground));
        assert_eq!(names(&doc), ["objects", "ground"]);
    }
}
