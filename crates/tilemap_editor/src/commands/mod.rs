//! Undoable editing commands and the bounded history that runs them
//!
//! Every change to a [`MapDocument`] goes through a [`MapCommand`] pushed
//! onto a [`CommandStack`]. Commands capture whatever `undo` needs while
//! they run `redo`, so the same command can be replayed any number of times.

mod components;
mod layers;
mod map;
mod objects;
mod properties;
mod tilesets;

pub use components::{
    AddComponentAttr, AttachComponent, DefineComponent, DetachComponent, RemoveComponentAttr,
    RenameComponent, RenameComponentAttr, ResetAttachedComponent, SetComponentAttrType,
    UndefComponent, UpdateAttachedComponent, UpdateComponentAttr,
};
pub use layers::{
    CreateLayer, DuplicateLayer, MoveLayer, RemoveLayer, RenameLayer, SetLayerOpacity,
    SetLayerVisible,
};
pub use map::{BucketFill, ChangeExtent, ExtentChange, ResizeMap, SetTileFormat, SetTiles};
pub use objects::{
    AddObject, MoveObject, RemoveObject, SetObjectName, SetObjectTag, SetObjectVisible,
};
pub use properties::{
    AddProperty, ChangePropertyType, RemoveProperty, RenameProperty, UpdateProperty,
};
pub use tilesets::{CreateTileset, RemoveTileset};

use crate::document::MapDocument;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tilemap_core::{Map, Metadata};
use uuid::Uuid;

/// Default number of commands kept in a history
pub const DEFAULT_CAPACITY: usize = 100;

/// A reversible change to a target of type `T`
pub trait Command<T> {
    /// Apply the change, capturing what `undo` needs
    fn redo(&mut self, target: &mut T);

    /// Revert the last `redo`
    fn undo(&mut self, target: &mut T);

    fn kind(&self) -> CommandKind;

    /// Fold a command that was just executed into this one
    ///
    /// Only called when both commands report the same kind. Returns `false`
    /// to keep them as separate history entries.
    fn merge_with(&mut self, _other: &Self) -> bool {
        false
    }
}

/// Identifies a command type, used for merging and for undo/redo labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CommandKind {
    CreateLayer,
    RemoveLayer,
    DuplicateLayer,
    RenameLayer,
    SetLayerOpacity,
    SetLayerVisible,
    MoveLayerUp,
    MoveLayerDown,
    AddRow,
    AddColumn,
    RemoveRow,
    RemoveColumn,
    ResizeMap,
    SetTileFormat,
    SetTiles,
    BucketFill,
    CreateTileset,
    RemoveTileset,
    AddObject,
    RemoveObject,
    MoveObject,
    SetObjectName,
    SetObjectTag,
    SetObjectVisible,
    AddProperty,
    RemoveProperty,
    RenameProperty,
    UpdateProperty,
    ChangePropertyType,
    DefineComponent,
    UndefComponent,
    RenameComponent,
    AddComponentAttr,
    RemoveComponentAttr,
    RenameComponentAttr,
    SetComponentAttrType,
    UpdateComponentAttr,
    AttachComponent,
    DetachComponent,
    UpdateAttachedComponent,
    ResetAttachedComponent,
}

/// Where the stack was when it was last marked clean
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CleanMarker {
    /// Before the first command
    Pristine,
    At(usize),
    /// The marked state can no longer be reached
    Lost,
}

/// Linear undo/redo history with a fixed capacity
///
/// `index` points at the last applied command (`None` when everything is
/// undone). Pushing discards every command after `index`. When the stack
/// is full the oldest command is dropped.
#[derive(Debug, Clone)]
pub struct CommandStack<C> {
    commands: VecDeque<C>,
    index: Option<usize>,
    clean: CleanMarker,
    capacity: usize,
}

impl<C> Default for CommandStack<C> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<C> CommandStack<C> {
    pub fn new(capacity: usize) -> Self {
        Self {
            commands: VecDeque::new(),
            index: None,
            clean: CleanMarker::Pristine,
            capacity: capacity.max(1),
        }
    }

    /// Execute `command` and record it, merging into the top entry if possible
    pub fn push<T>(&mut self, target: &mut T, mut command: C)
    where
        C: Command<T>,
    {
        command.redo(target);
        self.discard_redo();

        if let Some(top) = self.index {
            if let Some(previous) = self.commands.get_mut(top) {
                if previous.kind() == command.kind() && previous.merge_with(&command) {
                    if self.clean == CleanMarker::At(top) {
                        self.clean = CleanMarker::Lost;
                    }
                    return;
                }
            }
        }

        if self.commands.len() >= self.capacity {
            self.evict_front();
        }
        self.commands.push_back(command);
        self.index = Some(self.commands.len() - 1);
    }

    pub fn undo<T>(&mut self, target: &mut T)
    where
        C: Command<T>,
    {
        let Some(current) = self.index else {
            return;
        };
        if let Some(command) = self.commands.get_mut(current) {
            command.undo(target);
        }
        self.index = current.checked_sub(1);
    }

    pub fn redo<T>(&mut self, target: &mut T)
    where
        C: Command<T>,
    {
        let next = self.next_index();
        let Some(command) = self.commands.get_mut(next) else {
            return;
        };
        command.redo(target);
        self.index = Some(next);
    }

    /// Drop every command, keeping the clean state only if it is current
    pub fn clear(&mut self) {
        self.clean = if self.is_clean() {
            CleanMarker::Pristine
        } else {
            CleanMarker::Lost
        };
        self.commands.clear();
        self.index = None;
    }

    pub fn mark_as_clean(&mut self) {
        self.clean = match self.index {
            Some(index) => CleanMarker::At(index),
            None => CleanMarker::Pristine,
        };
    }

    /// Forget the clean state; the stack reports dirty until marked again
    pub fn reset_clean_index(&mut self) {
        self.clean = CleanMarker::Lost;
    }

    /// Change the capacity, dropping the oldest commands if needed
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.commands.len() > self.capacity {
            if self.index.is_some() {
                self.evict_front();
            } else {
                // nothing applied, the oldest command is redo history
                self.commands.pop_back();
            }
        }
    }

    pub fn is_clean(&self) -> bool {
        match self.clean {
            CleanMarker::Pristine => self.index.is_none(),
            CleanMarker::At(marked) => self.index == Some(marked),
            CleanMarker::Lost => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.index.is_some()
    }

    pub fn can_redo(&self) -> bool {
        self.next_index() < self.commands.len()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Position of the last applied command
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Position of the command the clean state follows, if any
    pub fn clean_index(&self) -> Option<usize> {
        match self.clean {
            CleanMarker::At(index) => Some(index),
            _ => None,
        }
    }

    pub fn undo_kind<T>(&self) -> Option<CommandKind>
    where
        C: Command<T>,
    {
        self.commands.get(self.index?).map(Command::kind)
    }

    pub fn redo_kind<T>(&self) -> Option<CommandKind>
    where
        C: Command<T>,
    {
        self.commands.get(self.next_index()).map(Command::kind)
    }

    fn next_index(&self) -> usize {
        self.index.map_or(0, |index| index + 1)
    }

    fn discard_redo(&mut self) {
        let keep = self.next_index();
        if let CleanMarker::At(marked) = self.clean {
            if marked >= keep {
                self.clean = CleanMarker::Lost;
            }
        }
        self.commands.truncate(keep);
    }

    fn evict_front(&mut self) {
        if self.commands.pop_front().is_none() {
            return;
        }
        self.index = self.index.and_then(|index| index.checked_sub(1));
        self.clean = match self.clean {
            CleanMarker::At(marked) if marked > 0 => CleanMarker::At(marked - 1),
            _ => CleanMarker::Lost,
        };
        tracing::debug!("Command history full, dropped the oldest command");
    }
}

macro_rules! map_commands {
    ($($variant:ident($command:ty)),* $(,)?) => {
        /// Every command that edits a [`MapDocument`]
        #[derive(Debug, Clone)]
        pub enum MapCommand {
            $($variant($command)),*
        }

        impl Command<MapDocument> for MapCommand {
            fn redo(&mut self, doc: &mut MapDocument) {
                match self {
                    $(MapCommand::$variant(command) => command.redo(doc)),*
                }
            }

            fn undo(&mut self, doc: &mut MapDocument) {
                match self {
                    $(MapCommand::$variant(command) => command.undo(doc)),*
                }
            }

            fn kind(&self) -> CommandKind {
                match self {
                    $(MapCommand::$variant(_) => CommandKind::$variant),*
                }
            }

            fn merge_with(&mut self, other: &Self) -> bool {
                self.merge(other)
            }
        }
    };
}

map_commands! {
    CreateLayer(CreateLayer),
    RemoveLayer(RemoveLayer),
    DuplicateLayer(DuplicateLayer),
    RenameLayer(RenameLayer),
    SetLayerOpacity(SetLayerOpacity),
    SetLayerVisible(SetLayerVisible),
    MoveLayerUp(MoveLayer),
    MoveLayerDown(MoveLayer),
    AddRow(ChangeExtent),
    AddColumn(ChangeExtent),
    RemoveRow(ChangeExtent),
    RemoveColumn(ChangeExtent),
    ResizeMap(ResizeMap),
    SetTileFormat(SetTileFormat),
    SetTiles(SetTiles),
    BucketFill(BucketFill),
    CreateTileset(CreateTileset),
    RemoveTileset(RemoveTileset),
    AddObject(AddObject),
    RemoveObject(RemoveObject),
    MoveObject(MoveObject),
    SetObjectName(SetObjectName),
    SetObjectTag(SetObjectTag),
    SetObjectVisible(SetObjectVisible),
    AddProperty(AddProperty),
    RemoveProperty(RemoveProperty),
    RenameProperty(RenameProperty),
    UpdateProperty(UpdateProperty),
    ChangePropertyType(ChangePropertyType),
    DefineComponent(DefineComponent),
    UndefComponent(UndefComponent),
    RenameComponent(RenameComponent),
    AddComponentAttr(AddComponentAttr),
    RemoveComponentAttr(RemoveComponentAttr),
    RenameComponentAttr(RenameComponentAttr),
    SetComponentAttrType(SetComponentAttrType),
    UpdateComponentAttr(UpdateComponentAttr),
    AttachComponent(AttachComponent),
    DetachComponent(DetachComponent),
    UpdateAttachedComponent(UpdateAttachedComponent),
    ResetAttachedComponent(ResetAttachedComponent),
}

impl MapCommand {
    fn merge(&mut self, other: &MapCommand) -> bool {
        use MapCommand as C;
        match (self, other) {
            (C::SetLayerOpacity(a), C::SetLayerOpacity(b)) => a.merge(b),
            (C::AddRow(a), C::AddRow(b))
            | (C::AddColumn(a), C::AddColumn(b))
            | (C::RemoveRow(a), C::RemoveRow(b))
            | (C::RemoveColumn(a), C::RemoveColumn(b)) => a.merge(b),
            (C::BucketFill(a), C::BucketFill(b)) => a.merge(b),
            (C::MoveObject(a), C::MoveObject(b)) => a.merge(b),
            (C::UpdateProperty(a), C::UpdateProperty(b)) => a.merge(b),
            (C::UpdateComponentAttr(a), C::UpdateComponentAttr(b)) => a.merge(b),
            (C::UpdateAttachedComponent(a), C::UpdateAttachedComponent(b)) => a.merge(b),
            _ => false,
        }
    }

    pub fn add_rows(count: usize) -> Self {
        MapCommand::AddRow(ChangeExtent::new(ExtentChange::AddRows, count))
    }

    pub fn add_columns(count: usize) -> Self {
        MapCommand::AddColumn(ChangeExtent::new(ExtentChange::AddColumns, count))
    }

    pub fn remove_rows(count: usize) -> Self {
        MapCommand::RemoveRow(ChangeExtent::new(ExtentChange::RemoveRows, count))
    }

    pub fn remove_columns(count: usize) -> Self {
        MapCommand::RemoveColumn(ChangeExtent::new(ExtentChange::RemoveColumns, count))
    }

    pub fn move_layer_up(layer: Uuid) -> Self {
        MapCommand::MoveLayerUp(MoveLayer::new(layer, -1))
    }

    pub fn move_layer_down(layer: Uuid) -> Self {
        MapCommand::MoveLayerDown(MoveLayer::new(layer, 1))
    }
}

/// Metadata block of any entity in the map, logging when it is gone
fn context_mut(map: &mut Map, context: Uuid) -> Option<&mut Metadata> {
    let metadata = map.find_metadata_mut(context);
    if metadata.is_none() {
        tracing::error!("Metadata context {} not found", context);
    }
    metadata
}

macro_rules! impl_from_command {
    ($($command:ident),* $(,)?) => {
        $(impl From<$command> for MapCommand {
            fn from(command: $command) -> Self {
                MapCommand::$command(command)
            }
        })*
    };
}

impl_from_command! {
    CreateLayer,
    RemoveLayer,
    DuplicateLayer,
    RenameLayer,
    SetLayerOpacity,
    SetLayerVisible,
    ResizeMap,
    SetTileFormat,
    SetTiles,
    BucketFill,
    CreateTileset,
    RemoveTileset,
    AddObject,
    RemoveObject,
    MoveObject,
    SetObjectName,
    SetObjectTag,
    SetObjectVisible,
    AddProperty,
    RemoveProperty,
    RenameProperty,
    UpdateProperty,
    ChangePropertyType,
    DefineComponent,
    UndefComponent,
    RenameComponent,
    AddComponentAttr,
    RemoveComponentAttr,
    RenameComponentAttr,
    SetComponentAttrType,
    UpdateComponentAttr,
    AttachComponent,
    DetachComponent,
    UpdateAttachedComponent,
    ResetAttachedComponent,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tilemap_core::{ComponentRegistry, LayerType, TextureRef, TileExtent, TileSize, Tileset};

    /// A 5x5 map with a tile layer "ground" (active) and an object layer "objects"
    pub(crate) fn document() -> MapDocument {
        let mut map = Map::new("test", TileExtent::new(5, 5), TileSize::new(16, 16));
        let ground = map.new_layer(LayerType::Tile, "ground");
        let objects = map.new_layer(LayerType::Object, "objects");
        map.active_layer = Some(ground.id());
        map.root.push(ground);
        map.root.push(objects);
        MapDocument::new(map)
    }

    pub(crate) fn layer_id(doc: &MapDocument, name: &str) -> Uuid {
        doc.map
            .layers()
            .iter()
            .find(|layer| layer.name() == name)
            .map(|layer| layer.id())
            .unwrap()
    }

    /// A tileset of `cols` x `rows` 16px tiles
    pub(crate) fn tileset(name: &str, cols: u32, rows: u32) -> Tileset {
        let texture = TextureRef {
            path: format!("{}.png", name).into(),
            width: cols * 16,
            height: rows * 16,
        };
        Tileset::new(name, texture, TileSize::new(16, 16))
    }

    /// Model state with the persistent id counters cleared, since ids are
    /// handed out once and never given back
    fn snapshot(doc: &MapDocument) -> (Map, ComponentRegistry) {
        let mut map = doc.map.clone();
        map.next_layer_id = 0;
        map.next_object_id = 0;
        (map, doc.components.clone())
    }

    /// Push `command`, then check undo restores the model and redo reapplies it
    pub(crate) fn check_inverse(doc: &mut MapDocument, command: impl Into<MapCommand>) {
        let before = snapshot(doc);
        let mut stack = CommandStack::new(10);
        stack.push(doc, command.into());
        let after = snapshot(doc);

        stack.undo(doc);
        assert_eq!(snapshot(doc), before, "undo did not restore the model");
        stack.redo(doc);
        assert_eq!(snapshot(doc), after, "redo did not reapply the command");
    }
}
