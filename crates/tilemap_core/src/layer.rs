//! Layer tree: tile grids, object collections and nested groups
//!
//! Layers form an owned tree rooted at the map's [`GroupLayer`]. Nothing holds
//! a pointer to its parent; parents are found by searching the tree for an id
//! with [`GroupLayer::locate`].

use crate::geometry::{TileExtent, TileId, TilePos, EMPTY_TILE};
use crate::metadata::Metadata;
use crate::object::Object;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The three kinds of layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerType {
    Tile,
    Object,
    Group,
}

impl LayerType {
    pub fn name(&self) -> &'static str {
        match self {
            LayerType::Tile => "tile",
            LayerType::Object => "object",
            LayerType::Group => "group",
        }
    }
}

/// A row-major grid of tile ids, never smaller than 1x1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileLayer {
    extent: TileExtent,
    tiles: Vec<TileId>,
}

impl TileLayer {
    /// Create an empty grid
    pub fn new(extent: TileExtent) -> Self {
        let extent = TileExtent::new(extent.rows, extent.cols);
        Self {
            extent,
            tiles: vec![EMPTY_TILE; extent.cell_count()],
        }
    }

    /// Wrap existing row-major tile data, `None` if the length does not match
    pub fn from_tiles(extent: TileExtent, tiles: Vec<TileId>) -> Option<Self> {
        if extent.rows == 0 || extent.cols == 0 || tiles.len() != extent.cell_count() {
            return None;
        }
        Some(Self { extent, tiles })
    }

    pub fn extent(&self) -> TileExtent {
        self.extent
    }

    pub fn rows(&self) -> usize {
        self.extent.rows
    }

    pub fn cols(&self) -> usize {
        self.extent.cols
    }

    /// Row-major tile data
    pub fn tiles(&self) -> &[TileId] {
        &self.tiles
    }

    pub fn row(&self, row: usize) -> Option<&[TileId]> {
        let start = row.checked_mul(self.extent.cols)?;
        self.tiles.get(start..start + self.extent.cols)
    }

    pub fn contains(&self, pos: TilePos) -> bool {
        self.extent.contains(pos)
    }

    pub fn get(&self, pos: TilePos) -> Option<TileId> {
        self.extent.index_of(pos).map(|index| self.tiles[index])
    }

    /// Set a tile and return the previous id, or `None` when out of bounds
    pub fn set_tile(&mut self, pos: TilePos, id: TileId) -> Option<TileId> {
        let index = self.extent.index_of(pos)?;
        Some(std::mem::replace(&mut self.tiles[index], id))
    }

    /// Flood-fill the 4-connected region around `origin` with `replacement`
    ///
    /// Every cell equal to the origin's value and reachable from it through
    /// edge neighbours is replaced. Returns each changed position once, in the
    /// order it was filled. Nothing changes when `origin` is out of bounds or
    /// already holds `replacement`.
    pub fn flood(&mut self, origin: TilePos, replacement: TileId) -> Vec<TilePos> {
        let Some(target) = self.get(origin) else {
            return Vec::new();
        };
        if target == replacement {
            return Vec::new();
        }

        // A replaced cell no longer matches `target`, so it is never revisited.
        let mut changed = Vec::new();
        let mut pending = vec![origin];
        while let Some(pos) = pending.pop() {
            let Some(index) = self.extent.index_of(pos) else {
                continue;
            };
            if self.tiles[index] != target {
                continue;
            }
            self.tiles[index] = replacement;
            changed.push(pos);
            pending.extend(pos.neighbours());
        }
        changed
    }

    /// Resize the grid, keeping cells at low row and column indices
    ///
    /// New cells are empty. Counts are clamped to at least 1.
    pub fn resize(&mut self, extent: TileExtent) {
        let extent = TileExtent::new(extent.rows, extent.cols);
        if extent == self.extent {
            return;
        }
        let mut tiles = vec![EMPTY_TILE; extent.cell_count()];
        let keep_rows = extent.rows.min(self.extent.rows);
        let keep_cols = extent.cols.min(self.extent.cols);
        for row in 0..keep_rows {
            let src = row * self.extent.cols;
            let dst = row * extent.cols;
            tiles[dst..dst + keep_cols].copy_from_slice(&self.tiles[src..src + keep_cols]);
        }
        self.extent = extent;
        self.tiles = tiles;
    }

    /// Whether every cell is empty
    pub fn is_empty(&self) -> bool {
        self.tiles.iter().all(|&id| id == EMPTY_TILE)
    }
}

/// Objects in insertion order, keyed by their metadata id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectLayer {
    objects: IndexMap<Uuid, Object>,
}

impl ObjectLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an object and return its id
    pub fn insert(&mut self, object: Object) -> Uuid {
        let id = object.metadata.id;
        self.objects.insert(id, object);
        id
    }

    /// Insert at `index`, clamped to the end
    pub fn insert_at(&mut self, index: usize, object: Object) {
        let index = index.min(self.objects.len());
        self.objects.shift_insert(index, object.metadata.id, object);
    }

    /// Remove an object, returning its former position
    pub fn remove(&mut self, id: Uuid) -> Option<(usize, Object)> {
        self.objects
            .shift_remove_full(&id)
            .map(|(index, _, object)| (index, object))
    }

    pub fn get(&self, id: Uuid) -> Option<&Object> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut Object> {
        self.objects.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Object> {
        self.objects.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Object> {
        self.objects.values_mut()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Type-specific payload of a [`Layer`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayerKind {
    Tile(TileLayer),
    Object(ObjectLayer),
    Group(GroupLayer),
}

/// A node of the layer tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// `metadata.id` is the layer's uuid
    pub metadata: Metadata,
    pub persistent_id: Option<i32>,
    opacity: f32,
    pub visible: bool,
    pub kind: LayerKind,
}

impl Layer {
    pub fn new(name: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            metadata: Metadata::new(name),
            persistent_id: None,
            opacity: 1.0,
            visible: true,
            kind,
        }
    }

    pub fn new_tile(name: impl Into<String>, extent: TileExtent) -> Self {
        Self::new(name, LayerKind::Tile(TileLayer::new(extent)))
    }

    pub fn new_object(name: impl Into<String>) -> Self {
        Self::new(name, LayerKind::Object(ObjectLayer::new()))
    }

    pub fn new_group(name: impl Into<String>) -> Self {
        Self::new(name, LayerKind::Group(GroupLayer::new()))
    }

    /// Create an empty layer of the given type
    pub fn of_type(ty: LayerType, name: impl Into<String>, extent: TileExtent) -> Self {
        match ty {
            LayerType::Tile => Self::new_tile(name, extent),
            LayerType::Object => Self::new_object(name),
            LayerType::Group => Self::new_group(name),
        }
    }

    pub fn id(&self) -> Uuid {
        self.metadata.id
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Set the opacity, clamped into `[0, 1]`
    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = if opacity.is_nan() {
            0.0
        } else {
            opacity.clamp(0.0, 1.0)
        };
    }

    pub fn layer_type(&self) -> LayerType {
        match &self.kind {
            LayerKind::Tile(_) => LayerType::Tile,
            LayerKind::Object(_) => LayerType::Object,
            LayerKind::Group(_) => LayerType::Group,
        }
    }

    pub fn as_tile(&self) -> Option<&TileLayer> {
        match &self.kind {
            LayerKind::Tile(tiles) => Some(tiles),
            _ => None,
        }
    }

    pub fn as_tile_mut(&mut self) -> Option<&mut TileLayer> {
        match &mut self.kind {
            LayerKind::Tile(tiles) => Some(tiles),
            _ => None,
        }
    }

    pub fn as_objects(&self) -> Option<&ObjectLayer> {
        match &self.kind {
            LayerKind::Object(objects) => Some(objects),
            _ => None,
        }
    }

    pub fn as_objects_mut(&mut self) -> Option<&mut ObjectLayer> {
        match &mut self.kind {
            LayerKind::Object(objects) => Some(objects),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupLayer> {
        match &self.kind {
            LayerKind::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut GroupLayer> {
        match &mut self.kind {
            LayerKind::Group(group) => Some(group),
            _ => None,
        }
    }

    /// Deep copy with fresh uuids and no persistent ids
    pub fn duplicate(&self) -> Layer {
        let mut copy = self.clone();
        copy.metadata.id = Uuid::new_v4();
        copy.persistent_id = None;
        match &mut copy.kind {
            LayerKind::Tile(_) => {}
            LayerKind::Object(objects) => {
                let old = std::mem::take(objects);
                for mut object in old.objects.into_values() {
                    object.metadata.id = Uuid::new_v4();
                    object.persistent_id = None;
                    objects.insert(object);
                }
            }
            LayerKind::Group(group) => {
                group.children = group.children.iter().map(Layer::duplicate).collect();
            }
        }
        copy
    }
}

/// An ordered list of child layers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupLayer {
    pub children: Vec<Layer>,
}

impl GroupLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn push(&mut self, layer: Layer) {
        self.children.push(layer);
    }

    /// Find a layer anywhere below this group
    pub fn find(&self, id: Uuid) -> Option<&Layer> {
        for child in &self.children {
            if child.id() == id {
                return Some(child);
            }
            if let LayerKind::Group(group) = &child.kind {
                if let Some(found) = group.find(id) {
                    return Some(found);
                }
            }
        }
        None
    }

    pub fn find_mut(&mut self, id: Uuid) -> Option<&mut Layer> {
        for child in &mut self.children {
            if child.metadata.id == id {
                return Some(child);
            }
            if let LayerKind::Group(group) = &mut child.kind {
                if let Some(found) = group.find_mut(id) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Parent group id (`None` for this group) and index of a layer
    pub fn locate(&self, id: Uuid) -> Option<(Option<Uuid>, usize)> {
        self.locate_in(None, id)
    }

    fn locate_in(&self, parent: Option<Uuid>, id: Uuid) -> Option<(Option<Uuid>, usize)> {
        for (index, child) in self.children.iter().enumerate() {
            if child.id() == id {
                return Some((parent, index));
            }
            if let LayerKind::Group(group) = &child.kind {
                if let Some(found) = group.locate_in(Some(child.id()), id) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// This group for `None`, or the nested group layer with the given id
    pub fn group_mut(&mut self, parent: Option<Uuid>) -> Option<&mut GroupLayer> {
        match parent {
            None => Some(self),
            Some(id) => self.find_mut(id)?.as_group_mut(),
        }
    }

    /// Insert under `parent` at `index` (clamped), handing the layer back if
    /// the parent group does not exist
    pub fn insert(
        &mut self,
        parent: Option<Uuid>,
        index: usize,
        layer: Layer,
    ) -> Result<(), Layer> {
        let Some(group) = self.group_mut(parent) else {
            return Err(layer);
        };
        let index = index.min(group.children.len());
        group.children.insert(index, layer);
        Ok(())
    }

    /// Detach a layer, returning its parent, former index and contents
    pub fn remove(&mut self, id: Uuid) -> Option<(Option<Uuid>, usize, Layer)> {
        let (parent, index) = self.locate(id)?;
        let group = self.group_mut(parent)?;
        Some((parent, index, group.children.remove(index)))
    }

    /// Swap a layer with its sibling `offset` positions away
    ///
    /// Returns `false` if the layer is missing or the move would leave its group.
    pub fn move_layer(&mut self, id: Uuid, offset: isize) -> bool {
        let Some((parent, index)) = self.locate(id) else {
            return false;
        };
        let Some(group) = self.group_mut(parent) else {
            return false;
        };
        let Some(target) = index.checked_add_signed(offset) else {
            return false;
        };
        if target >= group.children.len() {
            return false;
        }
        group.children.swap(index, target);
        true
    }

    /// Depth-first pre-order walk over every layer below this group
    pub fn visit<'a, F: FnMut(&'a Layer)>(&'a self, f: &mut F) {
        for child in &self.children {
            f(child);
            if let LayerKind::Group(group) = &child.kind {
                group.visit(f);
            }
        }
    }

    pub fn visit_mut<F: FnMut(&mut Layer)>(&mut self, f: &mut F) {
        for child in &mut self.children {
            f(child);
            if let LayerKind::Group(group) = &mut child.kind {
                group.visit_mut(f);
            }
        }
    }

    /// Find an object in any object layer, with the id of the owning layer
    pub fn find_object(&self, id: Uuid) -> Option<(Uuid, &Object)> {
        for child in &self.children {
            match &child.kind {
                LayerKind::Object(objects) => {
                    if let Some(object) = objects.get(id) {
                        return Some((child.id(), object));
                    }
                }
                LayerKind::Group(group) => {
                    if let Some(found) = group.find_object(id) {
                        return Some(found);
                    }
                }
                LayerKind::Tile(_) => {}
            }
        }
        None
    }

    pub fn find_object_mut(&mut self, id: Uuid) -> Option<&mut Object> {
        for child in &mut self.children {
            match &mut child.kind {
                LayerKind::Object(objects) => {
                    if let Some(object) = objects.get_mut(id) {
                        return Some(object);
                    }
                }
                LayerKind::Group(group) => {
                    if let Some(found) = group.find_object_mut(id) {
                        return Some(found);
                    }
                }
                LayerKind::Tile(_) => {}
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectKind;

    fn diagonal_5x5() -> TileLayer {
        let mut layer = TileLayer::new(TileExtent::new(5, 5));
        for i in 0..5 {
            layer.set_tile(TilePos::new(i, i), 1);
        }
        layer
    }

    #[test]
    fn test_set_tile_out_of_bounds_is_noop() {
        let mut layer = TileLayer::new(TileExtent::new(2, 2));
        assert_eq!(layer.set_tile(TilePos::new(2, 0), 5), None);
        assert_eq!(layer.set_tile(TilePos::new(-1, 0), 5), None);
        assert!(layer.is_empty());
        assert_eq!(layer.set_tile(TilePos::new(1, 1), 5), Some(0));
        assert_eq!(layer.get(TilePos::new(1, 1)), Some(5));
    }

    #[test]
    fn test_flood_fills_lower_triangle() {
        let mut layer = diagonal_5x5();
        let changed = layer.flood(TilePos::new(1, 0), 2);
        assert_eq!(changed.len(), 10);

        for row in 0..5 {
            for col in 0..5 {
                let expected = match row.cmp(&col) {
                    std::cmp::Ordering::Equal => 1,
                    std::cmp::Ordering::Greater => 2,
                    std::cmp::Ordering::Less => 0,
                };
                assert_eq!(layer.get(TilePos::new(row, col)), Some(expected));
            }
        }

        let mut unique = changed.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), changed.len());
    }

    #[test]
    fn test_flood_noops() {
        let mut layer = diagonal_5x5();
        assert!(layer.flood(TilePos::new(0, 0), 1).is_empty());
        assert!(layer.flood(TilePos::new(9, 9), 3).is_empty());
        assert_eq!(layer, diagonal_5x5());
    }

    #[test]
    fn test_resize_preserves_low_indices() {
        let mut layer = TileLayer::new(TileExtent::new(2, 3));
        layer.set_tile(TilePos::new(0, 0), 1);
        layer.set_tile(TilePos::new(1, 2), 2);

        layer.resize(TileExtent::new(3, 4));
        assert_eq!(layer.get(TilePos::new(0, 0)), Some(1));
        assert_eq!(layer.get(TilePos::new(1, 2)), Some(2));
        assert_eq!(layer.get(TilePos::new(2, 3)), Some(0));

        layer.resize(TileExtent::new(1, 1));
        assert_eq!(layer.tiles(), &[1]);

        layer.resize(TileExtent { rows: 0, cols: 0 });
        assert_eq!(layer.extent(), TileExtent::new(1, 1));
    }

    #[test]
    fn test_opacity_is_clamped() {
        let mut layer = Layer::new_group("g");
        layer.set_opacity(1.7);
        assert_eq!(layer.opacity(), 1.0);
        layer.set_opacity(-0.2);
        assert_eq!(layer.opacity(), 0.0);
        layer.set_opacity(f32::NAN);
        assert_eq!(layer.opacity(), 0.0);
    }

    #[test]
    fn test_tree_locate_remove_insert() {
        let mut root = GroupLayer::new();
        let mut group = Layer::new_group("group");
        let child = Layer::new_object("child");
        let child_id = child.id();
        group.as_group_mut().unwrap().push(Layer::new_tile("before", TileExtent::new(1, 1)));
        group.as_group_mut().unwrap().push(child);
        let group_id = group.id();
        root.push(Layer::new_tile("ground", TileExtent::new(2, 2)));
        root.push(group);

        assert_eq!(root.locate(child_id), Some((Some(group_id), 1)));

        let (parent, index, layer) = root.remove(child_id).unwrap();
        assert!(root.find(child_id).is_none());
        assert!(root.insert(parent, index, layer).is_ok());
        assert_eq!(root.locate(child_id), Some((Some(group_id), 1)));

        let orphan = Layer::new_group("orphan");
        assert!(root.insert(Some(Uuid::new_v4()), 0, orphan).is_err());
    }

    #[test]
    fn test_move_layer_stays_in_group() {
        let mut root = GroupLayer::new();
        let a = Layer::new_group("a");
        let b = Layer::new_group("b");
        let (a_id, b_id) = (a.id(), b.id());
        root.push(a);
        root.push(b);

        assert!(!root.move_layer(a_id, -1));
        assert!(root.move_layer(a_id, 1));
        assert_eq!(root.children[0].id(), b_id);
        assert!(!root.move_layer(a_id, 1));
    }

    #[test]
    fn test_duplicate_assigns_fresh_ids() {
        let mut layer = Layer::new_object("things");
        let object_id = layer
            .as_objects_mut()
            .unwrap()
            .insert(Object::new(ObjectKind::Point, "spawn"));
        layer.persistent_id = Some(4);

        let copy = layer.duplicate();
        assert_ne!(copy.id(), layer.id());
        assert_eq!(copy.persistent_id, None);
        let objects = copy.as_objects().unwrap();
        assert_eq!(objects.len(), 1);
        assert!(objects.get(object_id).is_none());
    }

    #[test]
    fn test_find_object_in_nested_group() {
        let mut objects = Layer::new_object("objects");
        let id = objects
            .as_objects_mut()
            .unwrap()
            .insert(Object::new(ObjectKind::Rect, "crate"));
        let objects_id = objects.id();
        let mut group = Layer::new_group("group");
        group.as_group_mut().unwrap().push(objects);
        let mut root = GroupLayer::new();
        root.push(group);

        assert_eq!(root.find_object(id).map(|(layer, _)| layer), Some(objects_id));
        root.find_object_mut(id).unwrap().tag = "loot".to_string();
        assert_eq!(root.find_object(id).unwrap().1.tag, "loot");
    }
}
