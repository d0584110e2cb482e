use super::{Command, CommandKind};
use crate::document::MapDocument;
use tilemap_core::{AttachedTileset, Tileset};
use uuid::Uuid;

/// Attach a tileset to the map and make it active
///
/// The first run assigns the tile-id range; later runs reinsert the same
/// binding so tile ids painted with it stay valid across undo and redo.
#[derive(Debug, Clone)]
pub struct CreateTileset {
    id: Uuid,
    embedded: bool,
    /// Pending until the first run
    tileset: Option<Tileset>,
    /// The binding and its position while undone
    detached: Option<(usize, AttachedTileset)>,
    previous_active: Option<Uuid>,
}

impl CreateTileset {
    pub fn new(tileset: Tileset, embedded: bool) -> Self {
        Self {
            id: tileset.id(),
            embedded,
            tileset: Some(tileset),
            detached: None,
            previous_active: None,
        }
    }

    pub fn tileset_id(&self) -> Uuid {
        self.id
    }
}

impl Command<MapDocument> for CreateTileset {
    fn redo(&mut self, doc: &mut MapDocument) {
        if let Some(tileset) = self.tileset.take() {
            if let Err(tileset) = doc.map.attach_tileset(tileset, self.embedded) {
                tracing::error!("Cannot attach tileset '{}': no tile ids left", tileset.name());
                self.tileset = Some(tileset);
                return;
            }
        } else if let Some((index, attached)) = self.detached.take() {
            if let Err(attached) = doc.map.insert_tileset(index, attached) {
                tracing::error!(
                    "Cannot reattach tileset '{}': tile ids are taken",
                    attached.tileset.name()
                );
                self.detached = Some((index, attached));
                return;
            }
        } else {
            return;
        }
        self.previous_active = doc.map.active_tileset;
        doc.map.active_tileset = Some(self.id);
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        let Some(detached) = doc.map.detach_tileset(self.id) else {
            tracing::error!("Cannot undo tileset creation: tileset {} not found", self.id);
            return;
        };
        self.detached = Some(detached);
        doc.map.active_tileset = self.previous_active;
    }

    fn kind(&self) -> CommandKind {
        CommandKind::CreateTileset
    }
}

#[derive(Debug, Clone)]
pub struct RemoveTileset {
    id: Uuid,
    removed: Option<(usize, AttachedTileset)>,
    was_active: bool,
}

impl RemoveTileset {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            removed: None,
            was_active: false,
        }
    }
}

impl Command<MapDocument> for RemoveTileset {
    fn redo(&mut self, doc: &mut MapDocument) {
        let was_active = doc.map.active_tileset == Some(self.id);
        let Some(removed) = doc.map.detach_tileset(self.id) else {
            tracing::error!("Cannot remove tileset {}: not found", self.id);
            return;
        };
        self.was_active = was_active;
        self.removed = Some(removed);
    }

    fn undo(&mut self, doc: &mut MapDocument) {
        let Some((index, attached)) = self.removed.take() else {
            return;
        };
        if let Err(attached) = doc.map.insert_tileset(index, attached) {
            tracing::error!(
                "Cannot restore tileset '{}': tile ids are taken",
                attached.tileset.name()
            );
            self.removed = Some((index, attached));
            return;
        }
        if self.was_active {
            doc.map.active_tileset = Some(self.id);
        }
    }

    fn kind(&self) -> CommandKind {
        CommandKind::RemoveTileset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{check_inverse, document, tileset};
    use crate::commands::{CommandStack, MapCommand};

    fn ranges(doc: &MapDocument) -> Vec<(i32, i32)> {
        doc.map
            .tilesets()
            .iter()
            .map(|t| (t.first_tile_id, t.last_tile_id))
            .collect()
    }

    fn assert_disjoint(doc: &MapDocument) {
        let ranges = ranges(doc);
        for (i, a) in ranges.iter().enumerate() {
            for b in &ranges[i + 1..] {
                assert!(a.1 < b.0 || b.1 < a.0, "{:?} overlaps {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_create_tileset_keeps_its_range() {
        let mut doc = document();
        let mut stack = CommandStack::new(10);
        let grass = CreateTileset::new(tileset("grass", 4, 2), true);
        let grass_id = grass.tileset_id();
        stack.push(&mut doc, MapCommand::from(grass));
        let water = CreateTileset::new(tileset("water", 2, 2), false);
        let water_id = water.tileset_id();
        stack.push(&mut doc, MapCommand::from(water));
        assert_eq!(ranges(&doc), [(1, 8), (9, 12)]);
        assert_eq!(doc.map.active_tileset, Some(water_id));

        stack.undo(&mut doc);
        assert_eq!(ranges(&doc), [(1, 8)]);
        assert_eq!(doc.map.active_tileset, Some(grass_id));
        stack.undo(&mut doc);
        assert!(doc.map.tilesets().is_empty());
        assert_eq!(doc.map.active_tileset, None);

        stack.redo(&mut doc);
        stack.redo(&mut doc);
        assert_eq!(ranges(&doc), [(1, 8), (9, 12)]);
        assert!(doc.map.tilesets()[0].embedded);
        assert!(!doc.map.tilesets()[1].embedded);
    }

    #[test]
    fn test_ranges_stay_disjoint() {
        let mut doc = document();
        let mut stack = CommandStack::new(20);
        let mut ids = Vec::new();
        for (name, cols) in [("a", 3), ("b", 1), ("c", 5)] {
            let command = CreateTileset::new(tileset(name, cols, 1), true);
            ids.push(command.tileset_id());
            stack.push(&mut doc, MapCommand::from(command));
            assert_disjoint(&doc);
        }
        stack.push(&mut doc, MapCommand::from(RemoveTileset::new(ids[1])));
        assert_disjoint(&doc);
        stack.push(&mut doc, MapCommand::from(CreateTileset::new(tileset("d", 2, 1), true)));
        assert_disjoint(&doc);
        assert_eq!(ranges(&doc), [(1, 3), (5, 9), (10, 11)]);

        while stack.can_undo() {
            stack.undo(&mut doc);
            assert_disjoint(&doc);
        }
        while stack.can_redo() {
            stack.redo(&mut doc);
            assert_disjoint(&doc);
        }
    }

    #[test]
    fn test_remove_tileset_inverse() {
        let mut doc = document();
        doc.map.attach_tileset(tileset("a", 2, 2), true).unwrap();
        doc.map.attach_tileset(tileset("b", 2, 2), true).unwrap();
        let first = doc.map.tilesets()[0].id();
        doc.map.active_tileset = Some(first);

        check_inverse(&mut doc, RemoveTileset::new(first));
        assert_eq!(doc.map.tilesets().len(), 1);
        assert_eq!(doc.map.active_tileset, None);
        check_inverse(&mut doc, RemoveTileset::new(first));
    }
}
