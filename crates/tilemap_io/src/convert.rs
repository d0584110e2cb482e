//! Conversion between the live document model and the IR
//!
//! Saving runs [`map_to_ir`] and then a format writer; loading runs a reader
//! and then [`map_from_ir`]. Entities in the IR are identified by their
//! persistent integer ids and component definitions by name, so fresh uuids
//! are generated on every load.

use crate::error::{Result, SaveFormatError};
use crate::ir;
use std::collections::BTreeMap;
use tilemap_core::{
    AnimationFrame, AttachedTileset, ComponentDefinition, ComponentRegistry, Layer,
    LayerKind, Map, Metadata, Object, ObjectLayer, TextureRef, TileAnimation, TileDefinition,
    TileExtent, TileLayer, TileSize, Tileset, Vec2,
};

/// Id counters for entities that were never given a persistent id
struct IdAllocator {
    next_layer_id: i32,
    next_object_id: i32,
}

impl IdAllocator {
    fn layer_id(&mut self, id: Option<i32>) -> i32 {
        id.unwrap_or_else(|| {
            let id = self.next_layer_id;
            self.next_layer_id += 1;
            id
        })
    }

    fn object_id(&mut self, id: Option<i32>) -> i32 {
        id.unwrap_or_else(|| {
            let id = self.next_object_id;
            self.next_object_id += 1;
            id
        })
    }
}

/// Build the IR of a map and the component definitions it may reference
pub fn map_to_ir(map: &Map, components: &ComponentRegistry) -> ir::Map {
    let mut ids = IdAllocator {
        next_layer_id: map.next_layer_id,
        next_object_id: map.next_object_id,
    };
    let extent = map.extent();

    let tilesets = map
        .tilesets()
        .iter()
        .map(|attached| ir::TilesetRef {
            first_tile_id: attached.first_tile_id,
            embedded: attached.embedded,
            tileset: tileset_to_ir(&attached.tileset, components, &mut ids),
        })
        .collect();
    let layers = map
        .root
        .children
        .iter()
        .map(|layer| layer_to_ir(layer, components, &mut ids))
        .collect();

    ir::Map {
        rows: extent.rows,
        cols: extent.cols,
        tile_width: map.tile_size.width,
        tile_height: map.tile_size.height,
        tile_format: map.tile_format,
        next_layer_id: ids.next_layer_id,
        next_object_id: ids.next_object_id,
        component_definitions: components.iter().map(definition_to_ir).collect(),
        tilesets,
        layers,
        properties: properties_to_ir(&map.metadata),
        components: components_to_ir(&map.metadata, components),
    }
}

fn definition_to_ir(definition: &ComponentDefinition) -> ir::ComponentDefinition {
    ir::ComponentDefinition {
        name: definition.name.clone(),
        attributes: definition
            .attributes
            .iter()
            .map(|(name, value)| ir::Property::new(name.as_str(), value.clone()))
            .collect(),
    }
}

fn properties_to_ir(metadata: &Metadata) -> Vec<ir::Property> {
    metadata
        .properties
        .iter()
        .map(|(name, value)| ir::Property::new(name.as_str(), value.clone()))
        .collect()
}

fn components_to_ir(metadata: &Metadata, registry: &ComponentRegistry) -> Vec<ir::Component> {
    metadata
        .components
        .values()
        .filter_map(|instance| {
            let Some(definition) = registry.get(instance.definition) else {
                tracing::warn!(
                    "'{}' has a component without a definition, it is not saved",
                    metadata.name
                );
                return None;
            };
            Some(ir::Component {
                name: definition.name.clone(),
                values: instance
                    .values
                    .iter()
                    .map(|(name, value)| ir::Property::new(name.as_str(), value.clone()))
                    .collect(),
            })
        })
        .collect()
}

fn tileset_to_ir(
    tileset: &Tileset,
    registry: &ComponentRegistry,
    ids: &mut IdAllocator,
) -> ir::Tileset {
    let tiles = tileset
        .tiles
        .iter()
        .filter(|(_, definition)| !definition.is_empty())
        .map(|(&index, definition)| ir::Tile {
            id: index,
            animation: definition
                .animation
                .iter()
                .flat_map(|animation| animation.frames.iter())
                .map(|frame| ir::Frame {
                    tile: frame.tile,
                    duration_ms: frame.duration_ms,
                })
                .collect(),
            objects: definition
                .objects
                .values()
                .map(|object| object_to_ir(object, registry, ids))
                .collect(),
            properties: properties_to_ir(&definition.metadata),
            components: components_to_ir(&definition.metadata, registry),
        })
        .collect();

    ir::Tileset {
        name: tileset.name().to_string(),
        tile_width: tileset.tile_size.width,
        tile_height: tileset.tile_size.height,
        tile_count: tileset.tile_count(),
        column_count: tileset.column_count,
        image_path: tileset.texture.path.clone(),
        image_width: tileset.texture.width,
        image_height: tileset.texture.height,
        tiles,
        properties: properties_to_ir(&tileset.metadata),
        components: components_to_ir(&tileset.metadata, registry),
    }
}

fn layer_to_ir(layer: &Layer, registry: &ComponentRegistry, ids: &mut IdAllocator) -> ir::Layer {
    let id = ids.layer_id(layer.persistent_id);
    let kind = match &layer.kind {
        LayerKind::Tile(tiles) => ir::LayerKind::Tile {
            rows: tiles.rows(),
            cols: tiles.cols(),
            data: tiles.tiles().to_vec(),
        },
        LayerKind::Object(objects) => ir::LayerKind::Object {
            objects: objects
                .iter()
                .map(|object| object_to_ir(object, registry, ids))
                .collect(),
        },
        LayerKind::Group(group) => ir::LayerKind::Group {
            layers: group
                .children
                .iter()
                .map(|child| layer_to_ir(child, registry, ids))
                .collect(),
        },
    };
    ir::Layer {
        id,
        name: layer.name().to_string(),
        opacity: layer.opacity(),
        visible: layer.visible,
        properties: properties_to_ir(&layer.metadata),
        components: components_to_ir(&layer.metadata, registry),
        kind,
    }
}

fn object_to_ir(
    object: &Object,
    registry: &ComponentRegistry,
    ids: &mut IdAllocator,
) -> ir::Object {
    ir::Object {
        id: ids.object_id(object.persistent_id),
        kind: object.kind,
        name: object.name().to_string(),
        tag: object.tag.clone(),
        visible: object.visible,
        x: object.position.x,
        y: object.position.y,
        width: object.size.x,
        height: object.size.y,
        properties: properties_to_ir(&object.metadata),
        components: components_to_ir(&object.metadata, registry),
    }
}

/// Instantiate a live map named `name` from IR
///
/// Fails with `BadFile` when tileset id ranges overlap or an entity refers
/// to an undefined component, and with `BadTileLayerData` when a tile
/// layer's data does not fill its extent.
pub fn map_from_ir(source: &ir::Map, name: &str) -> Result<(Map, ComponentRegistry)> {
    let mut registry = ComponentRegistry::new();
    for definition in &source.component_definitions {
        let mut model = ComponentDefinition::new(definition.name.as_str());
        for attr in &definition.attributes {
            model.add_attribute(&attr.name, attr.value.clone());
        }
        if !registry.insert(registry.len(), model) {
            return Err(SaveFormatError::BadFile(format!(
                "component '{}' is defined twice",
                definition.name
            )));
        }
    }

    let extent = TileExtent::new(source.rows, source.cols);
    let mut map = Map::new(
        name,
        extent,
        TileSize::new(source.tile_width, source.tile_height),
    );
    map.tile_format = source.tile_format;
    apply_context(&mut map.metadata, &source.properties, &source.components, &registry)?;

    let mut max_object_id = 0;
    for tileset_ref in &source.tilesets {
        let tileset = tileset_from_ir(&tileset_ref.tileset, &registry, &mut max_object_id)?;
        let last_tile_id = tileset
            .id_span()
            .and_then(|count| tileset_ref.first_tile_id.checked_add(count - 1))
            .ok_or_else(|| {
                SaveFormatError::BadFile(format!(
                    "tileset '{}' runs past the last tile id",
                    tileset.name()
                ))
            })?;
        let attached = AttachedTileset {
            tileset,
            first_tile_id: tileset_ref.first_tile_id,
            last_tile_id,
            embedded: tileset_ref.embedded,
            selection: None,
        };
        let index = map.tilesets().len();
        if let Err(rejected) = map.insert_tileset(index, attached) {
            return Err(SaveFormatError::BadFile(format!(
                "tileset '{}' has an invalid or overlapping tile id range",
                rejected.tileset.name()
            )));
        }
    }
    map.active_tileset = map.tilesets().first().map(|t| t.id());

    let mut max_layer_id = 0;
    for layer in &source.layers {
        let layer = layer_from_ir(layer, extent, &registry, &mut max_layer_id, &mut max_object_id)?;
        map.root.push(layer);
    }
    map.next_layer_id = source.next_layer_id.max(next_id(max_layer_id, "layer")?);
    map.next_object_id = source.next_object_id.max(next_id(max_object_id, "object")?);

    tracing::debug!(
        "Built map '{}' with {} layers and {} tilesets",
        name,
        map.layers().len(),
        map.tilesets().len()
    );
    Ok((map, registry))
}

/// The id after the highest one in the file, which must leave room for it
fn next_id(max_id: i32, what: &str) -> Result<i32> {
    max_id.checked_add(1).ok_or_else(|| {
        SaveFormatError::BadFile(format!("{} id {} leaves no id free", what, max_id))
    })
}

fn apply_context(
    metadata: &mut Metadata,
    properties: &[ir::Property],
    components: &[ir::Component],
    registry: &ComponentRegistry,
) -> Result<()> {
    for prop in properties {
        metadata.set_property(&prop.name, prop.value.clone());
    }
    for component in components {
        let Some(definition) = registry.find_by_name(&component.name) else {
            return Err(SaveFormatError::BadFile(format!(
                "'{}' uses undefined component '{}'",
                metadata.name, component.name
            )));
        };
        metadata.attach_component(definition);
        if let Some(instance) = metadata.component_mut(definition.id) {
            for value in &component.values {
                if instance.set(&value.name, value.value.clone()).is_none() {
                    tracing::warn!(
                        "Component '{}' has no attribute '{}', value ignored",
                        component.name,
                        value.name
                    );
                }
            }
        }
    }
    Ok(())
}

fn tileset_from_ir(
    source: &ir::Tileset,
    registry: &ComponentRegistry,
    max_object_id: &mut i32,
) -> Result<Tileset> {
    let texture = TextureRef {
        path: source.image_path.clone(),
        width: source.image_width,
        height: source.image_height,
    };
    let mut tileset = Tileset::new(
        source.name.as_str(),
        texture,
        TileSize::new(source.tile_width, source.tile_height),
    );
    tileset.column_count = source.column_count.max(1);
    tileset.row_count = source.tile_count.div_ceil(tileset.column_count).max(1);
    if tileset.id_span().is_none() {
        return Err(SaveFormatError::BadFile(format!(
            "tileset '{}' has too many tiles ({} in {} columns)",
            source.name, source.tile_count, source.column_count
        )));
    }
    apply_context(
        &mut tileset.metadata,
        &source.properties,
        &source.components,
        registry,
    )?;

    let mut tiles = BTreeMap::new();
    for tile in &source.tiles {
        if !tileset.contains_index(tile.id) {
            return Err(SaveFormatError::BadFile(format!(
                "tile {} is outside tileset '{}'",
                tile.id, source.name
            )));
        }
        let mut definition = TileDefinition::default();
        if !tile.animation.is_empty() {
            definition.animation = Some(TileAnimation {
                frames: tile
                    .animation
                    .iter()
                    .map(|frame| AnimationFrame {
                        tile: frame.tile,
                        duration_ms: frame.duration_ms,
                    })
                    .collect(),
            });
        }
        for object in &tile.objects {
            let object = object_from_ir(object, registry, max_object_id)?;
            definition.objects.insert(object.metadata.id, object);
        }
        apply_context(
            &mut definition.metadata,
            &tile.properties,
            &tile.components,
            registry,
        )?;
        tiles.insert(tile.id, definition);
    }
    tileset.tiles = tiles;
    Ok(tileset)
}

fn layer_from_ir(
    source: &ir::Layer,
    extent: TileExtent,
    registry: &ComponentRegistry,
    max_layer_id: &mut i32,
    max_object_id: &mut i32,
) -> Result<Layer> {
    let kind = match &source.kind {
        ir::LayerKind::Tile { rows, cols, data } => {
            let own = TileExtent::new(*rows, *cols);
            let mut tiles = TileLayer::from_tiles(own, data.clone())
                .ok_or(SaveFormatError::BadTileLayerData)?;
            if own != extent {
                tracing::warn!(
                    "Layer '{}' is {}x{} in a {}x{} map, resizing",
                    source.name,
                    own.rows,
                    own.cols,
                    extent.rows,
                    extent.cols
                );
                tiles.resize(extent);
            }
            LayerKind::Tile(tiles)
        }
        ir::LayerKind::Object { objects } => {
            let mut layer = ObjectLayer::new();
            for object in objects {
                layer.insert(object_from_ir(object, registry, max_object_id)?);
            }
            LayerKind::Object(layer)
        }
        ir::LayerKind::Group { layers } => {
            let mut group = tilemap_core::GroupLayer::new();
            for child in layers {
                group.push(layer_from_ir(child, extent, registry, max_layer_id, max_object_id)?);
            }
            LayerKind::Group(group)
        }
    };

    let mut layer = Layer::new(source.name.as_str(), kind);
    layer.persistent_id = Some(source.id);
    layer.set_opacity(source.opacity);
    layer.visible = source.visible;
    apply_context(
        &mut layer.metadata,
        &source.properties,
        &source.components,
        registry,
    )?;
    *max_layer_id = (*max_layer_id).max(source.id);
    Ok(layer)
}

fn object_from_ir(
    source: &ir::Object,
    registry: &ComponentRegistry,
    max_object_id: &mut i32,
) -> Result<Object> {
    let mut object = Object::new(source.kind, source.name.as_str())
        .with_position(Vec2::new(source.x, source.y))
        .with_size(Vec2::new(source.width, source.height));
    object.tag = source.tag.clone();
    object.visible = source.visible;
    object.persistent_id = Some(source.id);
    apply_context(
        &mut object.metadata,
        &source.properties,
        &source.components,
        registry,
    )?;
    *max_object_id = (*max_object_id).max(source.id);
    Ok(object)
}
