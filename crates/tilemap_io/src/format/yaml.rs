//! The native YAML map format
//!
//! This is the only format that stores component definitions and component
//! instances. Tilesets are either written inline in the `tilesets` sequence
//! or to their own `.yaml` file referenced by `path`.

use super::property;
use super::{write_files, OutputFile, TilesetFiles};
use crate::error::{Result, SaveFormatError};
use crate::fs;
use crate::ir;
use crate::options::{ReadOptions, WriteOptions};
use crate::tile_codec;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use tilemap_core::{
    Attribute, AttributeType, ColorFormat, CompressionMode, ObjectKind, TileEncoding, TileFormat,
};

const FORMAT_VERSION: i64 = 1;

/// Read a `.yaml` map and any external tileset files it references
pub fn parse_map(path: &Path, options: &ReadOptions) -> Result<ir::Map> {
    let text = fs::read_to_string(path)?;
    parse_map_str(&text, &options.base_dir_for(path))
}

pub fn parse_map_str(text: &str, base_dir: &Path) -> Result<ir::Map> {
    let root: Value = serde_yaml::from_str(text)?;
    let map = as_mapping(&root, "map")?;

    let rows = req_extent(map, "row-count")?;
    let cols = req_extent(map, "column-count")?;
    let tile_format = match map.get("tile-format") {
        Some(value) => parse_tile_format(as_mapping(value, "tile-format")?)?,
        None => TileFormat::default(),
    };

    let mut component_definitions = Vec::new();
    for value in opt_seq(map, "component-definitions")? {
        component_definitions.push(parse_component_definition(value)?);
    }

    let parser = Parser {
        base_dir,
        definitions: &component_definitions,
        rows,
        cols,
        tile_format,
    };

    let mut tilesets = Vec::new();
    for value in opt_seq(map, "tilesets")? {
        tilesets.push(parser.tileset_ref(value)?);
    }
    let mut layers = Vec::new();
    for value in opt_seq(map, "layers")? {
        layers.push(parser.layer(value)?);
    }
    let properties = parse_properties(map)?;
    let components = parser.components(map)?;

    Ok(ir::Map {
        rows,
        cols,
        tile_width: req_int(map, "tile-width")?,
        tile_height: req_int(map, "tile-height")?,
        tile_format,
        next_layer_id: req_int(map, "next-layer-id")?,
        next_object_id: req_int(map, "next-object-id")?,
        component_definitions,
        tilesets,
        layers,
        properties,
        components,
    })
}

fn parse_tile_format(node: &Mapping) -> Result<TileFormat> {
    let encoding = match opt_str(node, "encoding")?.unwrap_or("plain") {
        "plain" => TileEncoding::PlainText,
        "base64" => TileEncoding::Base64,
        other => return Err(SaveFormatError::UnsupportedTileEncoding(other.to_string())),
    };
    let compression = match opt_str(node, "compression")?.unwrap_or("none") {
        "none" => CompressionMode::None,
        "zlib" => CompressionMode::Zlib,
        "zstd" => CompressionMode::Zstd,
        other => return Err(SaveFormatError::UnsupportedCompressionMode(other.to_string())),
    };
    if encoding == TileEncoding::PlainText && compression != CompressionMode::None {
        return Err(SaveFormatError::BadCompressionMode);
    }
    Ok(TileFormat {
        encoding,
        compression,
        zlib_level: opt_int(node, "zlib-compression-level")?,
        zstd_level: opt_int(node, "zstd-compression-level")?,
    })
}

fn parse_component_definition(value: &Value) -> Result<ir::ComponentDefinition> {
    let node = as_mapping(value, "component definition")?;
    let mut attributes = Vec::new();
    for value in opt_seq(node, "attributes")? {
        let attr = as_mapping(value, "component attribute")?;
        let ty = property::parse_type(req_str(attr, "type")?)?;
        let default = match attr.get("default") {
            Some(value) => parse_value(ty, value)?,
            None => Attribute::default_for(ty),
        };
        attributes.push(ir::Property::new(req_str(attr, "name")?, default));
    }
    Ok(ir::ComponentDefinition {
        name: req_str(node, "name")?.to_string(),
        attributes,
    })
}

fn parse_properties(node: &Mapping) -> Result<Vec<ir::Property>> {
    let mut properties = Vec::new();
    for value in opt_seq(node, "properties")? {
        let prop = as_mapping(value, "property")?;
        let ty = property::parse_type(req_str(prop, "type")?)?;
        let value = parse_value(ty, req(prop, "value")?)?;
        properties.push(ir::Property::new(req_str(prop, "name")?, value));
    }
    Ok(properties)
}

/// Typed value from a YAML scalar; colors are `#RRGGBB` or `#RRGGBBAA`
fn parse_value(ty: AttributeType, value: &Value) -> Result<Attribute> {
    let text = match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null if ty == AttributeType::String => String::new(),
        _ => return Err(SaveFormatError::CorruptPropertyValue),
    };
    property::parse_text(ty, &text, ColorFormat::Rgba)
}

/// Reading state shared by every nested node of one map
struct Parser<'a> {
    base_dir: &'a Path,
    definitions: &'a [ir::ComponentDefinition],
    rows: usize,
    cols: usize,
    tile_format: TileFormat,
}

impl Parser<'_> {
    fn tileset_ref(&self, value: &Value) -> Result<ir::TilesetRef> {
        let node = as_mapping(value, "tileset")?;
        let first_tile_id = req_int(node, "first-global-id")?;
        let Some(source) = opt_str(node, "path")? else {
            return Ok(ir::TilesetRef {
                first_tile_id,
                embedded: true,
                tileset: self.tileset(node)?,
            });
        };

        let path = self.base_dir.join(source);
        let text = fs::read_to_string(&path)?;
        let root: Value = serde_yaml::from_str(&text)?;
        Ok(ir::TilesetRef {
            first_tile_id,
            embedded: false,
            tileset: self.tileset(as_mapping(&root, "tileset")?)?,
        })
    }

    fn tileset(&self, node: &Mapping) -> Result<ir::Tileset> {
        let mut tiles = Vec::new();
        for value in opt_seq(node, "tiles")? {
            let tile = as_mapping(value, "tile")?;
            let mut animation = Vec::new();
            for frame in opt_seq(tile, "animation")? {
                let frame = as_mapping(frame, "frame")?;
                animation.push(ir::Frame {
                    tile: req_int(frame, "tile")?,
                    duration_ms: req_int(frame, "duration")?,
                });
            }
            let mut objects = Vec::new();
            for object in opt_seq(tile, "objects")? {
                objects.push(self.object(object)?);
            }
            tiles.push(ir::Tile {
                id: req_int(tile, "id")?,
                animation,
                objects,
                properties: parse_properties(tile)?,
                components: self.components(tile)?,
            });
        }

        Ok(ir::Tileset {
            name: req_str(node, "name")?.to_string(),
            tile_width: req_int(node, "tile-width")?,
            tile_height: req_int(node, "tile-height")?,
            tile_count: req_int(node, "tile-count")?,
            column_count: req_int(node, "column-count")?,
            image_path: PathBuf::from(req_str(node, "image-path")?),
            image_width: req_int(node, "image-width")?,
            image_height: req_int(node, "image-height")?,
            tiles,
            properties: parse_properties(node)?,
            components: self.components(node)?,
        })
    }

    fn layer(&self, value: &Value) -> Result<ir::Layer> {
        let node = as_mapping(value, "layer")?;
        let kind = match req_str(node, "type")? {
            "tile-layer" => {
                let expected = self.rows * self.cols;
                let data = req_str(node, "data")?;
                let data = match self.tile_format.encoding {
                    TileEncoding::PlainText => tile_codec::decode_plain(data, expected)?,
                    TileEncoding::Base64 => {
                        tile_codec::decode_base64(data, self.tile_format.compression, expected)?
                    }
                };
                ir::LayerKind::Tile {
                    rows: self.rows,
                    cols: self.cols,
                    data,
                }
            }
            "object-layer" => {
                let mut objects = Vec::new();
                for object in opt_seq(node, "objects")? {
                    objects.push(self.object(object)?);
                }
                ir::LayerKind::Object { objects }
            }
            "group-layer" => {
                let mut layers = Vec::new();
                for child in opt_seq(node, "layers")? {
                    layers.push(self.layer(child)?);
                }
                ir::LayerKind::Group { layers }
            }
            other => return Err(SaveFormatError::UnsupportedLayerType(other.to_string())),
        };

        Ok(ir::Layer {
            id: req_int(node, "id")?,
            name: req_str(node, "name")?.to_string(),
            opacity: opt_f32(node, "opacity")?.unwrap_or(1.0),
            visible: opt_bool(node, "visible")?.unwrap_or(true),
            properties: parse_properties(node)?,
            components: self.components(node)?,
            kind,
        })
    }

    fn object(&self, value: &Value) -> Result<ir::Object> {
        let node = as_mapping(value, "object")?;
        let kind = match req_str(node, "type")? {
            "point" => ObjectKind::Point,
            "rect" => ObjectKind::Rect,
            "ellipse" => ObjectKind::Ellipse,
            other => {
                return Err(SaveFormatError::BadFile(format!(
                    "unknown object type '{}'",
                    other
                )))
            }
        };
        Ok(ir::Object {
            id: req_int(node, "id")?,
            kind,
            name: opt_str(node, "name")?.unwrap_or_default().to_string(),
            tag: opt_str(node, "tag")?.unwrap_or_default().to_string(),
            visible: opt_bool(node, "visible")?.unwrap_or(true),
            x: opt_f32(node, "x")?.unwrap_or(0.0),
            y: opt_f32(node, "y")?.unwrap_or(0.0),
            width: opt_f32(node, "width")?.unwrap_or(0.0),
            height: opt_f32(node, "height")?.unwrap_or(0.0),
            properties: parse_properties(node)?,
            components: self.components(node)?,
        })
    }

    /// Component instances; value types come from the named definition
    fn components(&self, node: &Mapping) -> Result<Vec<ir::Component>> {
        let mut components = Vec::new();
        for value in opt_seq(node, "components")? {
            let component = as_mapping(value, "component")?;
            let name = req_str(component, "type")?;
            let Some(definition) = self.definitions.iter().find(|d| d.name == name) else {
                return Err(SaveFormatError::BadFile(format!(
                    "no component definition named '{}'",
                    name
                )));
            };

            let mut values = Vec::new();
            for value in opt_seq(component, "values")? {
                let entry = as_mapping(value, "component value")?;
                let attr_name = req_str(entry, "name")?;
                let Some(attr) = definition.attributes.iter().find(|a| a.name == attr_name) else {
                    return Err(SaveFormatError::BadFile(format!(
                        "component '{}' has no attribute '{}'",
                        name, attr_name
                    )));
                };
                let parsed = parse_value(attr.value.get_type(), req(entry, "value")?)?;
                values.push(ir::Property::new(attr_name, parsed));
            }
            components.push(ir::Component {
                name: name.to_string(),
                values,
            });
        }
        Ok(components)
    }
}

/// Write a map and, when tilesets are externalized, their `.yaml` files
pub fn emit_map(map: &ir::Map, path: &Path, options: &WriteOptions) -> Result<()> {
    let files = render(map, path, options)?;
    write_files(&files)
}

/// Render every file a save produces, tilesets first and the map last
pub fn render(map: &ir::Map, path: &Path, options: &WriteOptions) -> Result<Vec<OutputFile>> {
    let mut root = Mapping::new();
    insert(&mut root, "version", FORMAT_VERSION);
    insert(&mut root, "row-count", map.rows as u64);
    insert(&mut root, "column-count", map.cols as u64);
    insert(&mut root, "tile-width", map.tile_width);
    insert(&mut root, "tile-height", map.tile_height);
    insert(&mut root, "next-layer-id", map.next_layer_id);
    insert(&mut root, "next-object-id", map.next_object_id);
    if map.tile_format.encoding != TileEncoding::PlainText {
        insert(&mut root, "tile-format", tile_format_value(&map.tile_format));
    }

    if !map.component_definitions.is_empty() {
        let definitions: Vec<Value> = map
            .component_definitions
            .iter()
            .map(component_definition_value)
            .collect();
        insert(&mut root, "component-definitions", definitions);
    }

    let mut files = Vec::new();
    if !map.tilesets.is_empty() {
        let mut refs = Vec::new();
        let mut tileset_files = TilesetFiles::new(path, "yaml");
        for tileset_ref in &map.tilesets {
            let mut node = Mapping::new();
            insert(&mut node, "first-global-id", tileset_ref.first_tile_id);
            if options.tilesets.embeds(tileset_ref.embedded) {
                write_tileset_fields(&mut node, &tileset_ref.tileset);
            } else {
                let (relative, full) = tileset_files.next(&tileset_ref.tileset.name);
                let mut doc = Mapping::new();
                insert(&mut doc, "version", FORMAT_VERSION);
                write_tileset_fields(&mut doc, &tileset_ref.tileset);
                files.push(OutputFile {
                    path: full,
                    contents: serde_yaml::to_string(&Value::Mapping(doc))?,
                });
                insert(&mut node, "path", relative);
            }
            refs.push(Value::Mapping(node));
        }
        insert(&mut root, "tilesets", refs);
    }

    if !map.layers.is_empty() {
        let mut layers = Vec::new();
        for layer in &map.layers {
            layers.push(layer_value(layer, &map.tile_format, options.fold_tile_data)?);
        }
        insert(&mut root, "layers", layers);
    }
    insert_context(&mut root, &map.properties, &map.components);

    files.push(OutputFile {
        path: path.to_path_buf(),
        contents: serde_yaml::to_string(&Value::Mapping(root))?,
    });
    Ok(files)
}

fn tile_format_value(format: &TileFormat) -> Value {
    let mut node = Mapping::new();
    let encoding = match format.encoding {
        TileEncoding::PlainText => "plain",
        TileEncoding::Base64 => "base64",
    };
    insert(&mut node, "encoding", encoding);
    let compression = match format.compression {
        CompressionMode::None => None,
        CompressionMode::Zlib => Some("zlib"),
        CompressionMode::Zstd => Some("zstd"),
    };
    if let Some(compression) = compression {
        insert(&mut node, "compression", compression);
    }
    if let Some(level) = format.zlib_level {
        insert(&mut node, "zlib-compression-level", level);
    }
    if let Some(level) = format.zstd_level {
        insert(&mut node, "zstd-compression-level", level);
    }
    Value::Mapping(node)
}

fn component_definition_value(definition: &ir::ComponentDefinition) -> Value {
    let mut node = Mapping::new();
    insert(&mut node, "name", definition.name.as_str());
    if !definition.attributes.is_empty() {
        let attributes: Vec<Value> = definition
            .attributes
            .iter()
            .map(|attr| {
                let mut entry = Mapping::new();
                insert(&mut entry, "name", attr.name.as_str());
                insert(&mut entry, "type", attr.value.get_type().name());
                if !attr.value.is_default() {
                    insert(&mut entry, "default", attribute_value(&attr.value));
                }
                Value::Mapping(entry)
            })
            .collect();
        insert(&mut node, "attributes", attributes);
    }
    Value::Mapping(node)
}

fn write_tileset_fields(node: &mut Mapping, tileset: &ir::Tileset) {
    insert(node, "name", tileset.name.as_str());
    insert(node, "tile-width", tileset.tile_width);
    insert(node, "tile-height", tileset.tile_height);
    insert(node, "tile-count", tileset.tile_count);
    insert(node, "column-count", tileset.column_count);
    insert(
        node,
        "image-path",
        tileset.image_path.to_string_lossy().replace('\\', "/"),
    );
    insert(node, "image-width", tileset.image_width);
    insert(node, "image-height", tileset.image_height);

    if !tileset.tiles.is_empty() {
        let tiles: Vec<Value> = tileset.tiles.iter().map(tile_value).collect();
        insert(node, "tiles", tiles);
    }
    insert_context(node, &tileset.properties, &tileset.components);
}

fn tile_value(tile: &ir::Tile) -> Value {
    let mut node = Mapping::new();
    insert(&mut node, "id", tile.id);
    if !tile.animation.is_empty() {
        let frames: Vec<Value> = tile
            .animation
            .iter()
            .map(|frame| {
                let mut entry = Mapping::new();
                insert(&mut entry, "tile", frame.tile);
                insert(&mut entry, "duration", frame.duration_ms);
                Value::Mapping(entry)
            })
            .collect();
        insert(&mut node, "animation", frames);
    }
    if !tile.objects.is_empty() {
        let objects: Vec<Value> = tile.objects.iter().map(object_value).collect();
        insert(&mut node, "objects", objects);
    }
    insert_context(&mut node, &tile.properties, &tile.components);
    Value::Mapping(node)
}

fn layer_value(layer: &ir::Layer, format: &TileFormat, fold: bool) -> Result<Value> {
    let mut node = Mapping::new();
    insert(&mut node, "name", layer.name.as_str());
    insert(&mut node, "id", layer.id);
    if layer.opacity != 1.0 {
        insert(&mut node, "opacity", float_value(layer.opacity));
    }
    if !layer.visible {
        insert(&mut node, "visible", false);
    }

    match &layer.kind {
        ir::LayerKind::Tile { cols, data, .. } => {
            insert(&mut node, "type", "tile-layer");
            let text = match format.encoding {
                TileEncoding::PlainText => tile_codec::encode_plain(data, *cols, fold),
                TileEncoding::Base64 => {
                    tile_codec::encode_base64(data, format.compression, format.level())?
                }
            };
            insert(&mut node, "data", text);
        }
        ir::LayerKind::Object { objects } => {
            insert(&mut node, "type", "object-layer");
            if !objects.is_empty() {
                let objects: Vec<Value> = objects.iter().map(object_value).collect();
                insert(&mut node, "objects", objects);
            }
        }
        ir::LayerKind::Group { layers } => {
            insert(&mut node, "type", "group-layer");
            let mut children = Vec::new();
            for child in layers {
                children.push(layer_value(child, format, fold)?);
            }
            insert(&mut node, "layers", children);
        }
    }

    insert_context(&mut node, &layer.properties, &layer.components);
    Ok(Value::Mapping(node))
}

fn object_value(object: &ir::Object) -> Value {
    let mut node = Mapping::new();
    insert(&mut node, "id", object.id);
    insert(&mut node, "type", object.kind.name());
    if !object.name.is_empty() {
        insert(&mut node, "name", object.name.as_str());
    }
    if !object.tag.is_empty() {
        insert(&mut node, "tag", object.tag.as_str());
    }
    if !object.visible {
        insert(&mut node, "visible", false);
    }
    for (key, value) in [
        ("x", object.x),
        ("y", object.y),
        ("width", object.width),
        ("height", object.height),
    ] {
        if value != 0.0 {
            insert(&mut node, key, float_value(value));
        }
    }
    insert_context(&mut node, &object.properties, &object.components);
    Value::Mapping(node)
}

fn insert_context(node: &mut Mapping, properties: &[ir::Property], components: &[ir::Component]) {
    if !properties.is_empty() {
        let values: Vec<Value> = properties
            .iter()
            .map(|prop| {
                let mut entry = Mapping::new();
                insert(&mut entry, "name", prop.name.as_str());
                insert(&mut entry, "type", prop.value.get_type().name());
                insert(&mut entry, "value", attribute_value(&prop.value));
                Value::Mapping(entry)
            })
            .collect();
        insert(node, "properties", values);
    }

    if !components.is_empty() {
        let values: Vec<Value> = components
            .iter()
            .map(|component| {
                let mut entry = Mapping::new();
                insert(&mut entry, "type", component.name.as_str());
                let attributes: Vec<Value> = component
                    .values
                    .iter()
                    .map(|prop| {
                        let mut value = Mapping::new();
                        insert(&mut value, "name", prop.name.as_str());
                        insert(&mut value, "value", attribute_value(&prop.value));
                        Value::Mapping(value)
                    })
                    .collect();
                insert(&mut entry, "values", attributes);
                Value::Mapping(entry)
            })
            .collect();
        insert(node, "components", values);
    }
}

fn attribute_value(value: &Attribute) -> Value {
    match value {
        Attribute::Int(v) | Attribute::Object(v) => Value::from(*v),
        Attribute::Float(v) => float_value(*v),
        Attribute::Bool(v) => Value::Bool(*v),
        other => Value::String(property::to_text(other, ColorFormat::Rgba)),
    }
}

fn float_value(value: f32) -> Value {
    let wide: f64 = property::float_text(value)
        .parse()
        .unwrap_or_else(|_| f64::from(value));
    Value::from(wide)
}

fn insert(node: &mut Mapping, key: &str, value: impl Into<Value>) {
    node.insert(Value::from(key), value.into());
}

fn as_mapping<'a>(value: &'a Value, what: &str) -> Result<&'a Mapping> {
    value
        .as_mapping()
        .ok_or_else(|| SaveFormatError::BadFile(format!("{} is not a YAML mapping", what)))
}

fn req<'a>(node: &'a Mapping, key: &str) -> Result<&'a Value> {
    node.get(key).ok_or_else(|| SaveFormatError::missing(key))
}

fn wrong_type(key: &str) -> SaveFormatError {
    SaveFormatError::BadFile(format!("'{}' has the wrong type", key))
}

fn req_str<'a>(node: &'a Mapping, key: &str) -> Result<&'a str> {
    req(node, key)?.as_str().ok_or_else(|| wrong_type(key))
}

fn opt_str<'a>(node: &'a Mapping, key: &str) -> Result<Option<&'a str>> {
    node.get(key)
        .map(|v| v.as_str().ok_or_else(|| wrong_type(key)))
        .transpose()
}

fn opt_bool(node: &Mapping, key: &str) -> Result<Option<bool>> {
    node.get(key)
        .map(|v| v.as_bool().ok_or_else(|| wrong_type(key)))
        .transpose()
}

fn opt_int<T: TryFrom<i64>>(node: &Mapping, key: &str) -> Result<Option<T>> {
    node.get(key)
        .map(|v| {
            v.as_i64()
                .and_then(|v| T::try_from(v).ok())
                .ok_or_else(|| wrong_type(key))
        })
        .transpose()
}

fn req_int<T: TryFrom<i64>>(node: &Mapping, key: &str) -> Result<T> {
    opt_int(node, key)?.ok_or_else(|| SaveFormatError::missing(key))
}

fn req_extent(node: &Mapping, key: &str) -> Result<usize> {
    let value: usize = req_int(node, key)?;
    if value == 0 {
        return Err(wrong_type(key));
    }
    Ok(value)
}

fn opt_f32(node: &Mapping, key: &str) -> Result<Option<f32>> {
    node.get(key)
        .map(|v| v.as_f64().map(|f| f as f32).ok_or_else(|| wrong_type(key)))
        .transpose()
}

fn opt_seq<'a>(node: &'a Mapping, key: &str) -> Result<&'a [Value]> {
    match node.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Sequence(values)) => Ok(values),
        Some(_) => Err(wrong_type(key)),
    }
}
