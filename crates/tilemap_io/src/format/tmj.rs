//! Tiled JSON maps (`.tmj`) and tilesets (`.tsj`)

use super::property;
use super::{note_tile_format, write_files, OutputFile, TilesetFiles};
use crate::error::{Result, SaveFormatError};
use crate::fs;
use crate::ir;
use crate::options::{ReadOptions, WriteOptions};
use crate::tile_codec;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tilemap_core::{
    Attribute, AttributeType, ColorFormat, CompressionMode, ObjectKind, TileEncoding, TileFormat,
    TileId,
};

type JsonObject = serde_json::Map<String, Value>;

const FORMAT_VERSION: &str = "1.10";
const TILED_VERSION: &str = "1.10.2";

/// Read a `.tmj` file and any external `.tsj` tilesets it references
pub fn parse_map(path: &Path, options: &ReadOptions) -> Result<ir::Map> {
    let text = fs::read_to_string(path)?;
    parse_map_str(&text, &options.base_dir_for(path))
}

/// Parse map JSON, resolving external tilesets against `base_dir`
pub fn parse_map_str(text: &str, base_dir: &Path) -> Result<ir::Map> {
    let root: Value = serde_json::from_str(text)?;
    let map = as_object(&root, "map")?;

    if let Some(orientation) = opt_str(map, "orientation")? {
        if orientation != "orthogonal" {
            return Err(SaveFormatError::UnsupportedOrientation(orientation.to_string()));
        }
    }
    if opt_bool(map, "infinite")?.unwrap_or(false) {
        tracing::warn!("Infinite maps are not supported");
        return Err(SaveFormatError::UnsupportedFormat);
    }

    let cols = req_usize(map, "width")?;
    let rows = req_usize(map, "height")?;
    let tile_width = req_u32(map, "tilewidth")?;
    let tile_height = req_u32(map, "tileheight")?;
    let next_layer_id = opt_i32(map, "nextlayerid")?.unwrap_or(1);
    let next_object_id = opt_i32(map, "nextobjectid")?.unwrap_or(1);
    let level = opt_i32(map, "compressionlevel")?.unwrap_or(-1);

    let mut tilesets = Vec::new();
    for value in opt_array(map, "tilesets")? {
        tilesets.push(parse_tileset_ref(value, base_dir)?);
    }

    let mut tile_format = None;
    let mut layers = Vec::new();
    for value in req_array(map, "layers")? {
        layers.push(parse_layer(value, &mut tile_format)?);
    }

    let mut tile_format = tile_format.unwrap_or_default();
    if level >= 0 {
        match tile_format.compression {
            CompressionMode::Zlib => tile_format.zlib_level = Some(level),
            CompressionMode::Zstd => tile_format.zstd_level = Some(level),
            CompressionMode::None => {}
        }
    }

    Ok(ir::Map {
        rows,
        cols,
        tile_width,
        tile_height,
        tile_format,
        next_layer_id,
        next_object_id,
        component_definitions: Vec::new(),
        tilesets,
        layers,
        properties: parse_properties(map)?,
        components: Vec::new(),
    })
}

fn parse_tileset_ref(value: &Value, base_dir: &Path) -> Result<ir::TilesetRef> {
    let obj = as_object(value, "tileset")?;
    let first_tile_id = req_i32(obj, "firstgid")?;
    match opt_str(obj, "source")? {
        Some(source) => {
            let path = base_dir.join(source);
            let text = fs::read_to_string(&path)?;
            let root: Value = serde_json::from_str(&text)?;
            Ok(ir::TilesetRef {
                first_tile_id,
                embedded: false,
                tileset: parse_tileset(as_object(&root, "tileset")?)?,
            })
        }
        None => Ok(ir::TilesetRef {
            first_tile_id,
            embedded: true,
            tileset: parse_tileset(obj)?,
        }),
    }
}

/// Parse the tileset fields shared by inline tilesets and `.tsj` files
pub(crate) fn parse_tileset(obj: &JsonObject) -> Result<ir::Tileset> {
    let mut tiles = Vec::new();
    for value in opt_array(obj, "tiles")? {
        let tile = as_object(value, "tile")?;
        let mut animation = Vec::new();
        for frame in opt_array(tile, "animation")? {
            let frame = as_object(frame, "frame")?;
            animation.push(ir::Frame {
                tile: req_i32(frame, "tileid")?,
                duration_ms: req_u32(frame, "duration")?,
            });
        }
        let mut objects = Vec::new();
        if let Some(group) = tile.get("objectgroup") {
            for object in opt_array(as_object(group, "objectgroup")?, "objects")? {
                objects.push(parse_object(object)?);
            }
        }
        tiles.push(ir::Tile {
            id: req_i32(tile, "id")?,
            animation,
            objects,
            properties: parse_properties(tile)?,
            components: Vec::new(),
        });
    }

    Ok(ir::Tileset {
        name: req_str(obj, "name")?.to_string(),
        tile_width: req_u32(obj, "tilewidth")?,
        tile_height: req_u32(obj, "tileheight")?,
        tile_count: req_u32(obj, "tilecount")?,
        column_count: req_u32(obj, "columns")?,
        image_path: PathBuf::from(req_str(obj, "image")?),
        image_width: opt_u32(obj, "imagewidth")?.unwrap_or(0),
        image_height: opt_u32(obj, "imageheight")?.unwrap_or(0),
        tiles,
        properties: parse_properties(obj)?,
        components: Vec::new(),
    })
}

fn parse_layer(value: &Value, tile_format: &mut Option<TileFormat>) -> Result<ir::Layer> {
    let obj = as_object(value, "layer")?;
    let ty = req_str(obj, "type")?;
    let kind = match ty {
        "tilelayer" => {
            let cols = req_usize(obj, "width")?;
            let rows = req_usize(obj, "height")?;
            let (data, format) = parse_tile_data(obj, rows * cols)?;
            let name = opt_str(obj, "name")?.unwrap_or_default();
            note_tile_format(tile_format, name, format);
            ir::LayerKind::Tile { rows, cols, data }
        }
        "objectgroup" => {
            let mut objects = Vec::new();
            for object in opt_array(obj, "objects")? {
                objects.push(parse_object(object)?);
            }
            ir::LayerKind::Object { objects }
        }
        "group" => {
            let mut layers = Vec::new();
            for child in opt_array(obj, "layers")? {
                layers.push(parse_layer(child, tile_format)?);
            }
            ir::LayerKind::Group { layers }
        }
        other => return Err(SaveFormatError::UnsupportedLayerType(other.to_string())),
    };

    Ok(ir::Layer {
        id: req_i32(obj, "id")?,
        name: opt_str(obj, "name")?.unwrap_or_default().to_string(),
        opacity: opt_f32(obj, "opacity")?.unwrap_or(1.0),
        visible: opt_bool(obj, "visible")?.unwrap_or(true),
        properties: parse_properties(obj)?,
        components: Vec::new(),
        kind,
    })
}

fn parse_tile_data(obj: &JsonObject, expected: usize) -> Result<(Vec<TileId>, TileFormat)> {
    let encoding = opt_str(obj, "encoding")?.unwrap_or("csv");
    let compression = parse_compression(opt_str(obj, "compression")?.unwrap_or(""))?;
    let data = req(obj, "data")?;
    match encoding {
        "csv" => {
            if compression != CompressionMode::None {
                return Err(SaveFormatError::BadCompressionMode);
            }
            let Some(values) = data.as_array() else {
                return Err(SaveFormatError::BadTileLayerData);
            };
            let tiles = values
                .iter()
                .map(|v| {
                    v.as_i64()
                        .filter(|&id| id >= i64::from(i32::MIN) && id <= i64::from(u32::MAX))
                        .map(|id| id as TileId)
                        .ok_or(SaveFormatError::BadTileLayerData)
                })
                .collect::<Result<Vec<_>>>()?;
            if tiles.len() != expected {
                return Err(SaveFormatError::BadTileLayerData);
            }
            let format = TileFormat::default();
            Ok((tiles, format))
        }
        "base64" => {
            let Some(text) = data.as_str() else {
                return Err(SaveFormatError::BadTileLayerData);
            };
            let tiles = tile_codec::decode_base64(text, compression, expected)?;
            let format = TileFormat {
                encoding: TileEncoding::Base64,
                compression,
                ..TileFormat::default()
            };
            Ok((tiles, format))
        }
        other => Err(SaveFormatError::UnsupportedTileEncoding(other.to_string())),
    }
}

pub(crate) fn parse_compression(name: &str) -> Result<CompressionMode> {
    match name {
        "" => Ok(CompressionMode::None),
        "zlib" => Ok(CompressionMode::Zlib),
        "zstd" => Ok(CompressionMode::Zstd),
        other => Err(SaveFormatError::UnsupportedCompressionMode(other.to_string())),
    }
}

fn parse_object(value: &Value) -> Result<ir::Object> {
    let obj = as_object(value, "object")?;
    for shape in ["polygon", "polyline", "text"] {
        if obj.contains_key(shape) {
            return Err(SaveFormatError::BadFile(format!(
                "{} objects are not supported",
                shape
            )));
        }
    }
    let kind = if opt_bool(obj, "point")?.unwrap_or(false) {
        ObjectKind::Point
    } else if opt_bool(obj, "ellipse")?.unwrap_or(false) {
        ObjectKind::Ellipse
    } else {
        ObjectKind::Rect
    };
    let tag = match opt_str(obj, "type")? {
        Some(tag) => tag,
        None => opt_str(obj, "class")?.unwrap_or_default(),
    };

    Ok(ir::Object {
        id: req_i32(obj, "id")?,
        kind,
        name: opt_str(obj, "name")?.unwrap_or_default().to_string(),
        tag: tag.to_string(),
        visible: opt_bool(obj, "visible")?.unwrap_or(true),
        x: req_f32(obj, "x")?,
        y: req_f32(obj, "y")?,
        width: opt_f32(obj, "width")?.unwrap_or(0.0),
        height: opt_f32(obj, "height")?.unwrap_or(0.0),
        properties: parse_properties(obj)?,
        components: Vec::new(),
    })
}

fn parse_properties(obj: &JsonObject) -> Result<Vec<ir::Property>> {
    opt_array(obj, "properties")?
        .iter()
        .map(parse_property)
        .collect()
}

/// Parse one `{"name", "type", "value"}` property node
pub fn parse_property(value: &Value) -> Result<ir::Property> {
    let obj = as_object(value, "property")?;
    let name = req_str(obj, "name")?;
    let ty = property::parse_type(req_str(obj, "type")?)?;
    let value = req(obj, "value")?;
    let corrupt = SaveFormatError::CorruptPropertyValue;

    let attr = match ty {
        AttributeType::String => Attribute::String(value.as_str().ok_or(corrupt)?.to_string()),
        AttributeType::Int => Attribute::Int(
            value
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .ok_or(corrupt)?,
        ),
        AttributeType::Float => Attribute::Float(value.as_f64().ok_or(corrupt)? as f32),
        AttributeType::Bool => Attribute::Bool(value.as_bool().ok_or(corrupt)?),
        AttributeType::Path => Attribute::Path(PathBuf::from(value.as_str().ok_or(corrupt)?)),
        AttributeType::Object => Attribute::Object(
            value
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .ok_or(corrupt)?,
        ),
        AttributeType::Color => Attribute::Color(property::parse_color(
            value.as_str().ok_or(corrupt)?,
            ColorFormat::Argb,
        )?),
    };
    Ok(ir::Property::new(name, attr))
}

/// Write a map and, when tilesets are externalized, their `.tsj` files
pub fn emit_map(map: &ir::Map, path: &Path, options: &WriteOptions) -> Result<()> {
    let files = render(map, path, options)?;
    write_files(&files)
}

/// Render every file a save produces, tilesets first and the map last
pub fn render(map: &ir::Map, path: &Path, options: &WriteOptions) -> Result<Vec<OutputFile>> {
    if map.has_components() {
        tracing::warn!(
            "TMJ cannot store components, component data is dropped from {:?}",
            path
        );
    }

    let mut files = Vec::new();
    let mut tilesets = Vec::new();
    let mut tileset_files = TilesetFiles::new(path, "tsj");
    for tileset_ref in &map.tilesets {
        let mut obj = JsonObject::new();
        obj.insert("firstgid".into(), json!(tileset_ref.first_tile_id));
        if options.tilesets.embeds(tileset_ref.embedded) {
            obj.extend(tileset_fields(&tileset_ref.tileset));
        } else {
            let (relative, full) = tileset_files.next(&tileset_ref.tileset.name);
            let mut doc = JsonObject::new();
            doc.insert("type".into(), json!("tileset"));
            doc.insert("version".into(), json!(FORMAT_VERSION));
            doc.insert("tiledversion".into(), json!(TILED_VERSION));
            doc.extend(tileset_fields(&tileset_ref.tileset));
            files.push(OutputFile {
                path: full,
                contents: to_text(&Value::Object(doc), options.indent)?,
            });
            obj.insert("source".into(), json!(relative));
        }
        tilesets.push(Value::Object(obj));
    }

    let mut root = JsonObject::new();
    root.insert("type".into(), json!("map"));
    root.insert("version".into(), json!(FORMAT_VERSION));
    root.insert("tiledversion".into(), json!(TILED_VERSION));
    root.insert("orientation".into(), json!("orthogonal"));
    root.insert("renderorder".into(), json!("right-down"));
    root.insert("infinite".into(), json!(false));
    root.insert("width".into(), json!(map.cols));
    root.insert("height".into(), json!(map.rows));
    root.insert("tilewidth".into(), json!(map.tile_width));
    root.insert("tileheight".into(), json!(map.tile_height));
    root.insert(
        "compressionlevel".into(),
        json!(map.tile_format.level().unwrap_or(-1)),
    );
    root.insert("nextlayerid".into(), json!(map.next_layer_id));
    root.insert("nextobjectid".into(), json!(map.next_object_id));
    insert_properties(&mut root, &map.properties);
    root.insert("tilesets".into(), Value::Array(tilesets));
    let layers = map
        .layers
        .iter()
        .map(|layer| layer_value(layer, &map.tile_format))
        .collect::<Result<Vec<_>>>()?;
    root.insert("layers".into(), Value::Array(layers));

    files.push(OutputFile {
        path: path.to_path_buf(),
        contents: to_text(&Value::Object(root), options.indent)?,
    });
    Ok(files)
}

fn to_text(value: &Value, indent: bool) -> Result<String> {
    let mut text = if indent {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    text.push('\n');
    Ok(text)
}

fn tileset_fields(tileset: &ir::Tileset) -> JsonObject {
    let mut obj = JsonObject::new();
    obj.insert("name".into(), json!(tileset.name));
    obj.insert("tilewidth".into(), json!(tileset.tile_width));
    obj.insert("tileheight".into(), json!(tileset.tile_height));
    obj.insert("tilecount".into(), json!(tileset.tile_count));
    obj.insert("columns".into(), json!(tileset.column_count));
    obj.insert("margin".into(), json!(0));
    obj.insert("spacing".into(), json!(0));
    obj.insert(
        "image".into(),
        json!(tileset.image_path.to_string_lossy().replace('\\', "/")),
    );
    obj.insert("imagewidth".into(), json!(tileset.image_width));
    obj.insert("imageheight".into(), json!(tileset.image_height));
    insert_properties(&mut obj, &tileset.properties);

    if !tileset.tiles.is_empty() {
        let tiles: Vec<Value> = tileset.tiles.iter().map(tile_value).collect();
        obj.insert("tiles".into(), Value::Array(tiles));
    }
    obj
}

fn tile_value(tile: &ir::Tile) -> Value {
    let mut obj = JsonObject::new();
    obj.insert("id".into(), json!(tile.id));
    if !tile.animation.is_empty() {
        let frames: Vec<Value> = tile
            .animation
            .iter()
            .map(|frame| json!({ "tileid": frame.tile, "duration": frame.duration_ms }))
            .collect();
        obj.insert("animation".into(), Value::Array(frames));
    }
    if !tile.objects.is_empty() {
        let objects: Vec<Value> = tile.objects.iter().map(object_value).collect();
        obj.insert(
            "objectgroup".into(),
            json!({
                "type": "objectgroup",
                "draworder": "index",
                "name": "",
                "opacity": 1,
                "visible": true,
                "x": 0,
                "y": 0,
                "objects": objects,
            }),
        );
    }
    insert_properties(&mut obj, &tile.properties);
    Value::Object(obj)
}

fn layer_value(layer: &ir::Layer, format: &TileFormat) -> Result<Value> {
    let mut obj = JsonObject::new();
    obj.insert("id".into(), json!(layer.id));
    obj.insert("name".into(), json!(layer.name));
    match &layer.kind {
        ir::LayerKind::Tile { rows, cols, data } => {
            obj.insert("type".into(), json!("tilelayer"));
            obj.insert("width".into(), json!(cols));
            obj.insert("height".into(), json!(rows));
            match format.encoding {
                TileEncoding::PlainText => {
                    obj.insert("data".into(), json!(data));
                }
                TileEncoding::Base64 => {
                    let compression = format.effective_compression();
                    obj.insert("encoding".into(), json!("base64"));
                    obj.insert("compression".into(), json!(compression_name(compression)));
                    let text = tile_codec::encode_base64(data, compression, format.level())?;
                    obj.insert("data".into(), json!(text));
                }
            }
        }
        ir::LayerKind::Object { objects } => {
            obj.insert("type".into(), json!("objectgroup"));
            obj.insert("draworder".into(), json!("topdown"));
            let objects: Vec<Value> = objects.iter().map(object_value).collect();
            obj.insert("objects".into(), Value::Array(objects));
        }
        ir::LayerKind::Group { layers } => {
            obj.insert("type".into(), json!("group"));
            let layers = layers
                .iter()
                .map(|child| layer_value(child, format))
                .collect::<Result<Vec<_>>>()?;
            obj.insert("layers".into(), Value::Array(layers));
        }
    }
    obj.insert("opacity".into(), float_value(layer.opacity));
    obj.insert("visible".into(), json!(layer.visible));
    obj.insert("x".into(), json!(0));
    obj.insert("y".into(), json!(0));
    insert_properties(&mut obj, &layer.properties);
    Ok(Value::Object(obj))
}

pub(crate) fn compression_name(mode: CompressionMode) -> &'static str {
    match mode {
        CompressionMode::None => "",
        CompressionMode::Zlib => "zlib",
        CompressionMode::Zstd => "zstd",
    }
}

fn object_value(object: &ir::Object) -> Value {
    let mut obj = JsonObject::new();
    obj.insert("id".into(), json!(object.id));
    obj.insert("name".into(), json!(object.name));
    obj.insert("type".into(), json!(object.tag));
    obj.insert("x".into(), float_value(object.x));
    obj.insert("y".into(), float_value(object.y));
    obj.insert("width".into(), float_value(object.width));
    obj.insert("height".into(), float_value(object.height));
    obj.insert("rotation".into(), json!(0));
    obj.insert("visible".into(), json!(object.visible));
    match object.kind {
        ObjectKind::Point => {
            obj.insert("point".into(), json!(true));
        }
        ObjectKind::Ellipse => {
            obj.insert("ellipse".into(), json!(true));
        }
        ObjectKind::Rect => {}
    }
    insert_properties(&mut obj, &object.properties);
    Value::Object(obj)
}

fn insert_properties(obj: &mut JsonObject, properties: &[ir::Property]) {
    if properties.is_empty() {
        return;
    }
    let values: Vec<Value> = properties.iter().map(property_value).collect();
    obj.insert("properties".into(), Value::Array(values));
}

fn property_value(prop: &ir::Property) -> Value {
    let value = match &prop.value {
        Attribute::Int(v) => json!(v),
        Attribute::Float(v) => float_value(*v),
        Attribute::Bool(v) => json!(v),
        Attribute::Object(v) => json!(v),
        other => json!(property::to_text(other, ColorFormat::Argb)),
    };
    json!({
        "name": prop.name,
        "type": prop.value.get_type().name(),
        "value": value,
    })
}

/// JSON number holding the shortest decimal form of an `f32`
fn float_value(value: f32) -> Value {
    let wide: f64 = property::float_text(value)
        .parse()
        .unwrap_or_else(|_| f64::from(value));
    serde_json::Number::from_f64(wide)
        .map(Value::Number)
        .unwrap_or_else(|| json!(0))
}

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a JsonObject> {
    value
        .as_object()
        .ok_or_else(|| SaveFormatError::BadFile(format!("{} is not a JSON object", what)))
}

fn req<'a>(obj: &'a JsonObject, key: &str) -> Result<&'a Value> {
    obj.get(key).ok_or_else(|| SaveFormatError::missing(key))
}

fn wrong_type(key: &str) -> SaveFormatError {
    SaveFormatError::BadFile(format!("'{}' has the wrong type", key))
}

fn req_str<'a>(obj: &'a JsonObject, key: &str) -> Result<&'a str> {
    req(obj, key)?.as_str().ok_or_else(|| wrong_type(key))
}

fn opt_str<'a>(obj: &'a JsonObject, key: &str) -> Result<Option<&'a str>> {
    obj.get(key)
        .map(|v| v.as_str().ok_or_else(|| wrong_type(key)))
        .transpose()
}

fn opt_bool(obj: &JsonObject, key: &str) -> Result<Option<bool>> {
    obj.get(key)
        .map(|v| v.as_bool().ok_or_else(|| wrong_type(key)))
        .transpose()
}

fn opt_i64(obj: &JsonObject, key: &str) -> Result<Option<i64>> {
    obj.get(key)
        .map(|v| v.as_i64().ok_or_else(|| wrong_type(key)))
        .transpose()
}

fn opt_i32(obj: &JsonObject, key: &str) -> Result<Option<i32>> {
    opt_i64(obj, key)?
        .map(|v| i32::try_from(v).map_err(|_| wrong_type(key)))
        .transpose()
}

fn req_i32(obj: &JsonObject, key: &str) -> Result<i32> {
    opt_i32(obj, key)?.ok_or_else(|| SaveFormatError::missing(key))
}

fn opt_u32(obj: &JsonObject, key: &str) -> Result<Option<u32>> {
    opt_i64(obj, key)?
        .map(|v| u32::try_from(v).map_err(|_| wrong_type(key)))
        .transpose()
}

fn req_u32(obj: &JsonObject, key: &str) -> Result<u32> {
    opt_u32(obj, key)?.ok_or_else(|| SaveFormatError::missing(key))
}

fn req_usize(obj: &JsonObject, key: &str) -> Result<usize> {
    let value = opt_i64(obj, key)?.ok_or_else(|| SaveFormatError::missing(key))?;
    usize::try_from(value)
        .ok()
        .filter(|&v| v > 0)
        .ok_or_else(|| wrong_type(key))
}

fn opt_f32(obj: &JsonObject, key: &str) -> Result<Option<f32>> {
    obj.get(key)
        .map(|v| v.as_f64().map(|f| f as f32).ok_or_else(|| wrong_type(key)))
        .transpose()
}

fn req_f32(obj: &JsonObject, key: &str) -> Result<f32> {
    opt_f32(obj, key)?.ok_or_else(|| SaveFormatError::missing(key))
}

fn opt_array<'a>(obj: &'a JsonObject, key: &str) -> Result<&'a [Value]> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(values)) => Ok(values),
        Some(_) => Err(wrong_type(key)),
    }
}

fn req_array<'a>(obj: &'a JsonObject, key: &str) -> Result<&'a [Value]> {
    req(obj, key)?
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| wrong_type(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::test_support::sample_map;
    use crate::options::TilesetStorage;
    use tilemap_core::{Color, GenericError};

    #[test]
    fn test_color_property_is_argb() {
        let value = json!({ "name": "hp", "type": "color", "value": "#FF0000FF" });
        let prop = parse_property(&value).unwrap();
        assert_eq!(prop.name, "hp");
        assert_eq!(prop.value, Attribute::Color(Color::rgba(0x00, 0x00, 0xFF, 0xFF)));

        let bad = json!({ "name": "hp", "type": "color", "value": "#ZZ" });
        assert_eq!(parse_property(&bad), Err(SaveFormatError::CorruptPropertyValue));
    }

    #[test]
    fn test_property_errors() {
        let untyped = json!({ "name": "hp", "value": 3 });
        assert_eq!(
            parse_property(&untyped),
            Err(SaveFormatError::MissingKey("type".into()))
        );
        let class = json!({ "name": "hp", "type": "class", "value": {} });
        assert_eq!(
            parse_property(&class),
            Err(SaveFormatError::UnsupportedPropertyType("class".into()))
        );
        let mismatched = json!({ "name": "hp", "type": "int", "value": "three" });
        assert_eq!(
            parse_property(&mismatched),
            Err(SaveFormatError::CorruptPropertyValue)
        );
    }

    fn minimal_map(layer: Value) -> String {
        json!({
            "width": 2, "height": 1, "tilewidth": 8, "tileheight": 8,
            "orientation": "orthogonal",
            "layers": [layer],
        })
        .to_string()
    }

    #[test]
    fn test_reader_errors() {
        let base = Path::new(".");
        let missing = json!({ "height": 1, "tilewidth": 8, "tileheight": 8, "layers": [] });
        assert_eq!(
            parse_map_str(&missing.to_string(), base),
            Err(SaveFormatError::MissingKey("width".into()))
        );

        let iso = json!({ "width": 1, "height": 1, "tilewidth": 8, "tileheight": 8,
            "orientation": "isometric", "layers": [] });
        assert_eq!(
            parse_map_str(&iso.to_string(), base),
            Err(SaveFormatError::UnsupportedOrientation("isometric".into()))
        );

        let image = json!({ "id": 1, "type": "imagelayer" });
        assert_eq!(
            parse_map_str(&minimal_map(image), base),
            Err(SaveFormatError::UnsupportedLayerType("imagelayer".into()))
        );

        let gzip = json!({ "id": 1, "type": "tilelayer", "width": 2, "height": 1,
            "encoding": "base64", "compression": "gzip", "data": "" });
        assert_eq!(
            parse_map_str(&minimal_map(gzip), base),
            Err(SaveFormatError::UnsupportedCompressionMode("gzip".into()))
        );

        let short = json!({ "id": 1, "type": "tilelayer", "width": 2, "height": 1, "data": [1] });
        assert_eq!(
            parse_map_str(&minimal_map(short), base),
            Err(SaveFormatError::BadTileLayerData)
        );

        let csv_zlib = json!({ "id": 1, "type": "tilelayer", "width": 2, "height": 1,
            "compression": "zlib", "data": [1, 2] });
        assert_eq!(
            parse_map_str(&minimal_map(csv_zlib), base),
            Err(SaveFormatError::BadCompressionMode)
        );

        let garbage = json!({ "id": 1, "type": "tilelayer", "width": 2, "height": 1,
            "encoding": "base64", "compression": "zstd", "data": "AAAAAAAAAAA=" });
        assert_eq!(
            parse_map_str(&minimal_map(garbage), base),
            Err(SaveFormatError::Generic(GenericError::CouldNotDecompress))
        );

        let hex = json!({ "id": 1, "type": "tilelayer", "width": 2, "height": 1,
            "encoding": "hex", "data": "" });
        assert_eq!(
            parse_map_str(&minimal_map(hex), base),
            Err(SaveFormatError::UnsupportedTileEncoding("hex".into()))
        );
    }

    #[test]
    fn test_ids_past_the_end_fail_to_load() {
        let base = Path::new(".");
        let layer = json!({ "id": 1, "type": "tilelayer", "width": 2, "height": 1,
            "data": [0, 0] });
        let mut doc: Value = serde_json::from_str(&minimal_map(layer)).unwrap();
        doc["tilesets"] = json!([{ "firstgid": i32::MAX, "name": "walls",
            "tilewidth": 8, "tileheight": 8, "tilecount": 4, "columns": 2,
            "image": "walls.png" }]);
        let source = parse_map_str(&doc.to_string(), base).unwrap();
        assert!(matches!(
            crate::map_from_ir(&source, "level"),
            Err(SaveFormatError::BadFile(_))
        ));

        let layer = json!({ "id": i32::MAX, "type": "objectgroup", "objects": [] });
        let source = parse_map_str(&minimal_map(layer), base).unwrap();
        assert!(matches!(
            crate::map_from_ir(&source, "level"),
            Err(SaveFormatError::BadFile(_))
        ));
    }

    #[test]
    fn test_mixed_tile_formats_keep_the_first() {
        let csv = json!({ "id": 1, "type": "tilelayer", "width": 2, "height": 1,
            "data": [1, 2] });
        let base64 = json!({ "id": 2, "type": "tilelayer", "width": 2, "height": 1,
            "encoding": "base64", "data": "AQAAAAIAAAA=" });
        let mut doc: Value = serde_json::from_str(&minimal_map(csv)).unwrap();
        doc["layers"].as_array_mut().unwrap().push(base64);

        let map = parse_map_str(&doc.to_string(), Path::new(".")).unwrap();
        assert_eq!(map.tile_format.encoding, TileEncoding::PlainText);
        for layer in &map.layers {
            let ir::LayerKind::Tile { data, .. } = &layer.kind else {
                panic!("expected a tile layer");
            };
            assert_eq!(data, &[1, 2]);
        }
    }

    #[test]
    fn test_round_trip_every_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.tmj");
        let options = WriteOptions::default();
        let encodings = [
            (TileEncoding::PlainText, CompressionMode::None),
            (TileEncoding::Base64, CompressionMode::None),
            (TileEncoding::Base64, CompressionMode::Zlib),
            (TileEncoding::Base64, CompressionMode::Zstd),
        ];
        for (encoding, compression) in encodings {
            let map = sample_map(encoding, compression);
            emit_map(&map, &path, &options).unwrap();
            let first = std::fs::read_to_string(&path).unwrap();

            let parsed = parse_map(&path, &ReadOptions::default()).unwrap();
            assert_eq!(parsed, map);

            emit_map(&parsed, &path, &options).unwrap();
            assert_eq!(std::fs::read_to_string(&path).unwrap(), first);
        }
    }

    #[test]
    fn test_external_tileset_written_beside_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.tmj");
        let options = WriteOptions {
            tilesets: TilesetStorage::ExternalizeAll,
            indent: false,
            fold_tile_data: false,
        };
        let map = sample_map(TileEncoding::PlainText, CompressionMode::None);
        emit_map(&map, &path, &options).unwrap();
        assert!(dir.path().join("terrain.tsj").exists());

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"source\":\"terrain.tsj\""));

        let parsed = parse_map(&path, &ReadOptions::default()).unwrap();
        assert!(!parsed.tilesets[0].embedded);
        assert_eq!(parsed.tilesets[0].tileset, map.tilesets[0].tileset);
    }

    #[test]
    fn test_same_named_external_tilesets_keep_both() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.tmj");
        let options = WriteOptions {
            tilesets: TilesetStorage::ExternalizeAll,
            indent: false,
            fold_tile_data: false,
        };
        let mut map = sample_map(TileEncoding::PlainText, CompressionMode::None);
        let mut second = map.tilesets[0].clone();
        second.first_tile_id = 9;
        second.tileset.tile_width = 8;
        map.tilesets.push(second);

        emit_map(&map, &path, &options).unwrap();
        assert!(dir.path().join("terrain.tsj").exists());
        assert!(dir.path().join("terrain-2.tsj").exists());

        let parsed = parse_map(&path, &ReadOptions::default()).unwrap();
        assert_eq!(parsed.tilesets.len(), 2);
        assert_eq!(parsed.tilesets[0].tileset.tile_width, map.tilesets[0].tileset.tile_width);
        assert_eq!(parsed.tilesets[1].tileset.tile_width, 8);
    }
}
