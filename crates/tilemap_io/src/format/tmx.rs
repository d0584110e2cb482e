//! Tiled XML maps (`.tmx`) and tilesets (`.tsx`)

use super::property;
use super::tmj::{compression_name, parse_compression};
use super::xml::Element;
use super::{note_tile_format, write_files, OutputFile, TilesetFiles};
use crate::error::{Result, SaveFormatError};
use crate::fs;
use crate::ir;
use crate::options::{ReadOptions, WriteOptions};
use crate::tile_codec;
use std::path::{Path, PathBuf};
use tilemap_core::{
    Attribute, AttributeType, ColorFormat, CompressionMode, ObjectKind, TileEncoding, TileFormat,
    TileId,
};

const FORMAT_VERSION: &str = "1.10";
const TILED_VERSION: &str = "1.10.2";

/// Read a `.tmx` file and any external `.tsx` tilesets it references
pub fn parse_map(path: &Path, options: &ReadOptions) -> Result<ir::Map> {
    let text = fs::read_to_string(path)?;
    parse_map_str(&text, &options.base_dir_for(path))
}

pub fn parse_map_str(text: &str, base_dir: &Path) -> Result<ir::Map> {
    let root = Element::parse(text)?;
    if root.name != "map" {
        return Err(SaveFormatError::BadFile(format!(
            "expected <map>, found <{}>",
            root.name
        )));
    }
    if let Some(orientation) = root.get("orientation") {
        if orientation != "orthogonal" {
            return Err(SaveFormatError::UnsupportedOrientation(orientation.to_string()));
        }
    }
    if root.parse_opt::<i32>("infinite")? == Some(1) {
        tracing::warn!("Infinite maps are not supported");
        return Err(SaveFormatError::UnsupportedFormat);
    }

    let cols = parse_extent(&root, "width")?;
    let rows = parse_extent(&root, "height")?;
    let level = root.parse_opt::<i32>("compressionlevel")?.unwrap_or(-1);

    let mut tilesets = Vec::new();
    for element in root.all("tileset") {
        tilesets.push(parse_tileset_ref(element, base_dir)?);
    }

    let mut tile_format = None;
    let layers = parse_layers(&root, &mut tile_format)?;
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
        tile_width: root.parse_req("tilewidth")?,
        tile_height: root.parse_req("tileheight")?,
        tile_format,
        next_layer_id: root.parse_opt("nextlayerid")?.unwrap_or(1),
        next_object_id: root.parse_opt("nextobjectid")?.unwrap_or(1),
        component_definitions: Vec::new(),
        tilesets,
        layers,
        properties: parse_properties(&root)?,
        components: Vec::new(),
    })
}

fn parse_extent(element: &Element, key: &str) -> Result<usize> {
    let value: usize = element.parse_req(key)?;
    if value == 0 {
        return Err(SaveFormatError::BadFile(format!("'{}' must be positive", key)));
    }
    Ok(value)
}

fn parse_tileset_ref(element: &Element, base_dir: &Path) -> Result<ir::TilesetRef> {
    let first_tile_id = element.parse_req("firstgid")?;
    match element.get("source") {
        Some(source) => {
            let path = base_dir.join(source);
            let text = fs::read_to_string(&path)?;
            let root = Element::parse(&text)?;
            if root.name != "tileset" {
                return Err(SaveFormatError::BadFile(format!(
                    "{:?} is not a tileset",
                    path
                )));
            }
            Ok(ir::TilesetRef {
                first_tile_id,
                embedded: false,
                tileset: parse_tileset(&root)?,
            })
        }
        None => Ok(ir::TilesetRef {
            first_tile_id,
            embedded: true,
            tileset: parse_tileset(element)?,
        }),
    }
}

fn parse_tileset(element: &Element) -> Result<ir::Tileset> {
    let image = element
        .first("image")
        .ok_or_else(|| SaveFormatError::missing("image"))?;

    let mut tiles = Vec::new();
    for tile in element.all("tile") {
        let mut animation = Vec::new();
        if let Some(frames) = tile.first("animation") {
            for frame in frames.all("frame") {
                animation.push(ir::Frame {
                    tile: frame.parse_req("tileid")?,
                    duration_ms: frame.parse_req("duration")?,
                });
            }
        }
        let mut objects = Vec::new();
        if let Some(group) = tile.first("objectgroup") {
            for object in group.all("object") {
                objects.push(parse_object(object)?);
            }
        }
        tiles.push(ir::Tile {
            id: tile.parse_req("id")?,
            animation,
            objects,
            properties: parse_properties(tile)?,
            components: Vec::new(),
        });
    }

    Ok(ir::Tileset {
        name: element.req("name")?.to_string(),
        tile_width: element.parse_req("tilewidth")?,
        tile_height: element.parse_req("tileheight")?,
        tile_count: element.parse_req("tilecount")?,
        column_count: element.parse_req("columns")?,
        image_path: PathBuf::from(image.req("source")?),
        image_width: image.parse_opt("width")?.unwrap_or(0),
        image_height: image.parse_opt("height")?.unwrap_or(0),
        tiles,
        properties: parse_properties(element)?,
        components: Vec::new(),
    })
}

fn parse_layers(parent: &Element, tile_format: &mut Option<TileFormat>) -> Result<Vec<ir::Layer>> {
    let mut layers = Vec::new();
    for child in &parent.children {
        let kind = match child.name.as_str() {
            "layer" => {
                let cols = parse_extent(child, "width")?;
                let rows = parse_extent(child, "height")?;
                let (data, format) = parse_tile_data(child, rows * cols)?;
                note_tile_format(tile_format, child.get("name").unwrap_or_default(), format);
                ir::LayerKind::Tile { rows, cols, data }
            }
            "objectgroup" => {
                let mut objects = Vec::new();
                for object in child.all("object") {
                    objects.push(parse_object(object)?);
                }
                ir::LayerKind::Object { objects }
            }
            "group" => ir::LayerKind::Group {
                layers: parse_layers(child, tile_format)?,
            },
            "imagelayer" => {
                return Err(SaveFormatError::UnsupportedLayerType("imagelayer".into()));
            }
            _ => continue,
        };
        layers.push(ir::Layer {
            id: child.parse_req("id")?,
            name: child.get("name").unwrap_or_default().to_string(),
            opacity: child.parse_opt("opacity")?.unwrap_or(1.0),
            visible: child.parse_opt::<i32>("visible")?.unwrap_or(1) != 0,
            properties: parse_properties(child)?,
            components: Vec::new(),
            kind,
        });
    }
    Ok(layers)
}

fn parse_tile_data(layer: &Element, expected: usize) -> Result<(Vec<TileId>, TileFormat)> {
    let data = layer
        .first("data")
        .ok_or_else(|| SaveFormatError::missing("data"))?;
    let compression = parse_compression(data.get("compression").unwrap_or(""))?;
    let plain = TileFormat::default();

    match data.get("encoding") {
        None => {
            if compression != CompressionMode::None {
                return Err(SaveFormatError::BadCompressionMode);
            }
            let tiles = data
                .all("tile")
                .map(|tile| tile.parse_opt::<i64>("gid").map(|gid| gid.unwrap_or(0) as TileId))
                .collect::<Result<Vec<_>>>()
                .map_err(|_| SaveFormatError::BadTileLayerData)?;
            if tiles.len() != expected {
                return Err(SaveFormatError::BadTileLayerData);
            }
            Ok((tiles, plain))
        }
        Some("csv") => {
            if compression != CompressionMode::None {
                return Err(SaveFormatError::BadCompressionMode);
            }
            Ok((tile_codec::decode_csv(&data.text, expected)?, plain))
        }
        Some("base64") => {
            let tiles = tile_codec::decode_base64(&data.text, compression, expected)?;
            let format = TileFormat {
                encoding: TileEncoding::Base64,
                compression,
                ..TileFormat::default()
            };
            Ok((tiles, format))
        }
        Some(other) => Err(SaveFormatError::UnsupportedTileEncoding(other.to_string())),
    }
}

fn parse_object(element: &Element) -> Result<ir::Object> {
    for shape in ["polygon", "polyline", "text"] {
        if element.first(shape).is_some() {
            return Err(SaveFormatError::BadFile(format!(
                "{} objects are not supported",
                shape
            )));
        }
    }
    let kind = if element.first("point").is_some() {
        ObjectKind::Point
    } else if element.first("ellipse").is_some() {
        ObjectKind::Ellipse
    } else {
        ObjectKind::Rect
    };
    let tag = element
        .get("type")
        .or_else(|| element.get("class"))
        .unwrap_or_default();

    Ok(ir::Object {
        id: element.parse_req("id")?,
        kind,
        name: element.get("name").unwrap_or_default().to_string(),
        tag: tag.to_string(),
        visible: element.parse_opt::<i32>("visible")?.unwrap_or(1) != 0,
        x: element.parse_req("x")?,
        y: element.parse_req("y")?,
        width: element.parse_opt("width")?.unwrap_or(0.0),
        height: element.parse_opt("height")?.unwrap_or(0.0),
        properties: parse_properties(element)?,
        components: Vec::new(),
    })
}

fn parse_properties(element: &Element) -> Result<Vec<ir::Property>> {
    let Some(properties) = element.first("properties") else {
        return Ok(Vec::new());
    };
    properties.all("property").map(parse_property).collect()
}

/// Parse one `<property>`; a missing `type` means string
fn parse_property(element: &Element) -> Result<ir::Property> {
    let name = element.req("name")?;
    let ty = match element.get("type") {
        Some(ty) => property::parse_type(ty)?,
        None => AttributeType::String,
    };
    let text = element.get("value").unwrap_or(element.text.as_str());
    let value = property::parse_text(ty, text, ColorFormat::Argb)?;
    Ok(ir::Property::new(name, value))
}

/// Write a map and, when tilesets are externalized, their `.tsx` files
pub fn emit_map(map: &ir::Map, path: &Path, options: &WriteOptions) -> Result<()> {
    let files = render(map, path, options)?;
    write_files(&files)
}

/// Render every file a save produces, tilesets first and the map last
pub fn render(map: &ir::Map, path: &Path, options: &WriteOptions) -> Result<Vec<OutputFile>> {
    if map.has_components() {
        tracing::warn!(
            "TMX cannot store components, component data is dropped from {:?}",
            path
        );
    }

    let mut root = Element::new("map")
        .attr("version", FORMAT_VERSION)
        .attr("tiledversion", TILED_VERSION)
        .attr("orientation", "orthogonal")
        .attr("renderorder", "right-down")
        .attr("width", map.cols)
        .attr("height", map.rows)
        .attr("tilewidth", map.tile_width)
        .attr("tileheight", map.tile_height)
        .attr("infinite", 0)
        .attr("nextlayerid", map.next_layer_id)
        .attr("nextobjectid", map.next_object_id);
    if let Some(level) = map.tile_format.level() {
        root.push_attr("compressionlevel", level);
    }
    push_properties(&mut root, &map.properties);

    let mut files = Vec::new();
    let mut tileset_files = TilesetFiles::new(path, "tsx");
    for tileset_ref in &map.tilesets {
        let tileset = &tileset_ref.tileset;
        let element = if options.tilesets.embeds(tileset_ref.embedded) {
            let mut element = Element::new("tileset").attr("firstgid", tileset_ref.first_tile_id);
            write_tileset_fields(&mut element, tileset);
            element
        } else {
            let (relative, full) = tileset_files.next(&tileset.name);
            let mut doc = Element::new("tileset")
                .attr("version", FORMAT_VERSION)
                .attr("tiledversion", TILED_VERSION);
            write_tileset_fields(&mut doc, tileset);
            files.push(OutputFile {
                path: full,
                contents: doc.to_document(options.indent)?,
            });
            Element::new("tileset")
                .attr("firstgid", tileset_ref.first_tile_id)
                .attr("source", relative)
        };
        root.children.push(element);
    }

    for layer in &map.layers {
        root.children.push(layer_element(layer, &map.tile_format)?);
    }

    files.push(OutputFile {
        path: path.to_path_buf(),
        contents: root.to_document(options.indent)?,
    });
    Ok(files)
}

fn write_tileset_fields(element: &mut Element, tileset: &ir::Tileset) {
    element.push_attr("name", &tileset.name);
    element.push_attr("tilewidth", tileset.tile_width);
    element.push_attr("tileheight", tileset.tile_height);
    element.push_attr("tilecount", tileset.tile_count);
    element.push_attr("columns", tileset.column_count);
    push_properties(element, &tileset.properties);
    element.children.push(
        Element::new("image")
            .attr("source", tileset.image_path.to_string_lossy().replace('\\', "/"))
            .attr("width", tileset.image_width)
            .attr("height", tileset.image_height),
    );

    for tile in &tileset.tiles {
        let mut tile_element = Element::new("tile").attr("id", tile.id);
        push_properties(&mut tile_element, &tile.properties);
        if !tile.objects.is_empty() {
            let mut group = Element::new("objectgroup").attr("draworder", "index");
            for object in &tile.objects {
                group.children.push(object_element(object));
            }
            tile_element.children.push(group);
        }
        if !tile.animation.is_empty() {
            let mut animation = Element::new("animation");
            for frame in &tile.animation {
                animation.children.push(
                    Element::new("frame")
                        .attr("tileid", frame.tile)
                        .attr("duration", frame.duration_ms),
                );
            }
            tile_element.children.push(animation);
        }
        element.children.push(tile_element);
    }
}

fn layer_element(layer: &ir::Layer, format: &TileFormat) -> Result<Element> {
    let tag = match layer.kind {
        ir::LayerKind::Tile { .. } => "layer",
        ir::LayerKind::Object { .. } => "objectgroup",
        ir::LayerKind::Group { .. } => "group",
    };
    let mut element = Element::new(tag)
        .attr("id", layer.id)
        .attr("name", &layer.name);
    if let ir::LayerKind::Tile { rows, cols, .. } = &layer.kind {
        element.push_attr("width", cols);
        element.push_attr("height", rows);
    }
    if layer.opacity != 1.0 {
        element.push_attr("opacity", property::float_text(layer.opacity));
    }
    if !layer.visible {
        element.push_attr("visible", 0);
    }
    push_properties(&mut element, &layer.properties);

    match &layer.kind {
        ir::LayerKind::Tile { cols, data, .. } => {
            let mut data_element = Element::new("data");
            match format.encoding {
                TileEncoding::PlainText => {
                    data_element.push_attr("encoding", "csv");
                    data_element.text = tile_codec::encode_csv(data, *cols);
                }
                TileEncoding::Base64 => {
                    let compression = format.effective_compression();
                    data_element.push_attr("encoding", "base64");
                    if compression != CompressionMode::None {
                        data_element.push_attr("compression", compression_name(compression));
                    }
                    data_element.text = format!(
                        "\n{}\n",
                        tile_codec::encode_base64(data, compression, format.level())?
                    );
                }
            }
            element.children.push(data_element);
        }
        ir::LayerKind::Object { objects } => {
            for object in objects {
                element.children.push(object_element(object));
            }
        }
        ir::LayerKind::Group { layers } => {
            for child in layers {
                element.children.push(layer_element(child, format)?);
            }
        }
    }
    Ok(element)
}

fn object_element(object: &ir::Object) -> Element {
    let mut element = Element::new("object").attr("id", object.id);
    if !object.name.is_empty() {
        element.push_attr("name", &object.name);
    }
    if !object.tag.is_empty() {
        element.push_attr("type", &object.tag);
    }
    element.push_attr("x", property::float_text(object.x));
    element.push_attr("y", property::float_text(object.y));
    if object.width != 0.0 {
        element.push_attr("width", property::float_text(object.width));
    }
    if object.height != 0.0 {
        element.push_attr("height", property::float_text(object.height));
    }
    if !object.visible {
        element.push_attr("visible", 0);
    }
    push_properties(&mut element, &object.properties);
    match object.kind {
        ObjectKind::Point => element.children.push(Element::new("point")),
        ObjectKind::Ellipse => element.children.push(Element::new("ellipse")),
        ObjectKind::Rect => {}
    }
    element
}

fn push_properties(element: &mut Element, properties: &[ir::Property]) {
    if properties.is_empty() {
        return;
    }
    let mut list = Element::new("properties");
    for prop in properties {
        let mut child = Element::new("property").attr("name", &prop.name);
        if !matches!(prop.value, Attribute::String(_)) {
            child.push_attr("type", prop.value.get_type().name());
        }
        child.push_attr("value", property::to_text(&prop.value, ColorFormat::Argb));
        list.children.push(child);
    }
    element.children.push(list);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::test_support::sample_map;
    use crate::options::TilesetStorage;
    use tilemap_core::Color;

    const XML_LAYER_MAP: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" width="2" height="2" tilewidth="16" tileheight="16" nextlayerid="2" nextobjectid="1">
 <properties>
  <property name="title" value="Cave"/>
  <property name="tint" type="color" value="#ff102030"/>
  <property name="notes">multi
line</property>
 </properties>
 <layer id="1" name="Tiles" width="2" height="2">
  <data>
   <tile gid="1"/>
   <tile/>
   <tile gid="3"/>
   <tile gid="4"/>
  </data>
 </layer>
</map>
"##;

    #[test]
    fn test_verbose_tile_data_and_untyped_properties() {
        let map = parse_map_str(XML_LAYER_MAP, Path::new(".")).unwrap();
        let ir::LayerKind::Tile { data, .. } = &map.layers[0].kind else {
            panic!("expected a tile layer");
        };
        assert_eq!(data, &vec![1, 0, 3, 4]);
        assert_eq!(map.tile_format, TileFormat::default());
        assert_eq!(map.properties[0].value, Attribute::from("Cave"));
        assert_eq!(
            map.properties[1].value,
            Attribute::Color(Color::rgba(0x10, 0x20, 0x30, 0xFF))
        );
        assert_eq!(map.properties[2].value, Attribute::from("multi\nline"));
    }

    #[test]
    fn test_reader_errors() {
        let base = Path::new(".");
        let bad_color = XML_LAYER_MAP.replace("#ff102030", "#ff1");
        assert_eq!(
            parse_map_str(&bad_color, base),
            Err(SaveFormatError::CorruptPropertyValue)
        );
        let bad_digit = XML_LAYER_MAP.replace("#ff102030", "#ffxx2030");
        assert_eq!(
            parse_map_str(&bad_digit, base),
            Err(SaveFormatError::BadColorProperty)
        );
        let hexagonal = XML_LAYER_MAP.replace("orthogonal", "hexagonal");
        assert_eq!(
            parse_map_str(&hexagonal, base),
            Err(SaveFormatError::UnsupportedOrientation("hexagonal".into()))
        );
        let short = XML_LAYER_MAP.replace("<tile gid=\"4\"/>", "");
        assert_eq!(
            parse_map_str(&short, base),
            Err(SaveFormatError::BadTileLayerData)
        );
        let no_width = XML_LAYER_MAP.replace(
            " width=\"2\" height=\"2\" tilewidth",
            " height=\"2\" tilewidth",
        );
        assert_eq!(
            parse_map_str(&no_width, base),
            Err(SaveFormatError::MissingKey("width".into()))
        );
        let gzip =
            XML_LAYER_MAP.replace("<data>", "<data encoding=\"base64\" compression=\"gzip\">");
        assert_eq!(
            parse_map_str(&gzip, base),
            Err(SaveFormatError::UnsupportedCompressionMode("gzip".into()))
        );
        let csv_zstd =
            XML_LAYER_MAP.replace("<data>", "<data encoding=\"csv\" compression=\"zstd\">");
        assert_eq!(
            parse_map_str(&csv_zstd, base),
            Err(SaveFormatError::BadCompressionMode)
        );
    }

    #[test]
    fn test_round_trip_every_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.tmx");
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
    fn test_external_tileset_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.tmx");
        let options = WriteOptions {
            tilesets: TilesetStorage::ExternalizeAll,
            ..WriteOptions::default()
        };
        let mut map = sample_map(TileEncoding::Base64, CompressionMode::Zlib);
        map.tile_format.zlib_level = Some(9);
        emit_map(&map, &path, &options).unwrap();
        assert!(dir.path().join("terrain.tsx").exists());

        let parsed = parse_map(&path, &ReadOptions::default()).unwrap();
        assert_eq!(parsed.tile_format.zlib_level, Some(9));
        assert!(!parsed.tilesets[0].embedded);
        assert_eq!(parsed.tilesets[0].tileset, map.tilesets[0].tileset);
    }
}
