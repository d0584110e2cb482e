//! Text encodings of tile layer data
//!
//! Tile ids are stored row-major. Linear index `i` is the cell at row
//! `i / cols`, column `i % cols`.

use crate::compression;
use crate::error::{Result, SaveFormatError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tilemap_core::{CompressionMode, TileId};

/// Base64 of little-endian `i32` ids, compressed first when `compression` is set
pub fn encode_base64(
    tiles: &[TileId],
    compression: CompressionMode,
    level: Option<i32>,
) -> Result<String> {
    let bytes: Vec<u8> = tiles.iter().flat_map(|id| id.to_le_bytes()).collect();
    let packed = compression::compress(&bytes, compression, level)?;
    Ok(STANDARD.encode(packed))
}

/// Reverse [`encode_base64`], requiring exactly `expected` tiles
pub fn decode_base64(
    text: &str,
    compression: CompressionMode,
    expected: usize,
) -> Result<Vec<TileId>> {
    let cleaned: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let packed = STANDARD.decode(cleaned).map_err(|e| {
        tracing::warn!("Tile data is not valid base64: {}", e);
        SaveFormatError::BadTileLayerData
    })?;
    let bytes = compression::decompress(&packed, compression)?;
    if bytes.len() != expected * 4 {
        tracing::warn!(
            "Tile data holds {} bytes, expected {}",
            bytes.len(),
            expected * 4
        );
        return Err(SaveFormatError::BadTileLayerData);
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| TileId::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Comma separated ids, one row per line
pub fn encode_csv(tiles: &[TileId], cols: usize) -> String {
    let rows: Vec<String> = tiles
        .chunks(cols.max(1))
        .map(|row| {
            row.iter()
                .map(TileId::to_string)
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect();
    format!("\n{}\n", rows.join(",\n"))
}

pub fn decode_csv(text: &str, expected: usize) -> Result<Vec<TileId>> {
    let tiles = text
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(parse_tile)
        .collect::<Result<Vec<_>>>()?;
    check_count(tiles, expected)
}

/// Space separated ids
///
/// With `fold`, every row goes on its own line and columns are right-aligned
/// to the widest id in the layer.
pub fn encode_plain(tiles: &[TileId], cols: usize, fold: bool) -> String {
    if !fold {
        return tiles
            .iter()
            .map(TileId::to_string)
            .collect::<Vec<_>>()
            .join(" ");
    }
    let width = tiles
        .iter()
        .map(|id| id.to_string().len())
        .max()
        .unwrap_or(1);
    let mut out = String::new();
    for row in tiles.chunks(cols.max(1)) {
        let line: Vec<String> = row.iter().map(|id| format!("{:>width$}", id)).collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }
    out
}

pub fn decode_plain(text: &str, expected: usize) -> Result<Vec<TileId>> {
    let tiles = text
        .split_ascii_whitespace()
        .map(parse_tile)
        .collect::<Result<Vec<_>>>()?;
    check_count(tiles, expected)
}

fn parse_tile(token: &str) -> Result<TileId> {
    // Tiled writes ids with flip flags as unsigned values above i32::MAX
    token
        .parse::<TileId>()
        .or_else(|_| token.parse::<u32>().map(|id| id as TileId))
        .map_err(|_| SaveFormatError::BadTileLayerData)
}

fn check_count(tiles: Vec<TileId>, expected: usize) -> Result<Vec<TileId>> {
    if tiles.len() != expected {
        tracing::warn!("Tile data holds {} ids, expected {}", tiles.len(), expected);
        return Err(SaveFormatError::BadTileLayerData);
    }
    Ok(tiles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilemap_core::GenericError;

    const TILES: [TileId; 6] = [1, 0, 12, 3, 0, 250];

    #[test]
    fn test_base64_layout_is_little_endian() {
        let text = encode_base64(&[1, 256], CompressionMode::None, None).unwrap();
        assert_eq!(text, "AQAAAAABAAA=");
        assert_eq!(
            decode_base64(&text, CompressionMode::None, 2).unwrap(),
            vec![1, 256]
        );
    }

    #[test]
    fn test_base64_with_compression() {
        for mode in [CompressionMode::Zlib, CompressionMode::Zstd] {
            let text = encode_base64(&TILES, mode, None).unwrap();
            assert_eq!(decode_base64(&text, mode, 6).unwrap(), TILES.to_vec());
        }
    }

    #[test]
    fn test_base64_errors() {
        assert_eq!(
            decode_base64("!!not base64!!", CompressionMode::None, 1),
            Err(SaveFormatError::BadTileLayerData)
        );
        let text = encode_base64(&TILES, CompressionMode::None, None).unwrap();
        assert_eq!(
            decode_base64(&text, CompressionMode::None, 5),
            Err(SaveFormatError::BadTileLayerData)
        );
        assert_eq!(
            decode_base64(&text, CompressionMode::Zlib, 6),
            Err(SaveFormatError::Generic(GenericError::CouldNotDecompress))
        );
    }

    #[test]
    fn test_csv() {
        let text = encode_csv(&TILES, 3);
        assert_eq!(text, "\n1,0,12,\n3,0,250\n");
        assert_eq!(decode_csv(&text, 6).unwrap(), TILES.to_vec());
        assert_eq!(decode_csv("1,x,3", 3), Err(SaveFormatError::BadTileLayerData));
    }

    #[test]
    fn test_plain_folded() {
        let text = encode_plain(&TILES, 3, true);
        assert_eq!(text, "  1   0  12\n  3   0 250\n");
        assert_eq!(decode_plain(&text, 6).unwrap(), TILES.to_vec());
        assert_eq!(encode_plain(&TILES, 3, false), "1 0 12 3 0 250");
        assert_eq!(decode_plain("1 2", 3), Err(SaveFormatError::BadTileLayerData));
    }

    #[test]
    fn test_flipped_ids_parse() {
        assert_eq!(decode_csv("2147483649", 1).unwrap(), vec![i32::MIN + 1]);
    }
}
