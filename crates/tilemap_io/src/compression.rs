//! zlib and zstd compression of tile data buffers

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use std::io::{Read, Write};
use tilemap_core::{CompressionMode, GenericError};

/// Default zstd level, matching the zstd library's own default
const ZSTD_DEFAULT_LEVEL: i32 = 3;

/// Compress a buffer. `level` of `None` (or `-1`) uses the codec default.
pub fn compress(
    data: &[u8],
    mode: CompressionMode,
    level: Option<i32>,
) -> Result<Vec<u8>, GenericError> {
    let level = level.filter(|&level| level >= 0);
    match mode {
        CompressionMode::None => Ok(data.to_vec()),
        CompressionMode::Zlib => {
            let compression = match level {
                Some(level) => flate2::Compression::new(level.clamp(0, 9) as u32),
                None => flate2::Compression::default(),
            };
            let mut encoder = ZlibEncoder::new(Vec::new(), compression);
            encoder
                .write_all(data)
                .and_then(|_| encoder.finish())
                .map_err(|e| {
                    tracing::error!("zlib compression failed: {}", e);
                    GenericError::CouldNotCompress
                })
        }
        CompressionMode::Zstd => {
            zstd::encode_all(data, level.unwrap_or(ZSTD_DEFAULT_LEVEL)).map_err(|e| {
                tracing::error!("zstd compression failed: {}", e);
                GenericError::CouldNotCompress
            })
        }
    }
}

/// Reverse [`compress`]
pub fn decompress(data: &[u8], mode: CompressionMode) -> Result<Vec<u8>, GenericError> {
    match mode {
        CompressionMode::None => Ok(data.to_vec()),
        CompressionMode::Zlib => {
            let mut out = Vec::new();
            ZlibDecoder::new(data).read_to_end(&mut out).map_err(|e| {
                tracing::warn!("zlib decompression failed: {}", e);
                GenericError::CouldNotDecompress
            })?;
            Ok(out)
        }
        CompressionMode::Zstd => zstd::decode_all(data).map_err(|e| {
            tracing::warn!("zstd decompression failed: {}", e);
            GenericError::CouldNotDecompress
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compressed_data_restores() {
        let data: Vec<u8> = (0..200u8).cycle().take(4000).collect();
        for mode in [CompressionMode::Zlib, CompressionMode::Zstd] {
            let packed = compress(&data, mode, None).unwrap();
            assert!(packed.len() < data.len());
            assert_eq!(decompress(&packed, mode).unwrap(), data);
        }
    }

    #[test]
    fn test_garbage_fails_to_decompress() {
        let garbage = b"definitely not compressed";
        assert_eq!(
            decompress(garbage, CompressionMode::Zlib),
            Err(GenericError::CouldNotDecompress)
        );
        assert_eq!(
            decompress(garbage, CompressionMode::Zstd),
            Err(GenericError::CouldNotDecompress)
        );
    }

    #[test]
    fn test_explicit_levels() {
        let data = vec![7u8; 1024];
        let fast = compress(&data, CompressionMode::Zlib, Some(1)).unwrap();
        assert_eq!(decompress(&fast, CompressionMode::Zlib).unwrap(), data);
        let zstd = compress(&data, CompressionMode::Zstd, Some(19)).unwrap();
        assert_eq!(decompress(&zstd, CompressionMode::Zstd).unwrap(), data);
    }
}
