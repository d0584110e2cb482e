//! Decoded tileset textures

use crate::error::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tilemap_core::{GenericError, Map};

/// RGBA8 pixel data of one image file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA bytes, `width * height * 4` long
    pub pixels: Vec<u8>,
}

/// Produces pixel buffers for tileset images
pub trait TextureLoader {
    fn load(&mut self, path: &Path) -> Result<Arc<Texture>>;
}

/// Loads textures with the `image` crate and keeps each decoded file
#[derive(Debug, Default)]
pub struct ImageTextureLoader {
    cache: HashMap<PathBuf, Arc<Texture>>,
}

impl ImageTextureLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

impl TextureLoader for ImageTextureLoader {
    fn load(&mut self, path: &Path) -> Result<Arc<Texture>> {
        if let Some(texture) = self.cache.get(path) {
            return Ok(Arc::clone(texture));
        }

        let image = image::open(path).map_err(|e| {
            tracing::warn!("Failed to load texture {:?}: {}", path, e);
            match e {
                image::ImageError::IoError(io) => GenericError::from(io),
                image::ImageError::Unsupported(_) => GenericError::NotSupported,
                _ => GenericError::BadFileStream,
            }
        })?;
        let rgba = image.to_rgba8();
        let texture = Arc::new(Texture {
            path: path.to_path_buf(),
            width: rgba.width(),
            height: rgba.height(),
            pixels: rgba.into_raw(),
        });
        tracing::debug!(
            "Loaded texture {:?} ({}x{})",
            path,
            texture.width,
            texture.height
        );
        self.cache.insert(path.to_path_buf(), Arc::clone(&texture));
        Ok(texture)
    }
}

/// Load every tileset image of `map`, relative paths resolved against `base_dir`
///
/// Tilesets whose stored texture size is unknown (zero) take the decoded size.
/// Returns the textures keyed by tileset uuid.
pub fn resolve_textures(
    map: &mut Map,
    base_dir: &Path,
    loader: &mut dyn TextureLoader,
) -> Result<HashMap<uuid::Uuid, Arc<Texture>>> {
    let ids: Vec<uuid::Uuid> = map.tilesets().iter().map(|t| t.id()).collect();
    let mut textures = HashMap::new();
    for id in ids {
        let Some(attached) = map.tileset_mut(id) else {
            continue;
        };
        let tileset = &mut attached.tileset;
        let texture = loader.load(&base_dir.join(&tileset.texture.path))?;
        if tileset.texture.width == 0 || tileset.texture.height == 0 {
            tileset.texture.width = texture.width;
            tileset.texture.height = texture.height;
        }
        textures.insert(id, texture);
    }
    Ok(textures)
}
