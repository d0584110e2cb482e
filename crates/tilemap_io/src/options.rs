//! Options controlling how map files are read and written

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Directory external tileset paths are resolved against.
    /// Defaults to the directory of the map file.
    pub base_dir: Option<PathBuf>,
}

impl ReadOptions {
    pub(crate) fn base_dir_for(&self, map_path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(dir) => dir.clone(),
            None => map_path.parent().map(Path::to_path_buf).unwrap_or_default(),
        }
    }
}

/// Where tilesets end up when a map is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum TilesetStorage {
    /// Respect each tileset's own embedded flag
    #[default]
    AsAttached,
    /// Write every tileset inline
    EmbedAll,
    /// Write every tileset to its own file next to the map
    ExternalizeAll,
}

impl TilesetStorage {
    pub(crate) fn embeds(&self, embedded: bool) -> bool {
        match self {
            TilesetStorage::AsAttached => embedded,
            TilesetStorage::EmbedAll => true,
            TilesetStorage::ExternalizeAll => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    pub tilesets: TilesetStorage,
    /// Pretty-print output (YAML is always indented)
    pub indent: bool,
    /// Write plain-text tile rows as aligned lines (YAML)
    pub fold_tile_data: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            tilesets: TilesetStorage::default(),
            indent: true,
            fold_tile_data: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_dir_defaults_to_map_directory() {
        let options = ReadOptions::default();
        assert_eq!(
            options.base_dir_for(Path::new("maps/level1.tmj")),
            PathBuf::from("maps")
        );

        let options = ReadOptions {
            base_dir: Some(PathBuf::from("assets")),
        };
        assert_eq!(
            options.base_dir_for(Path::new("maps/level1.tmj")),
            PathBuf::from("assets")
        );
    }

    #[test]
    fn test_storage_modes() {
        assert!(TilesetStorage::AsAttached.embeds(true));
        assert!(!TilesetStorage::AsAttached.embeds(false));
        assert!(TilesetStorage::EmbedAll.embeds(false));
        assert!(!TilesetStorage::ExternalizeAll.embeds(true));
    }
}
