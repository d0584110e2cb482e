//! Editor settings and their file in the platform config directory

use crate::commands::DEFAULT_CAPACITY;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tilemap_core::{TileFormat, TileSize};
use tilemap_io::{SaveFormat, TilesetStorage, WriteOptions};

const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Serialize error: {0}")]
    SerializeError(String),
    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// User-level editor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bevy", derive(bevy::prelude::Resource))]
#[serde(default)]
pub struct EditorSettings {
    /// Undo steps kept per document
    pub command_capacity: usize,
    pub tileset_storage: TilesetStorage,
    pub indent_output: bool,
    /// Write plain-text tile rows as aligned lines
    pub fold_tile_data: bool,
    /// Tile format given to new maps
    pub tile_format: TileFormat,
    pub tile_size: TileSize,
    pub save_format: SaveFormat,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            command_capacity: DEFAULT_CAPACITY,
            tileset_storage: TilesetStorage::default(),
            indent_output: true,
            fold_tile_data: true,
            tile_format: TileFormat::default(),
            tile_size: TileSize::default(),
            save_format: SaveFormat::default(),
        }
    }
}

impl EditorSettings {
    /// Get the config directory path for the editor
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("com", "tilemap", "tilemap_editor")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join(SETTINGS_FILE))
    }

    /// Load settings from the config directory, returning defaults on any failure
    pub fn load() -> Self {
        let loaded = Self::settings_path()
            .ok_or(SettingsError::NoConfigDir)
            .and_then(|path| Self::load_from(&path));
        match loaded {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Could not load settings: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Load settings from a file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| SettingsError::IoError(e.to_string()))?;

        serde_json::from_str(&content).map_err(|e| SettingsError::ParseError(e.to_string()))
    }

    /// Save settings to the config directory
    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::settings_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| SettingsError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| SettingsError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| SettingsError::IoError(e.to_string()))?;

        tracing::info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Options for writing map files with these settings
    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            tilesets: self.tileset_storage,
            indent: self.indent_output,
            fold_tile_data: self.fold_tile_data,
        }
    }
}
