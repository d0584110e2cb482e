//! Shared editor services passed down to tools and documents

use crate::commands::CommandKind;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StringsError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Random source and user-facing text, created once at startup
#[derive(Debug, Clone)]
pub struct EditorContext {
    pub rng: fastrand::Rng,
    pub strings: Strings,
}

impl Default for EditorContext {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorContext {
    pub fn new() -> Self {
        Self {
            rng: fastrand::Rng::new(),
            strings: Strings::default(),
        }
    }

    /// A context with a deterministic rng, for reproducible tool output
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
            strings: Strings::default(),
        }
    }
}

/// Undo/redo labels per command kind
///
/// English labels are built in; a JSON object of `{"Kind": "label"}` pairs
/// overrides any of them.
#[derive(Debug, Clone, Default)]
pub struct Strings {
    overrides: HashMap<CommandKind, String>,
}

impl Strings {
    pub fn from_json(json: &str) -> Result<Self, StringsError> {
        let mut strings = Self::default();
        strings.merge_json(json)?;
        Ok(strings)
    }

    pub fn load(path: &Path) -> Result<Self, StringsError> {
        let content = std::fs::read_to_string(path)?;
        let strings = Self::from_json(&content)?;
        tracing::info!("Loaded {} labels from {:?}", strings.overrides.len(), path);
        Ok(strings)
    }

    /// Add the labels in `json`, replacing any already set
    pub fn merge_json(&mut self, json: &str) -> Result<(), StringsError> {
        let labels: HashMap<CommandKind, String> = serde_json::from_str(json)?;
        self.overrides.extend(labels);
        Ok(())
    }

    pub fn set(&mut self, kind: CommandKind, label: impl Into<String>) {
        self.overrides.insert(kind, label.into());
    }

    pub fn command_label(&self, kind: CommandKind) -> &str {
        self.overrides
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| default_label(kind))
    }
}

fn default_label(kind: CommandKind) -> &'static str {
    use CommandKind as K;
    match kind {
        K::CreateLayer => "Create Layer",
        K::RemoveLayer => "Remove Layer",
        K::DuplicateLayer => "Duplicate Layer",
        K::RenameLayer => "Rename Layer",
        K::SetLayerOpacity => "Change Layer Opacity",
        K::SetLayerVisible => "Toggle Layer Visibility",
        K::MoveLayerUp => "Move Layer Up",
        K::MoveLayerDown => "Move Layer Down",
        K::AddRow => "Add Row",
        K::AddColumn => "Add Column",
        K::RemoveRow => "Remove Row",
        K::RemoveColumn => "Remove Column",
        K::ResizeMap => "Resize Map",
        K::SetTileFormat => "Change Tile Format",
        K::SetTiles => "Paint Tiles",
        K::BucketFill => "Bucket Fill",
        K::CreateTileset => "Add Tileset",
        K::RemoveTileset => "Remove Tileset",
        K::AddObject => "Add Object",
        K::RemoveObject => "Remove Object",
        K::MoveObject => "Move Object",
        K::SetObjectName => "Rename Object",
        K::SetObjectTag => "Change Object Tag",
        K::SetObjectVisible => "Toggle Object Visibility",
        K::AddProperty => "Add Property",
        K::RemoveProperty => "Remove Property",
        K::RenameProperty => "Rename Property",
        K::UpdateProperty => "Change Property",
        K::ChangePropertyType => "Change Property Type",
        K::DefineComponent => "Define Component",
        K::UndefComponent => "Delete Component",
        K::RenameComponent => "Rename Component",
        K::AddComponentAttr => "Add Component Attribute",
        K::RemoveComponentAttr => "Remove Component Attribute",
        K::RenameComponentAttr => "Rename Component Attribute",
        K::SetComponentAttrType => "Change Component Attribute Type",
        K::UpdateComponentAttr => "Change Component Default",
        K::AttachComponent => "Attach Component",
        K::DetachComponent => "Detach Component",
        K::UpdateAttachedComponent => "Change Component Value",
        K::ResetAttachedComponent => "Reset Component",
    }
}
