//! Editing layer for tilemap documents
//!
//! - [`commands`] - Undoable commands and the bounded [`CommandStack`]
//! - [`Document`] - A map with its history, file path and textures
//! - [`EditorContext`] - Random source and undo/redo labels passed to tools
//! - [`EditorSettings`] - User configuration stored in the platform config dir
//! - [`tools`] - Stamp, rectangle, bucket and eraser tools producing commands
//!
//! With the `bevy` feature, [`Document`] and [`EditorSettings`] can be held
//! as Bevy resources.

pub mod commands;
mod context;
mod document;
mod settings;
pub mod tools;

pub use commands::{Command, CommandKind, CommandStack, MapCommand, DEFAULT_CAPACITY};
pub use context::{EditorContext, Strings, StringsError};
pub use document::{Document, MapDocument};
pub use settings::{EditorSettings, SettingsError};
pub use tools::{StampMode, StampTool};
