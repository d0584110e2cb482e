//! Errors raised while reading or writing map files

use thiserror::Error;
use tilemap_core::GenericError;

/// Why a map or tileset file could not be read or written
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveFormatError {
    #[error("invalid operation")]
    InvalidOperation,
    #[error("unknown error")]
    Unknown,
    #[error("malformed file: {0}")]
    BadFile(String),
    #[error("unsupported file format")]
    UnsupportedFormat,
    #[error("missing required key '{0}'")]
    MissingKey(String),
    #[error("unsupported map orientation '{0}'")]
    UnsupportedOrientation(String),
    #[error("unsupported layer type '{0}'")]
    UnsupportedLayerType(String),
    #[error("unsupported property type '{0}'")]
    UnsupportedPropertyType(String),
    #[error("unsupported tile encoding '{0}'")]
    UnsupportedTileEncoding(String),
    #[error("unsupported compression mode '{0}'")]
    UnsupportedCompressionMode(String),
    #[error("bad color property value")]
    BadColorProperty,
    #[error("corrupt property value")]
    CorruptPropertyValue,
    #[error("bad tile layer data")]
    BadTileLayerData,
    #[error("compression is not valid for this tile encoding")]
    BadCompressionMode,
    #[error(transparent)]
    Generic(#[from] GenericError),
}

impl SaveFormatError {
    pub(crate) fn missing(key: &str) -> Self {
        SaveFormatError::MissingKey(key.to_string())
    }
}

impl From<std::io::Error> for SaveFormatError {
    fn from(error: std::io::Error) -> Self {
        SaveFormatError::Generic(GenericError::from(error))
    }
}

impl From<serde_json::Error> for SaveFormatError {
    fn from(error: serde_json::Error) -> Self {
        match error.classify() {
            serde_json::error::Category::Io => {
                SaveFormatError::Generic(GenericError::BadFileStream)
            }
            _ => SaveFormatError::BadFile(error.to_string()),
        }
    }
}

impl From<serde_yaml::Error> for SaveFormatError {
    fn from(error: serde_yaml::Error) -> Self {
        SaveFormatError::BadFile(error.to_string())
    }
}

impl From<quick_xml::Error> for SaveFormatError {
    fn from(error: quick_xml::Error) -> Self {
        SaveFormatError::BadFile(error.to_string())
    }
}

/// Result type for the format pipeline
pub type Result<T> = std::result::Result<T, SaveFormatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_conversion() {
        let err: SaveFormatError = GenericError::CouldNotDecompress.into();
        assert_eq!(err, SaveFormatError::Generic(GenericError::CouldNotDecompress));

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(
            SaveFormatError::from(io),
            SaveFormatError::Generic(GenericError::NoSuchFile)
        );
    }

    #[test]
    fn test_display_names_key() {
        let err = SaveFormatError::missing("tilewidth");
        assert_eq!(err.to_string(), "missing required key 'tilewidth'");
    }
}
