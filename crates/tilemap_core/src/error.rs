//! Generic error codes shared by the document model and the I/O utilities

use thiserror::Error;

/// Errors raised by filesystem, compression and model lookup utilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum GenericError {
    #[error("unknown error")]
    Unknown,
    #[error("operation is not supported")]
    NotSupported,
    #[error("out of memory")]
    OutOfMemory,
    #[error("bad parameter")]
    BadParam,
    #[error("bad state")]
    BadState,
    #[error("bad operation")]
    BadOperation,
    #[error("no such file")]
    NoSuchFile,
    #[error("bad file stream")]
    BadFileStream,
    #[error("could not compress data")]
    CouldNotCompress,
    #[error("could not decompress data")]
    CouldNotDecompress,
    #[error("not found")]
    NotFound,
}

impl From<std::io::Error> for GenericError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => GenericError::NoSuchFile,
            std::io::ErrorKind::OutOfMemory => GenericError::OutOfMemory,
            std::io::ErrorKind::InvalidInput => GenericError::BadParam,
            std::io::ErrorKind::Unsupported => GenericError::NotSupported,
            _ => GenericError::BadFileStream,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mapping() {
        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(GenericError::from(missing), GenericError::NoSuchFile);

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        assert_eq!(GenericError::from(denied), GenericError::BadFileStream);
    }
}
