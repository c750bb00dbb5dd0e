//! Error handling for the content cache

use crate::key::CacheKey;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed error produced by a caller-supplied converter
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by [`ContentCache`](crate::ContentCache) operations
///
/// A failed operation never leaves partial state behind: entries for other
/// keys, and the prior value for the failing key, are untouched.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CacheError {
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("A converter is already registered for {key}")]
    DuplicateRegistration { key: CacheKey },

    #[error("No converter registered for {key}")]
    KeyNotFound { key: CacheKey },

    #[error("Cached value for {key} is a {actual}, not a {expected}")]
    TypeMismatch {
        key: CacheKey,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The converter's own error, unchanged
    #[error(transparent)]
    Converter(BoxError),
}

impl CacheError {
    /// Map a filesystem error, folding `NotFound` into [`CacheError::FileNotFound`]
    pub(crate) fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    pub fn is_file_not_found(&self) -> bool {
        matches!(self, Self::FileNotFound { .. })
    }

    pub fn is_duplicate_registration(&self) -> bool {
        matches!(self, Self::DuplicateRegistration { .. })
    }

    pub fn is_key_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. })
    }

    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }

    /// Borrow the converter's error as its concrete type, if it is one
    pub fn converter_error<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            Self::Converter(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Take back the converter's error
    pub fn into_converter_error(self) -> Option<BoxError> {
        match self {
            Self::Converter(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type alias for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_not_found_io_maps_to_file_not_found() {
        let err = CacheError::from_io("/tmp/missing.json", io::Error::from(io::ErrorKind::NotFound));
        assert!(err.is_file_not_found());
        assert_eq!(err.to_string(), "File not found: /tmp/missing.json");
    }

    #[test]
    fn test_other_io_kinds_are_preserved() {
        let err = CacheError::from_io(
            "/tmp/locked.json",
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        match err {
            CacheError::Io { path, source } => {
                assert_eq!(path, PathBuf::from("/tmp/locked.json"));
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("expected Io, got {:?}", other),
        }
    }

    #[test]
    fn test_converter_error_is_transparent() {
        let parse_err = "x1".parse::<u32>().unwrap_err();
        let expected = parse_err.to_string();
        let err = CacheError::Converter(Box::new(parse_err));

        assert_eq!(err.to_string(), expected);
        assert!(err
            .converter_error::<std::num::ParseIntError>()
            .is_some());
        assert!(err.converter_error::<io::Error>().is_none());
        assert!(err.into_converter_error().is_some());
    }
}
