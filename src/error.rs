//! Error types for the type-mapping core.
//!
//! Lookup misses are not errors: the index returns `None` for those.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the store, the registry and the sync path
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse mapping document {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize mapping document: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed to fetch categories for source '{source_code}': {reason}")]
    Fetch { source_code: String, reason: String },

    #[error("Source '{source_code}' type {type_id} references unknown global type '{global_type}'")]
    UnknownGlobalType {
        source_code: String,
        type_id: i64,
        global_type: String,
    },

    #[error("Global type '{id}' is still referenced by source mappings: {}", sources.join(", "))]
    GlobalTypeInUse { id: String, sources: Vec<String> },

    #[error("Source '{source_code}' lists type id {type_id} more than once")]
    DuplicateSourceTypeId { source_code: String, type_id: i64 },

    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("{kind} already exists: {key}")]
    AlreadyExists { kind: &'static str, key: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, MappingError>;

impl MappingError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn fetch(source_code: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fetch {
            source_code: source_code.into(),
            reason: reason.to_string(),
        }
    }

    /// True for the referential-integrity class of rejections
    pub fn is_referential_integrity(&self) -> bool {
        matches!(
            self,
            Self::UnknownGlobalType { .. } | Self::GlobalTypeInUse { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referential_integrity_class() {
        let in_use = MappingError::GlobalTypeInUse {
            id: "movie".to_string(),
            sources: vec!["a".to_string(), "b".to_string()],
        };
        assert!(in_use.is_referential_integrity());
        assert_eq!(
            in_use.to_string(),
            "Global type 'movie' is still referenced by source mappings: a, b"
        );

        let missing = MappingError::NotFound {
            kind: "Global type",
            key: "tv".to_string(),
        };
        assert!(!missing.is_referential_integrity());
        assert!(missing.is_not_found());
    }
}
