//! Flat-file persistence for the mapping document.
//!
//! The store performs no locking. Callers serialize writes through
//! [`super::MappingRegistry`].

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};

use crate::domain::MappingDocument;
use crate::error::{MappingError, Result};

/// JSON file holding the mapping document
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read, parse and validate the document
    pub async fn load(&self) -> Result<MappingDocument> {
        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| MappingError::io(&self.path, e))?;

        let doc: MappingDocument =
            serde_json::from_str(&content).map_err(|source| MappingError::Parse {
                path: self.path.clone(),
                source,
            })?;

        doc.validate()?;

        info!(
            global_types = doc.global_types.len(),
            sources = doc.source_mappings.len(),
            path = %self.path.display(),
            "Loaded type mapping document"
        );

        Ok(doc)
    }

    /// Load the document, or the seeded default when no file exists yet
    pub async fn load_or_seed(&self) -> Result<MappingDocument> {
        if fs::try_exists(&self.path)
            .await
            .map_err(|e| MappingError::io(&self.path, e))?
        {
            self.load().await
        } else {
            debug!(path = %self.path.display(), "No mapping document yet, using seed");
            Ok(MappingDocument::seeded())
        }
    }

    /// Stamp `last_updated` and rewrite the whole document
    ///
    /// Writes to a sibling `.tmp` file first and renames it over the target.
    pub async fn save(&self, doc: &mut MappingDocument) -> Result<()> {
        doc.stamp();

        let content = serde_json::to_string_pretty(doc).map_err(MappingError::Serialize)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| MappingError::io(parent, e))?;
            }
        }

        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, content)
            .await
            .map_err(|e| MappingError::io(&tmp_path, e))?;
        if let Err(e) = fs::rename(&tmp_path, &self.path).await {
            if let Err(cleanup) = fs::remove_file(&tmp_path).await {
                warn!(path = %tmp_path.display(), error = %cleanup, "Failed to remove temporary mapping file");
            }
            return Err(MappingError::io(&self.path, e));
        }

        debug!(path = %self.path.display(), last_updated = %doc.last_updated, "Saved type mapping document");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SourceMapping, SourceType};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_stamps_and_load_roundtrips() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::new(temp.path().join("nested").join("type_mapping.json"));

        let mut doc = MappingDocument::seeded();
        doc.source_mappings.insert(
            "src".to_string(),
            SourceMapping::new("Source").with_type(SourceType::new(1, "动作片").mapped_to("movie")),
        );
        assert!(doc.last_updated.is_empty());

        store.save(&mut doc).await.unwrap();
        assert!(!doc.last_updated.is_empty());
        assert!(!store.tmp_path().exists());

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, doc);
    }

    #[tokio::test]
    async fn test_saved_file_is_pretty_printed() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::new(temp.path().join("type_mapping.json"));

        let mut doc = MappingDocument::seeded();
        store.save(&mut doc).await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\n  \"global_types\""));
        assert!(raw.contains("\"last_updated\""));
    }

    #[tokio::test]
    async fn test_failed_rename_removes_temp_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("type_mapping.json");

        // A non-empty directory at the target makes the rename fail
        std::fs::create_dir_all(path.join("occupied")).unwrap();

        let store = ConfigStore::new(&path);
        let err = store.save(&mut MappingDocument::seeded()).await.unwrap_err();

        assert!(matches!(err, MappingError::Io { .. }));
        assert!(!temp.path().join("type_mapping.json.tmp").exists());
        assert!(path.is_dir());
    }

    #[tokio::test]
    async fn test_load_missing_file_is_io_error() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::new(temp.path().join("missing.json"));
        assert!(matches!(store.load().await, Err(MappingError::Io { .. })));
    }

    #[tokio::test]
    async fn test_load_or_seed_without_file() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::new(temp.path().join("missing.json"));

        let doc = store.load_or_seed().await.unwrap();
        assert_eq!(doc, MappingDocument::seeded());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_load_malformed_json_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.json");
        std::fs::write(&path, "{ \"global_types\": ").unwrap();

        let store = ConfigStore::new(&path);
        assert!(matches!(store.load().await, Err(MappingError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_load_rejects_duplicate_type_ids() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("dup.json");
        std::fs::write(
            &path,
            r#"{"global_types": {}, "source_mappings": {"s": {"name": "S", "type_list": [
                {"id": 1, "name": "a"}, {"id": 1, "name": "b"}
            ]}}}"#,
        )
        .unwrap();

        let store = ConfigStore::new(&path);
        assert!(matches!(
            store.load().await,
            Err(MappingError::DuplicateSourceTypeId { type_id: 1, .. })
        ));
    }
}
