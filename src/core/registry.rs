//! Mapping registry: the store and the index behind one write path.
//!
//! Every mutation runs inside [`MappingRegistry::commit`]: take the index
//! write lock, copy the current document, apply the change, validate, save,
//! then rebuild the index. Existence and uniqueness checks happen inside the
//! mutation closure, under the same lock as the write. If any step fails the
//! lock is released with the previous document and views still installed.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{GlobalType, MappingDocument, SourceMapping, SourceType};
use crate::error::{MappingError, Result};

use super::index::{MappingIndex, MappingStats};
use super::store::ConfigStore;

const GLOBAL_TYPE: &str = "Global type";
const SOURCE_MAPPING: &str = "Source mapping";

/// Store + index pair with serialized writes
#[derive(Debug, Clone)]
pub struct MappingRegistry {
    store: ConfigStore,
    index: MappingIndex,
}

impl MappingRegistry {
    /// Wrap an already-loaded document
    pub fn new(store: ConfigStore, document: MappingDocument) -> Self {
        Self {
            store,
            index: MappingIndex::new(document),
        }
    }

    /// Load from the store, seeding a default document if none exists
    pub async fn open(store: ConfigStore) -> Result<Self> {
        let document = store.load_or_seed().await?;
        Ok(Self::new(store, document))
    }

    pub fn index(&self) -> &MappingIndex {
        &self.index
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub async fn snapshot(&self) -> Arc<MappingDocument> {
        self.index.snapshot().await
    }

    pub async fn stats(&self) -> MappingStats {
        self.index.stats().await
    }

    /// Re-read the document from disk and rebuild the index
    pub async fn reload(&self) -> Result<()> {
        let writer = self.index.write().await;
        let document = self.store.load().await?;
        writer.install(document);
        Ok(())
    }

    /// Apply `mutate` to a copy of the document and commit it
    pub async fn commit<T, F>(&self, mutate: F) -> Result<T>
    where
        F: FnOnce(&mut MappingDocument) -> Result<T>,
    {
        let writer = self.index.write().await;
        let mut next = writer.document().clone();

        let output = mutate(&mut next)?;
        next.validate()?;

        if let Err(e) = self.store.save(&mut next).await {
            warn!(error = %e, "Failed to persist type mapping, keeping previous state");
            return Err(e);
        }

        writer.install(next);
        Ok(output)
    }

    // ------------------------------------------------------------------
    // Global types
    // ------------------------------------------------------------------

    pub async fn global_types(&self) -> Vec<GlobalType> {
        self.snapshot()
            .await
            .global_types_by_priority()
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn global_type(&self, id: &str) -> Result<GlobalType> {
        self.snapshot()
            .await
            .global_types
            .get(id)
            .cloned()
            .ok_or_else(|| not_found(GLOBAL_TYPE, id))
    }

    pub async fn create_global_type(&self, global_type: GlobalType) -> Result<GlobalType> {
        validate_global_type(&global_type)?;

        let created = self
            .commit(|doc| {
                if doc.global_types.contains_key(&global_type.id) {
                    return Err(MappingError::AlreadyExists {
                        kind: GLOBAL_TYPE,
                        key: global_type.id.clone(),
                    });
                }
                doc.global_types
                    .insert(global_type.id.clone(), global_type.clone());
                Ok(global_type)
            })
            .await?;

        info!(id = %created.id, "Created global type");
        Ok(created)
    }

    pub async fn update_global_type(&self, global_type: GlobalType) -> Result<GlobalType> {
        validate_global_type(&global_type)?;

        let updated = self
            .commit(|doc| {
                let slot = doc
                    .global_types
                    .get_mut(&global_type.id)
                    .ok_or_else(|| not_found(GLOBAL_TYPE, &global_type.id))?;
                *slot = global_type.clone();
                Ok(global_type)
            })
            .await?;

        info!(id = %updated.id, "Updated global type");
        Ok(updated)
    }

    /// Fails with [`MappingError::GlobalTypeInUse`] while any source references it
    pub async fn delete_global_type(&self, id: &str) -> Result<GlobalType> {
        let removed = self
            .commit(|doc| {
                if !doc.global_types.contains_key(id) {
                    return Err(not_found(GLOBAL_TYPE, id));
                }

                let sources = doc.sources_referencing(id);
                if !sources.is_empty() {
                    return Err(MappingError::GlobalTypeInUse {
                        id: id.to_string(),
                        sources,
                    });
                }

                doc.global_types
                    .remove(id)
                    .ok_or_else(|| not_found(GLOBAL_TYPE, id))
            })
            .await?;

        info!(id, "Deleted global type");
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Source mappings
    // ------------------------------------------------------------------

    pub async fn source_mappings(&self) -> Vec<(String, SourceMapping)> {
        self.snapshot()
            .await
            .source_mappings
            .iter()
            .map(|(code, mapping)| (code.clone(), mapping.clone()))
            .collect()
    }

    pub async fn source_mapping(&self, source_code: &str) -> Result<SourceMapping> {
        self.snapshot()
            .await
            .source_mappings
            .get(source_code)
            .cloned()
            .ok_or_else(|| not_found(SOURCE_MAPPING, source_code))
    }

    pub async fn create_source_mapping(&self, source_code: &str, mapping: SourceMapping) -> Result<SourceMapping> {
        validate_source_code(source_code)?;

        let created = self
            .commit(|doc| {
                if doc.source_mappings.contains_key(source_code) {
                    return Err(MappingError::AlreadyExists {
                        kind: SOURCE_MAPPING,
                        key: source_code.to_string(),
                    });
                }
                mapping.validate(source_code, &doc.global_types)?;
                doc.source_mappings
                    .insert(source_code.to_string(), mapping.clone());
                Ok(mapping)
            })
            .await?;

        info!(source = source_code, types = created.type_list.len(), "Created source mapping");
        Ok(created)
    }

    pub async fn update_source_mapping(&self, source_code: &str, mapping: SourceMapping) -> Result<SourceMapping> {
        let updated = self
            .commit(|doc| {
                if !doc.source_mappings.contains_key(source_code) {
                    return Err(not_found(SOURCE_MAPPING, source_code));
                }
                mapping.validate(source_code, &doc.global_types)?;
                doc.source_mappings
                    .insert(source_code.to_string(), mapping.clone());
                Ok(mapping)
            })
            .await?;

        info!(source = source_code, types = updated.type_list.len(), "Updated source mapping");
        Ok(updated)
    }

    /// Manually (re)assign one source type; an empty `global_type` unmaps it
    pub async fn assign_source_type(&self, source_code: &str, type_id: i64, global_type: &str) -> Result<SourceType> {
        let assigned = self
            .commit(|doc| {
                if !global_type.is_empty() && !doc.global_types.contains_key(global_type) {
                    return Err(MappingError::UnknownGlobalType {
                        source_code: source_code.to_string(),
                        type_id,
                        global_type: global_type.to_string(),
                    });
                }

                let mapping = doc
                    .source_mappings
                    .get_mut(source_code)
                    .ok_or_else(|| not_found(SOURCE_MAPPING, source_code))?;
                let source_type = mapping
                    .type_list
                    .iter_mut()
                    .find(|t| t.id == type_id)
                    .ok_or_else(|| not_found("Source type", &format!("{}:{}", source_code, type_id)))?;

                source_type.global_type = global_type.to_string();
                Ok(source_type.clone())
            })
            .await?;

        info!(source = source_code, type_id, global_type, "Assigned source type");
        Ok(assigned)
    }

    pub async fn delete_source_mapping(&self, source_code: &str) -> Result<SourceMapping> {
        let removed = self
            .commit(|doc| {
                doc.source_mappings
                    .remove(source_code)
                    .ok_or_else(|| not_found(SOURCE_MAPPING, source_code))
            })
            .await?;

        info!(source = source_code, "Deleted source mapping");
        Ok(removed)
    }
}

fn not_found(kind: &'static str, key: &str) -> MappingError {
    MappingError::NotFound {
        kind,
        key: key.to_string(),
    }
}

fn validate_global_type(global_type: &GlobalType) -> Result<()> {
    if global_type.id.trim().is_empty() || global_type.name.trim().is_empty() {
        return Err(MappingError::InvalidInput(
            "global type requires a non-empty id and name".to_string(),
        ));
    }
    Ok(())
}

fn validate_source_code(source_code: &str) -> Result<()> {
    if source_code.trim().is_empty() {
        return Err(MappingError::InvalidInput(
            "source code must not be empty".to_string(),
        ));
    }
    Ok(())
}
