//! In-memory mapping index.
//!
//! One readers-writer lock guards the current document together with its
//! three derived views:
//!
//! - forward: `(source, type id) -> global type id`
//! - reverse: `(source, global type id) -> type ids` in type-list order
//! - names:   `(source, type id) -> display name`
//!
//! The views are never patched in place. A write builds a fresh
//! [`IndexState`] from the new document and swaps it in under the write lock,
//! so readers observe either the old state or the new one, never a mix.
//!
//! Unmapped source types (empty `global_type`) appear in the name view only.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{RwLock, RwLockWriteGuard};

use crate::domain::MappingDocument;

/// Document plus the views derived from it
#[derive(Debug, Default)]
struct IndexState {
    document: Arc<MappingDocument>,
    forward: HashMap<String, HashMap<i64, String>>,
    reverse: HashMap<String, HashMap<String, Vec<i64>>>,
    names: HashMap<String, HashMap<i64, String>>,
}

impl IndexState {
    /// Build all three views in one pass
    fn build(document: MappingDocument) -> Self {
        let mut forward = HashMap::with_capacity(document.source_mappings.len());
        let mut reverse = HashMap::with_capacity(document.source_mappings.len());
        let mut names = HashMap::with_capacity(document.source_mappings.len());

        for (code, mapping) in &document.source_mappings {
            let mut source_forward = HashMap::new();
            let mut source_reverse: HashMap<String, Vec<i64>> = HashMap::new();
            let mut source_names = HashMap::with_capacity(mapping.type_list.len());

            for source_type in &mapping.type_list {
                source_names.insert(source_type.id, source_type.name.clone());

                if source_type.is_mapped() {
                    source_forward.insert(source_type.id, source_type.global_type.clone());
                    source_reverse
                        .entry(source_type.global_type.clone())
                        .or_default()
                        .push(source_type.id);
                }
            }

            forward.insert(code.clone(), source_forward);
            reverse.insert(code.clone(), source_reverse);
            names.insert(code.clone(), source_names);
        }

        Self {
            document: Arc::new(document),
            forward,
            reverse,
            names,
        }
    }
}

/// Aggregate counts over the current document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MappingStats {
    pub total_global_types: usize,
    pub total_sources: usize,
    pub total_types: usize,
    pub total_mapped: usize,
}

/// Concurrent lookup structure over the current [`MappingDocument`]
///
/// Cloning is cheap and shares the same underlying state.
#[derive(Debug, Clone, Default)]
pub struct MappingIndex {
    state: Arc<RwLock<IndexState>>,
}

impl MappingIndex {
    pub fn new(document: MappingDocument) -> Self {
        Self {
            state: Arc::new(RwLock::new(IndexState::build(document))),
        }
    }

    /// Replace the document and all derived views as one unit
    pub async fn rebuild(&self, document: MappingDocument) {
        let next = IndexState::build(document);
        *self.state.write().await = next;
    }

    /// Exclusive access for a read-modify-write cycle
    pub(crate) async fn write(&self) -> IndexWriter<'_> {
        IndexWriter {
            guard: self.state.write().await,
        }
    }

    /// Global type of one source type
    ///
    /// `None` covers both an unknown source or id and an entry that exists
    /// but is unmapped; [`MappingIndex::lookup_name`] tells the two apart.
    pub async fn lookup_global_type(&self, source_code: &str, source_type_id: i64) -> Option<String> {
        let state = self.state.read().await;
        state.forward.get(source_code)?.get(&source_type_id).cloned()
    }

    pub async fn lookup_source_type_ids(&self, source_code: &str, global_type: &str) -> Option<Vec<i64>> {
        let state = self.state.read().await;
        state.reverse.get(source_code)?.get(global_type).cloned()
    }

    pub async fn lookup_name(&self, source_code: &str, source_type_id: i64) -> Option<String> {
        let state = self.state.read().await;
        state.names.get(source_code)?.get(&source_type_id).cloned()
    }

    /// `(id, name)` pairs of a source's types mapped to `global_type`
    pub async fn lookup_source_types(&self, source_code: &str, global_type: &str) -> Option<Vec<(i64, String)>> {
        let state = self.state.read().await;
        let ids = state.reverse.get(source_code)?.get(global_type)?;
        let names = state.names.get(source_code)?;

        Some(
            ids.iter()
                .filter_map(|id| names.get(id).map(|name| (*id, name.clone())))
                .collect(),
        )
    }

    /// Read-only view of the document the indices were built from
    pub async fn snapshot(&self) -> Arc<MappingDocument> {
        Arc::clone(&self.state.read().await.document)
    }

    pub async fn stats(&self) -> MappingStats {
        let state = self.state.read().await;
        let doc = &state.document;

        MappingStats {
            total_global_types: doc.global_types.len(),
            total_sources: doc.source_mappings.len(),
            total_types: state.names.values().map(HashMap::len).sum(),
            total_mapped: state.forward.values().map(HashMap::len).sum(),
        }
    }
}

/// Write guard handed out by [`MappingIndex::write`]
pub(crate) struct IndexWriter<'a> {
    guard: RwLockWriteGuard<'a, IndexState>,
}

impl IndexWriter<'_> {
    pub(crate) fn document(&self) -> &MappingDocument {
        &self.guard.document
    }

    /// Install a new document and rebuild, releasing the lock
    pub(crate) fn install(mut self, document: MappingDocument) {
        *self.guard = IndexState::build(document);
    }
}
