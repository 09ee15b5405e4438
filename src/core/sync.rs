//! Sync orchestrator: reconcile a source's live categories with its mapping.
//!
//! One sync runs Fetch -> Diff -> Classify -> Merge -> Commit and stops at
//! the first error. The fetch happens outside the index lock. Diff, classify
//! and merge run inside [`MappingRegistry::commit`] against the document
//! current at commit time, so a concurrent admin edit is never overwritten.
//!
//! Existing entries are carried over untouched, including ones the source no
//! longer reports. Newly discovered ids are appended in discovery order.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::adapters::CategoryFetcher;
use crate::domain::{MappingDocument, SourceMapping, SourceType, SourcesFile};
use crate::error::{MappingError, Result};

use super::classifier::Classifier;
use super::registry::MappingRegistry;

/// Outcome of one source sync
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub source_code: String,
    /// Categories returned by the source
    pub fetched: usize,
    /// Existing entries kept as they were
    pub carried_over: usize,
    /// Fetched ids that were not in the mapping yet
    pub discovered: usize,
    /// Discovered entries the classifier could map
    pub classified: usize,
    /// Size of the merged type list
    pub total: usize,
    /// Entries in the merged list without a global type
    pub unmapped: usize,
}

/// Outcome of a batch initialization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub succeeded: Vec<SyncReport>,
    /// `(source code, reason)` for sources that were not attempted
    pub skipped: Vec<(String, String)>,
    /// `(source code, error)` for sources whose sync failed
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// How a sync treats the source's existing mapping
#[derive(Debug, Clone, Copy)]
enum SyncMode<'a> {
    /// Merge into the existing mapping, or create one named after the code
    Merge,
    /// Only create a new mapping called `name`; never touch an existing one
    CreateOnly { name: &'a str },
}

/// Drives source syncs through the registry
pub struct SyncOrchestrator {
    registry: MappingRegistry,
    fetcher: Arc<dyn CategoryFetcher>,
    classifier: Arc<dyn Classifier>,
}

impl SyncOrchestrator {
    pub fn new(
        registry: MappingRegistry,
        fetcher: Arc<dyn CategoryFetcher>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        Self {
            registry,
            fetcher,
            classifier,
        }
    }

    pub fn registry(&self) -> &MappingRegistry {
        &self.registry
    }

    /// Fetch and merge one source's categories
    ///
    /// A new mapping is named after the source code.
    pub async fn sync_source(&self, source_code: &str, base_url: &str) -> Result<SyncReport> {
        self.sync_with(source_code, SyncMode::Merge, base_url).await
    }

    #[instrument(skip(self, mode, base_url), fields(fetcher = self.fetcher.name()))]
    async fn sync_with(&self, source_code: &str, mode: SyncMode<'_>, base_url: &str) -> Result<SyncReport> {
        let fetched = self.fetcher.fetch_categories(source_code, base_url).await?;

        let report = self
            .registry
            .commit(|doc| {
                let name = match mode {
                    SyncMode::Merge => source_code,
                    SyncMode::CreateOnly { name } => {
                        // A mapping created while the fetch was in flight wins
                        if doc.source_mappings.contains_key(source_code) {
                            return Err(MappingError::AlreadyExists {
                                kind: "Source mapping",
                                key: source_code.to_string(),
                            });
                        }
                        name
                    }
                };
                Ok(merge_into(doc, source_code, name, fetched, self.classifier.as_ref()))
            })
            .await?;

        info!(
            fetched = report.fetched,
            discovered = report.discovered,
            classified = report.classified,
            unmapped = report.unmapped,
            "Source sync committed"
        );
        Ok(report)
    }

    /// Sync every enabled source that has no mapping yet
    ///
    /// Failures are recorded per source and never stop the batch.
    #[instrument(skip(self, sources), fields(count = sources.sources.len()))]
    pub async fn initialize_all(&self, sources: &SourcesFile) -> BatchReport {
        let mut report = BatchReport::default();

        for (code, source) in &sources.sources {
            if !source.enabled {
                info!(source = %code, "Source disabled, skipping");
                report.skipped.push((code.clone(), "disabled".to_string()));
                continue;
            }

            if self.registry.snapshot().await.source_mappings.contains_key(code) {
                info!(source = %code, "Source already mapped, skipping");
                report.skipped.push((code.clone(), "already mapped".to_string()));
                continue;
            }

            info!(source = %code, name = %source.name, "Initializing source");
            let mode = SyncMode::CreateOnly { name: &source.name };
            match self.sync_with(code, mode, &source.url).await {
                Ok(sync) => report.succeeded.push(sync),
                Err(MappingError::AlreadyExists { .. }) => {
                    info!(source = %code, "Source mapped during fetch, skipping");
                    report.skipped.push((code.clone(), "already mapped".to_string()));
                }
                Err(e) => {
                    error!(source = %code, error = %e, "Source initialization failed");
                    report.failed.push((code.clone(), e.to_string()));
                }
            }
        }

        info!(
            succeeded = report.succeeded.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Batch initialization finished"
        );
        report
    }
}

/// Merge fetched categories into `doc` for one source
fn merge_into(
    doc: &mut MappingDocument,
    source_code: &str,
    new_mapping_name: &str,
    fetched: Vec<SourceType>,
    classifier: &dyn Classifier,
) -> SyncReport {
    let mut mapping = doc
        .source_mappings
        .get(source_code)
        .cloned()
        .unwrap_or_else(|| SourceMapping::new(new_mapping_name));

    let mut known: HashSet<i64> = mapping.type_list.iter().map(|t| t.id).collect();
    let fetched_count = fetched.len();
    let carried_over = mapping.type_list.len();

    let mut discovered = 0;
    let mut classified = 0;

    // `insert` also drops ids repeated within the fetched list
    for mut source_type in fetched.into_iter().filter(|t| known.insert(t.id)) {
        discovered += 1;

        match classifier.classify(&source_type.name) {
            Some(global_type) if doc.global_types.contains_key(&global_type) => {
                info!(
                    source = source_code,
                    type_id = source_type.id,
                    type_name = %source_type.name,
                    global_type = %global_type,
                    "Classified category"
                );
                source_type.global_type = global_type;
                classified += 1;
            }
            Some(global_type) => {
                warn!(
                    source = source_code,
                    type_id = source_type.id,
                    type_name = %source_type.name,
                    global_type = %global_type,
                    "Classifier proposed an undefined global type, leaving unmapped"
                );
                source_type.global_type.clear();
            }
            None => {
                warn!(
                    source = source_code,
                    type_id = source_type.id,
                    type_name = %source_type.name,
                    "Category needs manual mapping"
                );
                source_type.global_type.clear();
            }
        }

        mapping.type_list.push(source_type);
    }

    let report = SyncReport {
        source_code: source_code.to_string(),
        fetched: fetched_count,
        carried_over,
        discovered,
        classified,
        total: mapping.type_list.len(),
        unmapped: mapping.type_list.len() - mapping.mapped_count(),
    };

    doc.source_mappings.insert(source_code.to_string(), mapping);
    report
}
