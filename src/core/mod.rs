//! Type-mapping core.
//!
//! This module contains:
//! - ConfigStore: flat-file persistence of the mapping document
//! - Classifier: keyword heuristic for unmapped categories
//! - MappingIndex: concurrent forward/reverse/name lookups
//! - MappingRegistry: serialized writes and admin operations
//! - SyncOrchestrator: fetch, classify and merge a source's categories

pub mod classifier;
pub mod index;
pub mod registry;
pub mod store;
pub mod sync;

// Re-export commonly used types
pub use classifier::{Classifier, KeywordClassifier, KeywordRule};
pub use index::{MappingIndex, MappingStats};
pub use registry::MappingRegistry;
pub use store::ConfigStore;
pub use sync::{BatchReport, SyncOrchestrator, SyncReport};
