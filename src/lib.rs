//! vodmap - category mapping index for aggregated video listing APIs
//!
//! Every upstream source labels its content with its own integer category
//! ids. vodmap keeps a per-source table translating those ids to a small set
//! of canonical global types (movie, tv, anime, ...) and back.
//!
//! # Architecture
//!
//! The mapping document on disk is the single source of truth:
//! - Lookups are served from indices derived from the document
//! - Every write rebuilds the indices as one unit under a single lock
//! - New source categories are discovered over HTTP and classified by a
//!   keyword heuristic, never overwriting manual mappings
//!
//! # Modules
//!
//! - `adapters`: Upstream category discovery (HTTP)
//! - `core`: Store, classifier, index, registry and sync orchestrator
//! - `domain`: Data structures (MappingDocument, SourceMapping, ...)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Discover and classify one source's categories
//! vodmap fetch alpha https://alpha.example/api.php/provide/vod
//!
//! # Which native ids does source "alpha" use for movies?
//! vodmap lookup alpha --global-type movie
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;

// Re-export main types at crate root for convenience
pub use core::{
    Classifier, ConfigStore, KeywordClassifier, MappingIndex, MappingRegistry, SyncOrchestrator,
};
pub use domain::{GlobalType, MappingDocument, SourceMapping, SourceType, SourcesFile};
pub use error::{MappingError, Result};
