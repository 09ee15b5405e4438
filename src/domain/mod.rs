//! Domain types for the type-mapping core.
//!
//! - Mapping: global types, source types and the persisted document
//! - Source: upstream listing APIs from `sources.json`

pub mod mapping;
pub mod source;

// Re-export commonly used types
pub use mapping::{GlobalType, MappingDocument, SourceMapping, SourceType};
pub use source::{SourceConfig, SourcesFile};
