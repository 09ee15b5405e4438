//! Adapter interfaces for upstream listing APIs.
//!
//! The sync path only needs one thing from a source: its flat list of native
//! categories. Everything else about the upstream API stays behind this seam.

pub mod http;

use async_trait::async_trait;

use crate::domain::SourceType;
use crate::error::Result;

pub use http::{parse_class_list, FetchSettings, HttpCategoryFetcher};

/// Discovers the native categories of one source
#[async_trait]
pub trait CategoryFetcher: Send + Sync {
    /// Human-readable adapter name
    fn name(&self) -> &str;

    /// Fetch the source's categories, all unmapped
    ///
    /// Fails with [`crate::MappingError::Fetch`] when the source is
    /// unreachable or returns no usable categories.
    async fn fetch_categories(&self, source_code: &str, base_url: &str) -> Result<Vec<SourceType>>;
}
