//! Source catalog (`sources.json`).
//!
//! Lists every upstream listing API by code. Only the batch initializer
//! reads it; the mapping document never stores URLs.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{MappingError, Result};

/// One upstream listing API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,

    /// Base URL of the listing endpoint
    pub url: String,

    #[serde(default)]
    pub is_default: bool,

    #[serde(default)]
    pub enabled: bool,
}

/// Contents of `sources.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesFile {
    #[serde(default)]
    pub sources: BTreeMap<String, SourceConfig>,
}

impl SourcesFile {
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| MappingError::io(path, e))?;

        serde_json::from_str(&content).map_err(|source| MappingError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Enabled sources in code order
    pub fn enabled(&self) -> impl Iterator<Item = (&String, &SourceConfig)> {
        self.sources.iter().filter(|(_, s)| s.enabled)
    }

    pub fn get(&self, code: &str) -> Option<&SourceConfig> {
        self.sources.get(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sources_file() {
        let json = r#"{
            "sources": {
                "alpha": {"name": "Alpha", "url": "https://alpha.example/api.php/provide/vod", "is_default": true, "enabled": true},
                "beta": {"name": "Beta", "url": "https://beta.example/api", "enabled": false}
            }
        }"#;

        let file: SourcesFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.sources.len(), 2);
        assert!(file.get("alpha").unwrap().is_default);

        let enabled: Vec<_> = file.enabled().map(|(code, _)| code.as_str()).collect();
        assert_eq!(enabled, vec!["alpha"]);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_io_error() {
        let result = SourcesFile::load(Path::new("/nonexistent/sources.json")).await;
        assert!(matches!(result, Err(MappingError::Io { .. })));
    }
}
