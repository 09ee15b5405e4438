//! Mapping document types.
//!
//! The [`MappingDocument`] is the single source of truth. Every derived view
//! (see [`crate::core::MappingIndex`]) is rebuilt from it.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{MappingError, Result};

/// Format used when stamping `last_updated`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Canonical, source-independent content category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalType {
    /// Stable key (e.g. "movie")
    pub id: String,

    /// Display name
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Ordering hint, lower sorts first
    #[serde(default)]
    pub priority: i32,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl GlobalType {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            priority: 0,
            enabled: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// A category as reported natively by one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceType {
    /// Integer id, unique within its source only
    pub id: i64,

    /// Label as reported by the source
    pub name: String,

    /// Assigned global type id, empty when unmapped
    #[serde(default)]
    pub global_type: String,
}

impl SourceType {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            global_type: String::new(),
        }
    }

    pub fn mapped_to(mut self, global_type: impl Into<String>) -> Self {
        self.global_type = global_type.into();
        self
    }

    pub fn is_mapped(&self) -> bool {
        !self.global_type.is_empty()
    }
}

/// Per-source container of native categories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMapping {
    pub name: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub type_list: Vec<SourceType>,
}

impl SourceMapping {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            type_list: Vec::new(),
        }
    }

    pub fn with_type(mut self, source_type: SourceType) -> Self {
        self.type_list.push(source_type);
        self
    }

    /// Find a type by its native id
    pub fn get(&self, id: i64) -> Option<&SourceType> {
        self.type_list.iter().find(|t| t.id == id)
    }

    pub fn mapped_count(&self) -> usize {
        self.type_list.iter().filter(|t| t.is_mapped()).count()
    }

    /// Reject duplicate ids and dangling global type references
    pub fn validate(&self, source_code: &str, global_types: &BTreeMap<String, GlobalType>) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.type_list.len());

        for source_type in &self.type_list {
            if !seen.insert(source_type.id) {
                return Err(MappingError::DuplicateSourceTypeId {
                    source_code: source_code.to_string(),
                    type_id: source_type.id,
                });
            }

            if source_type.is_mapped() && !global_types.contains_key(&source_type.global_type) {
                return Err(MappingError::UnknownGlobalType {
                    source_code: source_code.to_string(),
                    type_id: source_type.id,
                    global_type: source_type.global_type.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Root aggregate persisted to disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingDocument {
    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub description: String,

    /// Date or timestamp string, restamped on every save
    #[serde(default)]
    pub last_updated: String,

    #[serde(default)]
    pub global_types: BTreeMap<String, GlobalType>,

    #[serde(default)]
    pub source_mappings: BTreeMap<String, SourceMapping>,
}

impl Default for MappingDocument {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            description: "Source category to global type mapping".to_string(),
            last_updated: String::new(),
            global_types: BTreeMap::new(),
            source_mappings: BTreeMap::new(),
        }
    }
}

impl MappingDocument {
    /// Document seeded with the built-in global types and no sources
    pub fn seeded() -> Self {
        let builtin = [
            ("movie", "电影", "Feature films"),
            ("tv", "电视剧", "Television series"),
            ("variety", "综艺", "Variety and entertainment shows"),
            ("anime", "动漫", "Animation"),
            ("documentary", "纪录片", "Documentaries"),
            ("sport", "体育", "Sports"),
            ("adult", "福利", "Adult content"),
        ];

        let global_types = builtin
            .iter()
            .zip(1..)
            .map(|(&(id, name, description), priority)| {
                (
                    id.to_string(),
                    GlobalType::new(id, name)
                        .with_description(description)
                        .with_priority(priority),
                )
            })
            .collect();

        Self {
            global_types,
            ..Self::default()
        }
    }

    /// Check that every mapped type references a defined global type and that ids are unique per source
    ///
    /// Global types must also be keyed by their own id.
    pub fn validate(&self) -> Result<()> {
        for (key, global_type) in &self.global_types {
            if *key != global_type.id {
                return Err(MappingError::InvalidInput(format!(
                    "global type keyed '{}' has id '{}'",
                    key, global_type.id
                )));
            }
        }
        for (code, mapping) in &self.source_mappings {
            mapping.validate(code, &self.global_types)?;
        }
        Ok(())
    }

    /// Source codes whose type lists reference `global_type`
    pub fn sources_referencing(&self, global_type: &str) -> Vec<String> {
        self.source_mappings
            .iter()
            .filter(|(_, m)| m.type_list.iter().any(|t| t.global_type == global_type))
            .map(|(code, _)| code.clone())
            .collect()
    }

    /// Global types sorted by priority, then id
    pub fn global_types_by_priority(&self) -> Vec<&GlobalType> {
        let mut types: Vec<_> = self.global_types.values().collect();
        types.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        types
    }

    pub fn stamp(&mut self) {
        self.last_updated = chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string();
    }
}
