//! Configuration for vodmap paths and fetch behavior.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (VODMAP_HOME, VODMAP_MAPPING_FILE, VODMAP_SOURCES_FILE)
//! 2. Config file (.vodmap/config.yaml)
//! 3. Defaults (~/.vodmap)
//!
//! Config file discovery:
//! - Searches current directory and parents for .vodmap/config.yaml
//! - `home` is relative to the .vodmap/ directory, other paths to the
//!   project root (the directory containing .vodmap/)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::{http::DEFAULT_USER_AGENT, FetchSettings};
use crate::core::{KeywordClassifier, KeywordRule};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const MAPPING_FILE: &str = "type_mapping.json";
const SOURCES_FILE: &str = "sources.json";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub fetch: Option<FetchConfig>,
    #[serde(default)]
    pub classifier: Option<ClassifierConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .vodmap/)
    pub home: Option<String>,
    /// Mapping document (relative to project root)
    pub mapping: Option<String>,
    /// Source catalog (relative to project root)
    pub sources: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    pub timeout_seconds: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassifierConfig {
    /// Extra keyword rules, evaluated after the built-in table
    #[serde(default)]
    pub rules: Vec<KeywordRule>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// State directory
    pub home: PathBuf,
    /// Path to the mapping document
    pub mapping_file: PathBuf,
    /// Path to the source catalog
    pub sources_file: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// HTTP fetch settings
    pub fetch: FetchSettings,
    /// Extra classifier rules
    pub classifier_rules: Vec<KeywordRule>,
}

impl ResolvedConfig {
    /// Built-in classifier extended with configured rules
    pub fn classifier(&self) -> KeywordClassifier {
        KeywordClassifier::builtin().with_rules(self.classifier_rules.iter().cloned())
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".vodmap").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key).ok().map(PathBuf::from)
}

fn fetch_settings(config: Option<&FetchConfig>) -> FetchSettings {
    let defaults = FetchSettings::default();
    FetchSettings {
        timeout: config
            .and_then(|f| f.timeout_seconds)
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout),
        user_agent: config
            .and_then(|f| f.user_agent.clone())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
    }
}

/// Combine a parsed config file (if any) with env overrides and defaults
fn resolve(config_path: Option<PathBuf>, config: Option<ConfigFile>, default_home: PathBuf) -> ResolvedConfig {
    let paths = config.as_ref().map(|c| c.paths.clone()).unwrap_or_default();

    let vodmap_dir = config_path
        .as_deref()
        .and_then(Path::parent)
        .unwrap_or(Path::new("."));
    let base_dir = vodmap_dir.parent().unwrap_or(Path::new("."));

    let home = env_path("VODMAP_HOME")
        .or_else(|| paths.home.as_deref().map(|h| resolve_path(vodmap_dir, h)))
        .unwrap_or(default_home);

    let mapping_file = env_path("VODMAP_MAPPING_FILE")
        .or_else(|| paths.mapping.as_deref().map(|m| resolve_path(base_dir, m)))
        .unwrap_or_else(|| home.join(MAPPING_FILE));

    let sources_file = env_path("VODMAP_SOURCES_FILE")
        .or_else(|| paths.sources.as_deref().map(|s| resolve_path(base_dir, s)))
        .unwrap_or_else(|| home.join(SOURCES_FILE));

    let fetch = fetch_settings(config.as_ref().and_then(|c| c.fetch.as_ref()));
    let classifier_rules = config
        .and_then(|c| c.classifier)
        .map(|c| c.rules)
        .unwrap_or_default();

    ResolvedConfig {
        home,
        mapping_file,
        sources_file,
        config_file: config_path,
        fetch,
        classifier_rules,
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".vodmap");

    let config_path = find_config_file();
    let config = config_path
        .as_deref()
        .map(load_config_file)
        .transpose()?;

    Ok(resolve(config_path, config, default_home))
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let vodmap_dir = temp.path().join(".vodmap");
        std::fs::create_dir_all(&vodmap_dir).unwrap();

        let config_path = vodmap_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
paths:
  home: ./
  mapping: config/type_mapping.json
  sources: config/sources.json
fetch:
  timeout_seconds: 5
classifier:
  rules:
    - global_type: music
      keywords: ["音乐", "MV"]
"#
        )
        .unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.paths.mapping, Some("config/type_mapping.json".to_string()));
        assert_eq!(config.fetch.as_ref().unwrap().timeout_seconds, Some(5));
        assert_eq!(config.classifier.as_ref().unwrap().rules[0].global_type, "music");
    }

    #[test]
    fn test_resolve_relative_to_project_root() {
        let config_path = PathBuf::from("/project/.vodmap/config.yaml");
        let config: ConfigFile = serde_yaml::from_str(
            r#"
version: "1.0"
paths:
  mapping: data/type_mapping.json
fetch:
  timeout_seconds: 10
  user_agent: vodmap-test
"#,
        )
        .unwrap();

        let resolved = resolve(Some(config_path.clone()), Some(config), PathBuf::from("/home/u/.vodmap"));

        if std::env::var("VODMAP_MAPPING_FILE").is_err() {
            assert_eq!(resolved.mapping_file, PathBuf::from("/project/data/type_mapping.json"));
        }
        assert_eq!(resolved.fetch.timeout, Duration::from_secs(10));
        assert_eq!(resolved.fetch.user_agent, "vodmap-test");
        assert_eq!(resolved.config_file, Some(config_path));
    }

    #[test]
    fn test_defaults_without_config_file() {
        let resolved = resolve(None, None, PathBuf::from("/home/u/.vodmap"));

        if std::env::var("VODMAP_HOME").is_err() && std::env::var("VODMAP_SOURCES_FILE").is_err() {
            assert_eq!(resolved.sources_file, PathBuf::from("/home/u/.vodmap/sources.json"));
        }
        assert_eq!(resolved.fetch.timeout, Duration::from_secs(30));
        assert!(resolved.classifier_rules.is_empty());
    }

    #[test]
    fn test_configured_classifier_rules_extend_builtin() {
        use crate::core::Classifier;

        let mut resolved = resolve(None, None, PathBuf::from("/tmp/.vodmap"));
        resolved.classifier_rules = vec![KeywordRule::new("music", &["音乐"])];

        let classifier = resolved.classifier();
        assert_eq!(classifier.classify("音乐"), Some("music".to_string()));
        assert_eq!(classifier.classify("电影"), Some("movie".to_string()));
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/subdir")
        );
    }
}
