//! Command-line interface for vodmap.
//!
//! Provides commands for looking up mappings, administering global types and
//! source mappings, discovering a source's categories, and batch
//! initialization from the source catalog.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};

use crate::adapters::HttpCategoryFetcher;
use crate::config::{self, ResolvedConfig};
use crate::core::{Classifier, ConfigStore, MappingRegistry, SyncOrchestrator};
use crate::domain::{GlobalType, SourceMapping, SourcesFile};

/// vodmap - category mapping index for video listing APIs
#[derive(Parser, Debug)]
#[command(name = "vodmap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Print results as {"success", "message", "data"} JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Mapping document to use instead of the configured one
    #[arg(long, global = true, env = "VODMAP_MAPPING_FILE")]
    pub mapping_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Translate between a source's native type ids and global types
    Lookup {
        /// Source code
        source: String,

        /// Native type id to resolve to a global type
        #[arg(short = 't', long, conflicts_with = "global_type")]
        type_id: Option<i64>,

        /// Global type to resolve to native type ids
        #[arg(short, long)]
        global_type: Option<String>,
    },

    /// Show the whole mapping document, or one source's mapping
    Show {
        /// Source code
        source: Option<String>,
    },

    /// Show mapping totals
    Stats,

    /// Dry-run the keyword classifier on a category name
    Classify {
        /// Native category name
        name: String,
    },

    /// Manage global types
    GlobalType {
        #[command(subcommand)]
        command: GlobalTypeCommands,
    },

    /// Manage source mappings
    Mapping {
        #[command(subcommand)]
        command: MappingCommands,
    },

    /// Discover a source's categories and merge them into its mapping
    Fetch {
        /// Source code
        source: String,

        /// Base URL of the source's listing API
        url: String,
    },

    /// Initialize mappings for every enabled, unmapped source
    InitAll {
        /// Source catalog (defaults to the configured sources.json)
        #[arg(long)]
        sources: Option<PathBuf>,
    },

    /// Show resolved configuration (debug)
    Config,
}

#[derive(Subcommand, Debug)]
pub enum GlobalTypeCommands {
    /// List global types by priority
    List,

    /// Create a global type
    Add(GlobalTypeArgs),

    /// Replace an existing global type
    Update(GlobalTypeArgs),

    /// Delete a global type no source references
    Delete {
        id: String,
    },
}

#[derive(clap::Args, Debug)]
pub struct GlobalTypeArgs {
    /// Stable id (e.g. "movie")
    pub id: String,

    /// Display name
    pub name: String,

    #[arg(short, long, default_value = "")]
    pub description: String,

    #[arg(short, long, default_value = "0")]
    pub priority: i32,

    /// Create the type disabled
    #[arg(long)]
    pub disabled: bool,
}

impl From<GlobalTypeArgs> for GlobalType {
    fn from(args: GlobalTypeArgs) -> Self {
        GlobalType {
            id: args.id,
            name: args.name,
            description: args.description,
            priority: args.priority,
            enabled: !args.disabled,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum MappingCommands {
    /// List source mappings with type counts
    List,

    /// Show one source mapping
    Show {
        source: String,
    },

    /// Create a source mapping from a JSON file
    Import {
        /// Source code
        source: String,

        /// JSON file holding {name, enabled, type_list}
        file: PathBuf,
    },

    /// Replace an existing source mapping from a JSON file
    Update {
        source: String,
        file: PathBuf,
    },

    /// Assign one native type to a global type ("" unmaps it)
    Set {
        source: String,
        type_id: i64,
        global_type: String,
    },

    /// Delete a source mapping
    Delete {
        source: String,
    },
}

/// Result of a command, rendered as text or JSON
struct Outcome {
    message: String,
    data: Value,
    lines: Vec<String>,
}

impl Outcome {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: Value::Null,
            lines: Vec::new(),
        }
    }

    fn with_data(mut self, data: impl Serialize) -> Result<Self> {
        self.data = serde_json::to_value(data).context("Failed to serialize command output")?;
        Ok(self)
    }

    fn with_lines(mut self, lines: Vec<String>) -> Self {
        self.lines = lines;
        self
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let json_output = self.json;

        match self.run().await {
            Ok(outcome) => {
                if json_output {
                    let body = json!({
                        "success": true,
                        "message": outcome.message,
                        "data": outcome.data,
                    });
                    println!("{}", serde_json::to_string_pretty(&body)?);
                } else {
                    for line in &outcome.lines {
                        println!("{}", line);
                    }
                    if !outcome.message.is_empty() {
                        eprintln!("{}", outcome.message);
                    }
                }
                Ok(())
            }
            Err(e) if json_output => {
                let body = json!({
                    "success": false,
                    "message": format!("{:#}", e),
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
                std::process::exit(1);
            }
            Err(e) => Err(e),
        }
    }

    async fn run(self) -> Result<Outcome> {
        let config = config::config()?;
        let mapping_file = self
            .mapping_file
            .clone()
            .unwrap_or_else(|| config.mapping_file.clone());

        match self.command {
            Commands::Lookup {
                source,
                type_id,
                global_type,
            } => {
                let registry = open_registry(&mapping_file).await?;
                lookup(&registry, &source, type_id, global_type.as_deref()).await
            }
            Commands::Show { source } => show(&open_registry(&mapping_file).await?, source.as_deref()).await,
            Commands::Stats => {
                let stats = open_registry(&mapping_file).await?.stats().await;
                let lines = vec![
                    format!("Global types: {}", stats.total_global_types),
                    format!("Sources:      {}", stats.total_sources),
                    format!("Source types: {}", stats.total_types),
                    format!("Mapped:       {}", stats.total_mapped),
                ];
                Ok(Outcome::new("").with_data(stats)?.with_lines(lines))
            }
            Commands::Classify { name } => classify(config, &name),
            Commands::GlobalType { command } => {
                global_type_command(&open_registry(&mapping_file).await?, command).await
            }
            Commands::Mapping { command } => {
                mapping_command(&open_registry(&mapping_file).await?, command).await
            }
            Commands::Fetch { source, url } => {
                let orchestrator = orchestrator(config, open_registry(&mapping_file).await?)?;
                let report = orchestrator.sync_source(&source, &url).await?;
                let lines = vec![format!(
                    "{}: {} fetched, {} new, {} classified, {} of {} unmapped",
                    report.source_code,
                    report.fetched,
                    report.discovered,
                    report.classified,
                    report.unmapped,
                    report.total
                )];
                Ok(Outcome::new("Source types fetched and merged")
                    .with_data(report)?
                    .with_lines(lines))
            }
            Commands::InitAll { sources } => {
                let path = sources.unwrap_or_else(|| config.sources_file.clone());
                let catalog = SourcesFile::load(&path)
                    .await
                    .with_context(|| format!("Failed to load source catalog: {}", path.display()))?;

                let orchestrator = orchestrator(config, open_registry(&mapping_file).await?)?;
                let report = orchestrator.initialize_all(&catalog).await;

                let mut lines = Vec::new();
                for sync in &report.succeeded {
                    lines.push(format!(
                        "ok      {:<16} {} types, {} unmapped",
                        sync.source_code, sync.total, sync.unmapped
                    ));
                }
                for (code, reason) in &report.skipped {
                    lines.push(format!("skipped {:<16} {}", code, reason));
                }
                for (code, error) in &report.failed {
                    lines.push(format!("failed  {:<16} {}", code, error));
                }

                let message = format!(
                    "Attempted {} sources: {} succeeded, {} failed",
                    report.attempted(),
                    report.succeeded.len(),
                    report.failed.len()
                );
                Ok(Outcome::new(message).with_data(report)?.with_lines(lines))
            }
            Commands::Config => show_config(config, &mapping_file),
        }
    }
}

async fn open_registry(mapping_file: &Path) -> Result<MappingRegistry> {
    MappingRegistry::open(ConfigStore::new(mapping_file))
        .await
        .with_context(|| format!("Failed to open mapping document: {}", mapping_file.display()))
}

fn orchestrator(config: &ResolvedConfig, registry: MappingRegistry) -> Result<SyncOrchestrator> {
    let fetcher = HttpCategoryFetcher::new(config.fetch.clone())?;
    Ok(SyncOrchestrator::new(
        registry,
        Arc::new(fetcher),
        Arc::new(config.classifier()),
    ))
}

async fn lookup(
    registry: &MappingRegistry,
    source: &str,
    type_id: Option<i64>,
    global_type: Option<&str>,
) -> Result<Outcome> {
    let index = registry.index();

    if let Some(type_id) = type_id {
        let name = index
            .lookup_name(source, type_id)
            .await
            .with_context(|| format!("No type {} in source '{}'", type_id, source))?;
        let global = index.lookup_global_type(source, type_id).await;

        let line = format!(
            "{}:{} ({}) -> {}",
            source,
            type_id,
            name,
            global.as_deref().unwrap_or("<unmapped>")
        );
        return Ok(Outcome::new("")
            .with_data(json!({
                "source_code": source,
                "source_type_id": type_id,
                "source_type_name": name,
                "global_type": global.unwrap_or_default(),
            }))?
            .with_lines(vec![line]));
    }

    if let Some(global_type) = global_type {
        let types = index
            .lookup_source_types(source, global_type)
            .await
            .with_context(|| format!("No mapping for '{}' in source '{}'", global_type, source))?;

        let lines = types
            .iter()
            .map(|(id, name)| format!("{:>6}  {}", id, name))
            .collect();
        let data: Vec<_> = types
            .iter()
            .map(|(id, name)| json!({"id": id, "name": name}))
            .collect();
        return Ok(Outcome::new("")
            .with_data(json!({
                "source_code": source,
                "global_type": global_type,
                "source_types": data,
            }))?
            .with_lines(lines));
    }

    show(registry, Some(source)).await
}

async fn show(registry: &MappingRegistry, source: Option<&str>) -> Result<Outcome> {
    match source {
        Some(code) => {
            let mapping = registry.source_mapping(code).await?;
            let mut lines = vec![format!(
                "{} ({}, {})",
                mapping.name,
                code,
                if mapping.enabled { "enabled" } else { "disabled" }
            )];
            lines.extend(mapping.type_list.iter().map(|t| {
                format!(
                    "{:>6}  {:<20} {}",
                    t.id,
                    t.name,
                    if t.is_mapped() { t.global_type.as_str() } else { "<unmapped>" }
                )
            }));
            Ok(Outcome::new("").with_data(mapping)?.with_lines(lines))
        }
        None => {
            let doc = registry.snapshot().await;
            let lines = vec![serde_json::to_string_pretty(doc.as_ref())?];
            Ok(Outcome::new("").with_data(doc.as_ref())?.with_lines(lines))
        }
    }
}

fn classify(config: &ResolvedConfig, name: &str) -> Result<Outcome> {
    let result = config.classifier().classify(name);
    let line = format!("{} -> {}", name, result.as_deref().unwrap_or("<unmapped>"));
    Ok(Outcome::new("")
        .with_data(json!({"name": name, "global_type": result.unwrap_or_default()}))?
        .with_lines(vec![line]))
}

async fn global_type_command(registry: &MappingRegistry, command: GlobalTypeCommands) -> Result<Outcome> {
    match command {
        GlobalTypeCommands::List => {
            let types = registry.global_types().await;
            let mut lines = vec![format!("{:<14} {:<10} {:>8}  {}", "ID", "NAME", "PRIORITY", "ENABLED")];
            lines.push("-".repeat(44));
            lines.extend(types.iter().map(|g| {
                format!("{:<14} {:<10} {:>8}  {}", g.id, g.name, g.priority, g.enabled)
            }));
            Ok(Outcome::new("").with_data(types)?.with_lines(lines))
        }
        GlobalTypeCommands::Add(args) => {
            let created = registry.create_global_type(args.into()).await?;
            Ok(Outcome::new(format!("Global type '{}' created", created.id)).with_data(created)?)
        }
        GlobalTypeCommands::Update(args) => {
            let updated = registry.update_global_type(args.into()).await?;
            Ok(Outcome::new(format!("Global type '{}' updated", updated.id)).with_data(updated)?)
        }
        GlobalTypeCommands::Delete { id } => {
            registry.delete_global_type(&id).await?;
            Ok(Outcome::new(format!("Global type '{}' deleted", id)))
        }
    }
}

async fn mapping_command(registry: &MappingRegistry, command: MappingCommands) -> Result<Outcome> {
    match command {
        MappingCommands::List => {
            let mappings = registry.source_mappings().await;
            let mut lines = vec![format!("{:<16} {:<20} {:>6} {:>7}", "SOURCE", "NAME", "TYPES", "MAPPED")];
            lines.push("-".repeat(52));
            lines.extend(mappings.iter().map(|(code, m)| {
                format!(
                    "{:<16} {:<20} {:>6} {:>7}",
                    code,
                    m.name,
                    m.type_list.len(),
                    m.mapped_count()
                )
            }));
            let data: serde_json::Map<String, Value> = mappings
                .into_iter()
                .map(|(code, m)| Ok((code, serde_json::to_value(m)?)))
                .collect::<serde_json::Result<_>>()?;
            Ok(Outcome::new("").with_data(data)?.with_lines(lines))
        }
        MappingCommands::Show { source } => show(registry, Some(&source)).await,
        MappingCommands::Import { source, file } => {
            let mapping = read_mapping_file(&file).await?;
            let saved = registry.create_source_mapping(&source, mapping).await?;
            Ok(Outcome::new(format!(
                "Source mapping '{}' created with {} types",
                source,
                saved.type_list.len()
            ))
            .with_data(saved)?)
        }
        MappingCommands::Update { source, file } => {
            let mapping = read_mapping_file(&file).await?;
            let saved = registry.update_source_mapping(&source, mapping).await?;
            Ok(Outcome::new(format!(
                "Source mapping '{}' updated with {} types",
                source,
                saved.type_list.len()
            ))
            .with_data(saved)?)
        }
        MappingCommands::Set {
            source,
            type_id,
            global_type,
        } => {
            let assigned = registry
                .assign_source_type(&source, type_id, &global_type)
                .await?;
            Ok(Outcome::new(format!("{}:{} assigned", source, type_id)).with_data(assigned)?)
        }
        MappingCommands::Delete { source } => {
            registry.delete_source_mapping(&source).await?;
            Ok(Outcome::new(format!("Source mapping '{}' deleted", source)))
        }
    }
}

async fn read_mapping_file(file: &Path) -> Result<SourceMapping> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read mapping file: {}", file.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse mapping file: {}", file.display()))
}

/// Show resolved configuration
fn show_config(config: &ResolvedConfig, mapping_file: &Path) -> Result<Outcome> {
    let lines = vec![
        "vodmap configuration".to_string(),
        "====================".to_string(),
        format!(
            "Config file:  {}",
            config
                .config_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(none, using defaults)".to_string())
        ),
        format!("Home:         {}", config.home.display()),
        format!("Mapping file: {}", mapping_file.display()),
        format!("Sources file: {}", config.sources_file.display()),
        format!("Fetch timeout: {:?}", config.fetch.timeout),
        format!("Extra classifier rules: {}", config.classifier_rules.len()),
    ];

    Ok(Outcome::new("")
        .with_data(json!({
            "config_file": config.config_file,
            "home": config.home,
            "mapping_file": mapping_file,
            "sources_file": config.sources_file,
            "fetch_timeout_seconds": config.fetch.timeout.as_secs(),
            "classifier_rules": config.classifier_rules,
        }))?
        .with_lines(lines))
}
