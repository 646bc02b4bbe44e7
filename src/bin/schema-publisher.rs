//! Schema Publisher CLI
//!
//! Publishes schema files to discovery registries and tears them down again

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use schema_publisher::core::config_loader::CONFIG_FILENAME;
use schema_publisher::logging::init_logging;
use schema_publisher::plugins::load_client;
use schema_publisher::{
    BatchOptions, ConfigLoadOptions, ConfigLoader, DEFAULT_REGISTRY_NAME, PublishError, PublisherConfig, RegistryOptions, Schema, SchemaDefinition, SchemaMetadata,
    SchemaPublisher, SchemaRegistrar,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

/// Schema publishing assistant for discovery registries
#[derive(Parser)]
#[command(name = "schema-publisher")]
#[command(version = "0.1.0")]
#[command(about = "Schema publishing assistant for discovery registries", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish schema files to a registry
    Publish {
        /// Schema files; the file stem is used as the schema name
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,

        /// Target registry (defaults to publisher.defaultRegistry)
        #[arg(short, long)]
        registry: Option<String>,

        /// Metadata entries as key=value
        #[arg(short, long, value_name = "KEY=VALUE")]
        metadata: Vec<String>,

        /// Maximum concurrent publishes
        #[arg(long)]
        max_concurrency: Option<usize>,

        /// Project path holding .schema-publisher.yaml (defaults to current directory)
        #[arg(long, value_name = "PROJECT_PATH")]
        project: Option<PathBuf>,
    },

    /// Validate the schema-publisher configuration
    Check {
        /// Project path (defaults to current directory)
        #[arg(value_name = "PROJECT_PATH")]
        project_path: Option<PathBuf>,
    },

    /// Write a default configuration file
    Init {
        /// Project path (defaults to current directory)
        #[arg(value_name = "PROJECT_PATH")]
        project_path: Option<PathBuf>,

        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    let result = run().await;

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("\n❌ Error");
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Publish {
            files,
            registry,
            metadata,
            max_concurrency,
            project,
        } => {
            let path = project.unwrap_or_else(|| PathBuf::from("."));
            publish_command(path, files, registry, metadata, max_concurrency).await
        }
        Commands::Check { project_path } => {
            let path = project_path.unwrap_or_else(|| PathBuf::from("."));
            check_command(path).await
        }
        Commands::Init { project_path, force } => {
            let path = project_path.unwrap_or_else(|| PathBuf::from("."));
            init_command(path, force).await
        }
    }
}

async fn load_config(
    project_path: &Path,
    cli_args: Option<PublisherConfig>,
) -> Result<PublisherConfig, PublishError> {
    let options = ConfigLoadOptions {
        project_path: project_path.to_path_buf(),
        home_dir: std::env::var_os("HOME").map(PathBuf::from),
        cli_args,
        env: std::env::vars().collect(),
    };

    ConfigLoader::load(options).await
}

fn parse_metadata(entries: &[String]) -> Result<SchemaMetadata> {
    let mut metadata = SchemaMetadata::new();
    for entry in entries {
        let (key, value) = entry
            .split_once('=')
            .with_context(|| format!("metadata entry '{}' is not KEY=VALUE", entry))?;
        metadata.put(key.trim(), value.trim());
    }
    Ok(metadata)
}

async fn read_schema(file: &Path, metadata: &SchemaMetadata) -> Result<SchemaDefinition> {
    let document = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let name = file
        .file_stem()
        .and_then(|stem| stem.to_str())
        .with_context(|| format!("cannot derive a schema name from {}", file.display()))?;

    Ok(SchemaDefinition::new(Schema::new(name, document), metadata.clone()))
}

async fn publish_command(
    project_path: PathBuf,
    files: Vec<PathBuf>,
    registry: Option<String>,
    metadata: Vec<String>,
    max_concurrency: Option<usize>,
) -> Result<i32> {
    println!("\n📦 schema-publisher\n");

    let config = load_config(
        &project_path,
        ConfigLoader::cli_overrides(registry, max_concurrency),
    )
    .await?;
    let registry_name = config.default_registry().to_string();
    let options = config.registry_options(&registry_name);
    let publish_settings = config.publish.clone().unwrap_or_default();

    let registry_client = match load_client(&options) {
        Ok(client) => client,
        Err(error) => {
            print_error(&error);
            return Ok(1);
        }
    };

    let metadata = parse_metadata(&metadata)?;
    let mut definitions = Vec::with_capacity(files.len());
    for file in &files {
        definitions.push(read_schema(file, &metadata).await?);
    }

    let registrar = Arc::new(match config.publisher.as_ref().and_then(|p| p.id.clone()) {
        Some(id) => SchemaRegistrar::with_publisher_id(id),
        None => SchemaRegistrar::new(),
    });
    let publisher = SchemaPublisher::new(registrar, registry_client).with_batch_options(BatchOptions {
        max_concurrency: publish_settings.max_concurrency,
    });

    println!("Registry: {}", registry_name);
    println!("Publisher: {}\n", publisher.publisher_id());

    let timeout = Duration::from_secs(publish_settings.timeout_secs.unwrap_or(30));
    let outcome = tokio::time::timeout(timeout, publisher.publish_all_definitions(&options, definitions)).await;

    let exit_code = match outcome {
        Ok(Ok(registrations)) => {
            for registration in &registrations {
                println!(
                    "  ✅ {} ({})",
                    registration.schema_name(),
                    registration.record().location.as_deref().unwrap_or("-")
                );
            }
            println!("\n✅ Published {} schemas", registrations.len());
            0
        }
        Ok(Err(error)) => {
            print_error(&error);
            1
        }
        Err(_) => {
            eprintln!("\n❌ Publishing timed out after {}s", timeout.as_secs());
            1
        }
    };

    // Waits for publishes the timeout left running, then unpublishes them too
    if let Err(error) = publisher.close().await {
        print_error(&error);
        return Ok(1);
    }
    println!("🧹 Unpublished all schemas and closed registry '{}'", registry_name);

    Ok(exit_code)
}

fn print_error(error: &PublishError) {
    eprintln!("\n❌ [{}] {}", error.code(), error);
    for failure in error.failures() {
        eprintln!("  - {}", failure);
    }
    for action in error.suggested_actions() {
        eprintln!("  → {}", action);
    }
}

async fn check_command(project_path: PathBuf) -> Result<i32> {
    println!("\n🔍 Configuration Check\n");

    if !project_path.join(CONFIG_FILENAME).exists() {
        println!("⚠️  No {} found, checking defaults", CONFIG_FILENAME);
    }

    let config = match load_config(&project_path, None).await {
        Ok(config) => config,
        Err(error) => {
            print_error(&error);
            return Ok(1);
        }
    };

    let result = ConfigLoader::validate(&config);
    println!("{}", ConfigLoader::format_validation_result(&result));

    let mut registries: Vec<&String> = config.registries.keys().collect();
    registries.sort();
    if !registries.is_empty() {
        println!("\nRegistries:");
        for name in registries {
            println!("  - {}", name);
        }
    }
    println!();

    Ok(if result.valid { 0 } else { 1 })
}

async fn init_command(project_path: PathBuf, force: bool) -> Result<i32> {
    println!("\n🎯 Initialize schema-publisher\n");

    let config_path = project_path.join(CONFIG_FILENAME);
    if config_path.exists() && !force {
        eprintln!("⚠️  {} already exists (use --force to overwrite)", config_path.display());
        return Ok(1);
    }

    let config = PublisherConfig {
        registries: HashMap::from([(DEFAULT_REGISTRY_NAME.to_string(), RegistryOptions::default())]),
        ..Default::default()
    };

    let yaml = serde_yaml::to_string(&config).context("failed to serialize configuration")?;
    tokio::fs::write(&config_path, yaml)
        .await
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    println!("✅ Wrote {}", config_path.display());
    Ok(0)
}
