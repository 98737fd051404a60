//! relmap CLI - discover relationships between tables
//!
//! Usage:
//!   relmap discover <tables.json> [--min-confidence <x>] [--format <format>]
//!   relmap normalize <identifier>...
//!
//! Examples:
//!   relmap discover warehouse.json --format table
//!   relmap discover warehouse.json --preset high-precision --max-relationships 20
//!   relmap normalize orderDate DIM_CUSTOMERS

use clap::{Parser, Subcommand, ValueEnum};
use relmap::config::{DiscoveryConfig, Settings};
use relmap::discovery::{normalize_column, normalize_table, DiscoveryEngine, KeywordTables};
use relmap::DiscoveryResult;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "relmap")]
#[command(about = "relmap - infer joins, cardinality and confidence from table metadata")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (defaults to RELMAP_CONFIG, ./relmap.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover relationships in a JSON file of table definitions
    Discover {
        /// Path to the JSON file (an array of tables or {"tables": [...]})
        file: PathBuf,

        /// Scoring preset, replacing the config file's discovery section
        #[arg(short, long)]
        preset: Option<PresetArg>,

        /// Drop relationships scoring below this threshold
        #[arg(long)]
        min_confidence: Option<f64>,

        /// Keep at most this many relationships
        #[arg(long)]
        max_relationships: Option<usize>,

        /// Analyze at most this many tables
        #[arg(long)]
        max_tables: Option<usize>,

        /// Wall-clock budget in seconds
        #[arg(long, conflicts_with = "no_timeout")]
        timeout_secs: Option<f64>,

        /// Run without a wall-clock budget
        #[arg(long)]
        no_timeout: bool,

        /// Output format
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
    },

    /// Show how identifiers normalize
    Normalize {
        /// Identifiers to normalize
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[derive(Clone, ValueEnum)]
enum PresetArg {
    Balanced,
    HighPrecision,
    HighRecall,
}

impl From<PresetArg> for DiscoveryConfig {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Balanced => DiscoveryConfig::for_definitions(),
            PresetArg::HighPrecision => DiscoveryConfig::high_precision(),
            PresetArg::HighRecall => DiscoveryConfig::high_recall(),
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Indented JSON
    Pretty,
    /// One line per relationship
    Table,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    relmap::logging::init(cli.verbose, &settings.logging);

    match cli.command {
        Commands::Discover {
            file,
            preset,
            min_confidence,
            max_relationships,
            max_tables,
            timeout_secs,
            no_timeout,
            format,
        } => {
            let config = match preset {
                Some(preset) => DiscoveryConfig::from(preset),
                None => match settings.discovery_config() {
                    Ok(config) => config,
                    Err(e) => {
                        eprintln!("Config error: {}", e);
                        return ExitCode::FAILURE;
                    }
                },
            };
            let mut config = config;
            if let Some(threshold) = min_confidence {
                config = config.with_min_confidence(threshold);
            }
            if max_relationships.is_some() {
                config = config.with_max_relationships(max_relationships);
            }
            if max_tables.is_some() {
                config = config.with_max_tables(max_tables);
            }
            if no_timeout {
                config = config.with_timeout_secs(None);
            } else if timeout_secs.is_some() {
                config = config.with_timeout_secs(timeout_secs);
            }
            cmd_discover(file, config, format).await
        }
        Commands::Normalize { names } => cmd_normalize(&names),
    }
}

async fn cmd_discover(file: PathBuf, config: DiscoveryConfig, format: OutputFormat) -> ExitCode {
    let source = match fs::read_to_string(&file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", file.display(), e);
            return ExitCode::FAILURE;
        }
    };
    let payload: serde_json::Value = match serde_json::from_str(&source) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Invalid JSON in '{}': {}", file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let engine = match DiscoveryEngine::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let result = engine.discover_definitions(&payload).await;

    match format {
        OutputFormat::Json | OutputFormat::Pretty => {
            let rendered = if matches!(format, OutputFormat::Pretty) {
                serde_json::to_string_pretty(&result)
            } else {
                serde_json::to_string(&result)
            };
            match rendered {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Failed to serialize result: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
        OutputFormat::Table => print_table(&result),
    }
    ExitCode::SUCCESS
}

fn print_table(result: &DiscoveryResult) {
    let mut buffer = ryu::Buffer::new();
    for rel in &result.relationships {
        let score = (rel.confidence_score * 1000.0).round() / 1000.0;
        println!(
            "{}: {}({}) -> {}({}) [{}, {}, {} {}]",
            rel.name,
            rel.left_table,
            rel.left_columns().join(", "),
            rel.right_table,
            rel.right_columns().join(", "),
            rel.cardinality,
            rel.join_type,
            buffer.format(score),
            rel.confidence_level,
        );
    }

    let summary = &result.summary;
    println!();
    println!(
        "{} relationships across {} tables ({} columns) in {} ms",
        summary.total_relationships_found,
        summary.total_tables,
        summary.total_columns,
        summary.processing_time_ms
    );
    if summary.limited_by_timeout {
        println!("  stopped early: timeout");
    }
    if summary.limited_by_max_relationships {
        println!("  truncated: max_relationships");
    }
    if let Some(notes) = &summary.notes {
        println!("  notes: {}", notes);
    }
}

fn cmd_normalize(names: &[String]) -> ExitCode {
    let keywords = KeywordTables::standard();
    for name in names {
        let column = normalize_column(name);
        let table = normalize_table(name, keywords);
        print!("{}: column {}, table {}", name, column.canonical, table.canonical);
        if let Some(prefix) = &table.stripped_prefix {
            print!(" (prefix {})", prefix);
        }
        println!();
    }
    ExitCode::SUCCESS
}
