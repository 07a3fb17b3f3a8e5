//! collabmap - NWO project collaboration map builder
//!
//! Fetches NWO projects, resolves member institutions through ROR or the
//! built-in name table and writes a JSON document of institutions and
//! collaboration links.
//!
//! ## Usage
//!
//! ```bash
//! collabmap run
//! collabmap run --variant reporting --years 2023,2024 --output reporting.json
//! collabmap run --projects-file projects.json
//! collabmap names
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use collabmap::aggregate::IdentifierPolicy;
use collabmap::config::{self, RunConfig, RunOverrides, Variant};
use collabmap::names::NameTable;
use collabmap::pipeline::{self, RunOutcome};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// NWO project collaboration map builder
#[derive(Parser)]
#[command(name = "collabmap")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch projects and write the collaboration document
    Run {
        /// Collection preset
        #[arg(long, default_value = "open-science", value_parser = ["open-science", "reporting"])]
        variant: String,

        /// Output file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Max projects listed per institution (0 = no cap)
        #[arg(long)]
        project_cap: Option<usize>,

        /// Number of top collaboration pairs considered for links
        #[arg(long)]
        max_links: Option<usize>,

        /// Which identifiers make a project eligible
        #[arg(long, value_parser = ["grant-id", "grant-or-project-id"])]
        identifier_policy: Option<String>,

        /// Reporting years (e.g., "2024", "2022,2024", "2021-2024"); reporting variant only
        #[arg(long)]
        years: Option<String>,

        /// Sub-department filter; reporting variant only
        #[arg(long)]
        department: Option<String>,

        /// Read projects from a saved JSON file instead of the NWO API
        #[arg(long)]
        projects_file: Option<PathBuf>,

        /// Save fetched projects to a JSON file
        #[arg(long)]
        save_projects: Option<PathBuf>,

        /// JSON file with extra organisation-name entries
        #[arg(long)]
        name_table: Option<PathBuf>,

        /// NWOpen API endpoint
        #[arg(long)]
        nwo_url: Option<String>,

        /// ROR API endpoint
        #[arg(long)]
        ror_url: Option<String>,
    },

    /// Print the organisation-name lookup table
    Names {
        /// JSON file with extra organisation-name entries
        #[arg(long)]
        name_table: Option<PathBuf>,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    match cli.command {
        Commands::Run {
            variant,
            output,
            project_cap,
            max_links,
            identifier_policy,
            years,
            department,
            projects_file,
            save_projects,
            name_table,
            nwo_url,
            ror_url,
        } => {
            let variant: Variant = variant.parse()?;
            let overrides = RunOverrides {
                policy: identifier_policy.as_deref().map(str::parse::<IdentifierPolicy>).transpose()?,
                project_cap,
                max_links,
                years: years.as_deref().map(config::parse_years).transpose()?,
                department,
                output_path: output,
                nwo_url,
                ror_url,
                projects_file,
                save_projects,
                name_table,
            };
            let config = RunConfig::preset(variant)
                .apply(overrides)
                .context("Invalid run configuration")?;
            run_collection(config).await
        }
        Commands::Names { name_table } => print_names(name_table),
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn run_collection(config: RunConfig) -> Result<()> {
    match pipeline::run(&config).await.context("Collection run failed")? {
        RunOutcome::Written { path, document } => {
            println!("\nData saved to {}", path.display());
            println!("  - {} institutions with coordinates", document.metadata.total_institutions);
            println!("  - {} collaboration links", document.metadata.total_links);
        }
        RunOutcome::NoProjects => {
            println!("No projects fetched. Please check the API connection.");
        }
        RunOutcome::NoInstitutions { projects } => {
            println!("No institutions found in {} projects.", projects);
        }
    }
    Ok(())
}

fn print_names(name_table: Option<PathBuf>) -> Result<()> {
    let table = match name_table {
        Some(path) => NameTable::builtin_with_overrides(&path)
            .with_context(|| format!("Failed to load name table {}", path.display()))?,
        None => NameTable::builtin(),
    };

    for (variant, inst) in table.iter() {
        println!(
            "{:<50} -> {} ({:.4}, {:.4}) {}",
            variant, inst.name, inst.lat, inst.lng, inst.country_code
        );
    }
    println!("{} entries", table.len());
    Ok(())
}
