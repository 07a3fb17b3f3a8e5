//! End-to-end run: fetch → aggregate → resolve → assemble → write.

use crate::aggregate::extract_collaborations;
use crate::config::RunConfig;
use crate::error::Result;
use crate::names::NameTable;
use crate::nwo::{self, NwoClient};
use crate::output::{assemble, resolve_institutions, write_document, CollaborationDocument};
use crate::ror::RorClient;
use std::path::PathBuf;
use tracing::info;

/// What a run produced
#[derive(Debug)]
pub enum RunOutcome {
    /// Document written to `path`
    Written {
        path: PathBuf,
        document: CollaborationDocument,
    },
    /// The fetch returned no projects; nothing written
    NoProjects,
    /// No project member resolved to an institution; nothing written
    NoInstitutions { projects: usize },
}

/// Name table for a run: built-in entries plus optional overrides
pub fn load_name_table(config: &RunConfig) -> Result<NameTable> {
    match &config.name_table {
        Some(path) => NameTable::builtin_with_overrides(path),
        None => Ok(NameTable::builtin()),
    }
}

/// Execute one collection run.
pub async fn run(config: &RunConfig) -> Result<RunOutcome> {
    let names = load_name_table(config)?;

    // Stage 1: projects
    let projects = match &config.projects_file {
        Some(path) => {
            println!("Loading projects from {}...", path.display());
            let loaded = nwo::load_projects_file(path)?;
            let total = loaded.len();
            let kept: Vec<_> = loaded
                .into_iter()
                .filter(|p| config.filter.accepts(p))
                .collect();
            println!("  {}/{} projects match the preset filter", kept.len(), total);
            kept
        }
        None => {
            println!("Fetching NWO projects...");
            let client = NwoClient::new(config.nwo_url.clone())?;
            client.fetch_projects(&config.filter).await
        }
    };

    if let Some(path) = &config.save_projects {
        nwo::save_projects_file(path, &projects)?;
    }

    if projects.is_empty() {
        return Ok(RunOutcome::NoProjects);
    }
    println!("Total projects fetched: {}", projects.len());

    // Stage 2: collaborations
    println!("Extracting collaborations...");
    let agg = extract_collaborations(&projects, &names, config.policy);
    println!("  Found {} projects with identifiers", agg.all_projects.len());
    println!("  Found {} unique institutions", agg.institution_projects.len());
    println!("  Found {} collaboration pairs", agg.collaborations.len());
    println!("  Found {} funding schemes", agg.funding_schemes.len());

    if agg.institution_projects.is_empty() {
        return Ok(RunOutcome::NoInstitutions {
            projects: agg.all_projects.len(),
        });
    }

    // Stage 3: registry metadata
    let ror_ids = agg.registry_ids();
    println!("Fetching data for {} institutions from ROR...", ror_ids.len());
    let ror_client = RorClient::new(config.ror_url.clone())?;
    let registry = ror_client.lookup_all(&ror_ids).await;

    // Stage 4: document
    let resolved = resolve_institutions(&agg, &registry);
    let document = assemble(&agg, &resolved, &config.output);
    write_document(&config.output_path, &document)?;

    info!(
        path = %config.output_path.display(),
        institutions = document.metadata.total_institutions,
        links = document.metadata.total_links,
        "Run complete"
    );

    Ok(RunOutcome::Written {
        path: config.output_path.clone(),
        document,
    })
}
