//! Output document assembly.
//!
//! Joins aggregated counts with resolved institution metadata and produces the
//! JSON document consumed by the map front-end.

use crate::aggregate::{Aggregation, ProjectInfo};
use crate::error::Result;
use crate::identity::InstitutionKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Default number of links emitted
pub const DEFAULT_MAX_LINKS: usize = 50;

/// Institution metadata from either the registry or the name table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedInstitution {
    pub name: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub country: String,
    pub country_code: String,
    pub ror_id: Option<String>,
}

impl ResolvedInstitution {
    fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lng?))
    }
}

/// Output tuning
#[derive(Debug, Clone, PartialEq)]
pub struct OutputOptions {
    /// Maximum projects listed per institution (`None` = all)
    pub project_cap: Option<usize>,
    /// Number of top-ranked pairs considered for links
    pub max_links: usize,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            project_cap: None,
            max_links: DEFAULT_MAX_LINKS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstitutionRecord {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    /// Distinct projects of this institution (before any cap)
    pub count: usize,
    pub projects: Vec<ProjectInfo>,
    pub country: String,
    pub country_code: String,
    pub ror_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkEndpoint {
    pub lat: f64,
    pub lng: f64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaborationLink {
    pub source: LinkEndpoint,
    pub target: LinkEndpoint,
    pub count: u64,
    pub scheme_counts: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub total_projects: usize,
    pub total_institutions: usize,
    pub total_links: usize,
    pub total_funding_schemes: usize,
}

/// The document written to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaborationDocument {
    pub institutions: Vec<InstitutionRecord>,
    pub links: Vec<CollaborationLink>,
    pub funding_schemes: Vec<String>,
    pub all_projects: Vec<ProjectInfo>,
    pub metadata: Metadata,
}

/// Attach metadata to every institution key that has some.
///
/// Registry keys use `registry` (ROR lookups by id); name keys use the
/// name-table entries gathered during aggregation.
pub fn resolve_institutions(
    agg: &Aggregation,
    registry: &BTreeMap<String, ResolvedInstitution>,
) -> BTreeMap<InstitutionKey, ResolvedInstitution> {
    agg.institution_projects
        .keys()
        .filter_map(|key| {
            let inst = match key {
                InstitutionKey::Registry(id) => registry.get(id).cloned(),
                InstitutionKey::Name(name) => {
                    agg.name_institutions.get(name).map(|known| ResolvedInstitution {
                        name: known.name.clone(),
                        lat: Some(known.lat),
                        lng: Some(known.lng),
                        country: known.country.clone(),
                        country_code: known.country_code.clone(),
                        ror_id: None,
                    })
                }
            };
            inst.map(|inst| (key.clone(), inst))
        })
        .collect()
}

fn endpoint(resolved: &BTreeMap<InstitutionKey, ResolvedInstitution>, key: &InstitutionKey) -> Option<LinkEndpoint> {
    let inst = resolved.get(key)?;
    let (lat, lng) = inst.coordinates()?;
    Some(LinkEndpoint {
        lat,
        lng,
        name: inst.name.clone(),
    })
}

/// Build the output document.
pub fn assemble(
    agg: &Aggregation,
    resolved: &BTreeMap<InstitutionKey, ResolvedInstitution>,
    options: &OutputOptions,
) -> CollaborationDocument {
    let institutions: Vec<InstitutionRecord> = agg
        .institution_projects
        .iter()
        .filter_map(|(key, list)| {
            let inst = resolved.get(key)?;
            let (lat, lng) = inst.coordinates()?;
            let cap = options.project_cap.unwrap_or(usize::MAX);
            Some(InstitutionRecord {
                name: inst.name.clone(),
                lat,
                lng,
                count: list.len(),
                projects: list.projects().iter().take(cap).cloned().collect(),
                country: inst.country.clone(),
                country_code: inst.country_code.clone(),
                ror_id: inst.ror_id.clone(),
            })
        })
        .collect();

    // Stable sort keeps pair order for equal totals
    let mut ranked: Vec<_> = agg.collaborations.iter().collect();
    ranked.sort_by(|a, b| Aggregation::total(b.1).cmp(&Aggregation::total(a.1)));

    let links: Vec<CollaborationLink> = ranked
        .into_iter()
        .take(options.max_links)
        .filter_map(|(pair, scheme_counts)| {
            Some(CollaborationLink {
                source: endpoint(resolved, pair.first())?,
                target: endpoint(resolved, pair.second())?,
                count: Aggregation::total(scheme_counts),
                scheme_counts: scheme_counts.clone(),
            })
        })
        .collect();

    let funding_schemes: Vec<String> = agg.funding_schemes.iter().cloned().collect();

    let metadata = Metadata {
        total_projects: agg.all_projects.len(),
        total_institutions: institutions.len(),
        total_links: links.len(),
        total_funding_schemes: funding_schemes.len(),
    };

    info!(
        institutions = metadata.total_institutions,
        links = metadata.total_links,
        "Assembled collaboration document"
    );

    CollaborationDocument {
        institutions,
        links,
        funding_schemes,
        all_projects: agg.all_projects.clone(),
        metadata,
    }
}

/// Write the document as pretty-printed JSON
pub fn write_document(path: &Path, doc: &CollaborationDocument) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, doc)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    info!(path = %path.display(), "Wrote collaboration document");
    Ok(())
}
