//! Collaboration extraction.
//!
//! Turns the fetched project list into a per-institution project index and a
//! table of pairwise collaboration counts, bucketed by funding scheme. Pure and
//! deterministic: every map is ordered by [`InstitutionKey`].

use crate::identity::{resolve_member, InstitutionKey, ResolvedMember};
use crate::names::{KnownInstitution, NameTable};
use crate::nwo::RawProject;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::info;

/// Characters of the title kept for display
pub const TITLE_DISPLAY_CHARS: usize = 60;

const UNTITLED: &str = "Untitled";
const UNKNOWN_SCHEME: &str = "Unknown";

/// Which identifiers make a project eligible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentifierPolicy {
    /// Only projects with a grant id are counted
    GrantIdOnly,
    /// Fall back to the NWO project id when the grant id is missing
    #[default]
    GrantOrProjectId,
}

/// Display summary of an accepted project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Accepted identifier (grant DOI, or project id under the fallback policy)
    pub grant_id: String,
    pub title: String,
    pub funding_scheme: String,
}

/// Unordered pair of distinct institutions, stored as `first < second`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollaborationPair {
    first: InstitutionKey,
    second: InstitutionKey,
}

impl CollaborationPair {
    /// Canonical pair for two keys; `None` when both are the same institution
    pub fn new(a: InstitutionKey, b: InstitutionKey) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { first: a, second: b }),
            std::cmp::Ordering::Greater => Some(Self { first: b, second: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn first(&self) -> &InstitutionKey {
        &self.first
    }

    pub fn second(&self) -> &InstitutionKey {
        &self.second
    }
}

/// Projects of one institution, unique by identifier, in first-seen order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstitutionProjects {
    projects: Vec<ProjectInfo>,
    seen: HashSet<String>,
}

impl InstitutionProjects {
    /// Returns false when a project with the same identifier is already listed
    fn push(&mut self, project: &ProjectInfo) -> bool {
        if !self.seen.insert(project.grant_id.clone()) {
            return false;
        }
        self.projects.push(project.clone());
        true
    }

    pub fn projects(&self) -> &[ProjectInfo] {
        &self.projects
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

/// Result of [`extract_collaborations`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub institution_projects: BTreeMap<InstitutionKey, InstitutionProjects>,
    /// Pair -> funding scheme -> number of shared projects
    pub collaborations: BTreeMap<CollaborationPair, BTreeMap<String, u64>>,
    pub funding_schemes: BTreeSet<String>,
    pub all_projects: Vec<ProjectInfo>,
    /// Metadata of institutions resolved through the name table, by canonical name
    pub name_institutions: BTreeMap<String, KnownInstitution>,
    /// Projects dropped for lack of an identifier
    pub skipped_projects: usize,
}

impl Aggregation {
    /// ROR ids among the institution keys, in key order
    pub fn registry_ids(&self) -> Vec<String> {
        self.institution_projects
            .keys()
            .filter_map(|key| match key {
                InstitutionKey::Registry(id) => Some(id.clone()),
                InstitutionKey::Name(_) => None,
            })
            .collect()
    }

    /// Sum of a pair's counts over all funding schemes
    pub fn total(scheme_counts: &BTreeMap<String, u64>) -> u64 {
        scheme_counts.values().sum()
    }
}

/// Identifier of a project under `policy`, trimmed; `None` when unusable
pub fn project_identifier(project: &RawProject, policy: IdentifierPolicy) -> Option<String> {
    let non_empty = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    match policy {
        IdentifierPolicy::GrantIdOnly => non_empty(&project.grant_id),
        IdentifierPolicy::GrantOrProjectId => {
            non_empty(&project.grant_id).or_else(|| non_empty(&project.project_id))
        }
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Build the institution index and collaboration table from fetched projects.
pub fn extract_collaborations(
    projects: &[RawProject],
    names: &NameTable,
    policy: IdentifierPolicy,
) -> Aggregation {
    let mut agg = Aggregation::default();

    for project in projects {
        let Some(identifier) = project_identifier(project, policy) else {
            agg.skipped_projects += 1;
            continue;
        };

        let funding_scheme = project
            .funding_scheme
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_SCHEME)
            .to_string();
        let title = project.title.as_deref().unwrap_or(UNTITLED);

        let info = ProjectInfo {
            grant_id: identifier,
            title: truncate_chars(title, TITLE_DISPLAY_CHARS),
            funding_scheme: funding_scheme.clone(),
        };

        agg.funding_schemes.insert(funding_scheme.clone());
        agg.all_projects.push(info.clone());

        let mut keys: BTreeSet<InstitutionKey> = BTreeSet::new();
        for member in project.members() {
            if let Some(resolved) = resolve_member(member, names) {
                // Last-seen entry wins for a canonical name
                if let ResolvedMember::Known(inst) = &resolved {
                    agg.name_institutions.insert(inst.name.clone(), (*inst).clone());
                }
                keys.insert(resolved.key());
            }
        }

        for key in &keys {
            agg.institution_projects
                .entry(key.clone())
                .or_default()
                .push(&info);
        }

        // BTreeSet iterates in sorted order, so each pair is built first < second
        let sorted: Vec<&InstitutionKey> = keys.iter().collect();
        for (i, a) in sorted.iter().enumerate() {
            for b in &sorted[i + 1..] {
                if let Some(pair) = CollaborationPair::new((*a).clone(), (*b).clone()) {
                    *agg.collaborations
                        .entry(pair)
                        .or_default()
                        .entry(funding_scheme.clone())
                        .or_insert(0) += 1;
                }
            }
        }
    }

    info!(
        projects = agg.all_projects.len(),
        skipped = agg.skipped_projects,
        institutions = agg.institution_projects.len(),
        pairs = agg.collaborations.len(),
        schemes = agg.funding_schemes.len(),
        "Extracted collaborations"
    );

    agg
}
