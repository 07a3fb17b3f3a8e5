//! NWOpen API client.
//!
//! Fetches project records from the NWO (Dutch Research Council) open project
//! API. Records are decoded one at a time so a single malformed project never
//! costs a whole page.
//!
//! API notes:
//! - `GET /Projects?page=N&pageSize=100&<filters>`
//! - Response: `{ "projects": [...] }`; an empty or short page ends the listing
//! - Members live under `project_members` (older payloads: `projectMembers`)

use crate::error::{CollabError, Result};
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// NWOpen project endpoint
pub const NWO_API_URL: &str = "https://nwopen-api.nwo.nl/NWOpen-API/api/Projects";

/// Records requested per page
pub const PAGE_SIZE: usize = 100;

/// Pause between page requests
const PAGE_DELAY: Duration = Duration::from_millis(300);

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// A project member, kept as the raw JSON object.
///
/// NWO spells the same logical field in several ways, so fields are read
/// through alias lists rather than fixed struct fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberRecord(Map<String, Value>);

impl MemberRecord {
    /// First alias holding a non-empty string value
    pub fn first_str(&self, aliases: &[&str]) -> Option<&str> {
        aliases
            .iter()
            .filter_map(|alias| self.0.get(*alias))
            .filter_map(Value::as_str)
            .find(|s| !s.is_empty())
    }
}

/// One project record as returned by the API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawProject {
    /// Grant DOI link
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub grant_id: Option<String>,
    /// NWO file number (e.g. `500.001.123`)
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub funding_scheme: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub sub_department: Option<String>,
    #[serde(default, deserialize_with = "lenient_members", skip_serializing_if = "Option::is_none")]
    pub project_members: Option<Vec<MemberRecord>>,
    #[serde(
        default,
        rename = "projectMembers",
        deserialize_with = "lenient_members",
        skip_serializing_if = "Option::is_none"
    )]
    pub project_members_camel: Option<Vec<MemberRecord>>,
}

impl RawProject {
    /// Member list. `project_members` wins whenever the key is present, even
    /// when its value is null; `projectMembers` is read only when it is absent.
    pub fn members(&self) -> &[MemberRecord] {
        self.project_members
            .as_deref()
            .or(self.project_members_camel.as_deref())
            .unwrap_or(&[])
    }
}

/// Strings pass through, numbers are stringified, anything else is absent
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Keep only object entries of a member array.
///
/// Only called for a present key, so a null or non-array value becomes an
/// empty list rather than "absent".
fn lenient_members<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<MemberRecord>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(map) => Some(MemberRecord(map)),
                    _ => None,
                })
                .collect(),
        ),
        _ => Some(Vec::new()),
    })
}

/// Which projects to request
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectFilter {
    /// Projects whose file number starts with `prefix`, optionally restricted
    /// to funding schemes starting with `scheme_prefix`
    IdPrefix {
        prefix: String,
        scheme_prefix: Option<String>,
    },
    /// Projects reported in any of `years`, optionally within one sub-department
    ReportingYears {
        years: Vec<i32>,
        department: Option<String>,
    },
}

impl ProjectFilter {
    /// Query parameters for each paginated sweep
    fn sweeps(&self) -> Vec<Vec<(&'static str, String)>> {
        match self {
            ProjectFilter::IdPrefix { prefix, .. } => vec![vec![("project_id", prefix.clone())]],
            ProjectFilter::ReportingYears { years, department } => years
                .iter()
                .map(|year| {
                    let mut params = vec![("reporting_year", year.to_string())];
                    if let Some(dept) = department {
                        params.push(("sub_department", dept.clone()));
                    }
                    params
                })
                .collect(),
        }
    }

    /// Client-side check applied to every decoded record
    pub fn accepts(&self, project: &RawProject) -> bool {
        match self {
            ProjectFilter::IdPrefix { scheme_prefix, .. } => match scheme_prefix {
                Some(prefix) => project
                    .funding_scheme
                    .as_deref()
                    .is_some_and(|scheme| scheme.starts_with(prefix.as_str())),
                None => true,
            },
            ProjectFilter::ReportingYears { department, .. } => match department {
                Some(dept) => project
                    .sub_department
                    .as_deref()
                    .is_some_and(|sub| sub.trim() == dept.trim()),
                None => true,
            },
        }
    }
}

/// One decoded page
#[derive(Debug, Default)]
pub struct ProjectPage {
    /// Number of records the API returned, decodable or not
    pub returned: usize,
    pub projects: Vec<RawProject>,
}

/// Decode a page body: either `{"projects": [...]}` or a bare array.
pub fn parse_projects_page(body: Value) -> Result<ProjectPage> {
    let records = match body {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("projects") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                return Err(CollabError::Parse(format!(
                    "`projects` is not an array: {}",
                    other
                )))
            }
        },
        other => {
            return Err(CollabError::Parse(format!(
                "Unexpected project payload: {}",
                other
            )))
        }
    };

    let returned = records.len();
    let projects = records
        .into_iter()
        .enumerate()
        .filter_map(|(idx, record)| match serde_json::from_value::<RawProject>(record) {
            Ok(project) => Some(project),
            Err(e) => {
                debug!(index = idx, error = %e, "Skipping malformed project record");
                None
            }
        })
        .collect();

    Ok(ProjectPage { returned, projects })
}

/// Load projects from a saved file (API page object or bare array)
pub fn load_projects_file(path: &Path) -> Result<Vec<RawProject>> {
    let content = std::fs::read_to_string(path)?;
    let body: Value = serde_json::from_str(&content)?;
    let page = parse_projects_page(body)?;
    info!(
        path = %path.display(),
        records = page.returned,
        decoded = page.projects.len(),
        "Loaded projects from file"
    );
    Ok(page.projects)
}

/// Save projects as `{"projects": [...]}` so the file can be re-loaded
pub fn save_projects_file(path: &Path, projects: &[RawProject]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &serde_json::json!({ "projects": projects }))?;
    info!(path = %path.display(), count = projects.len(), "Saved projects");
    Ok(())
}

/// NWOpen API client
pub struct NwoClient {
    client: Client,
    base_url: String,
}

impl NwoClient {
    /// Create a new client against `base_url` (normally [`NWO_API_URL`])
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("collabmap/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CollabError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Fetch every project matching `filter`.
    ///
    /// A failed page ends its sweep early; what was fetched so far is kept.
    pub async fn fetch_projects(&self, filter: &ProjectFilter) -> Vec<RawProject> {
        info!(filter = ?filter, "Fetching NWO projects");

        let mut all_projects = Vec::new();
        for params in filter.sweeps() {
            let fetched = self.sweep(&params, filter).await;
            all_projects.extend(fetched);
        }

        info!(total = all_projects.len(), "NWO fetch complete");
        all_projects
    }

    async fn sweep(&self, params: &[(&'static str, String)], filter: &ProjectFilter) -> Vec<RawProject> {
        let mut projects = Vec::new();
        let mut page = 1usize;

        loop {
            let result = self.fetch_page(params, page).await;
            let fetched = match result {
                Ok(fetched) => fetched,
                Err(e) => {
                    warn!(page = page, params = ?params, error = %e, "Failed to fetch page, stopping");
                    break;
                }
            };

            if fetched.returned == 0 {
                break;
            }

            let returned = fetched.returned;
            let kept: Vec<RawProject> = fetched
                .projects
                .into_iter()
                .filter(|p| filter.accepts(p))
                .collect();
            let kept_count = kept.len();
            projects.extend(kept);

            info!(
                page = page,
                kept = kept_count,
                returned = returned,
                total = projects.len(),
                "Fetched NWO page"
            );
            println!(
                "  Page {}: {}/{} matching projects (total: {})",
                page,
                kept_count,
                returned,
                projects.len()
            );

            if returned < PAGE_SIZE {
                break;
            }
            page += 1;
            tokio::time::sleep(PAGE_DELAY).await;
        }

        projects
    }

    async fn fetch_page(&self, params: &[(&'static str, String)], page: usize) -> Result<ProjectPage> {
        debug!(url = %self.base_url, page = page, "Requesting NWO page");

        let response = self
            .client
            .get(&self.base_url)
            .query(params)
            .query(&[("page", page.to_string()), ("pageSize", PAGE_SIZE.to_string())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollabError::Api {
                code: status.as_u16(),
                message: format!("NWOpen API error: {}", status),
            });
        }

        let body: Value = response.json().await?;
        parse_projects_page(body)
    }
}
