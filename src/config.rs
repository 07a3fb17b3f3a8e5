//! Run configuration and the two collection presets.
//!
//! `open-science` collects the Open Science NL programme (file numbers `500.*`)
//! and keeps every project per institution. `reporting` sweeps recent reporting
//! years, requires a grant id and caps each institution's project list.

use crate::aggregate::IdentifierPolicy;
use crate::error::{CollabError, Result};
use crate::nwo::{ProjectFilter, NWO_API_URL};
use crate::output::OutputOptions;
use crate::ror::ROR_API_URL;
use chrono::Datelike;
use std::path::PathBuf;
use std::str::FromStr;

/// Default output file
pub const DEFAULT_OUTPUT: &str = "collaboration_data.json";

/// File-number prefix of Open Science NL projects
pub const OPEN_SCIENCE_ID_PREFIX: &str = "500.";

/// Funding-scheme prefix of Open Science NL projects
pub const OPEN_SCIENCE_SCHEME_PREFIX: &str = "Open Science NL";

/// Reporting years covered by the `reporting` preset (ending at the current year)
pub const REPORTING_YEARS_COVERED: i32 = 3;

/// Per-institution project cap of the `reporting` preset
pub const REPORTING_PROJECT_CAP: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    OpenScience,
    Reporting,
}

impl FromStr for Variant {
    type Err = CollabError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "open-science" => Ok(Variant::OpenScience),
            "reporting" => Ok(Variant::Reporting),
            other => Err(CollabError::Config(format!("Unknown variant: {}", other))),
        }
    }
}

impl FromStr for IdentifierPolicy {
    type Err = CollabError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "grant-id" => Ok(IdentifierPolicy::GrantIdOnly),
            "grant-or-project-id" => Ok(IdentifierPolicy::GrantOrProjectId),
            other => Err(CollabError::Config(format!("Unknown identifier policy: {}", other))),
        }
    }
}

/// Everything a pipeline run needs
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub filter: ProjectFilter,
    pub policy: IdentifierPolicy,
    pub output: OutputOptions,
    pub output_path: PathBuf,
    pub nwo_url: String,
    pub ror_url: String,
    /// Read projects from this file instead of the NWO API
    pub projects_file: Option<PathBuf>,
    /// Save fetched projects here
    pub save_projects: Option<PathBuf>,
    /// Extra name-table entries
    pub name_table: Option<PathBuf>,
}

impl RunConfig {
    fn base(filter: ProjectFilter, policy: IdentifierPolicy, project_cap: Option<usize>) -> Self {
        Self {
            filter,
            policy,
            output: OutputOptions {
                project_cap,
                ..Default::default()
            },
            output_path: PathBuf::from(DEFAULT_OUTPUT),
            nwo_url: NWO_API_URL.to_string(),
            ror_url: ROR_API_URL.to_string(),
            projects_file: None,
            save_projects: None,
            name_table: None,
        }
    }

    pub fn open_science() -> Self {
        Self::base(
            ProjectFilter::IdPrefix {
                prefix: OPEN_SCIENCE_ID_PREFIX.to_string(),
                scheme_prefix: Some(OPEN_SCIENCE_SCHEME_PREFIX.to_string()),
            },
            IdentifierPolicy::GrantOrProjectId,
            None,
        )
    }

    /// Reporting preset covering the years up to and including `current_year`
    pub fn reporting(current_year: i32) -> Self {
        let first = current_year - REPORTING_YEARS_COVERED + 1;
        Self::base(
            ProjectFilter::ReportingYears {
                years: (first..=current_year).collect(),
                department: None,
            },
            IdentifierPolicy::GrantIdOnly,
            Some(REPORTING_PROJECT_CAP),
        )
    }

    pub fn preset(variant: Variant) -> Self {
        match variant {
            Variant::OpenScience => Self::open_science(),
            Variant::Reporting => Self::reporting(chrono::Local::now().year()),
        }
    }

    /// Apply command-line overrides on top of a preset
    pub fn apply(mut self, overrides: RunOverrides) -> Result<Self> {
        if let Some(policy) = overrides.policy {
            self.policy = policy;
        }
        if let Some(cap) = overrides.project_cap {
            // 0 means "no cap"
            self.output.project_cap = (cap > 0).then_some(cap);
        }
        if let Some(max_links) = overrides.max_links {
            self.output.max_links = max_links;
        }
        if let Some(path) = overrides.output_path {
            self.output_path = path;
        }
        if let Some(url) = overrides.nwo_url {
            self.nwo_url = url;
        }
        if let Some(url) = overrides.ror_url {
            self.ror_url = url;
        }
        self.projects_file = overrides.projects_file.or(self.projects_file);
        self.save_projects = overrides.save_projects.or(self.save_projects);
        self.name_table = overrides.name_table.or(self.name_table);

        if overrides.years.is_some() || overrides.department.is_some() {
            match &mut self.filter {
                ProjectFilter::ReportingYears { years, department } => {
                    if let Some(y) = overrides.years {
                        if y.is_empty() {
                            return Err(CollabError::Config("--years must list at least one year".to_string()));
                        }
                        *years = y;
                    }
                    if overrides.department.is_some() {
                        *department = overrides.department;
                    }
                }
                ProjectFilter::IdPrefix { .. } => {
                    return Err(CollabError::Config(
                        "--years and --department only apply to the reporting variant".to_string(),
                    ));
                }
            }
        }

        if self.projects_file.is_some() && self.save_projects.is_some() {
            return Err(CollabError::Config(
                "--projects-file and --save-projects cannot be combined".to_string(),
            ));
        }

        Ok(self)
    }
}

/// Optional settings taken from the command line
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub policy: Option<IdentifierPolicy>,
    pub project_cap: Option<usize>,
    pub max_links: Option<usize>,
    pub years: Option<Vec<i32>>,
    pub department: Option<String>,
    pub output_path: Option<PathBuf>,
    pub nwo_url: Option<String>,
    pub ror_url: Option<String>,
    pub projects_file: Option<PathBuf>,
    pub save_projects: Option<PathBuf>,
    pub name_table: Option<PathBuf>,
}

/// Parse a year list such as `"2023,2024"` or `"2021-2024"`
pub fn parse_years(years_str: &str) -> Result<Vec<i32>> {
    let invalid = || CollabError::Config(format!("Invalid year list: {}", years_str));

    if let Some((start, end)) = years_str.split_once('-') {
        let start: i32 = start.trim().parse().map_err(|_| invalid())?;
        let end: i32 = end.trim().parse().map_err(|_| invalid())?;
        if start > end {
            return Err(invalid());
        }
        return Ok((start..=end).collect());
    }

    years_str
        .split(',')
        .map(|y| y.trim().parse::<i32>().map_err(|_| invalid()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let open = RunConfig::open_science();
        assert_eq!(open.policy, IdentifierPolicy::GrantOrProjectId);
        assert_eq!(open.output.project_cap, None);
        assert_eq!(open.output.max_links, 50);

        let reporting = RunConfig::reporting(2025);
        assert_eq!(reporting.policy, IdentifierPolicy::GrantIdOnly);
        assert_eq!(reporting.output.project_cap, Some(15));
        assert_eq!(
            reporting.filter,
            ProjectFilter::ReportingYears {
                years: vec![2023, 2024, 2025],
                department: None
            }
        );
    }

    #[test]
    fn test_overrides() {
        let config = RunConfig::reporting(2025)
            .apply(RunOverrides {
                policy: Some(IdentifierPolicy::GrantOrProjectId),
                project_cap: Some(0),
                years: Some(vec![2020]),
                department: Some("Science".to_string()),
                ..Default::default()
            })
            .expect("valid overrides");

        assert_eq!(config.policy, IdentifierPolicy::GrantOrProjectId);
        assert_eq!(config.output.project_cap, None);
        assert_eq!(
            config.filter,
            ProjectFilter::ReportingYears {
                years: vec![2020],
                department: Some("Science".to_string())
            }
        );
    }

    #[test]
    fn test_invalid_overrides() {
        let err = RunConfig::open_science().apply(RunOverrides {
            years: Some(vec![2024]),
            ..Default::default()
        });
        assert!(matches!(err, Err(CollabError::Config(_))));

        let err = RunConfig::open_science().apply(RunOverrides {
            projects_file: Some(PathBuf::from("in.json")),
            save_projects: Some(PathBuf::from("out.json")),
            ..Default::default()
        });
        assert!(err.is_err());
    }

    #[test]
    fn test_parse_years() {
        assert_eq!(parse_years("2023").expect("single"), vec![2023]);
        assert_eq!(parse_years("2022, 2024").expect("list"), vec![2022, 2024]);
        assert_eq!(parse_years("2021-2023").expect("range"), vec![2021, 2022, 2023]);
        assert!(parse_years("2024-2020").is_err());
        assert!(parse_years("twenty").is_err());
    }

    #[test]
    fn test_from_str() {
        assert_eq!("reporting".parse::<Variant>().expect("variant"), Variant::Reporting);
        assert_eq!(
            "grant-id".parse::<IdentifierPolicy>().expect("policy"),
            IdentifierPolicy::GrantIdOnly
        );
        assert!("other".parse::<Variant>().is_err());
    }
}
