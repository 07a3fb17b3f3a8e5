//! ROR (Research Organization Registry) API client.
//!
//! Looks up display name, coordinates and country for each ROR id found among
//! project members. Lookups are sequential with a fixed pause to stay within
//! the public rate limit.

use crate::error::{CollabError, Result};
use crate::output::ResolvedInstitution;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// ROR v2 organizations endpoint
pub const ROR_API_URL: &str = "https://api.ror.org/organizations";

/// Pause between lookups
const LOOKUP_DELAY: Duration = Duration::from_millis(200);

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Progress is logged every this many institutions
const PROGRESS_EVERY: usize = 10;

/// Name used when the record has neither a display name nor a label
const UNKNOWN_NAME: &str = "Unknown";

// === ROR API Response Types ===

#[derive(Debug, Default, Deserialize)]
pub struct RorOrganization {
    #[serde(default)]
    locations: Vec<RorLocation>,
    #[serde(default)]
    names: Vec<RorName>,
}

#[derive(Debug, Default, Deserialize)]
struct RorLocation {
    #[serde(default)]
    geonames_details: Option<GeonamesDetails>,
}

#[derive(Debug, Default, Deserialize)]
struct GeonamesDetails {
    lat: Option<f64>,
    lng: Option<f64>,
    country_name: Option<String>,
    country_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RorName {
    value: Option<String>,
    #[serde(default)]
    types: Vec<String>,
}

/// Convert a ROR record into institution metadata.
///
/// Coordinates and country come from the first location; the name is the
/// `ror_display` entry, else the first `label`, else "Unknown".
pub fn parse_organization(ror_id: &str, org: &RorOrganization) -> ResolvedInstitution {
    let geo = org
        .locations
        .first()
        .and_then(|loc| loc.geonames_details.as_ref());

    ResolvedInstitution {
        name: display_name(&org.names),
        lat: geo.and_then(|g| g.lat),
        lng: geo.and_then(|g| g.lng),
        country: geo
            .and_then(|g| g.country_name.clone())
            .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        country_code: geo.and_then(|g| g.country_code.clone()).unwrap_or_default(),
        ror_id: Some(ror_id.to_string()),
    }
}

fn display_name(names: &[RorName]) -> String {
    let with_type = |wanted: &str| {
        names
            .iter()
            .find(|n| n.types.iter().any(|t| t == wanted))
            .and_then(|n| n.value.clone())
    };

    with_type("ror_display")
        .or_else(|| with_type("label"))
        .unwrap_or_else(|| UNKNOWN_NAME.to_string())
}

/// ROR API client
pub struct RorClient {
    client: Client,
    base_url: String,
}

impl RorClient {
    /// Create a new client against `base_url` (normally [`ROR_API_URL`])
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("collabmap/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CollabError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Look up a single ROR id
    pub async fn lookup(&self, ror_id: &str) -> Result<ResolvedInstitution> {
        let url = format!("{}/{}", self.base_url, ror_id);
        debug!(url = %url, "Querying ROR");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CollabError::Api {
                code: status.as_u16(),
                message: format!("ROR API error for {}: {}", ror_id, status),
            });
        }

        let org: RorOrganization = response
            .json()
            .await
            .map_err(|e| CollabError::Parse(format!("Failed to parse ROR record {}: {}", ror_id, e)))?;

        Ok(parse_organization(ror_id, &org))
    }

    /// Look up every id in order, skipping the ones that fail.
    pub async fn lookup_all(&self, ror_ids: &[String]) -> BTreeMap<String, ResolvedInstitution> {
        info!(count = ror_ids.len(), "Starting ROR lookups");

        let mut institutions = BTreeMap::new();

        for (idx, ror_id) in ror_ids.iter().enumerate() {
            match self.lookup(ror_id).await {
                Ok(inst) => {
                    institutions.insert(ror_id.clone(), inst);
                }
                Err(CollabError::Api { code, .. }) => {
                    warn!(ror_id = %ror_id, status = code, "Could not fetch ROR record");
                }
                Err(e) => {
                    warn!(ror_id = %ror_id, error = %e, "ROR lookup failed");
                }
            }

            if (idx + 1) % PROGRESS_EVERY == 0 {
                println!("  Processed {}/{} institutions...", idx + 1, ror_ids.len());
            }

            if idx + 1 < ror_ids.len() {
                tokio::time::sleep(LOOKUP_DELAY).await;
            }
        }

        info!(
            requested = ror_ids.len(),
            resolved = institutions.len(),
            "ROR lookups complete"
        );
        institutions
    }
}
