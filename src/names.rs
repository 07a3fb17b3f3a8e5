//! Static organisation-name lookup table.
//!
//! NWO member records often carry only a free-text `organisation` field. This
//! table maps the name variants seen in practice (abbreviations, Dutch and
//! English forms) to one canonical display name with fixed coordinates, so
//! those members can still be placed on the map without a ROR lookup.

use crate::error::{CollabError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Country used for built-in entries
pub const DEFAULT_COUNTRY: &str = "The Netherlands";

/// Country code used for built-in entries
pub const DEFAULT_COUNTRY_CODE: &str = "NL";

/// Canonical metadata for a known institution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownInstitution {
    /// Canonical display name
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_country_code")]
    pub country_code: String,
}

fn default_country() -> String {
    DEFAULT_COUNTRY.to_string()
}

fn default_country_code() -> String {
    DEFAULT_COUNTRY_CODE.to_string()
}

impl KnownInstitution {
    fn dutch(name: &str, lat: f64, lng: f64) -> Self {
        Self {
            name: name.to_string(),
            lat,
            lng,
            country: default_country(),
            country_code: default_country_code(),
        }
    }
}

/// (variant, canonical name, lat, lng)
const BUILTIN_ENTRIES: &[(&str, &str, f64, f64)] = &[
    // Universities
    ("Technische Universiteit Delft", "Delft University of Technology", 52.0024, 4.3736),
    ("TU Delft", "Delft University of Technology", 52.0024, 4.3736),
    ("Delft University of Technology", "Delft University of Technology", 52.0024, 4.3736),
    ("Technische Universiteit Eindhoven", "Eindhoven University of Technology", 51.4478, 5.4908),
    ("TU Eindhoven", "Eindhoven University of Technology", 51.4478, 5.4908),
    ("Eindhoven University of Technology", "Eindhoven University of Technology", 51.4478, 5.4908),
    ("Universiteit Twente", "University of Twente", 52.2389, 6.8497),
    ("University of Twente", "University of Twente", 52.2389, 6.8497),
    ("Rijksuniversiteit Groningen", "University of Groningen", 53.2194, 6.5665),
    ("University of Groningen", "University of Groningen", 53.2194, 6.5665),
    ("Universiteit Utrecht", "Utrecht University", 52.0853, 5.1214),
    ("Utrecht University", "Utrecht University", 52.0853, 5.1214),
    ("Universiteit Leiden", "Leiden University", 52.1575, 4.4854),
    ("Leiden University", "Leiden University", 52.1575, 4.4854),
    ("Universiteit van Amsterdam", "University of Amsterdam", 52.3556, 4.9550),
    ("University of Amsterdam", "University of Amsterdam", 52.3556, 4.9550),
    ("UvA", "University of Amsterdam", 52.3556, 4.9550),
    ("Vrije Universiteit Amsterdam", "Vrije Universiteit Amsterdam", 52.3340, 4.8659),
    ("VU Amsterdam", "Vrije Universiteit Amsterdam", 52.3340, 4.8659),
    ("Erasmus Universiteit Rotterdam", "Erasmus University Rotterdam", 51.9173, 4.5260),
    ("Erasmus University Rotterdam", "Erasmus University Rotterdam", 51.9173, 4.5260),
    ("Radboud Universiteit", "Radboud University Nijmegen", 51.8205, 5.8659),
    ("Radboud University", "Radboud University Nijmegen", 51.8205, 5.8659),
    ("Radboud University Nijmegen", "Radboud University Nijmegen", 51.8205, 5.8659),
    ("Maastricht University", "Maastricht University", 50.8465, 5.6872),
    ("Universiteit Maastricht", "Maastricht University", 50.8465, 5.6872),
    ("Tilburg University", "Tilburg University", 51.5648, 5.0434),
    ("Universiteit van Tilburg", "Tilburg University", 51.5648, 5.0434),
    ("Wageningen University", "Wageningen University & Research", 51.9692, 5.6654),
    ("Wageningen University & Research", "Wageningen University & Research", 51.9692, 5.6654),
    ("WUR", "Wageningen University & Research", 51.9692, 5.6654),
    ("Open Universiteit", "Open University of the Netherlands", 50.8882, 5.9808),
    ("Open University", "Open University of the Netherlands", 50.8882, 5.9808),
    // Medical centres
    ("Erasmus MC", "Erasmus MC", 51.9225, 4.4792),
    ("LUMC", "Leiden University Medical Center", 52.1667, 4.4792),
    ("Leiden University Medical Center", "Leiden University Medical Center", 52.1667, 4.4792),
    ("UMC Utrecht", "University Medical Center Utrecht", 52.0875, 5.1786),
    ("University Medical Center Utrecht", "University Medical Center Utrecht", 52.0875, 5.1786),
    ("UMCG", "University Medical Center Groningen", 53.2217, 6.5756),
    ("University Medical Center Groningen", "University Medical Center Groningen", 53.2217, 6.5756),
    ("Radboudumc", "Radboud University Medical Center", 51.8425, 5.8528),
    ("Radboud University Medical Center", "Radboud University Medical Center", 51.8425, 5.8528),
    ("Amsterdam UMC", "Amsterdam University Medical Centers", 52.3340, 4.8659),
    ("Amsterdam University Medical Centers", "Amsterdam University Medical Centers", 52.3340, 4.8659),
    ("VUmc", "Amsterdam UMC Location Vrije Universiteit Amsterdam", 52.3340, 4.8617),
    ("Maastricht UMC", "Maastricht University Medical Centre", 50.8442, 5.6997),
    ("Maastricht University Medical Centre", "Maastricht University Medical Centre", 50.8442, 5.6997),
    // Research institutes and infrastructure
    ("KNAW", "Royal Netherlands Academy of Arts and Sciences", 52.3702, 4.8952),
    ("Koninklijke Nederlandse Akademie van Wetenschappen", "Royal Netherlands Academy of Arts and Sciences", 52.3702, 4.8952),
    ("Royal Netherlands Academy of Arts and Sciences", "Royal Netherlands Academy of Arts and Sciences", 52.3702, 4.8952),
    ("NWO", "Netherlands Organisation for Scientific Research", 52.0840, 5.1261),
    ("SURF", "SURF", 52.0894, 5.1086),
    ("SURF - Coöperatie SURF U.A.", "SURF", 52.0894, 5.1086),
    ("Netherlands eScience Center", "Netherlands eScience Center", 52.3550, 4.9547),
    ("DANS", "Data Archiving and Networked Services", 52.0840, 5.1261),
    ("KB", "National Library of the Netherlands", 52.0799, 4.3276),
    ("Koninklijke Bibliotheek", "National Library of the Netherlands", 52.0799, 4.3276),
    ("National Library of the Netherlands", "National Library of the Netherlands", 52.0799, 4.3276),
    // Universities of applied sciences
    ("Hogeschool Utrecht", "University of Applied Sciences Utrecht", 52.0840, 5.1750),
    ("HU", "University of Applied Sciences Utrecht", 52.0840, 5.1750),
    ("Hogeschool van Amsterdam", "Amsterdam University of Applied Sciences", 52.3590, 4.9088),
    ("HvA", "Amsterdam University of Applied Sciences", 52.3590, 4.9088),
    ("Hogeschool Rotterdam", "Rotterdam University of Applied Sciences", 51.9170, 4.4846),
    ("Fontys", "Fontys University of Applied Sciences", 51.4512, 5.4823),
    ("Fontys Hogescholen", "Fontys University of Applied Sciences", 51.4512, 5.4823),
    ("Saxion", "Saxion University of Applied Sciences", 52.2215, 6.8937),
    ("Hanzehogeschool", "Hanze University of Applied Sciences", 53.2119, 6.5827),
    ("Hanze University of Applied Sciences", "Hanze University of Applied Sciences", 53.2119, 6.5827),
];

/// Read-only mapping from organisation-name variant to canonical institution.
///
/// Lookups are exact and case-sensitive.
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    entries: BTreeMap<String, KnownInstitution>,
}

impl NameTable {
    /// Built-in table of Dutch research organisations
    pub fn builtin() -> Self {
        let entries = BUILTIN_ENTRIES
            .iter()
            .map(|(variant, name, lat, lng)| {
                (variant.to_string(), KnownInstitution::dutch(name, *lat, *lng))
            })
            .collect();
        Self { entries }
    }

    /// Built-in table, extended (or overridden) by the entries in a JSON file.
    ///
    /// The file is an object mapping each variant to
    /// `{"name", "lat", "lng", "country"?, "country_code"?}`.
    pub fn builtin_with_overrides(path: &Path) -> Result<Self> {
        let mut table = Self::builtin();
        let content = std::fs::read_to_string(path)?;
        let extra: BTreeMap<String, KnownInstitution> = serde_json::from_str(&content)
            .map_err(|e| {
                CollabError::Config(format!("Invalid name table {}: {}", path.display(), e))
            })?;
        info!(path = %path.display(), entries = extra.len(), "Loaded name table overrides");
        table.entries.extend(extra);
        Ok(table)
    }

    /// Look up an already-normalized organisation name
    pub fn get(&self, variant: &str) -> Option<&KnownInstitution> {
        self.entries.get(variant)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate variants in sorted order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &KnownInstitution)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}
