//! Institution identity resolution.
//!
//! A project member is identified either by a ROR id or, failing that, by its
//! organisation name looked up in the static [`NameTable`]. Both schemes are
//! folded into one [`InstitutionKey`] so the aggregator can treat them alike.

use crate::names::{KnownInstitution, NameTable};
use crate::nwo::MemberRecord;
use std::fmt;

/// Field aliases that may carry a member's ROR id, in priority order
pub const REGISTRY_ID_ALIASES: &[&str] = &["ror", "rorId", "institution_ror"];

/// Field aliases for the free-text organisation name
pub const ORGANISATION_ALIASES: &[&str] = &["organisation"];

/// Fragment every accepted ROR id value must contain
pub const ROR_URL_FRAGMENT: &str = "ror.org/";

/// Placeholder NWO uses for "no ROR id"
const REGISTRY_PLACEHOLDER: &str = "-";

/// Separator between organisation and sub-unit in `organisation`
const ORGANISATION_DELIMITER: &str = "||";

/// Resolved identity of an institution.
///
/// `Name` is declared first so the derived ordering matches the lexicographic
/// order of the `"<tag>:<value>"` string form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InstitutionKey {
    /// Canonical display name from the name table
    Name(String),
    /// Bare ROR id (e.g. `"02e2c7k09"`)
    Registry(String),
}

impl InstitutionKey {
    pub fn tag(&self) -> &'static str {
        match self {
            InstitutionKey::Name(_) => "name",
            InstitutionKey::Registry(_) => "registry",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            InstitutionKey::Name(v) | InstitutionKey::Registry(v) => v,
        }
    }
}

impl fmt::Display for InstitutionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tag(), self.value())
    }
}

/// Outcome of resolving one member record
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedMember<'a> {
    /// Member carries a usable ROR id
    Registry(String),
    /// Member's organisation name is in the lookup table
    Known(&'a KnownInstitution),
}

impl ResolvedMember<'_> {
    pub fn key(&self) -> InstitutionKey {
        match self {
            ResolvedMember::Registry(id) => InstitutionKey::Registry(id.clone()),
            ResolvedMember::Known(inst) => InstitutionKey::Name(inst.name.clone()),
        }
    }
}

/// Resolve a member record to an institution identity.
///
/// Returns `None` when the member has neither a usable ROR id nor a known
/// organisation name; such members are left out of collaboration counts.
pub fn resolve_member<'a>(member: &MemberRecord, names: &'a NameTable) -> Option<ResolvedMember<'a>> {
    if let Some(id) = member.first_str(REGISTRY_ID_ALIASES).and_then(extract_registry_id) {
        return Some(ResolvedMember::Registry(id.to_string()));
    }

    member
        .first_str(ORGANISATION_ALIASES)
        .and_then(normalize_org_name)
        .and_then(|name| names.get(name))
        .map(ResolvedMember::Known)
}

/// Extract the bare ROR id from a value such as `https://ror.org/02e2c7k09`.
pub fn extract_registry_id(raw: &str) -> Option<&str> {
    if raw == REGISTRY_PLACEHOLDER {
        return None;
    }
    let (_, id) = raw.rsplit_once(ROR_URL_FRAGMENT)?;
    let id = id.trim();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Organisation name up to the first `||`, trimmed.
pub fn normalize_org_name(raw: &str) -> Option<&str> {
    let base = raw.split(ORGANISATION_DELIMITER).next()?.trim();
    if base.is_empty() {
        None
    } else {
        Some(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn member(value: serde_json::Value) -> MemberRecord {
        serde_json::from_value(value).expect("member record")
    }

    #[test]
    fn test_registry_id_preferred_over_name() {
        let names = NameTable::builtin();
        let m = member(json!({
            "ror": "https://ror.org/02e2c7k09",
            "organisation": "TU Delft"
        }));
        let resolved = resolve_member(&m, &names).expect("resolved");
        assert_eq!(resolved.key(), InstitutionKey::Registry("02e2c7k09".to_string()));
    }

    #[test]
    fn test_registry_aliases_in_order() {
        let names = NameTable::builtin();
        let m = member(json!({ "rorId": "https://ror.org/04pp8hn57" }));
        assert_eq!(
            resolve_member(&m, &names).map(|r| r.key()),
            Some(InstitutionKey::Registry("04pp8hn57".to_string()))
        );

        // Empty first alias falls through to the next one
        let m = member(json!({ "ror": "", "institution_ror": "https://ror.org/008xxew50" }));
        assert_eq!(
            resolve_member(&m, &names).map(|r| r.key()),
            Some(InstitutionKey::Registry("008xxew50".to_string()))
        );
    }

    #[test]
    fn test_placeholder_falls_back_to_name() {
        let names = NameTable::builtin();
        let m = member(json!({ "ror": "-", "organisation": "TU Delft||Faculty of EEMCS" }));
        let resolved = resolve_member(&m, &names).expect("resolved");
        assert_eq!(
            resolved.key(),
            InstitutionKey::Name("Delft University of Technology".to_string())
        );
        match resolved {
            ResolvedMember::Known(inst) => {
                assert_eq!(inst.lat, 52.0024);
                assert_eq!(inst.lng, 4.3736);
            }
            other => panic!("expected name-table match, got {:?}", other),
        }
    }

    #[test]
    fn test_value_without_ror_fragment_rejected() {
        assert_eq!(extract_registry_id("02e2c7k09"), None);
        assert_eq!(extract_registry_id("https://ror.org/"), None);
        assert_eq!(extract_registry_id("-"), None);
        assert_eq!(extract_registry_id("http://ror.org/02e2c7k09"), Some("02e2c7k09"));
    }

    #[test]
    fn test_unknown_member_dropped() {
        let names = NameTable::builtin();
        assert!(resolve_member(&member(json!({ "organisation": "Unknown Institute" })), &names).is_none());
        assert!(resolve_member(&member(json!({ "organisation": "tu delft" })), &names).is_none());
        assert!(resolve_member(&member(json!({ "role": "researcher" })), &names).is_none());
        assert!(resolve_member(&member(json!({ "ror": null, "organisation": null })), &names).is_none());
    }

    #[test]
    fn test_normalize_org_name() {
        assert_eq!(normalize_org_name("  Utrecht University ||Faculty"), Some("Utrecht University"));
        assert_eq!(normalize_org_name("KB"), Some("KB"));
        assert_eq!(normalize_org_name("   "), None);
        assert_eq!(normalize_org_name("||Faculty only"), None);
    }

    #[test]
    fn test_key_order_matches_string_form() {
        let mut keys = vec![
            InstitutionKey::Registry("b".to_string()),
            InstitutionKey::Name("Zeta".to_string()),
            InstitutionKey::Registry("a".to_string()),
            InstitutionKey::Name("Alpha".to_string()),
        ];
        let mut as_strings: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        keys.sort();
        as_strings.sort();
        let sorted: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(sorted, as_strings);
        assert_eq!(sorted[0], "name:Alpha");
        assert_eq!(sorted[3], "registry:b");
    }
}
