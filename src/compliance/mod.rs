//! GDPR compliance gate
//!
//! Deliberately a two-predicate AND: a document is flagged only when it is
//! both EU-scoped and carries personal/sensitive data markers in its
//! metadata. Anything richer belongs in a policy engine, not here.

use crate::models::MetadataPair;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceResult {
    pub passed: bool,
    pub is_sensitive: bool,
    pub reason: Option<String>,
}

impl ComplianceResult {
    fn pass() -> Self {
        Self {
            passed: true,
            is_sensitive: false,
            reason: None,
        }
    }

    fn fail(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            is_sensitive: true,
            reason: Some(reason.into()),
        }
    }
}

fn mentions_eu(value: &str) -> bool {
    let lower = value.to_lowercase();
    lower.contains("eu") || lower.contains("europe")
}

fn is_personal_marker(value: &str) -> bool {
    let lower = value.to_lowercase();
    lower.contains("personal") || lower.contains("sensitive")
}

/// Check document metadata against the EU personal-data rule.
pub fn check_compliance(metadata: &[MetadataPair], region: Option<&str>) -> ComplianceResult {
    let eu_region = region.map(mentions_eu).unwrap_or(false)
        || metadata
            .iter()
            .any(|pair| pair.key.eq_ignore_ascii_case("region") && mentions_eu(&pair.value));

    let personal_data = metadata.iter().any(|pair| {
        let key = pair.key.to_lowercase();
        (key.contains("data") || key.contains("pii")) && is_personal_marker(&pair.value)
    });

    if eu_region && personal_data {
        ComplianceResult::fail(
            "Document appears to contain EU personal data and requires a GDPR review \
            before it can be published.",
        )
    } else {
        ComplianceResult::pass()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(key: &str, value: &str) -> MetadataPair {
        MetadataPair {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_eu_region_with_personal_data_fails() {
        let metadata = vec![pair("dataType", "personal")];
        let result = check_compliance(&metadata, Some("EU"));
        assert!(!result.passed);
        assert!(result.is_sensitive);
        assert!(result.reason.is_some());
    }

    #[test]
    fn test_eu_region_from_metadata_pair() {
        let metadata = vec![pair("region", "Europe West"), pair("dataType", "personal")];
        let result = check_compliance(&metadata, None);
        assert!(!result.passed);
    }

    #[test]
    fn test_eu_region_alone_passes() {
        let metadata = vec![pair("topic", "sales playbook")];
        let result = check_compliance(&metadata, Some("eu-west"));
        assert!(result.passed);
        assert!(!result.is_sensitive);
        assert!(result.reason.is_none());
    }

    #[test]
    fn test_personal_data_alone_passes() {
        let metadata = vec![pair("dataType", "personal")];
        let result = check_compliance(&metadata, Some("US"));
        assert!(result.passed);
    }

    #[test]
    fn test_pii_key_with_sensitive_value_fails_in_eu() {
        let metadata = vec![pair("piiCategory", "sensitive health records")];
        let result = check_compliance(&metadata, Some("Europe"));
        assert!(!result.passed);
    }

    #[test]
    fn test_case_insensitive_matching() {
        let metadata = vec![pair("DATA_CLASS", "PERSONAL")];
        let result = check_compliance(&metadata, Some("eUrOpE"));
        assert!(!result.passed);
    }

    #[test]
    fn test_unrelated_keys_ignored() {
        // "personal" under a key without data/pii does not trigger
        let metadata = vec![pair("notes", "personal opinion")];
        let result = check_compliance(&metadata, Some("EU"));
        assert!(result.passed);
    }

    #[test]
    fn test_no_region_no_metadata_passes() {
        let result = check_compliance(&[], None);
        assert!(result.passed);
    }
}
