//! ICD-10 coded diagnosis labels.
//!
//! Diagnoses are stored as plain labels such as `"I25.3 - Aneurysm of heart"`. Requisitions
//! group orders by the leading code when there is one.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static CODED_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Z]\d{2}\.\d+)\s*-\s*(.+)$").expect("coded diagnosis pattern is valid")
});

static LIST_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+[.)]\s*").expect("list number pattern is valid"));

/// A diagnosis label split into its ICD-10 code (when present) and display name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisLabel {
    pub code: Option<String>,
    pub name: String,
}

impl DiagnosisLabel {
    /// Key used to group orders under one requisition heading.
    pub fn group_key(&self) -> &str {
        self.code.as_deref().unwrap_or(&self.name)
    }

    /// Renders the label as `"{code} - {name}"`, or just the name when uncoded.
    pub fn display(&self) -> String {
        match &self.code {
            Some(code) => format!("{code} - {}", self.name),
            None => self.name.clone(),
        }
    }
}

/// Split a diagnosis label into code and name. Never fails: labels without a dotted ICD-10
/// code come back whole as the name.
pub fn extract_diagnosis(label: &str) -> DiagnosisLabel {
    match CODED_LABEL.captures(label) {
        Some(caps) => DiagnosisLabel {
            code: Some(caps[1].to_string()),
            name: caps[2].to_string(),
        },
        None => DiagnosisLabel {
            code: None,
            name: label.to_string(),
        },
    }
}

/// Remove a leading `1.` or `1)` list number and surrounding whitespace.
pub fn strip_list_number(label: &str) -> &str {
    let trimmed = label.trim();
    match LIST_NUMBER.find(trimmed) {
        Some(m) => trimmed[m.end()..].trim(),
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_code_and_name() {
        let label = extract_diagnosis("I25.3 - Aneurysm of heart");
        assert_eq!(label.code.as_deref(), Some("I25.3"));
        assert_eq!(label.name, "Aneurysm of heart");
        assert_eq!(label.group_key(), "I25.3");
        assert_eq!(label.display(), "I25.3 - Aneurysm of heart");
    }

    #[test]
    fn tolerates_missing_spaces_around_dash() {
        let label = extract_diagnosis("J20.9-Acute bronchitis");
        assert_eq!(label.code.as_deref(), Some("J20.9"));
        assert_eq!(label.name, "Acute bronchitis");
    }

    #[test]
    fn undotted_codes_are_not_extracted() {
        let label = extract_diagnosis("I10 - Hypertension");
        assert_eq!(label.code, None);
        assert_eq!(label.name, "I10 - Hypertension");
        assert_eq!(label.group_key(), "I10 - Hypertension");
    }

    #[test]
    fn lowercase_codes_are_not_extracted() {
        assert_eq!(extract_diagnosis("j20.9 - Bronchitis").code, None);
    }

    #[test]
    fn plain_label_is_the_name() {
        let label = extract_diagnosis("Other");
        assert_eq!(label.code, None);
        assert_eq!(label.display(), "Other");
    }

    #[test]
    fn strips_list_numbers() {
        assert_eq!(strip_list_number("2. HTN"), "HTN");
        assert_eq!(strip_list_number(" 10) DM2 "), "DM2");
        assert_eq!(strip_list_number("I10 - Hypertension"), "I10 - Hypertension");
    }
}
