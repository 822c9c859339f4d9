//! Structured plan model and its bulleted-text codec.
//!
//! The plan section of a note is stored as text:
//!
//! ```text
//! 1. J20.9 - Bronchitis
//!   • Lab: CBC [Quest: 6399, CPT: 85025]
//!   • Rx: Benzonatate 100 mg
//!
//! 2. I10 - Hypertension
//!   • Lab: BMP
//! ```
//!
//! [`decode_plan`] and [`encode_plan`] convert between that text and a list of [`PlanEntry`]
//! values; `decode_plan(&encode_plan(entries)) == entries` for entries whose diagnoses and
//! orders are trimmed, single-line and non-empty. [`Plan`] adds the editing operations the
//! charting surface performs on the structured form.

use crate::constants::{BLOCK_SEPARATOR, PLAN_ORDER_BULLET, PLAN_ORDER_PREFIX, UNASSIGNED_DIAGNOSIS_LABEL};
use crate::diagnosis::{extract_diagnosis, strip_list_number};
use crate::{ChartError, ChartResult};
use chartnote_types::NonEmptyText;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static DIAGNOSIS_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\s*(.+)$").expect("plan diagnosis pattern is valid"));

/// One diagnosis and the orders placed against it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub diagnosis: NonEmptyText,
    #[serde(default)]
    pub orders: Vec<String>,
}

impl PlanEntry {
    pub fn new(diagnosis: NonEmptyText) -> Self {
        Self {
            diagnosis,
            orders: Vec::new(),
        }
    }

    pub fn with_orders<I, S>(diagnosis: NonEmptyText, orders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            diagnosis,
            orders: orders.into_iter().map(Into::into).collect(),
        }
    }
}

/// Result of decoding plan text, including lines that had no diagnosis to attach to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PlanDecode {
    pub entries: Vec<PlanEntry>,
    /// Non-blank lines that appeared before the first numbered diagnosis line.
    pub orphaned_lines: Vec<String>,
}

/// Decode plan text into entries, discarding lines before the first diagnosis.
pub fn decode_plan(text: &str) -> Vec<PlanEntry> {
    decode_plan_report(text).entries
}

/// Decode plan text and report the lines that were discarded.
pub fn decode_plan_report(text: &str) -> PlanDecode {
    let mut decoded = PlanDecode::default();
    let mut current: Option<PlanEntry> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = DIAGNOSIS_LINE.captures(line) {
            if let Ok(diagnosis) = NonEmptyText::new(&caps[1]) {
                decoded.entries.extend(current.take());
                current = Some(PlanEntry::new(diagnosis));
                continue;
            }
        }

        let order = match strip_order_marker(line) {
            Some(rest) => rest,
            None => line,
        };
        if order.is_empty() {
            continue;
        }

        match current.as_mut() {
            Some(entry) => entry.orders.push(order.to_string()),
            None => decoded.orphaned_lines.push(line.to_string()),
        }
    }
    decoded.entries.extend(current);

    if !decoded.orphaned_lines.is_empty() {
        tracing::warn!(
            discarded = decoded.orphaned_lines.len(),
            "plan text has lines before the first diagnosis"
        );
    }

    decoded
}

/// Render entries as numbered diagnoses with bulleted orders, one blank line between entries.
pub fn encode_plan(entries: &[PlanEntry]) -> String {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let mut block = format!("{}. {}", index + 1, entry.diagnosis);
            for order in &entry.orders {
                block.push('\n');
                block.push_str(PLAN_ORDER_PREFIX);
                block.push_str(order);
            }
            block
        })
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

/// Append `diagnosis` to `assessment` as the next numbered line, unless the assessment already
/// lists it (list numbers and ASCII case ignored) or it is the unassigned placeholder.
pub fn append_to_assessment(assessment: &str, diagnosis: &str) -> String {
    let diagnosis = strip_list_number(diagnosis);
    let listed = assessment
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>();

    if diagnosis.is_empty()
        || diagnosis.eq_ignore_ascii_case(UNASSIGNED_DIAGNOSIS_LABEL)
        || listed
            .iter()
            .any(|l| strip_list_number(l).eq_ignore_ascii_case(diagnosis))
    {
        return assessment.to_string();
    }

    let mut merged = assessment.to_string();
    if !merged.is_empty() && !merged.ends_with('\n') {
        merged.push('\n');
    }
    merged.push_str(&format!("{}. {}", listed.len() + 1, diagnosis));
    merged
}

/// True for lines that belong inside a structured plan block: numbered diagnoses and bullets.
pub(crate) fn is_plan_continuation(line: &str) -> bool {
    let line = line.trim();
    DIAGNOSIS_LINE.is_match(line) || strip_order_marker(line).is_some()
}

fn strip_order_marker(line: &str) -> Option<&str> {
    line.strip_prefix(PLAN_ORDER_BULLET)
        .or_else(|| line.strip_prefix('-'))
        .map(str::trim)
}

fn single_line(text: &str) -> ChartResult<String> {
    let trimmed = NonEmptyText::new(text)?;
    if trimmed.as_str().contains(['\n', '\r']) {
        return Err(ChartError::InvalidInput(
            "order text must be a single line".into(),
        ));
    }
    Ok(trimmed.into_string())
}

/// Ordered list of plan entries with the editing operations of the charting surface.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Plan {
    entries: Vec<PlanEntry>,
}

impl Plan {
    pub fn new(entries: Vec<PlanEntry>) -> Self {
        Self { entries }
    }

    pub fn from_text(text: &str) -> Self {
        Self::new(decode_plan(text))
    }

    pub fn to_text(&self) -> String {
        encode_plan(&self.entries)
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<PlanEntry> {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Index of the entry for `label`: exact diagnosis text first, then same leading ICD-10 code.
    pub fn find_entry(&self, label: &str) -> Option<usize> {
        let label = label.trim();
        if let Some(index) = self.entries.iter().position(|e| e.diagnosis == label) {
            return Some(index);
        }

        let code = extract_diagnosis(label).code?;
        self.entries
            .iter()
            .position(|e| extract_diagnosis(e.diagnosis.as_str()).code.as_deref() == Some(&code))
    }

    /// Append an empty entry for `label` unless one with the same label already exists.
    ///
    /// Returns the index of the new or existing entry.
    pub fn add_diagnosis(&mut self, label: &str) -> ChartResult<usize> {
        let diagnosis = NonEmptyText::new(strip_list_number(label))?;
        if let Some(index) = self.position_ignore_case(diagnosis.as_str()) {
            return Ok(index);
        }
        self.entries.push(PlanEntry::new(diagnosis));
        Ok(self.entries.len() - 1)
    }

    /// Append `order` to the entry for `diagnosis`, creating the entry if needed.
    ///
    /// Returns the index of the entry the order was added to.
    pub fn add_order(&mut self, diagnosis: &str, order: &str) -> ChartResult<usize> {
        let order = single_line(order)?;
        let raw = diagnosis.trim();
        let clean = strip_list_number(raw);

        let existing = self
            .entries
            .iter()
            .position(|e| e.diagnosis == raw || e.diagnosis == clean);

        match existing {
            Some(index) => {
                self.entries[index].orders.push(order);
                Ok(index)
            }
            None => {
                let diagnosis = NonEmptyText::new(clean)?;
                self.entries.push(PlanEntry::with_orders(diagnosis, [order]));
                Ok(self.entries.len() - 1)
            }
        }
    }

    pub fn edit_order(&mut self, entry: usize, order: usize, text: &str) -> ChartResult<()> {
        let text = single_line(text)?;
        let slot = self.order_mut(entry, order)?;
        *slot = text;
        Ok(())
    }

    /// Remove one order. Removing the last order of an entry removes the entry.
    ///
    /// Returns the removed order text.
    pub fn remove_order(&mut self, entry: usize, order: usize) -> ChartResult<String> {
        self.order_mut(entry, order)?;
        let orders = &mut self.entries[entry].orders;
        let removed = orders.remove(order);
        if orders.is_empty() {
            self.entries.remove(entry);
        }
        Ok(removed)
    }

    pub fn remove_entry(&mut self, entry: usize) -> ChartResult<PlanEntry> {
        if entry >= self.entries.len() {
            return Err(ChartError::PlanEntryOutOfRange { entry });
        }
        Ok(self.entries.remove(entry))
    }

    pub fn rename_diagnosis(&mut self, old: &str, new: NonEmptyText) -> ChartResult<()> {
        let index = self
            .find_entry(old)
            .ok_or_else(|| ChartError::DiagnosisNotFound(old.trim().to_string()))?;
        self.entries[index].diagnosis = new;
        Ok(())
    }

    /// Remove the entry for `label`, moving its orders under `orphan_label`.
    pub fn remove_diagnosis(&mut self, label: &str, orphan_label: &NonEmptyText) -> ChartResult<()> {
        let index = self
            .find_entry(label)
            .ok_or_else(|| ChartError::DiagnosisNotFound(label.trim().to_string()))?;
        let removed = self.entries.remove(index);
        if removed.orders.is_empty() {
            return Ok(());
        }

        match self.entries.iter().position(|e| &e.diagnosis == orphan_label) {
            Some(orphans) => self.entries[orphans].orders.extend(removed.orders),
            None => self
                .entries
                .push(PlanEntry::with_orders(orphan_label.clone(), removed.orders)),
        }
        Ok(())
    }

    /// Add an empty entry for every assessment line not yet in the plan.
    ///
    /// Returns the number of entries added.
    pub fn sync_from_assessment(&mut self, assessment: &str) -> usize {
        let mut added = 0;
        for line in assessment.lines() {
            let Ok(diagnosis) = NonEmptyText::new(strip_list_number(line)) else {
                continue;
            };
            if self.position_ignore_case(diagnosis.as_str()).is_none() {
                self.entries.push(PlanEntry::new(diagnosis));
                added += 1;
            }
        }
        added
    }

    /// Append plan diagnoses missing from `assessment` as numbered lines.
    pub fn merge_into_assessment(&self, assessment: &str) -> String {
        self.entries
            .iter()
            .fold(assessment.to_string(), |merged, entry| {
                append_to_assessment(&merged, entry.diagnosis.as_str())
            })
    }

    fn position_ignore_case(&self, label: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| strip_list_number(e.diagnosis.as_str()).eq_ignore_ascii_case(label))
    }

    fn order_mut(&mut self, entry: usize, order: usize) -> ChartResult<&mut String> {
        let plan_entry = self
            .entries
            .get_mut(entry)
            .ok_or(ChartError::PlanEntryOutOfRange { entry })?;
        plan_entry
            .orders
            .get_mut(order)
            .ok_or(ChartError::PlanOrderOutOfRange { entry, order })
    }
}

impl From<Vec<PlanEntry>> for Plan {
    fn from(entries: Vec<PlanEntry>) -> Self {
        Self::new(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> NonEmptyText {
        NonEmptyText::new(s).unwrap()
    }

    #[test]
    fn encodes_single_entry() {
        let entries = vec![PlanEntry::with_orders(text("I10 - Hypertension"), ["Lab: BMP"])];
        assert_eq!(encode_plan(&entries), "1. I10 - Hypertension\n  • Lab: BMP");
    }

    #[test]
    fn encodes_entries_with_blank_line_between() {
        let entries = vec![
            PlanEntry::with_orders(text("HTN"), ["Continue lisinopril"]),
            PlanEntry::new(text("DM2")),
        ];
        assert_eq!(encode_plan(&entries), "1. HTN\n  • Continue lisinopril\n\n2. DM2");
        assert_eq!(encode_plan(&[]), "");
    }

    #[test]
    fn decodes_bullets_dashes_and_bare_lines() {
        let entries = decode_plan("1. HTN\n  • Continue lisinopril\n  - Recheck BP\nLow salt diet\n2. DM2\n  • Check A1c");
        assert_eq!(
            entries,
            vec![
                PlanEntry::with_orders(
                    text("HTN"),
                    ["Continue lisinopril", "Recheck BP", "Low salt diet"]
                ),
                PlanEntry::with_orders(text("DM2"), ["Check A1c"]),
            ]
        );
    }

    #[test]
    fn diagnosis_without_orders_still_yields_entry() {
        let entries = decode_plan("1. Obesity\n\n2. HTN\n  • Lab: BMP");
        assert_eq!(entries[0], PlanEntry::new(text("Obesity")));
        assert_eq!(entries[1].orders, vec!["Lab: BMP"]);
    }

    #[test]
    fn reports_lines_before_first_diagnosis() {
        let decoded = decode_plan_report("Follow up in 2 weeks\n• stray\n1. HTN\n  • Lab: BMP");
        assert_eq!(decoded.orphaned_lines, vec!["Follow up in 2 weeks", "• stray"]);
        assert_eq!(decoded.entries.len(), 1);
    }

    #[test]
    fn skips_empty_bullets() {
        let entries = decode_plan("1. HTN\n  •\n  -   \n  • Lab: BMP");
        assert_eq!(entries[0].orders, vec!["Lab: BMP"]);
    }

    #[test]
    fn only_the_first_marker_is_stripped() {
        let entries = vec![PlanEntry::with_orders(text("HTN"), ["- taper", "• two"])];
        assert_eq!(decode_plan(&encode_plan(&entries)), entries);
    }

    #[test]
    fn add_order_appends_to_existing_entry_or_creates_one() {
        let mut plan = Plan::default();
        assert_eq!(plan.add_order("1. HTN", "Lab: BMP").unwrap(), 0);
        assert_eq!(plan.add_order("HTN", "Rx: Lisinopril").unwrap(), 0);
        assert_eq!(plan.add_order("DM2", "Lab: A1c").unwrap(), 1);
        assert_eq!(plan.entries()[0].orders, vec!["Lab: BMP", "Rx: Lisinopril"]);
        assert_eq!(plan.entries()[1].diagnosis, "DM2");
    }

    #[test]
    fn add_order_rejects_blank_and_multiline_orders() {
        let mut plan = Plan::default();
        assert!(matches!(plan.add_order("HTN", "  "), Err(ChartError::Text(_))));
        assert!(matches!(
            plan.add_order("HTN", "Lab: BMP\nLab: CBC"),
            Err(ChartError::InvalidInput(_))
        ));
        assert!(plan.is_empty());
    }

    #[test]
    fn removing_last_order_removes_entry() {
        let mut plan = Plan::new(vec![
            PlanEntry::with_orders(text("HTN"), ["Lab: BMP", "Rx: Lisinopril"]),
            PlanEntry::with_orders(text("DM2"), ["Lab: A1c"]),
        ]);
        assert_eq!(plan.remove_order(0, 0).unwrap(), "Lab: BMP");
        assert_eq!(plan.len(), 2);
        plan.remove_order(1, 0).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.entries()[0].diagnosis, "HTN");
    }

    #[test]
    fn index_errors_are_reported() {
        let mut plan = Plan::new(vec![PlanEntry::with_orders(text("HTN"), ["Lab: BMP"])]);
        assert!(matches!(
            plan.remove_order(3, 0),
            Err(ChartError::PlanEntryOutOfRange { entry: 3 })
        ));
        assert!(matches!(
            plan.edit_order(0, 2, "Lab: CMP"),
            Err(ChartError::PlanOrderOutOfRange { entry: 0, order: 2 })
        ));
        assert!(plan.remove_entry(1).is_err());
        plan.edit_order(0, 0, " Lab: CMP ").unwrap();
        assert_eq!(plan.entries()[0].orders, vec!["Lab: CMP"]);
    }

    #[test]
    fn find_entry_matches_text_then_icd_code() {
        let plan = Plan::new(vec![
            PlanEntry::new(text("HTN")),
            PlanEntry::new(text("J20.9 - Acute bronchitis")),
        ]);
        assert_eq!(plan.find_entry("HTN"), Some(0));
        assert_eq!(plan.find_entry("J20.9 - Bronchitis, acute"), Some(1));
        assert_eq!(plan.find_entry("J20.8 - Bronchitis"), None);
        assert_eq!(plan.find_entry("htn"), None);
    }

    #[test]
    fn rename_diagnosis_relabels_entry() {
        let mut plan = Plan::new(vec![PlanEntry::with_orders(text("HTN"), ["Lab: BMP"])]);
        plan.rename_diagnosis("HTN", text("I10 - Essential hypertension"))
            .unwrap();
        assert_eq!(plan.entries()[0].diagnosis, "I10 - Essential hypertension");
        assert!(matches!(
            plan.rename_diagnosis("DM2", text("E11.9 - DM2")),
            Err(ChartError::DiagnosisNotFound(_))
        ));
    }

    #[test]
    fn remove_diagnosis_moves_orders_to_orphan_entry() {
        let other = text("Other");
        let mut plan = Plan::new(vec![
            PlanEntry::with_orders(text("HTN"), ["Lab: BMP"]),
            PlanEntry::with_orders(text("DM2"), ["Lab: A1c"]),
            PlanEntry::new(text("Obesity")),
        ]);

        plan.remove_diagnosis("HTN", &other).unwrap();
        assert_eq!(plan.entries().last().unwrap(), &PlanEntry::with_orders(text("Other"), ["Lab: BMP"]));

        plan.remove_diagnosis("DM2", &other).unwrap();
        plan.remove_diagnosis("Obesity", &other).unwrap();
        assert_eq!(
            plan.entries(),
            &[PlanEntry::with_orders(text("Other"), ["Lab: BMP", "Lab: A1c"])]
        );
    }

    #[test]
    fn sync_from_assessment_adds_missing_diagnoses_once() {
        let mut plan = Plan::new(vec![PlanEntry::with_orders(text("HTN"), ["Lab: BMP"])]);
        let added = plan.sync_from_assessment("1. htn\n2. DM2\n\n3) Obesity\n");
        assert_eq!(added, 2);
        assert_eq!(plan.sync_from_assessment("DM2"), 0);
        let labels: Vec<&str> = plan.entries().iter().map(|e| e.diagnosis.as_str()).collect();
        assert_eq!(labels, vec!["HTN", "DM2", "Obesity"]);
    }

    #[test]
    fn merge_into_assessment_numbers_new_lines() {
        let plan = Plan::new(vec![
            PlanEntry::new(text("HTN")),
            PlanEntry::new(text("DM2")),
            PlanEntry::new(text("Unassigned")),
        ]);
        assert_eq!(plan.merge_into_assessment("1. HTN"), "1. HTN\n2. DM2");
        assert_eq!(plan.merge_into_assessment(""), "1. HTN\n2. DM2");
        assert_eq!(plan.merge_into_assessment("HTN\nDM2\n"), "HTN\nDM2\n");
    }

    #[test]
    fn append_to_assessment_adds_one_new_line() {
        assert_eq!(append_to_assessment("1. HTN", "2. DM2"), "1. HTN\n2. DM2");
        assert_eq!(append_to_assessment("1. HTN\n", "dm2"), "1. HTN\n2. dm2");
        assert_eq!(append_to_assessment("1. HTN", "htn"), "1. HTN");
        assert_eq!(append_to_assessment("", "Unassigned"), "");
    }

    #[test]
    fn plan_serialises_as_entry_list() {
        let plan = Plan::new(vec![PlanEntry::with_orders(text("HTN"), ["Lab: BMP"])]);
        let json = serde_json::to_string(&plan).unwrap();
        assert_eq!(json, r#"[{"diagnosis":"HTN","orders":["Lab: BMP"]}]"#);
        let back: Plan = serde_json::from_str(r#"[{"diagnosis":" HTN "}]"#).unwrap();
        assert_eq!(back.entries()[0], PlanEntry::new(text("HTN")));
    }
}
