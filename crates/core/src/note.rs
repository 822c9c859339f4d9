//! Note composition and the note service used by the charting surface.
//!
//! [`compose_note`] is the inverse of [`parse_note`](crate::sections::parse_note): it emits the
//! non-empty sections in grammar order, each as `Header: value`, separated by blank lines. When
//! a structured plan is present it replaces the plain-text plan field.

use crate::config::CoreConfig;
use crate::constants::BLOCK_SEPARATOR;
use crate::diagnosis::{extract_diagnosis, strip_list_number};
use crate::plan::{append_to_assessment, Plan};
use crate::sections::{parse_note_with_limit, NoteSections, SectionKey, SECTION_RULES};
use crate::{ChartError, ChartResult};
use chartnote_types::NonEmptyText;
use serde::{Deserialize, Serialize};

/// Structured note as held by the editing surface: free-text sections plus the structured plan.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteDraft {
    pub sections: NoteSections,
    pub plan: Plan,
}

impl NoteDraft {
    /// Add `order` under `diagnosis` and list the diagnosis in the assessment if it is new.
    ///
    /// Returns the index of the plan entry the order was added to.
    pub fn add_order(&mut self, diagnosis: &str, order: &str) -> ChartResult<usize> {
        let index = self.plan.add_order(diagnosis, order)?;
        let label = self.plan.entries()[index].diagnosis.as_str();
        self.sections.assessment = append_to_assessment(&self.sections.assessment, label);
        Ok(index)
    }

    /// Remove a diagnosis from both the assessment and the plan.
    ///
    /// Assessment lines naming the diagnosis are deleted. The plan entry, if any, is removed and
    /// its orders move under `orphan_label`.
    ///
    /// # Errors
    ///
    /// Returns `ChartError::DiagnosisNotFound` when neither the assessment nor the plan names
    /// the diagnosis. The draft is unchanged in that case.
    pub fn remove_diagnosis(&mut self, label: &str, orphan_label: &NonEmptyText) -> ChartResult<()> {
        let wanted = strip_list_number(label);
        let lines: Vec<&str> = self
            .sections
            .assessment
            .lines()
            .filter(|l| !l.trim().is_empty())
            .collect();
        let kept: Vec<&str> = lines
            .iter()
            .copied()
            .filter(|l| !names_diagnosis(l, wanted))
            .collect();
        let in_plan = self.plan.find_entry(wanted).is_some();

        if kept.len() == lines.len() && !in_plan {
            return Err(ChartError::DiagnosisNotFound(wanted.to_string()));
        }

        if kept.len() != lines.len() {
            self.sections.assessment = kept.join("\n");
        }
        if in_plan {
            self.plan.remove_diagnosis(wanted, orphan_label)?;
        }
        Ok(())
    }
}

/// True when an assessment line names `label`: same text ignoring list number and ASCII case,
/// or the same leading ICD-10 code.
fn names_diagnosis(line: &str, label: &str) -> bool {
    let line = strip_list_number(line);
    if line.eq_ignore_ascii_case(label) {
        return true;
    }
    match (extract_diagnosis(line).code, extract_diagnosis(label).code) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Compose sections (and an optional structured plan) into one canonical document.
pub fn compose_note(sections: &NoteSections, plan: &Plan) -> String {
    let structured_plan = (!plan.is_empty()).then(|| plan.to_text());

    SECTION_RULES
        .iter()
        .filter_map(|rule| {
            let value = match (&structured_plan, rule.key) {
                (Some(plan_text), SectionKey::Plan) => plan_text.as_str(),
                _ => sections.get(rule.key),
            };
            (!value.trim().is_empty()).then(|| format!("{}: {}", rule.canonical, value))
        })
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

/// Loads and saves note documents with the configured entity decode cap.
#[derive(Clone, Debug)]
pub struct NoteService {
    max_decode_passes: usize,
}

impl NoteService {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            max_decode_passes: config.max_decode_passes(),
        }
    }

    pub fn parse(&self, document: &str) -> NoteSections {
        parse_note_with_limit(document, self.max_decode_passes)
    }

    /// Parse a stored document and rebuild the structured plan from its plan section.
    pub fn load(&self, document: &str) -> NoteDraft {
        let sections = self.parse(document);
        let plan = Plan::from_text(&sections.plan);
        tracing::debug!(
            plan_entries = plan.len(),
            "loaded note document"
        );
        NoteDraft { sections, plan }
    }

    pub fn compose(&self, sections: &NoteSections, plan: &Plan) -> String {
        compose_note(sections, plan)
    }

    pub fn save(&self, draft: &NoteDraft) -> String {
        compose_note(&draft.sections, &draft.plan)
    }
}

impl Default for NoteService {
    fn default() -> Self {
        Self::new(&CoreConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanEntry;
    use crate::sections::parse_note;
    use chartnote_types::NonEmptyText;

    fn entry(dx: &str, orders: &[&str]) -> PlanEntry {
        PlanEntry::with_orders(NonEmptyText::new(dx).unwrap(), orders.iter().copied())
    }

    #[test]
    fn composes_non_empty_sections_in_order() {
        let sections = NoteSections {
            assessment: "Bronchitis".into(),
            chief_complaint: "cough".into(),
            ros_notes: "   ".into(),
            follow_up: "2 weeks".into(),
            ..Default::default()
        };
        assert_eq!(
            compose_note(&sections, &Plan::default()),
            "Chief Complaint: cough\n\nAssessment: Bronchitis\n\nFollow Up: 2 weeks"
        );
    }

    #[test]
    fn structured_plan_replaces_plain_plan() {
        let sections = NoteSections {
            plan: "old free text".into(),
            ..Default::default()
        };
        let plan = Plan::new(vec![entry("I10 - Hypertension", &["Lab: BMP"])]);
        assert_eq!(
            compose_note(&sections, &plan),
            "Plan: 1. I10 - Hypertension\n  • Lab: BMP"
        );
        assert_eq!(compose_note(&sections, &Plan::default()), "Plan: old free text");
    }

    #[test]
    fn empty_note_composes_to_empty_document() {
        assert_eq!(compose_note(&NoteSections::default(), &Plan::default()), "");
    }

    #[test]
    fn composed_document_parses_back() {
        let sections = NoteSections {
            chief_complaint: "cough".into(),
            hpi: "3 days of productive cough\nno fever".into(),
            ros_notes: "negative except HPI".into(),
            pe_notes: "scattered rhonchi".into(),
            results: "CXR clear".into(),
            assessment: "J20.9 - Bronchitis\nI10 - Hypertension".into(),
            plan: "rest".into(),
            caregiver_training: "inhaler technique".into(),
            ascvd: "7.5%".into(),
            safety_plan: "n/a".into(),
            care_plan: "home care".into(),
            follow_up: "2 weeks".into(),
        };
        assert_eq!(parse_note(&compose_note(&sections, &Plan::default())), sections);
    }

    #[test]
    fn save_then_load_restores_structured_plan() {
        let service = NoteService::default();
        let draft = NoteDraft {
            sections: NoteSections {
                chief_complaint: "cough".into(),
                assessment: "J20.9 - Bronchitis\nI10 - Hypertension".into(),
                follow_up: "2 weeks".into(),
                ..Default::default()
            },
            plan: Plan::new(vec![
                entry("J20.9 - Bronchitis", &["Lab: CBC [Quest: 6399, CPT: 85025]", "Rx: Benzonatate"]),
                entry("I10 - Hypertension", &[]),
                entry("Other", &["Referral: Pulmonology - chronic cough"]),
            ]),
        };

        let document = service.save(&draft);
        let loaded = service.load(&document);
        assert_eq!(loaded.plan, draft.plan);
        assert_eq!(loaded.sections.chief_complaint, "cough");
        assert_eq!(loaded.sections.follow_up, "2 weeks");
        assert_eq!(loaded.sections.plan, draft.plan.to_text());
    }

    #[test]
    fn remove_diagnosis_clears_assessment_and_moves_orders() {
        let mut draft = NoteDraft {
            sections: NoteSections {
                assessment: "1. J20.9 - Bronchitis\n2. I10 - Hypertension".into(),
                ..Default::default()
            },
            plan: Plan::new(vec![
                entry("J20.9 - Bronchitis", &["Lab: CBC"]),
                entry("I10 - Hypertension", &["Lab: BMP"]),
            ]),
        };
        let orphan = NonEmptyText::new("Other").unwrap();

        draft.remove_diagnosis("J20.9 - Bronchitis", &orphan).unwrap();
        assert_eq!(draft.sections.assessment, "2. I10 - Hypertension");
        assert_eq!(
            draft.plan,
            Plan::new(vec![
                entry("I10 - Hypertension", &["Lab: BMP"]),
                entry("Other", &["Lab: CBC"]),
            ])
        );

        assert_eq!(draft.plan.sync_from_assessment(&draft.sections.assessment), 0);
    }

    #[test]
    fn remove_diagnosis_only_in_assessment() {
        let mut draft = NoteDraft {
            sections: NoteSections {
                assessment: "HTN\nJ20.9 - Acute bronchitis".into(),
                ..Default::default()
            },
            plan: Plan::default(),
        };
        let orphan = NonEmptyText::new("Other").unwrap();

        draft.remove_diagnosis("J20.9 - Bronchitis", &orphan).unwrap();
        assert_eq!(draft.sections.assessment, "HTN");
        assert!(draft.plan.is_empty());
    }

    #[test]
    fn remove_unknown_diagnosis_leaves_draft_unchanged() {
        let mut draft = NoteDraft {
            sections: NoteSections {
                assessment: "HTN".into(),
                ..Default::default()
            },
            plan: Plan::new(vec![entry("HTN", &["Lab: BMP"])]),
        };
        let before = draft.clone();
        let orphan = NonEmptyText::new("Other").unwrap();

        assert!(matches!(
            draft.remove_diagnosis("DM2", &orphan),
            Err(ChartError::DiagnosisNotFound(_))
        ));
        assert_eq!(draft, before);
    }

    #[test]
    fn add_order_lists_new_diagnosis_in_assessment() {
        let mut draft = NoteDraft {
            sections: NoteSections {
                assessment: "1. HTN".into(),
                ..Default::default()
            },
            plan: Plan::new(vec![entry("HTN", &["Lab: BMP"])]),
        };

        assert_eq!(draft.add_order("2. DM2", "Lab: A1C").unwrap(), 1);
        assert_eq!(draft.add_order("HTN", "Lab: Lipid Panel").unwrap(), 0);
        assert_eq!(draft.add_order("Unassigned", "Rx: Aspirin").unwrap(), 2);
        assert_eq!(draft.sections.assessment, "1. HTN\n2. DM2");
        assert_eq!(draft.plan.entries()[1], entry("DM2", &["Lab: A1C"]));
    }

    #[test]
    fn service_uses_configured_decode_cap() {
        let config = CoreConfig::new(1, NonEmptyText::new("Other").unwrap()).unwrap();
        let service = NoteService::new(&config);
        assert_eq!(service.parse("HPI: a &amp;amp; b").hpi, "a &amp; b");
        assert_eq!(NoteService::default().parse("HPI: a &amp;amp; b").hpi, "a & b");
    }
}
