//! Section grammar for canonical note documents.
//!
//! A note document is a sequence of `Header: value` blocks. The grammar is the ordered rule
//! table [`SECTION_RULES`]: rules are consumed left to right, so once a section has been seen
//! only strictly later sections are recognised as headers. A header for an earlier section is
//! ordinary text inside whatever section is open.
//!
//! A section value runs until the next recognised header, the end of the document, or a blank
//! line. The plan section is the exception to the blank-line rule: a structured plan separates
//! its entries with blank lines, so the plan only ends at a blank line when the next non-blank
//! line is not a numbered diagnosis or a bullet.
//!
//! Parsing never fails. Text outside any section is dropped and missing sections are empty.

use crate::constants::DEFAULT_MAX_DECODE_PASSES;
use crate::entities::decode_entities_with_limit;
use crate::plan::is_plan_continuation;
use serde::{Deserialize, Serialize};

/// Identifies one section of a note.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionKey {
    ChiefComplaint,
    Hpi,
    RosNotes,
    PeNotes,
    Results,
    Assessment,
    Plan,
    CaregiverTraining,
    Ascvd,
    SafetyPlan,
    CarePlan,
    FollowUp,
}

/// What a blank line does to an open section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BlankLine {
    Ends,
    EndsUnlessPlanContinues,
}

/// One grammar rule: the labels that open a section and how the section ends.
#[derive(Debug)]
pub struct SectionRule {
    pub key: SectionKey,
    /// Header written by the composer.
    pub canonical: &'static str,
    /// Every label accepted when parsing, matched ASCII case-insensitively.
    pub labels: &'static [&'static str],
    blank_line: BlankLine,
}

const fn rule(key: SectionKey, canonical: &'static str, labels: &'static [&'static str]) -> SectionRule {
    SectionRule {
        key,
        canonical,
        labels,
        blank_line: BlankLine::Ends,
    }
}

/// Section rules in document order.
pub const SECTION_RULES: &[SectionRule] = &[
    rule(SectionKey::ChiefComplaint, "Chief Complaint", &["Chief Complaint", "CC"]),
    rule(SectionKey::Hpi, "HPI", &["HPI", "History of Present Illness"]),
    rule(SectionKey::RosNotes, "Review of Systems", &["ROS", "Review of Systems"]),
    rule(SectionKey::PeNotes, "Physical Exam", &["PE", "Physical Exam"]),
    rule(SectionKey::Results, "Results", &["Results", "Data"]),
    rule(SectionKey::Assessment, "Assessment", &["Assessment", "A"]),
    SectionRule {
        key: SectionKey::Plan,
        canonical: "Plan",
        labels: &["Plan", "P"],
        blank_line: BlankLine::EndsUnlessPlanContinues,
    },
    rule(SectionKey::CaregiverTraining, "Caregiver Training", &["Caregiver Training", "CTS"]),
    rule(SectionKey::Ascvd, "ASCVD Risk", &["ASCVD Risk"]),
    rule(SectionKey::SafetyPlan, "Safety Plan", &["Safety Plan", "Behavioral Safety"]),
    rule(SectionKey::CarePlan, "Care Plan", &["Care Plan", "CP"]),
    rule(SectionKey::FollowUp, "Follow Up", &["Follow Up", "FU"]),
];

/// The typed sections of one visit note. Empty strings mean the section is absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoteSections {
    pub chief_complaint: String,
    pub hpi: String,
    pub ros_notes: String,
    pub pe_notes: String,
    pub results: String,
    pub assessment: String,
    pub plan: String,
    pub caregiver_training: String,
    pub ascvd: String,
    pub safety_plan: String,
    pub care_plan: String,
    pub follow_up: String,
}

impl NoteSections {
    pub fn get(&self, key: SectionKey) -> &str {
        match key {
            SectionKey::ChiefComplaint => &self.chief_complaint,
            SectionKey::Hpi => &self.hpi,
            SectionKey::RosNotes => &self.ros_notes,
            SectionKey::PeNotes => &self.pe_notes,
            SectionKey::Results => &self.results,
            SectionKey::Assessment => &self.assessment,
            SectionKey::Plan => &self.plan,
            SectionKey::CaregiverTraining => &self.caregiver_training,
            SectionKey::Ascvd => &self.ascvd,
            SectionKey::SafetyPlan => &self.safety_plan,
            SectionKey::CarePlan => &self.care_plan,
            SectionKey::FollowUp => &self.follow_up,
        }
    }

    pub fn get_mut(&mut self, key: SectionKey) -> &mut String {
        match key {
            SectionKey::ChiefComplaint => &mut self.chief_complaint,
            SectionKey::Hpi => &mut self.hpi,
            SectionKey::RosNotes => &mut self.ros_notes,
            SectionKey::PeNotes => &mut self.pe_notes,
            SectionKey::Results => &mut self.results,
            SectionKey::Assessment => &mut self.assessment,
            SectionKey::Plan => &mut self.plan,
            SectionKey::CaregiverTraining => &mut self.caregiver_training,
            SectionKey::Ascvd => &mut self.ascvd,
            SectionKey::SafetyPlan => &mut self.safety_plan,
            SectionKey::CarePlan => &mut self.care_plan,
            SectionKey::FollowUp => &mut self.follow_up,
        }
    }

    pub fn is_empty(&self) -> bool {
        SECTION_RULES
            .iter()
            .all(|rule| self.get(rule.key).trim().is_empty())
    }
}

/// Parse a note document with the default entity decode cap.
pub fn parse_note(document: &str) -> NoteSections {
    parse_note_with_limit(document, DEFAULT_MAX_DECODE_PASSES)
}

/// Parse a note document, decoding entities in each value with at most `max_decode_passes`.
pub fn parse_note_with_limit(document: &str, max_decode_passes: usize) -> NoteSections {
    let mut sections = NoteSections::default();
    let lines: Vec<&str> = document.lines().collect();

    let mut next_rule = 0;
    let mut open: Option<OpenSection<'_>> = None;

    for (index, line) in lines.iter().copied().enumerate() {
        if let Some((rule_index, rest)) = match_header(line, next_rule) {
            if let Some(section) = open.take() {
                section.close(&mut sections, max_decode_passes);
            }
            open = Some(OpenSection {
                rule_index,
                lines: vec![rest],
            });
            next_rule = rule_index + 1;
            continue;
        }

        let Some(section) = open.as_mut() else {
            continue;
        };

        if !line.trim().is_empty() {
            section.lines.push(line);
            continue;
        }

        let continues = SECTION_RULES[section.rule_index].blank_line
            == BlankLine::EndsUnlessPlanContinues
            && lines[index + 1..]
                .iter()
                .find(|l| !l.trim().is_empty())
                .is_some_and(|l| match_header(l, next_rule).is_none() && is_plan_continuation(l));

        if continues {
            section.lines.push(line);
        } else if let Some(section) = open.take() {
            section.close(&mut sections, max_decode_passes);
        }
    }

    if let Some(section) = open {
        section.close(&mut sections, max_decode_passes);
    }

    sections
}

struct OpenSection<'a> {
    rule_index: usize,
    lines: Vec<&'a str>,
}

impl OpenSection<'_> {
    fn close(self, sections: &mut NoteSections, max_decode_passes: usize) {
        let raw = self.lines.join("\n");
        let value = decode_entities_with_limit(&raw, max_decode_passes);
        *sections.get_mut(SECTION_RULES[self.rule_index].key) = value.trim().to_string();
    }
}

/// Match `line` against the headers of rules at or after `from`, returning the rule index and
/// the text after the colon.
fn match_header(line: &str, from: usize) -> Option<(usize, &str)> {
    let line = line.trim_start();
    SECTION_RULES
        .iter()
        .enumerate()
        .skip(from)
        .find_map(|(index, rule)| {
            rule.labels
                .iter()
                .find_map(|label| strip_label(line, label))
                .map(|rest| (index, rest))
        })
}

fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let head = line.get(..label.len())?;
    if !head.eq_ignore_ascii_case(label) {
        return None;
    }
    line[label.len()..].strip_prefix(':')
}
