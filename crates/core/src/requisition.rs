//! Printable requisitions built from a structured plan.
//!
//! Every non-blank order line of the plan becomes exactly one requisition line, grouped under
//! its diagnosis. Lines that match a canonical lab, imaging or referral order print on that
//! order's form; everything else prints as plain text. A single [`MatchingPass`] covers the
//! whole requisition, so no canonical order backs two lines.

use crate::diagnosis::{extract_diagnosis, DiagnosisLabel};
use crate::orders::line::{display_cpt, fallback_body, fallback_label};
use crate::orders::{CanonicalOrder, MatchingPass, OrderId, OrderKind};
use crate::plan::Plan;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Requisition {
    pub groups: Vec<RequisitionGroup>,
}

impl Requisition {
    /// Number of printed lines across all groups.
    pub fn line_count(&self) -> usize {
        self.groups.iter().map(|group| group.lines.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn matched_count(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|group| &group.lines)
            .filter(|line| line.matched_id().is_some())
            .count()
    }
}

/// Orders printed under one diagnosis heading.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RequisitionGroup {
    pub key: String,
    pub diagnosis: DiagnosisLabel,
    pub lines: Vec<RequisitionLine>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequisitionForm {
    Lab,
    Imaging,
    Referral,
}

impl RequisitionForm {
    fn for_kind(kind: OrderKind) -> Option<Self> {
        match kind {
            OrderKind::Lab => Some(RequisitionForm::Lab),
            OrderKind::Imaging => Some(RequisitionForm::Imaging),
            OrderKind::Referral => Some(RequisitionForm::Referral),
            OrderKind::Prescription => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequisitionLine {
    /// Printed on the canonical order's form.
    Form {
        form: RequisitionForm,
        order: CanonicalOrder,
        order_text: String,
    },
    /// Printed as text.
    Text(TextOrder),
}

impl RequisitionLine {
    pub fn matched_id(&self) -> Option<&OrderId> {
        match self {
            RequisitionLine::Form { order, .. } => Some(&order.id),
            RequisitionLine::Text(text) => text.matched_id.as_ref(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TextOrder {
    pub label: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_id: Option<OrderId>,
}

impl TextOrder {
    fn from_line(line: &str, matched_id: Option<OrderId>) -> Self {
        Self {
            label: fallback_label(line).to_string(),
            body: fallback_body(line).to_string(),
            cpt: display_cpt(line),
            matched_id,
        }
    }
}

/// Build the requisition for `plan` against the canonical orders in `pool`.
pub fn render_requisition(plan: &Plan, pool: &[CanonicalOrder]) -> Requisition {
    let mut groups: Vec<(RequisitionGroup, Vec<&str>)> = Vec::new();

    for entry in plan.entries() {
        let orders: Vec<&str> = entry
            .orders
            .iter()
            .map(|order| order.trim())
            .filter(|order| !order.is_empty())
            .collect();
        if orders.is_empty() {
            continue;
        }

        let diagnosis = extract_diagnosis(entry.diagnosis.as_str());
        let key = diagnosis.group_key().to_string();
        match groups.iter_mut().find(|(group, _)| group.key == key) {
            Some((_, items)) => items.extend(orders),
            None => groups.push((
                RequisitionGroup {
                    key,
                    diagnosis,
                    lines: Vec::new(),
                },
                orders,
            )),
        }
    }

    let mut pass = MatchingPass::new(pool);
    let groups = groups
        .into_iter()
        .map(|(mut group, items)| {
            group.lines = items
                .into_iter()
                .map(|item| {
                    let result = pass.match_and_consume(item);
                    match result.order() {
                        Some(order) => match RequisitionForm::for_kind(order.kind()) {
                            Some(form) => RequisitionLine::Form {
                                form,
                                order: order.clone(),
                                order_text: item.to_string(),
                            },
                            None => RequisitionLine::Text(TextOrder::from_line(
                                item,
                                Some(order.id.clone()),
                            )),
                        },
                        None => RequisitionLine::Text(TextOrder::from_line(item, None)),
                    }
                })
                .collect();
            group
        })
        .collect();

    let requisition = Requisition { groups };
    tracing::info!(
        lines = requisition.line_count(),
        matched = requisition.matched_count(),
        consumed = pass.tracker().len(),
        "rendered requisition"
    );
    requisition
}
