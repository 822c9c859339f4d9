//! Exact, tiered matching of plan order lines against canonical orders.
//!
//! A pool is scanned one tier at a time: every eligible record is tried on code before any is
//! tried on CPT, and every record on CPT before any on name. Only records of the line's order
//! type whose id has not been consumed in the current pass are eligible.
//!
//! Matching never mutates anything. Consumption is explicit through [`ConsumptionTracker`], and
//! [`MatchingPass`] couples a tracker to a single print request so that no canonical order is
//! attached to two lines of the same requisition.

use super::{CanonicalOrder, OrderId, OrderLine};
use serde::Serialize;
use std::collections::HashSet;

/// Identifier compared when a match was found, in precedence order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    Code,
    Cpt,
    Name,
}

impl MatchTier {
    pub const PRECEDENCE: [MatchTier; 3] = [MatchTier::Code, MatchTier::Cpt, MatchTier::Name];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchResult<'a> {
    Matched {
        order: &'a CanonicalOrder,
        tier: MatchTier,
    },
    NoMatch,
}

impl<'a> MatchResult<'a> {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchResult::Matched { .. })
    }

    pub fn order(&self) -> Option<&'a CanonicalOrder> {
        match self {
            MatchResult::Matched { order, .. } => Some(*order),
            MatchResult::NoMatch => None,
        }
    }

    pub fn tier(&self) -> Option<MatchTier> {
        match self {
            MatchResult::Matched { tier, .. } => Some(*tier),
            MatchResult::NoMatch => None,
        }
    }
}

/// Ids of canonical orders already attached to a line in the current pass.
#[derive(Clone, Debug, Default)]
pub struct ConsumptionTracker {
    consumed: HashSet<OrderId>,
}

impl ConsumptionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_consumed(&self, id: &OrderId) -> bool {
        self.consumed.contains(id)
    }

    /// Record the order of a successful match as used. Returns `true` when the id was newly
    /// consumed; `NoMatch` and repeated ids return `false`.
    pub fn consume(&mut self, result: &MatchResult<'_>) -> bool {
        match result.order() {
            Some(order) => self.consumed.insert(order.id.clone()),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.consumed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty()
    }

    pub fn reset(&mut self) {
        self.consumed.clear();
    }
}

/// Find the canonical order `order_line` refers to.
///
/// # Arguments
///
/// * `order_line` - Free-text order line from a plan entry.
/// * `pool` - Canonical orders available to this print request.
/// * `tracker` - Ids consumed so far in this pass; consumed records are skipped.
///
/// # Returns
///
/// The first eligible record in pool order at the highest tier that produces an exact match,
/// or `NoMatch` when the line is unclassified or no tier matches.
pub fn match_order<'a>(
    order_line: &str,
    pool: &'a [CanonicalOrder],
    tracker: &ConsumptionTracker,
) -> MatchResult<'a> {
    let Some(line) = OrderLine::parse(order_line) else {
        tracing::debug!(line = order_line, "order line has no recognised type");
        return MatchResult::NoMatch;
    };

    for tier in MatchTier::PRECEDENCE {
        let Some(wanted) = line.key(tier) else {
            continue;
        };
        let found = pool
            .iter()
            .filter(|order| order.kind() == line.kind && !tracker.is_consumed(&order.id))
            .find(|order| order.payload.match_key(tier).as_deref() == Some(wanted));

        if let Some(order) = found {
            tracing::debug!(
                line = order_line,
                order_id = %order.id,
                tier = ?tier,
                "order line matched canonical order"
            );
            return MatchResult::Matched { order, tier };
        }
    }

    tracing::debug!(line = order_line, kind = %line.kind, "order line matched nothing");
    MatchResult::NoMatch
}

/// One print request: a pool slice and a tracker that starts empty.
#[derive(Debug)]
pub struct MatchingPass<'a> {
    pool: &'a [CanonicalOrder],
    tracker: ConsumptionTracker,
}

impl<'a> MatchingPass<'a> {
    pub fn new(pool: &'a [CanonicalOrder]) -> Self {
        Self {
            pool,
            tracker: ConsumptionTracker::new(),
        }
    }

    /// Match `order_line` and consume the matched order for the rest of this pass.
    pub fn match_and_consume(&mut self, order_line: &str) -> MatchResult<'a> {
        let result = match_order(order_line, self.pool, &self.tracker);
        self.tracker.consume(&result);
        result
    }

    pub fn tracker(&self) -> &ConsumptionTracker {
        &self.tracker
    }
}
