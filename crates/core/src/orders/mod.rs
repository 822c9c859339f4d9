//! Canonical order records and plan-line matching.
//!
//! The order store hands over loosely typed records; [`pool`] translates them into
//! [`CanonicalOrder`] values whose payload is a tagged union with one variant per order type.
//! [`line`] extracts identifying tokens from a free-text plan order line and [`matcher`] finds
//! the single record a line refers to, exact matches only.

pub mod line;
pub mod matcher;
pub mod pool;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use line::OrderLine;
pub use matcher::{match_order, ConsumptionTracker, MatchResult, MatchTier, MatchingPass};
pub use pool::OrderPool;

/// Stable identifier of a canonical order in the external store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<u64> for OrderId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

/// The four order types a plan line can name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Lab,
    Imaging,
    Referral,
    Prescription,
}

impl OrderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderKind::Lab => "lab",
            OrderKind::Imaging => "imaging",
            OrderKind::Referral => "referral",
            OrderKind::Prescription => "prescription",
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific identifying fields of a canonical order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "order_type", rename_all = "lowercase")]
pub enum OrderPayload {
    Lab {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cpt: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        test_name: Option<String>,
    },
    Imaging {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cpt: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        study_name: Option<String>,
    },
    Referral {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        specialist: Option<String>,
    },
    Prescription {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        medication: Option<String>,
    },
}

impl OrderPayload {
    pub fn kind(&self) -> OrderKind {
        match self {
            OrderPayload::Lab { .. } => OrderKind::Lab,
            OrderPayload::Imaging { .. } => OrderKind::Imaging,
            OrderPayload::Referral { .. } => OrderKind::Referral,
            OrderPayload::Prescription { .. } => OrderKind::Prescription,
        }
    }

    /// Human-readable name: test, study, specialist or medication.
    pub fn name(&self) -> Option<&str> {
        match self {
            OrderPayload::Lab { test_name, .. } => test_name.as_deref(),
            OrderPayload::Imaging { study_name, .. } => study_name.as_deref(),
            OrderPayload::Referral { specialist } => specialist.as_deref(),
            OrderPayload::Prescription { medication } => medication.as_deref(),
        }
    }

    /// Normalised identifier compared at `tier`, if this order type has one.
    pub fn match_key(&self, tier: MatchTier) -> Option<String> {
        let raw = match (self, tier) {
            (OrderPayload::Lab { code, .. }, MatchTier::Code) => code.as_deref(),
            (OrderPayload::Lab { cpt, .. }, MatchTier::Cpt) => cpt.as_deref(),
            (OrderPayload::Imaging { cpt, .. }, MatchTier::Cpt) => cpt.as_deref(),
            (_, MatchTier::Name) => self.name(),
            _ => None,
        };
        raw.and_then(normalize_token)
    }
}

/// A system-of-record order. Read-only from the engine's point of view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalOrder {
    pub id: OrderId,
    #[serde(flatten)]
    pub payload: OrderPayload,
}

impl CanonicalOrder {
    pub fn new(id: impl Into<OrderId>, payload: OrderPayload) -> Self {
        Self {
            id: id.into(),
            payload,
        }
    }

    pub fn kind(&self) -> OrderKind {
        self.payload.kind()
    }
}

/// Trim, lowercase and collapse internal whitespace. Blank input normalises to `None`.
pub fn normalize_token(raw: &str) -> Option<String> {
    let normalized = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    (!normalized.is_empty()).then_some(normalized)
}
