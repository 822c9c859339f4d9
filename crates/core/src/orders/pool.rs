//! Translation of order store records into canonical orders.
//!
//! Responsibilities:
//! - Accept the store's loosely typed JSON records (numeric or string ids, camelCase or
//!   snake_case keys, payloads stored as objects or as JSON strings)
//! - Resolve per-type payload field aliases into the [`OrderPayload`] union
//! - Report schema mismatches with the JSON path of the failing field
//!
//! Notes:
//! - Records whose type is not one of the four order types are skipped, not rejected

use super::{CanonicalOrder, OrderId, OrderPayload};
use crate::{ChartError, ChartResult};
use serde::Deserialize;
use serde_json::{Map, Value};

// ============================================================================
// Public OrderPool operations
// ============================================================================

/// Order pool operations.
///
/// This is a zero-sized type used for namespacing pool translation. All methods are associated
/// functions.
pub struct OrderPool;

impl OrderPool {
    /// Parse a JSON array of order store records.
    ///
    /// # Arguments
    ///
    /// * `json_text` - JSON text expected to be an array of order records.
    ///
    /// # Returns
    ///
    /// Canonical orders in store order, minus records of unknown type.
    ///
    /// # Errors
    ///
    /// Returns [`ChartError`] if:
    /// - the text is not a JSON array of records (`OrderPoolSchema`, with the failing path),
    /// - a payload is neither an object nor a string (`OrderPoolSchema`),
    /// - a string payload does not decode to a JSON object (`OrderPayload`).
    pub fn from_json(json_text: &str) -> ChartResult<Vec<CanonicalOrder>> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);

        let wire = match serde_path_to_error::deserialize::<_, Vec<OrderRecordWire>>(
            &mut deserializer,
        ) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let path = if path.is_empty() || path == "." {
                    "<root>".to_string()
                } else {
                    path
                };
                return Err(ChartError::OrderPoolSchema {
                    path,
                    message: err.into_inner().to_string(),
                });
            }
        };

        let mut orders = Vec::with_capacity(wire.len());
        for (index, record) in wire.into_iter().enumerate() {
            if let Some(order) = wire_to_domain(index, record)? {
                orders.push(order);
            }
        }

        tracing::debug!(orders = orders.len(), "translated order pool");
        Ok(orders)
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Debug, Deserialize)]
struct OrderRecordWire {
    id: IdWire,
    #[serde(alias = "orderType")]
    order_type: String,
    #[serde(default, alias = "payload")]
    order_payload: Value,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdWire {
    Number(serde_json::Number),
    Text(String),
}

impl From<IdWire> for OrderId {
    fn from(wire: IdWire) -> Self {
        match wire {
            IdWire::Number(number) => OrderId::new(number.to_string()),
            IdWire::Text(text) => OrderId::new(text),
        }
    }
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn wire_to_domain(index: usize, wire: OrderRecordWire) -> ChartResult<Option<CanonicalOrder>> {
    let id = OrderId::from(wire.id);

    let fields = match wire.order_payload {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        Value::String(text) => serde_json::from_str::<Map<String, Value>>(&text).map_err(
            |source| ChartError::OrderPayload {
                id: id.to_string(),
                source,
            },
        )?,
        other => {
            return Err(ChartError::OrderPoolSchema {
                path: format!("[{index}].order_payload"),
                message: format!("expected an object or a JSON string, found {other}"),
            })
        }
    };

    let payload = match wire.order_type.trim().to_ascii_lowercase().as_str() {
        "lab" => OrderPayload::Lab {
            code: first_text(&fields, &["code"]),
            cpt: first_text(&fields, &["cpt"]),
            test_name: first_text(&fields, &["testName", "test_name", "name"]),
        },
        "imaging" => OrderPayload::Imaging {
            cpt: first_text(&fields, &["cpt"]),
            study_name: first_text(&fields, &["studyName", "study_name", "name"]),
        },
        "referral" => OrderPayload::Referral {
            specialist: first_text(
                &fields,
                &["specialist", "recipientName", "recipientSpecialty"],
            ),
        },
        "prescription" | "rx" => OrderPayload::Prescription {
            medication: first_text(&fields, &["medication", "medicationName"]),
        },
        other => {
            tracing::warn!(order_id = %id, order_type = other, "skipping order of unknown type");
            return Ok(None);
        }
    };

    Ok(Some(CanonicalOrder { id, payload }))
}

/// First alias holding a non-blank string or a number.
fn first_text(fields: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|alias| match fields.get(*alias)? {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}
