//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services. The
//! core never reads environment variables itself; binaries read them (through `dotenvy`) and
//! hand the raw values to the helpers below.

use crate::constants::{
    DEFAULT_MAX_DECODE_PASSES, DEFAULT_ORPHAN_DIAGNOSIS_LABEL, MAX_DECODE_PASSES_LIMIT,
};
use crate::{ChartError, ChartResult};
use chartnote_types::NonEmptyText;

/// Core configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreConfig {
    max_decode_passes: usize,
    orphan_diagnosis_label: NonEmptyText,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `ChartError::InvalidConfig` if `max_decode_passes` is zero or above
    /// [`MAX_DECODE_PASSES_LIMIT`].
    pub fn new(max_decode_passes: usize, orphan_diagnosis_label: NonEmptyText) -> ChartResult<Self> {
        if max_decode_passes == 0 || max_decode_passes > MAX_DECODE_PASSES_LIMIT {
            return Err(ChartError::InvalidConfig(format!(
                "max_decode_passes must be between 1 and {MAX_DECODE_PASSES_LIMIT}, got {max_decode_passes}"
            )));
        }

        Ok(Self {
            max_decode_passes,
            orphan_diagnosis_label,
        })
    }

    pub fn max_decode_passes(&self) -> usize {
        self.max_decode_passes
    }

    pub fn orphan_diagnosis_label(&self) -> &NonEmptyText {
        &self.orphan_diagnosis_label
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_decode_passes: DEFAULT_MAX_DECODE_PASSES,
            orphan_diagnosis_label: default_orphan_label(),
        }
    }
}

fn default_orphan_label() -> NonEmptyText {
    NonEmptyText::new(DEFAULT_ORPHAN_DIAGNOSIS_LABEL).expect("default orphan label is non-empty")
}

/// Parse the decode pass cap from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_MAX_DECODE_PASSES`].
pub fn max_decode_passes_from_env_value(value: Option<String>) -> ChartResult<usize> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(DEFAULT_MAX_DECODE_PASSES),
        Some(v) => v.parse::<usize>().map_err(|e| {
            ChartError::InvalidConfig(format!("max decode passes {v:?} is not a number: {e}"))
        }),
    }
}

/// Parse the orphan diagnosis label from an optional string value.
///
/// Missing or blank values fall back to [`DEFAULT_ORPHAN_DIAGNOSIS_LABEL`].
pub fn orphan_label_from_env_value(value: Option<String>) -> NonEmptyText {
    value
        .and_then(|v| NonEmptyText::new(v).ok())
        .unwrap_or_else(default_orphan_label)
}
