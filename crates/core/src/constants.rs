//! Constants used throughout the chartnote core crate.

/// Default number of entity-decoding passes before the decoder gives up.
pub const DEFAULT_MAX_DECODE_PASSES: usize = 10;

/// Upper bound accepted for a configured decode pass cap.
pub const MAX_DECODE_PASSES_LIMIT: usize = 64;

/// Plan entry that receives the orders of a removed diagnosis.
pub const DEFAULT_ORPHAN_DIAGNOSIS_LABEL: &str = "Other";

/// Placeholder diagnosis that is never copied into the assessment.
pub const UNASSIGNED_DIAGNOSIS_LABEL: &str = "Unassigned";

/// Bullet used when rendering plan orders.
pub const PLAN_ORDER_BULLET: char = '•';

/// Prefix of every rendered plan order line.
pub const PLAN_ORDER_PREFIX: &str = "  • ";

/// Separator between composed note sections and between plan entries.
pub const BLOCK_SEPARATOR: &str = "\n\n";
