//! # Chartnote Core
//!
//! Text protocol and order reconciliation for clinical encounter notes.
//!
//! This crate contains pure, synchronous operations over note text:
//! - Parsing a note document into its twelve named sections and composing it back
//! - Decoding and encoding the bulleted plan section as structured diagnosis entries
//! - Editing the structured plan the way the charting surface does
//! - Matching free-text plan orders against canonical order records, exact matches only
//! - Building printable requisitions grouped by diagnosis
//!
//! **No I/O**: reading documents, order stores and environment variables belongs to callers
//! such as `chartnote-cli`. Configuration is resolved once into [`CoreConfig`] and passed in.

pub mod config;
pub mod constants;
pub mod diagnosis;
pub mod entities;
pub mod error;
pub mod note;
pub mod orders;
pub mod plan;
pub mod requisition;
pub mod sections;

pub use config::CoreConfig;
pub use diagnosis::{extract_diagnosis, DiagnosisLabel};
pub use entities::decode_entities;
pub use error::{ChartError, ChartResult};
pub use note::{compose_note, NoteDraft, NoteService};
pub use orders::{
    match_order, CanonicalOrder, ConsumptionTracker, MatchResult, MatchTier, MatchingPass,
    OrderId, OrderKind, OrderPayload, OrderPool,
};
pub use plan::{decode_plan, decode_plan as parse_plan_text, encode_plan, Plan, PlanEntry};
pub use requisition::{render_requisition, Requisition, RequisitionLine};
pub use sections::{parse_note, NoteSections, SectionKey};
