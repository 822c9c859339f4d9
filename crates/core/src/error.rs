use chartnote_types::TextError;

/// Errors raised at the edges of the engine.
///
/// Note and plan text never produce errors: malformed input degrades to empty values. Errors
/// only come from configuration, order pool translation and plan editing with bad indices.
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid text: {0}")]
    Text(#[from] TextError),

    #[error("order pool schema mismatch at {path}: {message}")]
    OrderPoolSchema { path: String, message: String },
    #[error("failed to decode payload of order {id}: {source}")]
    OrderPayload {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("plan entry {entry} does not exist")]
    PlanEntryOutOfRange { entry: usize },
    #[error("plan entry {entry} has no order at index {order}")]
    PlanOrderOutOfRange { entry: usize, order: usize },
    #[error("no plan entry for diagnosis {0:?}")]
    DiagnosisNotFound(String),
}

pub type ChartResult<T> = std::result::Result<T, ChartError>;
