use thiserror::Error;

/// A provider or timeframe produced nothing usable. Contained locally as an
/// unavailable section; only total absence fails the whole analysis.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{what} unavailable: {reason}")]
pub struct DataUnavailable {
    pub what: String,
    pub reason: String,
}

impl DataUnavailable {
    pub fn new(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            what: what.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while building an analysis
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    DataUnavailable(#[from] DataUnavailable),

    #[error("Invalid {field} '{value}': {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Computation fault in {section}: {detail}")]
    ComputationFault { section: String, detail: String },
}

/// Errors on the admission and hand-off path
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("An analysis is already running for user {user_id}")]
    AdmissionConflict { user_id: i64 },

    #[error("Result relay is closed, dropping result for job {job_id}")]
    RelayClosed { job_id: String },
}

/// Failure of an outward delivery action
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    #[error("Delivery to {destination} failed: {reason}")]
    Transport { destination: String, reason: String },

    #[error("Delivery to {destination} rejected: {reason}")]
    Rejected { destination: String, reason: String },
}
