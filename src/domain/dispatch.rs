use crate::domain::analysis::AnalysisOutcome;
use crate::domain::errors::DispatchError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a delivery goes. Opaque to the core; interpreted by the sink.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Destination {
    User(UserId),
    Chat(i64),
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::User(id) => write!(f, "user:{}", id),
            Destination::Chat(id) => write!(f, "chat:{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub user_id: UserId,
    pub symbol: String,
    pub strategy: String,
    pub submitted_at: DateTime<Utc>,
    pub reply_to: Destination,
}

impl AnalysisRequest {
    pub fn new(user_id: UserId, symbol: impl Into<String>, strategy: impl Into<String>) -> Self {
        Self {
            user_id,
            symbol: symbol.into(),
            strategy: strategy.into(),
            submitted_at: Utc::now(),
            reply_to: Destination::User(user_id),
        }
    }

    pub fn reply_to(mut self, destination: Destination) -> Self {
        self.reply_to = destination;
        self
    }
}

/// Synchronous answer to a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted { job_id: Uuid },
    RejectedBusy,
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }

    pub fn into_result(self, user_id: UserId) -> Result<Uuid, DispatchError> {
        match self {
            Admission::Admitted { job_id } => Ok(job_id),
            Admission::RejectedBusy => Err(DispatchError::AdmissionConflict { user_id: user_id.0 }),
        }
    }
}

/// What a delivery action carries to its destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "snake_case")]
pub enum DeliveryPayload {
    Outcome(AnalysisOutcome),
    Text(String),
}
