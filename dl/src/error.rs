//! Run-level error types
//!
//! Every failure a run can end in maps to exactly one [`ErrorKind`], which is
//! what the controller records and what the operator sees.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::{LlmError, TransportCategory};

/// The two model roles in a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Writer,
    Reviewer,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Writer => write!(f, "writer"),
            Role::Reviewer => write!(f, "reviewer"),
        }
    }
}

/// Classification of run failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ConfigurationInvalid,
    TransportAuthError,
    TransportRateLimited,
    TransportSchemaRejected,
    TransportOther,
    ResponseMalformed,
    InvalidState,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::ConfigurationInvalid => "configuration_invalid",
            ErrorKind::TransportAuthError => "transport_auth_error",
            ErrorKind::TransportRateLimited => "transport_rate_limited",
            ErrorKind::TransportSchemaRejected => "transport_schema_rejected",
            ErrorKind::TransportOther => "transport_other",
            ErrorKind::ResponseMalformed => "response_malformed",
            ErrorKind::InvalidState => "invalid_state",
        };
        write!(f, "{}", s)
    }
}

impl From<TransportCategory> for ErrorKind {
    fn from(category: TransportCategory) -> Self {
        match category {
            TransportCategory::Auth => ErrorKind::TransportAuthError,
            TransportCategory::RateLimited => ErrorKind::TransportRateLimited,
            TransportCategory::SchemaRejected => ErrorKind::TransportSchemaRejected,
            TransportCategory::Other => ErrorKind::TransportOther,
        }
    }
}

/// Errors that end a run or reject an operation
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Invalid configuration: {0}")]
    ConfigurationInvalid(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("{role} call failed in round {round}: {source}")]
    Transport {
        role: Role,
        round: u32,
        #[source]
        source: LlmError,
    },

    #[error("{role} response in round {round} was malformed: {reason}")]
    ResponseMalformed {
        role: Role,
        round: u32,
        reason: String,
        raw: String,
    },

    #[error("Prompt template error: {0}")]
    Prompt(String),
}

impl RunError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RunError::ConfigurationInvalid(_) | RunError::Prompt(_) => ErrorKind::ConfigurationInvalid,
            RunError::InvalidState(_) => ErrorKind::InvalidState,
            RunError::Transport { source, .. } => source.category().into(),
            RunError::ResponseMalformed { .. } => ErrorKind::ResponseMalformed,
        }
    }

    /// Message for the operator, naming the role and round where one applies
    pub fn user_message(&self) -> String {
        match self {
            RunError::Transport { role, round, source } => {
                format!("Round {} {} call failed. {}", round, role, source.user_message())
            }
            RunError::ResponseMalformed { role, round, reason, .. } => format!(
                "Round {} {} returned a response that could not be understood ({}).",
                round, role, reason
            ),
            other => other.to_string(),
        }
    }
}

/// The failure a controller records when a run ends in `Failed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&RunError> for RunFailure {
    fn from(err: &RunError) -> Self {
        Self {
            kind: err.kind(),
            message: err.user_message(),
        }
    }
}
