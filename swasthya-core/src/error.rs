//! Error kinds of the synchronization core.
//!
//! Both kinds are recovered at the polling/action boundary and stored in
//! state, so they are `Clone` and carry owned descriptions only.

use std::fmt;
use thiserror::Error;

/// Data domain a payload belongs to, used to locate malformed fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Agent,
    Hospitals,
    Prediction,
    Crisis,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Agent => "agent",
            Domain::Hospitals => "hospitals",
            Domain::Prediction => "prediction",
            Domain::Crisis => "crisis",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The request could not complete or its body was not parseable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport error: {cause}")]
pub struct TransportError {
    pub cause: String,
}

impl TransportError {
    pub fn new(cause: impl Into<String>) -> Self {
        Self { cause: cause.into() }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("malformed {domain} payload: field `{field}`")]
    MalformedPayload { domain: Domain, field: String },
}

impl SyncError {
    pub fn malformed(domain: Domain, field: impl Into<String>) -> Self {
        SyncError::MalformedPayload { domain, field: field.into() }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, SyncError::Transport(_))
    }
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SyncError::malformed(Domain::Hospitals, "[2].totalBeds");
        assert_eq!(err.to_string(), "malformed hospitals payload: field `[2].totalBeds`");
        assert!(!err.is_transport());

        let err: SyncError = TransportError::new("connection refused").into();
        assert_eq!(err.to_string(), "transport error: connection refused");
        assert!(err.is_transport());
    }
}
