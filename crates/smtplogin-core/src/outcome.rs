//! Result of an authentication attempt, as reported to callers.

use serde::Serialize;

use crate::error::Error;

/// Whether the credentials were accepted.
///
/// Serializes as `{"success": bool, "message": string}`; the message is
/// empty on success and carries the failure detail otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "OutcomeDocument")]
pub enum AuthOutcome {
    /// The server accepted the credentials, or none were needed.
    Success,
    /// The attempt failed at some step.
    Failure(String),
}

impl AuthOutcome {
    /// Returns true if authentication succeeded.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns the failure detail, or an empty string on success.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Success => "",
            Self::Failure(message) => message,
        }
    }
}

impl From<Result<(), Error>> for AuthOutcome {
    fn from(result: Result<(), Error>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(e) => Self::Failure(e.to_string()),
        }
    }
}

#[derive(Serialize)]
struct OutcomeDocument {
    success: bool,
    message: String,
}

impl From<AuthOutcome> for OutcomeDocument {
    fn from(outcome: AuthOutcome) -> Self {
        match outcome {
            AuthOutcome::Success => Self {
                success: true,
                message: String::new(),
            },
            AuthOutcome::Failure(message) => Self {
                success: false,
                message,
            },
        }
    }
}
