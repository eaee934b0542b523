use thiserror::Error;

/// Failures produced by an action executor. These are fed back into the
/// requesting agent's working context so the completion capability can
/// correct parameters, ask for more information, or apologize; the raw text
/// never reaches the end user.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("unknown action `{0}` for this action group")]
    UnknownAction(String),
    #[error("invalid parameter `{parameter}` for action `{action}`: {reason}")]
    InvalidParameter { action: String, parameter: String, reason: String },
    #[error("no record found: {0}")]
    NotFound(String),
    #[error("action execution failed: {0}")]
    ExecutionFailure(String),
}

impl ActionError {
    pub fn invalid_parameter(
        action: impl Into<String>,
        parameter: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            action: action.into(),
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Backend-store failures may be worth one retry with identical
    /// parameters; contract violations and absent records are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ExecutionFailure(_))
    }
}

/// Turn-level failures surfaced by the orchestration runtime. Each maps to a
/// fixed natural-language reply; the enum itself is for logs and operators.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TurnError {
    #[error("completion capability unavailable: {0}")]
    CompletionUnavailable(String),
    #[error("knowledge lookup unavailable: {0}")]
    KnowledgeLookupUnavailable(String),
    #[error("session store failure: {0}")]
    Session(String),
}

impl TurnError {
    pub fn user_reply(&self) -> &'static str {
        match self {
            Self::CompletionUnavailable(_) | Self::KnowledgeLookupUnavailable(_) => {
                "I'm having trouble reaching our systems right now. Please try again in a moment."
            }
            Self::Session(_) => {
                "I couldn't access your conversation just now. Please try again shortly."
            }
        }
    }
}

/// Reply used when an agent or the supervisor hits its action-loop cap.
pub const LOOP_FALLBACK_REPLY: &str =
    "I wasn't able to finish working through that request. Could you rephrase or break it into smaller questions?";
