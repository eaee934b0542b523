//! The opaque completion capability: `complete(context, declared actions)`
//! returns either a final reply or action requests. Any model provider can
//! sit behind the trait; the orchestration core never sees past it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use wattson_core::actions::{ActionDeclaration, Decision};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CompletionError {
    #[error("completion transport failure: {0}")]
    Transport(String),
    #[error("completion protocol failure: {0}")]
    Protocol(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptRole {
    /// End-user message.
    User,
    /// A reply previously produced by any agent.
    Agent,
    /// Result (or failure) of an executed action, fed back as context.
    Action,
    /// Retrieved knowledge passages.
    Knowledge,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: TranscriptRole,
    pub content: String,
}

impl TranscriptEntry {
    pub fn new(role: TranscriptRole, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

/// Everything one completion call may see: the persona instruction, the
/// (capped) working transcript, and the declared action surface, verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionRequest {
    pub instruction: String,
    pub transcript: Vec<TranscriptEntry>,
    pub actions: Vec<ActionDeclaration>,
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Decision, CompletionError>;
}

/// Test double that replays a fixed script of decisions and records every
/// request it was shown.
#[derive(Default)]
pub struct ScriptedCompletionClient {
    script: std::sync::Mutex<std::collections::VecDeque<Result<Decision, CompletionError>>>,
    seen: std::sync::Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletionClient {
    pub fn new(decisions: Vec<Result<Decision, CompletionError>>) -> Self {
        Self {
            script: std::sync::Mutex::new(decisions.into()),
            seen: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn replying(texts: &[&str]) -> Self {
        Self::new(
            texts
                .iter()
                .map(|text| Ok(Decision::Reply { text: (*text).to_string() }))
                .collect(),
        )
    }

    pub fn requests_seen(&self) -> Vec<CompletionRequest> {
        self.seen.lock().expect("seen lock").clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Decision, CompletionError> {
        self.seen.lock().expect("seen lock").push(request.clone());
        self.script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::Protocol("scripted decisions exhausted".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use wattson_core::actions::{ActionRequest, Decision};

    use super::{
        CompletionClient, CompletionError, CompletionRequest, ScriptedCompletionClient,
        TranscriptEntry, TranscriptRole,
    };

    fn request() -> CompletionRequest {
        CompletionRequest {
            instruction: "you are a test".to_string(),
            transcript: vec![TranscriptEntry::new(TranscriptRole::User, "hello")],
            actions: Vec::new(),
        }
    }

    #[tokio::test]
    async fn scripted_client_replays_in_order_and_records_requests() {
        let client = ScriptedCompletionClient::new(vec![
            Ok(Decision::Act { requests: vec![ActionRequest::new("detect_peak")] }),
            Ok(Decision::Reply { text: "done".to_string() }),
        ]);

        let first = client.complete(&request()).await.expect("first decision");
        assert!(matches!(first, Decision::Act { .. }));

        let second = client.complete(&request()).await.expect("second decision");
        assert_eq!(second, Decision::Reply { text: "done".to_string() });

        assert_eq!(client.requests_seen().len(), 2);
    }

    #[tokio::test]
    async fn exhausted_script_fails_loudly() {
        let client = ScriptedCompletionClient::default();
        let error = client.complete(&request()).await.expect_err("empty script");
        assert!(matches!(error, CompletionError::Protocol(_)));
    }
}
