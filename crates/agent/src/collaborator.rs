//! Domain agents: persona + optional knowledge base + declared actions,
//! driven through a bounded decide/execute loop per turn.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use wattson_core::actions::Decision;
use wattson_core::domain::customer::CustomerId;
use wattson_core::domain::session::{ConversationTurn, Speaker};
use wattson_core::errors::{TurnError, LOOP_FALLBACK_REPLY};

use crate::completion::{
    CompletionClient, CompletionRequest, TranscriptEntry, TranscriptRole,
};
use crate::executor::ActionExecutor;
use crate::knowledge::KnowledgeLookup;

pub struct DomainAgent {
    name: String,
    instruction: String,
    completion: Arc<dyn CompletionClient>,
    executor: Arc<dyn ActionExecutor>,
    knowledge: Option<Arc<dyn KnowledgeLookup>>,
    max_action_iterations: u32,
}

impl DomainAgent {
    pub fn new(
        name: impl Into<String>,
        instruction: impl Into<String>,
        completion: Arc<dyn CompletionClient>,
        executor: Arc<dyn ActionExecutor>,
        max_action_iterations: u32,
    ) -> Self {
        Self {
            name: name.into(),
            instruction: instruction.into(),
            completion,
            executor,
            knowledge: None,
            max_action_iterations: max_action_iterations.max(1),
        }
    }

    pub fn with_knowledge(mut self, knowledge: Arc<dyn KnowledgeLookup>) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// One turn: decide, execute any requested actions, decide again with
    /// the results in context, until a final reply or the iteration cap.
    pub async fn respond(
        &self,
        customer_id: &CustomerId,
        history: &[ConversationTurn],
        message: &str,
    ) -> Result<String, TurnError> {
        let mut transcript = transcript_from_history(history);
        transcript.push(TranscriptEntry::new(TranscriptRole::User, message));

        if let Some(knowledge) = &self.knowledge {
            let passages = knowledge
                .lookup(message)
                .await
                .map_err(|error| TurnError::KnowledgeLookupUnavailable(error.to_string()))?;
            if !passages.is_empty() {
                let content = passages
                    .iter()
                    .map(|passage| format!("[{}] {}", passage.source, passage.content))
                    .collect::<Vec<_>>()
                    .join("\n");
                transcript.push(TranscriptEntry::new(TranscriptRole::Knowledge, content));
            }
        }

        for iteration in 1..=self.max_action_iterations {
            let request = CompletionRequest {
                instruction: self.instruction.clone(),
                transcript: transcript.clone(),
                actions: self.executor.group().actions.clone(),
            };

            let decision = self
                .completion
                .complete(&request)
                .await
                .map_err(|error| TurnError::CompletionUnavailable(error.to_string()))?;

            match decision {
                Decision::Reply { text } => {
                    debug!(
                        event_name = "agent.turn.reply",
                        customer_id = %customer_id,
                        agent = %self.name,
                        iterations = iteration,
                        "agent produced final reply"
                    );
                    return Ok(text);
                }
                Decision::Act { requests } => {
                    for action_request in requests {
                        let outcome =
                            self.executor.execute(customer_id, &action_request).await;
                        match outcome {
                            Ok(result) => {
                                info!(
                                    event_name = "agent.action.executed",
                                    customer_id = %customer_id,
                                    agent = %self.name,
                                    action = %action_request.name,
                                    "action executed"
                                );
                                transcript.push(TranscriptEntry::new(
                                    TranscriptRole::Action,
                                    json!({
                                        "action": action_request.name,
                                        "status": "ok",
                                        "result": result,
                                    })
                                    .to_string(),
                                ));
                            }
                            // Executor failures are context for the next
                            // decision, never shown raw to the end user.
                            Err(error) => {
                                warn!(
                                    event_name = "agent.action.failed",
                                    customer_id = %customer_id,
                                    agent = %self.name,
                                    action = %action_request.name,
                                    error = %error,
                                    retryable = error.is_retryable(),
                                    "action failed"
                                );
                                transcript.push(TranscriptEntry::new(
                                    TranscriptRole::Action,
                                    json!({
                                        "action": action_request.name,
                                        "status": "error",
                                        "retryable": error.is_retryable(),
                                        "error": error.to_string(),
                                    })
                                    .to_string(),
                                ));
                            }
                        }
                    }
                }
            }
        }

        warn!(
            event_name = "agent.routing_loop_exceeded",
            customer_id = %customer_id,
            agent = %self.name,
            limit = self.max_action_iterations,
            "action loop cap reached, returning fallback reply"
        );
        Ok(LOOP_FALLBACK_REPLY.to_string())
    }
}

pub(crate) fn transcript_from_history(history: &[ConversationTurn]) -> Vec<TranscriptEntry> {
    history
        .iter()
        .map(|turn| match &turn.speaker {
            Speaker::User => TranscriptEntry::new(TranscriptRole::User, &turn.content),
            Speaker::Agent(_) => TranscriptEntry::new(TranscriptRole::Agent, &turn.content),
        })
        .collect()
}
