//! Supervisor router: holds the collaborator roster and decides, through the
//! same completion contract the agents use, which collaborator takes each
//! turn. Delegation is opaque: the supervisor sees collaborator names and
//! delegation instructions, never their action groups.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use wattson_core::actions::{ActionDeclaration, Decision, ParameterSpec, ParameterType};
use wattson_core::domain::customer::CustomerId;
use wattson_core::domain::session::ConversationSession;
use wattson_core::errors::{TurnError, LOOP_FALLBACK_REPLY};

use crate::collaborator::{transcript_from_history, DomainAgent};
use crate::completion::{CompletionClient, CompletionRequest, TranscriptEntry, TranscriptRole};

/// (Supervisor, Domain Agent) pairing with the natural-language instruction
/// describing when to route there. Bias-only; enforcement is name matching.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollaboratorBinding {
    pub name: String,
    pub instruction: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnReply {
    pub text: String,
    /// Collaborator that produced (or co-produced) the reply; `None` when the
    /// supervisor answered itself, e.g. with a clarifying question.
    pub collaborator: Option<String>,
}

pub struct SupervisorRouter {
    instruction: String,
    completion: Arc<dyn CompletionClient>,
    collaborators: Vec<(CollaboratorBinding, Arc<DomainAgent>)>,
    max_route_iterations: u32,
    max_history_pairs: usize,
}

impl SupervisorRouter {
    pub fn new(
        instruction: impl Into<String>,
        completion: Arc<dyn CompletionClient>,
        collaborators: Vec<(CollaboratorBinding, Arc<DomainAgent>)>,
        max_route_iterations: u32,
        max_history_pairs: usize,
    ) -> Self {
        Self {
            instruction: instruction.into(),
            completion,
            collaborators,
            max_route_iterations: max_route_iterations.max(1),
            max_history_pairs: max_history_pairs.max(1),
        }
    }

    /// The routing surface shown to the completion capability: one
    /// declaration per binding, nothing about what the collaborator can do
    /// internally.
    fn routing_declarations(&self) -> Vec<ActionDeclaration> {
        self.collaborators
            .iter()
            .map(|(binding, _)| {
                ActionDeclaration::new(&binding.name, &binding.instruction).with_parameter(
                    ParameterSpec::required(
                        "message",
                        ParameterType::String,
                        "The request to forward to this collaborator",
                    ),
                )
            })
            .collect()
    }

    pub fn collaborator_names(&self) -> Vec<&str> {
        self.collaborators.iter().map(|(binding, _)| binding.name.as_str()).collect()
    }

    fn agent_by_name(&self, name: &str) -> Option<&Arc<DomainAgent>> {
        self.collaborators
            .iter()
            .find(|(binding, _)| binding.name == name)
            .map(|(_, agent)| agent)
    }

    fn instruction_for(&self, session: &ConversationSession) -> String {
        match &session.active_collaborator {
            Some(active) => format!(
                "{}\nThe `{active}` collaborator handled the previous turn. Prefer continuing \
                 with it for direct follow-ups, unless the request clearly targets a different \
                 collaborator.",
                self.instruction
            ),
            None => self.instruction.clone(),
        }
    }

    pub async fn handle(
        &self,
        customer_id: &CustomerId,
        session: &ConversationSession,
        message: &str,
    ) -> Result<TurnReply, TurnError> {
        let history = session.recent_history(self.max_history_pairs);
        let mut transcript = transcript_from_history(history);
        transcript.push(TranscriptEntry::new(TranscriptRole::User, message));

        let instruction = self.instruction_for(session);
        let declarations = self.routing_declarations();

        for _iteration in 1..=self.max_route_iterations {
            let request = CompletionRequest {
                instruction: instruction.clone(),
                transcript: transcript.clone(),
                actions: declarations.clone(),
            };

            let decision = self
                .completion
                .complete(&request)
                .await
                .map_err(|error| TurnError::CompletionUnavailable(error.to_string()))?;

            let requests = match decision {
                // The supervisor answering directly is the clarifying-question
                // or small-talk path; domain answers come from collaborators.
                Decision::Reply { text } => return Ok(TurnReply { text, collaborator: None }),
                Decision::Act { requests } => requests,
            };

            let mut replies: Vec<String> = Vec::new();
            let mut last_collaborator = None;

            for route in requests {
                let Some(agent) = self.agent_by_name(&route.name) else {
                    // Name-match enforcement: let the capability re-decide
                    // with the rejection in context.
                    warn!(
                        event_name = "supervisor.unknown_collaborator",
                        customer_id = %customer_id,
                        requested = %route.name,
                        "completion requested an undeclared collaborator"
                    );
                    transcript.push(TranscriptEntry::new(
                        TranscriptRole::Action,
                        json!({
                            "collaborator": route.name,
                            "status": "error",
                            "error": "unknown collaborator; choose one of the declared collaborators",
                        })
                        .to_string(),
                    ));
                    continue;
                };

                let forwarded = route.string_arg("message").unwrap_or(message);
                info!(
                    event_name = "supervisor.delegated",
                    customer_id = %customer_id,
                    collaborator = %agent.name(),
                    "turn delegated to collaborator"
                );

                let reply = agent.respond(customer_id, history, forwarded).await?;
                transcript.push(TranscriptEntry::new(
                    TranscriptRole::Action,
                    json!({
                        "collaborator": agent.name(),
                        "status": "ok",
                        "reply": reply,
                    })
                    .to_string(),
                ));
                last_collaborator = Some(agent.name().to_string());
                replies.push(reply);
            }

            if !replies.is_empty() {
                // One reply passes through verbatim; several merge in the
                // order the user's request implied.
                return Ok(TurnReply { text: replies.join("\n\n"), collaborator: last_collaborator });
            }
        }

        warn!(
            event_name = "supervisor.routing_loop_exceeded",
            customer_id = %customer_id,
            limit = self.max_route_iterations,
            "routing loop cap reached, returning fallback reply"
        );
        Ok(TurnReply { text: LOOP_FALLBACK_REPLY.to_string(), collaborator: None })
    }
}
