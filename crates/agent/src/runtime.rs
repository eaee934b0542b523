//! Orchestration entry point: load (or start) the customer's session, run
//! the turn through the supervisor, persist, reply.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use wattson_core::config::SessionConfig;
use wattson_core::domain::customer::CustomerId;
use wattson_core::domain::session::{ConversationSession, ConversationTurn};
use wattson_core::errors::TurnError;
use wattson_db::repositories::SessionRepository;

use crate::supervisor::SupervisorRouter;

/// Speaker recorded when the supervisor answers without delegating.
const SUPERVISOR_SPEAKER: &str = "supervisor";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnOutcome {
    pub reply_text: String,
    pub active_collaborator: Option<String>,
    pub turn_sequence: u64,
}

pub struct OrchestratorRuntime {
    sessions: Arc<dyn SessionRepository>,
    supervisor: Arc<SupervisorRouter>,
    session_config: SessionConfig,
}

impl OrchestratorRuntime {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        supervisor: Arc<SupervisorRouter>,
        session_config: SessionConfig,
    ) -> Self {
        Self { sessions, supervisor, session_config }
    }

    /// Runs one conversation turn. On external-capability failure the session
    /// is still persisted up to the last successful state, so no history is
    /// lost; the caller maps the error to its natural-language reply.
    pub async fn handle_message(
        &self,
        customer_id: &CustomerId,
        message: &str,
    ) -> Result<TurnOutcome, TurnError> {
        let now = Utc::now();
        let ttl = self.session_config.idle_ttl_secs;

        let mut session = match self
            .sessions
            .load_active(customer_id, now)
            .await
            .map_err(|er| TurnError::Session(er.to_string()))?
        {
            Some(session) => session,
            None => {
                // Expired or absent: fresh session, but keep the ordering key
                // monotonic across session lifetimes.
                let last = self
                    .sessions
                    .last_turn_sequence(customer_id)
                    .await
                    .map_err(|er| TurnError::Session(er.to_string()))?;
                match last {
                    Some(sequence) => {
                        ConversationSession::start_after(customer_id.clone(), sequence, now, ttl)
                    }
                    None => ConversationSession::start(customer_id.clone(), now, ttl),
                }
            }
        };

        session.append(ConversationTurn::user(message, now));

        let turn_reply = match self.supervisor.handle(customer_id, &session, message).await {
            Ok(turn_reply) => turn_reply,
            Err(turn_error) => {
                warn!(
                    event_name = "runtime.turn.failed",
                    customer_id = %customer_id,
                    error = %turn_error,
                    "turn failed, persisting session up to last successful state"
                );
                session.touch(now, ttl);
                if let Err(save_error) = self.sessions.save(&session).await {
                    error!(
                        event_name = "runtime.session.save_failed",
                        customer_id = %customer_id,
                        error = %save_error,
                        "could not persist session after failed turn"
                    );
                }
                return Err(turn_error);
            }
        };

        let speaker = turn_reply.collaborator.clone().unwrap_or_else(|| SUPERVISOR_SPEAKER.to_string());
        session.append(ConversationTurn::agent(speaker, &turn_reply.text, Utc::now()));
        if let Some(collaborator) = &turn_reply.collaborator {
            session.active_collaborator = Some(collaborator.clone());
        }
        session.touch(Utc::now(), ttl);

        // Last-write-wins: concurrent turns for one customer race on this
        // upsert, which the session model accepts.
        self.sessions
            .save(&session)
            .await
            .map_err(|er| TurnError::Session(er.to_string()))?;

        info!(
            event_name = "runtime.turn.completed",
            customer_id = %customer_id,
            turn_sequence = session.turn_sequence,
            collaborator = turn_reply.collaborator.as_deref().unwrap_or(SUPERVISOR_SPEAKER),
            "turn completed"
        );

        Ok(TurnOutcome {
            reply_text: turn_reply.text,
            active_collaborator: session.active_collaborator.clone(),
            turn_sequence: session.turn_sequence,
        })
    }
}
