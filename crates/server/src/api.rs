//! Conversation endpoint: the HTTP face of the orchestration entry point.
//! Whatever happens inside a turn, a well-formed request always receives a
//! natural-language reply.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json, routing::post, Router};
use serde::{Deserialize, Serialize};
use tracing::error;

use wattson_agent::OrchestratorRuntime;
use wattson_core::domain::customer::CustomerId;

#[derive(Clone)]
pub struct ApiState {
    runtime: Arc<OrchestratorRuntime>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ConversationRequest {
    pub customer_id: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConversationResponse {
    pub reply_text: String,
    pub active_collaborator: Option<String>,
    pub turn_sequence: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BadRequestResponse {
    pub error: String,
}

pub fn router(runtime: Arc<OrchestratorRuntime>) -> Router {
    Router::new()
        .route("/conversations", post(converse))
        .with_state(ApiState { runtime })
}

pub async fn converse(
    State(state): State<ApiState>,
    Json(request): Json<ConversationRequest>,
) -> Result<Json<ConversationResponse>, (StatusCode, Json<BadRequestResponse>)> {
    if request.customer_id.trim().is_empty() {
        return Err(bad_request("customer_id must not be empty"));
    }
    if request.message.trim().is_empty() {
        return Err(bad_request("message must not be empty"));
    }

    let customer_id = CustomerId(request.customer_id);

    match state.runtime.handle_message(&customer_id, &request.message).await {
        Ok(outcome) => Ok(Json(ConversationResponse {
            reply_text: outcome.reply_text,
            active_collaborator: outcome.active_collaborator,
            turn_sequence: Some(outcome.turn_sequence),
        })),
        // Turn-level failures still answer in natural language; the error
        // kind is for the logs.
        Err(turn_error) => {
            error!(
                event_name = "api.turn.failed",
                customer_id = %customer_id,
                error = %turn_error,
                "conversation turn failed"
            );
            Ok(Json(ConversationResponse {
                reply_text: turn_error.user_reply().to_string(),
                active_collaborator: None,
                turn_sequence: None,
            }))
        }
    }
}

fn bad_request(message: &str) -> (StatusCode, Json<BadRequestResponse>) {
    (StatusCode::BAD_REQUEST, Json(BadRequestResponse { error: message.to_string() }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::State;
    use axum::Json;

    use wattson_agent::{
        CollaboratorBinding, CompletionError, DomainAgent, OrchestratorRuntime,
        ScriptedCompletionClient, SupervisorRouter,
    };
    use wattson_core::actions::{ActionRequest, Decision};
    use wattson_core::config::SessionConfig;
    use wattson_db::repositories::{InMemoryForecastRepository, InMemorySessionRepository};

    use super::{converse, ApiState, ConversationRequest};

    fn session_config() -> SessionConfig {
        SessionConfig { idle_ttl_secs: 1800, max_history_pairs: 10, max_action_iterations: 5 }
    }

    fn runtime_with_supervisor_script(
        decisions: Vec<Result<Decision, CompletionError>>,
    ) -> Arc<OrchestratorRuntime> {
        let agent_completion =
            Arc::new(ScriptedCompletionClient::replying(&["your forecast is about 515 kWh"]));
        let executor = Arc::new(wattson_agent::executor::ForecastActionExecutor::new(Arc::new(
            InMemoryForecastRepository::default(),
        )));
        let agent =
            Arc::new(DomainAgent::new("forecast", "persona", agent_completion, executor, 5));

        let supervisor = Arc::new(SupervisorRouter::new(
            "route, never answer",
            Arc::new(ScriptedCompletionClient::new(decisions)),
            vec![(
                CollaboratorBinding {
                    name: "forecast".to_string(),
                    instruction: "Delegate forecasting tasks.".to_string(),
                },
                agent,
            )],
            5,
            10,
        ));

        Arc::new(OrchestratorRuntime::new(
            Arc::new(InMemorySessionRepository::default()),
            supervisor,
            session_config(),
        ))
    }

    #[tokio::test]
    async fn well_formed_request_gets_a_delegated_reply() {
        let runtime = runtime_with_supervisor_script(vec![Ok(Decision::Act {
            requests: vec![ActionRequest::new("forecast").with_string("message", "forecast?")],
        })]);

        let response = converse(
            State(ApiState { runtime }),
            Json(ConversationRequest {
                customer_id: "C1".to_string(),
                message: "what is my forecast?".to_string(),
            }),
        )
        .await
        .expect("response");

        assert_eq!(response.0.reply_text, "your forecast is about 515 kWh");
        assert_eq!(response.0.active_collaborator.as_deref(), Some("forecast"));
        assert_eq!(response.0.turn_sequence, Some(1));
    }

    #[tokio::test]
    async fn capability_outage_still_replies_in_natural_language() {
        let runtime = runtime_with_supervisor_script(vec![Err(CompletionError::Transport(
            "connection refused".to_string(),
        ))]);

        let response = converse(
            State(ApiState { runtime }),
            Json(ConversationRequest {
                customer_id: "C1".to_string(),
                message: "hello".to_string(),
            }),
        )
        .await
        .expect("response");

        assert!(response.0.reply_text.contains("try again"));
        assert_eq!(response.0.turn_sequence, None);
    }

    #[tokio::test]
    async fn blank_fields_are_rejected_with_bad_request() {
        let runtime = runtime_with_supervisor_script(Vec::new());

        let result = converse(
            State(ApiState { runtime }),
            Json(ConversationRequest {
                customer_id: "  ".to_string(),
                message: "hello".to_string(),
            }),
        )
        .await;

        let (status, Json(body)) = result.expect_err("bad request");
        assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
        assert!(body.error.contains("customer_id"));
    }
}
