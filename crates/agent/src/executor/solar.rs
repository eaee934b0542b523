use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use wattson_core::actions::{ActionGroup, ActionDeclaration, ActionRequest, ParameterSpec, ParameterType};
use wattson_core::domain::customer::CustomerId;
use wattson_core::domain::solar::{SolarTicket, TicketId};
use wattson_core::errors::ActionError;
use wattson_db::repositories::SolarTicketRepository;

use super::{store_failure, verify_customer_scope, ActionExecutor};

pub fn solar_action_group() -> ActionGroup {
    ActionGroup::new(
        "solar_energy_actions",
        "Function to open an energy ticket for a user or get status from an opened ticket",
    )
    .with_action(
        ActionDeclaration::new(
            "open_ticket",
            "Create a ticket to get help with information related with solar panel or clean energy",
        )
        .with_parameter(ParameterSpec::required(
            "customer_id",
            ParameterType::String,
            "Unique customer identifier",
        ))
        .with_parameter(ParameterSpec::required(
            "msg",
            ParameterType::String,
            "The reason why customer is opening a ticket",
        )),
    )
    .with_action(
        ActionDeclaration::new("get_ticket_status", "get the status of an existing ticket")
            .with_parameter(ParameterSpec::required(
                "customer_id",
                ParameterType::String,
                "Unique customer identifier",
            ))
            .with_parameter(ParameterSpec::optional(
                "ticket_id",
                ParameterType::String,
                "Unique ticket identifier",
            )),
    )
}

pub struct SolarActionExecutor {
    group: ActionGroup,
    repository: Arc<dyn SolarTicketRepository>,
}

impl SolarActionExecutor {
    pub fn new(repository: Arc<dyn SolarTicketRepository>) -> Self {
        Self { group: solar_action_group(), repository }
    }

    async fn open_ticket(
        &self,
        customer_id: &CustomerId,
        request: &ActionRequest,
    ) -> Result<Value, ActionError> {
        let message = request.string_arg("msg").unwrap_or_default();
        if message.trim().is_empty() {
            return Err(ActionError::invalid_parameter(
                &request.name,
                "msg",
                "must not be empty",
            ));
        }

        let ticket = SolarTicket::open(customer_id.clone(), message, Utc::now());
        self.repository.insert(&ticket).await.map_err(store_failure)?;

        // Ticket protocol: respond with the case id only.
        Ok(json!({ "ticket_id": ticket.ticket_id.as_str() }))
    }

    async fn ticket_status(
        &self,
        customer_id: &CustomerId,
        request: &ActionRequest,
    ) -> Result<Value, ActionError> {
        if let Some(ticket_id) = request.string_arg("ticket_id") {
            let ticket = self
                .repository
                .find(customer_id, &TicketId(ticket_id.to_string()))
                .await
                .map_err(store_failure)?
                .ok_or_else(|| {
                    ActionError::NotFound(format!(
                        "ticket `{ticket_id}` was not found for customer `{customer_id}`"
                    ))
                })?;
            return Ok(ticket_summary(&ticket));
        }

        let tickets =
            self.repository.list_for_customer(customer_id).await.map_err(store_failure)?;
        if tickets.is_empty() {
            return Err(ActionError::NotFound(format!(
                "customer `{customer_id}` has no tickets"
            )));
        }

        Ok(json!({ "tickets": tickets.iter().map(ticket_summary).collect::<Vec<_>>() }))
    }
}

fn ticket_summary(ticket: &SolarTicket) -> Value {
    json!({
        "ticket_id": ticket.ticket_id.as_str(),
        "status": ticket.status.as_str(),
        "opened_at": ticket.opened_at.to_rfc3339(),
    })
}

#[async_trait]
impl ActionExecutor for SolarActionExecutor {
    fn group(&self) -> &ActionGroup {
        &self.group
    }

    async fn execute(
        &self,
        customer_id: &CustomerId,
        request: &ActionRequest,
    ) -> Result<Value, ActionError> {
        self.group.check(request)?;
        verify_customer_scope(request, customer_id)?;

        match request.name.as_str() {
            "open_ticket" => self.open_ticket(customer_id, request).await,
            "get_ticket_status" => self.ticket_status(customer_id, request).await,
            other => Err(ActionError::UnknownAction(other.to_string())),
        }
    }
}
