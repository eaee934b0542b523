use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::customer::CustomerId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(pub String);

impl TicketId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TicketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(Self::Open),
            "in_progress" => Some(Self::InProgress),
            "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }
}

/// Support ticket raised by the solar agent for specialist-level issues.
/// Keyed by `(customer_id, ticket_id)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolarTicket {
    pub customer_id: CustomerId,
    pub ticket_id: TicketId,
    pub description: String,
    pub status: TicketStatus,
    pub opened_at: DateTime<Utc>,
}

impl SolarTicket {
    pub fn open(customer_id: CustomerId, description: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            customer_id,
            ticket_id: TicketId::generate(),
            description: description.into(),
            status: TicketStatus::Open,
            opened_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::domain::customer::CustomerId;

    use super::{SolarTicket, TicketStatus};

    #[test]
    fn opened_tickets_start_open_with_unique_ids() {
        let first = SolarTicket::open(CustomerId("C1".to_string()), "inverter fault", Utc::now());
        let second = SolarTicket::open(CustomerId("C1".to_string()), "inverter fault", Utc::now());

        assert_eq!(first.status, TicketStatus::Open);
        assert_ne!(first.ticket_id, second.ticket_id);
    }

    #[test]
    fn status_round_trips_through_storage_form() {
        for status in [TicketStatus::Open, TicketStatus::InProgress, TicketStatus::Resolved] {
            assert_eq!(TicketStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TicketStatus::parse("closed"), None);
    }
}
