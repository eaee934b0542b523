use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum Speaker {
    User,
    Agent(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub speaker: Speaker,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self { speaker: Speaker::User, content: content.into(), timestamp }
    }

    pub fn agent(
        name: impl Into<String>,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self { speaker: Speaker::Agent(name.into()), content: content.into(), timestamp }
    }
}

/// Per-customer conversation state. One row per customer in the session
/// store; `turn_sequence` increases monotonically across session lifetimes so
/// ordering survives expiry-and-recreate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub customer_id: CustomerId,
    pub turn_sequence: u64,
    pub history: Vec<ConversationTurn>,
    pub expires_at: DateTime<Utc>,
    pub active_collaborator: Option<String>,
}

impl ConversationSession {
    pub fn start(customer_id: CustomerId, now: DateTime<Utc>, idle_ttl_secs: u64) -> Self {
        Self {
            customer_id,
            turn_sequence: 0,
            history: Vec::new(),
            expires_at: now + Duration::seconds(idle_ttl_secs as i64),
            active_collaborator: None,
        }
    }

    /// Fresh session that continues a predecessor's turn numbering after the
    /// predecessor expired.
    pub fn start_after(
        customer_id: CustomerId,
        last_turn_sequence: u64,
        now: DateTime<Utc>,
        idle_ttl_secs: u64,
    ) -> Self {
        Self { turn_sequence: last_turn_sequence, ..Self::start(customer_id, now, idle_ttl_secs) }
    }

    pub fn is_expired(&self, at: DateTime<Utc>) -> bool {
        at >= self.expires_at
    }

    pub fn append(&mut self, turn: ConversationTurn) {
        self.history.push(turn);
    }

    /// Completes a turn: bumps the ordering key and pushes expiry out by the
    /// idle window.
    pub fn touch(&mut self, now: DateTime<Utc>, idle_ttl_secs: u64) {
        self.turn_sequence += 1;
        self.expires_at = now + Duration::seconds(idle_ttl_secs as i64);
    }

    /// Most recent history, capped at `max_pairs` user/agent message pairs.
    /// The completion capability never sees the unbounded transcript.
    pub fn recent_history(&self, max_pairs: usize) -> &[ConversationTurn] {
        let cap = max_pairs.saturating_mul(2);
        let start = self.history.len().saturating_sub(cap);
        &self.history[start..]
    }
}
