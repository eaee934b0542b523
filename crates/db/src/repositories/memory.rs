use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use wattson_core::domain::customer::CustomerId;
use wattson_core::domain::forecast::{ForecastEntry, MonthKey};
use wattson_core::domain::peak_load::{ItemId, PeakLoadItem};
use wattson_core::domain::session::ConversationSession;
use wattson_core::domain::solar::{SolarTicket, TicketId};

use super::{
    ForecastRepository, PeakLoadRepository, RepositoryError, SessionRepository,
    SolarTicketRepository,
};

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<BTreeMap<String, ConversationSession>>,
}

#[async_trait::async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn load_active(
        &self,
        customer_id: &CustomerId,
        now: DateTime<Utc>,
    ) -> Result<Option<ConversationSession>, RepositoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&customer_id.0).filter(|session| !session.is_expired(now)).cloned())
    }

    async fn last_turn_sequence(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Option<u64>, RepositoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&customer_id.0).map(|session| session.turn_sequence))
    }

    async fn save(&self, session: &ConversationSession) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.customer_id.0.clone(), session.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryForecastRepository {
    entries: RwLock<BTreeMap<(String, String), ForecastEntry>>,
}

#[async_trait::async_trait]
impl ForecastRepository for InMemoryForecastRepository {
    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<ForecastEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .filter(|entry| entry.customer_id == *customer_id)
            .cloned()
            .collect())
    }

    async fn upsert(&self, entry: &ForecastEntry) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write().await;
        entries.insert((entry.customer_id.0.clone(), entry.day.0.clone()), entry.clone());
        Ok(())
    }

    async fn find(
        &self,
        customer_id: &CustomerId,
        day: &MonthKey,
    ) -> Result<Option<ForecastEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries.get(&(customer_id.0.clone(), day.0.clone())).cloned())
    }
}

#[derive(Default)]
pub struct InMemorySolarTicketRepository {
    tickets: RwLock<BTreeMap<(String, String), SolarTicket>>,
}

#[async_trait::async_trait]
impl SolarTicketRepository for InMemorySolarTicketRepository {
    async fn insert(&self, ticket: &SolarTicket) -> Result<(), RepositoryError> {
        let mut tickets = self.tickets.write().await;
        tickets.insert((ticket.customer_id.0.clone(), ticket.ticket_id.0.clone()), ticket.clone());
        Ok(())
    }

    async fn find(
        &self,
        customer_id: &CustomerId,
        ticket_id: &TicketId,
    ) -> Result<Option<SolarTicket>, RepositoryError> {
        let tickets = self.tickets.read().await;
        Ok(tickets.get(&(customer_id.0.clone(), ticket_id.0.clone())).cloned())
    }

    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<SolarTicket>, RepositoryError> {
        let tickets = self.tickets.read().await;
        let mut matching: Vec<SolarTicket> = tickets
            .values()
            .filter(|ticket| ticket.customer_id == *customer_id)
            .cloned()
            .collect();
        matching.sort_by_key(|ticket| ticket.opened_at);
        Ok(matching)
    }
}

#[derive(Default)]
pub struct InMemoryPeakLoadRepository {
    items: RwLock<BTreeMap<(String, String), PeakLoadItem>>,
}

#[async_trait::async_trait]
impl PeakLoadRepository for InMemoryPeakLoadRepository {
    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<PeakLoadItem>, RepositoryError> {
        let items = self.items.read().await;
        Ok(items.values().filter(|item| item.customer_id == *customer_id).cloned().collect())
    }

    async fn find(
        &self,
        customer_id: &CustomerId,
        item_id: &ItemId,
    ) -> Result<Option<PeakLoadItem>, RepositoryError> {
        let items = self.items.read().await;
        Ok(items.get(&(customer_id.0.clone(), item_id.0.clone())).cloned())
    }

    async fn save(&self, item: &PeakLoadItem) -> Result<(), RepositoryError> {
        let mut items = self.items.write().await;
        items.insert((item.customer_id.0.clone(), item.item_id.0.clone()), item.clone());
        Ok(())
    }
}
