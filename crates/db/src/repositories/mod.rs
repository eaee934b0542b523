use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use wattson_core::domain::customer::CustomerId;
use wattson_core::domain::forecast::{ForecastEntry, MonthKey};
use wattson_core::domain::peak_load::{ItemId, PeakLoadItem};
use wattson_core::domain::session::ConversationSession;
use wattson_core::domain::solar::{SolarTicket, TicketId};

pub mod forecast;
pub mod memory;
pub mod peak_load;
pub mod session;
pub mod solar;

pub use forecast::SqlForecastRepository;
pub use memory::{
    InMemoryForecastRepository, InMemoryPeakLoadRepository, InMemorySessionRepository,
    InMemorySolarTicketRepository,
};
pub use peak_load::SqlPeakLoadRepository;
pub use session::SqlSessionRepository;
pub use solar::SqlSolarTicketRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Durable per-customer conversation state. Expiry is advisory: the store
/// never sweeps rows, it just refuses to return an expired session.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// The live session for a customer, or `None` when absent or past its
    /// expiry at `now`.
    async fn load_active(
        &self,
        customer_id: &CustomerId,
        now: DateTime<Utc>,
    ) -> Result<Option<ConversationSession>, RepositoryError>;

    /// Last persisted turn sequence regardless of expiry, so a successor
    /// session keeps the per-customer ordering monotonic.
    async fn last_turn_sequence(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Option<u64>, RepositoryError>;

    /// Whole-row upsert; concurrent saves for the same customer are
    /// last-write-wins.
    async fn save(&self, session: &ConversationSession) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ForecastRepository: Send + Sync {
    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<ForecastEntry>, RepositoryError>;

    async fn upsert(&self, entry: &ForecastEntry) -> Result<(), RepositoryError>;

    async fn find(
        &self,
        customer_id: &CustomerId,
        day: &MonthKey,
    ) -> Result<Option<ForecastEntry>, RepositoryError>;
}

#[async_trait]
pub trait SolarTicketRepository: Send + Sync {
    async fn insert(&self, ticket: &SolarTicket) -> Result<(), RepositoryError>;

    async fn find(
        &self,
        customer_id: &CustomerId,
        ticket_id: &TicketId,
    ) -> Result<Option<SolarTicket>, RepositoryError>;

    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<SolarTicket>, RepositoryError>;
}

#[async_trait]
pub trait PeakLoadRepository: Send + Sync {
    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<PeakLoadItem>, RepositoryError>;

    async fn find(
        &self,
        customer_id: &CustomerId,
        item_id: &ItemId,
    ) -> Result<Option<PeakLoadItem>, RepositoryError>;

    async fn save(&self, item: &PeakLoadItem) -> Result<(), RepositoryError>;
}
