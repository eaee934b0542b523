use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use wattson_core::domain::customer::CustomerId;
use wattson_core::domain::solar::{SolarTicket, TicketId, TicketStatus};

use super::{RepositoryError, SolarTicketRepository};
use crate::DbPool;

pub struct SqlSolarTicketRepository {
    pool: DbPool,
}

impl SqlSolarTicketRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SolarTicketRepository for SqlSolarTicketRepository {
    async fn insert(&self, ticket: &SolarTicket) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO solar_ticket (customer_id, ticket_id, description, status, opened_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&ticket.customer_id.0)
        .bind(ticket.ticket_id.as_str())
        .bind(&ticket.description)
        .bind(ticket.status.as_str())
        .bind(ticket.opened_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(
        &self,
        customer_id: &CustomerId,
        ticket_id: &TicketId,
    ) -> Result<Option<SolarTicket>, RepositoryError> {
        let row = sqlx::query(
            "SELECT customer_id, ticket_id, description, status, opened_at
             FROM solar_ticket
             WHERE customer_id = ? AND ticket_id = ?",
        )
        .bind(&customer_id.0)
        .bind(ticket_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ticket_from_row).transpose()
    }

    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<SolarTicket>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT customer_id, ticket_id, description, status, opened_at
             FROM solar_ticket
             WHERE customer_id = ?
             ORDER BY opened_at ASC",
        )
        .bind(&customer_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ticket_from_row).collect()
    }
}

fn ticket_from_row(row: SqliteRow) -> Result<SolarTicket, RepositoryError> {
    let status_raw = row.get::<String, _>("status");
    let status = TicketStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown ticket status `{status_raw}`")))?;

    let opened_at_raw = row.get::<String, _>("opened_at");
    let opened_at = DateTime::parse_from_rfc3339(&opened_at_raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| {
            RepositoryError::Decode(format!("invalid timestamp `{opened_at_raw}`: {error}"))
        })?;

    Ok(SolarTicket {
        customer_id: CustomerId(row.get::<String, _>("customer_id")),
        ticket_id: TicketId(row.get::<String, _>("ticket_id")),
        description: row.get::<String, _>("description"),
        status,
        opened_at,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use wattson_core::domain::customer::CustomerId;
    use wattson_core::domain::solar::{SolarTicket, TicketStatus};

    use crate::repositories::{SolarTicketRepository, SqlSolarTicketRepository};
    use crate::{connect_with_settings, migrations};

    async fn repository() -> SqlSolarTicketRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        SqlSolarTicketRepository::new(pool)
    }

    #[tokio::test]
    async fn insert_and_find_round_trips() {
        let repo = repository().await;
        let ticket =
            SolarTicket::open(CustomerId("C1".to_string()), "panel output dropped", Utc::now());

        repo.insert(&ticket).await.expect("insert");
        let found = repo
            .find(&ticket.customer_id, &ticket.ticket_id)
            .await
            .expect("find")
            .expect("ticket should exist");

        assert_eq!(found.description, "panel output dropped");
        assert_eq!(found.status, TicketStatus::Open);
    }

    #[tokio::test]
    async fn listing_is_scoped_to_the_customer() {
        let repo = repository().await;
        let mine = SolarTicket::open(CustomerId("C1".to_string()), "inverter fault", Utc::now());
        let theirs = SolarTicket::open(CustomerId("C2".to_string()), "loose cable", Utc::now());

        repo.insert(&mine).await.expect("insert");
        repo.insert(&theirs).await.expect("insert");

        let tickets = repo.list_for_customer(&mine.customer_id).await.expect("list");
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].ticket_id, mine.ticket_id);
    }
}
