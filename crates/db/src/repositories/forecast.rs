use sqlx::{sqlite::SqliteRow, Row};

use wattson_core::domain::customer::CustomerId;
use wattson_core::domain::forecast::{ForecastEntry, MonthKey};

use super::{ForecastRepository, RepositoryError};
use crate::DbPool;

pub struct SqlForecastRepository {
    pool: DbPool,
}

impl SqlForecastRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ForecastRepository for SqlForecastRepository {
    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<ForecastEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT customer_id, day, usage_kwh, forecasted
             FROM forecast_entry
             WHERE customer_id = ?
             ORDER BY day ASC",
        )
        .bind(&customer_id.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(entry_from_row).collect())
    }

    async fn upsert(&self, entry: &ForecastEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO forecast_entry (customer_id, day, usage_kwh, forecasted)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(customer_id, day) DO UPDATE SET
                usage_kwh = excluded.usage_kwh,
                forecasted = excluded.forecasted",
        )
        .bind(&entry.customer_id.0)
        .bind(entry.day.as_str())
        .bind(entry.usage_kwh)
        .bind(entry.forecasted as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(
        &self,
        customer_id: &CustomerId,
        day: &MonthKey,
    ) -> Result<Option<ForecastEntry>, RepositoryError> {
        let row = sqlx::query(
            "SELECT customer_id, day, usage_kwh, forecasted
             FROM forecast_entry
             WHERE customer_id = ? AND day = ?",
        )
        .bind(&customer_id.0)
        .bind(day.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(entry_from_row))
    }
}

fn entry_from_row(row: SqliteRow) -> ForecastEntry {
    ForecastEntry {
        customer_id: CustomerId(row.get::<String, _>("customer_id")),
        day: MonthKey(row.get::<String, _>("day")),
        usage_kwh: row.get::<i64, _>("usage_kwh"),
        forecasted: row.get::<i64, _>("forecasted") != 0,
    }
}

#[cfg(test)]
mod tests {
    use wattson_core::domain::customer::CustomerId;
    use wattson_core::domain::forecast::{ForecastEntry, MonthKey};

    use crate::repositories::{ForecastRepository, SqlForecastRepository};
    use crate::{connect_with_settings, migrations};

    async fn repository() -> SqlForecastRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        SqlForecastRepository::new(pool)
    }

    fn entry(day: MonthKey, usage_kwh: i64, forecasted: bool) -> ForecastEntry {
        ForecastEntry { customer_id: CustomerId("C1".to_string()), day, usage_kwh, forecasted }
    }

    #[tokio::test]
    async fn upsert_replaces_the_same_month_bucket() {
        let repo = repository().await;
        let customer = CustomerId("C1".to_string());

        repo.upsert(&entry(MonthKey::new(2026, 7), 480, false)).await.expect("insert");
        repo.upsert(&entry(MonthKey::new(2026, 7), 510, false)).await.expect("replace");

        let entries = repo.list_for_customer(&customer).await.expect("list");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].usage_kwh, 510);
    }

    #[tokio::test]
    async fn listing_is_ordered_by_month() {
        let repo = repository().await;
        let customer = CustomerId("C1".to_string());

        repo.upsert(&entry(MonthKey::new(2026, 9), 520, true)).await.expect("insert");
        repo.upsert(&entry(MonthKey::new(2026, 7), 480, false)).await.expect("insert");
        repo.upsert(&entry(MonthKey::new(2026, 8), 495, true)).await.expect("insert");

        let entries = repo.list_for_customer(&customer).await.expect("list");
        let days: Vec<&str> = entries.iter().map(|entry| entry.day.as_str()).collect();
        assert_eq!(days, vec!["2026/07", "2026/08", "2026/09"]);
    }

    #[tokio::test]
    async fn find_is_scoped_to_the_customer_partition() {
        let repo = repository().await;

        repo.upsert(&entry(MonthKey::new(2026, 7), 480, false)).await.expect("insert");

        let other = CustomerId("C2".to_string());
        let found = repo.find(&other, &MonthKey::new(2026, 7)).await.expect("find");
        assert_eq!(found, None);
    }
}
