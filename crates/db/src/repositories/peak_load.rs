use sqlx::{sqlite::SqliteRow, Row};

use wattson_core::domain::customer::CustomerId;
use wattson_core::domain::peak_load::{ItemId, PeakLoadItem};

use super::{PeakLoadRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPeakLoadRepository {
    pool: DbPool,
}

impl SqlPeakLoadRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PeakLoadRepository for SqlPeakLoadRepository {
    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<PeakLoadItem>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT customer_id, item_id, allocated_quota, peak_usage_kwh, essential
             FROM peak_load_item
             WHERE customer_id = ?
             ORDER BY item_id ASC",
        )
        .bind(&customer_id.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(item_from_row).collect())
    }

    async fn find(
        &self,
        customer_id: &CustomerId,
        item_id: &ItemId,
    ) -> Result<Option<PeakLoadItem>, RepositoryError> {
        let row = sqlx::query(
            "SELECT customer_id, item_id, allocated_quota, peak_usage_kwh, essential
             FROM peak_load_item
             WHERE customer_id = ? AND item_id = ?",
        )
        .bind(&customer_id.0)
        .bind(item_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(item_from_row))
    }

    async fn save(&self, item: &PeakLoadItem) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO peak_load_item (
                customer_id, item_id, allocated_quota, peak_usage_kwh, essential
             ) VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(customer_id, item_id) DO UPDATE SET
                allocated_quota = excluded.allocated_quota,
                peak_usage_kwh = excluded.peak_usage_kwh,
                essential = excluded.essential",
        )
        .bind(&item.customer_id.0)
        .bind(item.item_id.as_str())
        .bind(item.allocated_quota)
        .bind(item.peak_usage_kwh)
        .bind(item.essential as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn item_from_row(row: SqliteRow) -> PeakLoadItem {
    PeakLoadItem {
        customer_id: CustomerId(row.get::<String, _>("customer_id")),
        item_id: ItemId(row.get::<String, _>("item_id")),
        allocated_quota: row.get::<i64, _>("allocated_quota"),
        peak_usage_kwh: row.get::<i64, _>("peak_usage_kwh"),
        essential: row.get::<i64, _>("essential") != 0,
    }
}

#[cfg(test)]
mod tests {
    use wattson_core::domain::customer::CustomerId;
    use wattson_core::domain::peak_load::{ItemId, PeakLoadItem};

    use crate::repositories::{PeakLoadRepository, SqlPeakLoadRepository};
    use crate::{connect_with_settings, migrations};

    async fn repository() -> SqlPeakLoadRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        SqlPeakLoadRepository::new(pool)
    }

    fn item(item_id: &str, quota: i64) -> PeakLoadItem {
        PeakLoadItem {
            customer_id: CustomerId("C1".to_string()),
            item_id: ItemId(item_id.to_string()),
            allocated_quota: quota,
            peak_usage_kwh: 40,
            essential: false,
        }
    }

    #[tokio::test]
    async fn save_then_adjust_quota_round_trips() {
        let repo = repository().await;
        let mut stored = item("hvac-2", 100);
        repo.save(&stored).await.expect("save");

        stored.apply_quota_delta(-30);
        repo.save(&stored).await.expect("save adjusted");

        let found = repo
            .find(&stored.customer_id, &stored.item_id)
            .await
            .expect("find")
            .expect("item should exist");
        assert_eq!(found.allocated_quota, 70);
    }

    #[tokio::test]
    async fn missing_item_reads_as_absent() {
        let repo = repository().await;
        let found = repo
            .find(&CustomerId("C1".to_string()), &ItemId("missing".to_string()))
            .await
            .expect("find");
        assert_eq!(found, None);
    }
}
