//! Deterministic demo dataset for the domain stores. Used by `wattson seed`
//! and by end-to-end tests.

use chrono::{DateTime, Utc};

use wattson_core::domain::customer::CustomerId;
use wattson_core::domain::forecast::{ForecastEntry, MonthKey};
use wattson_core::domain::peak_load::{ItemId, PeakLoadItem};

use crate::repositories::{
    ForecastRepository, PeakLoadRepository, RepositoryError, SqlForecastRepository,
    SqlPeakLoadRepository,
};
use crate::DbPool;

pub const DEMO_CUSTOMER_ID: &str = "1";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedDataset {
    pub forecast_entries: Vec<ForecastEntry>,
    pub peak_load_items: Vec<PeakLoadItem>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub forecast_rows: usize,
    pub peak_load_rows: usize,
}

impl SeedDataset {
    /// Six months of measured usage, three months of forecast, and a small
    /// fleet of metered items for the demo customer, anchored at `now` so the
    /// statistics and peak actions always see a current month.
    pub fn demo(now: DateTime<Utc>) -> Self {
        let customer = CustomerId(DEMO_CUSTOMER_ID.to_string());
        let current = MonthKey::from_timestamp(now);

        let measured = [430, 455, 470, 520, 540, 505];
        let forecast = [515, 530, 498];

        let mut forecast_entries = Vec::new();
        for (index, usage_kwh) in measured.iter().enumerate() {
            let offset = index as i32 - measured.len() as i32 + 1;
            if let Some(day) = current.offset(offset) {
                forecast_entries.push(ForecastEntry {
                    customer_id: customer.clone(),
                    day,
                    usage_kwh: *usage_kwh,
                    forecasted: false,
                });
            }
        }
        for (index, usage_kwh) in forecast.iter().enumerate() {
            if let Some(day) = current.offset(index as i32 + 1) {
                forecast_entries.push(ForecastEntry {
                    customer_id: customer.clone(),
                    day,
                    usage_kwh: *usage_kwh,
                    forecasted: true,
                });
            }
        }

        let peak_load_items = vec![
            PeakLoadItem {
                customer_id: customer.clone(),
                item_id: ItemId("heat-pump".to_string()),
                allocated_quota: 220,
                peak_usage_kwh: 95,
                essential: true,
            },
            PeakLoadItem {
                customer_id: customer.clone(),
                item_id: ItemId("ev-charger".to_string()),
                allocated_quota: 180,
                peak_usage_kwh: 120,
                essential: false,
            },
            PeakLoadItem {
                customer_id: customer.clone(),
                item_id: ItemId("pool-pump".to_string()),
                allocated_quota: 60,
                peak_usage_kwh: 45,
                essential: false,
            },
            PeakLoadItem {
                customer_id: customer,
                item_id: ItemId("refrigeration".to_string()),
                allocated_quota: 90,
                peak_usage_kwh: 30,
                essential: true,
            },
        ];

        Self { forecast_entries, peak_load_items }
    }

    pub async fn apply(&self, pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let forecasts = SqlForecastRepository::new(pool.clone());
        for entry in &self.forecast_entries {
            forecasts.upsert(entry).await?;
        }

        let items = SqlPeakLoadRepository::new(pool.clone());
        for item in &self.peak_load_items {
            items.save(item).await?;
        }

        Ok(SeedResult {
            forecast_rows: self.forecast_entries.len(),
            peak_load_rows: self.peak_load_items.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use wattson_core::domain::customer::CustomerId;
    use wattson_core::domain::forecast::MonthKey;

    use crate::repositories::{ForecastRepository, PeakLoadRepository};
    use crate::repositories::{SqlForecastRepository, SqlPeakLoadRepository};
    use crate::{connect_with_settings, migrations};

    use super::{SeedDataset, DEMO_CUSTOMER_ID};

    #[tokio::test]
    async fn demo_dataset_covers_history_current_and_forecast_months() {
        let now = Utc::now();
        let dataset = SeedDataset::demo(now);
        let current = MonthKey::from_timestamp(now);

        assert!(dataset.forecast_entries.iter().any(|entry| entry.day == current));
        assert!(dataset.forecast_entries.iter().any(|entry| entry.forecasted));
        assert!(dataset.forecast_entries.iter().any(|entry| !entry.forecasted));
        assert_eq!(dataset.peak_load_items.len(), 4);
    }

    #[tokio::test]
    async fn apply_is_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        let dataset = SeedDataset::demo(Utc::now());
        let first = dataset.apply(&pool).await.expect("seed");
        let second = dataset.apply(&pool).await.expect("re-seed");
        assert_eq!(first, second);

        let customer = CustomerId(DEMO_CUSTOMER_ID.to_string());
        let forecasts = SqlForecastRepository::new(pool.clone())
            .list_for_customer(&customer)
            .await
            .expect("list forecasts");
        let items = SqlPeakLoadRepository::new(pool)
            .list_for_customer(&customer)
            .await
            .expect("list items");

        assert_eq!(forecasts.len(), first.forecast_rows);
        assert_eq!(items.len(), first.peak_load_rows);
    }
}
