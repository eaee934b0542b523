use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use wattson_core::actions::{ActionGroup, ActionDeclaration, ActionRequest, ParameterSpec, ParameterType};
use wattson_core::domain::customer::CustomerId;
use wattson_core::domain::forecast::{ForecastEntry, MonthKey};
use wattson_core::errors::ActionError;
use wattson_db::repositories::ForecastRepository;

use super::{store_failure, verify_customer_scope, ActionExecutor};

/// Flat projection used when a customer has no forecast rows yet.
/// `get_forecasted_consumption` never fails on absent data; the other read
/// actions do.
const DEFAULT_MONTHLY_FORECAST_KWH: i64 = 500;
const PROJECTION_MONTHS: i32 = 3;

pub fn forecast_action_group() -> ActionGroup {
    let customer_parameter = || {
        ParameterSpec::required("customer_id", ParameterType::String, "Unique customer identifier")
    };

    ActionGroup::new("forecast_consumption_actions", "Function to get usage forecast for a user")
        .with_action(
            ActionDeclaration::new(
                "get_forecasted_consumption",
                "Gets the next 3 months energy usage forecast",
            )
            .with_parameter(customer_parameter()),
        )
        .with_action(
            ActionDeclaration::new(
                "get_historical_consumption",
                "Gets energy usage history to date",
            )
            .with_parameter(customer_parameter()),
        )
        .with_action(
            ActionDeclaration::new(
                "get_consumption_statistics",
                "Gets current month usage analytics",
            )
            .with_parameter(customer_parameter()),
        )
        .with_action(
            ActionDeclaration::new(
                "update_forecasting",
                "Updates the energy forecast for a specific month",
            )
            .with_parameter(customer_parameter())
            .with_parameter(ParameterSpec::required(
                "month",
                ParameterType::Integer,
                "Target update month. In the format MM",
            ))
            .with_parameter(ParameterSpec::required(
                "year",
                ParameterType::Integer,
                "Target update year. In the format YYYY",
            ))
            .with_parameter(ParameterSpec::required(
                "usage",
                ParameterType::Integer,
                "New consumption value",
            )),
        )
}

pub struct ForecastActionExecutor {
    group: ActionGroup,
    repository: Arc<dyn ForecastRepository>,
}

impl ForecastActionExecutor {
    pub fn new(repository: Arc<dyn ForecastRepository>) -> Self {
        Self { group: forecast_action_group(), repository }
    }

    async fn forecasted_consumption(&self, customer_id: &CustomerId) -> Result<Value, ActionError> {
        let entries =
            self.repository.list_for_customer(customer_id).await.map_err(store_failure)?;
        let current = MonthKey::from_timestamp(Utc::now());

        let mut projection = Vec::new();
        for offset in 1..=PROJECTION_MONTHS {
            let Some(day) = current.offset(offset) else { continue };
            match entries.iter().find(|entry| entry.forecasted && entry.day == day) {
                Some(entry) => projection.push(json!({
                    "day": entry.day.as_str(),
                    "usage_kwh": entry.usage_kwh,
                    "source": "forecast",
                })),
                None => projection.push(json!({
                    "day": day.as_str(),
                    "usage_kwh": DEFAULT_MONTHLY_FORECAST_KWH,
                    "source": "default",
                })),
            }
        }

        Ok(json!({ "customer_id": customer_id.as_str(), "projection": projection }))
    }

    async fn historical_consumption(&self, customer_id: &CustomerId) -> Result<Value, ActionError> {
        let entries =
            self.repository.list_for_customer(customer_id).await.map_err(store_failure)?;
        let history: Vec<Value> = entries
            .iter()
            .filter(|entry| !entry.forecasted)
            .map(|entry| json!({ "day": entry.day.as_str(), "usage_kwh": entry.usage_kwh }))
            .collect();

        if history.is_empty() {
            return Err(ActionError::NotFound(format!(
                "no usage history recorded for customer `{customer_id}`"
            )));
        }

        Ok(json!({ "customer_id": customer_id.as_str(), "history": history }))
    }

    async fn consumption_statistics(&self, customer_id: &CustomerId) -> Result<Value, ActionError> {
        let entries =
            self.repository.list_for_customer(customer_id).await.map_err(store_failure)?;
        if entries.is_empty() {
            return Err(ActionError::NotFound(format!(
                "no consumption data recorded for customer `{customer_id}`"
            )));
        }

        let current = MonthKey::from_timestamp(Utc::now());
        let current_usage =
            entries.iter().find(|entry| entry.day == current).map(|entry| entry.usage_kwh);

        let measured: Vec<i64> = entries
            .iter()
            .filter(|entry| !entry.forecasted && entry.day != current)
            .map(|entry| entry.usage_kwh)
            .collect();
        let trailing_average = if measured.is_empty() {
            None
        } else {
            Some(measured.iter().sum::<i64>() / measured.len() as i64)
        };

        let deviation_pct = match (current_usage, trailing_average) {
            (Some(usage), Some(average)) if average != 0 => {
                Some(((usage - average) * 100) / average)
            }
            _ => None,
        };

        Ok(json!({
            "customer_id": customer_id.as_str(),
            "month": current.as_str(),
            "current_usage_kwh": current_usage,
            "trailing_average_kwh": trailing_average,
            "deviation_pct": deviation_pct,
        }))
    }

    /// Set-style write: replaying the exact same parameters leaves the store
    /// unchanged after the second call.
    async fn update_forecasting(
        &self,
        customer_id: &CustomerId,
        request: &ActionRequest,
    ) -> Result<Value, ActionError> {
        let month = request.integer_arg("month").unwrap_or_default();
        if !(1..=12).contains(&month) {
            return Err(ActionError::invalid_parameter(
                &request.name,
                "month",
                "must be in range 1..=12",
            ));
        }

        let year = request.integer_arg("year").unwrap_or_default();
        if !(2000..=2100).contains(&year) {
            return Err(ActionError::invalid_parameter(
                &request.name,
                "year",
                "must be a four-digit year",
            ));
        }

        let usage = request.integer_arg("usage").unwrap_or_default();
        if usage < 0 {
            return Err(ActionError::invalid_parameter(
                &request.name,
                "usage",
                "must not be negative",
            ));
        }

        let entry = ForecastEntry {
            customer_id: customer_id.clone(),
            day: MonthKey::new(year as i32, month as u32),
            usage_kwh: usage,
            forecasted: true,
        };
        self.repository.upsert(&entry).await.map_err(store_failure)?;

        Ok(json!({
            "status": "updated",
            "day": entry.day.as_str(),
            "usage_kwh": entry.usage_kwh,
        }))
    }
}

#[async_trait]
impl ActionExecutor for ForecastActionExecutor {
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
            "get_forecasted_consumption" => self.forecasted_consumption(customer_id).await,
            "get_historical_consumption" => self.historical_consumption(customer_id).await,
            "get_consumption_statistics" => self.consumption_statistics(customer_id).await,
            "update_forecasting" => self.update_forecasting(customer_id, request).await,
            other => Err(ActionError::UnknownAction(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use wattson_core::actions::ActionRequest;
    use wattson_core::domain::customer::CustomerId;
    use wattson_core::domain::forecast::{ForecastEntry, MonthKey};
    use wattson_core::errors::ActionError;
    use wattson_db::repositories::{ForecastRepository, InMemoryForecastRepository};

    use crate::executor::ActionExecutor;

    use super::ForecastActionExecutor;

    fn customer() -> CustomerId {
        CustomerId("C1".to_string())
    }

    fn executor() -> (ForecastActionExecutor, Arc<InMemoryForecastRepository>) {
        let repository = Arc::new(InMemoryForecastRepository::default());
        (ForecastActionExecutor::new(repository.clone()), repository)
    }

    async fn seed_measured(repository: &InMemoryForecastRepository, offsets: &[(i32, i64)]) {
        let current = MonthKey::from_timestamp(Utc::now());
        for (offset, usage_kwh) in offsets {
            let entry = ForecastEntry {
                customer_id: customer(),
                day: current.offset(*offset).expect("valid month"),
                usage_kwh: *usage_kwh,
                forecasted: false,
            };
            repository.upsert(&entry).await.expect("seed");
        }
    }

    #[tokio::test]
    async fn undeclared_action_is_rejected_without_store_access() {
        let (executor, repository) = executor();
        let request = ActionRequest::new("drop_forecasts").with_string("customer_id", "C1");

        let error = executor.execute(&customer(), &request).await.expect_err("unknown action");

        assert_eq!(error, ActionError::UnknownAction("drop_forecasts".to_string()));
        assert!(repository.list_for_customer(&customer()).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn missing_required_parameter_is_rejected_without_mutation() {
        let (executor, repository) = executor();
        let request = ActionRequest::new("update_forecasting")
            .with_string("customer_id", "C1")
            .with_integer("month", 9)
            .with_integer("year", 2026);

        let error = executor.execute(&customer(), &request).await.expect_err("missing usage");

        assert!(matches!(error, ActionError::InvalidParameter { ref parameter, .. } if parameter == "usage"));
        assert!(repository.list_for_customer(&customer()).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn out_of_range_month_names_the_parameter() {
        let (executor, _repository) = executor();
        let request = ActionRequest::new("update_forecasting")
            .with_string("customer_id", "C1")
            .with_integer("month", 13)
            .with_integer("year", 2026)
            .with_integer("usage", 500);

        let error = executor.execute(&customer(), &request).await.expect_err("bad month");
        assert!(matches!(error, ActionError::InvalidParameter { ref parameter, .. } if parameter == "month"));
    }

    #[tokio::test]
    async fn update_forecasting_is_idempotent_on_exact_replay() {
        let (executor, repository) = executor();
        let request = ActionRequest::new("update_forecasting")
            .with_string("customer_id", "C1")
            .with_integer("month", 9)
            .with_integer("year", 2026)
            .with_integer("usage", 520);

        executor.execute(&customer(), &request).await.expect("first update");
        executor.execute(&customer(), &request).await.expect("replayed update");

        let entries = repository.list_for_customer(&customer()).await.expect("list");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].usage_kwh, 520);
        assert!(entries[0].forecasted);
    }

    #[tokio::test]
    async fn forecast_synthesizes_default_projection_when_no_rows_exist() {
        let (executor, _repository) = executor();
        let request =
            ActionRequest::new("get_forecasted_consumption").with_string("customer_id", "C1");

        let result = executor.execute(&customer(), &request).await.expect("default projection");

        let projection = result["projection"].as_array().expect("projection array");
        assert_eq!(projection.len(), 3);
        assert!(projection.iter().all(|month| month["source"] == "default"));
    }

    #[tokio::test]
    async fn history_requires_preexisting_data() {
        let (executor, repository) = executor();
        let request =
            ActionRequest::new("get_historical_consumption").with_string("customer_id", "C1");

        let error = executor.execute(&customer(), &request).await.expect_err("no history");
        assert!(matches!(error, ActionError::NotFound(_)));

        seed_measured(&repository, &[(-2, 480), (-1, 505)]).await;
        let result = executor.execute(&customer(), &request).await.expect("history");
        assert_eq!(result["history"].as_array().expect("history array").len(), 2);
    }

    #[tokio::test]
    async fn statistics_compare_current_month_against_trailing_average() {
        let (executor, repository) = executor();
        seed_measured(&repository, &[(-2, 400), (-1, 500), (0, 540)]).await;

        let request =
            ActionRequest::new("get_consumption_statistics").with_string("customer_id", "C1");
        let result = executor.execute(&customer(), &request).await.expect("statistics");

        assert_eq!(result["current_usage_kwh"], 540);
        assert_eq!(result["trailing_average_kwh"], 450);
        assert_eq!(result["deviation_pct"], 20);
    }

    #[tokio::test]
    async fn foreign_customer_parameter_is_rejected() {
        let (executor, _repository) = executor();
        let request =
            ActionRequest::new("get_forecasted_consumption").with_string("customer_id", "C2");

        let error = executor.execute(&customer(), &request).await.expect_err("scope mismatch");
        assert!(matches!(error, ActionError::InvalidParameter { ref parameter, .. } if parameter == "customer_id"));
    }
}
