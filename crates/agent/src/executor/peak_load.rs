use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use wattson_core::actions::{ActionGroup, ActionDeclaration, ActionRequest, ParameterSpec, ParameterType};
use wattson_core::domain::customer::CustomerId;
use wattson_core::domain::forecast::MonthKey;
use wattson_core::domain::peak_load::ItemId;
use wattson_core::errors::ActionError;
use wattson_db::repositories::PeakLoadRepository;

use super::{store_failure, verify_customer_scope, ActionExecutor};

pub fn peak_load_action_group() -> ActionGroup {
    let customer_parameter =
        || ParameterSpec::required("customer_id", ParameterType::String, "The ID of the customer");

    ActionGroup::new("peak_load_actions", "Function to get usage, peaks, redistribution for a user")
        .with_action(
            ActionDeclaration::new("detect_peak", "detect consumption peak during current month")
                .with_parameter(customer_parameter()),
        )
        .with_action(
            ActionDeclaration::new(
                "detect_non_essential_processes",
                "detect non-essential processes that are causing the peaks",
            )
            .with_parameter(customer_parameter()),
        )
        .with_action(
            ActionDeclaration::new(
                "redistribute_allocation",
                "reduce/increase allocated quota for a specific item during current month",
            )
            .with_parameter(customer_parameter())
            .with_parameter(ParameterSpec::required(
                "item_id",
                ParameterType::String,
                "Item that will be updated",
            ))
            .with_parameter(ParameterSpec::required(
                "quota_delta",
                ParameterType::Integer,
                "Signed change applied to the item's allocated quota. Not idempotent: \
                 replaying the same delta moves the quota again.",
            )),
        )
}

pub struct PeakLoadActionExecutor {
    group: ActionGroup,
    repository: Arc<dyn PeakLoadRepository>,
}

impl PeakLoadActionExecutor {
    pub fn new(repository: Arc<dyn PeakLoadRepository>) -> Self {
        Self { group: peak_load_action_group(), repository }
    }

    async fn detect_peak(&self, customer_id: &CustomerId) -> Result<Value, ActionError> {
        let items = self.repository.list_for_customer(customer_id).await.map_err(store_failure)?;
        let Some(peak_item) = items.iter().max_by_key(|item| item.peak_usage_kwh) else {
            return Err(ActionError::NotFound(format!(
                "no metered items recorded for customer `{customer_id}`"
            )));
        };

        let total_peak_usage: i64 = items.iter().map(|item| item.peak_usage_kwh).sum();
        let total_allocated: i64 = items.iter().map(|item| item.allocated_quota).sum();

        Ok(json!({
            "customer_id": customer_id.as_str(),
            "month": MonthKey::from_timestamp(Utc::now()).as_str(),
            "total_peak_usage_kwh": total_peak_usage,
            "total_allocated_quota": total_allocated,
            "peak_item": {
                "item_id": peak_item.item_id.as_str(),
                "peak_usage_kwh": peak_item.peak_usage_kwh,
                "essential": peak_item.essential,
            },
        }))
    }

    async fn detect_non_essential(&self, customer_id: &CustomerId) -> Result<Value, ActionError> {
        let items = self.repository.list_for_customer(customer_id).await.map_err(store_failure)?;
        if items.is_empty() {
            return Err(ActionError::NotFound(format!(
                "no metered items recorded for customer `{customer_id}`"
            )));
        }

        let mut non_essential: Vec<_> =
            items.into_iter().filter(|item| !item.essential).collect();
        non_essential.sort_by_key(|item| std::cmp::Reverse(item.peak_usage_kwh));

        Ok(json!({
            "customer_id": customer_id.as_str(),
            "items": non_essential
                .iter()
                .map(|item| json!({
                    "item_id": item.item_id.as_str(),
                    "peak_usage_kwh": item.peak_usage_kwh,
                    "allocated_quota": item.allocated_quota,
                }))
                .collect::<Vec<_>>(),
        }))
    }

    /// Increment-style write: the delta is applied on every call, so this
    /// action is deliberately NOT idempotent (the declaration says so too).
    async fn redistribute_allocation(
        &self,
        customer_id: &CustomerId,
        request: &ActionRequest,
    ) -> Result<Value, ActionError> {
        let item_id = ItemId(request.string_arg("item_id").unwrap_or_default().to_string());
        let delta = request.integer_arg("quota_delta").unwrap_or_default();

        let mut item = self
            .repository
            .find(customer_id, &item_id)
            .await
            .map_err(store_failure)?
            .ok_or_else(|| {
                ActionError::NotFound(format!(
                    "item `{item_id}` was not found for customer `{customer_id}`"
                ))
            })?;

        item.apply_quota_delta(delta);
        self.repository.save(&item).await.map_err(store_failure)?;

        Ok(json!({
            "item_id": item.item_id.as_str(),
            "allocated_quota": item.allocated_quota,
            "applied_delta": delta,
        }))
    }
}

#[async_trait]
impl ActionExecutor for PeakLoadActionExecutor {
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
            "detect_peak" => self.detect_peak(customer_id).await,
            "detect_non_essential_processes" => self.detect_non_essential(customer_id).await,
            "redistribute_allocation" => self.redistribute_allocation(customer_id, request).await,
            other => Err(ActionError::UnknownAction(other.to_string())),
        }
    }
}
