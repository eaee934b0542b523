//! Action executors: one per domain, each owning its declared action group
//! and the only write path into its domain store.

use async_trait::async_trait;
use serde_json::Value;

use wattson_core::actions::{ActionGroup, ActionRequest};
use wattson_core::domain::customer::CustomerId;
use wattson_core::errors::ActionError;
use wattson_db::repositories::RepositoryError;

pub mod forecast;
pub mod peak_load;
pub mod solar;

pub use forecast::{forecast_action_group, ForecastActionExecutor};
pub use peak_load::{peak_load_action_group, PeakLoadActionExecutor};
pub use solar::{solar_action_group, SolarActionExecutor};

/// Resolves a declared action plus typed parameters into exactly one
/// domain-store operation. Anything outside the declared contract is
/// rejected before the store is touched.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    fn group(&self) -> &ActionGroup;

    async fn execute(
        &self,
        customer_id: &CustomerId,
        request: &ActionRequest,
    ) -> Result<Value, ActionError>;
}

/// The completion capability supplies `customer_id` as a declared parameter;
/// the conversation supplies it out-of-band. They must agree; an agent must
/// never read or write another customer's partition.
pub(crate) fn verify_customer_scope(
    request: &ActionRequest,
    customer_id: &CustomerId,
) -> Result<(), ActionError> {
    match request.string_arg("customer_id") {
        Some(requested) if requested == customer_id.as_str() => Ok(()),
        Some(_) => Err(ActionError::invalid_parameter(
            &request.name,
            "customer_id",
            "does not match the conversation's customer",
        )),
        // Absence is caught by declaration validation when required.
        None => Ok(()),
    }
}

pub(crate) fn store_failure(error: RepositoryError) -> ActionError {
    ActionError::ExecutionFailure(error.to_string())
}
