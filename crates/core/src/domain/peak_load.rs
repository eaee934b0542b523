use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A metered process or device reported by the customer's IoT gateway.
/// Keyed by `(customer_id, item_id)`. `allocated_quota` is the current-month
/// energy budget the peak-load agent redistributes between items.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakLoadItem {
    pub customer_id: CustomerId,
    pub item_id: ItemId,
    pub allocated_quota: i64,
    pub peak_usage_kwh: i64,
    pub essential: bool,
}

impl PeakLoadItem {
    /// Quota redistribution is additive. Replaying the same delta moves the
    /// quota again; the floor at zero is the only clamp.
    pub fn apply_quota_delta(&mut self, delta: i64) {
        self.allocated_quota = (self.allocated_quota + delta).max(0);
    }
}
