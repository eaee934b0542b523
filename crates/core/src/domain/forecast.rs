use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;

/// One month of consumption for a customer, measured or forecast. Keyed by
/// `(customer_id, day)` where `day` is the `YYYY/MM` month bucket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub customer_id: CustomerId,
    pub day: MonthKey,
    pub usage_kwh: i64,
    pub forecasted: bool,
}

/// `YYYY/MM` month bucket used as the forecast store sort key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey(pub String);

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Self {
        Self(format!("{year:04}/{month:02}"))
    }

    pub fn from_timestamp(at: DateTime<Utc>) -> Self {
        Self::new(at.year(), at.month())
    }

    /// Same-year-wrapping month arithmetic for short projections.
    pub fn offset(&self, months: i32) -> Option<Self> {
        let (year, month) = self.parts()?;
        let zero_based = year * 12 + month as i32 - 1 + months;
        if zero_based < 0 {
            return None;
        }
        Some(Self::new(zero_based / 12, (zero_based % 12) as u32 + 1))
    }

    pub fn parts(&self) -> Option<(i32, u32)> {
        let (year, month) = self.0.split_once('/')?;
        let year = year.parse::<i32>().ok()?;
        let month = month.parse::<u32>().ok()?;
        (1..=12).contains(&month).then_some((year, month))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::MonthKey;

    #[test]
    fn month_key_formats_zero_padded() {
        assert_eq!(MonthKey::new(2026, 3).as_str(), "2026/03");
    }

    #[test]
    fn offset_wraps_year_boundaries() {
        let key = MonthKey::new(2026, 11);
        assert_eq!(key.offset(1), Some(MonthKey::new(2026, 12)));
        assert_eq!(key.offset(2), Some(MonthKey::new(2027, 1)));
        assert_eq!(key.offset(-11), Some(MonthKey::new(2025, 12)));
    }

    #[test]
    fn parts_rejects_malformed_keys() {
        assert_eq!(MonthKey("2026-03".to_string()).parts(), None);
        assert_eq!(MonthKey("2026/13".to_string()).parts(), None);
        assert_eq!(MonthKey("2026/07".to_string()).parts(), Some((2026, 7)));
    }
}
