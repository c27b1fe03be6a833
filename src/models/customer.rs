use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Gender;
use crate::common::{deserialize_calendar_date, deserialize_optional_calendar_date, Timestamp};

/// A salon customer as persisted in the `customers` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone1: String,
    #[serde(default)]
    pub phone2: Option<String>,
    pub gender: Gender,
    #[serde(deserialize_with = "deserialize_calendar_date")]
    pub dob: NaiveDate,
    #[serde(default, deserialize_with = "deserialize_optional_calendar_date")]
    pub anniversary_date: Option<NaiveDate>,
    pub address: String,
    pub pincode: String,
    /// Owning user.
    #[serde(rename = "UID", default)]
    pub owner_id: Option<Uuid>,
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
    #[serde(default)]
    pub last_activity_at: Option<Timestamp>,
}

/// Values derived per customer from related purchases and appointments.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerMetrics {
    /// Sum of purchase amounts rounded half-up to cents.
    pub total_purchase_value: Decimal,
    pub visit_count: u64,
    pub last_visited_date: Option<NaiveDate>,
}

/// A customer table row: the stored customer plus derived metrics.
///
/// `metrics` is `None` when the related rows could not be read for this
/// customer; the rest of the page is unaffected.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CustomerWithMetrics {
    #[serde(flatten)]
    pub customer: Customer,
    pub metrics: Option<CustomerMetrics>,
}

impl CustomerWithMetrics {
    pub fn total_purchase_value(&self) -> Option<Decimal> {
        self.metrics.as_ref().map(|m| m.total_purchase_value)
    }

    pub fn visit_count(&self) -> Option<u64> {
        self.metrics.as_ref().map(|m| m.visit_count)
    }

    pub fn last_visited_date(&self) -> Option<NaiveDate> {
        self.metrics.as_ref().and_then(|m| m.last_visited_date)
    }
}
