use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Gender;
use crate::common::{deserialize_calendar_date, Timestamp};

/// A staff member as persisted in the `staff` table.
///
/// Column names (`email_id`, `phone_number1`, `date_of_birth`) differ from
/// the customer table; they are kept as the backend stores them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Staff {
    pub id: i64,
    pub name: String,
    pub email_id: String,
    pub phone_number1: String,
    #[serde(default)]
    pub phone_number2: Option<String>,
    pub gender: Gender,
    #[serde(deserialize_with = "deserialize_calendar_date")]
    pub date_of_birth: NaiveDate,
    pub address: String,
    pub pincode: String,
    #[serde(rename = "UID", default)]
    pub owner_id: Option<Uuid>,
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}
