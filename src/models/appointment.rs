use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::common::{
    deserialize_calendar_date, deserialize_flag, deserialize_json_text,
    deserialize_optional_decimal, Timestamp,
};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AppointmentStatus {
    Confirmed,
    Pending,
    Cancelled,
}

/// One service booked within an appointment and the staff member doing it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceAssignment {
    pub service_id: i64,
    pub staff_id: i64,
}

/// An appointment as persisted in the `appointments` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub customer_id: i64,
    #[serde(deserialize_with = "deserialize_json_text")]
    pub services: Vec<ServiceAssignment>,
    #[serde(deserialize_with = "deserialize_calendar_date")]
    pub appointment_date: NaiveDate,
    #[serde(default)]
    pub appointment_time: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub advance_paid: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_cancelled: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_done: bool,
    pub status: AppointmentStatus,
    #[serde(rename = "UID", default)]
    pub owner_id: Option<Uuid>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

/// The slice of an appointment row the customer metrics need.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct VisitRow {
    pub customer_id: i64,
    #[serde(deserialize_with = "deserialize_calendar_date")]
    pub appointment_date: NaiveDate,
}
