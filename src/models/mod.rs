// Salon back-office models decoded from row store rows
pub mod appointment;
pub mod customer;
pub mod purchase;
pub mod service;
pub mod staff;

pub use appointment::{Appointment, AppointmentStatus, ServiceAssignment, VisitRow};
pub use customer::{Customer, CustomerMetrics, CustomerWithMetrics};
pub use purchase::Purchase;
pub use service::Service;
pub use staff::Staff;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Gender as captured on customer and staff forms.
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
pub enum Gender {
    Male,
    Female,
    Other,
}
