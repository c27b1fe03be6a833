use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::deserialize_optional_decimal;

/// A purchase row. Authored elsewhere; only read here for customer metrics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    #[serde(default)]
    pub id: Option<i64>,
    pub customer_id: i64,
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub amount: Option<Decimal>,
}
