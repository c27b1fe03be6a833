use serde::{Deserialize, Serialize};

/// A bookable salon service (haircut, facial, ...).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: i64,
    pub name: String,
}
