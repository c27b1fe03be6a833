use crate::{
    common::{CurrentUser, Timestamp},
    errors::ServiceError,
    store::{RecordStore, Row},
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Command trait for implementing the Command Pattern
///
/// A command carries the submitted payload for one write, validates it and
/// applies it to the row store on behalf of an explicit user.
#[async_trait]
pub trait Command: Send + Sync {
    /// The return type of the command when executed successfully
    type Result;

    /// Execute the command with the given dependencies
    ///
    /// # Arguments
    /// * `store` - Row store the write is applied to
    /// * `actor` - Signed-in user the write is performed for
    ///
    /// # Returns
    /// * `Result<Self::Result, ServiceError>` - The result of command execution or an error
    async fn execute(
        &self,
        store: Arc<dyn RecordStore>,
        actor: &CurrentUser,
    ) -> Result<Self::Result, ServiceError>;
}

/// Stamps the owning user and the given timestamp columns onto a new row.
pub(crate) fn stamp_row(row: &mut Row, actor: &CurrentUser, now: &Timestamp, columns: &[&str]) {
    row.insert("UID".to_string(), Value::String(actor.id.to_string()));
    for column in columns {
        row.insert(column.to_string(), Value::String(now.to_iso_string()));
    }
}

pub mod appointments;
pub mod customers;
pub mod staff;

pub use appointments::CreateAppointmentCommand;
pub use customers::{CreateCustomerCommand, DeleteCustomerCommand};
pub use staff::CreateStaffCommand;
