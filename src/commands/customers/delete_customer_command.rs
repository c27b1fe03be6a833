use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::{
    commands::Command,
    common::CurrentUser,
    errors::ServiceError,
    store::{RecordStore, Table},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteCustomerCommand {
    pub customer_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteCustomerResult {
    pub id: i64,
}

#[async_trait]
impl Command for DeleteCustomerCommand {
    type Result = DeleteCustomerResult;

    #[instrument(skip(self, store, actor), fields(customer_id = self.customer_id, owner = %actor.id))]
    async fn execute(
        &self,
        store: Arc<dyn RecordStore>,
        actor: &CurrentUser,
    ) -> Result<Self::Result, ServiceError> {
        if !store.delete(Table::Customers, self.customer_id).await? {
            return Err(ServiceError::NotFound(format!(
                "Customer with ID {} not found",
                self.customer_id
            )));
        }

        info!("Customer deleted");
        Ok(DeleteCustomerResult {
            id: self.customer_id,
        })
    }
}
