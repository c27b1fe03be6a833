use std::sync::Arc;
use tracing::{info, instrument};

use crate::{
    commands::{
        customers::{CreateCustomerCommand, DeleteCustomerCommand},
        Command,
    },
    common::{with_deadline, CurrentUser},
    errors::ServiceError,
    models::{Customer, CustomerWithMetrics},
    services::{
        pagination::{Page, PageQuery},
        projection::PageProjector,
        ListingSettings,
    },
    store::{decode_rows, Filter, ListQuery, RecordStore, Sort, Table},
};

/// Columns the customer table's search box matches against.
pub const CUSTOMER_SEARCH_COLUMNS: [&str; 4] = ["name", "email", "phone1", "dob"];

/// Service for managing customers
#[derive(Clone)]
pub struct CustomerService {
    store: Arc<dyn RecordStore>,
    projector: PageProjector,
    settings: ListingSettings,
}

impl CustomerService {
    /// Creates a new customer service instance
    pub fn new(store: Arc<dyn RecordStore>, projector: PageProjector, settings: ListingSettings) -> Self {
        Self {
            store,
            projector,
            settings,
        }
    }

    /// One page of customers, newest first, each with purchase and visit metrics.
    #[instrument(skip(self))]
    pub async fn list_customers(&self, query: PageQuery) -> Result<Page<CustomerWithMetrics>, ServiceError> {
        let window = query.window(self.settings.default_page_size, self.settings.max_page_size)?;
        let filter = Filter::new().search(query.search.as_deref(), &CUSTOMER_SEARCH_COLUMNS);
        let list = ListQuery::new(filter.clone())
            .sorted(Sort::desc("created_at"))
            .range(window.offset(), window.per_page);

        with_deadline(self.settings.deadline, async {
            let (total, rows) = tokio::try_join!(
                self.store.count(Table::Customers, &filter),
                self.store.list(Table::Customers, &list),
            )?;
            let customers: Vec<Customer> = decode_rows(Table::Customers, rows)?;
            let items = self.projector.project_page(customers).await;

            info!(total, returned = items.len(), page = window.page, "Customer page listed");
            Ok::<_, ServiceError>(Page::new(items, window, total))
        })
        .await
    }

    /// Creates a new customer
    #[instrument(skip(self, command, actor))]
    pub async fn create_customer(
        &self,
        command: CreateCustomerCommand,
        actor: &CurrentUser,
    ) -> Result<Customer, ServiceError> {
        command.execute(self.store.clone(), actor).await
    }

    /// Deletes a customer
    #[instrument(skip(self, actor))]
    pub async fn delete_customer(&self, customer_id: i64, actor: &CurrentUser) -> Result<(), ServiceError> {
        DeleteCustomerCommand { customer_id }
            .execute(self.store.clone(), actor)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StoreError;
    use crate::store::MockRecordStore;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn primary_page_failure_fails_the_call() {
        let mut store = MockRecordStore::new();
        store.expect_count().returning(|_, _| Ok(3));
        store
            .expect_list()
            .returning(|_, _| Err(StoreError::new("JWT expired")));
        let store: Arc<dyn RecordStore> = Arc::new(store);

        let service = CustomerService::new(store.clone(), PageProjector::new(store), ListingSettings::default());
        let result = service.list_customers(PageQuery::default()).await;

        assert_matches!(result, Err(ServiceError::StoreError(e)) if e.message == "JWT expired");
    }
}
