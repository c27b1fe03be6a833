mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use salon_ledger::{
    errors::ServiceError,
    services::{
        customers::CustomerService, projection::PageProjector, ListingSettings, PageQuery,
        ProjectionStrategy,
    },
    store::{MemoryStore, RecordStore, Table},
};
use test_case::test_case;

use common::{appointment_row, customer_row, memory_store, purchase_row, seed, sqlite_store};

async fn seed_salon(store: &dyn RecordStore) {
    seed(
        store,
        Table::Customers,
        vec![
            customer_row(1, "Asha Nair", "2024-06-01T09:00:00.000Z", None),
            customer_row(2, "Bilal Khan", "2024-06-02T09:00:00.000Z", None),
            customer_row(3, "Chitra Das", "2024-06-03T09:00:00.000Z", None),
        ],
    )
    .await;
    seed(
        store,
        Table::Purchases,
        vec![
            purchase_row(1, "100.005"),
            purchase_row(1, "50.00"),
            purchase_row(1, "25.005"),
            purchase_row(3, "999.99"),
        ],
    )
    .await;
    seed(
        store,
        Table::Appointments,
        vec![
            appointment_row(1, "2024-05-01", "confirmed"),
            appointment_row(1, "2024-06-12", "pending"),
            appointment_row(3, "2024-04-20", "cancelled"),
        ],
    )
    .await;
}

fn service(store: Arc<dyn RecordStore>, strategy: ProjectionStrategy) -> CustomerService {
    let projector = PageProjector::new(store.clone())
        .with_strategy(strategy)
        .with_concurrency(2);
    CustomerService::new(store, projector, ListingSettings::default())
}

async fn page_carries_metrics(store: Arc<dyn RecordStore>, strategy: ProjectionStrategy) {
    seed_salon(store.as_ref()).await;

    let page = service(store, strategy)
        .list_customers(PageQuery::default())
        .await
        .unwrap();

    assert_eq!(page.total, 3);
    let ids: Vec<i64> = page.items.iter().map(|row| row.customer.id).collect();
    assert_eq!(ids, vec![3, 2, 1], "newest first");

    let asha = &page.items[2];
    assert_eq!(asha.total_purchase_value(), Some(dec!(175.01)));
    assert_eq!(asha.visit_count(), Some(2));
    assert_eq!(asha.last_visited_date(), NaiveDate::from_ymd_opt(2024, 6, 12));

    let bilal = &page.items[1];
    assert_eq!(bilal.total_purchase_value(), Some(dec!(0)));
    assert_eq!(bilal.visit_count(), Some(0));
    assert_eq!(bilal.last_visited_date(), None);

    let chitra = &page.items[0];
    assert_eq!(chitra.total_purchase_value(), Some(dec!(999.99)));
    assert_eq!(chitra.visit_count(), Some(1));
}

#[test_case(ProjectionStrategy::Batched ; "batched")]
#[test_case(ProjectionStrategy::FanOut ; "fan out")]
#[tokio::test]
async fn metrics_in_memory(strategy: ProjectionStrategy) {
    page_carries_metrics(memory_store(), strategy).await;
}

#[test_case(ProjectionStrategy::Batched ; "batched")]
#[test_case(ProjectionStrategy::FanOut ; "fan out")]
#[tokio::test]
async fn metrics_on_sqlite(strategy: ProjectionStrategy) {
    page_carries_metrics(sqlite_store().await, strategy).await;
}

#[tokio::test]
async fn batched_uses_one_read_per_related_table() {
    let store = memory_store();
    seed_salon(store.as_ref()).await;

    service(store.clone(), ProjectionStrategy::Batched)
        .list_customers(PageQuery::default())
        .await
        .unwrap();

    assert_eq!(store.read_count(Table::Purchases), 1);
    assert_eq!(store.read_count(Table::Appointments), 1);
}

#[tokio::test]
async fn fan_out_failure_degrades_one_row() {
    let store = memory_store();
    seed_salon(store.as_ref()).await;
    store.fail_matching(Table::Appointments, "customer_id", 2, "statement timeout");

    let page = service(store.clone(), ProjectionStrategy::FanOut)
        .list_customers(PageQuery::default())
        .await
        .unwrap();

    assert_eq!(page.items.len(), 3);
    assert!(page.items[1].metrics.is_none(), "Bilal's lookup failed");
    assert!(page.items[0].metrics.is_some());
    assert_eq!(page.items[2].total_purchase_value(), Some(dec!(175.01)));
}

#[tokio::test]
async fn batched_failure_degrades_the_page_not_the_call() {
    let store = memory_store();
    seed_salon(store.as_ref()).await;
    store.fail_table(Table::Purchases, "permission denied for table purchases");

    let page = service(store.clone(), ProjectionStrategy::Batched)
        .list_customers(PageQuery::default())
        .await
        .unwrap();

    assert_eq!(page.total, 3);
    assert!(page.items.iter().all(|row| row.metrics.is_none()));
}

#[tokio::test]
async fn customer_read_failure_fails_the_call() {
    let store = memory_store();
    seed_salon(store.as_ref()).await;
    store.fail_table(Table::Customers, "relation does not exist");

    let result = service(store, ProjectionStrategy::Batched)
        .list_customers(PageQuery::default())
        .await;

    assert_matches!(result, Err(ServiceError::StoreError(_)));
}

#[tokio::test]
async fn paging_and_search() {
    let store = sqlite_store().await;
    seed_salon(store.as_ref()).await;
    let service = service(store, ProjectionStrategy::Batched);

    let first = service
        .list_customers(PageQuery::new(1).per_page(2))
        .await
        .unwrap();
    assert_eq!(first.items.len(), 2);
    assert_eq!((first.total, first.total_pages, first.has_next), (3, 2, true));

    let second = service
        .list_customers(PageQuery::new(2).per_page(2))
        .await
        .unwrap();
    assert_eq!(second.items.len(), 1);
    assert!(!second.has_next);
    assert_eq!(second.items[0].customer.id, 1);

    let found = service
        .list_customers(PageQuery::default().search("khan"))
        .await
        .unwrap();
    assert_eq!(found.total, 1);
    assert_eq!(found.items[0].customer.name, "Bilal Khan");

    assert_matches!(
        service.list_customers(PageQuery::new(0)).await,
        Err(ServiceError::InvalidInput(_))
    );
}

#[tokio::test]
async fn slow_store_times_out_the_page() {
    let store: Arc<dyn RecordStore> =
        Arc::new(MemoryStore::new().with_latency(Duration::from_millis(500)));
    let settings = ListingSettings {
        deadline: Duration::from_millis(10),
        ..ListingSettings::default()
    };
    let service = CustomerService::new(store.clone(), PageProjector::new(store), settings);

    assert_matches!(
        service.list_customers(PageQuery::default()).await,
        Err(ServiceError::Timeout(d)) if d == Duration::from_millis(10)
    );
}
