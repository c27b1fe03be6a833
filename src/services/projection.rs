//! Joins a page of customers with their derived purchase and visit metrics.

use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{debug, instrument, warn};

use crate::{
    common::round_currency,
    errors::ServiceError,
    models::{Customer, CustomerMetrics, CustomerWithMetrics, Purchase, VisitRow},
    store::{decode_rows, Filter, ListQuery, RecordStore, Table},
};

const DEFAULT_CONCURRENCY: usize = 8;

/// How related rows are fetched for a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum ProjectionStrategy {
    /// One `in` query per related table for the whole page
    #[default]
    #[serde(rename = "batched")]
    #[strum(to_string = "batched")]
    Batched,
    /// A purchase and an appointment query per row, bounded concurrency
    #[serde(rename = "fan-out", alias = "fanout")]
    #[strum(to_string = "fan-out", serialize = "fanout")]
    FanOut,
}

/// Folds a customer's purchases and appointments into metrics.
///
/// Missing amounts count as zero; the sum is rounded half-up to cents.
pub fn compute_metrics<'a>(
    purchases: impl IntoIterator<Item = &'a Purchase>,
    visits: impl IntoIterator<Item = &'a VisitRow>,
) -> CustomerMetrics {
    let total: Decimal = purchases
        .into_iter()
        .filter_map(|p| p.amount)
        .sum();

    let (visit_count, last_visited_date) = visits
        .into_iter()
        .fold((0u64, None), |(count, last), visit| {
            let last = match last {
                Some(date) if date >= visit.appointment_date => Some(date),
                _ => Some(visit.appointment_date),
            };
            (count + 1, last)
        });

    CustomerMetrics {
        total_purchase_value: round_currency(total),
        visit_count,
        last_visited_date,
    }
}

#[derive(Clone)]
pub struct PageProjector {
    store: Arc<dyn RecordStore>,
    strategy: ProjectionStrategy,
    concurrency: usize,
}

impl PageProjector {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            strategy: ProjectionStrategy::default(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_strategy(mut self, strategy: ProjectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn strategy(&self) -> ProjectionStrategy {
        self.strategy
    }

    /// Attaches metrics to every customer, preserving page order.
    ///
    /// A failed metrics lookup leaves `metrics` empty for the rows it
    /// covers; it never fails the page.
    #[instrument(skip(self, customers), fields(rows = customers.len(), strategy = %self.strategy))]
    pub async fn project_page(&self, customers: Vec<Customer>) -> Vec<CustomerWithMetrics> {
        if customers.is_empty() {
            return Vec::new();
        }
        match self.strategy {
            ProjectionStrategy::Batched => self.project_batched(customers).await,
            ProjectionStrategy::FanOut => self.project_fan_out(customers).await,
        }
    }

    async fn project_batched(&self, customers: Vec<Customer>) -> Vec<CustomerWithMetrics> {
        let ids: Vec<i64> = customers.iter().map(|c| c.id).collect();

        let grouped = match self.related_rows(Filter::new().is_in("customer_id", ids)).await {
            Ok((purchases, visits)) => Some(group_by_customer(purchases, visits)),
            Err(e) => {
                warn!(error = %e, rows = customers.len(), "Metrics lookup failed for page; rows left without metrics");
                None
            }
        };

        customers
            .into_iter()
            .map(|customer| {
                let metrics = grouped.as_ref().map(|groups| match groups.get(&customer.id) {
                    Some((purchases, visits)) => compute_metrics(purchases, visits),
                    None => CustomerMetrics::default(),
                });
                CustomerWithMetrics { customer, metrics }
            })
            .collect()
    }

    async fn project_fan_out(&self, customers: Vec<Customer>) -> Vec<CustomerWithMetrics> {
        stream::iter(customers)
            .map(|customer| async move {
                let filter = Filter::new().eq("customer_id", customer.id);
                let metrics = match self.related_rows(filter).await {
                    Ok((purchases, visits)) => Some(compute_metrics(&purchases, &visits)),
                    Err(e) => {
                        warn!(customer_id = customer.id, error = %e, "Metrics lookup failed; row left without metrics");
                        None
                    }
                };
                CustomerWithMetrics { customer, metrics }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }

    /// Purchases and appointments matching `filter`, fetched concurrently.
    async fn related_rows(&self, filter: Filter) -> Result<(Vec<Purchase>, Vec<VisitRow>), ServiceError> {
        let query = ListQuery::new(filter);
        let (purchases, visits) = tokio::try_join!(
            self.store.list(Table::Purchases, &query),
            self.store.list(Table::Appointments, &query),
        )?;
        debug!(purchases = purchases.len(), visits = visits.len(), "Related rows fetched");

        Ok((
            decode_rows(Table::Purchases, purchases)?,
            decode_rows(Table::Appointments, visits)?,
        ))
    }
}

type RelatedRows = (Vec<Purchase>, Vec<VisitRow>);

fn group_by_customer(purchases: Vec<Purchase>, visits: Vec<VisitRow>) -> HashMap<i64, RelatedRows> {
    let mut groups: HashMap<i64, RelatedRows> = HashMap::new();
    for purchase in purchases {
        groups.entry(purchase.customer_id).or_default().0.push(purchase);
    }
    for visit in visits {
        groups.entry(visit.customer_id).or_default().1.push(visit);
    }
    groups
}
