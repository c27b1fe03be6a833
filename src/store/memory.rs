use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::cmp::Ordering;
use std::time::Duration;
use tracing::debug;

use super::{CompareOp, Filter, ListQuery, Predicate, RecordStore, Row, Sort, Table, TextSearch};
use crate::common::parse_timestamp;
use crate::errors::StoreError;

#[derive(Debug, Default)]
struct TableData {
    rows: Vec<Row>,
    next_id: i64,
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    table: Table,
    /// Only queries whose filter targets this column/value fail.
    matching: Option<(String, Value)>,
    message: String,
}

/// In-process row store with the same filter semantics as the SQL adapter.
///
/// Used by tests and local tooling. Failures can be injected per table (or
/// per filtered value) to exercise degradation paths, and reads can be
/// slowed down to exercise deadlines.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: DashMap<Table, TableData>,
    failures: DashMap<usize, InjectedFailure>,
    reads: DashMap<Table, u64>,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every `list` and `count` call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes every call against `table` fail with `message`.
    pub fn fail_table(&self, table: Table, message: &str) {
        let key = self.failures.len();
        self.failures.insert(
            key,
            InjectedFailure {
                table,
                matching: None,
                message: message.to_string(),
            },
        );
    }

    /// Makes reads of `table` fail when their filter selects `value` in `column`.
    pub fn fail_matching(&self, table: Table, column: &str, value: impl Into<Value>, message: &str) {
        let key = self.failures.len();
        self.failures.insert(
            key,
            InjectedFailure {
                table,
                matching: Some((column.to_string(), value.into())),
                message: message.to_string(),
            },
        );
    }

    pub fn clear_failures(&self) {
        self.failures.clear();
    }

    /// Number of `list`/`count` calls made against `table`.
    pub fn read_count(&self, table: Table) -> u64 {
        self.reads.get(&table).map(|n| *n).unwrap_or(0)
    }

    pub fn len(&self, table: Table) -> usize {
        self.tables.get(&table).map(|t| t.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, table: Table) -> bool {
        self.len(table) == 0
    }

    async fn record_read(&self, table: Table) {
        *self.reads.entry(table).or_insert(0) += 1;
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_failure(&self, table: Table, filter: Option<&Filter>) -> Result<(), StoreError> {
        for entry in self.failures.iter() {
            let failure = entry.value();
            if failure.table != table {
                continue;
            }
            let triggered = match (&failure.matching, filter) {
                (None, _) => true,
                (Some(_), None) => false,
                (Some((column, value)), Some(filter)) => filter_targets(filter, column, value),
            };
            if triggered {
                return Err(StoreError::new(failure.message.clone()));
            }
        }
        Ok(())
    }
}

fn filter_targets(filter: &Filter, column: &str, value: &Value) -> bool {
    filter.predicates.iter().any(|predicate| match predicate {
        Predicate::Compare {
            column: c,
            op: CompareOp::Eq,
            value: v,
        } => c == column && values_equal(v, value),
        Predicate::In { column: c, values } => {
            c == column && values.iter().any(|v| values_equal(v, value))
        }
        _ => false,
    })
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Orders two stored values the way the SQL backends would for our data:
/// numbers numerically, timestamps chronologically, other text lexically.
/// Null compares to nothing.
pub(crate) fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::String(a), Value::String(b)) => match (parse_timestamp(a), parse_timestamp(b)) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => Some(a.cmp(b)),
        },
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => as_number(left)?.partial_cmp(&as_number(right)?),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    compare_values(left, right) == Some(Ordering::Equal)
}

fn predicate_holds(row: &Row, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Compare { column, op, value } => {
            let Some(stored) = row.get(column) else {
                return false;
            };
            match compare_values(stored, value) {
                None => false,
                Some(ordering) => match op {
                    CompareOp::Eq => ordering == Ordering::Equal,
                    CompareOp::Gt => ordering == Ordering::Greater,
                    CompareOp::Gte => ordering != Ordering::Less,
                    CompareOp::Lt => ordering == Ordering::Less,
                    CompareOp::Lte => ordering != Ordering::Greater,
                },
            }
        }
        Predicate::In { column, values } => row
            .get(column)
            .map(|stored| values.iter().any(|v| values_equal(stored, v)))
            .unwrap_or(false),
    }
}

fn search_holds(row: &Row, search: &TextSearch) -> bool {
    let needle = search.term.to_lowercase();
    search.columns.iter().any(|column| {
        let text = match row.get(column) {
            Some(Value::String(s)) => s.to_lowercase(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return false,
        };
        text.contains(&needle)
    })
}

pub(crate) fn row_matches(row: &Row, filter: &Filter) -> bool {
    filter.predicates.iter().all(|p| predicate_holds(row, p))
        && filter.search.as_ref().map_or(true, |s| search_holds(row, s))
}

fn sort_rows(rows: &mut [Row], sort: &Sort) {
    rows.sort_by(|a, b| {
        let left = a.get(&sort.column).filter(|v| !v.is_null());
        let right = b.get(&sort.column).filter(|v| !v.is_null());
        match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(l), Some(r)) => {
                let ordering = compare_values(l, r).unwrap_or(Ordering::Equal);
                if sort.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            }
        }
    });
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list(&self, table: Table, query: &ListQuery) -> Result<Vec<Row>, StoreError> {
        self.record_read(table).await;
        self.check_failure(table, Some(&query.filter))?;

        let mut rows: Vec<Row> = match self.tables.get(&table) {
            Some(data) => data
                .rows
                .iter()
                .filter(|row| row_matches(row, &query.filter))
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        if let Some(sort) = &query.sort {
            sort_rows(&mut rows, sort);
        }

        let rows: Vec<Row> = rows
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit.map(|l| l as usize).unwrap_or(usize::MAX))
            .collect();

        debug!(table = %table, returned = rows.len(), "memory store list");
        Ok(rows)
    }

    async fn count(&self, table: Table, filter: &Filter) -> Result<u64, StoreError> {
        self.record_read(table).await;
        self.check_failure(table, Some(filter))?;

        Ok(self
            .tables
            .get(&table)
            .map(|data| data.rows.iter().filter(|row| row_matches(row, filter)).count() as u64)
            .unwrap_or(0))
    }

    async fn insert(&self, table: Table, mut payload: Row) -> Result<Row, StoreError> {
        self.check_failure(table, None)?;

        let mut data = self.tables.entry(table).or_default();
        let id = match payload.get("id").and_then(Value::as_i64) {
            Some(id) => {
                let taken = data
                    .rows
                    .iter()
                    .any(|row| row.get("id").and_then(Value::as_i64) == Some(id));
                if taken {
                    return Err(StoreError::new(format!(
                        "duplicate key value violates unique constraint \"{}_pkey\"",
                        table
                    )));
                }
                id
            }
            None => data.next_id + 1,
        };
        data.next_id = data.next_id.max(id);
        payload.insert("id".to_string(), Value::from(id));
        data.rows.push(payload.clone());
        Ok(payload)
    }

    async fn delete(&self, table: Table, id: i64) -> Result<bool, StoreError> {
        self.check_failure(table, None)?;

        let Some(mut data) = self.tables.get_mut(&table) else {
            return Ok(false);
        };
        let before = data.rows.len();
        data.rows
            .retain(|row| row.get("id").and_then(Value::as_i64) != Some(id));
        Ok(data.rows.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for value in [
            json!({"name": "Asha", "email": "asha@example.com", "last_activity_at": "2024-06-01T10:00:00.000Z"}),
            json!({"name": "Bilal", "email": "BILAL@example.com", "last_activity_at": null}),
            json!({"name": "Chitra", "email": "chitra@example.org", "last_activity_at": "2024-01-01T10:00:00.000Z"}),
        ] {
            store.insert(Table::Customers, row(value)).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn assigns_sequential_ids() {
        let store = seeded().await;
        let rows = store
            .list(Table::Customers, &ListQuery::all().sorted(Sort::asc("id")))
            .await
            .unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn null_columns_fail_range_predicates() {
        let store = seeded().await;
        let cutoff = "2024-03-01T00:00:00.000Z";
        let after = store
            .count(Table::Customers, &Filter::new().gte("last_activity_at", cutoff))
            .await
            .unwrap();
        let before = store
            .count(Table::Customers, &Filter::new().lt("last_activity_at", cutoff))
            .await
            .unwrap();
        assert_eq!((after, before), (1, 1));
    }

    #[tokio::test]
    async fn search_is_case_insensitive_across_columns() {
        let store = seeded().await;
        let filter = Filter::new().search(Some("bilal"), &["name", "email"]);
        assert_eq!(store.count(Table::Customers, &filter).await.unwrap(), 1);
        let filter = Filter::new().search(Some(".ORG"), &["name", "email"]);
        assert_eq!(store.count(Table::Customers, &filter).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn sort_and_range() {
        let store = seeded().await;
        let query = ListQuery::all().sorted(Sort::desc("name")).range(1, 1);
        let rows = store.list(Table::Customers, &query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], json!("Bilal"));
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let store = seeded().await;
        let err = store
            .insert(Table::Customers, row(json!({"id": 2, "name": "Dup"})))
            .await
            .unwrap_err();
        assert!(err.message.contains("duplicate key"));
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let store = seeded().await;
        assert!(store.delete(Table::Customers, 2).await.unwrap());
        assert!(!store.delete(Table::Customers, 2).await.unwrap());
        assert_eq!(store.len(Table::Customers), 2);
    }

    #[tokio::test]
    async fn injected_failures_are_scoped() {
        let store = seeded().await;
        store.fail_matching(Table::Purchases, "customer_id", 2, "boom");
        assert!(store
            .list(Table::Purchases, &ListQuery::new(Filter::new().eq("customer_id", 1)))
            .await
            .is_ok());
        let err = store
            .list(Table::Purchases, &ListQuery::new(Filter::new().eq("customer_id", 2)))
            .await
            .unwrap_err();
        assert_eq!(err.message, "boom");
        assert_eq!(store.read_count(Table::Purchases), 2);
    }
}
