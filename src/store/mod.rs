//! Record store adapter.
//!
//! The row store is an external capability. Everything in the crate reads
//! and writes it through [`RecordStore`]: filtered, sorted, paginated
//! listing, counting, inserting and deleting rows of a named [`Table`].
//! Rows travel as JSON objects and are decoded into models with serde.

pub mod memory;
pub mod sea_orm_store;

pub use memory::MemoryStore;
pub use sea_orm_store::SeaOrmStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::errors::{ServiceError, StoreError};

/// A stored row, keyed by column name.
pub type Row = Map<String, Value>;

/// Tables the salon back office reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Table {
    Customers,
    Staff,
    Services,
    Appointments,
    Purchases,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// A single column condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    In {
        column: String,
        values: Vec<Value>,
    },
}

/// Case-insensitive substring match over several columns, any of which may hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSearch {
    pub term: String,
    pub columns: Vec<String>,
}

/// Row filter: every predicate must hold, and the text search (if any) must
/// match at least one of its columns.
///
/// A predicate against a null or missing column never holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub predicates: Vec<Predicate>,
    pub search: Option<TextSearch>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    fn compare(mut self, column: &str, op: CompareOp, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate::Compare {
            column: column.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.compare(column, CompareOp::Eq, value)
    }

    pub fn gt(self, column: &str, value: impl Into<Value>) -> Self {
        self.compare(column, CompareOp::Gt, value)
    }

    pub fn gte(self, column: &str, value: impl Into<Value>) -> Self {
        self.compare(column, CompareOp::Gte, value)
    }

    pub fn lt(self, column: &str, value: impl Into<Value>) -> Self {
        self.compare(column, CompareOp::Lt, value)
    }

    pub fn lte(self, column: &str, value: impl Into<Value>) -> Self {
        self.compare(column, CompareOp::Lte, value)
    }

    pub fn is_in<V: Into<Value>>(mut self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.predicates.push(Predicate::In {
            column: column.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Adds a free-text search. Blank terms are ignored.
    pub fn search(mut self, term: Option<&str>, columns: &[&str]) -> Self {
        self.search = term
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| TextSearch {
                term: t.to_string(),
                columns: columns.iter().map(|c| c.to_string()).collect(),
            });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub column: String,
    pub ascending: bool,
}

impl Sort {
    pub fn asc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            ascending: true,
        }
    }

    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            ascending: false,
        }
    }
}

/// Everything a `list` call needs: which rows, in what order, which slice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filter: Filter,
    pub sort: Option<Sort>,
    pub offset: u64,
    pub limit: Option<u64>,
}

impl ListQuery {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn sorted(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn range(mut self, offset: u64, limit: u64) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }
}

/// Narrow interface over the remote row store.
///
/// Implementations report failures as [`StoreError`] and never retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list(&self, table: Table, query: &ListQuery) -> Result<Vec<Row>, StoreError>;

    async fn count(&self, table: Table, filter: &Filter) -> Result<u64, StoreError>;

    /// Inserts a row and returns it as stored, including the assigned `id`.
    async fn insert(&self, table: Table, payload: Row) -> Result<Row, StoreError>;

    /// Returns whether a row with that id existed.
    async fn delete(&self, table: Table, id: i64) -> Result<bool, StoreError>;
}

/// Decodes store rows into a model type.
pub fn decode_rows<T: DeserializeOwned>(table: Table, rows: Vec<Row>) -> Result<Vec<T>, ServiceError> {
    rows.into_iter().map(|row| decode_row(table, row)).collect()
}

pub fn decode_row<T: DeserializeOwned>(table: Table, row: Row) -> Result<T, ServiceError> {
    serde_json::from_value(Value::Object(row)).map_err(|e| ServiceError::decode(table, e))
}

/// Serializes a payload struct into a row for `insert`.
pub fn encode_row<T: Serialize>(table: Table, payload: &T) -> Result<Row, ServiceError> {
    match serde_json::to_value(payload) {
        Ok(Value::Object(row)) => Ok(row),
        Ok(other) => Err(ServiceError::InvalidInput(format!(
            "{} payload must serialize to an object, got {}",
            table, other
        ))),
        Err(e) => Err(ServiceError::InvalidInput(format!(
            "{} payload could not be serialized: {}",
            table, e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn table_names_match_backend() {
        assert_eq!(Table::Customers.as_ref(), "customers");
        assert_eq!(Table::Staff.to_string(), "staff");
        assert_eq!("purchases".parse::<Table>().unwrap(), Table::Purchases);
    }

    #[test]
    fn blank_search_is_dropped() {
        let filter = Filter::new().search(Some("   "), &["name"]);
        assert!(filter.search.is_none());
        let filter = Filter::new().search(Some(" asha "), &["name", "email"]);
        assert_eq!(filter.search.unwrap().term, "asha");
    }

    #[test]
    fn builder_accumulates_predicates() {
        let filter = Filter::new()
            .eq("customer_id", 4)
            .gte("created_at", "2024-01-01T00:00:00.000Z")
            .is_in("id", [1, 2, 3]);
        assert_eq!(filter.predicates.len(), 3);
        assert_eq!(
            filter.predicates[2],
            Predicate::In {
                column: "id".into(),
                values: vec![json!(1), json!(2), json!(3)]
            }
        );
    }

    #[test]
    fn encode_rejects_non_objects() {
        assert!(encode_row(Table::Services, &json!([1, 2])).is_err());
        let row = encode_row(Table::Services, &json!({"name": "Facial"})).unwrap();
        assert_eq!(row["name"], json!("Facial"));
    }
}
