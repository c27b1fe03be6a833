use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use sea_orm::sea_query::{
    Alias, Asterisk, Condition, DeleteStatement, Expr, Func, InsertStatement, LikeExpr, Order,
    Query, SelectStatement, SimpleExpr,
};
use sea_orm::DbBackend;
use serde_json::Value;

use crate::common::{parse_calendar_date, parse_timestamp};
use crate::errors::StoreError;
use crate::store::{CompareOp, Filter, ListQuery, Predicate, Row, Table, TextSearch};

/// Alias the row count is selected under.
pub const COUNT_ALIAS: &str = "total";

/// SQLite rejects OFFSET without LIMIT; this stands in for "no limit".
const UNBOUNDED_LIMIT: u64 = i64::MAX as u64;

/// How a persisted column is typed on a strict backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Timestamp,
    Date,
    Money,
    Json,
    Plain,
}

impl ColumnKind {
    /// Column names carry the same type in every table.
    pub fn of(column: &str) -> Self {
        match column {
            "created_at" | "updated_at" | "last_activity_at" => ColumnKind::Timestamp,
            "dob" | "anniversary_date" | "date_of_birth" | "appointment_date" => ColumnKind::Date,
            "amount" | "advance_paid" => ColumnKind::Money,
            "services" => ColumnKind::Json,
            _ => ColumnKind::Plain,
        }
    }
}

/// Converts a JSON row value into a bindable database value.
pub fn to_db_value(value: &Value) -> sea_orm::Value {
    match value {
        Value::Null => sea_orm::Value::String(None),
        Value::Bool(flag) => (*flag).into(),
        Value::Number(number) => match number.as_i64() {
            Some(int) => int.into(),
            None => number.as_f64().unwrap_or_default().into(),
        },
        Value::String(text) => text.clone().into(),
        nested => nested.to_string().into(),
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Binds a value for `column` with the type the backend stores it as.
///
/// SQLite keeps everything as text, so values pass through unchanged.
/// Other backends get chrono, decimal and JSON values for typed columns,
/// including typed nulls. Values that do not parse fall back to text.
pub fn bind_value(backend: DbBackend, column: &str, value: &Value) -> sea_orm::Value {
    if backend == DbBackend::Sqlite {
        return to_db_value(value);
    }
    let kind = ColumnKind::of(column);
    let typed: Option<sea_orm::Value> = match (kind, value) {
        (ColumnKind::Timestamp, Value::Null) => Some(None::<DateTime<FixedOffset>>.into()),
        (ColumnKind::Date, Value::Null) => Some(None::<NaiveDate>.into()),
        (ColumnKind::Money, Value::Null) => Some(None::<Decimal>.into()),
        (ColumnKind::Json, Value::Null) => Some(None::<Value>.into()),
        (ColumnKind::Json, Value::String(text)) => serde_json::from_str::<Value>(text)
            .ok()
            .map(sea_orm::Value::from),
        (ColumnKind::Json, Value::Array(_) | Value::Object(_)) => Some(value.clone().into()),
        (ColumnKind::Timestamp, _) => as_text(value)
            .and_then(|text| parse_timestamp(&text))
            .map(sea_orm::Value::from),
        (ColumnKind::Date, _) => as_text(value)
            .and_then(|text| parse_calendar_date(&text))
            .map(sea_orm::Value::from),
        (ColumnKind::Money, _) => as_text(value)
            .and_then(|text| Decimal::from_str(&text).ok())
            .map(sea_orm::Value::from),
        _ => None,
    };
    typed.unwrap_or_else(|| to_db_value(value))
}

fn column(name: &str) -> Expr {
    Expr::col(Alias::new(name))
}

fn julianday(expr: impl Into<SimpleExpr>) -> SimpleExpr {
    Func::cust(Alias::new("julianday")).arg(expr).into()
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Builds the "any column contains the term" condition for free-text search.
pub struct SearchBuilder {
    pattern: String,
    condition: Condition,
}

impl SearchBuilder {
    pub fn new(term: &str) -> Self {
        Self {
            pattern: format!("%{}%", escape_like(&term.to_lowercase())),
            condition: Condition::any(),
        }
    }

    /// Case-insensitive LIKE on one more column, read as text so date
    /// columns are searchable too.
    pub fn add_column(mut self, name: &str) -> Self {
        let as_text = Func::cast_as(column(name), Alias::new("TEXT"));
        let lowered = Expr::expr(Func::lower(as_text));
        self.condition = self
            .condition
            .add(lowered.like(LikeExpr::new(self.pattern.clone()).escape('\\')));
        self
    }

    pub fn build(self) -> Condition {
        self.condition
    }
}

/// Builds statements for one backend.
///
/// Timestamps compare as instants on every backend: SQLite goes through
/// `julianday`, the others through typed binds.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder {
    backend: DbBackend,
}

impl QueryBuilder {
    pub fn new(backend: DbBackend) -> Self {
        Self { backend }
    }

    fn compares_as_instant(&self, name: &str, value: &Value) -> bool {
        self.backend == DbBackend::Sqlite
            && ColumnKind::of(name) == ColumnKind::Timestamp
            && value.as_str().and_then(parse_timestamp).is_some()
    }

    fn predicate_expr(&self, predicate: &Predicate) -> SimpleExpr {
        match predicate {
            Predicate::Compare { column: name, op, value } => {
                let bound = bind_value(self.backend, name, value);
                let (left, right) = if self.compares_as_instant(name, value) {
                    (Expr::expr(julianday(column(name))), julianday(Expr::val(bound)))
                } else {
                    (column(name), Expr::val(bound).into())
                };
                match op {
                    CompareOp::Eq => left.eq(right),
                    CompareOp::Gt => left.gt(right),
                    CompareOp::Gte => left.gte(right),
                    CompareOp::Lt => left.lt(right),
                    CompareOp::Lte => left.lte(right),
                }
            }
            // An empty IN list matches nothing.
            Predicate::In { values, .. } if values.is_empty() => Expr::val(1).eq(0),
            Predicate::In { column: name, values } => column(name)
                .is_in(values.iter().map(|v| bind_value(self.backend, name, v))),
        }
    }

    /// Translates a [`Filter`] into a WHERE condition, or `None` when it is empty.
    pub fn filter_condition(&self, filter: &Filter) -> Option<Condition> {
        if filter.predicates.is_empty() && filter.search.is_none() {
            return None;
        }
        let mut condition = Condition::all();
        for predicate in &filter.predicates {
            condition = condition.add(self.predicate_expr(predicate));
        }
        if let Some(search) = &filter.search {
            condition = condition.add(search_condition(search));
        }
        Some(condition)
    }

    pub fn select(&self, table: Table, query: &ListQuery) -> SelectStatement {
        let mut select = Query::select();
        select.column(Asterisk).from(Alias::new(table.as_ref()));

        if let Some(condition) = self.filter_condition(&query.filter) {
            select.cond_where(condition);
        }
        if let Some(sort) = &query.sort {
            let order = if sort.ascending { Order::Asc } else { Order::Desc };
            let by_instant = self.backend == DbBackend::Sqlite
                && ColumnKind::of(&sort.column) == ColumnKind::Timestamp;
            if by_instant {
                select.order_by_expr(julianday(column(&sort.column)), order);
            } else {
                select.order_by(Alias::new(sort.column.as_str()), order);
            }
        }
        match query.limit {
            Some(limit) => {
                select.limit(limit);
            }
            None if query.offset > 0 => {
                select.limit(UNBOUNDED_LIMIT);
            }
            None => {}
        }
        if query.offset > 0 {
            select.offset(query.offset);
        }
        select
    }

    pub fn count(&self, table: Table, filter: &Filter) -> SelectStatement {
        let mut select = Query::select();
        select
            .expr_as(Func::count(Expr::col(Asterisk)), Alias::new(COUNT_ALIAS))
            .from(Alias::new(table.as_ref()));
        if let Some(condition) = self.filter_condition(filter) {
            select.cond_where(condition);
        }
        select
    }

    pub fn insert(&self, table: Table, payload: &Row) -> Result<InsertStatement, StoreError> {
        if payload.is_empty() {
            return Err(StoreError::new(format!("Refusing to insert an empty {} row", table)));
        }
        let columns: Vec<Alias> = payload.keys().map(|k| Alias::new(k.as_str())).collect();
        let values: Vec<SimpleExpr> = payload
            .iter()
            .map(|(name, value)| Expr::val(bind_value(self.backend, name, value)).into())
            .collect();

        let mut insert = Query::insert();
        insert.into_table(Alias::new(table.as_ref())).columns(columns);
        insert.values(values)?;
        insert.returning_all();
        Ok(insert)
    }

    pub fn delete(&self, table: Table, id: i64) -> DeleteStatement {
        let mut delete = Query::delete();
        delete
            .from_table(Alias::new(table.as_ref()))
            .and_where(column("id").eq(id));
        delete
    }
}

fn search_condition(search: &TextSearch) -> Condition {
    search
        .columns
        .iter()
        .fold(SearchBuilder::new(&search.term), |builder, name| {
            builder.add_column(name)
        })
        .build()
}
