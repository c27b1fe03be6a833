use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseConnection, FromQueryResult, JsonValue, StatementBuilder};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{Filter, ListQuery, RecordStore, Row, Table};
use crate::db::query_builder::{QueryBuilder, COUNT_ALIAS};
use crate::errors::StoreError;

/// Row store backed by a SQL database through sea-orm.
///
/// Statements are built per call from the table name and filter for the
/// connected backend; rows come back as JSON objects keyed by column name.
#[derive(Clone)]
pub struct SeaOrmStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn statements(&self) -> QueryBuilder {
        QueryBuilder::new(self.db.get_database_backend())
    }

    fn build<S: StatementBuilder>(&self, statement: &S) -> sea_orm::Statement {
        self.db.get_database_backend().build(statement)
    }
}

fn into_row(table: Table, value: JsonValue) -> Result<Row, StoreError> {
    match value {
        JsonValue::Object(row) => Ok(row),
        other => Err(StoreError::new(format!(
            "Unexpected {} row shape: {}",
            table, other
        ))),
    }
}

#[async_trait]
impl RecordStore for SeaOrmStore {
    #[instrument(skip(self, query))]
    async fn list(&self, table: Table, query: &ListQuery) -> Result<Vec<Row>, StoreError> {
        let statement = self.build(&self.statements().select(table, query));
        debug!(sql = %statement.sql, "listing rows");

        let values = JsonValue::find_by_statement(statement)
            .all(self.db.as_ref())
            .await?;

        values.into_iter().map(|v| into_row(table, v)).collect()
    }

    #[instrument(skip(self, filter))]
    async fn count(&self, table: Table, filter: &Filter) -> Result<u64, StoreError> {
        let statement = self.build(&self.statements().count(table, filter));

        let total = match self.db.query_one(statement).await? {
            Some(row) => row.try_get::<i64>("", COUNT_ALIAS)?,
            None => 0,
        };

        Ok(total.max(0) as u64)
    }

    #[instrument(skip(self, payload))]
    async fn insert(&self, table: Table, payload: Row) -> Result<Row, StoreError> {
        let statement = self.build(&self.statements().insert(table, &payload)?);

        let inserted = JsonValue::find_by_statement(statement)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| StoreError::new(format!("Insert into {} returned no row", table)))?;

        into_row(table, inserted)
    }

    #[instrument(skip(self))]
    async fn delete(&self, table: Table, id: i64) -> Result<bool, StoreError> {
        let statement = self.build(&self.statements().delete(table, id));
        let result = self.db.execute(statement).await?;
        Ok(result.rows_affected() > 0)
    }
}
