// Transactional executor over a SqlitePool

use crate::error::{map_sqlx_error, map_tx_error};
use crate::query::{self, SqlValue, Statement, StatementKind, ValueSet};
use crate::record::{Entity, FromRecord, Record};
use crate::transaction::TxScope;
use batchdesk_core::error::{AppError, Result};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqlitePool, SqliteRow};
use sqlx::Sqlite;
use tracing::{debug, error};

/// Bind arguments in placeholder order
fn bind_args<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    args: &'q [SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for arg in args {
        query = match arg {
            SqlValue::Null => query.bind(None::<i64>),
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::Float(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.as_str()),
        };
    }
    query
}

/// Runs statements either inside a `TxScope` or on a connection borrowed
/// from the pool for a single read
#[derive(Clone)]
pub struct SqliteExecutor {
    pool: SqlitePool,
}

impl SqliteExecutor {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Acquire a connection and BEGIN on it
    pub async fn begin(&self) -> Result<TxScope> {
        let tx = self.pool.begin().await.map_err(|e| {
            error!(error = %e, "Cannot begin transaction");
            map_tx_error(e)
        })?;
        Ok(TxScope::new(tx))
    }

    /// INSERT / UPDATE / DELETE inside a scope, returning affected rows
    pub async fn execute(&self, scope: &mut TxScope, statement: &Statement) -> Result<u64> {
        if statement.kind == (StatementKind::Update { params: 0 }) {
            return Err(AppError::Query(format!(
                "Update without values: {}",
                statement.sql
            )));
        }

        debug!(sql = %statement.sql, args = statement.args.len(), "execute");
        let conn = scope.connection()?;
        let result = bind_args(sqlx::query(&statement.sql), &statement.args)
            .execute(conn)
            .await
            .map_err(|e| {
                error!(sql = %statement.sql, error = %e, "Statement failed");
                map_sqlx_error(e)
            })?;
        Ok(result.rows_affected())
    }

    /// All rows of a query. Without a scope the read is auto-scoped.
    pub async fn query_all<T: FromRecord>(
        &self,
        scope: Option<&mut TxScope>,
        statement: &Statement,
    ) -> Result<Vec<T>> {
        debug!(sql = %statement.sql, args = statement.args.len(), "query");
        let query = bind_args(sqlx::query(&statement.sql), &statement.args);
        let rows: Vec<SqliteRow> = match scope {
            Some(scope) => query.fetch_all(scope.connection()?).await,
            None => query.fetch_all(&self.pool).await,
        }
        .map_err(|e| {
            error!(sql = %statement.sql, error = %e, "Query failed");
            map_sqlx_error(e)
        })?;

        rows.iter()
            .map(|row| Record::from_row(row).and_then(|record| T::from_record(&record)))
            .collect()
    }

    /// First row of a query, if any
    pub async fn query_one<T: FromRecord>(
        &self,
        scope: Option<&mut TxScope>,
        statement: &Statement,
    ) -> Result<Option<T>> {
        Ok(self.query_all(scope, statement).await?.into_iter().next())
    }

    /// Entity by primary key
    pub async fn find<T: Entity>(&self, scope: Option<&mut TxScope>, id: i64) -> Result<Option<T>> {
        let statement = query::select(
            T::SCHEMA.select_by_pk(),
            &ValueSet::new().with(T::SCHEMA.primary_key, id),
        );
        self.query_one(scope, &statement).await
    }

    /// INSERT ... RETURNING pk, then re-select the full row in the same scope
    pub async fn insert_returning<T: Entity>(
        &self,
        scope: &mut TxScope,
        values: &ValueSet,
    ) -> Result<T> {
        let schema = T::SCHEMA;
        let statement = query::insert_returning(schema.table, schema.primary_key, values);
        debug!(sql = %statement.sql, args = statement.args.len(), "insert returning");

        let conn = scope.connection()?;
        let row = bind_args(sqlx::query(&statement.sql), &statement.args)
            .fetch_one(conn)
            .await
            .map_err(|e| {
                error!(sql = %statement.sql, error = %e, "Insert failed");
                map_sqlx_error(e)
            })?;
        let id = Record::from_row(&row)?.int(schema.primary_key)?;

        self.find(Some(scope), id).await?.ok_or_else(|| {
            AppError::Query(format!("{} row {} missing after insert", schema.table, id))
        })
    }

    pub async fn commit(&self, scope: &mut TxScope) -> Result<()> {
        scope.commit().await
    }

    pub async fn rollback(&self, scope: &mut TxScope) -> Result<()> {
        scope.rollback().await
    }
}
