//! PostgreSQL query layer.
//!
//! One pool for the whole process, built from explicit configuration and
//! shared through the app state. Queries are single parameterized
//! statements; rows come back as JSON objects keyed by column name.

use std::time::Duration;

use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::Postgres;
use thiserror::Error;

use crate::config::DatabaseConfig;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// A positional (`$n`) statement parameter.
///
/// Parameters are bound with an explicit PostgreSQL type, so a NULL carries
/// the type of the column it is compared with (`int_col = $1` needs
/// `Null(SqlType::Int)`, not a text NULL).
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null(SqlType),
}

/// Bind type of a NULL parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Int,
    Float,
    Bool,
}

/// Plain values that map onto one `SqlType`.
pub trait TypedParam: Into<SqlParam> {
    const SQL_TYPE: SqlType;
}

impl TypedParam for &str {
    const SQL_TYPE: SqlType = SqlType::Text;
}

impl TypedParam for String {
    const SQL_TYPE: SqlType = SqlType::Text;
}

impl TypedParam for i64 {
    const SQL_TYPE: SqlType = SqlType::Int;
}

impl TypedParam for f64 {
    const SQL_TYPE: SqlType = SqlType::Float;
}

impl TypedParam for bool {
    const SQL_TYPE: SqlType = SqlType::Bool;
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        SqlParam::Text(value.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        SqlParam::Text(value)
    }
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        SqlParam::Int(value)
    }
}

impl From<f64> for SqlParam {
    fn from(value: f64) -> Self {
        SqlParam::Float(value)
    }
}

impl From<bool> for SqlParam {
    fn from(value: bool) -> Self {
        SqlParam::Bool(value)
    }
}

impl<T: TypedParam> From<Option<T>> for SqlParam {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlParam::Null(T::SQL_TYPE), Into::into)
    }
}

#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Build the pool without connecting; the first query opens a connection.
    pub fn connect_lazy(config: &DatabaseConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_lazy_with(options);

        tracing::debug!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            max_connections = config.max_connections,
            "Database pool configured"
        );

        Self { pool }
    }

    /// Run one statement and return its rows as JSON objects.
    pub async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Value>, DbError> {
        let statement = rows_as_json(sql);
        let mut query = sqlx::query_scalar::<Postgres, Json<Value>>(&statement);
        for param in params {
            query = match param {
                SqlParam::Text(value) => query.bind(value.as_str()),
                SqlParam::Int(value) => query.bind(*value),
                SqlParam::Float(value) => query.bind(*value),
                SqlParam::Bool(value) => query.bind(*value),
                SqlParam::Null(SqlType::Text) => query.bind(Option::<String>::None),
                SqlParam::Null(SqlType::Int) => query.bind(Option::<i64>::None),
                SqlParam::Null(SqlType::Float) => query.bind(Option::<f64>::None),
                SqlParam::Null(SqlType::Bool) => query.bind(Option::<bool>::None),
            };
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|Json(row)| row).collect())
    }

    pub async fn ping(&self) -> Result<(), DbError> {
        self.query("SELECT 1 AS ok", &[]).await.map(|_| ())
    }
}

/// Wrap a statement so each row is returned as a single JSON column.
fn rows_as_json(sql: &str) -> String {
    let sql = sql.trim().trim_end_matches(';');
    format!("SELECT row_to_json(q) FROM ({sql}) AS q")
}
