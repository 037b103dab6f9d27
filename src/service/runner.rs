//! Database seam: runs prepared statements and reads their results.

use crate::error::AppError;
use crate::service::databases::DatabaseInfo;
use crate::sql::QueryBuf;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgRow};
use sqlx::{Column, ConnectOptions, Connection, PgConnection, Row, TypeInfo, ValueRef};
use std::str::FromStr;

/// Where a statement runs: the tenant's connection string, optionally pointed at another
/// database on the same server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub connection_string: String,
    pub database: Option<String>,
}

impl ConnectionTarget {
    pub fn new(connection_string: impl Into<String>) -> Self {
        ConnectionTarget {
            connection_string: connection_string.into(),
            database: None,
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }
}

/// A statement ready to run.
#[derive(Debug)]
pub struct PreparedCommand {
    pub query: QueryBuf,
    pub timeout_seconds: u32,
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// First column of every row as text, in result order. NULL cells are skipped.
    async fn fetch_first_column(
        &self,
        target: &ConnectionTarget,
        command: &PreparedCommand,
    ) -> Result<Vec<String>, AppError>;

    /// Rows decoded positionally as `(id, abbr, name, crdate, compatlevel)`.
    async fn fetch_databases(
        &self,
        target: &ConnectionTarget,
        command: &PreparedCommand,
    ) -> Result<Vec<DatabaseInfo>, AppError>;
}

/// PostgreSQL runner. Opens one connection per call and closes it afterwards.
#[derive(Clone, Debug, Default)]
pub struct PgCommandRunner;

impl PgCommandRunner {
    pub fn new() -> Self {
        PgCommandRunner
    }

    async fn connect(target: &ConnectionTarget, timeout_seconds: u32) -> Result<PgConnection, AppError> {
        let mut opts = PgConnectOptions::from_str(&target.connection_string)?;
        if let Some(database) = &target.database {
            opts = opts.database(database);
        }
        let opts = opts.options([("statement_timeout", format!("{}s", timeout_seconds))]);
        Ok(opts.connect().await?)
    }

    async fn fetch_rows(target: &ConnectionTarget, command: &PreparedCommand) -> Result<Vec<PgRow>, AppError> {
        let q = &command.query;
        tracing::debug!(sql = %q.sql, params = ?q.params, timeout = command.timeout_seconds, "query");
        let mut conn = Self::connect(target, command.timeout_seconds).await?;
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        let rows = query.fetch_all(&mut conn).await;
        let _ = conn.close().await;
        Ok(rows?)
    }
}

#[async_trait]
impl CommandRunner for PgCommandRunner {
    async fn fetch_first_column(
        &self,
        target: &ConnectionTarget,
        command: &PreparedCommand,
    ) -> Result<Vec<String>, AppError> {
        let rows = Self::fetch_rows(target, command).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(text) = first_column_text(row)? {
                out.push(text);
            }
        }
        Ok(out)
    }

    async fn fetch_databases(
        &self,
        target: &ConnectionTarget,
        command: &PreparedCommand,
    ) -> Result<Vec<DatabaseInfo>, AppError> {
        let rows = Self::fetch_rows(target, command).await?;
        rows.iter()
            .map(|row| -> Result<DatabaseInfo, AppError> {
                Ok(DatabaseInfo {
                    id: row.try_get(0)?,
                    abbr: row.try_get(1)?,
                    name: row.try_get(2)?,
                    create_date: row.try_get(3)?,
                    compat_level: row.try_get(4)?,
                })
            })
            .collect()
    }
}

/// How a first-column cell becomes response text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CellFormat {
    /// Decoded as JSON and re-serialized.
    Json,
    /// Wire bytes taken as UTF-8; for types sqlx has no `String` decoder for.
    Raw,
    Text,
}

fn cell_format(type_name: &str) -> CellFormat {
    match type_name {
        "JSON" | "JSONB" => CellFormat::Json,
        "XML" => CellFormat::Raw,
        _ => CellFormat::Text,
    }
}

fn first_column_text(row: &PgRow) -> Result<Option<String>, AppError> {
    let Some(column) = row.columns().first() else {
        return Ok(None);
    };
    match cell_format(column.type_info().name()) {
        CellFormat::Json => Ok(row
            .try_get::<Option<serde_json::Value>, _>(0)?
            .map(|v| v.to_string())),
        CellFormat::Raw => {
            let value = row.try_get_raw(0)?;
            if value.is_null() {
                return Ok(None);
            }
            let text = value.as_str().map_err(sqlx::Error::Decode)?;
            Ok(Some(text.to_string()))
        }
        CellFormat::Text => Ok(row.try_get::<Option<String>, _>(0)?),
    }
}
