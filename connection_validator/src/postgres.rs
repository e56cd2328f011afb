//! PostgreSQL support through sqlx
//!
//! A `PgConnection` can be validated with any [`QueryValidator`](crate::QueryValidator).
//! The probe rows are fetched in one round trip and handed to the probe through
//! a buffered [`RowCursor`]. [`PingValidator`] skips the probe query and relies
//! on the driver's own liveness check instead.

use async_trait::async_trait;
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::{Column, Row};

use crate::connection::{Connection, ProbeRow, ProbeValue, RowCursor, Statement};
use crate::errors::ConnectionError;
use crate::validator::ConnectionValidator;

/// Query-execution context over a borrowed `PgConnection`
pub struct PgStatement<'c> {
    conn: &'c mut PgConnection,
    closed: bool,
}

impl std::fmt::Debug for PgStatement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgStatement")
            .field("closed", &self.closed)
            .finish()
    }
}

#[async_trait]
impl Connection for PgConnection {
    type Statement<'c> = PgStatement<'c>;

    async fn create_statement<'c>(&'c mut self) -> Result<PgStatement<'c>, ConnectionError> {
        Ok(PgStatement {
            conn: self,
            closed: false,
        })
    }
}

#[async_trait]
impl Statement for PgStatement<'_> {
    type Cursor = RowCursor;

    async fn execute_query(&mut self, sql: &str) -> Result<RowCursor, ConnectionError> {
        if self.closed {
            return Err(ConnectionError::Closed("statement".to_string()));
        }

        let rows = sqlx::query(sql).fetch_all(&mut *self.conn).await?;
        let rows = rows.iter().map(decode_row).collect();
        Ok(RowCursor::new(rows))
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        // sqlx keeps prepared statements in the connection's statement cache
        self.closed = true;
        Ok(())
    }
}

/// Validates with the driver's ping instead of a probe query
#[derive(Debug, Clone, Copy, Default)]
pub struct PingValidator;

#[async_trait]
impl ConnectionValidator<PgConnection> for PingValidator {
    async fn is_valid(&self, con: &mut PgConnection) -> Result<bool, ConnectionError> {
        sqlx::Connection::ping(con).await?;
        Ok(true)
    }
}

fn decode_row(row: &PgRow) -> ProbeRow {
    ProbeRow::new((0..row.columns().len()).map(|i| decode_column(row, i)).collect())
}

fn decode_column(row: &PgRow, index: usize) -> ProbeValue {
    if let Ok(v) = row.try_get::<Option<i32>, _>(index) {
        return v.into();
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v.into();
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(index) {
        return v.map(i64::from).into();
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
        return v.into();
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return v.into();
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(index) {
        return v.map(f64::from).into();
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v.into();
    }

    tracing::debug!(
        column = row.columns()[index].name(),
        "Probe column has no scalar mapping, reading it as NULL"
    );
    ProbeValue::Null
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ResultCursor;
    use sqlx::Connection as _;

    async fn connect() -> Option<PgConnection> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping");
            return None;
        };
        Some(PgConnection::connect(&url).await.unwrap())
    }

    #[tokio::test]
    async fn test_decode_column_type_fallbacks() {
        let Some(mut con) = connect().await else {
            return;
        };

        let mut statement = con.create_statement().await.unwrap();
        let mut cursor = statement
            .execute_query(
                "SELECT 1::int4, 2::int8, 3::int2, true, 1.5::float8, 2.5::float4, \
                 'ok'::text, NULL::int4, now()",
            )
            .await
            .unwrap();
        let row = cursor.next_row().await.unwrap().unwrap();
        assert!(cursor.next_row().await.unwrap().is_none());

        assert_eq!(
            row.values(),
            &[
                ProbeValue::Int(1),
                ProbeValue::Int(2),
                ProbeValue::Int(3),
                ProbeValue::Bool(true),
                ProbeValue::Float(1.5),
                ProbeValue::Float(2.5),
                ProbeValue::Text("ok".to_string()),
                ProbeValue::Null,
                // timestamptz has no scalar mapping
                ProbeValue::Null,
            ]
        );

        cursor.close().await.unwrap();
        statement.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_ping_validator() {
        let Some(mut con) = connect().await else {
            return;
        };
        assert!(PingValidator.is_valid(&mut con).await.unwrap());
    }
}
