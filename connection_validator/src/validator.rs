//! Connection validation
//!
//! [`ConnectionValidator`] is the capability a pool manager calls before
//! handing out or retaining a connection. [`QueryValidator`] implements it by
//! issuing a probe query; the probe itself ([`ValidationQuery`]) decides which
//! query to run and how to read the rows that come back.

use async_trait::async_trait;

use crate::connection::{Connection, ResultCursor, Statement};
use crate::errors::ConnectionError;

/// Decides whether a connection is still usable.
///
/// An `Err` means the same thing as `Ok(false)` to the caller: the connection
/// is discarded. Implementations must not leave an open transaction or cursor
/// behind on either branch.
#[async_trait]
pub trait ConnectionValidator<C: Connection>: Send + Sync {
    async fn is_valid(&self, con: &mut C) -> Result<bool, ConnectionError>;
}

/// The two extension points of a query-based validator
#[async_trait]
pub trait ValidationQuery: Send + Sync {
    /// Probe query issued to the database
    fn query_string(&self) -> &str;

    /// Interpret the rows produced by [`query_string`](Self::query_string)
    async fn check_results(&self, results: &mut dyn ResultCursor)
        -> Result<bool, ConnectionError>;
}

#[async_trait]
impl ValidationQuery for Box<dyn ValidationQuery> {
    fn query_string(&self) -> &str {
        (**self).query_string()
    }

    async fn check_results(
        &self,
        results: &mut dyn ResultCursor,
    ) -> Result<bool, ConnectionError> {
        (**self).check_results(results).await
    }
}

/// Validates connections by running a probe query.
///
/// The orchestration is fixed: open a statement, execute the probe's query,
/// hand the cursor to the probe, then close the cursor and the statement in
/// that order. Both closes happen on every path that created the resource,
/// and a failure while closing is logged and dropped so it never replaces
/// the result or the error of the probe itself.
#[derive(Debug, Clone)]
pub struct QueryValidator<P> {
    probe: P,
}

impl<P: ValidationQuery> QueryValidator<P> {
    pub fn new(probe: P) -> Self {
        Self { probe }
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    pub fn into_probe(self) -> P {
        self.probe
    }
}

#[async_trait]
impl<C, P> ConnectionValidator<C> for QueryValidator<P>
where
    C: Connection,
    P: ValidationQuery,
{
    async fn is_valid(&self, con: &mut C) -> Result<bool, ConnectionError> {
        let mut statement = con.create_statement().await?;

        let mut cursor = match statement.execute_query(self.probe.query_string()).await {
            Ok(cursor) => cursor,
            Err(err) => {
                discard_close_error("statement", statement.close().await);
                return Err(err);
            }
        };

        let outcome = self.probe.check_results(&mut cursor).await;

        discard_close_error("result cursor", cursor.close().await);
        discard_close_error("statement", statement.close().await);

        outcome
    }
}

fn discard_close_error(resource: &str, result: Result<(), ConnectionError>) {
    if let Err(err) = result {
        tracing::debug!(resource, error = %err, "Ignoring error while closing probe resource");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{ProbeRow, ProbeValue, RowCursor};
    use crate::probes::RowExists;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Journal {
        events: Mutex<Vec<&'static str>>,
        queries: Mutex<Vec<String>>,
    }

    impl Journal {
        fn record(&self, event: &'static str) {
            self.events.lock().unwrap().push(event);
        }

        fn events(&self) -> Vec<&'static str> {
            self.events.lock().unwrap().clone()
        }

        fn count(&self, event: &str) -> usize {
            self.events().iter().filter(|e| **e == event).count()
        }
    }

    #[derive(Clone, Copy, Default)]
    struct Faults {
        create: bool,
        execute: bool,
        cursor_close: bool,
        statement_close: bool,
    }

    struct FakeConnection {
        rows: Vec<ProbeRow>,
        faults: Faults,
        journal: Arc<Journal>,
    }

    struct FakeStatement<'c> {
        conn: &'c mut FakeConnection,
    }

    struct FakeCursor {
        inner: RowCursor,
        fail_close: bool,
        journal: Arc<Journal>,
    }

    impl FakeConnection {
        fn new(rows: Vec<ProbeRow>, faults: Faults) -> Self {
            Self {
                rows,
                faults,
                journal: Arc::new(Journal::default()),
            }
        }
    }

    #[async_trait]
    impl Connection for FakeConnection {
        type Statement<'c> = FakeStatement<'c>;

        async fn create_statement<'c>(
            &'c mut self,
        ) -> Result<FakeStatement<'c>, ConnectionError> {
            if self.faults.create {
                return Err(ConnectionError::driver("connection reset"));
            }
            self.journal.record("create");
            Ok(FakeStatement { conn: self })
        }
    }

    #[async_trait]
    impl Statement for FakeStatement<'_> {
        type Cursor = FakeCursor;

        async fn execute_query(&mut self, sql: &str) -> Result<FakeCursor, ConnectionError> {
            self.conn.journal.queries.lock().unwrap().push(sql.to_string());
            if self.conn.faults.execute {
                return Err(ConnectionError::query("relation does not exist"));
            }
            Ok(FakeCursor {
                inner: RowCursor::new(self.conn.rows.clone()),
                fail_close: self.conn.faults.cursor_close,
                journal: self.conn.journal.clone(),
            })
        }

        async fn close(&mut self) -> Result<(), ConnectionError> {
            self.conn.journal.record("statement_close");
            if self.conn.faults.statement_close {
                return Err(ConnectionError::driver("statement close failed"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ResultCursor for FakeCursor {
        async fn next_row(&mut self) -> Result<Option<ProbeRow>, ConnectionError> {
            self.inner.next_row().await
        }

        async fn close(&mut self) -> Result<(), ConnectionError> {
            self.journal.record("cursor_close");
            self.inner.close().await?;
            if self.fail_close {
                return Err(ConnectionError::driver("cursor close failed"));
            }
            Ok(())
        }
    }

    struct FailingCheck;

    #[async_trait]
    impl ValidationQuery for FailingCheck {
        fn query_string(&self) -> &str {
            "SELECT 1"
        }

        async fn check_results(
            &self,
            _results: &mut dyn ResultCursor,
        ) -> Result<bool, ConnectionError> {
            Err(ConnectionError::query("unexpected column type"))
        }
    }

    fn one_row() -> Vec<ProbeRow> {
        vec![ProbeRow::new(vec![ProbeValue::Int(1)])]
    }

    #[tokio::test]
    async fn test_live_connection_is_valid() {
        let validator = QueryValidator::new(RowExists::new("SELECT 1"));
        let mut con = FakeConnection::new(one_row(), Faults::default());

        assert!(validator.is_valid(&mut con).await.unwrap());
        assert_eq!(
            con.journal.events(),
            vec!["create", "cursor_close", "statement_close"]
        );
        assert_eq!(*con.journal.queries.lock().unwrap(), vec!["SELECT 1"]);
    }

    #[tokio::test]
    async fn test_empty_result_is_invalid_and_still_released() {
        let validator = QueryValidator::new(RowExists::new("SELECT 1"));
        let mut con = FakeConnection::new(Vec::new(), Faults::default());

        assert!(!validator.is_valid(&mut con).await.unwrap());
        assert_eq!(con.journal.count("cursor_close"), 1);
        assert_eq!(con.journal.count("statement_close"), 1);
    }

    #[tokio::test]
    async fn test_check_results_error_propagates_after_release() {
        let validator = QueryValidator::new(FailingCheck);
        let mut con = FakeConnection::new(one_row(), Faults::default());

        let err = validator.is_valid(&mut con).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Query(ref msg) if msg == "unexpected column type"));
        assert_eq!(
            con.journal.events(),
            vec!["create", "cursor_close", "statement_close"]
        );
    }

    #[tokio::test]
    async fn test_execute_error_propagates_and_closes_statement() {
        let validator = QueryValidator::new(RowExists::new("SELECT 1"));
        let faults = Faults {
            execute: true,
            ..Faults::default()
        };
        let mut con = FakeConnection::new(one_row(), faults);

        let err = validator.is_valid(&mut con).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Query(_)));
        assert_eq!(con.journal.events(), vec!["create", "statement_close"]);
    }

    #[tokio::test]
    async fn test_create_statement_error_propagates() {
        let validator = QueryValidator::new(RowExists::new("SELECT 1"));
        let faults = Faults {
            create: true,
            ..Faults::default()
        };
        let mut con = FakeConnection::new(one_row(), faults);

        let err = validator.is_valid(&mut con).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Driver(_)));
        assert!(con.journal.events().is_empty());
    }

    #[tokio::test]
    async fn test_cursor_close_error_is_swallowed() {
        let validator = QueryValidator::new(RowExists::new("SELECT 1"));
        let faults = Faults {
            cursor_close: true,
            ..Faults::default()
        };
        let mut con = FakeConnection::new(one_row(), faults);

        assert!(validator.is_valid(&mut con).await.unwrap());
        assert_eq!(con.journal.count("cursor_close"), 1);
        assert_eq!(con.journal.count("statement_close"), 1);
    }

    #[tokio::test]
    async fn test_close_errors_do_not_mask_primary_error() {
        let validator = QueryValidator::new(FailingCheck);
        let faults = Faults {
            cursor_close: true,
            statement_close: true,
            ..Faults::default()
        };
        let mut con = FakeConnection::new(one_row(), faults);

        let err = validator.is_valid(&mut con).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Query(_)));
        assert_eq!(con.journal.count("cursor_close"), 1);
        assert_eq!(con.journal.count("statement_close"), 1);
    }

    #[tokio::test]
    async fn test_statement_close_error_is_swallowed() {
        let validator = QueryValidator::new(RowExists::new("SELECT 1"));
        let faults = Faults {
            statement_close: true,
            ..Faults::default()
        };
        let mut con = FakeConnection::new(Vec::new(), faults);

        assert!(!validator.is_valid(&mut con).await.unwrap());
        assert_eq!(con.journal.count("statement_close"), 1);
    }

    #[tokio::test]
    async fn test_boxed_probe_delegates() {
        let probe: Box<dyn ValidationQuery> = Box::new(RowExists::new("SELECT 1"));
        let validator = QueryValidator::new(probe);
        let mut con = FakeConnection::new(one_row(), Faults::default());

        assert_eq!(validator.probe().query_string(), "SELECT 1");
        assert!(validator.is_valid(&mut con).await.unwrap());
    }
}
