//! Stock probe queries

use async_trait::async_trait;
use config::ValidatorConfig;

use crate::connection::{ProbeRow, ProbeValue, ResultCursor};
use crate::errors::ConnectionError;
use crate::validator::{QueryValidator, ValidationQuery};

/// Valid when the probe query returns at least one row
#[derive(Debug, Clone)]
pub struct RowExists {
    query: String,
}

impl RowExists {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }
}

#[async_trait]
impl ValidationQuery for RowExists {
    fn query_string(&self) -> &str {
        &self.query
    }

    async fn check_results(
        &self,
        results: &mut dyn ResultCursor,
    ) -> Result<bool, ConnectionError> {
        Ok(results.next_row().await?.is_some())
    }
}

/// Valid when the first column of the first row equals an expected value
#[derive(Debug, Clone)]
pub struct ExpectedValue {
    query: String,
    expected: ProbeValue,
}

impl ExpectedValue {
    pub fn new(query: impl Into<String>, expected: impl Into<ProbeValue>) -> Self {
        Self {
            query: query.into(),
            expected: expected.into(),
        }
    }

    pub fn expected(&self) -> &ProbeValue {
        &self.expected
    }
}

#[async_trait]
impl ValidationQuery for ExpectedValue {
    fn query_string(&self) -> &str {
        &self.query
    }

    async fn check_results(
        &self,
        results: &mut dyn ResultCursor,
    ) -> Result<bool, ConnectionError> {
        let Some(row) = results.next_row().await? else {
            return Ok(false);
        };
        Ok(row.get(0) == Some(&self.expected))
    }
}

/// Probe built from a query string and a predicate over the returned rows
pub struct FnQuery<F> {
    query: String,
    check: F,
}

impl<F> std::fmt::Debug for FnQuery<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnQuery")
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

impl<F> FnQuery<F>
where
    F: Fn(&[ProbeRow]) -> bool + Send + Sync,
{
    pub fn new(query: impl Into<String>, check: F) -> Self {
        Self {
            query: query.into(),
            check,
        }
    }
}

#[async_trait]
impl<F> ValidationQuery for FnQuery<F>
where
    F: Fn(&[ProbeRow]) -> bool + Send + Sync,
{
    fn query_string(&self) -> &str {
        &self.query
    }

    async fn check_results(
        &self,
        results: &mut dyn ResultCursor,
    ) -> Result<bool, ConnectionError> {
        let mut rows = Vec::new();
        while let Some(row) = results.next_row().await? {
            rows.push(row);
        }
        Ok((self.check)(&rows))
    }
}

impl QueryValidator<RowExists> {
    /// `SELECT 1`, valid when a row comes back
    pub fn select_one() -> Self {
        Self::new(RowExists::new("SELECT 1"))
    }
}

impl<F> QueryValidator<FnQuery<F>>
where
    F: Fn(&[ProbeRow]) -> bool + Send + Sync,
{
    pub fn from_fn(query: impl Into<String>, check: F) -> Self {
        Self::new(FnQuery::new(query, check))
    }
}

impl QueryValidator<Box<dyn ValidationQuery>> {
    /// Build the probe described by the configuration
    pub fn from_config(config: &ValidatorConfig) -> Self {
        let probe: Box<dyn ValidationQuery> = match config.expected_value {
            Some(expected) => Box::new(ExpectedValue::new(config.probe_query.clone(), expected)),
            None => Box::new(RowExists::new(config.probe_query.clone())),
        };
        Self::new(probe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::RowCursor;

    fn rows(values: &[i64]) -> RowCursor {
        RowCursor::new(
            values
                .iter()
                .map(|v| ProbeRow::new(vec![ProbeValue::Int(*v)]))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_row_exists() {
        let probe = RowExists::new("SELECT 1");
        assert!(probe.check_results(&mut rows(&[1])).await.unwrap());
        assert!(!probe.check_results(&mut rows(&[])).await.unwrap());
    }

    #[tokio::test]
    async fn test_expected_value_matches_first_column() {
        let probe = ExpectedValue::new("SELECT 42", 42i64);
        assert!(probe.check_results(&mut rows(&[42])).await.unwrap());
        assert!(!probe.check_results(&mut rows(&[41])).await.unwrap());
        assert!(!probe.check_results(&mut rows(&[])).await.unwrap());
    }

    #[tokio::test]
    async fn test_expected_value_type_mismatch_is_invalid() {
        let probe = ExpectedValue::new("SELECT 'ok'", "ok");
        let mut cursor = rows(&[1]);
        assert!(!probe.check_results(&mut cursor).await.unwrap());
    }

    #[tokio::test]
    async fn test_fn_query_sees_all_rows() {
        let probe = FnQuery::new("SELECT id FROM t", |rows: &[ProbeRow]| rows.len() == 3);
        assert!(probe.check_results(&mut rows(&[1, 2, 3])).await.unwrap());
        assert!(!probe.check_results(&mut rows(&[1])).await.unwrap());
    }

    #[tokio::test]
    async fn test_closed_cursor_error_propagates() {
        let probe = RowExists::new("SELECT 1");
        let mut cursor = rows(&[1]);
        cursor.close().await.unwrap();
        assert!(matches!(
            probe.check_results(&mut cursor).await,
            Err(ConnectionError::Closed(_))
        ));
    }

    #[test]
    fn test_from_config_selects_probe() {
        let plain = QueryValidator::from_config(&ValidatorConfig::default());
        assert_eq!(plain.probe().query_string(), "SELECT 1");

        let strict =
            QueryValidator::from_config(&ValidatorConfig::new("SELECT 7".to_string(), Some(7)));
        assert_eq!(strict.probe().query_string(), "SELECT 7");
    }

    #[test]
    fn test_select_one() {
        assert_eq!(QueryValidator::select_one().probe().query_string(), "SELECT 1");
    }
}
