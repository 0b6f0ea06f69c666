//! Scoped handle to the dataset backend for one validation run.
//!
//! The context owns a DataFusion session for the run's lifetime. The primary
//! table is always registered as `data` (with row sampling applied through a
//! view when configured), plus any reference tables under their configured
//! names. Check executors only see the narrow query surface here; the backend
//! is never accessed directly, so it can be swapped without touching check
//! logic. The session is released when the context is dropped, on every exit
//! path.

use crate::config::{DataSourceSpec, SourceKind};
use crate::error::{Result, SentinelError};
use arrow::array::{Array, Float64Array};
use arrow::compute::cast;
use arrow::datatypes::{DataType, SchemaRef};
use datafusion::datasource::MemTable;
use datafusion::prelude::{CsvReadOptions, NdJsonReadOptions, ParquetReadOptions, SessionContext};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Name the primary table is registered under.
const DATA_TABLE: &str = "data";

/// A live, exclusively-owned handle to the dataset backend for one run.
pub struct ExecutionContext {
    session: SessionContext,
    source_location: String,
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("source_location", &self.source_location)
            .finish()
    }
}

impl ExecutionContext {
    /// Opens a context for the given data source.
    ///
    /// Registers the primary table as `data`, applying the configured sample
    /// fraction as a filtering view, then registers reference tables. Any
    /// failure here is a connection error: the data source is unreachable or
    /// unreadable and the run cannot start.
    #[instrument(skip(source), fields(source.kind = ?source.kind, source.location = %source.location))]
    pub async fn open(source: &DataSourceSpec) -> Result<Self> {
        let session = SessionContext::new();

        match source.sample_fraction {
            None => {
                Self::register_file(&session, source.kind, &source.location, DATA_TABLE).await?;
                // Registration alone defers file access to query time; force
                // a read now so an unreachable source fails the run up front.
                let probe = session
                    .sql(&format!("SELECT * FROM {DATA_TABLE} LIMIT 1"))
                    .await
                    .map_err(|e| {
                        SentinelError::connection(format!(
                            "cannot open {:?} source at '{}': {e}",
                            source.kind, source.location
                        ))
                    })?;
                probe.collect().await.map_err(|e| {
                    SentinelError::connection(format!(
                        "cannot read {:?} source at '{}': {e}",
                        source.kind, source.location
                    ))
                })?;
            }
            Some(fraction) => {
                // Register the full table under a staging name, draw the
                // sample once, and pin it as an in-memory table. A filter
                // view over random() would re-sample on every query.
                let staging = "data_full";
                Self::register_file(&session, source.kind, &source.location, staging).await?;
                let sampled = session
                    .sql(&format!(
                        "SELECT * FROM {staging} WHERE random() < {fraction}"
                    ))
                    .await
                    .map_err(|e| {
                        SentinelError::connection(format!(
                            "cannot apply sample fraction {fraction}: {e}"
                        ))
                    })?;
                let schema = sampled.schema().inner().clone();
                let batches = sampled.collect().await.map_err(|e| {
                    SentinelError::connection(format!(
                        "cannot read {:?} source at '{}': {e}",
                        source.kind, source.location
                    ))
                })?;
                let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
                let table = MemTable::try_new(schema, vec![batches])
                    .map_err(|e| SentinelError::connection(e.to_string()))?;
                session
                    .register_table(DATA_TABLE, Arc::new(table))
                    .map_err(|e| SentinelError::connection(e.to_string()))?;
                session
                    .deregister_table(staging)
                    .map_err(|e| SentinelError::connection(e.to_string()))?;
                debug!(
                    sample.fraction = fraction,
                    sample.rows = rows,
                    "Materialized sampled data"
                );
            }
        }

        for reference in &source.references {
            Self::register_file(&session, reference.kind, &reference.location, &reference.name)
                .await?;
            debug!(reference.table = %reference.name, "Registered reference table");
        }

        info!(source.location = %source.location, "Opened execution context");
        Ok(Self {
            session,
            source_location: source.location.clone(),
        })
    }

    async fn register_file(
        session: &SessionContext,
        kind: SourceKind,
        location: &str,
        table: &str,
    ) -> Result<()> {
        let registered = match kind {
            SourceKind::Csv => {
                session
                    .register_csv(table, location, CsvReadOptions::new())
                    .await
            }
            SourceKind::Parquet => {
                session
                    .register_parquet(table, location, ParquetReadOptions::default())
                    .await
            }
            SourceKind::Json => {
                session
                    .register_json(table, location, NdJsonReadOptions::default())
                    .await
            }
        };
        registered.map_err(|e| {
            SentinelError::connection(format!("cannot open {kind:?} source at '{location}': {e}"))
        })
    }

    /// The table name checks should query.
    pub fn table_name(&self) -> &str {
        DATA_TABLE
    }

    /// Returns the schema of the primary table.
    pub async fn table_schema(&self) -> Result<SchemaRef> {
        let provider = self.session.table_provider(DATA_TABLE).await?;
        Ok(provider.schema())
    }

    /// Runs an aggregation query and returns the first row's columns as
    /// floats. NULL aggregates (e.g. SUM over zero rows) come back as 0.0.
    pub async fn aggregate_row(&self, sql: &str) -> Result<Vec<f64>> {
        debug!(query = %sql, "Executing aggregate query");
        let df = self.session.sql(sql).await?;
        let batches = df.collect().await?;
        let batch = batches
            .iter()
            .find(|b| b.num_rows() > 0)
            .ok_or_else(|| SentinelError::Internal("aggregate query returned no rows".into()))?;

        let mut values = Vec::with_capacity(batch.num_columns());
        for column in batch.columns() {
            let as_float = cast(column, &DataType::Float64).map_err(|e| {
                SentinelError::Internal(format!("cannot read aggregate value as number: {e}"))
            })?;
            let array = as_float
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| SentinelError::Internal("aggregate cast produced wrong array".into()))?;
            values.push(if array.is_null(0) { 0.0 } else { array.value(0) });
        }
        Ok(values)
    }

    /// Runs an aggregation query expected to return a single scalar.
    pub async fn aggregate_scalar(&self, sql: &str) -> Result<f64> {
        let row = self.aggregate_row(sql).await?;
        row.first().copied().ok_or_else(|| {
            SentinelError::Internal("aggregate query returned no columns".into())
        })
    }

    /// Fetches up to `limit` rows matching the predicate, formatted as a
    /// table for diagnostic detail.
    pub async fn sample(&self, predicate: &str, limit: usize) -> Result<String> {
        let sql = format!("SELECT * FROM {DATA_TABLE} WHERE {predicate} LIMIT {limit}");
        debug!(query = %sql, "Fetching example rows");
        let df = self.session.sql(&sql).await?;
        let batches = df.collect().await?;
        if batches.iter().all(|b| b.num_rows() == 0) {
            return Ok(String::new());
        }
        let rendered = arrow::util::pretty::pretty_format_batches(&batches)
            .map_err(|e| SentinelError::Internal(format!("cannot format example rows: {e}")))?;
        Ok(rendered.to_string())
    }

    /// Releases the backend handle. Dropping the context has the same effect;
    /// this exists to make the release point explicit in the engine.
    pub fn close(self) {
        info!(source.location = %self.source_location, "Closed execution context");
        drop(self.session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_csv;

    fn csv_source(location: String, sample_fraction: Option<f64>) -> DataSourceSpec {
        DataSourceSpec {
            kind: SourceKind::Csv,
            location,
            sample_fraction,
            references: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_open_missing_source_is_connection_error() {
        let source = csv_source("/nonexistent/data.csv".to_string(), None);
        let err = ExecutionContext::open(&source).await.unwrap_err();
        assert!(matches!(err, SentinelError::Connection { .. }));
    }

    #[tokio::test]
    async fn test_sampled_source_is_stable_across_queries() {
        let mut csv = String::from("id\n");
        for i in 0..500 {
            csv.push_str(&format!("{i}\n"));
        }
        let file = write_csv(&csv);
        let source = csv_source(file.path().to_string_lossy().into_owned(), Some(0.5));
        let ctx = ExecutionContext::open(&source).await.unwrap();

        let first = ctx
            .aggregate_scalar("SELECT COUNT(*) FROM data")
            .await
            .unwrap();
        let second = ctx
            .aggregate_scalar("SELECT COUNT(*) FROM data")
            .await
            .unwrap();
        assert_eq!(first, second);
        assert!(first < 500.0);
    }
}
