//! Batched archival of rows from a live table into its backup table.
//!
//! ## What
//!
//! - [`ArchiveRequest`] describes one archival run: environment, source table, target table and cutoff.
//! - [`build_archive_script`] renders the server-side T-SQL loop for a request.
//! - [`execute_archive`] submits the script over a [`Session`] and always releases the session.
//!
//! ## How
//!
//! The whole loop runs on the server. Each iteration moves at most [`BATCH_SIZE`] rows with a
//! single `DELETE ... OUTPUT DELETED.* INTO` statement, then calls the log-space maintenance
//! procedure before the next batch. The loop stops once a batch moves zero rows.
//!
//! Batches commit independently (autocommit). A failure part way through leaves the batches
//! already moved in the target table; nothing is rolled back.
//!
//! ### Example
//!
//! ```rust
//! use dbtuner::archive::{build_archive_script, ArchiveRequest};
//! use dbtuner::config::{Context, EnvironmentConfig};
//!
//! let env = EnvironmentConfig::new("{SQL Server}", "localhost", "dev_db", "dev_schema");
//! let request = ArchiveRequest::new(Context::Dev, "orders", "orders_backup", "20200101");
//! let script = build_archive_script(&env, &request);
//! assert!(script.contains("DELETE dev_schema.orders"));
//! ```
use crate::config::{Context, EnvironmentConfig};
use crate::error::{Error, Result};
use crate::store::Session;
use std::io::Write;

/// Maximum number of rows moved per batch.
pub const BATCH_SIZE: u32 = 50_000;

/// Column compared against the cutoff value.
pub const CUTOFF_COLUMN: &str = "effective_date";

/// Server-side procedure that blocks until the transaction log has free space.
pub const LOG_MAINTENANCE_PROCEDURE: &str = "sp__block_for_free_log";

/// Argument passed to [`LOG_MAINTENANCE_PROCEDURE`] between batches.
pub const LOG_MAINTENANCE_ARGUMENT: u32 = 30;

/// Printed once the session has been released.
pub const CLOSE_MESSAGE: &str = "Connection Closed Successfully!!!";

/// One archival run. Built once from the parsed arguments and consumed by [`execute_archive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRequest {
    pub context: Context,
    pub source_table: String,
    pub target_table: String,
    pub date_condition: String,
}

impl ArchiveRequest {
    pub fn new(
        context: Context,
        source_table: impl Into<String>,
        target_table: impl Into<String>,
        date_condition: impl Into<String>,
    ) -> Self {
        Self {
            context,
            source_table: source_table.into(),
            target_table: target_table.into(),
            date_condition: date_condition.into(),
        }
    }
}

/// Result of a completed archival run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    pub source: String,
    pub target: String,
    pub date_condition: String,
    /// Row count reported by the server across all statements of the script
    pub rows_affected: u64,
}

/// Render the archival loop for `request` against `env`.
///
/// This is the only place request values are turned into SQL. Schema, table and database
/// names are identifiers and cannot be bound as parameters, so they are interpolated as-is.
/// The cutoff is interpolated as a quoted literal. None of the values are escaped.
pub fn build_archive_script(env: &EnvironmentConfig, request: &ArchiveRequest) -> String {
    format!(
        "DECLARE @row_count int = {batch_size};
SET ROWCOUNT @row_count;
WHILE (@row_count > 0)
    BEGIN
        DELETE {schema}.{source_table}
        OUTPUT DELETED.*
        INTO {schema}.{target_table}
        WHERE {cutoff_column}<='{date_condition}';
        SET @row_count = @@ROWCOUNT;
        EXEC {database}..{procedure} {procedure_argument};
    END",
        batch_size = BATCH_SIZE,
        schema = env.schema,
        source_table = request.source_table,
        target_table = request.target_table,
        cutoff_column = CUTOFF_COLUMN,
        date_condition = request.date_condition,
        database = env.database,
        procedure = LOG_MAINTENANCE_PROCEDURE,
        procedure_argument = LOG_MAINTENANCE_ARGUMENT,
    )
}

/// Run the archival script over `session` and release the session.
///
/// The script is submitted exactly once. Whatever happens during execution, the session is
/// closed exactly once afterwards and [`CLOSE_MESSAGE`] is written to `out` when the close
/// succeeds. An execution error is written to `out` as well, then returned as
/// [`Error::ExecutionFailed`] so the caller can set the exit status.
///
/// # Arguments
/// * `session` - Open session, owned by this call
/// * `env` - Environment the session was opened against
/// * `request` - What to archive
/// * `out` - Operator-facing output
///
/// # Returns
/// An [`ArchiveReport`] if the script ran to completion, error otherwise.
pub async fn execute_archive(
    mut session: Box<dyn Session>,
    env: &EnvironmentConfig,
    request: &ArchiveRequest,
    out: &mut (dyn Write + Send),
) -> Result<ArchiveReport> {
    let script = build_archive_script(env, request);
    tracing::debug!("Archive script:\n{}", script);
    tracing::info!(
        "Archiving {}.{} into {}.{} where {} <= '{}' (batches of {})...",
        env.schema,
        request.source_table,
        env.schema,
        request.target_table,
        CUTOFF_COLUMN,
        request.date_condition,
        BATCH_SIZE
    );

    let executed = session.execute(&script).await;
    if let Err(e) = &executed {
        tracing::error!("Archive of '{}' failed: {}", request.source_table, e);
        if let Err(write_err) = writeln!(out, "{}", e) {
            tracing::warn!("Failed to report archive error: {}", write_err);
        }
    }

    let closed = session.close().await;
    let reported = match &closed {
        Ok(()) => {
            tracing::debug!("Connection to {} closed", env.server);
            writeln!(out, "{}", CLOSE_MESSAGE)
        }
        Err(e) => {
            tracing::warn!("Failed to close connection to {}: {}", env.server, e);
            Ok(())
        }
    };

    let rows_affected = executed.map_err(|e| Error::ExecutionFailed {
        source: Box::new(e),
        context: format!(
            "archiving {}.{} into {}.{}",
            env.schema, request.source_table, env.schema, request.target_table
        ),
    })?;
    closed?;
    reported?;

    tracing::info!(
        "Archive of '{}' completed ({} rows affected)",
        request.source_table,
        rows_affected
    );
    Ok(ArchiveReport {
        source: format!("{}.{}", env.schema, request.source_table),
        target: format!("{}.{}", env.schema, request.target_table),
        date_condition: request.date_condition.clone(),
        rows_affected,
    })
}
