use crate::archive::{execute_archive, ArchiveRequest};
use crate::commands::{CommandContext, SubCommand};
use crate::connection::ConnectionDescriptor;
use crate::error::Result;
use async_trait::async_trait;
use clap::{ArgMatches, Args, Command, FromArgMatches};
use std::io::Write;

// `-st` and `-tt` are rewritten to the long forms by `cli::normalize_args` before parsing.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ArchiveArgs {
    /// table from which data is archived (alias: -st)
    #[arg(long = "source_table", visible_alias = "source-table", value_name = "SOURCE_TABLE")]
    pub source_table: String,

    /// table to which data is added (alias: -tt)
    #[arg(long = "target_table", visible_alias = "target-table", value_name = "TARGET_TABLE")]
    pub target_table: String,

    /// date column value up to which data should be archived
    #[arg(long = "date_condition", visible_alias = "date-condition", value_name = "DATE")]
    pub date_condition: String,
}

/// Archives records from a source table to a backup table based on a date condition.
pub struct ArchiveCommand;

#[async_trait]
impl SubCommand for ArchiveCommand {
    fn name(&self) -> &'static str {
        "archive"
    }

    fn help(&self) -> &'static str {
        "Archives records from source table to backup table based on date condition."
    }

    fn args(&self, command: Command) -> Command {
        ArchiveArgs::augment_args(command)
    }

    async fn execute(
        &self,
        ctx: &CommandContext<'_>,
        matches: &ArgMatches,
        out: &mut (dyn Write + Send),
    ) -> Result<()> {
        let args = ArchiveArgs::from_arg_matches(matches)?;
        let request = ArchiveRequest::new(
            ctx.context,
            args.source_table,
            args.target_table,
            args.date_condition,
        );

        // Resolve the environment before touching the network.
        let env = ctx.registry.lookup(request.context)?;
        let descriptor = ConnectionDescriptor::build(env, ctx.credential);
        tracing::debug!("Connection descriptor: {}", descriptor);
        tracing::info!(
            "Connecting to {} (database {}) for environment '{}'...",
            env.server,
            env.database,
            request.context
        );
        let session = ctx.connector.connect(&descriptor, ctx.credential).await?;

        let report = execute_archive(session, env, &request, out).await?;
        tracing::info!(
            "Moved rows from {} to {} up to '{}' ({} rows affected)",
            report.source,
            report.target,
            report.date_condition,
            report.rows_affected
        );
        Ok(())
    }
}
