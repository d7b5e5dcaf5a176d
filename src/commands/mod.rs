//! Sub-commands of the dbtuner CLI.
//!
//! Every sub-command implements [`SubCommand`]: a unique name, a help string, an argument
//! declaration, and an execution entry point. [`registry`] is the explicit list of commands
//! the binary exposes; the CLI attaches and dispatches whatever is listed there, so adding a
//! maintenance task (purging, moving partitions, ...) means implementing the trait and adding
//! it to the list.

use crate::config::{Context, EnvironmentRegistry};
use crate::connection::CredentialStrategy;
use crate::error::Result;
use crate::store::Connector;
use async_trait::async_trait;
use clap::{ArgMatches, Command};
use std::io::Write;

pub mod archive;

pub use archive::ArchiveCommand;

/// Shared state handed to every sub-command.
pub struct CommandContext<'a> {
    /// Environment selected with `-c/--context`
    pub context: Context,
    pub registry: &'a EnvironmentRegistry,
    pub connector: &'a dyn Connector,
    pub credential: &'a dyn CredentialStrategy,
}

/// Contract implemented by each sub-command.
#[async_trait]
pub trait SubCommand: Send + Sync {
    /// Name used on the command line.
    fn name(&self) -> &'static str;

    /// One-line help shown in the command listing.
    fn help(&self) -> &'static str;

    /// Declare the command's arguments on its clap command.
    fn args(&self, command: Command) -> Command;

    /// Run the command with its parsed arguments.
    async fn execute(
        &self,
        ctx: &CommandContext<'_>,
        matches: &ArgMatches,
        out: &mut (dyn Write + Send),
    ) -> Result<()>;
}

/// Sub-commands exposed by the binary, in help order.
pub fn registry() -> Vec<Box<dyn SubCommand>> {
    vec![Box::new(ArchiveCommand)]
}
