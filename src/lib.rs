/*!
 # dbtuner

Operator-invoked database maintenance for SQL Server. The first task is periodic archival:
rows whose `effective_date` is on or before a cutoff are moved from a live table into its
backup table, in batches of 50 000 rows, by a loop that runs entirely on the server.

## Features

- **Batched**: each batch is one `DELETE ... OUTPUT DELETED.* INTO` statement, so rows are moved atomically per batch
- **Log-friendly**: the server-side log maintenance procedure runs between batches
- **Integrated auth**: sessions authenticate as the running process, no passwords
- **Extensible**: new maintenance tasks plug in through the [`SubCommand`] trait

## Authentication

Sessions always use integrated authentication. Windows builds use SSPI. On Linux and macOS
the Kerberos login needs the `integrated-auth-gssapi` cargo feature (and the system GSSAPI
library); a build without it can parse arguments and resolve environments but every
connection attempt fails before reaching the network:

```sh
cargo install --path . --features integrated-auth-gssapi
```
*/

pub mod archive;
pub mod cli;
pub mod commands;
pub mod config;
pub mod connection;
pub mod error;
pub mod store;

pub use crate::archive::{build_archive_script, execute_archive, ArchiveReport, ArchiveRequest};
pub use crate::commands::SubCommand;
pub use crate::config::{Context, EnvironmentConfig, EnvironmentRegistry};
pub use crate::error::{Error, Result};
