//! Database session abstraction for dbtuner.
//!
//! This module defines the [`Connector`] and [`Session`] traits. Commands only talk to these
//! traits, so the SQL Server driver can be swapped for a test double.

use crate::connection::{ConnectionDescriptor, CredentialStrategy};
use crate::error::Result;
use async_trait::async_trait;

pub mod mssql;

pub use mssql::MssqlConnector;

/// An open, authenticated connection.
///
/// Sessions run in autocommit mode: every submitted batch commits on its own.
#[async_trait]
pub trait Session: Send {
    /// Submit a SQL batch and wait for it to finish.
    ///
    /// # Returns
    /// Number of rows the server reported as affected.
    async fn execute(&mut self, script: &str) -> Result<u64>;

    /// Release the connection. Consumes the session, so it cannot be closed twice.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Opens sessions from connection descriptors.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a session, authenticating with `credential`. No retry.
    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
        credential: &dyn CredentialStrategy,
    ) -> Result<Box<dyn Session>>;
}
