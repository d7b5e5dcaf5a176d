//! Environment registry for dbtuner.
//!
//! This module defines the [`EnvironmentRegistry`], the fixed mapping from an environment
//! identifier ([`Context`]) to the connection parameters of that environment.
//!
//! ## What
//!
//! - [`Context`] is the closed set of environments an operator can select with `-c`.
//! - [`EnvironmentConfig`] holds the driver, server, database and schema of one environment.
//! - [`EnvironmentRegistry`] answers lookups and fails with
//!   [`Error::ConfigurationMissing`](crate::error::Error::ConfigurationMissing) for gaps.
//!
//! ## How
//!
//! Build the registry once at startup with [`EnvironmentRegistry::builtin`] and pass it to
//! the commands that need it. There is no file or environment-variable override; extending
//! the set of environments means editing [`EnvironmentRegistry::builtin`].
//!
//! ### Example
//!
//! ```rust
//! use dbtuner::config::{Context, EnvironmentRegistry};
//!
//! let registry = EnvironmentRegistry::builtin().expect("builtin registry is valid");
//! let dev = registry.lookup(Context::Dev).expect("dev is configured");
//! assert_eq!(dev.schema, "dev_schema");
//! assert!(registry.lookup(Context::Prod).is_err());
//! ```
use crate::error::{Error, Result};
use clap::ValueEnum;
use std::collections::BTreeMap;
use std::fmt;

// SQL Server `sysname` is nvarchar(128)
const MAX_IDENTIFIER_LEN: usize = 128;

const DEV_DRIVER: &str = "{SQL Server}";
const DEV_SERVER: &str = "localhost";
const DEV_DATABASE: &str = "dev_db";
const DEV_SCHEMA: &str = "dev_schema";

/// Environment identifier selected with `-c/--context`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum Context {
    /// Development database
    Dev,
    /// Production database (not configured yet)
    Prod,
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Context::Dev => write!(f, "dev"),
            Context::Prod => write!(f, "prod"),
        }
    }
}

/// Connection parameters of one environment.
///
/// Transport security defaults to what the `{SQL Server}` ODBC driver does: only the login
/// exchange is encrypted and the server certificate is not validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentConfig {
    /// ODBC-style driver name, e.g. `{SQL Server}`
    pub driver: String,
    /// Server address, `host` or `host,port`
    pub server: String,
    /// Database name, also used to reach server-side maintenance procedures
    pub database: String,
    /// Schema that owns the archived tables
    pub schema: String,
    /// Encrypt the whole session, failing if the server cannot
    pub encrypt: bool,
    /// Accept the server certificate without checking it against trusted roots
    pub trust_server_certificate: bool,
}

impl EnvironmentConfig {
    pub fn new(
        driver: impl Into<String>,
        server: impl Into<String>,
        database: impl Into<String>,
        schema: impl Into<String>,
    ) -> Self {
        Self {
            driver: driver.into(),
            server: server.into(),
            database: database.into(),
            schema: schema.into(),
            encrypt: false,
            trust_server_certificate: true,
        }
    }

    pub fn with_encryption(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }

    pub fn with_trust_server_certificate(mut self, trust: bool) -> Self {
        self.trust_server_certificate = trust;
        self
    }
}

/// Validates a SQL Server identifier such as a schema or database name.
///
/// Rules:
/// - Must begin with a letter (a-z, A-Z) or underscore (_)
/// - Subsequent characters can be letters, underscores, digits (0-9), or dollar signs ($)
/// - Maximum length is 128 characters
///
/// # Arguments
/// * `field` - Name of the configuration field, used in the error
/// * `identifier` - The identifier to validate
///
/// # Returns
/// * `Ok(())` if the identifier is valid
/// * `Err(Error::InvalidConfig)` otherwise
pub fn validate_identifier(field: &str, identifier: &str) -> Result<()> {
    let invalid = |message: String| Error::InvalidConfig {
        field: field.to_string(),
        message,
    };

    let Some(first_char) = identifier.chars().next() else {
        return Err(invalid(format!("{} cannot be empty", field)));
    };

    if identifier.chars().count() > MAX_IDENTIFIER_LEN {
        return Err(invalid(format!(
            "'{}' exceeds maximum length of {} characters",
            identifier, MAX_IDENTIFIER_LEN
        )));
    }

    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(invalid(format!(
            "'{}' must start with a letter or underscore",
            identifier
        )));
    }

    if let Some(c) = identifier
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '_' && *c != '$')
    {
        return Err(invalid(format!(
            "'{}' contains invalid character '{}'. Only letters, digits, underscores, and dollar signs are allowed",
            identifier, c
        )));
    }

    Ok(())
}

/// Registry of configured environments.
///
/// Immutable once built; the registry lives for the whole process.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentRegistry {
    environments: BTreeMap<Context, EnvironmentConfig>,
}

impl EnvironmentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The environments shipped with the tool.
    ///
    /// Only `dev` is populated. `prod` is deliberately left out, so selecting it is reported
    /// as a configuration gap instead of silently reusing dev's parameters.
    pub fn builtin() -> Result<Self> {
        Self::new().with_environment(
            Context::Dev,
            EnvironmentConfig::new(DEV_DRIVER, DEV_SERVER, DEV_DATABASE, DEV_SCHEMA),
        )
    }

    /// Register an environment, validating the names that end up in SQL text.
    pub fn with_environment(mut self, context: Context, config: EnvironmentConfig) -> Result<Self> {
        validate_identifier("schema", &config.schema)?;
        validate_identifier("database", &config.database)?;
        if config.server.trim().is_empty() {
            return Err(Error::InvalidConfig {
                field: "server".to_string(),
                message: format!("server address for '{}' cannot be empty", context),
            });
        }
        self.environments.insert(context, config);
        Ok(self)
    }

    /// Look up the configuration of an environment.
    ///
    /// # Returns
    /// * `Ok(&EnvironmentConfig)` for a configured environment
    /// * `Err(Error::ConfigurationMissing)` when the environment has no entry
    pub fn lookup(&self, context: Context) -> Result<&EnvironmentConfig> {
        self.environments
            .get(&context)
            .ok_or(Error::ConfigurationMissing { context })
    }

    /// Configured environments, ordered by context.
    pub fn entries(&self) -> impl Iterator<Item = (Context, &EnvironmentConfig)> {
        self.environments.iter().map(|(context, config)| (*context, config))
    }
}
