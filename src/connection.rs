//! Connection descriptors and credential strategies.
//!
//! A [`ConnectionDescriptor`] is assembled from an [`EnvironmentConfig`] and a
//! [`CredentialStrategy`]. It carries both the driver connection string shown to operators and
//! the individual pieces a [`Connector`](crate::store::Connector) needs to log in.
//!
//! The connection string has the form
//!
//! ```text
//! Driver=<driver>;Server=<server>;Database=<database>;Trusted_Connection=yes;app=<schema>;auth=<token>
//! ```
//!
//! where the schema doubles as the application name and `auth` is the serialized credential.
use crate::config::EnvironmentConfig;
use crate::error::Result;
use std::fmt;
use tiberius::AuthMethod;

/// How the tool authenticates against the database server.
pub trait CredentialStrategy: Send + Sync {
    /// Serialized form of the credential, embedded in the connection string.
    fn token(&self) -> String;

    /// Whether the current process identity is used for authentication.
    fn is_trusted(&self) -> bool;

    /// Authentication handed to the driver at login.
    fn auth_method(&self) -> Result<AuthMethod>;
}

/// Integrated (Kerberos / SSPI) authentication with the identity of the running process.
///
/// No password is involved. The driver negotiates the ticket with the server at login, with
/// mutual authentication optional. Non-Windows builds need the `integrated-auth-gssapi`
/// feature; without it [`CredentialStrategy::auth_method`] fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntegratedCredential;

impl CredentialStrategy for IntegratedCredential {
    fn token(&self) -> String {
        "negotiate;mutual=optional".to_string()
    }

    fn is_trusted(&self) -> bool {
        true
    }

    #[cfg(any(windows, all(unix, feature = "integrated-auth-gssapi")))]
    fn auth_method(&self) -> Result<AuthMethod> {
        Ok(AuthMethod::Integrated)
    }

    #[cfg(not(any(windows, all(unix, feature = "integrated-auth-gssapi"))))]
    fn auth_method(&self) -> Result<AuthMethod> {
        Err(crate::error::Error::ConnectionFailed {
            source: "integrated authentication is not available in this build; \
                     rebuild with the `integrated-auth-gssapi` feature"
                .into(),
            context: "selecting authentication method".to_string(),
        })
    }
}

/// Everything needed to open a session against one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub connection_string: String,
    pub driver: String,
    pub server: String,
    pub database: String,
    pub application_name: String,
    pub trusted: bool,
    pub auth_token: String,
    pub encrypt: bool,
    pub trust_server_certificate: bool,
}

impl ConnectionDescriptor {
    /// Assemble the descriptor for `env` authenticated with `credential`.
    pub fn build(env: &EnvironmentConfig, credential: &dyn CredentialStrategy) -> Self {
        let trusted = credential.is_trusted();
        let auth_token = credential.token();
        let connection_string = format!(
            "Driver={};Server={};Database={};Trusted_Connection={};app={};auth={}",
            env.driver,
            env.server,
            env.database,
            if trusted { "yes" } else { "no" },
            env.schema,
            auth_token
        );

        Self {
            connection_string,
            driver: env.driver.clone(),
            server: env.server.clone(),
            database: env.database.clone(),
            application_name: env.schema.clone(),
            trusted,
            auth_token,
            encrypt: env.encrypt,
            trust_server_certificate: env.trust_server_certificate,
        }
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.connection_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev_env() -> EnvironmentConfig {
        EnvironmentConfig::new("{SQL Server}", "sqlhost,1433", "dev_db", "dev_schema")
    }

    #[test]
    fn test_connection_string_layout() {
        let descriptor = ConnectionDescriptor::build(&dev_env(), &IntegratedCredential);

        assert_eq!(
            descriptor.connection_string,
            concat!(
                "Driver={SQL Server};Server=sqlhost,1433;Database=dev_db;",
                "Trusted_Connection=yes;app=dev_schema;auth=negotiate;mutual=optional"
            )
        );
        assert_eq!(descriptor.to_string(), descriptor.connection_string);
    }

    #[test]
    fn test_descriptor_parts() {
        let descriptor = ConnectionDescriptor::build(&dev_env(), &IntegratedCredential);

        assert_eq!(descriptor.server, "sqlhost,1433");
        assert_eq!(descriptor.database, "dev_db");
        assert_eq!(descriptor.application_name, "dev_schema");
        assert!(descriptor.trusted);
        assert!(!descriptor.encrypt);
        assert!(descriptor.trust_server_certificate);
    }

    #[test]
    fn test_untrusted_credential() {
        struct SqlLogin;
        impl CredentialStrategy for SqlLogin {
            fn token(&self) -> String {
                "sql".to_string()
            }
            fn is_trusted(&self) -> bool {
                false
            }
            fn auth_method(&self) -> Result<AuthMethod> {
                Ok(AuthMethod::sql_server("archiver", "secret"))
            }
        }

        let descriptor = ConnectionDescriptor::build(&dev_env(), &SqlLogin);
        assert!(descriptor
            .connection_string
            .contains("Trusted_Connection=no;app=dev_schema;auth=sql"));
        assert!(!descriptor.trusted);
    }

    #[test]
    fn test_integrated_token() {
        assert_eq!(IntegratedCredential.token(), "negotiate;mutual=optional");
        assert!(IntegratedCredential.is_trusted());
    }

    #[cfg(any(windows, all(unix, feature = "integrated-auth-gssapi")))]
    #[test]
    fn test_integrated_auth_method() {
        assert_eq!(IntegratedCredential.auth_method().unwrap(), AuthMethod::Integrated);
    }

    #[cfg(not(any(windows, all(unix, feature = "integrated-auth-gssapi"))))]
    #[test]
    fn test_integrated_auth_unavailable_without_feature() {
        let result = IntegratedCredential.auth_method();
        assert!(matches!(result, Err(crate::error::Error::ConnectionFailed { .. })));
    }
}
