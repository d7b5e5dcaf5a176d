use crate::connection::{ConnectionDescriptor, CredentialStrategy};
use crate::error::{Error, Result};
use crate::store::{Connector, Session};
use async_trait::async_trait;
use std::time::Duration;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Opens SQL Server sessions over TDS.
#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlConnector;

/// Split a SQL Server address of the form `host` or `host,port`.
fn parse_server(server: &str) -> Result<(&str, Option<u16>)> {
    match server.split_once(',') {
        None => Ok((server.trim(), None)),
        Some((host, port)) => {
            let port = port.trim().parse::<u16>().map_err(|e| Error::InvalidConfig {
                field: "server".to_string(),
                message: format!("invalid port in '{}': {}", server, e),
            })?;
            Ok((host.trim(), Some(port)))
        }
    }
}

/// Driver configuration for `descriptor`, logging in with `auth`.
///
/// Without `encrypt` only the login exchange is encrypted. With `trust_server_certificate`
/// the certificate presented by the server is accepted as-is.
fn client_config(descriptor: &ConnectionDescriptor, auth: AuthMethod) -> Result<Config> {
    let (host, port) = parse_server(&descriptor.server)?;

    let mut config = Config::new();
    config.host(host);
    if let Some(port) = port {
        config.port(port);
    }
    config.database(&descriptor.database);
    config.application_name(&descriptor.application_name);
    config.encryption(if descriptor.encrypt {
        EncryptionLevel::Required
    } else {
        EncryptionLevel::Off
    });
    if descriptor.trust_server_certificate {
        config.trust_cert();
    }
    config.authentication(auth);
    Ok(config)
}

fn connection_failed(
    source: impl std::error::Error + Send + Sync + 'static,
    descriptor: &ConnectionDescriptor,
) -> Error {
    Error::ConnectionFailed {
        source: Box::new(source),
        context: format!(
            "connecting to {} (database {})",
            descriptor.server, descriptor.database
        ),
    }
}

#[async_trait]
impl Connector for MssqlConnector {
    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
        credential: &dyn CredentialStrategy,
    ) -> Result<Box<dyn Session>> {
        let config = client_config(descriptor, credential.auth_method()?)?;
        let addr = config.get_addr();
        tracing::debug!("Opening TCP connection to {}", addr);

        let login = async {
            let tcp = TcpStream::connect(&addr)
                .await
                .map_err(|e| connection_failed(e, descriptor))?;
            tcp.set_nodelay(true)
                .map_err(|e| connection_failed(e, descriptor))?;
            Client::connect(config, tcp.compat_write())
                .await
                .map_err(|e| connection_failed(e, descriptor))
        };

        let client = tokio::time::timeout(CONNECT_TIMEOUT, login)
            .await
            .map_err(|e| connection_failed(e, descriptor))??;

        tracing::debug!("Connected to {}", descriptor.server);
        Ok(Box::new(MssqlSession { client }))
    }
}

/// A live SQL Server connection. No transaction is ever opened, so each batch autocommits.
pub struct MssqlSession {
    client: Client<Compat<TcpStream>>,
}

#[async_trait]
impl Session for MssqlSession {
    async fn execute(&mut self, script: &str) -> Result<u64> {
        let result = self.client.execute(script, &[]).await?;
        Ok(result.total())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }
}
