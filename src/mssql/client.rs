use tiberius::{Client, Config, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

use crate::error::SqlProviderError;

/// Type alias for SQL Server client
pub type MssqlClient = Client<Compat<TcpStream>>;

/// Connect using an ADO.NET-style connection string.
///
/// Named instances are resolved through SQL Browser; an Azure routing redirect is
/// followed once.
///
/// # Errors
/// Returns the driver's error for a malformed string or a failed login, and
/// `ConnectionError` when the TCP socket cannot be configured.
pub async fn create_mssql_client(connection_string: &str) -> Result<MssqlClient, SqlProviderError> {
    let config = Config::from_ado_string(connection_string)?;

    let tcp = TcpStream::connect_named(&config).await?;
    tcp.set_nodelay(true)
        .map_err(|e| SqlProviderError::ConnectionError(format!("TCP configuration error: {e}")))?;

    match Client::connect(config.clone(), tcp.compat_write()).await {
        Ok(client) => Ok(client),
        Err(tiberius::error::Error::Routing { host, port }) => {
            debug!(%host, port, "following SQL Server routing redirect");
            let mut config = config;
            config.host(&host);
            config.port(port);

            let tcp = TcpStream::connect(config.get_addr())
                .await
                .map_err(|e| SqlProviderError::ConnectionError(format!("TCP connection error: {e}")))?;
            tcp.set_nodelay(true)
                .map_err(|e| SqlProviderError::ConnectionError(format!("TCP configuration error: {e}")))?;

            Ok(Client::connect(config, tcp.compat_write()).await?)
        }
        Err(e) => Err(e.into()),
    }
}
