//! Socket client for the load balancer's control endpoint.
//!
//! One call opens one connection, writes one command, reads one reply and
//! closes. A connection that failed to open is never written to.

use crate::config::ClientConfig;
use crate::endpoint::{check_path_len, Endpoint};
use crate::error::{timed_out, ClientError};
use crate::protocol::{wire, Command, Response};
use async_trait::async_trait;
use std::future::Future;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpSocket, TcpStream, UnixSocket, UnixStream};
use tracing::{debug, trace};

/// A bidirectional byte stream to a control endpoint.
pub trait ControlStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> ControlStream for T {}

/// An open connection, owned by the exchange that created it.
pub type Connection = Box<dyn ControlStream>;

/// Opens connections to control endpoints.
///
/// The connect deadline is applied by the caller around the whole call,
/// name resolution included.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Connection, ClientError>;
}

/// Connects over real Unix domain and TCP sockets.
#[derive(Debug, Clone, Copy, Default)]
pub struct SocketConnector;

#[async_trait]
impl Connector for SocketConnector {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Connection, ClientError> {
        match endpoint {
            Endpoint::Local { path } => Ok(Box::new(connect_local(path).await?)),
            Endpoint::Network { host, port } => Ok(Box::new(connect_network(host, *port).await?)),
        }
    }
}

/// Send `command` to `endpoint` and return the reply.
pub async fn query(
    endpoint: &Endpoint,
    command: &Command,
    config: &ClientConfig,
) -> Result<Response, ClientError> {
    query_with(&SocketConnector, endpoint, command, config).await
}

/// Same as [`query`], with the connection opened by `connector`.
pub async fn query_with<C>(
    connector: &C,
    endpoint: &Endpoint,
    command: &Command,
    config: &ClientConfig,
) -> Result<Response, ClientError>
where
    C: Connector + ?Sized,
{
    debug!(%endpoint, command = command.line(), "querying control socket");
    let connection = match config.timeout() {
        Some(limit) => tokio::time::timeout(limit, connector.connect(endpoint))
            .await
            .map_err(|_| ClientError::ConnectFailed {
                endpoint: endpoint.to_string(),
                source: timed_out("connect"),
            })??,
        None => connector.connect(endpoint).await?,
    };
    send_and_receive(connection, command, config).await
}

/// Connect to a local domain socket.
pub async fn connect_local(path: &Path) -> Result<UnixStream, ClientError> {
    check_path_len(path)?;
    let endpoint = || format!("unix:{}", path.display());

    let socket = UnixSocket::new_stream().map_err(|source| ClientError::SocketCreateFailed {
        endpoint: endpoint(),
        source,
    })?;
    let stream = socket
        .connect(path)
        .await
        .map_err(|source| ClientError::ConnectFailed {
            endpoint: endpoint(),
            source,
        })?;

    trace!(path = %path.display(), "connected");
    Ok(stream)
}

/// Connect to a TCP endpoint.
///
/// IP literals are used as-is; other hosts go through the system resolver
/// and the first address returned is tried.
pub async fn connect_network(host: &str, port: u16) -> Result<TcpStream, ClientError> {
    let endpoint = || Endpoint::network(host, port).to_string();

    let addr = resolve(host, port)
        .await
        .map_err(|source| ClientError::ConnectFailed {
            endpoint: endpoint(),
            source,
        })?;

    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4(),
        SocketAddr::V6(_) => TcpSocket::new_v6(),
    }
    .map_err(|source| ClientError::SocketCreateFailed {
        endpoint: endpoint(),
        source,
    })?;

    let stream = socket
        .connect(addr)
        .await
        .map_err(|source| ClientError::ConnectFailed {
            endpoint: endpoint(),
            source,
        })?;

    trace!(%addr, "connected");
    Ok(stream)
}

/// Run one exchange over `connection` and close it.
///
/// The connection is consumed and dropped before returning on every path.
pub async fn send_and_receive<S>(
    mut connection: S,
    command: &Command,
    config: &ClientConfig,
) -> Result<Response, ClientError>
where
    S: ControlStream,
{
    let result = exchange(&mut connection, command, config).await;
    drop(connection);
    trace!("connection closed");
    result
}

async fn exchange<S>(
    connection: &mut S,
    command: &Command,
    config: &ClientConfig,
) -> Result<Response, ClientError>
where
    S: ControlStream,
{
    let timeout = config.timeout();

    with_deadline(timeout, "write", wire::write_command(connection, command))
        .await
        .map_err(|source| ClientError::WriteFailed { source })?;
    trace!(bytes = command.as_bytes().len(), "command written");

    let response = with_deadline(
        timeout,
        "read",
        wire::read_response(
            connection,
            config.buffer_size,
            config.read_mode,
            config.max_response_bytes,
        ),
    )
    .await
    .map_err(|source| ClientError::ReadFailed { source })?;
    trace!(bytes = response.len(), "response read");

    Ok(response)
}

async fn resolve(host: &str, port: u16) -> io::Result<SocketAddr> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }
    tokio::net::lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no addresses found for {}", host),
            )
        })
}

async fn with_deadline<F, T>(timeout: Option<Duration>, phase: &str, fut: F) -> io::Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| timed_out(phase))?,
        None => fut.await,
    }
}
