//! TCP transport framed into protocol lines.

use std::fmt;
use std::io;
use std::time::Duration;

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::warn;

use crate::error::ConnectError;
use crate::line::LineCodec;

/// A server to connect to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl ServerAddress {
    pub const DEFAULT_PORT: u16 = 6667;

    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl std::str::FromStr for ServerAddress {
    type Err = String;

    /// `host` or `host:port`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (host, port) = match s.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse()
                    .map_err(|_| format!("invalid port in server address: {}", s))?;
                (host, port)
            }
            None => (s, Self::DEFAULT_PORT),
        };
        if host.is_empty() {
            return Err(format!("missing host in server address: {}", s));
        }
        Ok(Self::new(host, port))
    }
}

/// A connected stream reading and writing whole lines.
pub struct Transport {
    framed: Framed<TcpStream, LineCodec>,
}

impl Transport {
    pub fn tcp(stream: TcpStream, codec: LineCodec) -> Self {
        if let Err(e) = Self::enable_keepalive(&stream) {
            warn!("failed to enable TCP keepalive: {}", e);
        }

        Self {
            framed: Framed::new(stream, codec),
        }
    }

    /// Open a TCP connection, giving up after `timeout`.
    pub async fn connect(server: &ServerAddress, timeout: Duration, encoding: &str) -> Result<Self, ConnectError> {
        let io_error = |source| ConnectError::Io {
            server: server.to_string(),
            source,
        };

        let codec = LineCodec::new(encoding).map_err(io_error)?;
        let stream = tokio::time::timeout(timeout, TcpStream::connect((server.host.as_str(), server.port)))
            .await
            .map_err(|_| ConnectError::Timeout {
                server: server.to_string(),
            })?
            .map_err(io_error)?;

        Ok(Self::tcp(stream, codec))
    }

    fn enable_keepalive(stream: &TcpStream) -> Result<()> {
        use socket2::{SockRef, TcpKeepalive};

        let sock = SockRef::from(stream);
        let keepalive = TcpKeepalive::new()
            .with_time(Duration::from_secs(120))
            .with_interval(Duration::from_secs(30));

        sock.set_tcp_keepalive(&keepalive)?;
        Ok(())
    }

    /// Next line, or `None` at end of stream.
    ///
    /// Cancel-safe: a partially received line stays buffered.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        self.framed.next().await.transpose()
    }

    /// Write one line; the terminator is added.
    pub async fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.framed.send(line.to_string()).await
    }
}
