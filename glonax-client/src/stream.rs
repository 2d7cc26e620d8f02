//! Client stream abstraction for TCP and Unix domain sockets.

use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;

/// Where the control unit listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `host:port`.
    Tcp(String),
    /// Path of a Unix domain socket.
    Unix(PathBuf),
}

impl Endpoint {
    /// Parses `unix:/path/to/socket` or `host:port`.
    pub fn parse(address: &str) -> Option<Self> {
        if let Some(path) = address.strip_prefix("unix:") {
            if path.is_empty() {
                return None;
            }
            return Some(Endpoint::Unix(PathBuf::from(path)));
        }
        match address.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
                Some(Endpoint::Tcp(address.to_string()))
            }
            _ => None,
        }
    }
}

/// A client stream that can be either TCP or a Unix domain socket.
pub enum ClientStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl ClientStream {
    /// Opens a stream to the endpoint.
    pub async fn connect(endpoint: &Endpoint) -> io::Result<Self> {
        match endpoint {
            Endpoint::Tcp(addr) => {
                let stream = TcpStream::connect(addr.as_str()).await?;
                stream.set_nodelay(true).ok();
                Ok(ClientStream::Tcp(stream))
            }
            #[cfg(unix)]
            Endpoint::Unix(path) => Ok(ClientStream::Unix(UnixStream::connect(path).await?)),
            #[cfg(not(unix))]
            Endpoint::Unix(_) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "unix sockets are not supported on this platform",
            )),
        }
    }

    /// Returns whether this stream is a Unix domain socket.
    pub fn is_unix(&self) -> bool {
        !matches!(self, ClientStream::Tcp(_))
    }
}

impl AsyncRead for ClientStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ClientStream::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            #[cfg(unix)]
            ClientStream::Unix(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ClientStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            ClientStream::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
            #[cfg(unix)]
            ClientStream::Unix(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ClientStream::Tcp(stream) => Pin::new(stream).poll_flush(cx),
            #[cfg(unix)]
            ClientStream::Unix(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ClientStream::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
            #[cfg(unix)]
            ClientStream::Unix(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_parse() {
        assert_eq!(
            Endpoint::parse("localhost:30051"),
            Some(Endpoint::Tcp("localhost:30051".to_string()))
        );
        assert_eq!(
            Endpoint::parse("[::1]:30051"),
            Some(Endpoint::Tcp("[::1]:30051".to_string()))
        );
        assert_eq!(
            Endpoint::parse("unix:/tmp/glonax.sock"),
            Some(Endpoint::Unix(PathBuf::from("/tmp/glonax.sock")))
        );
        assert_eq!(Endpoint::parse("localhost"), None);
        assert_eq!(Endpoint::parse("localhost:notaport"), None);
        assert_eq!(Endpoint::parse(":30051"), None);
        assert_eq!(Endpoint::parse("unix:"), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_connect_unix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glonax.sock");
        let listener = tokio::net::UnixListener::bind(&path).unwrap();

        let endpoint = Endpoint::Unix(path);
        let (stream, accepted) = tokio::join!(ClientStream::connect(&endpoint), listener.accept());
        assert!(stream.unwrap().is_unix());
        assert!(accepted.is_ok());
    }
}
