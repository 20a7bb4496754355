//! Outbound connection establishment
//!
//! The forwarder reaches its collector through the [`Dialer`] trait so tests
//! can stand an in-memory transport in for the real TCP client.

use std::sync::Arc;

use async_trait::async_trait;
use logferry_core::SinkAddress;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Connection factory for the forwarder
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Open a byte stream to the collector
    async fn dial(&self, addr: &SinkAddress) -> std::io::Result<Self::Stream>;
}

#[async_trait]
impl<D: Dialer> Dialer for Arc<D> {
    type Stream = D::Stream;

    async fn dial(&self, addr: &SinkAddress) -> std::io::Result<Self::Stream> {
        (**self).dial(addr).await
    }
}

/// Production dialer speaking plain TCP
#[derive(Debug, Default, Clone)]
pub struct TcpDialer;

#[async_trait]
impl Dialer for TcpDialer {
    type Stream = TcpStream;

    async fn dial(&self, addr: &SinkAddress) -> std::io::Result<Self::Stream> {
        TcpStream::connect(addr.socket_addr()).await
    }
}
