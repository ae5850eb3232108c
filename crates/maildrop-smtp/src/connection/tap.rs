//! Traffic logging wrapper.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use super::transport::Transport;
use crate::error::Result;

/// Log target for raw session traffic.
pub const TRAFFIC_TARGET: &str = "maildrop_smtp::traffic";

/// Passes bytes through unchanged, logging each chunk at `trace` level.
///
/// Client chunks are logged as `C: ...`, server chunks as `S: ...`.
/// Everything is logged, including the AUTH LOGIN exchange, so enable the
/// [`TRAFFIC_TARGET`] target only when debugging.
#[derive(Debug)]
pub struct Tap<S> {
    inner: S,
}

impl<S> Tap<S> {
    /// Wraps a stream.
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: Transport> Transport for Tap<S> {
    async fn upgrade_to_tls(self, hostname: &str) -> Result<Self> {
        tracing::trace!(target: TRAFFIC_TARGET, hostname, "TLS handshake");
        let inner = self.inner.upgrade_to_tls(hostname).await?;
        tracing::trace!(target: TRAFFIC_TARGET, "TLS established");
        Ok(Self { inner })
    }

    fn is_tls(&self) -> bool {
        self.inner.is_tls()
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for Tap<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let poll = Pin::new(&mut self.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = poll {
            let chunk = &buf.filled()[before..];
            if chunk.is_empty() {
                tracing::trace!(target: TRAFFIC_TARGET, "S: <eof>");
            } else {
                tracing::trace!(target: TRAFFIC_TARGET, "S: {}", chunk.escape_ascii());
            }
        }
        poll
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for Tap<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let poll = Pin::new(&mut self.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = poll {
            tracing::trace!(target: TRAFFIC_TARGET, "C: {}", buf[..n].escape_ascii());
        }
        poll
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
