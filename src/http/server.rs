//! HTTP listener for static assets.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;

use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::assets;

// ============================================================================
// HttpServer
// ============================================================================

/// A bound HTTP listener serving one assets root.
pub struct HttpServer {
    /// TCP listener for incoming connections.
    listener: TcpListener,
    /// Address the listener is bound to.
    local_addr: SocketAddr,
    /// Directory served at `/`.
    assets_root: PathBuf,
}

impl HttpServer {
    /// Binds the listener.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Bind`] if the address is unavailable.
    pub async fn bind(addr: SocketAddr, assets_root: impl Into<PathBuf>) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::bind(addr, e))?;
        let local_addr = listener.local_addr()?;
        let assets_root = assets_root.into();

        debug!(addr = %local_addr, root = %assets_root.display(), "HTTP server bound");

        Ok(Self {
            listener,
            local_addr,
            assets_root,
        })
    }

    /// Returns the port the server is bound to.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Returns the bound address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the loopback URL for this server.
    ///
    /// Format: `http://127.0.0.1:{port}/`
    #[inline]
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}/", self.port())
    }

    /// Serves requests until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the server fails.
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let port = self.port();
        let app = assets::router(&self.assets_root);

        info!(port, "HTTP server accepting connections");
        axum::serve(self.listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;
        info!(port, "HTTP server stopped");

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
