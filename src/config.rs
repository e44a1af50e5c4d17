//! Demo process configuration.
//!
//! Provides fixed defaults and a fluent builder for [`DemoConfig`].
//!
//! # Example
//!
//! ```no_run
//! use webchannel::DemoConfig;
//!
//! # fn example() -> webchannel::Result<()> {
//! let config = DemoConfig::builder()
//!     .http_port(8080)
//!     .ws_port(8081)
//!     .assets_root("./assets")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::channel::DEFAULT_QUEUE_CAPACITY;
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default port of the static asset server.
pub const DEFAULT_HTTP_PORT: u16 = 8000;

/// Default port of the WebSocket channel server.
pub const DEFAULT_WS_PORT: u16 = 8001;

/// Default assets root, relative to the working directory.
pub const DEFAULT_ASSETS_DIR: &str = "assets";

/// The HTTP listener binds `[::]`, which also accepts IPv4 on dual-stack hosts.
const DEFAULT_HTTP_IP: IpAddr = IpAddr::V6(Ipv6Addr::UNSPECIFIED);

/// The WebSocket listener binds every IPv4 interface.
const DEFAULT_WS_IP: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

// ============================================================================
// DemoConfig
// ============================================================================

/// Validated configuration of the demo process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoConfig {
    http_addr: SocketAddr,
    ws_addr: SocketAddr,
    assets_root: PathBuf,
    session_queue_capacity: usize,
}

impl DemoConfig {
    /// Creates a builder seeded with the defaults.
    #[inline]
    #[must_use]
    pub fn builder() -> DemoConfigBuilder {
        DemoConfigBuilder::new()
    }

    /// Address of the static asset server.
    #[inline]
    #[must_use]
    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    /// Address of the WebSocket channel server.
    #[inline]
    #[must_use]
    pub fn ws_addr(&self) -> SocketAddr {
        self.ws_addr
    }

    /// Directory served over HTTP.
    #[inline]
    #[must_use]
    pub fn assets_root(&self) -> &Path {
        &self.assets_root
    }

    /// Outbound queue capacity of each session.
    #[inline]
    #[must_use]
    pub fn session_queue_capacity(&self) -> usize {
        self.session_queue_capacity
    }
}

// ============================================================================
// DemoConfigBuilder
// ============================================================================

/// Builder for [`DemoConfig`].
///
/// Use [`DemoConfig::builder()`] to create a new builder.
#[derive(Debug, Clone)]
pub struct DemoConfigBuilder {
    http_addr: SocketAddr,
    ws_addr: SocketAddr,
    assets_root: PathBuf,
    session_queue_capacity: usize,
}

impl Default for DemoConfigBuilder {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::new(DEFAULT_HTTP_IP, DEFAULT_HTTP_PORT),
            ws_addr: SocketAddr::new(DEFAULT_WS_IP, DEFAULT_WS_PORT),
            assets_root: PathBuf::from(DEFAULT_ASSETS_DIR),
            session_queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl DemoConfigBuilder {
    /// Creates a builder with the default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the full HTTP listen address.
    #[inline]
    #[must_use]
    pub fn http_addr(mut self, addr: SocketAddr) -> Self {
        self.http_addr = addr;
        self
    }

    /// Sets the full WebSocket listen address.
    #[inline]
    #[must_use]
    pub fn ws_addr(mut self, addr: SocketAddr) -> Self {
        self.ws_addr = addr;
        self
    }

    /// Sets only the HTTP port, keeping the bind address.
    ///
    /// Port 0 lets the OS pick a free port.
    #[inline]
    #[must_use]
    pub fn http_port(mut self, port: u16) -> Self {
        self.http_addr.set_port(port);
        self
    }

    /// Sets only the WebSocket port, keeping the bind address.
    #[inline]
    #[must_use]
    pub fn ws_port(mut self, port: u16) -> Self {
        self.ws_addr.set_port(port);
        self
    }

    /// Sets the directory served over HTTP.
    #[inline]
    #[must_use]
    pub fn assets_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.assets_root = path.into();
        self
    }

    /// Sets the outbound queue capacity of each session.
    #[inline]
    #[must_use]
    pub fn session_queue_capacity(mut self, capacity: usize) -> Self {
        self.session_queue_capacity = capacity;
        self
    }

    /// Builds the configuration with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the assets root is not an existing directory
    /// - [`Error::Config`] if the queue capacity is zero
    pub fn build(self) -> Result<DemoConfig> {
        self.validate_assets_root()?;
        self.validate_capacity()?;

        Ok(DemoConfig {
            http_addr: self.http_addr,
            ws_addr: self.ws_addr,
            assets_root: self.assets_root,
            session_queue_capacity: self.session_queue_capacity,
        })
    }
}

// ============================================================================
// Validation
// ============================================================================

impl DemoConfigBuilder {
    fn validate_assets_root(&self) -> Result<()> {
        if !self.assets_root.is_dir() {
            return Err(Error::config(format!(
                "Assets directory not found at: {}\n\
                 Run from the project root or use .assets_root() to set it.",
                self.assets_root.display()
            )));
        }
        Ok(())
    }

    fn validate_capacity(&self) -> Result<()> {
        if self.session_queue_capacity == 0 {
            return Err(Error::config("Session queue capacity must be at least 1"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
