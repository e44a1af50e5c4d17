//! HTTP surface.
//!
//! Serves the demo's static assets (HTML, scripts, styles) so a browser can
//! load the client that connects to the WebSocket channel.
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /` | `<assets>/index.html` |
//! | `GET /<path>` | `<assets>/<path>`, or `404` if missing or outside the root |

// ============================================================================
// Submodules
// ============================================================================

/// Static asset router.
pub mod assets;

/// HTTP listener.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use assets::router;
pub use server::HttpServer;
