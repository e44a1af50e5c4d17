//! Static asset responder.
//!
//! Serves files under a fixed assets root. `GET /` returns the root's
//! `index.html`; any other path maps to the file of the same relative path.
//! Missing files and paths escaping the root answer `404 Not Found`. A path
//! escapes when it contains `..` or an absolute component, or when it
//! resolves through a symlink to a target outside the root. Content types
//! are inferred from file extensions.

// ============================================================================
// Imports
// ============================================================================

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::debug;

// ============================================================================
// Public Functions
// ============================================================================

/// Builds the router serving `assets_root`.
#[must_use]
pub fn router(assets_root: impl AsRef<Path>) -> Router {
    let assets_root = assets_root.as_ref();
    let canonical_root =
        std::fs::canonicalize(assets_root).unwrap_or_else(|_| assets_root.to_path_buf());
    let serve_dir = ServeDir::new(assets_root).append_index_html_on_directories(true);

    Router::new()
        .fallback_service(serve_dir)
        .layer(middleware::from_fn_with_state(Arc::new(canonical_root), confine_to_root))
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Root Confinement
// ============================================================================

/// Answers 404 for requests whose file resolves outside `root`.
async fn confine_to_root(
    State(root): State<Arc<PathBuf>>,
    request: Request,
    next: Next,
) -> Response {
    let inside = resolves_inside(&root, request.uri().path()).await;

    if inside {
        next.run(request).await
    } else {
        debug!(path = request.uri().path(), "Path resolves outside the assets root");
        StatusCode::NOT_FOUND.into_response()
    }
}

/// Returns `true` if `uri_path` names a file under the canonical `root`.
///
/// Paths that do not exist pass; `ServeDir` answers them with 404.
async fn resolves_inside(root: &Path, uri_path: &str) -> bool {
    let Ok(decoded) = urlencoding::decode(uri_path) else {
        return false;
    };

    let mut candidate = root.to_path_buf();
    for component in Path::new(decoded.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => candidate.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return false,
        }
    }

    let Ok(resolved) = tokio::fs::canonicalize(&candidate).await else {
        return true;
    };
    if !resolved.starts_with(root) {
        return false;
    }

    // Directories are served through their index file.
    let is_dir = tokio::fs::metadata(&resolved)
        .await
        .is_ok_and(|meta| meta.is_dir());
    if is_dir {
        return match tokio::fs::canonicalize(resolved.join("index.html")).await {
            Ok(index) => index.starts_with(root),
            Err(_) => true,
        };
    }

    true
}

// ============================================================================
// Tests
// ============================================================================
