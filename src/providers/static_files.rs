use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use tower_http::services::ServeDir;

use crate::http::Provider;

/// Serves files from `<user-data-dir>/static` without authentication.
pub struct StaticProvider {
    root: PathBuf,
}

impl StaticProvider {
    pub fn new(user_data_dir: &Path) -> Self {
        Self {
            root: user_data_dir.join("static"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Provider for StaticProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    fn router(self: Arc<Self>) -> Router {
        Router::new().route_service("/{*path}", ServeDir::new(&self.root))
    }

    fn requires_auth(&self) -> bool {
        false
    }
}
