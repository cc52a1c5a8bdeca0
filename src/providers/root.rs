use std::sync::Arc;

use axum::{extract::State, response::Html, routing::get, Json, Router};
use serde::Serialize;

use crate::config::ServerOptions;
use crate::http::Provider;

/// Serves the workbench entry page.
pub struct RootProvider {
    options: Arc<ServerOptions>,
}

#[derive(Serialize)]
pub struct VersionInfo {
    pub server: String,
    pub commit: String,
    pub workbench: &'static str,
}

impl RootProvider {
    pub fn new(options: Arc<ServerOptions>) -> Self {
        Self { options }
    }

    pub fn version_info(&self) -> VersionInfo {
        VersionInfo {
            server: self.options.version().to_string(),
            commit: self.options.commit().to_string(),
            workbench: crate::WORKBENCH_VERSION,
        }
    }
}

impl Provider for RootProvider {
    fn name(&self) -> &'static str {
        "root"
    }

    fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/", get(workbench))
            .route("/version", get(version))
            .with_state(self)
    }
}

async fn workbench(State(root): State<Arc<RootProvider>>) -> Html<String> {
    let info = root.version_info();
    Html(format!(
        "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>dev-server</title></head>\n\
         <body data-version=\"{}\" data-commit=\"{}\" data-workbench=\"{}\">\n\
         <div id=\"workbench\"></div>\n</body>\n</html>\n",
        info.server, info.commit, info.workbench
    ))
}

async fn version(State(root): State<Arc<RootProvider>>) -> Json<VersionInfo> {
    Json(root.version_info())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthMode;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    #[tokio::test]
    async fn page_carries_version() {
        let options = ServerOptions::builder(AuthMode::None)
            .version("1.2.3")
            .commit("abc")
            .build()
            .unwrap();
        let app = Arc::new(RootProvider::new(Arc::new(options))).router();

        let resp = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("data-version=\"1.2.3\""));
        assert!(body.contains("data-commit=\"abc\""));
    }
}
