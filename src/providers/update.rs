//! Update checks against a release endpoint.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::http::Provider;
use crate::providers::unix_now;

/// Where the latest release is looked up.
pub const DEFAULT_UPDATE_URL: &str = "https://api.github.com/repos/dev-server/dev-server/releases/latest";

const CHECK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct UpdateStatus {
    pub enabled: bool,
    pub current: String,
    pub latest: Option<String>,
    pub update_available: bool,
    pub checked_at: Option<u64>,
    pub error: Option<String>,
}

#[derive(Deserialize)]
struct Release {
    tag_name: String,
}

pub struct UpdateProvider {
    enabled: bool,
    url: String,
    client: reqwest::Client,
    status: ArcSwap<UpdateStatus>,
}

impl UpdateProvider {
    pub fn new(enabled: bool, current: impl Into<String>, url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("dev-server/", env!("CARGO_PKG_VERSION")))
            .timeout(CHECK_TIMEOUT)
            .build()
            .unwrap_or_default();
        let status = UpdateStatus {
            enabled,
            current: current.into(),
            ..Default::default()
        };
        Self {
            enabled,
            url: url.into(),
            client,
            status: ArcSwap::from_pointee(status),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn status(&self) -> Arc<UpdateStatus> {
        self.status.load_full()
    }

    /// Query the release endpoint and record the outcome.
    ///
    /// A failed check is stored in the status, not returned.
    pub async fn check(&self) -> Arc<UpdateStatus> {
        if !self.enabled {
            return self.status();
        }

        let mut next = (*self.status()).clone();
        next.checked_at = Some(unix_now());
        match self.fetch_latest().await {
            Ok(latest) => {
                match is_newer(&latest, &next.current) {
                    Ok(available) => {
                        next.update_available = available;
                        next.error = None;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, tag = %latest, "Unparseable release version");
                        next.update_available = false;
                        next.error = Some(format!("invalid release version '{}': {}", latest, e));
                    }
                }
                next.latest = Some(latest);
                tracing::debug!(latest = ?next.latest, available = next.update_available, "Update check finished");
            }
            Err(e) => {
                tracing::warn!(error = %e, url = %self.url, "Update check failed");
                next.error = Some(e.to_string());
            }
        }

        let next = Arc::new(next);
        self.status.store(next.clone());
        next
    }

    async fn fetch_latest(&self) -> Result<String, reqwest::Error> {
        let release: Release = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(release.tag_name.trim_start_matches('v').to_string())
    }
}

impl Provider for UpdateProvider {
    fn name(&self) -> &'static str {
        "update"
    }

    fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/", get(current_status))
            .route("/check", get(run_check))
            .with_state(self)
    }
}

async fn current_status(State(update): State<Arc<UpdateProvider>>) -> Json<UpdateStatus> {
    Json((*update.status()).clone())
}

async fn run_check(
    State(update): State<Arc<UpdateProvider>>,
) -> Result<Json<UpdateStatus>, (StatusCode, &'static str)> {
    if !update.enabled() {
        return Err((StatusCode::CONFLICT, "Updates are disabled"));
    }
    Ok(Json((*update.check().await).clone()))
}

/// True when `latest` is a higher semantic version than `current`.
///
/// Pre-releases order below their release. A leading `v` is ignored.
pub fn is_newer(latest: &str, current: &str) -> Result<bool, semver::Error> {
    Ok(parse_version(latest)? > parse_version(current)?)
}

fn parse_version(v: &str) -> Result<Version, semver::Error> {
    Version::parse(v.trim().trim_start_matches('v'))
}
