use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::http::Provider;
use crate::providers::api::{ApiProvider, Session};
use crate::providers::update::{UpdateProvider, UpdateStatus};

/// Read-only summary over the api and update providers.
pub struct DashboardProvider {
    api: Arc<ApiProvider>,
    update: Arc<UpdateProvider>,
}

#[derive(Serialize)]
pub struct Summary {
    pub applications: usize,
    pub sessions: Vec<Session>,
    pub update: UpdateStatus,
}

impl DashboardProvider {
    pub fn new(api: Arc<ApiProvider>, update: Arc<UpdateProvider>) -> Self {
        Self { api, update }
    }

    pub fn summary(&self) -> Summary {
        Summary {
            applications: self.api.applications().len(),
            sessions: self.api.sessions(),
            update: (*self.update.status()).clone(),
        }
    }
}

impl Provider for DashboardProvider {
    fn name(&self) -> &'static str {
        "dashboard"
    }

    fn router(self: Arc<Self>) -> Router {
        Router::new().route("/", get(summary)).with_state(self)
    }
}

async fn summary(State(dashboard): State<Arc<DashboardProvider>>) -> Json<Summary> {
    Json(dashboard.summary())
}
