//! Applications and editor sessions.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::http::Provider;
use crate::providers::unix_now;

#[derive(Debug, Clone, Serialize)]
pub struct Application {
    pub name: &'static str,
    pub path: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub application: String,
    pub created_at: u64,
}

#[derive(Debug, Deserialize)]
pub struct NewSession {
    pub application: String,
}

/// Tracks open sessions. Other providers read it only through its methods.
pub struct ApiProvider {
    applications: Vec<Application>,
    sessions: DashMap<String, Session>,
}

impl ApiProvider {
    pub fn new() -> Self {
        Self {
            applications: vec![Application {
                name: "workbench",
                path: "/",
            }],
            sessions: DashMap::new(),
        }
    }

    pub fn applications(&self) -> &[Application] {
        &self.applications
    }

    pub fn sessions(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self.sessions.iter().map(|s| s.value().clone()).collect();
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        sessions
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Open a session for a known application.
    pub fn create_session(&self, application: &str) -> Option<Session> {
        let app = self.applications.iter().find(|a| a.name == application)?;
        let session = Session {
            id: Uuid::new_v4().to_string(),
            application: app.name.to_string(),
            created_at: unix_now(),
        };
        self.sessions.insert(session.id.clone(), session.clone());
        tracing::debug!(session = %session.id, application, "Session opened");
        Some(session)
    }

    pub fn close_session(&self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }
}

impl Default for ApiProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for ApiProvider {
    fn name(&self) -> &'static str {
        "api"
    }

    fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/applications", get(list_applications))
            .route("/sessions", get(list_sessions).post(create_session))
            .route("/sessions/{id}", delete(close_session))
            .with_state(self)
    }

    fn dispose(&self) {
        let open = self.sessions.len();
        self.sessions.clear();
        tracing::debug!(open, "Sessions cleared");
    }
}

async fn list_applications(State(api): State<Arc<ApiProvider>>) -> Json<Vec<Application>> {
    Json(api.applications().to_vec())
}

async fn list_sessions(State(api): State<Arc<ApiProvider>>) -> Json<Vec<Session>> {
    Json(api.sessions())
}

async fn create_session(
    State(api): State<Arc<ApiProvider>>,
    Json(body): Json<NewSession>,
) -> impl IntoResponse {
    match api.create_session(&body.application) {
        Some(session) => (StatusCode::CREATED, Json(session)).into_response(),
        None => (StatusCode::NOT_FOUND, "Unknown application").into_response(),
    }
}

async fn close_session(State(api): State<Arc<ApiProvider>>, Path(id): Path<String>) -> StatusCode {
    if api.close_session(&id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
