//! Password cookie check for protected providers.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::config::{AuthMode, ServerOptions};
use crate::credentials::password::constant_time_eq;

/// Name of the cookie carrying the password hash.
pub const COOKIE_NAME: &str = "key";

/// What the middleware needs to know about authentication.
#[derive(Debug, Clone)]
pub struct AuthGate {
    auth: AuthMode,
    hashed_password: Option<String>,
}

impl AuthGate {
    pub fn new(options: &ServerOptions) -> Self {
        Self {
            auth: options.auth(),
            hashed_password: options.hashed_password().map(str::to_string),
        }
    }

    /// True when the request may pass.
    pub fn is_authenticated(&self, headers: &HeaderMap) -> bool {
        match self.auth {
            AuthMode::None => true,
            AuthMode::Password => match (&self.hashed_password, cookie_value(headers, COOKIE_NAME)) {
                (Some(hash), Some(value)) => constant_time_eq(hash.as_bytes(), value.as_bytes()),
                _ => false,
            },
        }
    }
}

/// Redirects browsers to `/login`, rejects everything else with 401.
pub async fn require_auth(
    State(gate): State<Arc<AuthGate>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if gate.is_authenticated(request.headers()) {
        return next.run(request).await;
    }

    tracing::debug!(path = %request.uri().path(), "Unauthenticated request");
    if request.method() == Method::GET {
        Redirect::to("/login").into_response()
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

/// Find a cookie by name in the `Cookie` headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn gate(auth: AuthMode, hash: Option<&str>) -> AuthGate {
        AuthGate {
            auth,
            hashed_password: hash.map(str::to_string),
        }
    }

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn cookie_parsing() {
        let h = headers("theme=dark; key=abc123; other=1");
        assert_eq!(cookie_value(&h, "key"), Some("abc123"));
        assert_eq!(cookie_value(&h, "missing"), None);
    }

    #[test]
    fn password_gate() {
        let g = gate(AuthMode::Password, Some("abc123"));
        assert!(g.is_authenticated(&headers("key=abc123")));
        assert!(!g.is_authenticated(&headers("key=wrong")));
        assert!(!g.is_authenticated(&HeaderMap::new()));
    }

    #[test]
    fn none_gate_allows_everything() {
        assert!(gate(AuthMode::None, None).is_authenticated(&HeaderMap::new()));
    }
}
