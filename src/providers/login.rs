use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use serde::Deserialize;

use crate::config::{AuthMode, ServerOptions};
use crate::credentials::verify_password;
use crate::http::auth::COOKIE_NAME;
use crate::http::Provider;

#[derive(Deserialize)]
pub struct LoginForm {
    pub password: String,
}

/// Password form. Sets the auth cookie on success.
pub struct LoginProvider {
    options: Arc<ServerOptions>,
}

impl LoginProvider {
    pub fn new(options: Arc<ServerOptions>) -> Self {
        Self { options }
    }

    /// The cookie to set when `password` matches, `None` otherwise.
    pub fn authenticate(&self, password: &str) -> Option<String> {
        let hash = self.options.hashed_password()?;
        verify_password(password, hash).then(|| {
            let secure = if self.options.tls().is_some() { "; Secure" } else { "" };
            format!("{}={}; Path=/; HttpOnly; SameSite=Lax{}", COOKIE_NAME, hash, secure)
        })
    }
}

impl Provider for LoginProvider {
    fn name(&self) -> &'static str {
        "login"
    }

    fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/", get(form).post(submit))
            .with_state(self)
    }

    fn requires_auth(&self) -> bool {
        false
    }
}

fn page(error: Option<&str>) -> Html<String> {
    let error = error
        .map(|e| format!("<p class=\"error\">{}</p>\n", e))
        .unwrap_or_default();
    Html(format!(
        "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>Login</title></head>\n<body>\n\
         {}<form method=\"post\">\n<input type=\"password\" name=\"password\" autofocus>\n\
         <button type=\"submit\">Log in</button>\n</form>\n</body>\n</html>\n",
        error
    ))
}

async fn form(State(login): State<Arc<LoginProvider>>) -> Response {
    if login.options.auth() == AuthMode::None {
        return Redirect::to("/").into_response();
    }
    page(None).into_response()
}

async fn submit(State(login): State<Arc<LoginProvider>>, Form(input): Form<LoginForm>) -> Response {
    if login.options.auth() == AuthMode::None {
        return Redirect::to("/").into_response();
    }
    match login.authenticate(&input.password) {
        Some(cookie) => {
            tracing::info!("Login succeeded");
            ([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response()
        }
        None => {
            tracing::warn!("Login failed");
            (StatusCode::UNAUTHORIZED, page(Some("Incorrect password"))).into_response()
        }
    }
}
