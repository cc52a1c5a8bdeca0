//! Listener startup, auth and shutdown against real sockets, plus the
//! binary's early exits.

use std::process::Command;

use dev_server::config::AuthMode;
use dev_server::lifecycle::{start_listeners, Shutdown};
use dev_server::net::ListenAddress;
use dev_server::BootstrapError;
use futures_util::FutureExt;

mod common;

fn base_url(address: &ListenAddress) -> String {
    address.url(false).unwrap()
}

#[tokio::test]
async fn ssh_failure_keeps_http_running() {
    let dir = tempfile::tempdir().unwrap();
    let keygen = common::FakeKeygen::failing();
    let listeners = start_listeners(
        common::options(AuthMode::None, None),
        &common::settings(dir.path(), false),
        &keygen,
    )
    .await
    .unwrap();

    assert_eq!(keygen.calls(), 1);
    assert!(listeners.ssh_port.is_none());
    assert!(!listeners.server.prefixes().contains(&"/ssh"));

    let res = common::client()
        .get(base_url(&listeners.http))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    listeners.server.dispose().await;
}

#[tokio::test]
async fn disabled_ssh_never_generates_a_key() {
    let dir = tempfile::tempdir().unwrap();
    let keygen = common::FakeKeygen::default();
    let listeners = start_listeners(
        common::options(AuthMode::None, None),
        &common::settings(dir.path(), true),
        &keygen,
    )
    .await
    .unwrap();

    assert_eq!(keygen.calls(), 0);
    assert!(listeners.ssh_port.is_none());
    assert_eq!(
        listeners.server.prefixes(),
        vec!["/", "/api", "/update", "/login", "/static", "/dashboard"]
    );
    listeners.server.dispose().await;
}

#[tokio::test]
async fn ssh_info_is_served_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let keygen = common::FakeKeygen::default();
    let listeners = start_listeners(
        common::options(AuthMode::None, None),
        &common::settings(dir.path(), false),
        &keygen,
    )
    .await
    .unwrap();

    let port = listeners.ssh_port.unwrap();
    assert_eq!(listeners.server.prefixes().last(), Some(&"/ssh"));

    let info: serde_json::Value = common::client()
        .get(format!("{}/ssh", base_url(&listeners.http)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(info["port"], port);

    listeners.server.dispose().await;
}

#[tokio::test]
async fn password_mode_requires_login() {
    let dir = tempfile::tempdir().unwrap();
    let listeners = start_listeners(
        common::options(AuthMode::Password, Some("hunter2")),
        &common::settings(dir.path(), true),
        &common::FakeKeygen::default(),
    )
    .await
    .unwrap();
    let base = base_url(&listeners.http);
    let client = common::client();

    let res = client.get(format!("{}/dashboard", base)).send().await.unwrap();
    assert_eq!(res.status(), 303);
    assert_eq!(res.headers()["location"], "/login");

    let res = client
        .post(format!("{}/api/sessions", base))
        .json(&serde_json::json!({ "application": "workbench" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    let res = client.get(format!("{}/login", base)).send().await.unwrap();
    assert_eq!(res.status(), 200);

    let res = client
        .post(format!("{}/login", base))
        .form(&[("password", "hunter2")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 303);
    let cookie = res.headers()["set-cookie"].to_str().unwrap();
    let key = cookie.split(';').next().unwrap().to_string();

    let res = client
        .get(format!("{}/dashboard", base))
        .header("cookie", key)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));

    listeners.server.dispose().await;
}

#[tokio::test]
async fn http_bind_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    let options = dev_server::config::ServerOptions::builder(AuthMode::None)
        .host("127.0.0.1")
        .endpoint(dev_server::config::Endpoint::Tcp { port })
        .build()
        .unwrap();
    let result = start_listeners(
        std::sync::Arc::new(options),
        &common::settings(dir.path(), true),
        &common::FakeKeygen::default(),
    )
    .await;

    assert!(matches!(result, Err(BootstrapError::Bind(_))));
}

#[tokio::test]
async fn shutdown_closes_http_once() {
    let dir = tempfile::tempdir().unwrap();
    let listeners = start_listeners(
        common::options(AuthMode::None, None),
        &common::settings(dir.path(), true),
        &common::FakeKeygen::default(),
    )
    .await
    .unwrap();
    let base = base_url(&listeners.http);

    let shutdown = Shutdown::new();
    let server = listeners.server.clone();
    shutdown
        .register_disposal(async move { server.dispose().await }.boxed())
        .unwrap();

    assert!(shutdown.trigger().await);
    assert!(!shutdown.trigger().await);
    assert!(listeners.server.is_disposed());

    let res = common::client().get(base).send().await;
    assert!(res.is_err());
}

#[test]
fn help_exits_zero_without_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(common::bin())
        .arg("--help")
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--auth"));
    assert!(stdout.contains("--install-extension"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn version_json() {
    let output = Command::new(common::bin())
        .args(["--version", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let version: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(version["server"], env!("CARGO_PKG_VERSION"));
    assert!(version["workbench"].is_string());

    let output = Command::new(common::bin()).arg("--version").output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with(env!("CARGO_PKG_VERSION")));
}

#[test]
fn malformed_arguments_exit_two() {
    let output = Command::new(common::bin()).arg("--json").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn certificate_without_key_exits_before_binding() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(common::bin())
        .args(["--cert", "/nonexistent/server.crt", "--port", "0", "--disable-ssh"])
        .arg("--user-data-dir")
        .arg(dir.path())
        .env_remove("DEV_SERVER_CONFIG")
        .env_remove("PORT")
        .env_remove("RUST_LOG")
        .env("PASSWORD", "hunter2")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("without --cert-key"));
    assert!(!stderr.contains("HTTP server listening"));
}

#[test]
fn generated_password_is_logged_once_and_sigterm_exits_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let mut server = common::ServerProcess::spawn(common::server_command(dir.path()));
    server.wait_for("SSH server disabled");
    let (status, output) = server.terminate();

    assert!(status.success(), "exit status {:?}: {:#?}", status, output);
    assert!(output.iter().any(|l| l.contains("HTTP server listening on http://")));
    assert!(output.iter().any(|l| l.contains("Shutdown complete")));

    let password_lines: Vec<_> = output.iter().filter(|l| l.contains("Password is")).collect();
    assert_eq!(password_lines.len(), 1, "{:#?}", output);
    let password = password_lines[0]
        .split("Password is ")
        .nth(1)
        .unwrap()
        .trim()
        .to_string();
    assert_eq!(password.len(), 24);
    assert_eq!(output.iter().filter(|l| l.contains(&password)).count(), 1);
    assert_eq!(
        output.iter().filter(|l| l.contains("SSH server disabled")).count(),
        1
    );
}

#[test]
fn supplied_password_never_reaches_the_log() {
    let dir = tempfile::tempdir().unwrap();
    let mut command = common::server_command(dir.path());
    command.env("PASSWORD", "hunter2");
    let mut server = common::ServerProcess::spawn(command);
    server.wait_for("SSH server disabled");
    let (status, output) = server.terminate();

    assert!(status.success(), "exit status {:?}: {:#?}", status, output);
    assert!(output.iter().any(|l| l.contains("Using custom password for authentication")));
    assert!(!output.iter().any(|l| l.contains("Password is")));
    assert!(!output.iter().any(|l| l.contains("hunter2")));
}
