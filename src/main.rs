//! Remote development server.
//!
//! One invocation does exactly one of: print help, print the version, relay
//! extension commands to a worker process, or run the server until a signal.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use futures_util::FutureExt;

use dev_server::config::load_config_file;
use dev_server::credentials::{provision, Environment, OpensslGenerator};
use dev_server::lifecycle::signals::ShutdownSignals;
use dev_server::lifecycle::startup::open_url;
use dev_server::lifecycle::{start_listeners, summary_lines, ListenerSettings, StartupReport};
use dev_server::observability::logging;
use dev_server::ssh::SshKeygen;
use dev_server::worker::{child, WorkerDelegate};
use dev_server::{BootstrapError, Cli, Shutdown};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        print_version(cli.json);
        return ExitCode::SUCCESS;
    }

    logging::init(cli.log.as_deref());

    if let Some(socket) = child::ipc_socket_from_env() {
        return match child::run(&socket).await {
            Ok(code) => exit_code(code),
            Err(e) => {
                tracing::error!(error = %e, "Worker handshake failed");
                ExitCode::FAILURE
            }
        };
    }

    if cli.is_extension_command() {
        return match delegate(&cli).await {
            Ok(code) => exit_code(code),
            Err(e) => {
                tracing::error!(error = %e, "Extension command failed");
                ExitCode::from(e.exit_code())
            }
        };
    }

    match serve(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            ExitCode::from(e.exit_code())
        }
    }
}

fn print_version(json: bool) {
    if json {
        let version = serde_json::json!({
            "server": dev_server::VERSION,
            "workbench": dev_server::WORKBENCH_VERSION,
        });
        println!("{}", version);
    } else {
        println!("{} {}", dev_server::VERSION, dev_server::COMMIT);
    }
}

async fn delegate(cli: &Cli) -> Result<i32, BootstrapError> {
    let worker = WorkerDelegate::for_current_process()?;
    Ok(worker.run(cli).await?)
}

async fn serve(cli: Cli) -> Result<(), BootstrapError> {
    let file = load_config_file(&cli.config_path())?;
    let credentials = provision(&cli, &Environment::from_process(), &file, &OpensslGenerator).await?;

    let options = Arc::new(credentials.options.clone());
    let settings = ListenerSettings::from_cli(&cli, &file);
    let listeners = start_listeners(options.clone(), &settings, &SshKeygen).await?;

    let shutdown = Shutdown::new();
    let server = listeners.server.clone();
    shutdown.register_disposal(async move { server.dispose().await }.boxed())?;
    let signals = ShutdownSignals::install()?;

    let mut report = StartupReport::new(&credentials, &listeners);
    if cli.open {
        match listeners.http.url(options.tls().is_some()) {
            Some(url) => match open_url(&url).await {
                Ok(()) => report = report.opened(url),
                Err(e) => tracing::warn!(error = %e, "Failed to open browser"),
            },
            None => tracing::warn!("--open has no effect on a socket"),
        }
    }
    for line in summary_lines(&report) {
        tracing::info!("{}", line);
    }

    signals.wait(&shutdown).await;
    tracing::info!("Shutdown complete");
    Ok(())
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
