//! Extension commands run inside the worker.

pub mod registry;

use std::io::Write;

use crate::cli::Cli;

pub use registry::{ExtensionError, ExtensionRegistry, Manifest};

/// Run every extension flag in `cli` and return the process exit code.
///
/// Installs run first, then uninstalls, then the listing. A failure is
/// reported and the remaining operations still run.
pub fn execute(cli: &Cli) -> i32 {
    let registry = ExtensionRegistry::new(cli.extensions_dir());
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let code = execute_with(&registry, cli, &mut out);
    let _ = out.flush();
    code
}

pub fn execute_with<W: Write>(registry: &ExtensionRegistry, cli: &Cli, out: &mut W) -> i32 {
    let mut code = 0;

    if !cli.install_extension.is_empty() {
        let _ = writeln!(out, "Installing extensions...");
    }
    for source in &cli.install_extension {
        match registry.install(source) {
            Ok(manifest) => {
                let _ = writeln!(
                    out,
                    "Extension '{}' v{} was successfully installed.",
                    manifest.id, manifest.version
                );
            }
            Err(e) => {
                tracing::error!(error = %e, source = %source, "Extension install failed");
                code = 1;
            }
        }
    }

    for id in &cli.uninstall_extension {
        let _ = writeln!(out, "Uninstalling {}...", id);
        match registry.uninstall(id) {
            Ok(()) => {
                let _ = writeln!(out, "Extension '{}' was successfully uninstalled!", id);
            }
            Err(e) => {
                tracing::error!(error = %e, id = %id, "Extension uninstall failed");
                code = 1;
            }
        }
    }

    if cli.list_extensions {
        match registry.list() {
            Ok(installed) => {
                for manifest in installed {
                    let _ = if cli.show_versions {
                        writeln!(out, "{}@{}", manifest.id, manifest.version)
                    } else {
                        writeln!(out, "{}", manifest.id)
                    };
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Listing extensions failed");
                code = 1;
            }
        }
    }

    code
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn list_with_versions() {
        let tmp = tempfile::tempdir().unwrap();
        let ext = tmp.path().join("extensions").join("a.b");
        std::fs::create_dir_all(&ext).unwrap();
        std::fs::write(ext.join(registry::MANIFEST), r#"{"id":"a.b","version":"0.3.1"}"#).unwrap();

        let registry = ExtensionRegistry::new(tmp.path().join("extensions"));
        let cli = Cli::try_parse_from(["dev-server", "--list-extensions", "--show-versions"]).unwrap();
        let mut out = Vec::new();
        assert_eq!(execute_with(&registry, &cli, &mut out), 0);
        assert_eq!(String::from_utf8(out).unwrap(), "a.b@0.3.1\n");
    }

    #[test]
    fn failed_uninstall_sets_exit_code() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = ExtensionRegistry::new(tmp.path());
        let cli = Cli::try_parse_from(["dev-server", "--uninstall-extension", "missing"]).unwrap();
        let mut out = Vec::new();
        assert_eq!(execute_with(&registry, &cli, &mut out), 1);
    }
}
