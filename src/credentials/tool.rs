//! Runs the external generators (openssl, ssh-keygen).

use std::process::Stdio;

use tokio::process::Command;

use crate::error::ProvisionError;

/// Run `program` to completion, failing on a non-zero exit.
pub(crate) async fn run_tool(program: &'static str, args: &[&str]) -> Result<(), ProvisionError> {
    tracing::debug!(program, ?args, "Running generator");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|source| ProvisionError::Spawn { program, source })?;

    if !output.status.success() {
        return Err(ProvisionError::Failed {
            program,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}
