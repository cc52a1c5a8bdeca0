//! SSH host key provisioning.

use std::future::Future;
use std::path::{Path, PathBuf};

use crate::credentials::tool::run_tool;
use crate::error::ProvisionError;

/// Produces an SSH host key inside a directory.
pub trait HostKeyGenerator: Send + Sync {
    /// Returns the private key path.
    fn generate(&self, dir: &Path) -> impl Future<Output = Result<PathBuf, ProvisionError>> + Send;
}

/// Generates an RSA host key with the `ssh-keygen` CLI, reusing an existing one.
#[derive(Debug, Clone, Default)]
pub struct SshKeygen;

impl HostKeyGenerator for SshKeygen {
    async fn generate(&self, dir: &Path) -> Result<PathBuf, ProvisionError> {
        let key_dir = dir.join("ssh");
        let key = key_dir.join("host_key");
        if key.exists() {
            tracing::debug!(key = %key.display(), "Reusing SSH host key");
            return Ok(key);
        }

        tokio::fs::create_dir_all(&key_dir).await?;
        let key_arg = key.to_string_lossy();
        run_tool(
            "ssh-keygen",
            &["-t", "rsa", "-b", "4096", "-N", "", "-q", "-f", &key_arg],
        )
        .await?;

        if !key.exists() {
            return Err(ProvisionError::MissingOutput {
                program: "ssh-keygen",
                path: key,
            });
        }
        tracing::info!(key = %key.display(), "Generated SSH host key");
        Ok(key)
    }
}
