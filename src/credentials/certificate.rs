//! Self-signed certificate generation.

use std::future::Future;
use std::path::{Path, PathBuf};

use crate::credentials::tool::run_tool;
use crate::error::ProvisionError;

/// Produces a certificate and key pair inside a directory.
pub trait CertificateGenerator: Send + Sync {
    /// Returns `(cert, key)` paths.
    fn generate(
        &self,
        dir: &Path,
    ) -> impl Future<Output = Result<(PathBuf, PathBuf), ProvisionError>> + Send;
}

/// Generates a self-signed `localhost` certificate with the `openssl` CLI.
///
/// An existing pair in the directory is reused.
#[derive(Debug, Clone, Default)]
pub struct OpensslGenerator;

impl CertificateGenerator for OpensslGenerator {
    async fn generate(&self, dir: &Path) -> Result<(PathBuf, PathBuf), ProvisionError> {
        let cert = dir.join("localhost.crt");
        let key = dir.join("localhost.key");

        if cert.exists() && key.exists() {
            tracing::debug!(cert = %cert.display(), "Reusing generated certificate");
            return Ok((cert, key));
        }

        tokio::fs::create_dir_all(dir).await?;

        let (cert_arg, key_arg) = (cert.to_string_lossy(), key.to_string_lossy());
        run_tool(
            "openssl",
            &[
                "req",
                "-x509",
                "-newkey",
                "rsa:2048",
                "-nodes",
                "-days",
                "365",
                "-subj",
                "/CN=localhost",
                "-addext",
                "subjectAltName=DNS:localhost",
                "-keyout",
                &key_arg,
                "-out",
                &cert_arg,
            ],
        )
        .await?;

        for path in [&cert, &key] {
            if !path.exists() {
                return Err(ProvisionError::MissingOutput {
                    program: "openssl",
                    path: path.clone(),
                });
            }
        }

        tracing::info!(cert = %cert.display(), "Generated self-signed certificate");
        Ok((cert, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn existing_pair_is_reused_without_running_openssl() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("localhost.crt"), "cert").unwrap();
        std::fs::write(dir.path().join("localhost.key"), "key").unwrap();

        let (cert, key) = OpensslGenerator.generate(dir.path()).await.unwrap();
        assert_eq!(std::fs::read_to_string(cert).unwrap(), "cert");
        assert_eq!(std::fs::read_to_string(key).unwrap(), "key");
    }
}
