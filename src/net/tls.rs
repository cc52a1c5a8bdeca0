//! TLS configuration and certificate loading.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("certificate file not found: {0}")]
    CertNotFound(PathBuf),

    #[error("private key file not found: {0}")]
    KeyNotFound(PathBuf),

    #[error("no certificates in {0}")]
    EmptyCertificate(PathBuf),

    #[error("no private key in {0}")]
    EmptyKey(PathBuf),

    #[error("failed to load TLS material: {0}")]
    Io(#[from] std::io::Error),
}

/// Load TLS configuration from certificate and key files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, TlsError> {
    check_pem_files(cert_path, key_path)?;
    Ok(RustlsConfig::from_pem_file(cert_path, key_path).await?)
}

/// Make sure both files exist and contain what they claim.
pub fn check_pem_files(cert_path: &Path, key_path: &Path) -> Result<(), TlsError> {
    if !cert_path.exists() {
        return Err(TlsError::CertNotFound(cert_path.to_path_buf()));
    }
    if !key_path.exists() {
        return Err(TlsError::KeyNotFound(key_path.to_path_buf()));
    }

    let mut reader = BufReader::new(File::open(cert_path)?);
    let certs = rustls_pemfile::certs(&mut reader).collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(TlsError::EmptyCertificate(cert_path.to_path_buf()));
    }

    let mut reader = BufReader::new(File::open(key_path)?);
    if rustls_pemfile::private_key(&mut reader)?.is_none() {
        return Err(TlsError::EmptyKey(key_path.to_path_buf()));
    }
    Ok(())
}
