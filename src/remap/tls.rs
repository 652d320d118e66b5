//! TLS context construction from Kubernetes TLS Secrets.

use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use thiserror::Error;

use crate::cluster::secret::{Secret, TLS_CERT_KEY, TLS_KEY_KEY};

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("secret has no usable {0} entry")]
    MissingEntry(&'static str),

    #[error("invalid PEM material: {0}")]
    Pem(#[from] std::io::Error),

    #[error("no certificates in {TLS_CERT_KEY}")]
    NoCertificates,

    #[error("no private key in {TLS_KEY_KEY}")]
    NoPrivateKey,

    #[error("certificate rejected: {0}")]
    Rejected(#[from] rustls::Error),
}

/// Build a server-side TLS context from a Secret carrying `tls.crt` and
/// `tls.key` PEM entries.
pub fn context_from_secret(secret: &Secret) -> Result<Arc<ServerConfig>, TlsError> {
    let cert_pem = secret
        .data_decoded(TLS_CERT_KEY)
        .ok_or(TlsError::MissingEntry(TLS_CERT_KEY))?;
    let key_pem = secret
        .data_decoded(TLS_KEY_KEY)
        .ok_or(TlsError::MissingEntry(TLS_KEY_KEY))?;

    let certs: Vec<CertificateDer<'static>> =
        rustls_pemfile::certs(&mut cert_pem.as_slice()).collect::<Result<_, _>>()?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificates);
    }

    let key: PrivateKeyDer<'static> = rustls_pemfile::private_key(&mut key_pem.as_slice())?
        .ok_or(TlsError::NoPrivateKey)?;

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)?;

    Ok(Arc::new(config))
}
