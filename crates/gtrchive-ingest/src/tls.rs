//! Client TLS configuration for the store connection.
//!
//! TLS is gated on the CA and certificate paths only: when both are present
//! the key must resolve too, otherwise the whole build fails. When either of
//! the two is missing no TLS configuration is produced and the key path is
//! never looked at.

use crate::config::TlsPaths;
use crate::{Error, Result};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, RootCertStore};
use std::path::Path;
use std::sync::Arc;

/// Build the mutual-TLS client configuration described by `paths`.
///
/// Returns `Ok(None)` unless both the CA and the certificate paths are set.
pub fn build_client_tls(paths: &TlsPaths) -> Result<Option<ClientConfig>> {
    let (Some(ca_path), Some(cert_path)) = (paths.ca.as_deref(), paths.cert.as_deref()) else {
        tracing::debug!("TLS material absent, using default transport");
        return Ok(None);
    };

    let roots = load_roots(ca_path)?;
    let chain = load_chain(cert_path)?;

    let key_path = paths
        .key
        .as_deref()
        .ok_or_else(|| Error::Tls("client key path is not set".to_string()))?;
    let key = PrivateKeyDer::from_pem_file(key_path).map_err(|source| Error::TlsMaterial {
        what: "client key",
        path: key_path.to_path_buf(),
        source,
    })?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_client_auth_cert(chain, key)?;

    tracing::info!(
        ca = %ca_path.display(),
        cert = %cert_path.display(),
        key = %key_path.display(),
        "Mutual TLS configured for store connection"
    );

    Ok(Some(config))
}

/// Read a PEM bundle into a root store. At least one certificate must parse.
fn load_roots(path: &Path) -> Result<RootCertStore> {
    let certs = read_certificates(path, "CA certificate")?;

    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(certs);
    if added == 0 {
        return Err(Error::Tls(format!(
            "no usable CA certificate in {} ({} rejected)",
            path.display(),
            ignored
        )));
    }
    if ignored > 0 {
        tracing::warn!(
            "Ignored {} unparsable certificates in CA bundle {}",
            ignored,
            path.display()
        );
    }

    Ok(roots)
}

fn load_chain(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    read_certificates(path, "client certificate")
}

fn read_certificates(path: &Path, what: &'static str) -> Result<Vec<CertificateDer<'static>>> {
    let to_err = |source| Error::TlsMaterial {
        what,
        path: path.to_path_buf(),
        source,
    };

    let certs = CertificateDer::pem_file_iter(path)
        .map_err(to_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(to_err)?;

    if certs.is_empty() {
        return Err(Error::Tls(format!(
            "{} file {} contains no PEM certificates",
            what,
            path.display()
        )));
    }

    Ok(certs)
}
