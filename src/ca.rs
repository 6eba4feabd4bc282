//! Loading of the trusted CA certificate and its private key.
//!
//! [`load_certificate`] and [`load_key`] only look at bytes. [`read_certificate`]
//! and [`read_key`] add the file access around them.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use rsa::RsaPublicKey;
use sha1::{Digest, Sha1};
use tracing::debug;
use x509_cert::name::Name;

use crate::cert::Certificate;
use crate::cert::extensions::SubjectKeyIdentifier;
use crate::error::{KubeCertError, LoadError, Result};
use crate::key::KeyPair;
use crate::pem_utils;

/// A parsed, trusted issuing certificate.
#[derive(Debug, Clone)]
pub struct CaCertificate {
    cert: Certificate,
    public_key: RsaPublicKey,
    der: Vec<u8>,
}

impl CaCertificate {
    pub fn certificate(&self) -> &Certificate {
        &self.cert
    }

    pub fn subject_name(&self) -> &Name {
        self.cert.subject_name()
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// The DER bytes the certificate was loaded from.
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// Identifier of the CA key, used as the authority key identifier of issued
    /// certificates.
    ///
    /// Taken from the CA's subject key identifier extension when present, otherwise
    /// the SHA-1 of the subject public key bits (RFC 5280 §4.2.1.2, method 1).
    pub fn key_identifier(&self) -> Vec<u8> {
        if let Ok(Some(SubjectKeyIdentifier(id))) = self.cert.extension::<SubjectKeyIdentifier>() {
            return id;
        }
        let spki = &self.cert.inner.tbs_certificate.subject_public_key_info;
        Sha1::digest(spki.subject_public_key.raw_bytes()).to_vec()
    }
}

/// The private signing key paired with a [`CaCertificate`].
///
/// Nothing checks that the key matches the certificate; a mismatched pair
/// produces certificates that fail verification.
#[derive(Debug, Clone)]
pub struct CaPrivateKey {
    key: KeyPair,
}

impl CaPrivateKey {
    pub fn key_pair(&self) -> &KeyPair {
        &self.key
    }
}

/// Parse a PEM-encoded CA certificate.
///
/// Fails with [`KubeCertError::CertificateError`] carrying [`LoadError::Format`]
/// when the bytes hold no PEM block, or [`LoadError::Parse`] when the block is not
/// an X.509 certificate with an RSA key.
pub fn load_certificate(bytes: &[u8]) -> Result<CaCertificate> {
    let block = pem_utils::decode(bytes)
        .map_err(|e| certificate_error(LoadError::Format(e.to_string())))?;
    debug!(label = %block.label, len = block.contents.len(), "decoded CA certificate PEM");

    let cert = Certificate::from_der(&block.contents)
        .map_err(|e| certificate_error(LoadError::Parse(e.to_string())))?;
    let public_key = cert
        .public_key()
        .map_err(|e| certificate_error(LoadError::Parse(e.to_string())))?;

    Ok(CaCertificate {
        cert,
        public_key,
        der: block.contents,
    })
}

/// Parse a PEM-encoded CA private key.
///
/// `RSA PRIVATE KEY` blocks are read as PKCS#1 and `PRIVATE KEY` blocks as PKCS#8.
/// Fails with [`KubeCertError::KeyError`], split into format and parse causes like
/// [`load_certificate`].
pub fn load_key(bytes: &[u8]) -> Result<CaPrivateKey> {
    let block =
        pem_utils::decode(bytes).map_err(|e| key_error(LoadError::Format(e.to_string())))?;
    debug!(label = %block.label, "decoded CA key PEM");

    let key = match block.label.as_str() {
        pem_utils::PRIVATE_KEY_LABEL => {
            KeyPair::from_pkcs8_der(&block.contents).map_err(|e| e.to_string())
        }
        _ => KeyPair::from_pkcs1_der(&block.contents).map_err(|e| e.to_string()),
    }
    .map_err(|e| key_error(LoadError::Parse(e)))?;

    Ok(CaPrivateKey { key })
}

/// Read and parse the CA certificate at `path`.
pub fn read_certificate(path: &Path) -> Result<CaCertificate> {
    let bytes = read_source(path).map_err(certificate_error)?;
    load_certificate(&bytes)
}

/// Read and parse the CA private key at `path`.
pub fn read_key(path: &Path) -> Result<CaPrivateKey> {
    let bytes = read_source(path).map_err(key_error)?;
    load_key(&bytes)
}

/// The file is closed when `file` drops, on success and failure alike.
fn read_source(path: &Path) -> std::result::Result<Vec<u8>, LoadError> {
    let io_error = |e: std::io::Error| LoadError::Io(format!("{}: {e}", path.display()));

    let mut file = File::open(path).map_err(io_error)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(io_error)?;
    debug!(path = %path.display(), len = bytes.len(), "read CA material");
    Ok(bytes)
}

fn certificate_error(cause: LoadError) -> KubeCertError {
    KubeCertError::CertificateError(cause)
}

fn key_error(cause: LoadError) -> KubeCertError {
    KubeCertError::KeyError(cause)
}

/// A CA certificate together with its signing key.
#[derive(Debug, Clone)]
pub struct CertificateAuthority {
    pub cert: CaCertificate,
    pub key: CaPrivateKey,
}

impl CertificateAuthority {
    /// Load both halves of the CA from PEM files.
    pub fn open(cert_path: &Path, key_path: &Path) -> Result<Self> {
        Ok(Self {
            cert: read_certificate(cert_path)?,
            key: read_key(key_path)?,
        })
    }

    /// Load both halves of the CA from in-memory PEM buffers.
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self> {
        Ok(Self {
            cert: load_certificate(cert_pem)?,
            key: load_key(key_pem)?,
        })
    }
}
