//! Error types shared by every stage of certificate issuance.
//!
//! ```
//! use kubecert::error::{KubeCertError, LoadError};
//!
//! match kubecert::ca::load_certificate(b"not a certificate") {
//!     Err(KubeCertError::CertificateError(LoadError::Format(msg))) => println!("bad PEM: {msg}"),
//!     Err(e) => println!("other error: {e}"),
//!     Ok(_) => unreachable!(),
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, KubeCertError>;

/// Why a piece of CA material could not be loaded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The bytes do not contain a PEM block.
    #[error("invalid PEM format: {0}")]
    Format(String),

    /// The PEM block does not hold the expected DER structure.
    #[error("invalid structure: {0}")]
    Parse(String),

    /// The source could not be read.
    #[error("unreadable source: {0}")]
    Io(String),
}

/// Represents errors that can occur while loading, issuing or persisting credentials.
///
/// Each variant names the stage that failed.
#[derive(Debug, Error, Clone)]
pub enum KubeCertError {
    /// Malformed PEM framing.
    #[error("Invalid PEM data: {0}")]
    FormatError(String),

    /// The CA certificate could not be loaded.
    #[error("Failed to read CA certificate: {0}")]
    CertificateError(LoadError),

    /// The CA private key could not be loaded.
    #[error("Failed to read CA key: {0}")]
    KeyError(LoadError),

    /// Error due to an invalid issuance request.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error during key generation.
    #[error("Failed to generate private key: {0}")]
    KeyGenerationError(String),

    /// Error while signing the leaf certificate.
    #[error("Failed to sign certificate: {0}")]
    SigningError(String),

    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error while inspecting an already encoded structure.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// A certificate did not verify against its claimed issuer.
    #[error("Certificate verification failed: {0}")]
    VerificationError(String),

    /// A credential file could not be written.
    #[error("Failed to write {}: {reason}", path.display())]
    WriteError { path: PathBuf, reason: String },

    /// The kubeconfig document could not be read, parsed or written.
    #[error("Kubeconfig error: {0}")]
    ConfigError(String),
}

impl From<der::Error> for KubeCertError {
    /// Converts a `der::Error` into a `KubeCertError`.
    ///
    /// Every DER operation reached through `?` builds structures from values the
    /// crate already validated, so a failure there is an encoding fault.
    fn from(err: der::Error) -> Self {
        KubeCertError::EncodingError(err.to_string())
    }
}
