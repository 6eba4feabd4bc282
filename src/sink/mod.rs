//! Destinations for issued credentials.
//!
//! - [`FilePairSink`] writes the certificate and key as two PEM files.
//! - [`KubeconfigSink`] merges them into a kubeconfig `users` entry.

pub mod files;
pub mod kubeconfig;

pub use files::FilePairSink;
pub use kubeconfig::KubeconfigSink;

use crate::error::Result;
use crate::issuer::IssuedCredential;

/// Accepts one named credential and persists it.
pub trait CredentialSink {
    /// Store `credential` under `name`.
    fn accept(&mut self, name: &str, credential: &IssuedCredential) -> Result<()>;
}
