//! # kubecert - Kubernetes Client Certificates from a Local CA
//!
//! kubecert mints X.509 client certificates for Kubernetes users, signed by a
//! cluster CA whose certificate and private key are available on disk (for
//! example `~/.minikube/ca.crt` and `~/.minikube/ca.key`). It is built entirely
//! on the RustCrypto libraries.
//!
//! Kubernetes reads the subject common name of a client certificate as the user
//! name and each subject organization as a group.
//!
//! ## Key Features
//!
//! - **RSA only**: leaf keys are fresh RSA keys (2048 bits by default), signed
//!   with SHA-256 / PKCS#1 v1.5.
//! - **PEM in, PEM out**: CA material is read from PEM, issued credentials are
//!   `CERTIFICATE` and `RSA PRIVATE KEY` blocks.
//! - **Two destinations**: a certificate/key file pair, or a `users` entry merged
//!   into a kubeconfig file.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use kubecert::{
//!     ca::CertificateAuthority,
//!     cert::params::IssuanceRequest,
//!     issuer::Issuer,
//!     sink::{CredentialSink, FilePairSink},
//! };
//! use time::{Duration, OffsetDateTime};
//!
//! # fn main() -> kubecert::error::Result<()> {
//! let ca = CertificateAuthority::open(
//!     Path::new("/etc/kubernetes/pki/ca.crt"),
//!     Path::new("/etc/kubernetes/pki/ca.key"),
//! )?;
//!
//! let request = IssuanceRequest::builder()
//!     .common_name("jane")
//!     .organizations(IssuanceRequest::split_organizations("developers,qa"))
//!     .not_after(OffsetDateTime::now_utc() + Duration::days(365))
//!     .build();
//!
//! let credential = ca.issue(request)?;
//! FilePairSink::new("jane.crt", "jane.key").accept("jane", &credential)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`error::Result`]. Loading failures keep the
//! difference between "not PEM at all" and "PEM, but not a usable certificate/key":
//!
//! ```rust
//! use kubecert::error::{KubeCertError, LoadError};
//!
//! match kubecert::ca::load_key(b"garbage") {
//!     Ok(_) => unreachable!(),
//!     Err(KubeCertError::KeyError(LoadError::Format(msg))) => println!("no PEM block: {msg}"),
//!     Err(KubeCertError::KeyError(LoadError::Parse(msg))) => println!("bad key: {msg}"),
//!     Err(e) => println!("other error: {e}"),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`pem_utils`]: PEM block decoding and encoding
//! - [`key`]: RSA key generation, encoding and signing
//! - [`cert`]: Certificate parsing, names, validity and extensions
//! - [`tbs_certificate`]: Low-level certificate assembly and signing
//! - [`ca`]: Loading the CA certificate and key
//! - [`issuer`]: Issuing client certificates
//! - [`sink`]: Persisting issued credentials
//! - [`config`]: Defaults and kubeconfig path resolution
//! - [`error`]: Error types

pub mod ca;
pub mod cert;
pub mod config;
pub mod error;
pub mod issuer;
pub mod key;
pub mod pem_utils;
pub mod sink;
pub mod tbs_certificate;
