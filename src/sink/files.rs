use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::CredentialSink;
use crate::error::{KubeCertError, Result};
use crate::issuer::IssuedCredential;

/// Permission bits of the written certificate.
pub const CERTIFICATE_MODE: u32 = 0o755;
/// Permission bits of the written private key.
pub const PRIVATE_KEY_MODE: u32 = 0o600;

/// Writes the certificate and private key to two separate PEM files.
///
/// If the key cannot be written the certificate file is removed again, so a
/// failed run never leaves half a pair on disk.
#[derive(Debug, Clone)]
pub struct FilePairSink {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl FilePairSink {
    pub fn new(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
        }
    }
}

impl CredentialSink for FilePairSink {
    fn accept(&mut self, name: &str, credential: &IssuedCredential) -> Result<()> {
        write_file(
            &self.cert_path,
            credential.certificate_pem.as_bytes(),
            CERTIFICATE_MODE,
        )?;

        if let Err(err) = write_file(
            &self.key_path,
            credential.private_key_pem.as_bytes(),
            PRIVATE_KEY_MODE,
        ) {
            if let Err(cleanup) = fs::remove_file(&self.cert_path) {
                warn!(
                    path = %self.cert_path.display(),
                    error = %cleanup,
                    "failed to remove certificate after key write failure"
                );
            }
            return Err(err);
        }

        info!(
            name,
            cert = %self.cert_path.display(),
            key = %self.key_path.display(),
            "wrote credential files"
        );
        Ok(())
    }
}

/// Write `contents` to `path`, creating or truncating it, and apply `mode`.
fn write_file(path: &Path, contents: &[u8], mode: u32) -> Result<()> {
    let write_error = |e: std::io::Error| KubeCertError::WriteError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }

    let mut file = options.open(path).map_err(write_error)?;
    #[cfg(unix)]
    {
        // `mode` only applies to newly created files.
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(mode))
            .map_err(write_error)?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    file.write_all(contents).map_err(write_error)?;
    file.sync_all().map_err(write_error)
}
