use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::CredentialSink;
use crate::error::{KubeCertError, Result};
use crate::issuer::IssuedCredential;

/// Permission bits of a written kubeconfig.
pub const KUBECONFIG_MODE: u32 = 0o600;

/// The parts of a kubeconfig document this crate edits.
///
/// Everything else (clusters, contexts, preferences, unknown keys) is carried
/// through `rest` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KubeConfig {
    #[serde(default)]
    pub users: Option<Vec<NamedUser>>,
    #[serde(flatten)]
    pub rest: Mapping,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedUser {
    pub name: String,
    #[serde(default)]
    pub user: UserEntry,
    #[serde(flatten)]
    pub rest: Mapping,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserEntry {
    #[serde(
        rename = "client-certificate-data",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub client_certificate_data: Option<String>,
    #[serde(
        rename = "client-key-data",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub client_key_data: Option<String>,
    #[serde(flatten)]
    pub rest: Mapping,
}

impl KubeConfig {
    /// An empty `kind: Config` document.
    pub fn empty() -> Self {
        let mut rest = Mapping::new();
        rest.insert("apiVersion".into(), "v1".into());
        rest.insert("kind".into(), "Config".into());
        rest.insert("clusters".into(), Value::Sequence(Vec::new()));
        rest.insert("contexts".into(), Value::Sequence(Vec::new()));
        Self {
            users: Some(Vec::new()),
            rest,
        }
    }

    /// Parse a kubeconfig document. Blank input yields [`KubeConfig::empty`].
    pub fn parse(source: &str) -> Result<Self> {
        if source.trim().is_empty() {
            return Ok(Self::empty());
        }
        serde_yaml::from_str(source).map_err(|e| KubeCertError::ConfigError(e.to_string()))
    }

    /// Load the kubeconfig at `path`; a missing file yields [`KubeConfig::empty`].
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(source) => Self::parse(&source).map_err(|e| match e {
                KubeCertError::ConfigError(reason) => config_error(path, reason),
                other => other,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "kubeconfig does not exist, starting empty");
                Ok(Self::empty())
            }
            Err(e) => Err(config_error(path, e)),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| KubeCertError::ConfigError(e.to_string()))
    }

    /// Write the document to `path` with owner-only permissions, creating the
    /// parent directory when needed.
    ///
    /// The document is written to a temporary file next to `path` and renamed
    /// over it, so `path` holds either the old or the new document.
    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = self.to_yaml()?;
        let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent).map_err(|e| config_error(parent, e))?;
                parent
            }
            None => Path::new("."),
        };

        let mut staged = NamedTempFile::new_in(parent).map_err(|e| config_error(path, e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            staged
                .as_file()
                .set_permissions(fs::Permissions::from_mode(KUBECONFIG_MODE))
                .map_err(|e| config_error(path, e))?;
        }
        staged
            .write_all(yaml.as_bytes())
            .and_then(|()| staged.as_file().sync_all())
            .map_err(|e| config_error(path, e))?;
        staged.persist(path).map_err(|e| config_error(path, e.error))?;

        debug!(path = %path.display(), "wrote kubeconfig");
        Ok(())
    }

    pub fn user(&self, name: &str) -> Option<&NamedUser> {
        self.users.iter().flatten().find(|user| user.name == name)
    }

    /// Set `users[name]` to embed `credential`, keeping the entry's other fields.
    ///
    /// File references (`client-certificate`, `client-key`) on an existing entry
    /// are dropped.
    pub fn upsert_user(&mut self, name: &str, credential: &IssuedCredential) {
        let users = self.users.get_or_insert_with(Vec::new);
        let index = match users.iter().position(|user| user.name == name) {
            Some(index) => index,
            None => {
                users.push(NamedUser {
                    name: name.to_string(),
                    ..NamedUser::default()
                });
                users.len() - 1
            }
        };

        let entry = &mut users[index].user;
        entry.client_certificate_data =
            Some(general_purpose::STANDARD.encode(credential.certificate_pem.as_bytes()));
        entry.client_key_data =
            Some(general_purpose::STANDARD.encode(credential.private_key_pem.as_bytes()));
        entry.rest.remove("client-certificate");
        entry.rest.remove("client-key");
    }
}

impl UserEntry {
    /// Decoded `client-certificate-data`, if present.
    pub fn client_certificate_pem(&self) -> Result<Option<Vec<u8>>> {
        decode_data(self.client_certificate_data.as_deref())
    }

    /// Decoded `client-key-data`, if present.
    pub fn client_key_pem(&self) -> Result<Option<Vec<u8>>> {
        decode_data(self.client_key_data.as_deref())
    }
}

fn config_error(path: &Path, err: impl std::fmt::Display) -> KubeCertError {
    KubeCertError::ConfigError(format!("{}: {err}", path.display()))
}

fn decode_data(data: Option<&str>) -> Result<Option<Vec<u8>>> {
    data.map(|data| {
        general_purpose::STANDARD
            .decode(data)
            .map_err(|e| KubeCertError::ConfigError(e.to_string()))
    })
    .transpose()
}

/// Merges credentials into a kubeconfig file as `users` entries.
#[derive(Debug, Clone)]
pub struct KubeconfigSink {
    pub path: PathBuf,
}

impl KubeconfigSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialSink for KubeconfigSink {
    fn accept(&mut self, name: &str, credential: &IssuedCredential) -> Result<()> {
        let mut config = KubeConfig::load(&self.path)?;
        let existed = config.user(name).is_some();
        config.upsert_user(name, credential);
        config.save(&self.path)?;

        info!(
            name,
            path = %self.path.display(),
            replaced = existed,
            "merged credential into kubeconfig"
        );
        Ok(())
    }
}
