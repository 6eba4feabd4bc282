//! Defaults and path resolution for the command line boundary.

use std::path::{Path, PathBuf};

use time::{Duration, OffsetDateTime};

use crate::error::{KubeCertError, Result};

/// Default location of the CA certificate (minikube layout).
pub const DEFAULT_CA_CERT_PATH: &str = "~/.minikube/ca.crt";
/// Default location of the CA private key (minikube layout).
pub const DEFAULT_CA_KEY_PATH: &str = "~/.minikube/ca.key";
/// Default output path of the issued certificate.
pub const DEFAULT_CERT_OUT: &str = "./cert.pem";
/// Default output path of the issued private key.
pub const DEFAULT_KEY_OUT: &str = "./key.pem";
/// Default validity of an issued certificate, in days.
pub const DEFAULT_VALIDITY_DAYS: i64 = 3650;
/// Kubeconfig location relative to the home directory.
pub const DEFAULT_KUBECONFIG: &str = ".kube/config";
/// Environment variable holding the kubeconfig search path.
pub const KUBECONFIG_ENV: &str = "KUBECONFIG";

/// Replace a leading `~` in `path` with `home`.
pub fn expand_home(path: &str, home: &Path) -> PathBuf {
    match path.strip_prefix('~') {
        Some(rest) => home.join(rest.trim_start_matches('/')),
        None => PathBuf::from(path),
    }
}

const SECONDS_PER_DAY: i64 = 86_400;

/// End of a validity window of `days` days starting at `now`.
///
/// Fails with [`KubeCertError::InvalidInput`] when `days` is not positive or the
/// end falls outside the representable date range.
pub fn validity_end(now: OffsetDateTime, days: i64) -> Result<OffsetDateTime> {
    if days <= 0 {
        return Err(KubeCertError::InvalidInput(format!(
            "validity must be a positive number of days, got {days}"
        )));
    }
    days
        .checked_mul(SECONDS_PER_DAY)
        .and_then(|seconds| now.checked_add(Duration::seconds(seconds)))
        .ok_or_else(|| {
            KubeCertError::InvalidInput(format!("validity of {days} days is out of range"))
        })
}

/// Resolve the kubeconfig file to merge into.
///
/// `search` is a colon-separated list in the form of `$KUBECONFIG`; its first
/// non-empty entry wins, with the first `~` and the first `$HOME` each replaced by
/// `home`. Without an entry the result is `home/.kube/config`.
pub fn resolve_kubeconfig_path(home: &Path, search: &str) -> PathBuf {
    let home_str = home.to_string_lossy();

    search
        .split(':')
        .find(|entry| !entry.is_empty())
        .map(|entry| {
            let resolved = entry.replacen('~', &home_str, 1);
            PathBuf::from(resolved.replacen("$HOME", &home_str, 1))
        })
        .unwrap_or_else(|| home.join(DEFAULT_KUBECONFIG))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_kubeconfig_path_default() {
        let home = Path::new("/home/test");
        assert_eq!(
            resolve_kubeconfig_path(home, ""),
            PathBuf::from("/home/test/.kube/config")
        );
    }

    #[test]
    fn test_resolve_kubeconfig_path_tilde() {
        let home = Path::new("/home/test");
        assert_eq!(
            resolve_kubeconfig_path(home, "~/kube-config"),
            PathBuf::from("/home/test/kube-config")
        );
    }

    #[test]
    fn test_resolve_kubeconfig_path_home_var() {
        let home = Path::new("/home/test");
        assert_eq!(
            resolve_kubeconfig_path(home, "$HOME/dir/.kube/config"),
            PathBuf::from("/home/test/dir/.kube/config")
        );
    }

    #[test]
    fn test_resolve_kubeconfig_path_first_non_empty_entry_wins() {
        let home = Path::new("/home/test");
        assert_eq!(
            resolve_kubeconfig_path(home, "::/etc/kube/admin.conf:~/other"),
            PathBuf::from("/etc/kube/admin.conf")
        );
        assert_eq!(
            resolve_kubeconfig_path(home, ":::"),
            PathBuf::from("/home/test/.kube/config")
        );
    }

    #[test]
    fn test_validity_end() {
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        assert_eq!(validity_end(now, 30).unwrap(), now + Duration::days(30));
        assert_eq!(
            validity_end(now, DEFAULT_VALIDITY_DAYS).unwrap(),
            now + Duration::days(3650)
        );
    }

    #[test]
    fn test_validity_end_rejects_non_positive_days() {
        let now = OffsetDateTime::now_utc();
        assert!(matches!(
            validity_end(now, 0),
            Err(KubeCertError::InvalidInput(_))
        ));
        assert!(matches!(
            validity_end(now, -5),
            Err(KubeCertError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validity_end_rejects_out_of_range_days() {
        let now = OffsetDateTime::now_utc();
        for days in [10_000_000, i64::MAX / SECONDS_PER_DAY, i64::MAX] {
            assert!(matches!(
                validity_end(now, days),
                Err(KubeCertError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_expand_home() {
        let home = Path::new("/home/test");
        assert_eq!(
            expand_home(DEFAULT_CA_CERT_PATH, home),
            PathBuf::from("/home/test/.minikube/ca.crt")
        );
        assert_eq!(expand_home("~", home), PathBuf::from("/home/test"));
        assert_eq!(
            expand_home("/etc/kubernetes/pki/ca.key", home),
            PathBuf::from("/etc/kubernetes/pki/ca.key")
        );
    }
}
