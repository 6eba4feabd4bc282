//! kubecert CLI.
//!
//! Issues a Kubernetes client certificate signed by a local CA and writes it
//! either as a certificate/key file pair or into a kubeconfig `users` entry.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use kubecert::ca::CertificateAuthority;
use kubecert::cert::params::{DEFAULT_KEY_BITS, IssuanceRequest, SerialNumberPolicy};
use kubecert::config::{
    DEFAULT_CA_CERT_PATH, DEFAULT_CA_KEY_PATH, DEFAULT_CERT_OUT, DEFAULT_KEY_OUT,
    DEFAULT_VALIDITY_DAYS, KUBECONFIG_ENV, expand_home, resolve_kubeconfig_path, validity_end,
};
use kubecert::issuer::Issuer;
use kubecert::sink::{CredentialSink, FilePairSink, KubeconfigSink};
use time::OffsetDateTime;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "kubecert")]
#[command(about = "Issue Kubernetes client certificates from a local CA", long_about = None)]
struct Args {
    /// Common name of the certificate (the Kubernetes user name)
    #[arg(long)]
    cn: String,

    /// Comma-separated organizations (the Kubernetes groups)
    #[arg(short = 'o', long = "org")]
    org: String,

    /// CA certificate file
    #[arg(long, default_value = DEFAULT_CA_CERT_PATH)]
    ca_cert: String,

    /// CA private key file
    #[arg(long, default_value = DEFAULT_CA_KEY_PATH)]
    ca_key: String,

    /// Validity of the certificate in days
    #[arg(long, default_value_t = DEFAULT_VALIDITY_DAYS)]
    days: i64,

    /// Size of the generated RSA key
    #[arg(long, default_value_t = DEFAULT_KEY_BITS)]
    key_bits: usize,

    /// Use a random 128-bit serial number instead of the issuance timestamp
    #[arg(long)]
    random_serial: bool,

    /// Output file for the certificate
    #[arg(long, default_value = DEFAULT_CERT_OUT, conflicts_with = "kubeconfig_merge")]
    cert: PathBuf,

    /// Output file for the private key
    #[arg(long, default_value = DEFAULT_KEY_OUT, conflicts_with = "kubeconfig_merge")]
    key: PathBuf,

    /// Merge the credential into a kubeconfig file instead of writing files
    #[arg(long)]
    kubeconfig_merge: bool,

    /// Kubeconfig file to merge into (default: first $KUBECONFIG entry or ~/.kube/config)
    #[arg(long, requires = "kubeconfig_merge")]
    kubeconfig: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    run(args)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: Args) -> Result<()> {
    let home = dirs::home_dir().context("cannot determine the home directory")?;

    let not_after = validity_end(OffsetDateTime::now_utc(), args.days).context("invalid --days")?;

    let ca_cert_path = expand_home(&args.ca_cert, &home);
    let ca_key_path = expand_home(&args.ca_key, &home);
    let ca = CertificateAuthority::open(&ca_cert_path, &ca_key_path).with_context(|| {
        format!(
            "failed to load CA from {} and {}",
            ca_cert_path.display(),
            ca_key_path.display()
        )
    })?;

    let request = IssuanceRequest::builder()
        .common_name(args.cn.clone())
        .organizations(IssuanceRequest::split_organizations(&args.org))
        .not_after(not_after)
        .key_bits(args.key_bits)
        .serial_policy(if args.random_serial {
            SerialNumberPolicy::Random
        } else {
            SerialNumberPolicy::Timestamp
        })
        .build();

    let credential = ca
        .issue(request)
        .with_context(|| format!("failed to issue certificate for {}", args.cn))?;

    let mut sink: Box<dyn CredentialSink> = if args.kubeconfig_merge {
        let path = args
            .kubeconfig
            .unwrap_or_else(|| default_kubeconfig(&home));
        info!(path = %path.display(), "merging into kubeconfig");
        Box::new(KubeconfigSink::new(path))
    } else {
        Box::new(FilePairSink::new(args.cert, args.key))
    };
    sink.accept(&args.cn, &credential)
        .context("failed to store the issued credential")?;

    Ok(())
}

fn default_kubeconfig(home: &Path) -> PathBuf {
    let search = std::env::var(KUBECONFIG_ENV).unwrap_or_default();
    resolve_kubeconfig_path(home, &search)
}
