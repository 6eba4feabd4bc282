use time::OffsetDateTime;
use tracing::{debug, info, instrument};
use x509_cert::name::Name;

use crate::ca::{CaCertificate, CaPrivateKey, CertificateAuthority};
use crate::cert::Certificate;
use crate::cert::extensions::{
    AuthorityKeyIdentifier, ExtendedKeyUsage, ExtendedKeyUsageOption, KeyUsage, KeyUsages,
};
use crate::cert::params::{ExtensionParam, IssuanceRequest};
use crate::error::{KubeCertError, Result};
use crate::key::KeyPair;
use crate::pem_utils;
use crate::tbs_certificate::TbsCertificate;

/// A freshly issued client credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCredential {
    /// The signed leaf certificate as a `CERTIFICATE` PEM block.
    pub certificate_pem: String,
    /// The leaf private key as an `RSA PRIVATE KEY` PEM block.
    pub private_key_pem: String,
}

impl IssuedCredential {
    /// Parses the certificate back out of its PEM block.
    pub fn certificate(&self) -> Result<Certificate> {
        Certificate::from_pem(self.certificate_pem.as_bytes())
    }

    /// Parses the private key back out of its PEM block.
    pub fn private_key(&self) -> Result<KeyPair> {
        let block = pem_utils::decode(self.private_key_pem.as_bytes())?;
        KeyPair::from_pkcs1_der(&block.contents)
            .map_err(|e| KubeCertError::DecodingError(e.to_string()))
    }
}

/// Represents an entity capable of issuing certificates.
///
/// Implementors only supply the issuer identity and signing key; [`Issuer::issue`]
/// builds, signs and encodes the leaf certificate.
pub trait Issuer {
    /// Returns the issuer name, copied into the leaf certificate.
    fn issuer_name(&self) -> &Name;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// Returns the identifier of the signing key.
    fn key_identifier(&self) -> Vec<u8>;

    /// Issues a client certificate for `request`.
    ///
    /// A new RSA key of `request.key_bits` bits is generated for the leaf. The
    /// certificate carries key usage `digitalSignature` and extended key usages
    /// `serverAuth` and `clientAuth`.
    ///
    /// # Errors
    /// * `InvalidInput` if the request breaks its invariants.
    /// * `KeyGenerationError` if the leaf key cannot be generated.
    /// * `SigningError` if the CA key cannot sign.
    /// * `EncodingError` if the certificate or key cannot be serialized.
    #[instrument(skip_all, fields(cn = %request.common_name))]
    fn issue(&self, request: IssuanceRequest) -> Result<IssuedCredential> {
        let now = OffsetDateTime::now_utc();
        request.validate_at(now)?;

        let key = KeyPair::generate_rsa(request.key_bits)?;
        let serial_number = request.serial_policy.generate(now);

        let key_usage = KeyUsage(KeyUsages::DigitalSignature.into());
        let extended_key_usage = ExtendedKeyUsage {
            usage: vec![
                ExtendedKeyUsageOption::ServerAuth,
                ExtendedKeyUsageOption::ClientAuth,
            ],
        };
        let authority_key_id = AuthorityKeyIdentifier {
            key_identifier: self.key_identifier(),
        };

        let extensions = vec![
            ExtensionParam::from_extension(key_usage, true)?,
            ExtensionParam::from_extension(extended_key_usage, false)?,
            ExtensionParam::from_extension(authority_key_id, false)?,
        ];

        let tbs_cert = TbsCertificate {
            serial_number,
            issuer: self.issuer_name().clone(),
            validity: request.validity_at(now),
            subject: request.subject().as_x509_name()?,
            subject_public_key: key.public_key().clone(),
            extensions,
        };
        debug!(
            not_before = %tbs_cert.validity.not_before,
            not_after = %tbs_cert.validity.not_after,
            "built certificate template"
        );

        let certificate = tbs_cert.sign(self.signing_key())?;
        let credential = IssuedCredential {
            certificate_pem: certificate.to_pem()?,
            private_key_pem: key.to_pkcs1_pem()?,
        };

        info!(
            organizations = ?request.organizations,
            not_after = %request.not_after,
            "issued client certificate"
        );
        Ok(credential)
    }
}

impl Issuer for CertificateAuthority {
    fn issuer_name(&self) -> &Name {
        self.cert.subject_name()
    }

    fn signing_key(&self) -> &KeyPair {
        self.key.key_pair()
    }

    fn key_identifier(&self) -> Vec<u8> {
        self.cert.key_identifier()
    }
}

// Lets `issue` work on a borrowed certificate/key pair.
struct BorrowedAuthority<'a> {
    cert: &'a CaCertificate,
    key: &'a CaPrivateKey,
}

impl Issuer for BorrowedAuthority<'_> {
    fn issuer_name(&self) -> &Name {
        self.cert.subject_name()
    }

    fn signing_key(&self) -> &KeyPair {
        self.key.key_pair()
    }

    fn key_identifier(&self) -> Vec<u8> {
        self.cert.key_identifier()
    }
}

/// Issue a client certificate for `request`, signed by `ca` with `ca_key`.
///
/// ```no_run
/// use kubecert::{ca, issuer, cert::params::IssuanceRequest};
/// use std::path::Path;
/// use time::{Duration, OffsetDateTime};
///
/// # fn main() -> kubecert::error::Result<()> {
/// let ca_cert = ca::read_certificate(Path::new("/etc/kubernetes/pki/ca.crt"))?;
/// let ca_key = ca::read_key(Path::new("/etc/kubernetes/pki/ca.key"))?;
/// let request = IssuanceRequest::builder()
///     .common_name("jane")
///     .organizations(vec!["developers".to_string()])
///     .not_after(OffsetDateTime::now_utc() + Duration::days(7))
///     .build();
/// let credential = issuer::issue(request, &ca_cert, &ca_key)?;
/// println!("{}", credential.certificate_pem);
/// # Ok(())
/// # }
/// ```
pub fn issue(
    request: IssuanceRequest,
    ca: &CaCertificate,
    ca_key: &CaPrivateKey,
) -> Result<IssuedCredential> {
    BorrowedAuthority { cert: ca, key: ca_key }.issue(request)
}
