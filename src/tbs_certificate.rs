use der::Encode;
use der::asn1::{BitString, OctetString};
use rsa::RsaPublicKey;
use tracing::debug;
use x509_cert::Version;
use x509_cert::certificate::{CertificateInner, TbsCertificateInner};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;

use crate::cert::{Certificate, signature_algorithm};
use crate::cert::params::{ExtensionParam, Validity};
use crate::error::{KubeCertError, Result};
use crate::key::{KeyPair, public_key_spki};

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
/// This struct contains all the fields required to generate a valid X.509 certificate.
///
/// # Fields
/// * `serial_number` - Big-endian serial number bytes.
/// * `issuer` - The issuer name, copied verbatim from the signing certificate.
/// * `validity` - The validity window.
/// * `subject` - The subject name.
/// * `subject_public_key` - The RSA public key being certified.
/// * `extensions` - X.509 extensions for the certificate.
#[derive(Clone, Debug)]
pub struct TbsCertificate {
    pub serial_number: Vec<u8>,
    pub issuer: Name,
    pub validity: Validity,
    pub subject: Name,
    pub subject_public_key: RsaPublicKey,
    pub extensions: Vec<ExtensionParam>,
}

impl TbsCertificate {
    /// Converts the `TbsCertificate` into a `TbsCertificateInner` for DER encoding.
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner> {
        let extensions = self
            .extensions
            .iter()
            .map(|ext| {
                Ok(x509_cert::ext::Extension {
                    extn_id: ext.oid,
                    critical: ext.critical,
                    extn_value: OctetString::new(ext.value.clone())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number: SerialNumber::new(self.serial_number.as_slice())?,
            signature: signature_algorithm(),
            issuer: self.issuer.clone(),
            validity: self.validity.to_x509_validity()?,
            subject: self.subject.clone(),
            subject_public_key_info: public_key_spki(&self.subject_public_key)?,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: if extensions.is_empty() {
                None
            } else {
                Some(extensions)
            },
        })
    }

    /// Encodes the `TbsCertificate` into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.to_tbs_certificate_inner()?.to_der()?)
    }

    /// Signs the TBS structure with `issuer_key`, producing the final certificate.
    pub fn sign(&self, issuer_key: &KeyPair) -> Result<Certificate> {
        let tbs_certificate = self.to_tbs_certificate_inner()?;
        let tbs_der = tbs_certificate.to_der()?;
        debug!(tbs_len = tbs_der.len(), "signing certificate");

        let signature = issuer_key.sign_data(&tbs_der)?;
        let signature = BitString::from_bytes(&signature)
            .map_err(|e| KubeCertError::SigningError(e.to_string()))?;

        Ok(Certificate {
            inner: CertificateInner {
                tbs_certificate,
                signature_algorithm: signature_algorithm(),
                signature,
            },
        })
    }
}
