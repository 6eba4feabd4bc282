pub mod extensions;
pub mod params;

use der::asn1::{Any, AnyRef};
use der::{Decode, Encode};
use extensions::ToAndFromX509Extension;
use params::{DistinguishedName, Validity};
use rsa::RsaPublicKey;
use time::OffsetDateTime;
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;
use x509_cert::spki::AlgorithmIdentifierOwned;

use crate::error::{KubeCertError, Result};
use crate::key::{public_key_from_spki, verify_signature};
use crate::pem_utils;

/// `sha256WithRSAEncryption` with the NULL parameters RFC 4055 requires.
pub fn signature_algorithm() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
        parameters: Some(Any::from(AnyRef::NULL)),
    }
}

/// Represents an X.509 certificate.
///
/// This struct provides methods to encode the certificate into DER or PEM formats
/// and to read back the fields issuance cares about.
#[derive(Debug, Clone)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
}

impl Certificate {
    /// Parses a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> der::Result<Self> {
        Ok(Self {
            inner: CertificateInner::from_der(der)?,
        })
    }

    /// Parses the first PEM block of `pem` as a certificate.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let block = pem_utils::decode(pem)?;
        Self::from_der(&block.contents).map_err(|e| KubeCertError::DecodingError(e.to_string()))
    }

    /// Encodes the certificate into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| KubeCertError::EncodingError(e.to_string()))
    }

    /// Encodes the certificate into a `CERTIFICATE` PEM block.
    pub fn to_pem(&self) -> Result<String> {
        Ok(pem_utils::encode(
            pem_utils::CERTIFICATE_LABEL,
            &self.to_der()?,
        ))
    }

    pub fn subject_name(&self) -> &Name {
        &self.inner.tbs_certificate.subject
    }

    pub fn issuer_name(&self) -> &Name {
        &self.inner.tbs_certificate.issuer
    }

    pub fn subject(&self) -> DistinguishedName {
        DistinguishedName::from_x509_name(self.subject_name())
    }

    pub fn issuer(&self) -> DistinguishedName {
        DistinguishedName::from_x509_name(self.issuer_name())
    }

    /// Big-endian serial number bytes, without a sign-padding zero.
    pub fn serial_number(&self) -> Vec<u8> {
        self.inner
            .tbs_certificate
            .serial_number
            .as_bytes()
            .iter()
            .copied()
            .skip_while(|byte| *byte == 0)
            .collect()
    }

    pub fn validity(&self) -> Result<Validity> {
        Validity::from_x509_validity(&self.inner.tbs_certificate.validity)
    }

    pub fn not_before(&self) -> Result<OffsetDateTime> {
        Ok(self.validity()?.not_before)
    }

    pub fn not_after(&self) -> Result<OffsetDateTime> {
        Ok(self.validity()?.not_after)
    }

    /// The RSA public key the certificate binds to its subject.
    pub fn public_key(&self) -> Result<RsaPublicKey> {
        public_key_from_spki(&self.inner.tbs_certificate.subject_public_key_info)
    }

    /// Finds and decodes the extension `E`, if the certificate carries it.
    pub fn extension<E: ToAndFromX509Extension>(&self) -> Result<Option<E>> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .find(|ext| ext.extn_id == E::OID)
            .map(|ext| E::from_x509_extension_value(ext.extn_value.as_bytes()))
            .transpose()
    }

    /// Checks that this certificate names `issuer` as its issuer and carries a
    /// valid signature from the issuer's key.
    pub fn verify_issued_by(&self, issuer: &Certificate) -> Result<()> {
        if self.issuer_name() != issuer.subject_name() {
            return Err(KubeCertError::VerificationError(format!(
                "issuer `{}` does not match `{}`",
                self.issuer_name(),
                issuer.subject_name()
            )));
        }
        if self.inner.signature_algorithm.oid != const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION
        {
            return Err(KubeCertError::VerificationError(format!(
                "unsupported signature algorithm {}",
                self.inner.signature_algorithm.oid
            )));
        }

        let tbs_der = self.inner.tbs_certificate.to_der()?;
        let signature = self.inner.signature.as_bytes().ok_or_else(|| {
            KubeCertError::VerificationError("signature has unused bits".to_string())
        })?;
        verify_signature(&issuer.public_key()?, &tbs_der, signature)
    }
}
