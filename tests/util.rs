#![allow(dead_code)]

use kubecert::ca::CertificateAuthority;
use kubecert::cert::extensions::{BasicConstraints, KeyUsage, KeyUsages, SubjectKeyIdentifier};
use kubecert::cert::params::{CLOCK_SKEW, DistinguishedName, ExtensionParam, Validity};
use kubecert::key::KeyPair;
use kubecert::tbs_certificate::TbsCertificate;
use sha1::{Digest, Sha1};
use time::{Duration, OffsetDateTime};

pub const CA_COMMON_NAME: &str = "testCA";

/// A throwaway CA and the PEM text it was loaded from.
pub struct TestCa {
    pub authority: CertificateAuthority,
    pub cert_pem: String,
    pub key_pem: String,
}

pub fn generate_ca() -> TestCa {
    generate_ca_with_ski(true)
}

/// Self-signed RSA CA, valid for a year, with or without a subject key identifier.
pub fn generate_ca_with_ski(with_ski: bool) -> TestCa {
    let ca_key = KeyPair::generate_rsa(2048).unwrap();

    let subject = DistinguishedName::builder()
        .common_name(CA_COMMON_NAME)
        .build()
        .as_x509_name()
        .unwrap();

    let mut extensions = vec![
        ExtensionParam::from_extension(
            BasicConstraints {
                is_ca: true,
                max_path_length: None,
            },
            true,
        )
        .unwrap(),
        ExtensionParam::from_extension(
            KeyUsage(KeyUsages::KeyCertSign | KeyUsages::CRLSign | KeyUsages::DigitalSignature),
            true,
        )
        .unwrap(),
    ];
    if with_ski {
        let spki = ca_key.as_spki().unwrap();
        let ski = Sha1::digest(spki.subject_public_key.raw_bytes()).to_vec();
        extensions.push(ExtensionParam::from_extension(SubjectKeyIdentifier(ski), false).unwrap());
    }

    let not_before = OffsetDateTime::now_utc() - CLOCK_SKEW;
    let tbs = TbsCertificate {
        serial_number: vec![0x01],
        issuer: subject.clone(),
        validity: Validity {
            not_before,
            not_after: not_before + Duration::days(365),
        },
        subject,
        subject_public_key: ca_key.public_key().clone(),
        extensions,
    };

    let cert_pem = tbs.sign(&ca_key).unwrap().to_pem().unwrap();
    let key_pem = ca_key.to_pkcs1_pem().unwrap();
    let authority = CertificateAuthority::from_pem(cert_pem.as_bytes(), key_pem.as_bytes()).unwrap();

    TestCa {
        authority,
        cert_pem,
        key_pem,
    }
}
