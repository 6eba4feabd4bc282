use std::time::Duration as StdDuration;

use bon::Builder;
use const_oid::ObjectIdentifier;
use der::asn1::{GeneralizedTime, SetOfVec, UtcTime};
use der::{Any, DateTime, Tag};
use rand_core::RngCore;
use time::Duration;
use time::OffsetDateTime;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};

use super::extensions::ToAndFromX509Extension;
use crate::error::{KubeCertError, Result};
use crate::key::MIN_RSA_BITS;

/// How far `notBefore` is backdated to tolerate clock skew between hosts.
pub const CLOCK_SKEW: Duration = Duration::hours(1);

/// Key size used when a request does not name one.
pub const DEFAULT_KEY_BITS: usize = MIN_RSA_BITS;

/// Parameters for one certificate to be minted.
///
/// # Fields
/// * `common_name` - The subject common name, used by Kubernetes as the user name.
/// * `organizations` - The subject organizations, used by Kubernetes as group names.
/// * `not_before` - Start of validity; defaults to [`CLOCK_SKEW`] before issuance.
/// * `not_after` - End of validity.
/// * `key_bits` - Size of the generated RSA key.
/// * `serial_policy` - How the serial number is chosen.
///
/// ```
/// use kubecert::cert::params::IssuanceRequest;
/// use time::{Duration, OffsetDateTime};
///
/// let request = IssuanceRequest::builder()
///     .common_name("jane")
///     .organizations(vec!["system:masters".to_string()])
///     .not_after(OffsetDateTime::now_utc() + Duration::days(30))
///     .build();
/// assert!(request.validate().is_ok());
/// ```
#[derive(Clone, Debug, Builder)]
pub struct IssuanceRequest {
    #[builder(into)]
    pub common_name: String,
    pub organizations: Vec<String>,
    pub not_before: Option<OffsetDateTime>,
    pub not_after: OffsetDateTime,
    #[builder(default = DEFAULT_KEY_BITS)]
    pub key_bits: usize,
    #[builder(default)]
    pub serial_policy: SerialNumberPolicy,
}

impl IssuanceRequest {
    /// Split a comma-joined organization list as it arrives from flags or config.
    ///
    /// Entries are trimmed and empty entries dropped.
    pub fn split_organizations(joined: &str) -> Vec<String> {
        joined
            .split(',')
            .map(str::trim)
            .filter(|org| !org.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Check the request invariants for issuance at the current time.
    pub fn validate(&self) -> Result<()> {
        self.validate_at(OffsetDateTime::now_utc())
    }

    /// Check the request invariants for issuance at `now`.
    pub fn validate_at(&self, now: OffsetDateTime) -> Result<()> {
        if self.common_name.trim().is_empty() {
            return Err(KubeCertError::InvalidInput(
                "common name must not be empty".to_string(),
            ));
        }
        if self.organizations.is_empty() {
            return Err(KubeCertError::InvalidInput(
                "at least one organization is required".to_string(),
            ));
        }
        if self.organizations.iter().any(|org| org.trim().is_empty()) {
            return Err(KubeCertError::InvalidInput(
                "organization entries must not be empty".to_string(),
            ));
        }
        let validity = self.validity_at(now);
        if validity.not_after <= validity.not_before {
            return Err(KubeCertError::InvalidInput(format!(
                "not-after ({}) must be later than not-before ({})",
                validity.not_after, validity.not_before
            )));
        }
        if self.key_bits < MIN_RSA_BITS {
            return Err(KubeCertError::InvalidInput(format!(
                "key size {} is below the minimum of {MIN_RSA_BITS} bits",
                self.key_bits
            )));
        }
        Ok(())
    }

    /// The subject name the issued certificate will carry.
    pub fn subject(&self) -> DistinguishedName {
        DistinguishedName {
            common_name: self.common_name.clone(),
            organizations: self.organizations.clone(),
        }
    }

    /// The validity window of a certificate issued at `now`.
    pub fn validity_at(&self, now: OffsetDateTime) -> Validity {
        Validity {
            not_before: self.not_before.unwrap_or(now - CLOCK_SKEW),
            not_after: self.not_after,
        }
    }
}

/// How the serial number of an issued certificate is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SerialNumberPolicy {
    /// Seconds since the Unix epoch at issuance time.
    ///
    /// Two certificates issued by the same CA within one second share a serial.
    #[default]
    Timestamp,
    /// 128 random bits from the OS generator, high bit cleared.
    Random,
}

impl SerialNumberPolicy {
    /// Produce the big-endian serial number bytes.
    pub fn generate(self, now: OffsetDateTime) -> Vec<u8> {
        match self {
            SerialNumberPolicy::Timestamp => {
                let seconds = now.unix_timestamp().max(1) as u64;
                seconds
                    .to_be_bytes()
                    .into_iter()
                    .skip_while(|byte| *byte == 0)
                    .collect()
            }
            SerialNumberPolicy::Random => {
                let mut bytes = [0u8; 16];
                rand_core::OsRng.fill_bytes(&mut bytes);
                bytes[0] = (bytes[0] & 0x7f).max(1);
                bytes.to_vec()
            }
        }
    }
}

/// Distinguished name of a certificate subject or issuer.
///
/// Only the attributes Kubernetes reads are modelled: the common name and the
/// organizations.
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    #[builder(into)]
    pub common_name: String,
    #[builder(default)]
    pub organizations: Vec<String>,
}

impl DistinguishedName {
    /// Converts the distinguished name to an X.509 name.
    ///
    /// Each organization becomes its own RDN, in order, followed by the common name.
    pub fn as_x509_name(&self) -> Result<Name> {
        let organizations = self
            .organizations
            .iter()
            .map(|org| single_attribute_rdn(const_oid::db::rfc4519::O, org));
        let common_name = std::iter::once(single_attribute_rdn(
            const_oid::db::rfc4519::CN,
            &self.common_name,
        ));

        Ok(RdnSequence(
            organizations
                .chain(common_name)
                .collect::<Result<Vec<_>>>()?,
        ))
    }

    /// Reads the common name and organizations out of an X.509 name.
    ///
    /// The first common name wins; every organization value is kept in order.
    pub fn from_x509_name(x509dn: &Name) -> Self {
        let mut common_name = None;
        let mut organizations = Vec::new();

        for rdn in x509dn.0.iter() {
            for attr in rdn.0.iter() {
                let value = String::from_utf8_lossy(attr.value.value()).into_owned();
                if attr.oid == const_oid::db::rfc4519::CN {
                    common_name.get_or_insert(value);
                } else if attr.oid == const_oid::db::rfc4519::O {
                    organizations.push(value);
                }
            }
        }

        DistinguishedName {
            common_name: common_name.unwrap_or_default(),
            organizations,
        }
    }
}

fn single_attribute_rdn(oid: ObjectIdentifier, value: &str) -> Result<RelativeDistinguishedName> {
    let attribute = AttributeTypeAndValue {
        oid,
        value: Any::new(Tag::Utf8String, value.as_bytes())?,
    };
    Ok(RelativeDistinguishedName(SetOfVec::try_from(vec![
        attribute,
    ])?))
}

/// Certificate validity period.
///
/// # Fields
/// * `not_before` - The start of the validity period.
/// * `not_after` - The end of the validity period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Encodes the period with whole-second precision.
    pub fn to_x509_validity(&self) -> Result<x509_cert::time::Validity> {
        Ok(x509_cert::time::Validity {
            not_before: to_x509_time(self.not_before)?,
            not_after: to_x509_time(self.not_after)?,
        })
    }

    pub fn from_x509_validity(validity: &x509_cert::time::Validity) -> Result<Self> {
        Ok(Self {
            not_before: from_x509_time(&validity.not_before)?,
            not_after: from_x509_time(&validity.not_after)?,
        })
    }
}

/// UTCTime up to 2049, GeneralizedTime from 2050 on.
fn to_x509_time(at: OffsetDateTime) -> Result<x509_cert::time::Time> {
    let seconds = u64::try_from(at.unix_timestamp()).map_err(|_| {
        KubeCertError::EncodingError(format!("{at} is before the Unix epoch"))
    })?;
    let date_time = DateTime::from_unix_duration(StdDuration::from_secs(seconds))?;

    if date_time.year() < 2050 {
        Ok(x509_cert::time::Time::UtcTime(UtcTime::from_date_time(
            date_time,
        )?))
    } else {
        Ok(x509_cert::time::Time::GeneralTime(
            GeneralizedTime::from_date_time(date_time),
        ))
    }
}

fn from_x509_time(time: &x509_cert::time::Time) -> Result<OffsetDateTime> {
    let seconds = i64::try_from(time.to_unix_duration().as_secs())
        .map_err(|e| KubeCertError::DecodingError(e.to_string()))?;
    OffsetDateTime::from_unix_timestamp(seconds)
        .map_err(|e| KubeCertError::DecodingError(e.to_string()))
}

/// Represents an X.509 extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    pub fn from_extension<E: ToAndFromX509Extension>(extension: E, critical: bool) -> Result<Self> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    /// Decodes an `ExtensionParam` into a specific extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E> {
        E::from_x509_extension_value(&self.value)
    }
}
