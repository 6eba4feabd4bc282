use crate::error::{KubeCertError, Result};

/// PEM label of an X.509 certificate.
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";
/// PEM label of a PKCS#1 RSA private key.
pub const RSA_PRIVATE_KEY_LABEL: &str = "RSA PRIVATE KEY";
/// PEM label of a PKCS#8 private key.
pub const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";

/// A single decoded PEM block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemBlock {
    pub label: String,
    pub contents: Vec<u8>,
}

/// Decode the first PEM block found in `input`.
///
/// Data around the block is ignored. Fails with [`KubeCertError::FormatError`]
/// when no well-formed block is present.
pub fn decode(input: &[u8]) -> Result<PemBlock> {
    let pem = pem::parse(input).map_err(|e| KubeCertError::FormatError(e.to_string()))?;
    Ok(PemBlock {
        label: pem.tag().to_string(),
        contents: pem.contents().to_vec(),
    })
}

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
pub fn encode(label: &str, der: &[u8]) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(
        &pem,
        pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF),
    )
}
