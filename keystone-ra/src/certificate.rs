/// Certificate requests, verified CSRs and issued certificates
use crate::encoding::{base64url, sha256_b64};
use crate::error::{RaError, Result};
use rcgen::{CertificateSigningRequestParams, DnType, DnValue, SanType};
use rustls_pki_types::CertificateSigningRequestDer;
use serde::{Deserialize, Serialize};
use url::Url;

/// Client request for a certificate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRequest {
    /// PKCS#10 request, DER encoded
    #[serde(with = "base64url")]
    pub csr: Vec<u8>,

    /// Authorizations the client claims cover the requested names
    #[serde(default)]
    pub authorizations: Vec<Url>,
}

impl CertificateRequest {
    pub fn new(csr: impl Into<Vec<u8>>, authorizations: Vec<Url>) -> Self {
        Self {
            csr: csr.into(),
            authorizations,
        }
    }
}

/// CSR whose self-signature has been checked
///
/// Only a [`CsrVerifier`] produces these, so holding one means the names
/// it carries were signed by the requester's key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedCsr {
    #[serde(with = "base64url")]
    pub der: Vec<u8>,

    /// Subject common name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,

    /// subjectAltName DNS entries
    pub dns_names: Vec<String>,
}

impl VerifiedCsr {
    /// Every name the request claims: SANs first, then the CN
    pub fn names(&self) -> Vec<&str> {
        self.dns_names
            .iter()
            .map(String::as_str)
            .chain(self.common_name.as_deref())
            .collect()
    }

    /// base64url SHA-256 of the request DER
    pub fn digest(&self) -> String {
        sha256_b64(&self.der)
    }
}

/// Signed certificate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    /// CA-assigned identifier (usually the serial)
    pub id: String,

    /// Certificate DER
    #[serde(with = "base64url")]
    pub der: Vec<u8>,

    /// Digest of the request this certificate was issued for
    pub csr_digest: String,
}

/// Checks a CSR's structure and self-signature
pub trait CsrVerifier: Send + Sync {
    fn verify(&self, der: &[u8]) -> Result<VerifiedCsr>;
}

/// PKCS#10 verifier backed by rcgen's x509 parser
#[derive(Debug, Clone, Copy, Default)]
pub struct X509CsrVerifier;

impl X509CsrVerifier {
    pub fn new() -> Self {
        Self
    }
}

impl CsrVerifier for X509CsrVerifier {
    fn verify(&self, der: &[u8]) -> Result<VerifiedCsr> {
        // Parsing checks the signature against the embedded public key.
        let csr = CertificateSigningRequestDer::from(der);
        let params = CertificateSigningRequestParams::from_der(&csr)
            .map_err(|e| RaError::MalformedRequest(format!("CSR rejected: {}", e)))?;

        let dns_names = params
            .params
            .subject_alt_names
            .iter()
            .filter_map(|san| match san {
                SanType::DnsName(name) => Some(name.as_str().to_string()),
                _ => None,
            })
            .collect();

        let common_name = params
            .params
            .distinguished_name
            .get(&DnType::CommonName)
            .map(dn_text)
            .transpose()?;

        Ok(VerifiedCsr {
            der: der.to_vec(),
            common_name,
            dns_names,
        })
    }
}

/// Text of a subject attribute, whatever its ASN.1 string type.
///
/// A value that cannot be decoded is an error rather than absent, so every
/// name the CA would see is also checked against the authorizations.
fn dn_text(value: &DnValue) -> Result<String> {
    let undecodable = || RaError::MalformedRequest("CSR subject is not decodable".to_string());
    match value {
        DnValue::Utf8String(s) => Ok(s.clone()),
        DnValue::PrintableString(s) => Ok(s.as_str().to_string()),
        DnValue::Ia5String(s) => Ok(s.as_str().to_string()),
        DnValue::TeletexString(s) => Ok(s.as_str().to_string()),
        DnValue::BmpString(s) => {
            let units = s
                .as_bytes()
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
            char::decode_utf16(units)
                .collect::<std::result::Result<String, _>>()
                .map_err(|_| undecodable())
        }
        DnValue::UniversalString(s) => s
            .as_bytes()
            .chunks_exact(4)
            .map(|quad| char::from_u32(u32::from_be_bytes([quad[0], quad[1], quad[2], quad[3]])))
            .collect::<Option<String>>()
            .ok_or_else(undecodable),
        _ => Err(undecodable()),
    }
}
