/// Account keys and registrations
use crate::encoding::{base64url, sha256_b64};
use serde::{Deserialize, Serialize};
use url::Url;

/// Public key identifying an account
///
/// Two keys are equal only if both the algorithm and the encoded public
/// key match.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountKey {
    /// Signature algorithm the key is used with (e.g. "ES256")
    pub algorithm: String,

    /// SubjectPublicKeyInfo DER of the key
    #[serde(rename = "publicKey", with = "base64url")]
    pub public_key: Vec<u8>,
}

impl AccountKey {
    pub fn new(algorithm: impl Into<String>, public_key: impl Into<Vec<u8>>) -> Self {
        Self {
            algorithm: algorithm.into(),
            public_key: public_key.into(),
        }
    }

    /// Stable identifier for the key, safe to log
    pub fn thumbprint(&self) -> String {
        let mut material = Vec::with_capacity(self.algorithm.len() + 1 + self.public_key.len());
        material.extend_from_slice(self.algorithm.as_bytes());
        material.push(0);
        material.extend_from_slice(&self.public_key);
        sha256_b64(&material)
    }
}

impl std::fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountKey")
            .field("algorithm", &self.algorithm)
            .field("thumbprint", &self.thumbprint())
            .finish()
    }
}

/// Account registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Server-assigned identifier
    pub id: String,

    /// Account key
    pub key: AccountKey,

    /// Server-generated recovery token
    #[serde(rename = "recoveryToken")]
    pub recovery_token: String,

    /// Contact URIs (e.g. `mailto:admin@example.com`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contact: Vec<Url>,

    /// Subscriber agreement the account accepted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agreement: Option<String>,
}

impl Registration {
    /// Apply the client-writable fields of `update`.
    ///
    /// Fields absent from the update keep their current value. The id and
    /// recovery token are not reachable from a [`RegistrationUpdate`].
    pub fn merged(mut self, update: &RegistrationUpdate) -> Self {
        if let Some(contact) = &update.contact {
            self.contact = contact.clone();
        }
        if let Some(agreement) = &update.agreement {
            self.agreement = Some(agreement.clone());
        }
        if let Some(key) = &update.key {
            self.key = key.clone();
        }
        self
    }
}

/// Client-supplied registration fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationUpdate {
    /// Replacement contact list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Vec<Url>>,

    /// Agreement being accepted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agreement: Option<String>,

    /// Key rotation: the key that replaces the current one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<AccountKey>,
}

impl RegistrationUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the contact list
    pub fn with_contact(mut self, contact: Vec<Url>) -> Self {
        self.contact = Some(contact);
        self
    }

    /// Accept an agreement
    pub fn with_agreement(mut self, agreement: impl Into<String>) -> Self {
        self.agreement = Some(agreement.into());
        self
    }

    /// Request a key rotation
    pub fn with_key(mut self, key: AccountKey) -> Self {
        self.key = Some(key);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> AccountKey {
        AccountKey::new("ES256", vec![byte; 65])
    }

    fn registration() -> Registration {
        Registration {
            id: "1".to_string(),
            key: key(1),
            recovery_token: "recover-me".to_string(),
            contact: vec![Url::parse("mailto:old@example.com").unwrap()],
            agreement: None,
        }
    }

    #[test]
    fn test_key_equality_and_thumbprint() {
        assert_eq!(key(1), key(1));
        assert_ne!(key(1), key(2));
        assert_ne!(key(1), AccountKey::new("RS256", vec![1; 65]));
        assert_eq!(key(1).thumbprint(), key(1).thumbprint());
        assert_ne!(key(1).thumbprint(), key(2).thumbprint());
    }

    #[test]
    fn test_debug_hides_key_material() {
        let rendered = format!("{:?}", key(7));
        assert!(rendered.contains("thumbprint"));
        assert!(!rendered.contains("public_key"));
    }

    #[test]
    fn test_merge_copies_client_fields() {
        let update = RegistrationUpdate::new()
            .with_contact(vec![Url::parse("mailto:new@example.com").unwrap()])
            .with_agreement("https://ca.example/terms/v1");

        let merged = registration().merged(&update);

        assert_eq!(merged.id, "1");
        assert_eq!(merged.recovery_token, "recover-me");
        assert_eq!(merged.contact[0].as_str(), "mailto:new@example.com");
        assert_eq!(merged.agreement.as_deref(), Some("https://ca.example/terms/v1"));
        assert_eq!(merged.key, key(1));
    }

    #[test]
    fn test_merge_empty_update_is_noop() {
        assert_eq!(
            registration().merged(&RegistrationUpdate::new()),
            registration()
        );
    }

    #[test]
    fn test_merge_rotates_key() {
        let merged = registration().merged(&RegistrationUpdate::new().with_key(key(9)));
        assert_eq!(merged.key, key(9));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let update = RegistrationUpdate::new()
            .with_contact(vec![Url::parse("mailto:new@example.com").unwrap()])
            .with_agreement("v2");

        let once = registration().merged(&update);
        let twice = once.clone().merged(&update);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_update_ignores_server_fields_on_deserialize() {
        let update: RegistrationUpdate = serde_json::from_str(
            r#"{"id":"999","recoveryToken":"stolen","agreement":"v1"}"#,
        )
        .unwrap();
        let merged = registration().merged(&update);
        assert_eq!(merged.id, "1");
        assert_eq!(merged.recovery_token, "recover-me");
        assert_eq!(merged.agreement.as_deref(), Some("v1"));
    }
}
