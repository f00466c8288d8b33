/// Challenges, authorizations and the authorization state machine
use crate::account::AccountKey;
use crate::error::{RaError, Result};
use crate::identifier::Identifier;
use crate::token;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Status shared by challenges and authorizations
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    /// Awaiting a validation outcome
    #[default]
    Pending,
    /// Proven
    Valid,
    /// Failed
    Invalid,
}

impl Status {
    /// `Valid` and `Invalid` never transition again
    pub fn is_terminal(self) -> bool {
        !matches!(self, Status::Pending)
    }
}

/// Domain-control proof mechanisms offered to clients
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChallengeType {
    /// Serve the token over HTTP(S) at a client-chosen path
    #[serde(rename = "simpleHttp")]
    SimpleHttp,
    /// Present a crafted certificate via TLS SNI
    #[serde(rename = "dvsni")]
    Dvsni,
}

/// One domain-control challenge
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Challenge {
    /// Challenge type
    #[serde(rename = "type")]
    pub challenge_type: ChallengeType,

    /// Where the client posts its response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<Url>,

    /// Challenge status
    pub status: Status,

    /// When the challenge was validated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validated: Option<DateTime<Utc>>,

    /// simpleHttp: token the client must serve
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// simpleHttp response: path the token is served at
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// dvsni: server random value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r: Option<String>,

    /// dvsni response: client random value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<String>,

    /// dvsni: nonce naming the SNI host
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

fn entropy_error(_: ring::error::Unspecified) -> RaError {
    RaError::Internal("system random number generator failed".to_string())
}

impl Challenge {
    fn empty(challenge_type: ChallengeType) -> Self {
        Self {
            challenge_type,
            uri: None,
            status: Status::Pending,
            validated: None,
            token: None,
            path: None,
            r: None,
            s: None,
            nonce: None,
        }
    }

    /// New pending simpleHttp challenge with a fresh token
    pub fn simple_http() -> Result<Self> {
        let mut challenge = Self::empty(ChallengeType::SimpleHttp);
        challenge.token = Some(token::new_token().map_err(entropy_error)?);
        Ok(challenge)
    }

    /// New pending dvsni challenge with fresh `r` and `nonce`
    pub fn dvsni() -> Result<Self> {
        let mut challenge = Self::empty(ChallengeType::Dvsni);
        challenge.r = Some(token::random_string(32).map_err(entropy_error)?);
        let nonce = token::random_bytes(16).map_err(entropy_error)?;
        challenge.nonce = Some(nonce.iter().map(|b| format!("{:02x}", b)).collect());
        Ok(challenge)
    }

    /// Whether the client has supplied the response this type expects
    pub fn has_response(&self) -> bool {
        match self.challenge_type {
            ChallengeType::SimpleHttp => self.path.is_some(),
            ChallengeType::Dvsni => self.s.is_some(),
        }
    }

    /// Copy the response field this challenge type accepts.
    ///
    /// Empty values are ignored; type, uri and status are never touched.
    pub fn merge_response(mut self, response: &ChallengeResponse) -> Self {
        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());
        match self.challenge_type {
            ChallengeType::SimpleHttp => {
                if let Some(path) = non_empty(&response.path) {
                    self.path = Some(path);
                }
            }
            ChallengeType::Dvsni => {
                if let Some(s) = non_empty(&response.s) {
                    self.s = Some(s);
                }
            }
        }
        self
    }
}

/// Client-supplied challenge response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeResponse {
    /// simpleHttp: path the token is served at
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// dvsni: client random value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<String>,
}

impl ChallengeResponse {
    pub fn simple_http(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            s: None,
        }
    }

    pub fn dvsni(s: impl Into<String>) -> Self {
        Self {
            path: None,
            s: Some(s.into()),
        }
    }
}

/// Request for a new authorization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub identifier: Identifier,
}

impl AuthorizationRequest {
    pub fn new(identifier: Identifier) -> Self {
        Self { identifier }
    }
}

/// Authorization of one account key for one identifier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Authorization {
    /// Server-assigned identifier
    pub id: String,

    /// Authorization identifier
    pub identifier: Identifier,

    /// Key of the account the authorization belongs to
    pub key: AccountKey,

    /// Authorization status
    pub status: Status,

    /// Offered challenges, in offer order
    pub challenges: Vec<Challenge>,

    /// Expiration timestamp, set when the authorization becomes valid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
}

impl Authorization {
    /// Whether this authorization lets `key` request certificates for its
    /// identifier at `now`.
    pub fn is_usable_by(&self, key: &AccountKey, now: DateTime<Utc>) -> bool {
        self.key == *key
            && self.status == Status::Valid
            && self.expires.is_some_and(|expires| expires > now)
            && self.identifier.is_dns()
    }

    /// Terminal state for the current challenge outcomes.
    ///
    /// One valid challenge is sufficient. This assumes only one challenge
    /// per authorization is ever attempted.
    pub fn finalized(mut self, now: DateTime<Utc>, lifetime: Duration) -> Self {
        let any_valid = self.challenges.iter().any(|c| c.status == Status::Valid);
        let expires = now.checked_add_signed(lifetime).filter(|e| *e > now);

        match (any_valid, expires) {
            (true, Some(expires)) => {
                self.status = Status::Valid;
                self.expires = Some(expires);
            }
            _ => {
                self.status = Status::Invalid;
                self.expires = None;
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> AccountKey {
        AccountKey::new("ES256", vec![1; 65])
    }

    fn authorization(statuses: &[Status]) -> Authorization {
        Authorization {
            id: "authz-1".to_string(),
            identifier: Identifier::dns("example.com"),
            key: key(),
            status: Status::Pending,
            challenges: statuses
                .iter()
                .map(|status| {
                    let mut c = Challenge::simple_http().unwrap();
                    c.status = *status;
                    c
                })
                .collect(),
            expires: None,
        }
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&Status::Valid).unwrap(), "\"valid\"");
        assert!(Status::Invalid.is_terminal());
        assert!(!Status::Pending.is_terminal());
    }

    #[test]
    fn test_challenge_type_serialization() {
        assert_eq!(
            serde_json::to_string(&ChallengeType::SimpleHttp).unwrap(),
            "\"simpleHttp\""
        );
        assert_eq!(
            serde_json::to_string(&ChallengeType::Dvsni).unwrap(),
            "\"dvsni\""
        );
    }

    #[test]
    fn test_new_challenges_are_pending_with_fresh_material() {
        let http = Challenge::simple_http().unwrap();
        assert_eq!(http.status, Status::Pending);
        assert!(http.token.is_some());
        assert!(!http.has_response());

        let sni = Challenge::dvsni().unwrap();
        assert_eq!(sni.nonce.as_ref().map(String::len), Some(32));
        assert!(sni.r.is_some());
        assert_ne!(sni.r, Challenge::dvsni().unwrap().r);
    }

    #[test]
    fn test_merge_response_only_expected_field() {
        let http = Challenge::simple_http()
            .unwrap()
            .merge_response(&ChallengeResponse {
                path: Some("/.well-known/acme-challenge/abc".to_string()),
                s: Some("ignored".to_string()),
            });
        assert_eq!(http.path.as_deref(), Some("/.well-known/acme-challenge/abc"));
        assert!(http.s.is_none());
        assert!(http.has_response());

        let sni = Challenge::dvsni()
            .unwrap()
            .merge_response(&ChallengeResponse::simple_http("/ignored"));
        assert!(sni.path.is_none());
        assert!(sni.s.is_none());
    }

    #[test]
    fn test_merge_response_keeps_server_fields() {
        let mut original = Challenge::dvsni().unwrap();
        original.uri = Some(Url::parse("https://ca.example/authz/1?abc").unwrap());
        let merged = original
            .clone()
            .merge_response(&ChallengeResponse::dvsni("client-s"));

        assert_eq!(merged.challenge_type, original.challenge_type);
        assert_eq!(merged.uri, original.uri);
        assert_eq!(merged.status, Status::Pending);
        assert_eq!(merged.s.as_deref(), Some("client-s"));
    }

    #[test]
    fn test_merge_response_ignores_empty_values() {
        let http = Challenge::simple_http()
            .unwrap()
            .merge_response(&ChallengeResponse::simple_http("/first"))
            .merge_response(&ChallengeResponse::simple_http(""));
        assert_eq!(http.path.as_deref(), Some("/first"));
    }

    #[test]
    fn test_finalize_accepts_first_success() {
        let now = Utc::now();
        let authz = authorization(&[Status::Valid, Status::Invalid])
            .finalized(now, Duration::days(365));

        assert_eq!(authz.status, Status::Valid);
        assert_eq!(authz.expires, Some(now + Duration::days(365)));
    }

    #[test]
    fn test_finalize_without_success_is_invalid() {
        let authz = authorization(&[Status::Invalid, Status::Pending])
            .finalized(Utc::now(), Duration::days(365));

        assert_eq!(authz.status, Status::Invalid);
        assert!(authz.expires.is_none());
    }

    #[test]
    fn test_finalize_refuses_non_positive_lifetime() {
        let authz = authorization(&[Status::Valid]).finalized(Utc::now(), Duration::zero());
        assert_eq!(authz.status, Status::Invalid);
    }

    #[test]
    fn test_is_usable_by() {
        let now = Utc::now();
        let valid = authorization(&[Status::Valid]).finalized(now, Duration::days(1));
        assert!(valid.is_usable_by(&key(), now));

        let other_key = AccountKey::new("ES256", vec![2; 65]);
        assert!(!valid.is_usable_by(&other_key, now));
        assert!(!valid.is_usable_by(&key(), now + Duration::days(2)));

        let pending = authorization(&[Status::Pending]);
        assert!(!pending.is_usable_by(&key(), now));

        let mut not_dns = valid.clone();
        not_dns.identifier = Identifier::new("ip", "10.0.0.1");
        assert!(!not_dns.is_usable_by(&key(), now));
    }
}
