//! The registration authority
//!
//! Every change to an authorization's status and every certificate
//! issuance goes through [`RegistrationAuthority`]. Durable state belongs to
//! the [`StorageAuthority`]; the authority itself keeps nothing between
//! calls and is shared behind an `Arc`.

use crate::account::{AccountKey, Registration, RegistrationUpdate};
use crate::certificate::{Certificate, CertificateRequest, CsrVerifier, X509CsrVerifier};
use crate::challenge::{
    Authorization, AuthorizationRequest, Challenge, ChallengeResponse, Status,
};
use crate::config::RaConfig;
use crate::error::{RaError, Result};
use crate::identifier::forbidden_identifier;
use crate::token;
use crate::traits::{CertificateAuthority, StorageAuthority, ValidationAuthority};
use crate::validation::ValidationCallback;
use async_trait::async_trait;
use chrono::Utc;
use keystone_audit::{AuditEvent, AuditLogger, AuditSeverity, AuditStatus};
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

/// Bytes of entropy in a challenge URL suffix
const URL_SUFFIX_BYTES: usize = 4;

/// Registration authority
pub struct RegistrationAuthority {
    storage: Arc<dyn StorageAuthority>,
    validation: Arc<dyn ValidationAuthority>,
    certificates: Arc<dyn CertificateAuthority>,
    csr_verifier: Arc<dyn CsrVerifier>,
    audit: AuditLogger,
    config: RaConfig,
}

impl RegistrationAuthority {
    /// Create a builder
    ///
    /// # Example
    ///
    /// ```no_run
    /// use keystone_ra::*;
    /// use std::sync::Arc;
    /// use url::Url;
    ///
    /// # fn example(
    /// #     va: Arc<dyn ValidationAuthority>,
    /// #     ca: Arc<dyn CertificateAuthority>,
    /// # ) -> Result<()> {
    /// let config = RaConfig::new(Url::parse("https://ca.example/acme/authz/").unwrap());
    /// let ra = RegistrationAuthority::builder()
    ///     .config(config)
    ///     .storage(Arc::new(MemoryStorageAuthority::new()))
    ///     .validation(va)
    ///     .certificates(ca)
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder() -> RegistrationAuthorityBuilder {
        RegistrationAuthorityBuilder::new()
    }

    pub fn config(&self) -> &RaConfig {
        &self.config
    }

    /// Create an account for `key`.
    ///
    /// The registration gets a fresh id and recovery token; the client
    /// fields of `init` are merged on top before it is stored.
    pub async fn new_registration(
        &self,
        init: &RegistrationUpdate,
        key: AccountKey,
    ) -> Result<Registration> {
        let id = self.storage.new_registration().await?;
        let recovery_token = token::new_token().map_err(|_| {
            RaError::Internal("could not generate recovery token".to_string())
        })?;

        let registration = Registration {
            id,
            key,
            recovery_token,
            contact: Vec::new(),
            agreement: None,
        }
        .merged(init);

        self.storage.update_registration(&registration).await?;

        tracing::info!(registration = %registration.id, "Created registration");
        self.audit
            .record(
                AuditEvent::new("registration.created")
                    .account(registration.key.thumbprint())
                    .resource("registration")
                    .resource_id(&registration.id)
                    .action("create")
                    .status(AuditStatus::Success),
            )
            .await;

        Ok(registration)
    }

    /// Merge `update` onto `base` and store the result
    pub async fn update_registration(
        &self,
        base: Registration,
        update: &RegistrationUpdate,
    ) -> Result<Registration> {
        let registration = base.merged(update);
        self.storage.update_registration(&registration).await?;

        tracing::info!(registration = %registration.id, "Updated registration");
        self.audit
            .record(
                AuditEvent::new("registration.updated")
                    .account(registration.key.thumbprint())
                    .resource("registration")
                    .resource_id(&registration.id)
                    .action("update")
                    .status(AuditStatus::Success)
                    .metadata("key_rotated", update.key.is_some()),
            )
            .await;

        Ok(registration)
    }

    /// Open a pending authorization of `key` for the requested identifier.
    ///
    /// The identifier is checked before anything is allocated. The new
    /// authorization offers one simpleHttp and one dvsni challenge.
    pub async fn new_authorization(
        &self,
        request: &AuthorizationRequest,
        key: AccountKey,
    ) -> Result<Authorization> {
        let identifier = &request.identifier;
        if identifier.value.is_empty() {
            return Err(RaError::MalformedRequest(
                "No identifier in authorization request".to_string(),
            ));
        }
        if !identifier.is_dns() {
            return Err(RaError::NotSupported(
                "Only domain validation is supported".to_string(),
            ));
        }
        if forbidden_identifier(&identifier.value) {
            self.audit
                .record(
                    AuditEvent::new("authorization.denied")
                        .account(key.thumbprint())
                        .resource("authorization")
                        .action("create")
                        .status(AuditStatus::Denied)
                        .severity(AuditSeverity::Warning)
                        .metadata("identifier", identifier.value.clone()),
                )
                .await;
            return Err(RaError::Unauthorized(
                "We will not authorize use of this identifier".to_string(),
            ));
        }

        let mut challenges = vec![Challenge::simple_http()?, Challenge::dvsni()?];
        let id = self.storage.new_pending_authorization().await?;

        let mut taken: Vec<String> = Vec::with_capacity(challenges.len());
        for (index, challenge) in challenges.iter_mut().enumerate() {
            let suffix = self.url_suffix(index, &taken);
            challenge.uri = Some(self.challenge_uri(&id, &suffix)?);
            taken.push(suffix);
        }

        let authz = Authorization {
            id,
            identifier: identifier.clone(),
            key,
            status: Status::Pending,
            challenges,
            expires: None,
        };
        self.storage.update_pending_authorization(&authz).await?;

        tracing::info!(
            authorization = %authz.id,
            identifier = %authz.identifier.value,
            "Created pending authorization"
        );
        self.audit
            .record(
                AuditEvent::new("authorization.created")
                    .account(authz.key.thumbprint())
                    .resource("authorization")
                    .resource_id(&authz.id)
                    .action("create")
                    .status(AuditStatus::Success)
                    .metadata("identifier", authz.identifier.value.clone()),
            )
            .await;

        Ok(authz)
    }

    // A random suffix distinct from the ones already handed out. Losing
    // entropy here only makes the URL guessable, so fall back to the index.
    fn url_suffix(&self, index: usize, taken: &[String]) -> String {
        for _ in 0..3 {
            match token::random_string(URL_SUFFIX_BYTES) {
                Ok(suffix) if !taken.contains(&suffix) => return suffix,
                Ok(_) => continue,
                Err(_) => {
                    tracing::warn!("Random source failed; using index for challenge URL suffix");
                    break;
                }
            }
        }
        format!("challenge-{}", index)
    }

    fn challenge_uri(&self, authz_id: &str, suffix: &str) -> Result<Url> {
        let mut uri = self.config.authz_base.join(authz_id).map_err(|e| {
            RaError::Internal(format!("cannot build challenge URL: {}", e))
        })?;
        uri.set_query(Some(suffix));
        Ok(uri)
    }

    /// Issue a certificate for a CSR whose every name is covered by a
    /// usable authorization of `key`.
    ///
    /// Checks run in a fixed order: the CSR signature, then the referenced
    /// authorizations, then the names. Authorizations that cannot be
    /// fetched or are not usable are skipped without saying why.
    pub async fn new_certificate(
        &self,
        request: &CertificateRequest,
        key: &AccountKey,
    ) -> Result<Certificate> {
        let csr = self.csr_verifier.verify(&request.csr).map_err(|e| {
            tracing::debug!(error = %e, "CSR verification failed");
            RaError::Unauthorized("Invalid signature on CSR".to_string())
        })?;

        let now = Utc::now();
        let mut authorized: HashSet<String> = HashSet::new();
        for url in &request.authorizations {
            let Some(id) = authorization_id_from_url(url) else {
                continue;
            };
            match self.storage.get_authorization(id).await {
                Ok(authz) if authz.is_usable_by(key, now) => {
                    authorized.insert(authz.identifier.value.to_ascii_lowercase());
                }
                _ => continue,
            }
        }

        for name in csr.names() {
            if !authorized.contains(&name.to_ascii_lowercase()) {
                self.audit
                    .record(
                        AuditEvent::new("certificate.denied")
                            .account(key.thumbprint())
                            .resource("certificate")
                            .action("issue")
                            .status(AuditStatus::Denied)
                            .severity(AuditSeverity::Warning)
                            .metadata("name", name)
                            .metadata("csr_digest", csr.digest()),
                    )
                    .await;
                return Err(RaError::Unauthorized(format!(
                    "Key not authorized for name {}",
                    name
                )));
            }
        }

        let certificate = self.certificates.issue_certificate(&csr).await?;

        tracing::info!(certificate = %certificate.id, names = ?csr.names(), "Issued certificate");
        self.audit
            .record(
                AuditEvent::new("certificate.issued")
                    .account(key.thumbprint())
                    .resource("certificate")
                    .resource_id(&certificate.id)
                    .action("issue")
                    .status(AuditStatus::Success)
                    .metadata("names", csr.names())
                    .metadata("csr_digest", csr.digest()),
            )
            .await;

        Ok(certificate)
    }

    /// Record the client's response to one challenge and hand the
    /// authorization to the validation authority.
    ///
    /// Returns as soon as validation is scheduled; the authorization is
    /// still pending. The outcome arrives later via
    /// [`ValidationCallback::on_validation_update`].
    pub async fn update_authorization(
        &self,
        base: Authorization,
        challenge_index: usize,
        response: &ChallengeResponse,
    ) -> Result<Authorization> {
        let mut authz = base;
        let Some(challenge) = authz.challenges.get(challenge_index).cloned() else {
            return Err(RaError::MalformedRequest(
                "Invalid challenge index".to_string(),
            ));
        };
        authz.challenges[challenge_index] = challenge.merge_response(response);

        self.storage.update_pending_authorization(&authz).await?;
        self.validation
            .update_validations(&authz, challenge_index)
            .await?;

        tracing::info!(
            authorization = %authz.id,
            challenge = challenge_index,
            "Dispatched challenge for validation"
        );
        self.audit
            .record(
                AuditEvent::new("challenge.response")
                    .account(authz.key.thumbprint())
                    .resource("authorization")
                    .resource_id(&authz.id)
                    .action("respond")
                    .status(AuditStatus::Success)
                    .metadata("challenge", challenge_index),
            )
            .await;

        Ok(authz)
    }

    /// Revocation is not offered yet
    pub async fn revoke_certificate(&self, _certificate: &Certificate) -> Result<()> {
        Err(RaError::NotSupported(
            "Certificate revocation is not supported".to_string(),
        ))
    }
}

#[async_trait]
impl ValidationCallback for RegistrationAuthority {
    /// Move the authorization to its terminal state.
    ///
    /// One valid challenge makes the authorization valid for the configured
    /// lifetime; otherwise it becomes invalid. Nothing is returned: failures
    /// go to the log and the audit trail.
    async fn on_validation_update(&self, authz: Authorization) {
        if authz.status.is_terminal() {
            tracing::warn!(
                authorization = %authz.id,
                status = ?authz.status,
                "Ignoring validation update for a finalized authorization"
            );
            self.audit
                .record(
                    AuditEvent::new("authorization.finalize_ignored")
                        .account(authz.key.thumbprint())
                        .resource("authorization")
                        .resource_id(&authz.id)
                        .action("finalize")
                        .status(AuditStatus::Failure)
                        .severity(AuditSeverity::Warning),
                )
                .await;
            return;
        }

        let authz = authz.finalized(Utc::now(), self.config.authorization_lifetime());

        match self.storage.finalize_authorization(&authz).await {
            Ok(()) => {
                tracing::info!(
                    authorization = %authz.id,
                    status = ?authz.status,
                    "Finalized authorization"
                );
                let mut event = AuditEvent::new("authorization.finalized")
                    .account(authz.key.thumbprint())
                    .resource("authorization")
                    .resource_id(&authz.id)
                    .action("finalize")
                    .status(AuditStatus::Success)
                    .metadata("status", serde_json::json!(authz.status));
                if let Some(expires) = authz.expires {
                    event = event.metadata("expires", expires.to_rfc3339());
                }
                self.audit.record(event).await;
            }
            Err(e) => {
                tracing::error!(
                    authorization = %authz.id,
                    error = %e,
                    "Failed to finalize authorization"
                );
                self.audit
                    .record(
                        AuditEvent::new("authorization.finalize_failed")
                            .account(authz.key.thumbprint())
                            .resource("authorization")
                            .resource_id(&authz.id)
                            .action("finalize")
                            .status(AuditStatus::Error)
                            .severity(AuditSeverity::Critical)
                            .error(e.to_string()),
                    )
                    .await;
            }
        }
    }
}

/// The authorization id an authorization URL refers to: its last path
/// segment.
pub fn authorization_id_from_url(url: &Url) -> Option<&str> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
}

/// Builder for [`RegistrationAuthority`]
#[derive(Default)]
pub struct RegistrationAuthorityBuilder {
    storage: Option<Arc<dyn StorageAuthority>>,
    validation: Option<Arc<dyn ValidationAuthority>>,
    certificates: Option<Arc<dyn CertificateAuthority>>,
    csr_verifier: Option<Arc<dyn CsrVerifier>>,
    audit: Option<AuditLogger>,
    config: Option<RaConfig>,
}

impl RegistrationAuthorityBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: RaConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn StorageAuthority>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn validation(mut self, validation: Arc<dyn ValidationAuthority>) -> Self {
        self.validation = Some(validation);
        self
    }

    pub fn certificates(mut self, certificates: Arc<dyn CertificateAuthority>) -> Self {
        self.certificates = Some(certificates);
        self
    }

    /// Replace the default [`X509CsrVerifier`]
    pub fn csr_verifier(mut self, verifier: Arc<dyn CsrVerifier>) -> Self {
        self.csr_verifier = Some(verifier);
        self
    }

    /// Replace the audit logger derived from the configuration
    pub fn audit(mut self, audit: AuditLogger) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Build the authority. Every collaborator and the configuration are
    /// required.
    pub fn build(self) -> Result<RegistrationAuthority> {
        let missing = |what: &str| RaError::Internal(format!("{} not configured", what));

        let config = self.config.ok_or_else(|| missing("configuration"))?;
        let audit = self.audit.unwrap_or_else(|| config.audit_logger());

        Ok(RegistrationAuthority {
            storage: self.storage.ok_or_else(|| missing("storage authority"))?,
            validation: self
                .validation
                .ok_or_else(|| missing("validation authority"))?,
            certificates: self
                .certificates
                .ok_or_else(|| missing("certificate authority"))?,
            csr_verifier: self
                .csr_verifier
                .unwrap_or_else(|| Arc::new(X509CsrVerifier::new())),
            audit,
            config,
        })
    }
}
