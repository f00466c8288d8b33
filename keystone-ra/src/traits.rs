/// Collaborator contracts the registration authority depends on
use crate::account::Registration;
use crate::certificate::{Certificate, VerifiedCsr};
use crate::challenge::Authorization;
use crate::error::Result;
use async_trait::async_trait;

/// Durable state for registrations and authorizations
///
/// The storage authority is the serialization point for concurrent
/// requests. In particular [`finalize_authorization`] must move an
/// authorization to a terminal state at most once.
///
/// [`finalize_authorization`]: StorageAuthority::finalize_authorization
#[async_trait]
pub trait StorageAuthority: Send + Sync {
    /// Allocate a registration id
    async fn new_registration(&self) -> Result<String>;

    /// Store a registration under its id
    async fn update_registration(&self, registration: &Registration) -> Result<()>;

    /// Allocate an empty pending authorization and return its id
    async fn new_pending_authorization(&self) -> Result<String>;

    /// Overwrite a pending authorization. Fails with `Conflict` if it has
    /// already been finalized.
    async fn update_pending_authorization(&self, authz: &Authorization) -> Result<()>;

    /// Look up an authorization, pending or final
    async fn get_authorization(&self, id: &str) -> Result<Authorization>;

    /// Move a pending authorization to its terminal state. Fails with
    /// `Conflict` if it is no longer pending.
    async fn finalize_authorization(&self, authz: &Authorization) -> Result<()>;
}

/// Performs domain-control probes
#[async_trait]
pub trait ValidationAuthority: Send + Sync {
    /// Start validating challenge `challenge` of `authz`, the one the
    /// client just answered.
    ///
    /// Returns once the work is scheduled; the outcome is delivered later
    /// through a [`ValidationCallback`](crate::validation::ValidationCallback).
    async fn update_validations(&self, authz: &Authorization, challenge: usize) -> Result<()>;
}

/// Signs certificates
#[async_trait]
pub trait CertificateAuthority: Send + Sync {
    async fn issue_certificate(&self, csr: &VerifiedCsr) -> Result<Certificate>;
}
