//! Reconnecting handles to remote collaborators.
//!
//! A [`Supervised`] handle always points at the most recent connection a
//! [`Connector`] produced. When the transport reports a disconnect, a
//! background task waits, reconnects and swaps the handle in place, so the
//! registration authority can keep one `Arc` for its whole lifetime.

use crate::account::Registration;
use crate::certificate::{Certificate, VerifiedCsr};
use crate::challenge::Authorization;
use crate::config::SupervisorConfig;
use crate::error::Result;
use crate::traits::{CertificateAuthority, StorageAuthority, ValidationAuthority};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Fires with a reason when the connection it belongs to drops.
///
/// The sending half must live as long as the connection; dropping it
/// counts as a disconnect.
pub type Disconnected = oneshot::Receiver<String>;

/// Opens connections to a collaborator
#[async_trait]
pub trait Connector<C: ?Sized + Send + Sync>: Send + Sync {
    async fn connect(&self) -> Result<(Arc<C>, Disconnected)>;
}

/// Collaborator handle that survives reconnects
pub struct Supervised<C: ?Sized> {
    current: RwLock<Arc<C>>,
    reconnects: AtomicU32,
}

impl<C: ?Sized + Send + Sync + 'static> Supervised<C> {
    /// Connect once, then keep the handle connected in the background.
    ///
    /// Fails only if the first connection attempt fails.
    pub async fn spawn<K>(
        connector: K,
        config: SupervisorConfig,
    ) -> Result<(Arc<Self>, JoinHandle<()>)>
    where
        K: Connector<C> + 'static,
    {
        let (handle, disconnected) = connector.connect().await?;
        let supervised = Arc::new(Self {
            current: RwLock::new(handle),
            reconnects: AtomicU32::new(0),
        });
        let task = tokio::spawn(supervised.clone().supervise(connector, config, disconnected));
        Ok((supervised, task))
    }

    /// The live connection
    pub fn current(&self) -> Arc<C> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Successful reconnects so far
    pub fn reconnects(&self) -> u32 {
        self.reconnects.load(Ordering::SeqCst)
    }

    fn replace(&self, handle: Arc<C>) {
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = handle;
    }

    async fn supervise<K>(
        self: Arc<Self>,
        connector: K,
        config: SupervisorConfig,
        mut disconnected: Disconnected,
    ) where
        K: Connector<C>,
    {
        loop {
            let reason = disconnected
                .await
                .unwrap_or_else(|_| "connection handle dropped".to_string());
            tracing::warn!(reason = %reason, "Collaborator connection lost");

            // `max_reconnects` bounds consecutive failures per outage.
            let mut attempts: u32 = 0;
            loop {
                if config.max_reconnects > 0 && attempts >= config.max_reconnects {
                    tracing::error!(attempts, "Giving up reconnecting to collaborator");
                    return;
                }
                attempts += 1;

                tokio::time::sleep(config.reconnect_wait).await;
                match connector.connect().await {
                    Ok((handle, next)) => {
                        self.replace(handle);
                        self.reconnects.fetch_add(1, Ordering::SeqCst);
                        tracing::info!("Reconnected to collaborator");
                        disconnected = next;
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Reconnect attempt failed");
                    }
                }
            }
        }
    }
}

#[async_trait]
impl StorageAuthority for Supervised<dyn StorageAuthority> {
    async fn new_registration(&self) -> Result<String> {
        self.current().new_registration().await
    }

    async fn update_registration(&self, registration: &Registration) -> Result<()> {
        self.current().update_registration(registration).await
    }

    async fn new_pending_authorization(&self) -> Result<String> {
        self.current().new_pending_authorization().await
    }

    async fn update_pending_authorization(&self, authz: &Authorization) -> Result<()> {
        self.current().update_pending_authorization(authz).await
    }

    async fn get_authorization(&self, id: &str) -> Result<Authorization> {
        self.current().get_authorization(id).await
    }

    async fn finalize_authorization(&self, authz: &Authorization) -> Result<()> {
        self.current().finalize_authorization(authz).await
    }
}

#[async_trait]
impl ValidationAuthority for Supervised<dyn ValidationAuthority> {
    async fn update_validations(&self, authz: &Authorization, challenge: usize) -> Result<()> {
        self.current().update_validations(authz, challenge).await
    }
}

#[async_trait]
impl CertificateAuthority for Supervised<dyn CertificateAuthority> {
    async fn issue_certificate(&self, csr: &VerifiedCsr) -> Result<Certificate> {
        self.current().issue_certificate(csr).await
    }
}
