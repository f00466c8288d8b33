/// In-memory storage authority
use crate::account::Registration;
use crate::challenge::{Authorization, Status};
use crate::error::{RaError, Result};
use crate::token;
use crate::traits::StorageAuthority;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

#[derive(Default)]
struct Tables {
    // `None` marks an id that was allocated but never written.
    registrations: HashMap<String, Option<Registration>>,
    pending: HashMap<String, Option<Authorization>>,
    finalized: HashMap<String, Authorization>,
}

/// Storage authority keeping everything in process memory
///
/// Pending and finalized authorizations live in separate tables, and
/// finalization moves a record between them under one lock, so an
/// authorization reaches a terminal state at most once.
#[derive(Clone, Default)]
pub struct MemoryStorageAuthority {
    tables: Arc<Mutex<Tables>>,
    next_registration: Arc<AtomicU64>,
}

impl MemoryStorageAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a stored registration
    pub async fn get_registration(&self, id: &str) -> Result<Registration> {
        self.tables
            .lock()
            .await
            .registrations
            .get(id)
            .cloned()
            .flatten()
            .ok_or_else(|| RaError::NotFound(format!("registration {}", id)))
    }

    /// Whether the authorization has been finalized
    pub async fn is_finalized(&self, id: &str) -> bool {
        self.tables.lock().await.finalized.contains_key(id)
    }
}

fn authorization_id() -> Result<String> {
    token::random_string(16)
        .map_err(|_| RaError::Storage("could not generate authorization id".to_string()))
}

#[async_trait]
impl StorageAuthority for MemoryStorageAuthority {
    async fn new_registration(&self) -> Result<String> {
        let id = (self.next_registration.fetch_add(1, Ordering::SeqCst) + 1).to_string();
        self.tables
            .lock()
            .await
            .registrations
            .insert(id.clone(), None);
        Ok(id)
    }

    async fn update_registration(&self, registration: &Registration) -> Result<()> {
        let mut tables = self.tables.lock().await;
        match tables.registrations.get_mut(&registration.id) {
            Some(slot) => {
                *slot = Some(registration.clone());
                Ok(())
            }
            None => Err(RaError::NotFound(format!(
                "registration {}",
                registration.id
            ))),
        }
    }

    async fn new_pending_authorization(&self) -> Result<String> {
        let id = authorization_id()?;
        self.tables.lock().await.pending.insert(id.clone(), None);
        Ok(id)
    }

    async fn update_pending_authorization(&self, authz: &Authorization) -> Result<()> {
        if authz.status != Status::Pending {
            return Err(RaError::Conflict(format!(
                "authorization {} is not pending",
                authz.id
            )));
        }

        let mut tables = self.tables.lock().await;
        if tables.finalized.contains_key(&authz.id) {
            return Err(RaError::Conflict(format!(
                "authorization {} is already finalized",
                authz.id
            )));
        }
        match tables.pending.get_mut(&authz.id) {
            Some(slot) => {
                *slot = Some(authz.clone());
                Ok(())
            }
            None => Err(RaError::NotFound(format!("authorization {}", authz.id))),
        }
    }

    async fn get_authorization(&self, id: &str) -> Result<Authorization> {
        let tables = self.tables.lock().await;
        if let Some(authz) = tables.finalized.get(id) {
            return Ok(authz.clone());
        }
        tables
            .pending
            .get(id)
            .cloned()
            .flatten()
            .ok_or_else(|| RaError::NotFound(format!("authorization {}", id)))
    }

    async fn finalize_authorization(&self, authz: &Authorization) -> Result<()> {
        if !authz.status.is_terminal() {
            return Err(RaError::Conflict(format!(
                "authorization {} has no terminal status",
                authz.id
            )));
        }

        let mut tables = self.tables.lock().await;
        if tables.finalized.contains_key(&authz.id) {
            return Err(RaError::Conflict(format!(
                "authorization {} is already finalized",
                authz.id
            )));
        }
        if tables.pending.remove(&authz.id).is_none() {
            return Err(RaError::NotFound(format!("authorization {}", authz.id)));
        }
        tables.finalized.insert(authz.id.clone(), authz.clone());
        Ok(())
    }
}
