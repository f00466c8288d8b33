//! Validation dispatch and the callback path.
//!
//! [`ValidationQueue`] is a [`ValidationAuthority`] that only enqueues: the
//! registration authority hands it an authorization and returns to its
//! caller at once. A [`ValidationWorker`] drains the queue, probes the one
//! challenge the client answered, and delivers the result to a
//! [`ValidationCallback`], normally the registration authority itself.

use crate::challenge::{Authorization, Challenge, Status};
use crate::error::{RaError, Result};
use crate::identifier::Identifier;
use crate::traits::ValidationAuthority;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;

/// Receives finished validations
#[async_trait]
pub trait ValidationCallback: Send + Sync {
    async fn on_validation_update(&self, authz: Authorization);
}

/// Performs the network probe for one challenge
#[async_trait]
pub trait ChallengeProber: Send + Sync {
    /// `Valid` if the identifier's owner answered the challenge correctly
    async fn probe(&self, identifier: &Identifier, challenge: &Challenge) -> Status;
}

/// One challenge response waiting to be validated
#[derive(Debug, Clone)]
pub struct ValidationJob {
    pub authorization: Authorization,

    /// Index of the answered challenge
    pub challenge: usize,
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct ValidationWorkerConfig {
    /// Number of authorizations validated concurrently
    pub max_in_flight: usize,

    /// A probe running longer than this counts as failed
    pub probe_timeout: Duration,
}

impl Default for ValidationWorkerConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 10,
            probe_timeout: Duration::from_secs(30),
        }
    }
}

/// Sending half of the validation queue
#[derive(Debug, Clone)]
pub struct ValidationQueue {
    sender: mpsc::Sender<ValidationJob>,
}

impl ValidationQueue {
    /// Create a queue holding up to `capacity` waiting jobs, and the
    /// receiver a [`ValidationWorker`] consumes.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ValidationJob>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl ValidationAuthority for ValidationQueue {
    async fn update_validations(&self, authz: &Authorization, challenge: usize) -> Result<()> {
        let job = ValidationJob {
            authorization: authz.clone(),
            challenge,
        };
        self.sender.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                RaError::Validation("validation queue is full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => {
                RaError::Transport("validation queue is closed".to_string())
            }
        })
    }
}

/// Drains a [`ValidationQueue`]
pub struct ValidationWorker {
    jobs: mpsc::Receiver<ValidationJob>,
    prober: Arc<dyn ChallengeProber>,
    callback: Arc<dyn ValidationCallback>,
    config: ValidationWorkerConfig,
}

impl ValidationWorker {
    pub fn new(
        jobs: mpsc::Receiver<ValidationJob>,
        prober: Arc<dyn ChallengeProber>,
        callback: Arc<dyn ValidationCallback>,
    ) -> Self {
        Self::with_config(jobs, prober, callback, ValidationWorkerConfig::default())
    }

    pub fn with_config(
        jobs: mpsc::Receiver<ValidationJob>,
        prober: Arc<dyn ChallengeProber>,
        callback: Arc<dyn ValidationCallback>,
        config: ValidationWorkerConfig,
    ) -> Self {
        Self {
            jobs,
            prober,
            callback,
            config,
        }
    }

    /// Run the worker on its own task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Process jobs until every queue handle is dropped, then wait for the
    /// jobs still in flight.
    pub async fn run(mut self) {
        let max_in_flight = self.config.max_in_flight.max(1);
        let permits = Arc::new(Semaphore::new(max_in_flight));
        tracing::info!(max_in_flight, "Validation worker started");

        while let Some(job) = self.jobs.recv().await {
            let Ok(permit) = permits.clone().acquire_owned().await else {
                break;
            };
            let prober = self.prober.clone();
            let callback = self.callback.clone();
            let timeout = self.config.probe_timeout;

            tokio::spawn(async move {
                let authz =
                    validate(job.authorization, job.challenge, prober.as_ref(), timeout).await;
                callback.on_validation_update(authz).await;
                drop(permit);
            });
        }

        // Every permit back means every spawned job has delivered its result.
        let _ = permits.acquire_many(max_in_flight as u32).await;
        tracing::info!("Validation worker stopped");
    }
}

/// Probe challenge `index` of `authz` if it is pending and answered.
/// The other challenges are left untouched.
async fn validate(
    mut authz: Authorization,
    index: usize,
    prober: &dyn ChallengeProber,
    timeout: Duration,
) -> Authorization {
    let Some(challenge) = authz.challenges.get(index) else {
        tracing::warn!(authorization = %authz.id, challenge = index, "No such challenge");
        return authz;
    };
    if challenge.status != Status::Pending || !challenge.has_response() {
        return authz;
    }

    let probe = prober.probe(&authz.identifier, challenge);
    let status = match tokio::time::timeout(timeout, probe).await {
        Ok(status) => status,
        Err(_) => {
            tracing::warn!(
                authorization = %authz.id,
                challenge = index,
                "Challenge probe timed out"
            );
            Status::Invalid
        }
    };

    tracing::debug!(
        authorization = %authz.id,
        challenge = index,
        status = ?status,
        "Challenge probed"
    );

    let challenge = &mut authz.challenges[index];
    challenge.status = status;
    if status == Status::Valid {
        challenge.validated = Some(Utc::now());
    }
    authz
}
