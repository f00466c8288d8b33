//! # Keystone RA
//!
//! Registration authority for an ACME-style certificate authority. It owns
//! the registration, domain-authorization and issuance workflow and
//! enforces every check that must pass before a certificate is signed.
//!
//! ## Features
//!
//! - ✅ **Registrations** - Create accounts and merge client updates
//! - ✅ **Identifier Policy** - Refuse names that must never be authorized
//! - ✅ **Authorizations** - simpleHttp and dvsni challenges with a
//!   pending → valid/invalid state machine
//! - ✅ **Issuance Checks** - CSR signature, authorization ownership and
//!   expiry, name coverage
//! - ✅ **Fire-and-forget Validation** - Queue, worker and callback
//! - ✅ **Reconnecting Collaborators** - Supervised storage, validation and
//!   signing handles
//!
//! ## Quick Start
//!
//! ```no_run
//! use keystone_ra::*;
//! use std::sync::Arc;
//! use url::Url;
//!
//! # async fn example(
//! #     ca: Arc<dyn CertificateAuthority>,
//! #     prober: Arc<dyn ChallengeProber>,
//! # ) -> Result<()> {
//! let config = RaConfig::new(Url::parse("https://ca.example/acme/authz/").unwrap());
//! let (queue, jobs) = ValidationQueue::new(64);
//!
//! let ra = Arc::new(
//!     RegistrationAuthority::builder()
//!         .config(config)
//!         .storage(Arc::new(MemoryStorageAuthority::new()))
//!         .validation(Arc::new(queue))
//!         .certificates(ca)
//!         .build()?,
//! );
//! ValidationWorker::new(jobs, prober, ra.clone()).spawn();
//!
//! let key = AccountKey::new("ES256", vec![4; 65]);
//! let registration = ra.new_registration(&RegistrationUpdate::new(), key.clone()).await?;
//!
//! let authz = ra
//!     .new_authorization(&AuthorizationRequest::new(Identifier::dns("example.com")), key)
//!     .await?;
//! let authz = ra
//!     .update_authorization(
//!         authz,
//!         0,
//!         &ChallengeResponse::simple_http("/.well-known/acme-challenge/t"),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Identifier Policy
//!
//! ```
//! use keystone_ra::forbidden_identifier;
//!
//! assert!(!forbidden_identifier("www.example.com"));
//! assert!(forbidden_identifier("192.168.1.1"));
//! assert!(forbidden_identifier("xn--bcher-kva.example"));
//! ```
//!
//! ## Configuration
//!
//! ```
//! use keystone_config::ConfigManager;
//! use keystone_ra::RaConfig;
//!
//! let manager = ConfigManager::new();
//! manager.set("authz_base", "https://ca.example/acme/authz/").unwrap();
//! manager.set("authorization_lifetime_days", 90).unwrap();
//!
//! let config = RaConfig::load(&manager).unwrap();
//! assert_eq!(config.authorization_lifetime_days, 90);
//! ```

pub mod account;
pub mod authority;
pub mod certificate;
pub mod challenge;
pub mod config;
pub mod encoding;
pub mod error;
pub mod identifier;
pub mod storage;
pub mod supervisor;
pub mod token;
pub mod traits;
pub mod validation;

pub use account::*;
pub use authority::*;
pub use certificate::*;
pub use challenge::*;
pub use config::*;
pub use error::*;
pub use identifier::*;
pub use storage::*;
pub use supervisor::*;
pub use traits::*;
pub use validation::*;
