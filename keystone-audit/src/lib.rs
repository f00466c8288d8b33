//! Audit trail for Keystone
//!
//! Every security decision the registration authority makes (a new
//! account, an authorization reaching a terminal state, a certificate
//! issued or refused) is recorded as a structured [`AuditEvent`]. The
//! trail is also the only reporting channel for failures that happen
//! after the original caller has already returned.
//!
//! # Quick Start
//!
//! ```no_run
//! use keystone_audit::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let audit = AuditLogger::builder()
//!     .backend(FileBackend::new("audit.log"))
//!     .build();
//!
//! audit.log(AuditEvent::new("authorization.finalized")
//!     .account("2x9VqP0s...")
//!     .resource("authorization")
//!     .resource_id("3f1c")
//!     .action("finalize")
//!     .status(AuditStatus::Success)).await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod event;
pub mod logger;

pub use backend::*;
pub use event::*;
pub use logger::*;
