//! Audit logger

use crate::{AuditBackend, AuditBackendError, AuditEvent, TracingBackend};
use std::sync::Arc;

/// Audit logger
///
/// Main interface for recording audit events.
#[derive(Clone)]
pub struct AuditLogger {
    backend: Arc<dyn AuditBackend>,
    enabled: bool,
}

impl AuditLogger {
    /// Create a new audit logger builder
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use keystone_audit::*;
    ///
    /// let logger = AuditLogger::builder()
    ///     .backend(FileBackend::new("audit.log"))
    ///     .build();
    /// ```
    pub fn builder() -> AuditLoggerBuilder {
        AuditLoggerBuilder::new()
    }

    /// Log an audit event
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use keystone_audit::*;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let logger = AuditLogger::builder()
    ///     .backend(MemoryBackend::new())
    ///     .build();
    ///
    /// logger.log(AuditEvent::new("registration.created")
    ///     .action("create")
    ///     .status(AuditStatus::Success)).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn log(&self, event: AuditEvent) -> Result<(), AuditBackendError> {
        if !self.enabled {
            return Ok(());
        }

        self.backend.write(&event).await
    }

    /// Log an audit event, reporting a backend failure through `tracing`
    /// instead of returning it.
    pub async fn record(&self, event: AuditEvent) {
        let event_type = event.event_type.clone();
        if let Err(e) = self.log(event).await {
            tracing::error!(event_type = %event_type, error = %e, "failed to write audit event");
        }
    }

    /// Flush any pending writes
    pub async fn flush(&self) -> Result<(), AuditBackendError> {
        self.backend.flush().await
    }

    /// Check if logger is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        AuditLoggerBuilder::new().build()
    }
}

/// Audit logger builder
pub struct AuditLoggerBuilder {
    backend: Option<Arc<dyn AuditBackend>>,
    enabled: bool,
}

impl AuditLoggerBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            backend: None,
            enabled: true,
        }
    }

    /// Set the storage backend
    pub fn backend(mut self, backend: impl AuditBackend + 'static) -> Self {
        self.backend = Some(Arc::new(backend));
        self
    }

    /// Enable or disable the logger
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Build the audit logger. Without a backend, events go to `tracing`.
    pub fn build(self) -> AuditLogger {
        AuditLogger {
            backend: self
                .backend
                .unwrap_or_else(|| Arc::new(TracingBackend::new())),
            enabled: self.enabled,
        }
    }
}

impl Default for AuditLoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
