//! Audit event structures and types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Audit event status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    /// Operation succeeded
    Success,
    /// Operation completed with a negative outcome
    Failure,
    /// Operation refused on a security precondition
    Denied,
    /// Operation could not complete
    Error,
}

/// Severity level for audit events
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
    /// Critical events
    Critical,
}

/// Audit event structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: String,

    /// Timestamp when event occurred
    pub timestamp: DateTime<Utc>,

    /// Event type (e.g., "registration.created", "certificate.denied")
    pub event_type: String,

    /// Account the event concerns, as a key thumbprint
    pub account: Option<String>,

    /// Resource being acted upon
    pub resource_type: Option<String>,

    /// Resource identifier
    pub resource_id: Option<String>,

    /// Action performed
    pub action: String,

    /// Status of the operation
    pub status: AuditStatus,

    /// Severity level
    pub severity: AuditSeverity,

    /// Additional metadata
    pub metadata: BTreeMap<String, serde_json::Value>,

    /// Error message (if applicable)
    pub error: Option<String>,
}

impl AuditEvent {
    /// Create a new audit event
    ///
    /// # Examples
    ///
    /// ```
    /// use keystone_audit::*;
    ///
    /// let event = AuditEvent::new("registration.created")
    ///     .resource("registration")
    ///     .action("create")
    ///     .status(AuditStatus::Success);
    /// ```
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.into(),
            account: None,
            resource_type: None,
            resource_id: None,
            action: "unknown".to_string(),
            status: AuditStatus::Success,
            severity: AuditSeverity::Info,
            metadata: BTreeMap::new(),
            error: None,
        }
    }

    /// Set the account
    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    /// Set resource type
    pub fn resource(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    /// Set resource ID
    pub fn resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    /// Set action
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    /// Set status
    pub fn status(mut self, status: AuditStatus) -> Self {
        self.status = status;
        self
    }

    /// Set severity
    pub fn severity(mut self, severity: AuditSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Add metadata
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set error message
    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_event_creation() {
        let event = AuditEvent::new("authorization.created")
            .account("thumb")
            .resource("authorization")
            .resource_id("abc")
            .action("create")
            .status(AuditStatus::Success);

        assert_eq!(event.event_type, "authorization.created");
        assert_eq!(event.account.as_deref(), Some("thumb"));
        assert_eq!(event.resource_id.as_deref(), Some("abc"));
        assert_eq!(event.action, "create");
        assert_eq!(event.status, AuditStatus::Success);
        assert_eq!(event.severity, AuditSeverity::Info);
    }

    #[test]
    fn test_audit_event_to_json() {
        let event = AuditEvent::new("certificate.denied")
            .status(AuditStatus::Denied)
            .metadata("domain", "b.example.com");
        let json = event.to_json().unwrap();
        assert!(json.contains("\"status\":\"denied\""));
        assert!(json.contains("b.example.com"));
    }

    #[test]
    fn test_audit_severity_ordering() {
        assert!(AuditSeverity::Info < AuditSeverity::Warning);
        assert!(AuditSeverity::Warning < AuditSeverity::Error);
        assert!(AuditSeverity::Error < AuditSeverity::Critical);
    }
}
