/// Registration authority configuration
use keystone_audit::{AuditLogger, FileBackend, MultiBackend, TracingBackend};
use keystone_config::{ConfigError, ConfigManager, ConfigValidator, Validate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Default lifetime of a valid authorization
pub const DEFAULT_AUTHORIZATION_LIFETIME_DAYS: u32 = 365;

/// Default pause before reconnecting a dropped collaborator
pub const DEFAULT_RECONNECT_WAIT: Duration = Duration::from_secs(5);

/// Registration authority configuration
///
/// Loaded from the `KEYSTONE_*` environment or a config file:
///
/// ```toml
/// authz_base = "https://ca.example/acme/authz/"
/// authorization_lifetime_days = 90
/// audit_log = "/var/log/keystone/audit.log"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaConfig {
    /// Base URL challenge URIs are built under
    pub authz_base: Url,

    /// How long a valid authorization may be used for issuance
    #[serde(default = "default_lifetime_days")]
    pub authorization_lifetime_days: u32,

    /// Append audit events to this file in addition to the log
    #[serde(default)]
    pub audit_log: Option<PathBuf>,
}

fn default_lifetime_days() -> u32 {
    DEFAULT_AUTHORIZATION_LIFETIME_DAYS
}

impl RaConfig {
    /// Create a configuration with default lifetime and no audit file
    ///
    /// # Example
    ///
    /// ```
    /// use keystone_ra::RaConfig;
    /// use url::Url;
    ///
    /// let config = RaConfig::new(Url::parse("https://ca.example/acme/authz/").unwrap())
    ///     .with_authorization_lifetime_days(90);
    /// assert_eq!(config.authorization_lifetime_days, 90);
    /// ```
    pub fn new(authz_base: Url) -> Self {
        Self {
            authz_base,
            authorization_lifetime_days: DEFAULT_AUTHORIZATION_LIFETIME_DAYS,
            audit_log: None,
        }
    }

    /// Load and validate from a config manager
    pub fn load(config: &ConfigManager) -> keystone_config::Result<Self> {
        config.load_validated()
    }

    /// Set the authorization lifetime
    pub fn with_authorization_lifetime_days(mut self, days: u32) -> Self {
        self.authorization_lifetime_days = days;
        self
    }

    /// Set the audit log file
    pub fn with_audit_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.audit_log = Some(path.into());
        self
    }

    pub fn authorization_lifetime(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.authorization_lifetime_days))
    }

    /// Audit logger writing to `tracing`, plus the audit file when set
    pub fn audit_logger(&self) -> AuditLogger {
        let mut backend = MultiBackend::new().with_backend(TracingBackend::new());
        if let Some(path) = &self.audit_log {
            backend = backend.with_backend(FileBackend::new(path.clone()));
        }
        AuditLogger::builder().backend(backend).build()
    }
}

impl Validate for RaConfig {
    fn validate(&self) -> keystone_config::Result<()> {
        ConfigValidator::is_directory_url(self.authz_base.as_str(), "authz_base")?;
        if self.authorization_lifetime_days == 0 {
            return Err(ConfigError::ValidationError(
                "authorization_lifetime_days must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Collaborator reconnection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Pause between noticing a disconnect and reconnecting
    pub reconnect_wait: Duration,

    /// Give up after this many failed attempts in a row for one outage
    /// (0 = never)
    pub max_reconnects: u32,
}

impl SupervisorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reconnect_wait(mut self, wait: Duration) -> Self {
        self.reconnect_wait = wait;
        self
    }

    pub fn with_max_reconnects(mut self, max: u32) -> Self {
        self.max_reconnects = max;
        self
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            reconnect_wait: DEFAULT_RECONNECT_WAIT,
            max_reconnects: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://ca.example/acme/authz/").unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = RaConfig::new(base());
        assert_eq!(config.authorization_lifetime_days, 365);
        assert_eq!(config.authorization_lifetime(), chrono::Duration::days(365));
        assert!(config.audit_log.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = RaConfig::new(base())
            .with_authorization_lifetime_days(30)
            .with_audit_log("/tmp/audit.log");

        assert_eq!(config.authorization_lifetime_days, 30);
        assert_eq!(config.audit_log, Some(PathBuf::from("/tmp/audit.log")));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let no_slash = RaConfig::new(Url::parse("https://ca.example/acme/authz").unwrap());
        assert!(no_slash.validate().is_err());

        let not_http = RaConfig::new(Url::parse("ftp://ca.example/authz/").unwrap());
        assert!(not_http.validate().is_err());

        let zero = RaConfig::new(base()).with_authorization_lifetime_days(0);
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_load_from_manager() {
        let manager = ConfigManager::new();
        manager
            .set("authz_base", "https://ca.example/acme/authz/")
            .unwrap();
        manager.set("authorization_lifetime_days", 90).unwrap();

        let config = RaConfig::load(&manager).unwrap();
        assert_eq!(config.authz_base, base());
        assert_eq!(config.authorization_lifetime_days, 90);
    }

    #[test]
    fn test_load_defaults_lifetime() {
        let manager = ConfigManager::new();
        manager
            .set("authz_base", "https://ca.example/acme/authz/")
            .unwrap();
        assert_eq!(RaConfig::load(&manager).unwrap().authorization_lifetime_days, 365);
    }

    #[test]
    fn test_load_requires_base() {
        assert!(RaConfig::load(&ConfigManager::new()).is_err());
    }

    #[test]
    fn test_supervisor_defaults() {
        let config = SupervisorConfig::default();
        assert_eq!(config.reconnect_wait, Duration::from_secs(5));
        assert_eq!(config.max_reconnects, 0);

        let tuned = SupervisorConfig::new()
            .with_reconnect_wait(Duration::from_millis(10))
            .with_max_reconnects(3);
        assert_eq!(tuned.reconnect_wait, Duration::from_millis(10));
        assert_eq!(tuned.max_reconnects, 3);
    }
}
