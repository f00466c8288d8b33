// Keystone - registration authority for ACME-style certificate issuance
//
// This library ties the registration authority to its ambient stack:
// layered configuration, structured audit events and logging.

use std::path::Path;

// Re-export the registration authority
pub use keystone_ra::*;

// Re-export supporting crates
pub use keystone_audit;
pub use keystone_config;

#[cfg(feature = "log")]
pub use keystone_log;

use keystone_config::{ConfigError, ConfigManager, FileFormat};

/// Load the registration authority configuration.
///
/// Sources, later ones winning: the optional config file, a `.env` file in
/// the working directory, then `KEYSTONE_*` environment variables.
pub fn load_config(file: Option<&Path>) -> keystone_config::Result<RaConfig> {
    let mut builder = ConfigManager::builder()
        .with_prefix(keystone_config::ENV_PREFIX)
        .load_dotenv(None);

    if let Some(path) = file {
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(FileFormat::from_extension)
            .ok_or_else(|| {
                ConfigError::LoadError(format!(
                    "unsupported config file format: {}",
                    path.display()
                ))
            })?;
        builder = builder.add_file(path.to_string_lossy().into_owned(), format);
    }

    let manager = builder.build()?;
    RaConfig::load(&manager)
}

/// Install logging from the `KEYSTONE_LOG_*` environment, then load the
/// configuration as [`load_config`] does.
#[cfg(feature = "log")]
pub fn bootstrap(file: Option<&Path>) -> keystone_config::Result<RaConfig> {
    keystone_log::init();
    let config = load_config(file)?;
    tracing::info!(
        authz_base = %config.authz_base,
        authorization_lifetime_days = config.authorization_lifetime_days,
        audit_log = ?config.audit_log,
        "Loaded registration authority configuration"
    );
    Ok(config)
}

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        AccountKey,
        Authorization,
        AuthorizationRequest,
        Certificate,
        CertificateAuthority,
        CertificateRequest,
        Challenge,
        ChallengeProber,
        ChallengeResponse,
        ChallengeType,
        CsrVerifier,
        Identifier,
        MemoryStorageAuthority,
        RaConfig,
        RaError,
        Registration,
        RegistrationAuthority,
        RegistrationUpdate,
        Result,
        Status,
        StorageAuthority,
        Supervised,
        SupervisorConfig,
        ValidationAuthority,
        ValidationCallback,
        ValidationQueue,
        ValidationWorker,
        VerifiedCsr,
        X509CsrVerifier,
        forbidden_identifier,
    };
    pub use keystone_audit::{AuditEvent, AuditLogger};
    pub use url::Url;
}
