//! One-stop client: remote session protocol plus local verification over a
//! shared HTTP client and key store.

use std::sync::Arc;

use tracing::info;

use guard_core::{ClientVerifier, KeyStore, RefreshSummary, Result, TokenCodec, VerifiedClaims};

use crate::config::{ConfigError, GuardConfig};
use crate::key_source::HttpKeySource;
use crate::session::SessionProtocol;
use crate::transport::HttpTransport;

#[derive(Debug, Clone)]
pub struct Guard {
    config: GuardConfig,
    session: SessionProtocol,
    verifier: ClientVerifier,
}

impl Guard {
    pub fn new(config: GuardConfig) -> std::result::Result<Self, ConfigError> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        let key_store = Arc::new(KeyStore::new(Arc::new(HttpKeySource::new(
            transport.clone(),
        ))));
        let verifier = ClientVerifier::new(key_store, TokenCodec::new(config.verification_options()));

        info!(base_url = %transport.base_url(), "Guard client initialized");

        Ok(Self {
            config,
            session: SessionProtocol::new(transport),
            verifier,
        })
    }

    /// Build from `BULWARK_*` environment variables
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        Self::new(GuardConfig::from_env()?)
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionProtocol {
        &self.session
    }

    pub fn verifier(&self) -> &ClientVerifier {
        &self.verifier
    }

    pub fn key_store(&self) -> &Arc<KeyStore> {
        self.verifier.key_store()
    }

    /// Replace the trusted key set with the service's current listing.
    /// Never called implicitly; pick a cadence that suits your staleness
    /// budget.
    pub async fn refresh_keys(&self) -> Result<RefreshSummary> {
        self.key_store().refresh().await
    }

    /// Offline verification. See [`ClientVerifier::verify_locally`] for the
    /// staleness caveats.
    pub fn verify_locally(&self, access_token: &str) -> Result<VerifiedClaims> {
        self.verifier.verify_locally(access_token)
    }
}
