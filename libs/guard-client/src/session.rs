//! Remote session state machine
//!
//! Client-observable lifecycle of a token pair:
//!
//! ```text
//! Unauthenticated --authenticate--> Issued --acknowledge--> Acknowledged
//! Acknowledged --validate_remote--> Acknowledged
//! Acknowledged --renew--> Issued (new pair, must be acknowledged again)
//! Acknowledged --revoke--> Revoked (terminal)
//! ```
//!
//! The service owns the state; this type only drives transitions. Callers
//! must sequence acknowledge before validate per token pair. Validating an
//! unacknowledged, revoked or renewed-away token fails with `AuthRejected`.

use std::sync::Arc;

use tracing::{debug, info};

use guard_core::{AccessTokenClaims, ProtocolError, Result, VerifiedClaims};

use crate::models::{
    AcknowledgeRequest, CredentialClaim, DeviceTokenRequest, MagicCodeRequest, PasswordRequest,
    SocialRequest, TokenPair,
};
use crate::social::SocialProvider;
use crate::transport::HttpTransport;

const AUTHENTICATE_PASSWORD: &str = "authentication/authenticate";
const AUTHENTICATE_MAGIC_CODE: &str = "passwordless/magic/authenticate";
const REQUEST_MAGIC_LINK: &str = "passwordless/magic/request";
const AUTHENTICATE_SOCIAL: &str = "passwordless/social/authenticate";
const ACKNOWLEDGE: &str = "authentication/acknowledge";
const VALIDATE_ACCESS_TOKEN: &str = "authentication/accesstoken/validate";
const RENEW: &str = "authentication/renew";
const REVOKE: &str = "authentication/revoke";

/// Drives authenticate → acknowledge → validate/renew/revoke against the
/// authentication service. Cheap to clone; clones share one HTTP client.
#[derive(Debug, Clone)]
pub struct SessionProtocol {
    transport: Arc<HttpTransport>,
}

impl SessionProtocol {
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }

    /// Exchange a credential claim for a token pair.
    ///
    /// The returned pair is unusable until [`SessionProtocol::acknowledge`]
    /// binds it to a device.
    pub async fn authenticate(&self, claim: CredentialClaim) -> Result<TokenPair> {
        let method = claim.method();
        let pair = match &claim {
            CredentialClaim::Password { email, password } => {
                self.request_pair(AUTHENTICATE_PASSWORD, &PasswordRequest { email, password })
                    .await
            }
            CredentialClaim::MagicCode { email, code } => {
                self.request_pair(AUTHENTICATE_MAGIC_CODE, &MagicCodeRequest { email, code })
                    .await
            }
            CredentialClaim::Social { provider, token } => {
                self.request_pair(
                    AUTHENTICATE_SOCIAL,
                    &SocialRequest {
                        provider: *provider,
                        social_token: token,
                    },
                )
                .await
            }
        }?;

        info!(method, "Token pair issued");
        Ok(pair)
    }

    pub async fn authenticate_password(&self, email: &str, password: &str) -> Result<TokenPair> {
        self.authenticate(CredentialClaim::Password {
            email: email.to_string(),
            password: password.to_string(),
        })
        .await
    }

    pub async fn authenticate_magic_code(&self, email: &str, code: &str) -> Result<TokenPair> {
        self.authenticate(CredentialClaim::MagicCode {
            email: email.to_string(),
            code: code.to_string(),
        })
        .await
    }

    pub async fn authenticate_social(
        &self,
        provider: SocialProvider,
        social_token: &str,
    ) -> Result<TokenPair> {
        self.authenticate(CredentialClaim::Social {
            provider,
            token: social_token.to_string(),
        })
        .await
    }

    /// Ask the service to email a one-time sign-in code to `email`.
    pub async fn request_magic_link(&self, email: &str) -> Result<()> {
        let path = format!("{}/{}", REQUEST_MAGIC_LINK, urlencoding::encode(email));
        self.transport.get_no_content(&path).await?;
        debug!(email, "Magic link requested");
        Ok(())
    }

    /// Bind a freshly issued pair to `device_id`. Required before either
    /// token can be validated.
    pub async fn acknowledge(
        &self,
        access_token: &str,
        refresh_token: &str,
        email: &str,
        device_id: &str,
    ) -> Result<()> {
        self.transport
            .post_no_content(
                ACKNOWLEDGE,
                &AcknowledgeRequest {
                    email,
                    device_id,
                    access_token,
                    refresh_token,
                },
            )
            .await?;

        debug!(email, device_id, "Token pair acknowledged");
        Ok(())
    }

    /// Authoritative validation. The service checks acknowledgment, device
    /// binding, revocation and expiry; this is the only check that observes
    /// revocation.
    pub async fn validate_remote(
        &self,
        email: &str,
        access_token: &str,
        device_id: &str,
    ) -> Result<VerifiedClaims> {
        let claims: AccessTokenClaims = self
            .transport
            .post_json(
                VALIDATE_ACCESS_TOKEN,
                &DeviceTokenRequest {
                    email,
                    device_id,
                    token: access_token,
                },
            )
            .await?;

        debug!(email, device_id, jti = %claims.jti, "Access token validated remotely");
        Ok(VerifiedClaims::assume_verified_by_service(claims))
    }

    /// Trade a refresh token for a new pair. The previous access token stops
    /// validating; the new pair must be acknowledged.
    pub async fn renew(&self, refresh_token: &str, email: &str, device_id: &str) -> Result<TokenPair> {
        let pair = self
            .request_pair(
                RENEW,
                &DeviceTokenRequest {
                    email,
                    device_id,
                    token: refresh_token,
                },
            )
            .await?;

        info!(device_id, "Token pair renewed");
        Ok(pair)
    }

    /// End the session. The access token fails every later remote validation.
    pub async fn revoke(&self, access_token: &str, email: &str, device_id: &str) -> Result<()> {
        self.transport
            .post_no_content(
                REVOKE,
                &DeviceTokenRequest {
                    email,
                    device_id,
                    token: access_token,
                },
            )
            .await?;

        info!(device_id, "Session revoked");
        Ok(())
    }

    async fn request_pair<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<TokenPair> {
        let pair: TokenPair = self.transport.post_json(path, body).await?;

        if pair.access_token.is_empty() || pair.refresh_token.is_empty() {
            return Err(ProtocolError::Decode("token pair is incomplete".to_string()).into());
        }
        Ok(pair)
    }
}
