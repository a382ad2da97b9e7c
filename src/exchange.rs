//! Authorization-code to identity-token exchange.
//!
//! One POST to the IdP's token endpoint, authenticated with a freshly minted
//! client-secret assertion. Every failure here is terminal for the attempt:
//! authorization codes are single-use and expire within minutes, so a retry
//! with the same code can never succeed — and a retry after a network error
//! risks replaying a code the IdP may already have consumed.

use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::config::ProviderIdentity;
use crate::error::{AuthFlowError, AuthFlowResult};
use crate::secret::ClientSecretSigner;
use crate::types::{TokenErrorResponse, TokenResponse};

/// Performs the authorization-code exchange against one IdP.
#[derive(Debug)]
pub struct TokenExchangeClient {
    token_endpoint: String,
    client_id: String,
    signer: ClientSecretSigner,
    http_client: reqwest::Client,
}

impl TokenExchangeClient {
    /// Build an exchange client for the given provider.
    ///
    /// # Errors
    ///
    /// Returns [`AuthFlowError::Configuration`] if the provider's signing
    /// key is malformed or the HTTP client cannot be constructed.
    pub fn new(provider: &impl ProviderIdentity) -> AuthFlowResult<Self> {
        let signer = ClientSecretSigner::new(provider.identity(), provider.issuer())?;
        // The client-secret assertion expires 60s after minting; the request
        // must complete well inside that window.
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                AuthFlowError::configuration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            token_endpoint: provider.token_endpoint().to_string(),
            client_id: provider.identity().client_id.clone(),
            signer,
            http_client,
        })
    }

    /// Exchange an authorization code for the IdP's token response.
    ///
    /// `redirect_uri` must be byte-for-byte the value used at initiate; the
    /// IdP rejects the exchange otherwise, and that rejection is surfaced
    /// rather than worked around.
    ///
    /// # Errors
    ///
    /// Returns [`AuthFlowError::Protocol`] for HTTP failures, IdP-reported
    /// OAuth errors, and responses missing the `id_token` field. None of
    /// these are retryable.
    pub async fn exchange(
        &self,
        authorization_code: &str,
        redirect_uri: &str,
        now: SystemTime,
    ) -> AuthFlowResult<TokenResponse> {
        let client_secret = self.signer.sign(now)?;

        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("code", authorization_code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        debug!(token_endpoint = %self.token_endpoint, "exchanging authorization code");

        let response = self
            .http_client
            .post(&self.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthFlowError::protocol(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            // The IdP reports OAuth errors as JSON; fall back to the bare
            // status when the body is something else.
            let reason = match response.json::<TokenErrorResponse>().await {
                Ok(body) => match body.error_description {
                    Some(detail) => format!("{}: {detail}", body.error),
                    None => body.error,
                },
                Err(_) => format!("token endpoint returned status {status}"),
            };
            warn!(token_endpoint = %self.token_endpoint, %reason, "code exchange rejected");
            return Err(AuthFlowError::protocol(reason));
        }

        let token_response: TokenResponse = response.json().await.map_err(|e| {
            AuthFlowError::protocol(format!("invalid token response: {e}"))
        })?;

        if token_response.id_token.is_none() {
            return Err(AuthFlowError::protocol(
                "token response missing id_token field",
            ));
        }

        Ok(token_response)
    }
}
