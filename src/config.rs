//! Process-wide, immutable configuration.
//!
//! A [`ClientIdentity`] is constructed once at startup from configuration and
//! passed explicitly into every component that needs it. No component reads
//! global mutable state. The [`ProviderIdentity`] trait abstracts over which
//! IdP the flow talks to; [`IdpProvider`] is the stock value-based
//! implementation, with an [`IdpProvider::apple`] preset for the most common
//! deployment.

use secrecy::SecretString;
use url::Url;

use crate::error::{AuthFlowError, AuthFlowResult};

/// Apple's well-known endpoints, the reference deployment of this flow.
const APPLE_ISSUER: &str = "https://appleid.apple.com";
const APPLE_AUTHORIZE_ENDPOINT: &str = "https://appleid.apple.com/auth/authorize";
const APPLE_TOKEN_ENDPOINT: &str = "https://appleid.apple.com/auth/token";
const APPLE_KEYS_ENDPOINT: &str = "https://appleid.apple.com/auth/keys";

/// Immutable client credentials for one registered OAuth client.
///
/// Loaded once at startup, never from user input, never mutated. The signing
/// key is the PKCS#8 PEM of the elliptic-curve private key registered with
/// the IdP; it stays wrapped in [`SecretString`] until the signer parses it.
#[derive(Clone)]
pub struct ClientIdentity {
    /// OAuth client identifier (for Apple, the Services ID).
    pub client_id: String,
    /// Issuer of client-secret assertions (for Apple, the Developer Team ID).
    pub team_id: String,
    /// Identifier of the signing key, sent in the assertion header so the
    /// IdP can select the matching verification key.
    pub key_id: String,
    /// PKCS#8 PEM private EC key used to sign client-secret assertions.
    pub signing_key: SecretString,
    /// Space-separated scope string requested at authorization.
    pub scope: String,
}

impl std::fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("client_id", &self.client_id)
            .field("team_id", &self.team_id)
            .field("key_id", &self.key_id)
            .field("signing_key", &"<redacted>")
            .field("scope", &self.scope)
            .finish()
    }
}

impl ClientIdentity {
    /// Create a client identity from startup configuration.
    pub fn new(
        client_id: impl Into<String>,
        team_id: impl Into<String>,
        key_id: impl Into<String>,
        signing_key: SecretString,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            team_id: team_id.into(),
            key_id: key_id.into(),
            signing_key,
            scope: scope.into(),
        }
    }
}

/// The identity provider a flow authenticates against.
///
/// One implementation per IdP supplies the client identity plus the four
/// protocol endpoints. The orchestrator is generic over this trait, so
/// provider-specific values live in data rather than in subclassed constants.
pub trait ProviderIdentity: Send + Sync {
    /// The registered client credentials for this provider.
    fn identity(&self) -> &ClientIdentity;

    /// Expected `iss` claim of identity tokens, and the audience of
    /// client-secret assertions.
    fn issuer(&self) -> &str;

    /// Authorization endpoint the user is redirected to.
    fn authorize_endpoint(&self) -> &str;

    /// Token endpoint for the authorization-code exchange.
    fn token_endpoint(&self) -> &str;

    /// Published public-key set endpoint (JWKS).
    fn keys_endpoint(&self) -> &str;

    /// Algorithm the IdP signs identity tokens with. Verification rejects
    /// every other algorithm outright.
    fn id_token_algorithm(&self) -> jsonwebtoken::Algorithm {
        jsonwebtoken::Algorithm::RS256
    }
}

/// Value-based [`ProviderIdentity`] for any compatible IdP.
#[derive(Debug, Clone)]
pub struct IdpProvider {
    identity: ClientIdentity,
    issuer: String,
    authorize_endpoint: String,
    token_endpoint: String,
    keys_endpoint: String,
    id_token_algorithm: jsonwebtoken::Algorithm,
}

impl IdpProvider {
    /// Configure a provider from explicit endpoints.
    pub fn new(
        identity: ClientIdentity,
        issuer: impl Into<String>,
        authorize_endpoint: impl Into<String>,
        token_endpoint: impl Into<String>,
        keys_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            identity,
            issuer: issuer.into(),
            authorize_endpoint: authorize_endpoint.into(),
            token_endpoint: token_endpoint.into(),
            keys_endpoint: keys_endpoint.into(),
            id_token_algorithm: jsonwebtoken::Algorithm::RS256,
        }
    }

    /// Sign in with Apple, using the well-known endpoints.
    pub fn apple(identity: ClientIdentity) -> Self {
        Self::new(
            identity,
            APPLE_ISSUER,
            APPLE_AUTHORIZE_ENDPOINT,
            APPLE_TOKEN_ENDPOINT,
            APPLE_KEYS_ENDPOINT,
        )
    }

    /// Override the identity-token signing algorithm for IdPs that sign
    /// with something other than RS256.
    #[must_use]
    pub fn with_id_token_algorithm(mut self, algorithm: jsonwebtoken::Algorithm) -> Self {
        self.id_token_algorithm = algorithm;
        self
    }
}

impl ProviderIdentity for IdpProvider {
    fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    fn issuer(&self) -> &str {
        &self.issuer
    }

    fn authorize_endpoint(&self) -> &str {
        &self.authorize_endpoint
    }

    fn token_endpoint(&self) -> &str {
        &self.token_endpoint
    }

    fn keys_endpoint(&self) -> &str {
        &self.keys_endpoint
    }

    fn id_token_algorithm(&self) -> jsonwebtoken::Algorithm {
        self.id_token_algorithm
    }
}

/// Validate a redirect URI at flow construction.
///
/// Plain HTTP is accepted only for loopback hosts; everything else must be
/// HTTPS, and fragments are rejected per the OAuth spec.
pub(crate) fn validate_redirect_uri(uri: &str) -> AuthFlowResult<Url> {
    let parsed = Url::parse(uri).map_err(|e| {
        AuthFlowError::configuration(format!("invalid redirect URI '{uri}': {e}"))
    })?;

    match parsed.scheme() {
        "https" => {}
        "http" => {
            let is_loopback = parsed
                .host_str()
                .is_some_and(|host| host == "localhost" || host == "127.0.0.1");
            if !is_loopback {
                return Err(AuthFlowError::configuration(
                    "http redirect URIs are only allowed for localhost",
                ));
            }
        }
        other => {
            return Err(AuthFlowError::configuration(format!(
                "unsupported redirect URI scheme '{other}'"
            )));
        }
    }

    if parsed.fragment().is_some() {
        return Err(AuthFlowError::configuration(
            "redirect URI must not contain a fragment",
        ));
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_identity() -> ClientIdentity {
        ClientIdentity::new(
            "com.example.app",
            "TEAM123456",
            "KEY123456",
            SecretString::from("not-a-real-key".to_string()),
            "name email",
        )
    }

    #[test]
    fn apple_preset_uses_well_known_endpoints() {
        let provider = IdpProvider::apple(test_identity());
        assert_eq!(provider.issuer(), "https://appleid.apple.com");
        assert_eq!(
            provider.keys_endpoint(),
            "https://appleid.apple.com/auth/keys"
        );
        assert_eq!(
            provider.id_token_algorithm(),
            jsonwebtoken::Algorithm::RS256
        );
    }

    #[test]
    fn debug_redacts_signing_key() {
        let rendered = format!("{:?}", test_identity());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("not-a-real-key"));
    }

    #[test]
    fn redirect_uri_requires_https() {
        assert!(validate_redirect_uri("https://example.com/auth/callback").is_ok());
        assert!(validate_redirect_uri("http://example.com/auth/callback").is_err());
        assert!(validate_redirect_uri("http://localhost:8080/callback").is_ok());
        assert!(validate_redirect_uri("http://127.0.0.1:8080/callback").is_ok());
    }

    #[test]
    fn redirect_uri_rejects_fragment_and_garbage() {
        assert!(validate_redirect_uri("https://example.com/cb#frag").is_err());
        assert!(validate_redirect_uri("ftp://example.com/cb").is_err());
        assert!(validate_redirect_uri("not a url").is_err());
    }
}
