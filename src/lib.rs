//! # idp-signin - Authorization-Code Sign-In Core
//!
//! Protocol core of a "Sign in with X" OAuth2/OpenID-Connect
//! authorization-code flow against an identity provider that issues signed
//! identity tokens and publishes a rotating public-key set. Apple's flavor
//! of the flow (`form_post` callbacks, an ES256-signed JWT in place of a
//! static client secret) is the reference deployment, available as a preset.
//!
//! The crate owns the cryptographic and protocol-state machinery:
//!
//! - CSRF-safe state-token lifecycle with constant-time validation
//! - Short-lived signed client-secret assertions (60 second expiry)
//! - The authorization-code → identity-token exchange
//! - Identity-token verification against the IdP's published key set, with
//!   a strict algorithm allowlist
//! - The three-step orchestration: initiate → callback carry → finalize
//!
//! HTTP routing, session storage, and user persistence stay with the
//! embedding application, plugged in through the [`flow::SessionBinding`]
//! and [`flow::IdentityResolver`] traits. The resolver — including its
//! mandatory failure hook — is a constructor parameter: a flow with no
//! failure handling does not compile.
//!
//! ## Architecture
//!
//! - [`config`] - immutable `ClientIdentity` and the `ProviderIdentity` seam
//! - [`state`] - anti-CSRF state tokens
//! - [`secret`] - client-secret assertion minting
//! - [`jwks`] - key-set fetching with a short-TTL cache and bounded retry
//! - [`exchange`] - the authorization-code exchange
//! - [`verify`] - identity-token verification
//! - [`flow`] - the orchestrator and collaborator traits
//! - [`error`] - the five-class error taxonomy
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use idp_signin::{
//!     AuthFlowError, AuthorizationFlow, AuthorizedIdentity, ClientIdentity, IdentityResolver,
//!     IdpProvider,
//! };
//! use secrecy::SecretString;
//!
//! struct Resolver;
//!
//! #[async_trait]
//! impl IdentityResolver for Resolver {
//!     type Output = String;
//!
//!     async fn resolve_identity(&self, identity: AuthorizedIdentity) -> String {
//!         identity.subject
//!     }
//!
//!     async fn on_authorization_failed(&self, error: &AuthFlowError) {
//!         eprintln!("sign-in failed: {error}");
//!     }
//! }
//!
//! # fn main() -> Result<(), AuthFlowError> {
//! let identity = ClientIdentity::new(
//!     "com.example.app",
//!     "TEAM123456",
//!     "KEY123456",
//!     SecretString::from(std::env::var("SIGNING_KEY_PEM").unwrap()),
//!     "name email",
//! );
//!
//! let flow = AuthorizationFlow::new(
//!     IdpProvider::apple(identity),
//!     "https://example.com/auth/callback",
//!     Resolver,
//! )?;
//! # let _ = flow;
//! # Ok(())
//! # }
//! ```
//!
//! ## Replay protection
//!
//! A `nonce` claim is decoded from identity tokens but not yet correlated
//! back to the initiate step. Closing that loop (generating a nonce at
//! initiate and requiring it in the verified claims) is a deliberate future
//! hardening step, not an existing contract.

pub mod config;
pub mod error;
pub mod exchange;
pub mod flow;
pub mod jwks;
pub mod secret;
pub mod state;
pub mod types;
pub mod verify;

#[doc(inline)]
pub use config::{ClientIdentity, IdpProvider, ProviderIdentity};
#[doc(inline)]
pub use error::{AuthFlowError, AuthFlowResult};
#[doc(inline)]
pub use exchange::TokenExchangeClient;
#[doc(inline)]
pub use flow::{
    AuthorizationFlow, CallbackParams, FinalizedAuthorization, IdentityResolver,
    InitiatedAuthorization, SessionBinding,
};
#[doc(inline)]
pub use jwks::KeySetFetcher;
#[doc(inline)]
pub use secret::ClientSecretSigner;
#[doc(inline)]
pub use state::{generate_state_token, validate_state_token, STATE_TOKEN_LENGTH};
#[doc(inline)]
pub use types::{AuthorizedIdentity, FlowStage, IdentityClaims, TokenResponse};
#[doc(inline)]
pub use verify::IdentityTokenVerifier;
