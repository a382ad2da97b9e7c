//! Error taxonomy for the sign-in flow.
//!
//! Every failure in the flow falls into one of five classes, and only one of
//! them (`Transient`) is ever worth retrying:
//!
//! - [`AuthFlowError::Forgery`] — state-token mismatch. A security event:
//!   someone replayed or fabricated a callback. Never retried.
//! - [`AuthFlowError::Protocol`] — the IdP rejected or mangled the code
//!   exchange. Authorization codes are single-use, so retrying cannot succeed.
//! - [`AuthFlowError::Verification`] — any single failed check on the
//!   identity token. All-or-nothing: there is no partially trusted token.
//! - [`AuthFlowError::Transient`] — network failure fetching the key set.
//!   Retryable with bounded attempts; once exhausted it must be treated as a
//!   verification failure (cannot verify ⇒ must not trust).
//! - [`AuthFlowError::Configuration`] — malformed key material or missing
//!   configuration. Fatal at startup or first use, not a per-request state.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type AuthFlowResult<T> = Result<T, AuthFlowError>;

/// Errors raised by the authorization-code sign-in flow.
#[derive(Debug, Error)]
pub enum AuthFlowError {
    /// The supplied state token did not match the session's stored value,
    /// or the session had no stored value at all.
    #[error("state token mismatch: authorization flow forgery suspected")]
    Forgery,

    /// The IdP returned an error or a malformed response during the
    /// authorization-code exchange.
    #[error("token exchange failed: {reason}")]
    Protocol {
        /// What the IdP sent back, or what was missing from its response.
        reason: String,
    },

    /// A check on the identity token failed: bad signature, unknown key,
    /// disallowed algorithm, wrong issuer or audience, or time bounds.
    #[error("identity token verification failed: {reason}")]
    Verification {
        /// The specific check that failed.
        reason: String,
    },

    /// A network or parse failure while fetching the IdP's key set.
    #[error("transient failure fetching key set: {reason}")]
    Transient {
        /// The underlying network or decode failure.
        reason: String,
    },

    /// Malformed signing key or otherwise unusable configuration.
    #[error("configuration error: {reason}")]
    Configuration {
        /// What is wrong with the configuration.
        reason: String,
    },
}

impl AuthFlowError {
    /// Build a protocol error from any displayable cause.
    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
        }
    }

    /// Build a verification error from any displayable cause.
    pub fn verification(reason: impl Into<String>) -> Self {
        Self::Verification {
            reason: reason.into(),
        }
    }

    /// Build a transient error from any displayable cause.
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient {
            reason: reason.into(),
        }
    }

    /// Build a configuration error from any displayable cause.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Whether a bounded retry is ever appropriate for this error.
    ///
    /// Only key-set fetches are idempotent; everything else in the flow is
    /// single-use (codes) or deterministic (signing), so retrying repeats
    /// the failure or, worse, replays a credential.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Whether this error should be surfaced as a security event rather
    /// than an operational failure.
    #[must_use]
    pub fn is_security_event(&self) -> bool {
        matches!(self, Self::Forgery)
    }

    /// Collapse an exhausted transient failure into a verification failure.
    ///
    /// An unverifiable token and an invalid token must be indistinguishable
    /// to the caller: neither grants trust.
    #[must_use]
    pub fn into_verification(self) -> Self {
        match self {
            Self::Transient { reason } => Self::Verification {
                reason: format!("key set unavailable: {reason}"),
            },
            other => other,
        }
    }
}
