//! Wire and claim types shared across the flow.

use serde::{Deserialize, Deserializer, Serialize};

/// Response body of the token endpoint.
///
/// Only `id_token` is consumed by this crate; the access and refresh tokens
/// are surfaced for callers that talk to provider-specific APIs afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// OAuth access token. Unused by the sign-in core itself.
    pub access_token: Option<String>,
    /// Token type, typically `Bearer`.
    pub token_type: Option<String>,
    /// Access-token lifetime in seconds.
    pub expires_in: Option<i64>,
    /// Refresh token, when the IdP issues one.
    pub refresh_token: Option<String>,
    /// The signed identity token. Required for the flow to complete.
    pub id_token: Option<String>,
}

/// OAuth error body returned by the token endpoint on failure.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenErrorResponse {
    /// OAuth error code, e.g. `invalid_grant`.
    pub error: String,
    /// Optional human-readable detail.
    pub error_description: Option<String>,
}

/// Claims carried by a verified identity token.
///
/// `email_verified` and `is_private_email` arrive either as booleans or as
/// the strings `"true"`/`"false"` depending on the IdP, so both are decoded
/// through a tolerant deserializer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Token issuer; must equal the IdP's known issuer string.
    pub iss: String,
    /// Audience; must equal the configured client id. Decoded loosely since
    /// the JWT spec allows either a string or an array here.
    pub aud: serde_json::Value,
    /// Stable subject identifier for the authenticated user.
    pub sub: String,
    /// Issued-at, seconds since the epoch.
    pub iat: u64,
    /// Expiry, seconds since the epoch.
    pub exp: u64,
    /// Email address, if the scope granted it.
    #[serde(default)]
    pub email: Option<String>,
    /// Whether the IdP has verified the email address.
    #[serde(default, deserialize_with = "de_bool_or_string")]
    pub email_verified: Option<bool>,
    /// Whether the email is a private relay address.
    #[serde(default, deserialize_with = "de_bool_or_string")]
    pub is_private_email: Option<bool>,
    /// Nonce echoed from the authorization request. Decoded but not yet
    /// enforced; see the replay-protection note in the crate docs.
    #[serde(default)]
    pub nonce: Option<String>,
}

/// The verified output of a successful flow, handed to the caller's
/// identity resolver. Owned by the caller thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedIdentity {
    /// Stable subject identifier assigned by the IdP.
    pub subject: String,
    /// Verified email address, when present in the claims.
    pub email: Option<String>,
    /// Whether the IdP attests the email as verified.
    pub email_verified: bool,
    /// Display name, when the IdP supplied one (some IdPs only do so on the
    /// user's first authorization).
    pub display_name: Option<String>,
}

impl AuthorizedIdentity {
    /// Build the authorized identity from verified claims plus the optional
    /// first-authorization user payload.
    #[must_use]
    pub fn from_claims(claims: &IdentityClaims, user: Option<&CallbackUser>) -> Self {
        Self {
            subject: claims.sub.clone(),
            email: claims.email.clone(),
            email_verified: claims.email_verified.unwrap_or(false),
            display_name: user.and_then(CallbackUser::display_name),
        }
    }
}

/// User payload some IdPs post alongside the first authorization callback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackUser {
    /// Structured name, when provided.
    #[serde(default)]
    pub name: Option<CallbackUserName>,
    /// Email as posted in the callback. Untrusted; the verified email in the
    /// identity token wins.
    #[serde(default)]
    pub email: Option<String>,
}

/// Name components of the callback user payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackUserName {
    /// Given name.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(default)]
    pub last_name: Option<String>,
}

impl CallbackUser {
    /// Join the name components into a display name, if any are present.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        let name = self.name.as_ref()?;
        let joined = [name.first_name.as_deref(), name.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() { None } else { Some(joined) }
    }
}

/// Where an authorization attempt sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStage {
    /// No attempt in progress.
    Idle,
    /// The user has been redirected to the IdP; awaiting the callback.
    PendingCallback,
    /// Finalize succeeded and claims were handed to the resolver.
    Resolved,
    /// Finalize failed; the failure hook has been invoked.
    Failed,
}

/// Accept booleans either as JSON booleans or as `"true"`/`"false"` strings.
fn de_bool_or_string<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        Text(String),
    }

    Ok(match Option::<BoolOrString>::deserialize(deserializer)? {
        None => None,
        Some(BoolOrString::Bool(b)) => Some(b),
        Some(BoolOrString::Text(s)) => Some(s == "true"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_claims_accept_string_booleans() {
        let claims: IdentityClaims = serde_json::from_value(serde_json::json!({
            "iss": "https://idp.example.com",
            "aud": "com.example.app",
            "sub": "001234.abcd",
            "iat": 1_700_000_000u64,
            "exp": 1_700_000_600u64,
            "email": "user@example.com",
            "email_verified": "true",
            "is_private_email": false,
        }))
        .unwrap();

        assert_eq!(claims.email_verified, Some(true));
        assert_eq!(claims.is_private_email, Some(false));
    }

    #[test]
    fn authorized_identity_prefers_claim_email() {
        let claims: IdentityClaims = serde_json::from_value(serde_json::json!({
            "iss": "https://idp.example.com",
            "aud": "com.example.app",
            "sub": "001234.abcd",
            "iat": 0u64,
            "exp": 60u64,
            "email": "verified@example.com",
            "email_verified": true,
        }))
        .unwrap();

        let user: CallbackUser = serde_json::from_value(serde_json::json!({
            "name": { "firstName": "Jane", "lastName": "Doe" },
            "email": "untrusted@example.com",
        }))
        .unwrap();

        let identity = AuthorizedIdentity::from_claims(&claims, Some(&user));
        assert_eq!(identity.email.as_deref(), Some("verified@example.com"));
        assert_eq!(identity.display_name.as_deref(), Some("Jane Doe"));
        assert!(identity.email_verified);
    }

    #[test]
    fn display_name_handles_partial_names() {
        let user: CallbackUser =
            serde_json::from_value(serde_json::json!({ "name": { "firstName": "Jane" } }))
                .unwrap();
        assert_eq!(user.display_name().as_deref(), Some("Jane"));

        let nameless: CallbackUser = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(nameless.display_name(), None);
    }

    #[test]
    fn token_response_tolerates_missing_optionals() {
        let response: TokenResponse = serde_json::from_value(serde_json::json!({
            "id_token": "header.payload.sig",
        }))
        .unwrap();
        assert_eq!(response.id_token.as_deref(), Some("header.payload.sig"));
        assert!(response.access_token.is_none());
    }
}
