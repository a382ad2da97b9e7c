//! Anti-CSRF state tokens.
//!
//! A state token is an opaque random value generated at `initiate`, stored in
//! the caller's session, echoed back by the IdP, and compared exactly once at
//! `finalize`. A mismatch means the callback was forged or replayed.
//!
//! Validation is timing-attack resistant: both values are hashed with
//! `blake3` to a fixed 32 bytes and compared with `subtle::ConstantTimeEq`,
//! so comparison time is independent of mismatch position and of the two
//! lengths.

use rand::Rng;
use subtle::ConstantTimeEq;

/// URL-safe alphabet for state tokens (64 symbols, 6 bits each).
const STATE_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Default state-token length. 32 symbols over a 64-symbol alphabet gives
/// 192 bits of entropy.
pub const STATE_TOKEN_LENGTH: usize = 32;

/// Generate a state token of the default length.
#[must_use]
pub fn generate_state_token() -> String {
    generate_state_token_len(STATE_TOKEN_LENGTH)
}

/// Generate a state token of a configured length.
#[must_use]
pub fn generate_state_token_len(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..STATE_ALPHABET.len());
            STATE_ALPHABET[idx] as char
        })
        .collect()
}

/// Compare the session's stored state token against the value supplied in
/// the callback.
///
/// Fails closed: an absent or empty session value is never a match. Both
/// values are hashed before comparison so neither mismatch position nor
/// length difference is observable through timing.
///
/// A `false` return means the flow must abort with a forgery error; it is a
/// security failure, not a retryable one.
#[must_use]
pub fn validate_state_token(session_value: Option<&str>, supplied_value: &str) -> bool {
    let Some(session_value) = session_value else {
        tracing::warn!("state validation failed: no state token stored in session");
        return false;
    };
    if session_value.is_empty() || supplied_value.is_empty() {
        tracing::warn!("state validation failed: empty state token");
        return false;
    }

    // Fixed-size hashes make the comparison independent of input lengths.
    let session_hash: [u8; 32] = blake3::hash(session_value.as_bytes()).into();
    let supplied_hash: [u8; 32] = blake3::hash(supplied_value.as_bytes()).into();

    session_hash.ct_eq(&supplied_hash).into()
}
