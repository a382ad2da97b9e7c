//! Fetching the IdP's published key set.
//!
//! Identity tokens are verified against the IdP's rotating public keys. The
//! fetcher retrieves the JWKS document on demand, with a short-TTL cache:
//! the keys rotate infrequently, so a bounded cache saves a network round
//! trip per sign-in without risking a stale set for long. Failures are never
//! cached — an unverifiable token must fail, not be trusted.
//!
//! The fetch is the only retryable operation in the flow (it is idempotent);
//! it gets a small number of attempts with backoff before giving up.

use std::time::{Duration, SystemTime};

use jsonwebtoken::jwk::JwkSet;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{AuthFlowError, AuthFlowResult};

/// How long a fetched key set may be served from cache.
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Attempts per fetch, including the first.
const FETCH_ATTEMPTS: u32 = 3;

/// Base delay between attempts; doubles each retry.
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
struct CachedKeySet {
    keys: JwkSet,
    fetched_at: SystemTime,
    ttl: Duration,
}

impl CachedKeySet {
    fn is_fresh(&self) -> bool {
        match SystemTime::now().duration_since(self.fetched_at) {
            Ok(age) => age < self.ttl,
            // Clock went backwards; treat the entry as stale.
            Err(_) => false,
        }
    }
}

/// Fetches and caches the IdP's public key set.
#[derive(Debug)]
pub struct KeySetFetcher {
    keys_uri: String,
    http_client: reqwest::Client,
    cache: RwLock<Option<CachedKeySet>>,
    /// Serializes refreshes so concurrent misses trigger one fetch.
    refresh_lock: Mutex<()>,
    cache_ttl: Duration,
}

impl KeySetFetcher {
    /// Create a fetcher for the given keys endpoint with the default TTL.
    ///
    /// # Errors
    ///
    /// Returns [`AuthFlowError::Configuration`] if the HTTP client cannot be
    /// constructed.
    pub fn new(keys_uri: impl Into<String>) -> AuthFlowResult<Self> {
        Self::with_ttl(keys_uri, DEFAULT_CACHE_TTL)
    }

    /// Create a fetcher with a custom cache TTL.
    ///
    /// Shorter TTLs pick up key rotation faster; longer TTLs save requests.
    ///
    /// # Errors
    ///
    /// Returns [`AuthFlowError::Configuration`] if the HTTP client cannot be
    /// constructed.
    pub fn with_ttl(keys_uri: impl Into<String>, cache_ttl: Duration) -> AuthFlowResult<Self> {
        let keys_uri = keys_uri.into();

        // TLS is the only thing authenticating this document.
        if !keys_uri.starts_with("https://")
            && !keys_uri.starts_with("http://localhost")
            && !keys_uri.starts_with("http://127.0.0.1")
        {
            return Err(AuthFlowError::configuration(
                "keys endpoint must use HTTPS (plain HTTP is allowed only for localhost)",
            ));
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                AuthFlowError::configuration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            keys_uri,
            http_client,
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            cache_ttl,
        })
    }

    /// The configured keys endpoint.
    pub fn keys_uri(&self) -> &str {
        &self.keys_uri
    }

    /// Return the current key set, from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns [`AuthFlowError::Transient`] when the endpoint is unreachable
    /// or returns an unparseable document after all retry attempts.
    pub async fn fetch(&self) -> AuthFlowResult<JwkSet> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_fresh() {
                    debug!(keys_uri = %self.keys_uri, "serving key set from cache");
                    return Ok(cached.keys.clone());
                }
            }
        }

        // One refresh at a time; whoever loses the race reuses the winner's
        // result via the re-check below.
        let _guard = self.refresh_lock.lock().await;
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_fresh() {
                    return Ok(cached.keys.clone());
                }
            }
        }

        let keys = self.fetch_with_retry().await?;
        let mut cache = self.cache.write().await;
        *cache = Some(CachedKeySet {
            keys: keys.clone(),
            fetched_at: SystemTime::now(),
            ttl: self.cache_ttl,
        });
        Ok(keys)
    }

    /// Discard any cached key set and fetch a fresh one.
    ///
    /// Used after a verification failure, in case the IdP rotated keys since
    /// the cache was filled.
    ///
    /// # Errors
    ///
    /// Returns [`AuthFlowError::Transient`] on fetch failure; the stale
    /// cache entry is dropped either way.
    pub async fn refresh(&self) -> AuthFlowResult<JwkSet> {
        let _guard = self.refresh_lock.lock().await;
        {
            let mut cache = self.cache.write().await;
            *cache = None;
        }

        let keys = self.fetch_with_retry().await?;
        let mut cache = self.cache.write().await;
        *cache = Some(CachedKeySet {
            keys: keys.clone(),
            fetched_at: SystemTime::now(),
            ttl: self.cache_ttl,
        });
        Ok(keys)
    }

    async fn fetch_with_retry(&self) -> AuthFlowResult<JwkSet> {
        let mut backoff = RETRY_BACKOFF;
        let mut last_error = None;

        for attempt in 1..=FETCH_ATTEMPTS {
            match self.fetch_once().await {
                Ok(keys) => {
                    info!(
                        keys_uri = %self.keys_uri,
                        key_count = keys.keys.len(),
                        attempt,
                        "fetched key set"
                    );
                    return Ok(keys);
                }
                Err(e) => {
                    warn!(
                        keys_uri = %self.keys_uri,
                        attempt,
                        error = %e,
                        "key set fetch failed"
                    );
                    last_error = Some(e);
                    if attempt < FETCH_ATTEMPTS {
                        tokio::time::sleep(backoff).await;
                        backoff *= 2;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AuthFlowError::transient("key set fetch never attempted")))
    }

    async fn fetch_once(&self) -> AuthFlowResult<JwkSet> {
        let response = self
            .http_client
            .get(&self.keys_uri)
            .send()
            .await
            .map_err(|e| AuthFlowError::transient(format!("key set request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AuthFlowError::transient(format!(
                "keys endpoint returned status {}",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthFlowError::transient(format!("invalid key set document: {e}")))
    }
}
