//! Access-token cache for client-credential vendors.
//!
//! One slot per provider and credential. Concurrent refreshes of the same
//! slot coalesce: the first caller refreshes while holding the slot lock,
//! later callers wait and reuse its token.

use parking_lot::Mutex;
use std::{
    collections::HashMap,
    future::Future,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use wcore::Result;

/// A bearer token issued by a token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// The token value.
    pub value: String,
    /// Issue time, seconds since the epoch.
    pub issued_at: u64,
    /// Lifetime in seconds.
    pub expires_in: u64,
}

impl AccessToken {
    /// Whether the token is past its lifetime at `now`.
    pub fn is_expired(&self, now: u64) -> bool {
        now.saturating_sub(self.issued_at) > self.expires_in
    }
}

type Slot = Arc<tokio::sync::Mutex<Option<AccessToken>>>;

/// Shared token cache.
pub struct TokenCache {
    slots: Mutex<HashMap<String, Slot>>,
    clock: fn() -> u64,
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCache {
    /// A cache reading the system clock.
    pub fn new() -> Self {
        Self::with_clock(system_now)
    }

    /// A cache reading `clock` for the current time in seconds.
    pub fn with_clock(clock: fn() -> u64) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Current time as seen by the cache.
    pub fn now(&self) -> u64 {
        (self.clock)()
    }

    fn slot(&self, key: &str) -> Slot {
        self.slots.lock().entry(key.to_owned()).or_default().clone()
    }

    /// Store a token for `key`.
    pub async fn insert(&self, key: &str, token: AccessToken) {
        *self.slot(key).lock().await = Some(token);
    }

    /// The cached token for `key`, fresh or not.
    pub async fn get(&self, key: &str) -> Option<AccessToken> {
        self.slot(key).lock().await.clone()
    }

    /// Return a valid token for `key`, calling `refresh` when the cached one
    /// is missing or expired.
    ///
    /// A failed refresh leaves the slot as it was.
    pub async fn get_or_refresh<F, Fut>(&self, key: &str, refresh: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccessToken>>,
    {
        let slot = self.slot(key);
        let mut cached = slot.lock().await;
        if let Some(token) = cached.as_ref()
            && !token.is_expired(self.now())
        {
            return Ok(token.value.clone());
        }

        tracing::debug!("refreshing access token for {key}");
        let token = refresh().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }
}

fn system_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fixed() -> u64 {
        1_000
    }

    fn token(value: &str, issued_at: u64) -> AccessToken {
        AccessToken {
            value: value.into(),
            issued_at,
            expires_in: 100,
        }
    }

    #[test]
    fn expiry_is_strictly_after_lifetime() {
        let t = token("a", 900);
        assert!(!t.is_expired(1_000));
        assert!(t.is_expired(1_001));
    }

    #[tokio::test]
    async fn fresh_token_skips_refresh() {
        let cache = TokenCache::with_clock(fixed);
        cache.insert("baidu:k", token("cached", 950)).await;
        let value = cache
            .get_or_refresh("baidu:k", || async {
                Err::<AccessToken, _>(wcore::Error::Config("refresh not expected".into()))
            })
            .await
            .unwrap();
        assert_eq!(value, "cached");
    }

    #[tokio::test]
    async fn concurrent_refreshes_coalesce() {
        let cache = Arc::new(TokenCache::with_clock(fixed));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_refresh("baidu:k", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        Ok::<_, wcore::Error>(token("fresh", 1_000))
                    })
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "fresh");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
