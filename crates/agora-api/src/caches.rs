//! In-memory caches: the service-account allowlist and the IP blocklist.
//!
//! Both are read-concurrent, writer-exclusive (`tokio::sync::RwLock`).
//! The allowlist is refreshed periodically from configuration; blocklist
//! entries carry a TTL and are purged lazily on read.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

/// Minimum block TTL in seconds.
pub const MIN_BLOCK_TTL_SECS: u64 = 1;

/// Maximum block TTL in seconds (30 days).
pub const MAX_BLOCK_TTL_SECS: u64 = 30 * 86_400;

/// Default block TTL when the caller omits one (1 hour).
pub const DEFAULT_BLOCK_TTL_SECS: u64 = 3_600;

/// The service accounts allowed through `POST /auth/service`.
pub struct AllowlistCache {
    entries: RwLock<HashSet<String>>,
}

impl AllowlistCache {
    /// Seed the allowlist with the configured account emails.
    pub fn new(accounts: &[String]) -> Self {
        Self {
            entries: RwLock::new(accounts.iter().cloned().collect()),
        }
    }

    /// Whether an account email is on the allowlist.
    pub async fn contains(&self, email: &str) -> bool {
        self.entries.read().await.contains(email)
    }

    /// Replace the allowlist contents (periodic refresh).
    pub async fn replace(&self, accounts: Vec<String>) {
        let mut entries = self.entries.write().await;
        *entries = accounts.into_iter().collect();
    }
}

/// TTL-bounded IP blocklist.
pub struct IpBlocklist {
    entries: RwLock<HashMap<String, Instant>>,
}

impl IpBlocklist {
    /// An empty blocklist.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Block an address for `ttl`; an existing entry is extended.
    pub async fn block(&self, ip: &str, ttl: Duration) {
        let mut entries = self.entries.write().await;
        entries.insert(ip.to_owned(), Instant::now() + ttl);
    }

    /// Whether an address is currently blocked. Expired entries are
    /// purged on the way through.
    pub async fn is_blocked(&self, ip: &str) -> bool {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(ip) {
                Some(expiry) if *expiry > now => return true,
                None => return false,
                Some(_) => {}
            }
        }
        // Expired: take the write lock to drop it.
        let mut entries = self.entries.write().await;
        if entries.get(ip).is_some_and(|expiry| *expiry <= now) {
            entries.remove(ip);
        }
        false
    }

    /// The currently blocked addresses, expired entries excluded.
    pub async fn list(&self) -> Vec<String> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        let mut ips: Vec<String> = entries
            .iter()
            .filter(|(_, expiry)| **expiry > now)
            .map(|(ip, _)| ip.clone())
            .collect();
        ips.sort();
        ips
    }
}

impl Default for IpBlocklist {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allowlist_membership_and_refresh() {
        let cache = AllowlistCache::new(&["svc@project.iam".to_owned()]);
        assert!(cache.contains("svc@project.iam").await);
        assert!(!cache.contains("other@project.iam").await);

        cache.replace(vec!["other@project.iam".to_owned()]).await;
        assert!(!cache.contains("svc@project.iam").await);
        assert!(cache.contains("other@project.iam").await);
    }

    #[tokio::test]
    async fn blocklist_respects_ttl() {
        let blocklist = IpBlocklist::new();
        blocklist.block("10.0.0.1", Duration::from_secs(60)).await;
        assert!(blocklist.is_blocked("10.0.0.1").await);
        assert!(!blocklist.is_blocked("10.0.0.2").await);
        assert_eq!(blocklist.list().await, vec!["10.0.0.1".to_owned()]);

        blocklist.block("10.0.0.3", Duration::from_millis(0)).await;
        assert!(!blocklist.is_blocked("10.0.0.3").await);
    }
}
