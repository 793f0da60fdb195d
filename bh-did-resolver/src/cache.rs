// Copyright (C) 2020-2026  The Blockhouse Technology Limited (TBTL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::{
    collections::HashMap,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use bh_jws_utils::PublicKey;
use tokio::sync::RwLock;

/// Source of the current time, in seconds since the Unix epoch.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> u64;
}

/// [`Clock`] backed by the system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default()
    }
}

/// A resolved key and the instant from which it must no longer be served.
#[derive(Debug, Clone)]
pub struct CachedKey {
    /// The resolved key.
    pub public_key: PublicKey,
    /// Expiry, in seconds since the Unix epoch.
    pub expires_at: u64,
}

impl CachedKey {
    fn is_fresh(&self, now: u64) -> bool {
        now < self.expires_at
    }
}

/// Time-bounded cache of resolved keys, keyed by DID.
///
/// Expired entries are never returned. Concurrent fills of the same DID
/// resolve to a single winner: [`KeyCache::get_or_insert`] keeps the entry
/// that was stored first and hands it to every later caller.
#[derive(Debug)]
pub struct KeyCache<K: Clock = SystemClock> {
    entries: RwLock<HashMap<String, CachedKey>>,
    ttl: Duration,
    clock: K,
}

impl<K: Clock> KeyCache<K> {
    /// Create an empty cache whose entries live for `ttl`.
    pub fn new(ttl: Duration, clock: K) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    /// The cached key for `did`, unless missing or expired.
    pub async fn get(&self, did: &str) -> Option<PublicKey> {
        let now = self.clock.now();
        let entries = self.entries.read().await;

        entries
            .get(did)
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| entry.public_key.clone())
    }

    /// Store `public_key` for `did` unless a fresh entry already exists, and
    /// return the stored key.
    pub async fn get_or_insert(&self, did: &str, public_key: PublicKey) -> PublicKey {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;

        if let Some(existing) = entries.get(did).filter(|entry| entry.is_fresh(now)) {
            return existing.public_key.clone();
        }

        entries.retain(|_, entry| entry.is_fresh(now));
        entries.insert(
            did.to_owned(),
            CachedKey {
                public_key: public_key.clone(),
                expires_at: now.saturating_add(self.ttl.as_secs()),
            },
        );

        public_key
    }

    /// Remove the entry of `did`, returning whether there was one.
    pub async fn invalidate(&self, did: &str) -> bool {
        self.entries.write().await.remove(did).is_some()
    }

    /// Remove every entry.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
