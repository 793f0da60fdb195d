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

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::{Result, Seed};

/// Identifies the seed of one holder for one credential type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeedKey {
    /// Stable identifier of the holder.
    pub holder_uid: String,
    /// The credential type the seed is issued into.
    pub credential_type: String,
}

impl SeedKey {
    /// Create a new [`SeedKey`].
    pub fn new(holder_uid: impl Into<String>, credential_type: impl Into<String>) -> Self {
        Self {
            holder_uid: holder_uid.into(),
            credential_type: credential_type.into(),
        }
    }
}

/// Seeds issued so far, keyed by holder and credential type.
///
/// A stored seed is never replaced: concurrent inserts for the same key
/// resolve to the seed stored first, which every caller then observes. The
/// only way to obtain a new seed is to [`invalidate`](SeedRegistry::invalidate)
/// the old one.
#[derive(Debug, Default)]
pub struct SeedRegistry {
    seeds: RwLock<HashMap<SeedKey, Seed>>,
}

impl SeedRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored seed of `key`.
    pub async fn get(&self, key: &SeedKey) -> Option<Seed> {
        self.seeds.read().await.get(key).cloned()
    }

    /// Store `seed` for `key` unless a seed already exists, and return the
    /// stored seed.
    pub async fn get_or_insert(&self, key: &SeedKey, seed: Seed) -> Seed {
        self.seeds
            .write()
            .await
            .entry(key.clone())
            .or_insert(seed)
            .clone()
    }

    /// Remove the seed of `key`, returning whether there was one.
    pub async fn invalidate(&self, key: &SeedKey) -> bool {
        let removed = self.seeds.write().await.remove(key).is_some();
        if removed {
            tracing::info!(credential_type = %key.credential_type, "opaque id seed revoked");
        }

        removed
    }

    /// Number of stored seeds.
    pub async fn len(&self) -> usize {
        self.seeds.read().await.len()
    }

    /// Returns `true` if no seed is stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Return the seed of `holder_uid` for `credential_type`, drawing and storing
/// a fresh one on first use.
///
/// Repeated calls return the same seed until it is invalidated, so renewed
/// credentials carry the seed of the original issuance.
pub async fn generate_or_retrieve_seed(
    registry: &SeedRegistry,
    holder_uid: &str,
    credential_type: &str,
) -> Result<Seed> {
    let key = SeedKey::new(holder_uid, credential_type);

    if let Some(seed) = registry.get(&key).await {
        return Ok(seed);
    }

    let candidate = Seed::generate()?;
    let seed = registry.get_or_insert(&key, candidate.clone()).await;

    if seed == candidate {
        tracing::debug!(%credential_type, "opaque id seed created");
    }

    Ok(seed)
}
