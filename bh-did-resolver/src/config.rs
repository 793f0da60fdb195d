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

use std::time::Duration;

/// How long a resolved key may be served from the cache.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// Upper bound for a single fetch of a remote document.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause before the single retry of a failed fetch.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Number of retries after the first failed fetch.
pub const MAX_FETCH_RETRIES: usize = 1;

/// Timeout and retry settings of remote fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Upper bound for a single attempt.
    pub timeout: Duration,
    /// Pause before the retry.
    pub retry_backoff: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

/// Settings of a [`DidResolver`](crate::DidResolver).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Lifetime of a cached key.
    pub cache_ttl: Duration,
    /// Settings of document fetches.
    pub fetch: FetchPolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            fetch: FetchPolicy::default(),
        }
    }
}
