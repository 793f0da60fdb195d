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

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! This crate resolves [Decentralized Identifiers][1] to the public keys used
//! to verify credentials and presentations.
//!
//! [1]: https://www.w3.org/TR/did-core/
//!
//! # Details
//!
//! The [`DidResolver`] supports `did:web`, fetched over HTTPS, and `did:jwk`,
//! whose key is embedded in the identifier. Whatever the method, only EC keys
//! on P-256, P-384 and P-521 are accepted.
//!
//! Resolved keys are kept in a [`KeyCache`] for 30 minutes by default. The
//! cache is safe to share between concurrent verifications: when two callers
//! resolve the same uncached DID at once, both observe the key stored first.
//!
//! Fetches are bounded by a timeout and retried at most once. Verification
//! code should depend on the [`KeyResolver`] trait so tests can count or
//! script resolutions.
//!
//! # Examples
//!
//! ```no_run
//! use bh_did_resolver::{DidResolver, KeyResolver, ResolverConfig};
//!
//! # async fn run() {
//! let resolver = DidResolver::new(ResolverConfig::default()).unwrap();
//!
//! let key = resolver
//!     .resolve("did:web:issuer.example#key-1")
//!     .await
//!     .unwrap();
//! println!("issuer key is {}", key.key_type());
//! # }
//! ```

mod cache;
mod config;
mod did;
mod document;
mod error;
mod fetch;
mod resolver;

pub use cache::*;
pub use config::*;
pub use did::*;
pub use document::*;
pub use error::*;
pub use fetch::*;
pub use resolver::*;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
