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

//! Pairwise pseudonymous identifiers.
//!
//! Every holder owns a 256-bit secret [`Seed`] per credential type. A verifier
//! sees the holder under `base64url(HMAC-SHA256(seed, domain))`, where
//! `domain` is the canonicalized host of the verifier. The identifier is
//! stable for a given verifier, so it can be used to detect duplicate
//! registrations, but different verifiers cannot link their identifiers
//! without the seed.
//!
//! Seeds are kept in a [`SeedRegistry`]. Once issued, a seed stays the same
//! across credential renewals until it is explicitly invalidated.
//!
//! # Examples
//!
//! ```
//! # #[tokio::main]
//! # async fn main() {
//! use bh_pseudonym::{derive_pseudonym, generate_or_retrieve_seed, SeedRegistry};
//!
//! let registry = SeedRegistry::new();
//! let seed = generate_or_retrieve_seed(&registry, "holder-1", "EmailCredential")
//!     .await
//!     .unwrap();
//!
//! let forum = derive_pseudonym(&seed, "forum.example.com").unwrap();
//! assert_eq!(forum, derive_pseudonym(&seed, "WWW.Forum.Example.com").unwrap());
//! assert_ne!(forum, derive_pseudonym(&seed, "other.example.com").unwrap());
//! # }
//! ```

mod domain;
mod error;
mod pseudonym;
mod seed;

pub use domain::{canonicalize_domain, registrable_domain};
pub use error::{Error, Result};
pub use pseudonym::{derive_pseudonym, derive_site_pseudonym, Seed, ENCODED_LENGTH, SEED_LENGTH};
pub use seed::{generate_or_retrieve_seed, SeedKey, SeedRegistry};
