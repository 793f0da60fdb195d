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

//! This crate signs and verifies [W3C Verifiable Credentials][1] and
//! Presentations carried as compact JWTs.
//!
//! [1]: https://www.w3.org/TR/vc-data-model/#json-web-token
//!
//! # Details
//!
//! Credentials are signed with [`sign_credential`] and presentations with
//! [`sign_presentation`]. The signing algorithm is implied by the type of the
//! signer's key.
//!
//! A [`JwtVerifier`] resolves the signer's key through a
//! [`KeyResolver`](bh_did_resolver::KeyResolver) and then checks, in order
//! and each as a hard failure:
//!
//! 1. the token parses and carries credential or presentation claims,
//! 2. the issuer (or holder) DID resolves to a key,
//! 3. the signature verifies with that key, within the algorithm family
//!    implied by the key and never by the token's `alg` header,
//! 4. `exp` and `nbf` against the caller-supplied current time,
//! 5. for credentials, `vc.expirationDate` if present,
//! 6. for presentations, `jti` against the expected nonce and the expected
//!    audience against `aud`.
//!
//! # Examples
//!
//! ```no_run
//! use bh_did_resolver::{DidResolver, ResolverConfig};
//! use bh_vc_jwt::JwtVerifier;
//!
//! # async fn run(token: &str, now: u64) {
//! let verifier = JwtVerifier::new(DidResolver::new(ResolverConfig::default()).unwrap());
//!
//! let claims = verifier.verify_credential(token, now).await.unwrap();
//! println!("credential issued by {}", claims.iss);
//! # }
//! ```

mod error;
mod models;
mod sign;
mod verifier;

pub use error::*;
pub use models::*;
pub use sign::*;
pub use verifier::*;
