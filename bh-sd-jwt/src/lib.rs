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

//! This crate implements [Selective Disclosure for JWTs (SD-JWT)][1] for
//! JWT Verifiable Credentials.
//!
//! [1]: <https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt>
//!
//! # Details
//!
//! A disclosable claim is removed from the claims and replaced by the
//! `base64url(SHA-256(disclosure))` digest in an `_sd` array, where the
//! disclosure is the base64url encoding of the JSON array
//! `[salt, claim_name, claim_value]`. The disclosures travel next to the
//! issuer-signed JWT as `<jwt>~<disclosure 1>~...~<disclosure N>~`, and a
//! holder reveals a claim by keeping its disclosure in the token.
//!
//! * [`encode_disclosable`] conceals claims and [`decode_claims`] reveals
//!   them again. Decoding with every disclosure yields exactly the original
//!   claims.
//! * [`issue_sd_jwt`] signs a credential whose subject is selectively
//!   disclosable, and [`SdJwt::select`] narrows it down for a presentation.
//! * [`decode_disclosed`] reveals chosen disclosures of a token without
//!   checking its signature; [`verify_sd_jwt`] verifies the credential first.
//!
//! A presented disclosure that is not committed to by a digest in the signed
//! claims is never silently ignored: decoding fails with
//! [`Error::DigestMismatch`].
//!
//! # Examples
//!
//! ```
//! use bh_jws_utils::json_object;
//! use bh_sd_jwt::{decode_claims, encode_disclosable};
//!
//! let claims = json_object!({ "given_name": "Ada", "family_name": "Lovelace" });
//!
//! let encoded = encode_disclosable(&claims, &["given_name"]).unwrap();
//! assert!(encoded.claims.get("given_name").is_none());
//!
//! let revealed = decode_claims(&encoded.claims, &encoded.disclosures).unwrap();
//! assert_eq!(revealed, claims);
//! ```

mod decoder;
mod disclosure;
mod encoder;
mod error;
mod hasher;
mod issuer;
mod sd_jwt;
mod verifier;

pub use decoder::*;
pub use disclosure::*;
pub use encoder::*;
pub use error::*;
pub use hasher::*;
pub use issuer::*;
pub use sd_jwt::*;
pub use verifier::*;
