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

//! This crate provides functions and types for working with an ordered array of X.509 certificates
//! (`x5chain`) as defined in [RFC 9360][1].
//!
//! [1]: <https://www.rfc-editor.org/rfc/rfc9360.html#section-2-5.4.1>
//!
//! # Details
//!
//! The primary API this crate offers is the [`X5Chain`] struct. It is used to carry the issuer
//! certificate of a mobile document (COSE header label `33`), to check that every certificate is
//! within its validity window, and to verify the chain against a set of trusted roots.
//!
//! # Examples
//!
//! ```ignore
//! let x5chain = bhx5chain::X5Chain::from_raw_bytes(&der_certificates).expect("valid x5chain");
//!
//! x5chain.check_validity(now).expect("certificates are currently valid");
//!
//! let trust = bhx5chain::X509Trust::new(vec![trusted_root_certificate]);
//! x5chain
//!     .verify_against_trusted_roots(&trust)
//!     .expect("trusted x5chain");
//!```
//!
//! ## Issuing Test Chains
//!
//! The [`Builder`] is a lightweight certificate authority for tests and demos. It creates a
//! self-signed root and issues leaf certificates with a chosen [`Validity`], which is how expired
//! or not yet valid certificates are produced without shelling out to the `openssl` tool.
//!
//! ```
//! use bh_jws_utils::{KeyType, SigningKey};
//! use bhx5chain::{Builder, Validity};
//!
//! let builder = Builder::generate_root("Test IACA", Validity::days_from_now(0, 365)).unwrap();
//! let leaf_key = SigningKey::generate(KeyType::EcP256).unwrap();
//!
//! let x5chain = builder
//!     .generate_x5chain(&leaf_key.public_key_pem().unwrap(), Validity::days_from_now(0, 30))
//!     .unwrap();
//!
//! x5chain.verify_against_trusted_roots(&builder.trust()).unwrap();
//! ```

mod builder;
mod error;
mod x5chain;

pub use builder::*;
pub use error::*;
pub use x5chain::*;
