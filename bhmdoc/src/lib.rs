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

//! This crate provides the functionality for handling mobile driving licenses (mDLs) and other
//! `mso_mdoc` Credentials in compliance with the [ISO/IEC 18013-5:2021][1] & [ISO/IEC TS
//! 18013-7:2024][2] standards, presented over OpenID for [Verifiable Presentations][3].
//!
//! [1]: <https://www.iso.org/standard/69084.html>
//! [2]: <https://www.iso.org/standard/82772.html>
//! [3]: <https://openid.net/specs/openid-4-verifiable-presentations-1_0.html>
//!
//! # Details
//!
//! The crate defines multiple modules, which can be roughly divided as follows.
//!
//!   * High-level modules: [`device`], [`issuer`] and [`validator`].
//!   * The [`error`] module describing the error values.
//!   * Low-level data model -- [`models`].
//!
//! The Issuer signs the Mobile Security Object with the private key of the
//! leaf of an `x5chain`, which travels in the unprotected header (label 33) of
//! the `IssuerAuth`. The [`Validator`] ties that chain back to the trusted
//! IACA roots and reports the outcome of every check separately.
//!
//! # Examples
//!
//! ## Issuing a Mobile Driving License (mDL)
//!
//! ```ignore
//! let mut rng = rand::rng();
//! let issuer_signer = _; // Implementation of [`bh_jws_utils::Signer`]
//! let x5chain = _; // `bhx5chain::X5Chain` whose leaf holds the key of `issuer_signer`
//! let device_key = _; // Instance of [`bhmdoc::DeviceKey`].
//! let validity_info = _; // Instance of [`bhmdoc::models::data_retrieval::device_retrieval::issuer_auth::ValidityInfo`]
//!
//! let issued = bhmdoc::Issuer
//!     .issue_mdl(mdl_mandatory, device_key, &issuer_signer, &x5chain, &mut rng, validity_info)
//!     .unwrap();
//! let issuer_signed = issued.serialize_issuer_signed().unwrap();
//! ```
//!
//! ## Validating a Presented `mso_mdoc` Credential
//!
//! ```no_run
//! let trust = bhx5chain::X509Trust::new(Vec::new()); // IACA roots
//! let session = bhmdoc::PresentationSession::new(
//!     "example verifier client id",
//!     "https://example.response.uri",
//!     "example nonce",
//!     "example mdoc generated nonce",
//! );
//!
//! let bytes: Vec<u8> = Vec::new(); // CBOR `Document` or `DeviceResponse`
//! let current_time = 100;
//!
//! let result =
//!     bhmdoc::validate_mobile_document(&bytes, &trust, &session, current_time).unwrap();
//! if result.is_valid() {
//!     println!("{:?}", result.claims);
//! }
//! ```

pub mod device;
pub mod error;
pub mod issuer;
pub mod models;
mod utils;
pub mod validator;

pub use device::Device;
pub use error::{MdocError, Result};
pub use issuer::Issuer;
pub use models::data_retrieval::device_retrieval::{
    device_auth::PresentationSession, issuer_auth::DeviceKey,
};
pub use utils::{json::json_to_cbor, rand::generate_nonce};
pub use validator::{
    validate_mobile_document, ChainPolicy, ValidationResult, ValidationStatus, Validator,
};
