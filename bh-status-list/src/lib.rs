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

//! A `crate` dedicated to dealing with Bitstring Status Lists for Verifiable
//! Credentials.
//!
//! The implementation is based on [this specification][1]. Status lists keep
//! track of whether a credential has been revoked or suspended, without the
//! verifier having to contact the issuer about a specific credential.
//!
//! The lists are created, updated and **signed** by issuers, and are publicly
//! available. A credential refers to a list through its `credentialStatus`
//! entry, which carries the URL of the list and an index into it.
//!
//! # Details
//!
//! A [`StatusList`] is a bitstring where bit `i` is the `i % 8`-th most
//! significant bit of byte `i / 8`. It is published as the `encodedList` of a
//! `BitstringStatusListCredential` (see [`status_list_credential`]), GZIP
//! compressed and base64url encoded.
//!
//! [`check_status`] verifies a status list credential and reads one bit of
//! it, while [`check_credential_status`] also fetches the list through a
//! [`StatusListClient`]. The list is never consulted before its credential
//! verifies, it must come from the issuer of the credential it answers for,
//! and an index past the end of the list is an error.
//!
//! # Example
//!
//! ```
//! use bh_did_resolver::test_utils::StaticKeyResolver;
//! use bh_jws_utils::{KeyType, SigningKey};
//! use bh_status_list::{check_status, status_list_credential, StatusList};
//! use bh_vc_jwt::{sign_credential, JwtVerifier, StatusPurpose};
//!
//! let issuer = "did:web:issuer.example";
//! let key = SigningKey::generate(KeyType::EcP256).unwrap();
//!
//! // Revoke the credential at index 5.
//! let mut list = StatusList::new(1024);
//! list.set(5, true).unwrap();
//!
//! let claims = status_list_credential(
//!     "https://issuer.example/status/1",
//!     issuer,
//!     StatusPurpose::Revocation,
//!     &list,
//!     "2026-01-01T00:00:00Z",
//! )
//! .unwrap();
//! let token = sign_credential(&claims, &key, "did:web:issuer.example#key-1").unwrap();
//!
//! let verifier =
//!     JwtVerifier::new(StaticKeyResolver::new().with_key(issuer, key.public_key().unwrap()));
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//!
//! let revoked = runtime
//!     .block_on(check_status(&token, 5, &verifier, 1_780_000_000))
//!     .unwrap();
//! assert!(revoked);
//! ```
//!
//! [1]: https://www.w3.org/TR/vc-bitstring-status-list/

mod check;
pub mod client;
mod compression;
mod credential;
mod error;
mod status_list;

pub use check::{check_credential_status, check_status};
pub use client::{HttpStatusListClient, StatusListClient, STATUS_LIST_MEDIA_TYPES};
pub use compression::MAX_DECOMPRESSED_BYTES;
pub use credential::{
    status_list_credential, StatusListSubject, BITSTRING_STATUS_LIST_CREDENTIAL_TYPE,
    BITSTRING_STATUS_LIST_ENTRY_TYPE, BITSTRING_STATUS_LIST_TYPE,
};
pub use error::{Error, Result};
pub use status_list::{StatusList, MIN_STATUS_LIST_SIZE};
