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

//! Issuance and presentation verification flows over JWT and SD-JWT
//! Verifiable Credentials and `mso_mdoc` mobile documents.
//!
//! # Details
//!
//! * [`CredentialIssuer`] turns a [`CredentialRequest`] into a signed JWT or
//!   SD-JWT credential carrying the holder's opaque identifier seed.
//! * [`HolderSession`] holds the holder key and signs presentations only
//!   while unlocked.
//! * [`PresentationVerifier`] verifies a presentation and every credential
//!   embedded in it, one presentation at a time or in batches that can be
//!   cancelled through a [`CancellationToken`].
//!
//! Every failure is reported as one [`ErrorKind`]. Its
//! [`public_message`](ErrorKind::public_message) is all a remote caller
//! should see; the error context is for local diagnostics.
//!
//! Resource ceilings ([`Limits`]) are enforced before any cryptographic
//! work, and issuer trust is three-valued ([`Trust`]): an issuer that no
//! trust list vouches for is not the same as one a trust list rejects.
//!
//! # Examples
//!
//! ```no_run
//! use bh_did_resolver::{DidResolver, FetchPolicy, ResolverConfig};
//! use bh_status_list::HttpStatusListClient;
//! use bh_trust_engine::{IssuerTrustList, PresentationRequest, PresentationVerifier};
//! use bh_vc_jwt::JwtVerifier;
//! use bhmdoc::Validator;
//! use bhx5chain::X509Trust;
//!
//! # async fn run(presentation: &str, now: u64) {
//! let verifier = PresentationVerifier::new(
//!     JwtVerifier::new(DidResolver::new(ResolverConfig::default()).unwrap()),
//!     HttpStatusListClient::new(FetchPolicy::default()).unwrap(),
//!     Validator::new(X509Trust::new(Vec::new())),
//! )
//! .with_issuers(IssuerTrustList::new(["did:web:issuer.example"]));
//!
//! let request = PresentationRequest::new("nonce", "https://verifier.example");
//! match verifier.verify(presentation, &request, now).await {
//!     Ok(verified) => println!("{} verified", verified.holder),
//!     Err(err) => println!("rejected: {}", err.error.public_message()),
//! }
//! # }
//! ```

mod cancel;
mod claims;
pub mod config;
mod error;
mod issuance;
mod session;
mod trust;
mod verification;

pub use cancel::CancellationToken;
pub use claims::{map_to_json, ClaimMap, ClaimValue};
pub use config::{
    Limits, MAX_BATCH_PRESENTATIONS, MAX_BATCH_TOTAL_BYTES, MAX_PRESENTATION_BYTES,
    MAX_STRING_LENGTH, MAX_SUBJECT_DEPTH, MAX_SUBJECT_ENTRIES,
};
pub use error::{ErrorKind, Result};
pub use issuance::{
    CredentialIssuer, CredentialRequest, IssuedCredential, DEFAULT_CREDENTIAL_VALIDITY,
    OPAQUE_ID_SEED_CLAIM,
};
pub use session::{
    HolderSession, PinVerifier, StoredPin, PIN_HASH_ITERATIONS, PRESENTATION_LIFETIME,
};
pub use trust::{IssuerTrustList, Trust, TrustPolicy};
pub use verification::{
    BatchEntry, BatchReport, CredentialFormat, PresentationRequest, PresentationVerifier,
    VerifiedCredential, VerifiedPresentation,
};
