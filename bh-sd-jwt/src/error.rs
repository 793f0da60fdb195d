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

/// Error type of the SD-JWT codec.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum Error {
    /// The compact `<jwt>~<disclosure>~...` serialization is malformed.
    #[strum(to_string = "Invalid SD-JWT format")]
    InvalidSdJwtFormat,

    /// The issuer-signed JWT could not be parsed.
    #[strum(to_string = "Provided JWT is not parsable")]
    NonParseableJwt,

    /// A disclosure is not a base64url JSON array of the expected shape.
    #[strum(to_string = "Invalid disclosure: {0}")]
    InvalidDisclosure(String),

    /// The claims, or the requested disclosable keys, use a name reserved
    /// for the digest encoding.
    #[strum(to_string = "Reserved claim name: {0}")]
    ReservedClaimName(&'static str),

    /// A disclosable key is not present in the claims.
    #[strum(to_string = "Claim {0} does not exist")]
    NonExistentClaim(String),

    /// The same key was requested to be disclosable twice.
    #[strum(to_string = "Claim {0} is selected more than once")]
    DuplicateDisclosableKey(String),

    /// A requested disclosure index is not present in the token.
    #[strum(to_string = "Disclosure index {0} out of range (disclosures={1})")]
    DisclosureIndexOutOfRange(usize, usize),

    /// An `_sd` array or `...` entry holds something other than a digest.
    #[strum(to_string = "Malformed digest: {0}")]
    MalformedDigest(String),

    /// The same digest occurs twice in the claims.
    #[strum(to_string = "Duplicate digest: {0}")]
    DuplicateDigest(String),

    /// Two presented disclosures hash to the same digest.
    #[strum(to_string = "Disclosure digest collision")]
    DisclosureDigestCollision,

    /// A presented disclosure is not committed to anywhere in the claims.
    #[strum(to_string = "Disclosure digest does not match any digest in the claims")]
    DigestMismatch,

    /// A key-value disclosure was referenced from an array or vice versa.
    #[strum(to_string = "Disclosure format does not match its position")]
    MismatchedDisclosureFormat,

    /// A disclosed claim name is already present in its object.
    #[strum(to_string = "Duplicate claim name: {0}")]
    DuplicateClaimName(String),

    /// `_sd_alg` names an algorithm that is not supported.
    #[strum(to_string = "Unsupported hash algorithm: {0}")]
    UnsupportedHashAlgorithm(String),

    /// The claims could not be signed.
    #[strum(to_string = "Unable to sign the SD-JWT")]
    SigningFailed,

    /// The issuer-signed JWT failed credential verification.
    #[strum(to_string = "Credential verification failed: {0}")]
    Credential(bh_vc_jwt::Error),
}

impl bherror::BhError for Error {}

/// Result type alias for the crate.
pub type Result<T> = bherror::Result<T, Error>;
