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

use crate::{KeyType, SigningAlgorithm};

/// Error in JWK or compact JWS format
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum FormatError {
    /// Error that occurs when JWK parsing failed
    #[strum(to_string = "JWK parsing failed: {0}")]
    JwkParsingFailed(String),
    /// Error that occurs when a compact JWS is not well formed
    #[strum(to_string = "Malformed compact JWS: {0}")]
    MalformedJws(String),
}

impl bherror::BhError for FormatError {}

/// Error in JWS signature
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum SignatureError {
    /// Error that occurs when the signing algorithm is invalid
    #[strum(to_string = "Invalid signing algorithm {0}")]
    InvalidSigningAlgorithm(String),
    /// The algorithm declared by a token is outside of the family implied by
    /// the verification key.
    #[strum(to_string = "Algorithm {0} cannot be used with a {1} key")]
    AlgorithmMismatch(SigningAlgorithm, KeyType),
    /// The signature did not verify against the given key.
    #[strum(to_string = "Invalid signature")]
    InvalidSignature,
    /// The signing backend failed to produce a signature.
    #[strum(to_string = "Signing failed")]
    SigningFailed,
}

impl bherror::BhError for SignatureError {}

/// Cryptographic error
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum CryptoError {
    /// Error that occurs when key generation failed
    #[strum(to_string = "Key generation failed")]
    KeyGenerationFailed,
    /// Error that occurs when the cryptographic backend
    /// unexpectedly failed
    #[strum(to_string = "Crypto backend failed")]
    CryptoBackend,
    /// Error that occurs when the key type or curve is unsupported
    #[strum(to_string = "Unsupported: {0}")]
    Unsupported(String),
    /// Error that occurs when a public key is incorrectly formatted or
    /// otherwise not valid.
    #[strum(to_string = "Invalid public key")]
    InvalidPublicKey,
}

impl bherror::BhError for CryptoError {}
