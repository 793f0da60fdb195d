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

use crate::SecondsSinceEpoch;

/// Error type defining possible failures of signing and verifying JWT
/// credentials and presentations.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum Error {
    /// The token is not a compact JWS carrying the expected claims.
    #[strum(to_string = "Malformed JWT")]
    MalformedToken,

    /// The key of the issuer or holder could not be resolved.
    #[strum(to_string = "Unable to resolve the signer's key")]
    KeyResolution,

    /// The signature does not verify with the resolved key.
    #[strum(to_string = "Invalid signature")]
    InvalidSignature,

    /// The `exp` claim lies in the past.
    #[strum(to_string = "JWT expired (current_time={0}, exp={1})")]
    JwtExpired(SecondsSinceEpoch, SecondsSinceEpoch),

    /// The `nbf` claim lies in the future.
    #[strum(to_string = "JWT not yet valid (current_time={0}, nbf={1})")]
    JwtNotYetValid(SecondsSinceEpoch, SecondsSinceEpoch),

    /// The credential's own `expirationDate` lies in the past.
    #[strum(to_string = "Credential expired at {0}")]
    CredentialExpired(String),

    /// The presentation's `jti` is not the expected nonce.
    #[strum(to_string = "Presentation nonce mismatch")]
    NonceMismatch,

    /// The expected audience is not among the presentation's `aud`.
    #[strum(to_string = "Presentation audience mismatch")]
    AudienceMismatch,

    /// The presentation `sub` differs from `vp.holder`.
    #[strum(to_string = "Presentation holder mismatch")]
    HolderMismatch,

    /// The claims could not be signed.
    #[strum(to_string = "Unable to sign the JWT")]
    SigningFailed,
}

impl bherror::BhError for Error {}

/// Result type alias for the crate.
pub type Result<T> = bherror::Result<T, Error>;
