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

/// Error type of pseudonym derivation and seed management.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum Error {
    /// The verifier domain is empty, not a host name, or a bare public
    /// suffix.
    #[strum(to_string = "Invalid verifier domain: {0}")]
    InvalidDomain(String),

    /// The seed is not base64url of exactly 32 bytes.
    #[strum(to_string = "Invalid seed")]
    InvalidSeed,

    /// The secure random source failed.
    #[strum(to_string = "Random source failure")]
    RandomSource,

    /// Computing the HMAC failed.
    #[strum(to_string = "HMAC computation failed")]
    Hmac,
}

impl bherror::BhError for Error {}

/// Result type alias for the crate.
pub type Result<T> = bherror::Result<T, Error>;
