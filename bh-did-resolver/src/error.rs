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

/// Error returned when a DID cannot be resolved to a public key.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum ResolutionError {
    /// The identifier is not a syntactically valid DID.
    #[strum(to_string = "Malformed DID")]
    MalformedDid,
    /// The DID method is not supported by this resolver.
    #[strum(to_string = "Unsupported DID method {0}")]
    UnsupportedMethod(String),
    /// No DID document exists for the identifier.
    #[strum(to_string = "DID document not found")]
    NotFound,
    /// The DID document exists but is not a valid document for the DID.
    #[strum(to_string = "Malformed DID document")]
    MalformedDocument,
    /// The document's key is not an EC key on a supported curve.
    #[strum(to_string = "Unsupported verification key")]
    UnsupportedKey,
    /// Fetching the DID document did not finish in time.
    #[strum(to_string = "DID resolution timed out")]
    Timeout,
    /// Fetching the DID document failed.
    #[strum(to_string = "Fetching the DID document failed")]
    Fetch,
}

impl bherror::BhError for ResolutionError {}

/// The [`bherror::Result`] type with the error type of
/// [`ResolutionError`], used throughout this crate.
pub type Result<T> = bherror::Result<T, ResolutionError>;
