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

/// Error type defining possible status list failures.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum Error {
    /// The bitstring could not be compressed.
    #[strum(to_string = "Status list compression error")]
    Compression,

    /// `encodedList` is not base64 of a GZIP stream, or inflates beyond the
    /// accepted size.
    #[strum(to_string = "Status list decompression error")]
    Decompression,

    /// The index lies outside of the list.
    #[strum(to_string = "index={1} is out of bounds (size={0})")]
    IndexOutOfBounds(usize, usize),

    /// The credential does not carry a status list subject.
    #[strum(to_string = "Malformed status list credential")]
    MalformedStatusListCredential,

    /// The entry's purpose is not the purpose of the referenced list.
    #[strum(to_string = "Status purpose of the entry does not match the status list")]
    PurposeMismatch,

    /// The status list credential failed verification.
    #[strum(to_string = "Status list credential verification failed: {0}")]
    Credential(bh_vc_jwt::Error),

    /// The HTTP client could not be constructed.
    #[strum(to_string = "Unable to build the HTTP client")]
    HttpClient,

    /// The status list credential could not be fetched.
    #[strum(to_string = "Unable to fetch the status list from {0}")]
    UnsuccessfulStatusFetch(String),
}

impl bherror::BhError for Error {}

/// Result type alias for the crate.
pub type Result<T> = bherror::Result<T, Error>;
