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

//! The Credential as it leaves the `mdoc` Issuer.

use bh_jws_utils::base64_url_encode;
use bherror::traits::ForeignError as _;
use serde::Serialize;

use super::data_retrieval::{common::DocType, device_retrieval::response::IssuerSigned};
use crate::{MdocError, Result};

/// An issued `mso_mdoc` Credential.
///
/// In `OpenID4VCI` only the [`IssuerSigned`] part is transferred, see
/// [`serialize_issuer_signed`][Self::serialize_issuer_signed].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedDocument {
    doc_type: DocType,
    issuer_signed: IssuerSigned,
}

impl IssuedDocument {
    pub(crate) fn new(doc_type: DocType, issuer_signed: IssuerSigned) -> Self {
        Self {
            doc_type,
            issuer_signed,
        }
    }

    /// The document type of the Credential.
    pub fn doc_type(&self) -> &DocType {
        &self.doc_type
    }

    /// Serializes the [`IssuerSigned`] structure to the _CBOR_-serialized and
    /// _base64url_-encoded (**without padding**) string.
    pub fn serialize_issuer_signed(&self) -> Result<String> {
        let mut bytes = vec![];
        ciborium::into_writer(&self.issuer_signed, &mut bytes)
            .foreign_err(|| MdocError::IssuerSignedParse)?;

        Ok(base64_url_encode(bytes))
    }
}
