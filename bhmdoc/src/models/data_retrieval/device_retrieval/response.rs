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

//! The mdoc response of ISO/IEC 18013-5 section 8.3.2.1.2.2: what a Device
//! hands to a Verifier, and the Issuer-signed part it received on issuance.
use std::collections::HashMap;

use bh_jws_utils::{base64_url_decode, base64_url_encode, PublicKey, Signer};
use bherror::traits::{ErrorContext as _, ForeignError as _, PropagateError as _};
use bhx5chain::X5Chain;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{
    device_auth::{DeviceAuth, DeviceAuthentication, PresentationSession},
    issuer_auth::{DigestAlgorithm, IssuerAuth, ValidityInfo},
};
use crate::{
    models::{
        data_retrieval::{
            common::{DataElementIdentifier, DataElementValue, DocType, NameSpace},
            Claims, ElementSelection,
        },
        Bytes, BytesCbor,
    },
    utils::digest::digest,
    DeviceKey, MdocError, Result,
};

const RESPONSE_VERSION: &str = "1.0";
const STATUS_OK: u64 = 0;

/// Some wallets still pad their `base64url`.
fn unpadded_base64_url(value: &str) -> &str {
    value.trim_end_matches('=')
}

/// A `DeviceResponse`, carrying zero or more presented [`Document`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceResponse {
    version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    documents: Vec<Document>,
    status: u64,
}

impl DeviceResponse {
    pub(crate) fn new(documents: Vec<Document>) -> Self {
        Self {
            version: RESPONSE_VERSION.to_owned(),
            documents,
            status: STATUS_OK,
        }
    }

    /// Parses _CBOR_ bytes.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes)
            .foreign_err(|| MdocError::DeviceResponseParse("invalid CBOR".to_owned()))
    }

    /// Parses `base64url`-encoded _CBOR_, as carried in a `vp_token`.
    pub fn from_base64_cbor(value: &str) -> Result<Self> {
        let bytes = base64_url_decode(unpadded_base64_url(value))
            .foreign_err(|| MdocError::DeviceResponseParse("invalid base64".to_owned()))?;

        Self::from_cbor(&bytes)
    }

    /// Serializes to unpadded `base64url`-encoded _CBOR_.
    pub fn to_base64_cbor(&self) -> Result<String> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes).foreign_err(|| {
            MdocError::DeviceResponseParse("serialization to CBOR failed".to_owned())
        })?;

        Ok(base64_url_encode(bytes))
    }

    /// The presented documents.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Consumes the response, returning its documents.
    pub fn into_documents(self) -> Vec<Document> {
        self.documents
    }
}

/// A single presented mobile document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    doc_type: DocType,
    pub(crate) issuer_signed: IssuerSigned,
    pub(crate) device_signed: DeviceSigned,
}

impl Document {
    pub(crate) fn new(
        doc_type: DocType,
        issuer_signed: IssuerSigned,
        device_signed: DeviceSigned,
    ) -> Self {
        Self {
            doc_type,
            issuer_signed,
            device_signed,
        }
    }

    /// Parses a single _CBOR_ encoded [`Document`].
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes)
            .foreign_err(|| MdocError::MalformedDocument("invalid CBOR document".to_owned()))
    }

    /// The document type as claimed by the presenter, unverified.
    pub fn doc_type(&self) -> &DocType {
        &self.doc_type
    }

    /// The Issuer-signed data elements, unverified.
    pub fn into_claims(self) -> Claims {
        self.issuer_signed.into_claims()
    }
}

/// The Issuer-signed part of a document: the salted data elements together
/// with the `IssuerAuth` signing their digests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuerSigned {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) name_spaces: Option<IssuerNameSpaces>,
    pub(crate) issuer_auth: IssuerAuth,
}

impl IssuerSigned {
    /// Salts and numbers every element of `claims`, then signs their digests.
    pub(crate) fn new<R: Rng + ?Sized>(
        doc_type: DocType,
        claims: Claims,
        device_key: DeviceKey,
        signer: &impl Signer,
        x5chain: &X5Chain,
        rng: &mut R,
        validity_info: ValidityInfo,
    ) -> Result<Self> {
        let name_spaces = IssuerNameSpaces::salted(claims, rng);

        let issuer_auth = IssuerAuth::new(
            doc_type,
            &name_spaces,
            device_key,
            signer,
            x5chain,
            validity_info,
        )?;

        Ok(Self {
            name_spaces: Some(name_spaces),
            issuer_auth,
        })
    }

    /// Parses `base64url`-encoded _CBOR_, as returned on issuance.
    pub(crate) fn from_base64_url(value: &str) -> Result<Self> {
        let bytes = base64_url_decode(unpadded_base64_url(value))
            .foreign_err(|| MdocError::IssuerSignedParse)
            .ctx(|| "invalid base64url")?;

        ciborium::from_reader(bytes.as_slice())
            .foreign_err(|| MdocError::IssuerSignedParse)
            .ctx(|| "invalid CBOR")
    }

    /// A copy disclosing only the `selection`, under the same `IssuerAuth`.
    pub(crate) fn disclose(&self, selection: &ElementSelection) -> Self {
        Self {
            name_spaces: self
                .name_spaces
                .as_ref()
                .and_then(|name_spaces| name_spaces.disclose(selection)),
            issuer_auth: self.issuer_auth.clone(),
        }
    }

    /// Consumes the value, returning the elements it carries.
    pub fn into_claims(self) -> Claims {
        self.name_spaces
            .map(IssuerNameSpaces::into_claims)
            .unwrap_or_default()
    }

    /// The elements, grouped by namespace.
    pub fn claims(&self) -> Claims {
        self.clone().into_claims()
    }

    /// The Device key the credential is bound to.
    pub fn device_key(&self) -> Result<DeviceKey> {
        self.issuer_auth.device_key()
    }

    /// The checks a Device runs on a freshly issued credential.
    ///
    /// The signature must verify with the leaf of the embedded `x5chain`,
    /// whose trust is not evaluated here. Only `validUntil` is enforced so a
    /// credential may be accepted before it becomes valid.
    pub(crate) fn validate_device(&self, current_time: u64, doc_type: &DocType) -> Result<()> {
        let leaf_key = self
            .issuer_auth
            .x5chain()?
            .leaf_certificate_key()
            .with_err(|| MdocError::X5Chain)?;
        self.issuer_auth.verify_signature(&leaf_key)?;

        let mso = self.issuer_auth.mso()?;
        mso.check_doc_type(doc_type)?;
        mso.validity_info().check_not_expired(current_time)?;

        match &self.name_spaces {
            Some(name_spaces) => mso.check_name_spaces(name_spaces),
            None => Ok(()),
        }
    }
}

/// Issuer-signed items grouped by namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuerNameSpaces(pub(crate) HashMap<NameSpace, Vec<IssuerSignedItemBytes>>);

impl IssuerNameSpaces {
    fn salted<R: Rng + ?Sized>(claims: Claims, rng: &mut R) -> Self {
        let mut name_spaces = HashMap::with_capacity(claims.0.len());

        for (name_space, elements) in claims.0 {
            let items = elements
                .into_iter()
                .zip(0u64..)
                .map(|((element_identifier, element_value), digest_id)| {
                    IssuerSignedItemBytes::from(IssuerSignedItem {
                        random: Bytes::random_salt(rng),
                        digest_id: DigestID(digest_id),
                        element_value,
                        element_identifier,
                    })
                })
                .collect();

            name_spaces.insert(name_space, items);
        }

        Self(name_spaces)
    }

    /// Consumes the value, returning the elements it carries.
    pub fn into_claims(self) -> Claims {
        let mut claims = Claims::default();
        for (name_space, items) in self.0 {
            for item in items {
                let item = item.0.inner;
                claims.insert(
                    name_space.clone(),
                    item.element_identifier,
                    item.element_value,
                );
            }
        }
        claims
    }

    /// The selected items, [`None`] when nothing is left.
    fn disclose(&self, selection: &ElementSelection) -> Option<Self> {
        let disclosed: HashMap<_, _> = self
            .0
            .iter()
            .map(|(name_space, items)| {
                let items: Vec<_> = items
                    .iter()
                    .filter(|item| selection.contains(name_space, item.element_identifier()))
                    .cloned()
                    .collect();
                (name_space.clone(), items)
            })
            .filter(|(_, items): &(NameSpace, Vec<IssuerSignedItemBytes>)| !items.is_empty())
            .collect();

        (!disclosed.is_empty()).then_some(Self(disclosed))
    }

    /// The same elements, in the shape the Device signs them.
    pub(crate) fn to_device_name_spaces(&self) -> DeviceNameSpaces {
        let mut device = DeviceNameSpaces::default();
        for (name_space, items) in &self.0 {
            let elements = device.0.entry(name_space.clone()).or_default();
            for item in items {
                elements.insert(
                    item.element_identifier().clone(),
                    item.element_value().clone(),
                );
            }
        }
        device
    }
}

/// An [`IssuerSignedItem`] embedded as tagged _CBOR_ bytes, the unit the MSO
/// digests are computed over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuerSignedItemBytes(pub(crate) BytesCbor<IssuerSignedItem>);

impl IssuerSignedItemBytes {
    /// Digest of the tagged encoding.
    ///
    /// A received item is hashed exactly as received, so that a different
    /// key order produced by re-encoding can never alter the digest.
    pub fn digest(&self, alg: &DigestAlgorithm) -> Result<Vec<u8>> {
        if let Some(encoded) = &self.0.encoded {
            return Ok(digest(alg, encoded));
        }

        let mut encoded = Vec::new();
        ciborium::into_writer(self, &mut encoded)
            .foreign_err(|| MdocError::IssuerAuth)
            .ctx(|| "unable to encode IssuerSignedItemBytes")?;

        Ok(digest(alg, &encoded))
    }

    /// Identifier of the digest committing to this item.
    pub fn digest_id(&self) -> DigestID {
        self.0.inner.digest_id
    }

    /// Name of the element.
    pub fn element_identifier(&self) -> &DataElementIdentifier {
        &self.0.inner.element_identifier
    }

    /// Value of the element.
    pub fn element_value(&self) -> &DataElementValue {
        &self.0.inner.element_value
    }
}

impl From<IssuerSignedItem> for IssuerSignedItemBytes {
    fn from(item: IssuerSignedItem) -> Self {
        Self(item.into())
    }
}

/// One salted data element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuerSignedItem {
    pub(crate) random: Bytes,
    #[serde(rename = "digestID")]
    pub(crate) digest_id: DigestID,
    pub(crate) element_value: DataElementValue,
    pub(crate) element_identifier: DataElementIdentifier,
}

/// Identifies an item's digest within the MSO.
#[derive(
    Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct DigestID(pub(crate) u64);

impl std::fmt::Display for DigestID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for DigestID {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// The Device-signed part of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSigned {
    pub(crate) name_spaces: DeviceNameSpacesBytes,
    pub(crate) device_auth: DeviceAuth,
}

impl DeviceSigned {
    /// Signs `DeviceAuthenticationBytes` for `session` with the Device key.
    pub(crate) fn new(
        name_spaces: DeviceNameSpaces,
        session: &PresentationSession,
        doc_type: &DocType,
        signer: &impl Signer,
    ) -> Result<Self> {
        let name_spaces = DeviceNameSpacesBytes::from(name_spaces);

        let authentication = DeviceAuthentication::new(session, doc_type, &name_spaces)?;
        let device_auth = DeviceAuth::new_signature(&authentication, signer)?;

        Ok(Self {
            name_spaces,
            device_auth,
        })
    }

    /// Consumes the value, returning the elements it carries.
    pub fn into_claims(self) -> Claims {
        Claims(self.name_spaces.0.inner.0)
    }

    /// Verifies the detached Device signature, rebuilding its payload from
    /// `session` and `doc_type`.
    pub(crate) fn verify_signature(
        &self,
        session: &PresentationSession,
        doc_type: &DocType,
        key: &PublicKey,
    ) -> Result<()> {
        let authentication = DeviceAuthentication::new(session, doc_type, &self.name_spaces)?;

        self.device_auth.verify_signature(&authentication, key)
    }
}

/// [`DeviceNameSpaces`] embedded as tagged _CBOR_ bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceNameSpacesBytes(pub(crate) BytesCbor<DeviceNameSpaces>);

impl From<DeviceNameSpaces> for DeviceNameSpacesBytes {
    fn from(name_spaces: DeviceNameSpaces) -> Self {
        Self(name_spaces.into())
    }
}

/// Data elements signed by the Device, grouped by namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceNameSpaces(
    pub(crate) HashMap<NameSpace, HashMap<DataElementIdentifier, DataElementValue>>,
);
