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

//! `IssuerAuth`: the Mobile Security Object (MSO) signed by the Issuer as a
//! `COSE_Sign1` ([RFC 9052][1]), with the signer's certificate chain in the
//! `x5chain` header ([RFC 9360][2]).
//!
//! [1]: <https://datatracker.ietf.org/doc/rfc9052/>
//! [2]: <https://datatracker.ietf.org/doc/rfc9360/>

use std::collections::HashMap;

use bh_jws_utils::{JwkPublic, PublicKey, Signer, SigningAlgorithm};
use bherror::traits::{
    ErrorContext as _, ForeignBoxed as _, ForeignError as _, PropagateError as _,
};
use bhx5chain::X5Chain;
use ciborium::Value;
use coset::{
    iana::{EnumI64 as _, HeaderParameter},
    Algorithm, CoseKey, CoseSign1, CoseSign1Builder, Header, Label,
    RegisteredLabelWithPrivate,
};
use serde::{Deserialize, Serialize};

use super::response::{DigestID, IssuerNameSpaces, IssuerSignedItemBytes};
use crate::{
    error::MdocError,
    models::{
        data_retrieval::common::{DocType, NameSpace},
        Bytes, BytesCbor, DateTime,
    },
    utils::coset::{
        as_cbor, check_signature, cose_algorithm_of, cose_key_from_jwk, cose_key_to_jwk,
        signing_algorithm_of, verification_algorithm,
    },
    Result,
};

const MSO_VERSION: &str = "1.0";

/// Newly issued items are always digested with SHA-256.
const ISSUANCE_DIGEST_ALGORITHM: DigestAlgorithm = DigestAlgorithm::Sha256;

fn x5chain_label() -> Label {
    Label::Int(HeaderParameter::X5Chain.to_i64())
}

fn missing_mso() -> bherror::Error<MdocError> {
    bherror::Error::root(MdocError::IssuerAuth).ctx("MSO is missing")
}

/// The Issuer's `COSE_Sign1` over the [`MobileSecurityObject`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IssuerAuth(
    #[serde(with = "as_cbor")]
    pub(crate) CoseSign1,
);

impl IssuerAuth {
    /// Digests `name_spaces` into a new MSO and signs it with `signer`.
    ///
    /// The leaf of `x5chain` must certify the key of `signer`. The chain goes
    /// into the unprotected header. Only `ES256`, `ES384` and `ES512`
    /// signers are accepted.
    pub fn new(
        doc_type: DocType,
        name_spaces: &IssuerNameSpaces,
        device_key: DeviceKey,
        signer: &impl Signer,
        x5chain: &X5Chain,
        validity_info: ValidityInfo,
    ) -> Result<Self> {
        let signing_algorithm = signer.algorithm();
        let Some(alg) = cose_algorithm_of(signing_algorithm) else {
            return Err(bherror::Error::root(MdocError::IssuerAuth)
                .ctx(format!("{signing_algorithm} is not an ECDSA algorithm")));
        };

        let mso = MobileSecurityObject::new(doc_type, name_spaces, device_key, validity_info)?;
        let mut payload = Vec::new();
        ciborium::into_writer(&BytesCbor::from(mso), &mut payload)
            .foreign_err(|| MdocError::IssuerAuth)
            .ctx(|| "unable to encode the MSO")?;

        let protected = Header {
            alg: Some(Algorithm::Assigned(alg)),
            ..Default::default()
        };
        let unprotected = Header {
            rest: vec![(x5chain_label(), encode_x5chain(x5chain)?)],
            ..Default::default()
        };

        let sign1 = CoseSign1Builder::new()
            .protected(protected)
            .unprotected(unprotected)
            .payload(payload)
            .try_create_signature(&[], |data| signer.sign(data))
            .foreign_boxed_err(|| MdocError::Signing)?
            .build();

        Ok(Self(sign1))
    }

    /// Verifies the Issuer signature with `key`.
    ///
    /// The algorithm is derived from the curve of `key`; a protected `alg`
    /// naming anything else fails with [`MdocError::AlgorithmMismatch`].
    pub fn verify_signature(&self, key: &PublicKey) -> Result<()> {
        let alg = verification_algorithm(key, &self.0.protected.header)
            .ctx(|| "issuer authentication")?;

        if self.0.payload.is_none() {
            return Err(missing_mso());
        }

        self.0.verify_signature(&[], |signature, data| {
            check_signature(key, alg, signature, data)
        })
    }

    /// Decodes the MSO from the payload.
    ///
    /// Nothing in it may be relied upon before
    /// [`verify_signature`][Self::verify_signature] succeeds.
    pub fn mso(&self) -> Result<MobileSecurityObject> {
        let payload = self.0.payload.as_deref().ok_or_else(missing_mso)?;

        let mso: BytesCbor<MobileSecurityObject> = ciborium::from_reader(payload)
            .foreign_err(|| MdocError::IssuerAuth)
            .ctx(|| "invalid MSO")?;

        Ok(mso.inner)
    }

    /// The validity period of the signed MSO.
    pub fn validity_info(&self) -> Result<ValidityInfo> {
        Ok(self.mso()?.validity_info)
    }

    /// The Device key bound by the signed MSO.
    pub fn device_key(&self) -> Result<DeviceKey> {
        Ok(self.mso()?.device_key_info.device_key)
    }

    /// The protected `alg`, when it is one of the supported ECDSA algorithms.
    pub fn signing_algorithm(&self) -> Option<SigningAlgorithm> {
        match self.0.protected.header.alg.as_ref()? {
            RegisteredLabelWithPrivate::Assigned(alg) => signing_algorithm_of(alg),
            _ => None,
        }
    }

    /// The certificate chain from the protected header, falling back to the
    /// unprotected one. Its trust is not evaluated.
    pub fn x5chain(&self) -> Result<X5Chain> {
        let label = x5chain_label();
        let lookup = |header: &Header| {
            header
                .rest
                .iter()
                .find(|(key, _)| *key == label)
                .map(|(_, value)| value.clone())
        };

        let value = lookup(&self.0.protected.header)
            .or_else(|| lookup(&self.0.unprotected))
            .ok_or_else(|| bherror::Error::root(MdocError::X5Chain).ctx("missing `x5chain`"))?;

        decode_x5chain(value)
    }
}

/// A lone certificate is a bare byte string, a longer chain an array of
/// them, see [RFC 9360][1].
///
/// [1]: <https://www.rfc-editor.org/rfc/rfc9360.html#section-2>
fn encode_x5chain(x5chain: &X5Chain) -> Result<Value> {
    let mut certificates = x5chain
        .as_bytes()
        .with_err(|| MdocError::X5Chain)
        .ctx(|| "unable to DER encode the certificates")?;

    Ok(match certificates.len() {
        1 => Value::Bytes(certificates.remove(0)),
        _ => Value::Array(certificates.into_iter().map(Value::Bytes).collect()),
    })
}

fn decode_x5chain(value: Value) -> Result<X5Chain> {
    let certificates = match value {
        Value::Bytes(der) => vec![der],
        Value::Array(values) => values
            .into_iter()
            .map(|value| match value {
                Value::Bytes(der) => Some(der),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                bherror::Error::root(MdocError::X5Chain).ctx("`x5chain` entry is not bytes")
            })?,
        _ => {
            return Err(bherror::Error::root(MdocError::X5Chain)
                .ctx("`x5chain` is neither bytes nor an array"))
        }
    };

    X5Chain::from_raw_bytes(&certificates)
        .with_err(|| MdocError::X5Chain)
        .ctx(|| "invalid `x5chain`")
}

/// The signed payload of [`IssuerAuth`]. Fields it does not know, such as a
/// `status` reference, are skipped.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileSecurityObject {
    version: String,
    digest_algorithm: DigestAlgorithm,
    value_digests: HashMap<NameSpace, HashMap<DigestID, Bytes>>,
    device_key_info: DeviceKeyInfo,
    doc_type: DocType,
    validity_info: ValidityInfo,
}

impl MobileSecurityObject {
    fn new(
        doc_type: DocType,
        name_spaces: &IssuerNameSpaces,
        device_key: DeviceKey,
        validity_info: ValidityInfo,
    ) -> Result<Self> {
        let mut value_digests = HashMap::with_capacity(name_spaces.0.len());

        for (name_space, items) in &name_spaces.0 {
            let mut digests = HashMap::with_capacity(items.len());
            for item in items {
                let digest = item
                    .digest(&ISSUANCE_DIGEST_ALGORITHM)
                    .with_err(|| MdocError::MobileSecurityObject)?;
                digests.insert(item.digest_id(), Bytes::from(digest));
            }
            value_digests.insert(name_space.clone(), digests);
        }

        Ok(Self {
            version: MSO_VERSION.to_owned(),
            digest_algorithm: ISSUANCE_DIGEST_ALGORITHM,
            value_digests,
            device_key_info: DeviceKeyInfo { device_key },
            doc_type,
            validity_info,
        })
    }

    /// The document type the MSO was signed for.
    pub fn doc_type(&self) -> &DocType {
        &self.doc_type
    }

    /// When the MSO was signed and how long it is valid.
    pub fn validity_info(&self) -> &ValidityInfo {
        &self.validity_info
    }

    /// The key the Device signs presentations with.
    pub fn device_key(&self) -> &DeviceKey {
        &self.device_key_info.device_key
    }

    /// Fails with [`MdocError::InvalidDocType`] unless the MSO was signed
    /// for `doc_type`.
    pub(crate) fn check_doc_type(&self, doc_type: &DocType) -> Result<()> {
        if &self.doc_type == doc_type {
            return Ok(());
        }

        Err(bherror::Error::root(MdocError::InvalidDocType(
            doc_type.clone(),
            self.doc_type.clone(),
        )))
    }

    /// Recomputes the digest of `item` and compares it with the signed one.
    pub(crate) fn check_item(
        &self,
        name_space: &NameSpace,
        item: &IssuerSignedItemBytes,
    ) -> Result<()> {
        let digests = self.value_digests.get(name_space).ok_or_else(|| {
            bherror::Error::root(MdocError::MissingDigestNamespace(name_space.clone()))
        })?;

        let digest_id = item.digest_id();
        let invalid = |reason: &'static str| {
            bherror::Error::root(MdocError::MissingOrInvalidDigest(
                name_space.clone(),
                digest_id,
            ))
            .ctx(reason)
        };

        let signed = digests
            .get(&digest_id)
            .ok_or_else(|| invalid("no digest with this ID"))?;

        if signed.as_slice() != item.digest(&self.digest_algorithm)?.as_slice() {
            return Err(invalid("digest mismatch"));
        }

        Ok(())
    }

    /// Like [`check_item`][Self::check_item] over every item, stopping at the
    /// first failure.
    pub(crate) fn check_name_spaces(&self, name_spaces: &IssuerNameSpaces) -> Result<()> {
        name_spaces
            .0
            .iter()
            .flat_map(|(name_space, items)| items.iter().map(move |item| (name_space, item)))
            .try_for_each(|(name_space, item)| self.check_item(name_space, item))
    }
}

/// Digest algorithms an MSO may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// `SHA-256`, the algorithm used at issuance.
    #[serde(rename = "SHA-256")]
    Sha256,
    /// `SHA-384`
    #[serde(rename = "SHA-384")]
    Sha384,
    /// `SHA-512`
    #[serde(rename = "SHA-512")]
    Sha512,
}

/// Key authorizations and key info are not used and skipped when present.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceKeyInfo {
    device_key: DeviceKey,
}

/// The Device's public key as a `COSE_Key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceKey(
    #[serde(with = "as_cbor")]
    pub(crate) CoseKey,
);

impl DeviceKey {
    /// From an EC public JWK.
    pub fn from_jwk(jwk: &JwkPublic) -> Result<Self> {
        cose_key_from_jwk(jwk)
            .ctx(|| "invalid device key")
            .map(Self)
    }

    /// From an EC [`PublicKey`].
    pub fn from_public_key(key: &PublicKey) -> Result<Self> {
        let jwk = key
            .to_jwk(None)
            .foreign_err(|| MdocError::JwkToCoseKey("key export failed".to_owned()))?;

        Self::from_jwk(&jwk)
    }

    /// The key as an EC public JWK.
    pub fn as_jwk(&self) -> Result<JwkPublic> {
        cose_key_to_jwk(&self.0)
    }

    /// The key in the form signatures are checked with.
    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_jwk(&self.as_jwk()?)
            .with_err(|| MdocError::InvalidPublicKey)
            .ctx(|| "device key")
    }
}

/// When the credential was signed and the period it is valid for.
///
/// Constructed through [`ValidityInfo::new`] or deserialization, both of
/// which enforce `signed <= valid_from < valid_until`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "UncheckedValidityInfo")]
#[non_exhaustive]
pub struct ValidityInfo {
    /// When the MSO was signed.
    pub signed: DateTime,
    /// Start of the validity period.
    pub valid_from: DateTime,
    /// End of the validity period, exclusive.
    pub valid_until: DateTime,
    /// When the Issuer expects to re-sign the credential.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_update: Option<DateTime>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct UncheckedValidityInfo {
    signed: DateTime,
    valid_from: DateTime,
    valid_until: DateTime,
    expected_update: Option<DateTime>,
}

impl TryFrom<UncheckedValidityInfo> for ValidityInfo {
    type Error = bherror::Error<MdocError>;

    fn try_from(unchecked: UncheckedValidityInfo) -> Result<Self> {
        Self::new(
            unchecked.signed,
            unchecked.valid_from,
            unchecked.valid_until,
            unchecked.expected_update,
        )
    }
}

impl ValidityInfo {
    /// Fails with [`MdocError::InvalidValidityInfo`] unless
    /// `signed <= valid_from < valid_until`.
    pub fn new(
        signed: DateTime,
        valid_from: DateTime,
        valid_until: DateTime,
        expected_update: Option<DateTime>,
    ) -> Result<Self> {
        if valid_from.timestamp() < signed.timestamp() {
            return Err(bherror::Error::root(MdocError::InvalidValidityInfo)
                .ctx("`validFrom` precedes `signed`"));
        }

        if valid_until.timestamp() <= valid_from.timestamp() {
            return Err(bherror::Error::root(MdocError::InvalidValidityInfo)
                .ctx("`validUntil` does not follow `validFrom`"));
        }

        Ok(Self {
            signed,
            valid_from,
            valid_until,
            expected_update,
        })
    }

    /// Fails unless `valid_from <= current_time <= valid_until`.
    pub fn check(&self, current_time: u64) -> Result<()> {
        let valid_from = self.valid_from.timestamp();
        if i128::from(current_time) < i128::from(valid_from) {
            return Err(bherror::Error::root(MdocError::DocumentNotYetValid(
                valid_from,
            )));
        }

        self.check_not_expired(current_time)
    }

    /// Only the upper bound of [`check`][Self::check].
    pub(crate) fn check_not_expired(&self, current_time: u64) -> Result<()> {
        let valid_until = self.valid_until.timestamp();
        if i128::from(current_time) > i128::from(valid_until) {
            return Err(bherror::Error::root(MdocError::DocumentExpired(
                valid_until,
            )));
        }

        Ok(())
    }
}
