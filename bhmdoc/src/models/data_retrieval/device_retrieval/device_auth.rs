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

//! Device authentication as defined in the section `9.1.3` of the [ISO/IEC 18013-5:2021][1], with
//! the session transcript of the `OpenID4VP` handover from the Annex B of the [ISO/IEC
//! 18013-7:2024][2].
//!
//! [1]: <https://www.iso.org/standard/69084.html>
//! [2]: <https://www.iso.org/standard/82772.html>

use bh_jws_utils::{PublicKey, Signer};
use bherror::traits::{ErrorContext as _, ForeignBoxed as _, ForeignError as _};
use ciborium::Value;
use coset::{Algorithm, Header};

use super::response::DeviceNameSpacesBytes;
use crate::{
    error::MdocError,
    models::{data_retrieval::common::DocType, BytesCbor},
    utils::coset::{
        as_cbor, check_signature, cose_algorithm_of, verification_algorithm,
    },
    Result,
};

/// The context string of the [`DeviceAuthentication`] structure.
const DEVICE_AUTHENTICATION_CONTEXT: &str = "DeviceAuthentication";

/// The request parameters of an `OpenID4VP` presentation the `mdoc` Device
/// signature is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationSession {
    client_id: String,
    response_uri: String,
    nonce: String,
    mdoc_generated_nonce: String,
}

impl PresentationSession {
    /// Creates a new [`PresentationSession`].
    ///
    /// The `mdoc_generated_nonce` is chosen by the Device and must reach the
    /// Verifier, e.g. as the `apu` header of the encrypted response.
    pub fn new(
        client_id: impl Into<String>,
        response_uri: impl Into<String>,
        nonce: impl Into<String>,
        mdoc_generated_nonce: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            response_uri: response_uri.into(),
            nonce: nonce.into(),
            mdoc_generated_nonce: mdoc_generated_nonce.into(),
        }
    }

    /// The Verifier nonce.
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Builds the `SessionTranscript`:
    ///
    /// ```text
    /// SessionTranscript = [null, null, OID4VPHandover]
    /// OID4VPHandover = [clientIdHash, responseUriHash, nonce]
    /// clientIdHash = SHA-256(CBOR([client_id, mdoc_generated_nonce]))
    /// responseUriHash = SHA-256(CBOR([response_uri, mdoc_generated_nonce]))
    /// ```
    pub(crate) fn session_transcript(&self) -> Result<Value> {
        let hash = |value: &str| -> Result<Value> {
            let mut bytes = vec![];
            ciborium::into_writer(
                &Value::Array(vec![
                    value.into(),
                    self.mdoc_generated_nonce.as_str().into(),
                ]),
                &mut bytes,
            )
            .foreign_err(|| MdocError::DeviceAuthentication)?;

            Ok(Value::Bytes(openssl::sha::sha256(&bytes).to_vec()))
        };

        let handover = Value::Array(vec![
            hash(&self.client_id)?,
            hash(&self.response_uri)?,
            self.nonce.as_str().into(),
        ]);

        Ok(Value::Array(vec![Value::Null, Value::Null, handover]))
    }
}

/// [`DeviceAuthentication`] as defined in the section `9.1.3.4` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// It is never transmitted; both the Device and the Verifier build it to get
/// the detached payload of the [`DeviceAuth`] signature.
///
/// [1]: <https://www.iso.org/standard/69084.html>
pub(crate) struct DeviceAuthentication<'a> {
    session_transcript: Value,
    doc_type: &'a DocType,
    name_spaces: &'a DeviceNameSpacesBytes,
}

impl<'a> DeviceAuthentication<'a> {
    pub(crate) fn new(
        session: &PresentationSession,
        doc_type: &'a DocType,
        name_spaces: &'a DeviceNameSpacesBytes,
    ) -> Result<Self> {
        Ok(Self {
            session_transcript: session.session_transcript()?,
            doc_type,
            name_spaces,
        })
    }

    /// The serialized `DeviceAuthenticationBytes`, i.e. the
    /// `#6.24(bstr .cbor DeviceAuthentication)` structure.
    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        let name_spaces = self
            .name_spaces
            .0
            .try_into_cbor()
            .map_err(|message| bherror::Error::root(MdocError::DeviceAuthentication).ctx(message))?;

        let device_authentication = Value::Array(vec![
            DEVICE_AUTHENTICATION_CONTEXT.into(),
            self.session_transcript.clone(),
            self.doc_type.as_str().into(),
            name_spaces,
        ]);

        let tagged: BytesCbor<Value> = device_authentication.into();
        let tagged = tagged
            .try_into_cbor()
            .map_err(|message| bherror::Error::root(MdocError::DeviceAuthentication).ctx(message))?;

        let mut bytes = vec![];
        ciborium::into_writer(&tagged, &mut bytes)
            .foreign_err(|| MdocError::DeviceAuthentication)?;

        Ok(bytes)
    }
}

/// [`DeviceAuth`] as defined in the section `8.3.2.1.2.2` of the [ISO/IEC 18013-5:2021][1]
/// standard.
///
/// [1]: <https://www.iso.org/standard/69084.html>
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceAuth {
    /// The `mdoc` Device authentication with a signature.
    DeviceSignature(DeviceSignature),
    /// The `mdoc` Device authentication with a MAC.
    DeviceMac(DeviceMac),
}

/// A detached `COSE_Sign1` over the `DeviceAuthenticationBytes`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DeviceSignature(
    #[serde(with = "as_cbor")]
    coset::CoseSign1,
);

impl From<coset::CoseSign1> for DeviceSignature {
    fn from(value: coset::CoseSign1) -> Self {
        Self(value)
    }
}

/// A detached `COSE_Mac0` over the `DeviceAuthenticationBytes`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DeviceMac(
    #[serde(with = "as_cbor")]
    coset::CoseMac0,
);

impl DeviceAuth {
    /// Signs the `device_authentication` with the Device key behind `signer`.
    pub(crate) fn new_signature(
        device_authentication: &DeviceAuthentication<'_>,
        signer: &impl Signer,
    ) -> Result<Self> {
        let alg = cose_algorithm_of(signer.algorithm()).ok_or_else(|| {
            bherror::Error::root(MdocError::InvalidDeviceSigner(
                signer.algorithm().to_string(),
            ))
        })?;

        let protected = Header {
            alg: Some(Algorithm::Assigned(alg)),
            ..Default::default()
        };

        let payload = device_authentication.to_bytes()?;

        let cose_sign1 = coset::CoseSign1Builder::new()
            .protected(protected)
            .try_create_detached_signature(&payload, &[], |data| signer.sign(data))
            .foreign_boxed_err(|| MdocError::Signing)?
            .build();

        Ok(Self::DeviceSignature(cose_sign1.into()))
    }

    /// Verifies the signature over `device_authentication` with the Device
    /// `key` signed by the Issuer.
    ///
    /// The MAC variant cannot be verified without the session keys of the
    /// proximity flow and fails with [`MdocError::DeviceMac`].
    pub(crate) fn verify_signature(
        &self,
        device_authentication: &DeviceAuthentication<'_>,
        key: &PublicKey,
    ) -> Result<()> {
        let Self::DeviceSignature(DeviceSignature(cose_sign1)) = self else {
            return Err(bherror::Error::root(MdocError::DeviceMac));
        };

        let alg =
            verification_algorithm(key, &cose_sign1.protected.header).ctx(|| "device signature")?;

        let payload = device_authentication.to_bytes()?;

        cose_sign1.verify_detached_signature(&payload, &[], |signature, data| {
            check_signature(key, alg, signature, data)
        })
    }

    #[cfg(test)]
    pub(crate) fn device_signature_inner_mut(&mut self) -> &mut coset::CoseSign1 {
        match self {
            Self::DeviceSignature(DeviceSignature(inner)) => inner,
            Self::DeviceMac(_) => panic!("not a device signature"),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use bh_jws_utils::{KeyType, SigningKey};

    use super::*;
    use crate::models::data_retrieval::device_retrieval::response::DeviceNameSpaces;

    fn session() -> PresentationSession {
        PresentationSession::new("client", "https://verifier.example/cb", "nonce", "mdoc-nonce")
    }

    #[test]
    fn session_transcript_shape() {
        let transcript = session().session_transcript().unwrap();

        let Value::Array(items) = transcript else {
            panic!("transcript is not an array");
        };
        assert_eq!(items[0], Value::Null);
        assert_eq!(items[1], Value::Null);

        let Value::Array(handover) = &items[2] else {
            panic!("handover is not an array");
        };
        assert_eq!(handover.len(), 3);
        assert_eq!(handover[0].as_bytes().unwrap().len(), 32);
        assert_eq!(handover[2], Value::Text("nonce".to_owned()));

        // same inputs, same hashes
        assert_eq!(
            session().session_transcript().unwrap(),
            session().session_transcript().unwrap()
        );
    }

    #[test]
    fn device_authentication_bytes_are_tagged() {
        let name_spaces = DeviceNameSpaces::default().into();
        let doc_type = DocType::from("org.iso.18013.5.1.mDL");
        let auth = DeviceAuthentication::new(&session(), &doc_type, &name_spaces).unwrap();

        let bytes = auth.to_bytes().unwrap();
        let value: Value = ciborium::from_reader(bytes.as_slice()).unwrap();

        let Value::Tag(24, inner) = value else {
            panic!("not tagged with 24");
        };
        let inner: Value = ciborium::from_reader(inner.as_bytes().unwrap().as_slice()).unwrap();
        let Value::Array(items) = inner else {
            panic!("not an array");
        };
        assert_eq!(items[0], Value::Text(DEVICE_AUTHENTICATION_CONTEXT.to_owned()));
        assert_eq!(items[2], Value::Text("org.iso.18013.5.1.mDL".to_owned()));
    }

    #[test]
    fn sign_and_verify_device_authentication() {
        let device = SigningKey::generate(KeyType::EcP384).unwrap();
        let name_spaces = DeviceNameSpaces::default().into();
        let doc_type = DocType::from("org.iso.18013.5.1.mDL");

        let auth = DeviceAuthentication::new(&session(), &doc_type, &name_spaces).unwrap();
        let device_auth = DeviceAuth::new_signature(&auth, &device).unwrap();

        device_auth
            .verify_signature(&auth, &device.public_key().unwrap())
            .unwrap();

        let other_session = PresentationSession::new(
            "client",
            "https://verifier.example/cb",
            "other nonce",
            "mdoc-nonce",
        );
        let other = DeviceAuthentication::new(&other_session, &doc_type, &name_spaces).unwrap();
        assert_matches!(
            device_auth
                .verify_signature(&other, &device.public_key().unwrap())
                .unwrap_err()
                .error,
            MdocError::InvalidSignature
        );
    }

    #[test]
    fn non_ecdsa_device_signer_is_rejected() {
        let device = SigningKey::generate(KeyType::Ed25519).unwrap();
        let name_spaces = DeviceNameSpaces::default().into();
        let doc_type = DocType::from("org.iso.18013.5.1.mDL");
        let auth = DeviceAuthentication::new(&session(), &doc_type, &name_spaces).unwrap();

        assert_matches!(
            DeviceAuth::new_signature(&auth, &device).unwrap_err().error,
            MdocError::InvalidDeviceSigner(_)
        );
    }

    #[test]
    fn mac_is_not_supported() {
        let mac = coset::CoseMac0Builder::new()
            .protected(Header {
                alg: Some(Algorithm::Assigned(coset::iana::Algorithm::HMAC_256_256)),
                ..Default::default()
            })
            .tag(vec![0; 32])
            .build();
        let device_auth = DeviceAuth::DeviceMac(DeviceMac(mac));

        let device = SigningKey::generate(KeyType::EcP256).unwrap();
        let name_spaces = DeviceNameSpaces::default().into();
        let doc_type = DocType::from("org.iso.18013.5.1.mDL");
        let auth = DeviceAuthentication::new(&session(), &doc_type, &name_spaces).unwrap();

        assert_matches!(
            device_auth
                .verify_signature(&auth, &device.public_key().unwrap())
                .unwrap_err()
                .error,
            MdocError::DeviceMac
        );
    }
}
