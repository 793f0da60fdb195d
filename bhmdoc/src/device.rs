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

//! The holder side: a [`Device`] keeps one issued credential and presents it.

use bh_jws_utils::Signer;
use bherror::traits::ForeignBoxed as _;

use crate::{
    models::{
        data_retrieval::{
            common::DocType,
            device_retrieval::{
                device_auth::PresentationSession,
                issuer_auth::ValidityInfo,
                response::{DeviceSigned, Document, IssuerNameSpaces, IssuerSigned},
            },
            Claims, ElementSelection,
        },
        DeviceResponse,
    },
    DeviceKey, MdocError, Result,
};

/// An `mdoc` Device holding a single accepted credential.
#[derive(Debug)]
pub struct Device {
    doc_type: DocType,
    issuer_signed: IssuerSigned,
}

impl Device {
    /// The type of the held document.
    pub fn doc_type(&self) -> &DocType {
        &self.doc_type
    }

    /// Accepts an issued credential, the unpadded `base64url` _CBOR_ string
    /// returned by [`IssuedDocument::serialize_issuer_signed`][1].
    ///
    /// The Issuer signature must verify with the leaf of the embedded
    /// `x5chain`, the MSO must be signed for `doc_type` and every element's
    /// digest must match. An expired credential is refused, one that is not
    /// valid yet is accepted. The `x5chain` is not checked against any trust
    /// anchor here; that is the Verifier's job.
    ///
    /// [1]: crate::models::issue::IssuedDocument::serialize_issuer_signed
    pub fn verify_issued(issuer_signed: &str, doc_type: DocType, current_time: u64) -> Result<Self> {
        let issuer_signed = IssuerSigned::from_base64_url(issuer_signed)?;
        issuer_signed.validate_device(current_time, &doc_type)?;

        tracing::debug!(%doc_type, "issued mdoc accepted");

        Ok(Self {
            doc_type,
            issuer_signed,
        })
    }

    /// Presents the owned credential, disclosing only the `selection`.
    ///
    /// Selected elements the credential does not hold are ignored. An empty
    /// selection still yields a [`Document`], carrying both signatures but no
    /// data elements. Everything disclosed is also signed by the Device and
    /// bound to the `session`.
    ///
    /// # Errors
    ///
    /// - [`InvalidDeviceSigner`][MdocError::InvalidDeviceSigner] if `signer`
    ///   does not hold the Device key the credential is bound to,
    /// - [`DocumentExpired`][MdocError::DocumentExpired] or
    ///   [`DocumentNotYetValid`][MdocError::DocumentNotYetValid] outside the
    ///   validity period,
    /// - [`DeviceAuthentication`][MdocError::DeviceAuthentication] or
    ///   [`Signing`][MdocError::Signing] if the Device signature cannot be
    ///   produced.
    pub fn present(
        &self,
        current_time: u64,
        selection: &ElementSelection,
        session: &PresentationSession,
        signer: &impl Signer,
    ) -> Result<DeviceResponse> {
        self.check_device_key(signer)?;
        self.validity_info()?.check(current_time)?;

        let issuer_signed = self.issuer_signed.disclose(selection);
        let device_name_spaces = issuer_signed
            .name_spaces
            .as_ref()
            .map(IssuerNameSpaces::to_device_name_spaces)
            .unwrap_or_default();

        let device_signed = DeviceSigned::new(device_name_spaces, session, &self.doc_type, signer)?;

        tracing::debug!(doc_type = %self.doc_type, "mdoc presented");

        Ok(DeviceResponse::new(vec![Document::new(
            self.doc_type.clone(),
            issuer_signed,
            device_signed,
        )]))
    }

    /// Consumes the Device, returning every held element.
    pub fn into_claims(self) -> (DocType, Claims) {
        (self.doc_type, self.issuer_signed.into_claims())
    }

    /// The held elements, without presenting anything.
    pub fn claims(&self) -> (&DocType, Claims) {
        (&self.doc_type, self.issuer_signed.claims())
    }

    /// The validity period signed into the MSO.
    pub fn validity_info(&self) -> Result<ValidityInfo> {
        self.issuer_signed.issuer_auth.validity_info()
    }

    /// Fails unless `signer` holds the Device key the Issuer bound the
    /// credential to. Keys are compared as public keys, so differently
    /// ordered `COSE_Key` encodings of one key match.
    fn check_device_key(&self, signer: &impl Signer) -> Result<()> {
        let invalid = |reason: &str| MdocError::InvalidDeviceSigner(reason.to_owned());

        let jwk = signer
            .public_jwk()
            .foreign_boxed_err(|| invalid("unable to fetch public JWK"))?;
        let presented = DeviceKey::from_jwk(&jwk)?.public_key()?;
        let bound = self.issuer_signed.device_key()?.public_key()?;

        if presented != bound {
            return Err(bherror::Error::root(invalid(
                "public key does not match the signed one",
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;
    use crate::{
        models::mdl::{MDL_DOCUMENT_TYPE, MDL_NAMESPACE},
        utils::test::{
            device_signer, family_name_selection, issue_dummy_mdoc, issue_dummy_mdoc_to_device,
            session,
        },
    };

    const DAY: u64 = 24 * 60 * 60;

    fn accept(current_time: u64, doc_type: &str) -> Result<Device> {
        let issued = issue_dummy_mdoc(100);
        Device::verify_issued(
            &issued.serialize_issuer_signed().unwrap(),
            doc_type.into(),
            current_time,
        )
    }

    fn presented_claims(response: DeviceResponse) -> (Claims, Claims) {
        let mut documents = response.into_documents();
        assert_eq!(documents.len(), 1);
        let document = documents.remove(0);

        (
            document.issuer_signed.into_claims(),
            document.device_signed.into_claims(),
        )
    }

    #[test]
    fn accepts_issued_credential() {
        let (doc_type, claims) = accept(105, MDL_DOCUMENT_TYPE).unwrap().into_claims();

        assert_eq!(doc_type, DocType::from(MDL_DOCUMENT_TYPE));
        assert_eq!(
            claims.0,
            HashMap::from([(
                MDL_NAMESPACE.into(),
                HashMap::from([
                    ("given_name".into(), "John".into()),
                    ("family_name".into(), "Doe".into()),
                ]),
            )])
        );
    }

    #[test]
    fn accepts_credential_before_it_becomes_valid() {
        accept(40, MDL_DOCUMENT_TYPE).unwrap();
    }

    #[test]
    fn rejects_unusable_credentials() {
        assert_matches!(
            Device::verify_issued("<INVALID-MDOC>", MDL_DOCUMENT_TYPE.into(), 100)
                .unwrap_err()
                .error,
            MdocError::IssuerSignedParse
        );

        assert_matches!(
            accept(100 + 400 * DAY, MDL_DOCUMENT_TYPE).unwrap_err().error,
            MdocError::DocumentExpired(_)
        );

        assert_matches!(
            accept(100, "other.doc.type").unwrap_err().error,
            MdocError::InvalidDocType(expected, actual)
                if expected == "other.doc.type".into() && actual == MDL_DOCUMENT_TYPE.into()
        );
    }

    #[test]
    fn presents_selected_elements() {
        let device = issue_dummy_mdoc_to_device(100);

        let response = device
            .present(101, &family_name_selection(), &session(), &device_signer())
            .unwrap();
        let (issuer_claims, device_claims) = presented_claims(response);

        assert_eq!(issuer_claims.len(), 1);
        assert_eq!(
            issuer_claims.get(MDL_NAMESPACE, "family_name"),
            Some(&"Doe".into())
        );
        assert_eq!(issuer_claims, device_claims);
    }

    #[test]
    fn unknown_selected_elements_are_ignored() {
        let device = issue_dummy_mdoc_to_device(100);
        let selection = family_name_selection()
            .element(MDL_NAMESPACE, "nonExistentClaim")
            .element("NON-EXISTENT-NAMESPACE", "family_name");

        let response = device
            .present(101, &selection, &session(), &device_signer())
            .unwrap();
        let (issuer_claims, device_claims) = presented_claims(response);

        assert_eq!(issuer_claims.len(), 1);
        assert_eq!(issuer_claims, device_claims);
    }

    #[test]
    fn empty_selection_still_presents_the_document() {
        let device = issue_dummy_mdoc_to_device(100);

        let response = device
            .present(101, &ElementSelection::new(), &session(), &device_signer())
            .unwrap();
        let (issuer_claims, device_claims) = presented_claims(response);

        assert!(issuer_claims.is_empty());
        assert!(device_claims.is_empty());
    }

    #[test]
    fn full_selection() {
        let device = issue_dummy_mdoc_to_device(100);
        let (_, claims) = device.claims();

        let response = device
            .present(101, &ElementSelection::all(&claims), &session(), &device_signer())
            .unwrap();
        let (issuer_claims, _) = presented_claims(response);

        assert_eq!(issuer_claims, claims);
    }

    #[test]
    fn presentation_outside_validity_fails() {
        let device = issue_dummy_mdoc_to_device(100);

        let err = device
            .present(100 + 400 * DAY, &family_name_selection(), &session(), &device_signer())
            .unwrap_err();
        assert_matches!(err.error, MdocError::DocumentExpired(_));

        let err = device
            .present(90, &family_name_selection(), &session(), &device_signer())
            .unwrap_err();
        assert_matches!(err.error, MdocError::DocumentNotYetValid(100));
    }

    #[test]
    fn presentation_requires_the_bound_device_key() {
        let device = issue_dummy_mdoc_to_device(100);
        let other = bh_jws_utils::SigningKey::generate(bh_jws_utils::KeyType::EcP256).unwrap();

        let err = device
            .present(110, &ElementSelection::new(), &session(), &other)
            .unwrap_err();
        assert_matches!(
            err.error,
            MdocError::InvalidDeviceSigner(s) if s == "public key does not match the signed one"
        );
    }

    #[test]
    fn validity_info_is_exposed() {
        let device = issue_dummy_mdoc_to_device(100);

        let validity = device.validity_info().unwrap();
        assert_eq!(validity.valid_from.timestamp(), 100);
        assert_eq!(device.doc_type(), &DocType::from(MDL_DOCUMENT_TYPE));
    }
}
