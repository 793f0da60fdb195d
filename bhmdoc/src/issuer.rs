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

//! Issuance of `mso_mdoc` credentials such as the `mDL`.

use bh_jws_utils::Signer;
use bhx5chain::X5Chain;
use rand::Rng;

use crate::{
    models::{
        data_retrieval::{
            common::DocType,
            device_retrieval::{issuer_auth::ValidityInfo, response::IssuerSigned},
            Claims,
        },
        issue::IssuedDocument,
        mdl::{MdlMandatory, MDL_DOCUMENT_TYPE},
    },
    DeviceKey, Result,
};

/// Signs `mdoc`s on behalf of the issuing authority.
///
/// Each call takes the Document Signer `x5chain` and a `signer` for the
/// private key of its leaf certificate. The credential is bound to the
/// holder's `device_key`; `rng` salts every data element digest.
pub struct Issuer;

impl Issuer {
    /// Sign `claims` as a document of `doc_type`.
    #[allow(clippy::too_many_arguments)]
    pub fn issue<R: Rng + ?Sized>(
        &self,
        doc_type: DocType,
        claims: Claims,
        device_key: DeviceKey,
        signer: &impl Signer,
        x5chain: &X5Chain,
        rng: &mut R,
        validity_info: ValidityInfo,
    ) -> Result<IssuedDocument> {
        let signed = IssuerSigned::new(
            doc_type.clone(),
            claims,
            device_key,
            signer,
            x5chain,
            rng,
            validity_info,
        )?;
        tracing::debug!(%doc_type, "mdoc issued");

        Ok(IssuedDocument::new(doc_type, signed))
    }

    /// Sign the mandatory elements of a driving licence under the `mDL`
    /// doc type and namespace.
    pub fn issue_mdl<R: Rng + ?Sized>(
        &self,
        mdl: MdlMandatory,
        device_key: DeviceKey,
        signer: &impl Signer,
        x5chain: &X5Chain,
        rng: &mut R,
        validity_info: ValidityInfo,
    ) -> Result<IssuedDocument> {
        let doc_type = DocType::from(MDL_DOCUMENT_TYPE);
        self.issue(
            doc_type,
            Claims::from(mdl),
            device_key,
            signer,
            x5chain,
            rng,
            validity_info,
        )
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::{
        models::mdl::MDL_NAMESPACE,
        utils::test::{device_key_for, device_signer, validity_info, TestIssuer},
        Device, MdocError,
    };

    const PID_DOC_TYPE: &str = "eu.europa.ec.eudi.pid.1";
    const PID_NAMESPACE: &str = "eu.europa.ec.eudi.pid.1";

    fn pid_claims() -> Claims {
        let mut claims = Claims::default();
        claims.insert(PID_NAMESPACE.into(), "given_name".into(), "Ana".into());
        claims.insert(PID_NAMESPACE.into(), "age_over_18".into(), true.into());
        claims.insert(MDL_NAMESPACE.into(), "document_number".into(), "X1".into());
        claims
    }

    fn issue_pid(at: u64) -> IssuedDocument {
        let issuer = TestIssuer::new();
        Issuer
            .issue(
                PID_DOC_TYPE.into(),
                pid_claims(),
                device_key_for(&device_signer()),
                &issuer.key,
                &issuer.x5chain,
                &mut rand::rng(),
                validity_info(at),
            )
            .unwrap()
    }

    #[test]
    fn holder_accepts_any_doc_type() {
        let issued = issue_pid(1_000);
        assert_eq!(issued.doc_type(), &DocType::from(PID_DOC_TYPE));

        let transport = issued.serialize_issuer_signed().unwrap();
        assert!(!transport.contains('='));

        let device = Device::verify_issued(&transport, PID_DOC_TYPE.into(), 1_000).unwrap();
        let (_, claims) = device.into_claims();
        assert_eq!(claims, pid_claims());
    }

    #[test]
    fn holder_rejects_an_unexpected_doc_type() {
        let transport = issue_pid(1_000).serialize_issuer_signed().unwrap();

        let err = Device::verify_issued(&transport, MDL_DOCUMENT_TYPE.into(), 1_000).unwrap_err();
        assert_matches!(err.error, MdocError::InvalidDocType(..));
    }

    #[test]
    fn mdl_elements_are_issued_under_the_mdl_namespace() {
        let issuer = TestIssuer::new();
        let mdl = MdlMandatory {
            family_name: "Horvat".to_owned(),
            given_name: "Iva".to_owned(),
            birth_date: "1991-07-15".parse().unwrap(),
            issue_date: "2025-03-01".parse().unwrap(),
            expiry_date: "2035-03-01".parse().unwrap(),
            issuing_authority: "MUP".to_owned(),
            issuing_country: "HR".to_owned(),
            document_number: "009911".to_owned(),
            portrait: vec![0xff, 0xd8, 0xff].into(),
            un_distinguishing_sign: "HR".to_owned(),
        };

        let issued = Issuer
            .issue_mdl(
                mdl,
                device_key_for(&device_signer()),
                &issuer.key,
                &issuer.x5chain,
                &mut rand::rng(),
                validity_info(500),
            )
            .unwrap();
        let transport = issued.serialize_issuer_signed().unwrap();

        let device = Device::verify_issued(&transport, MDL_DOCUMENT_TYPE.into(), 500).unwrap();
        let (doc_type, claims) = device.into_claims();
        assert_eq!(doc_type, DocType::from(MDL_DOCUMENT_TYPE));
        assert_eq!(claims.len(), 10);
        assert_eq!(claims.get(MDL_NAMESPACE, "given_name"), Some(&"Iva".into()));
        assert_eq!(
            claims.get(MDL_NAMESPACE, "portrait"),
            Some(&vec![0xffu8, 0xd8, 0xff].into())
        );
    }
}
