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

//! Constants and a typed claim set for `mDL` (mobile driving license) documents.

use std::collections::HashMap;

use super::{
    data_retrieval::{
        common::{DataElementIdentifier, DataElementValue},
        Claims,
    },
    Bytes, FullDate,
};

/// The document type for an _mDL_ document, section `7.1` of the
/// [ISO/IEC 18013-5:2021][1].
///
/// [1]: <https://www.iso.org/standard/69084.html>
pub const MDL_DOCUMENT_TYPE: &str = "org.iso.18013.5.1.mDL";

/// The namespace for _mDL_ data, section `7.1` of the [ISO/IEC 18013-5:2021][1].
///
/// [1]: <https://www.iso.org/standard/69084.html>
pub const MDL_NAMESPACE: &str = "org.iso.18013.5.1";

/// Mandatory data elements of an `mDL`, from Table 5 of the ISO/IEC 18013-5:2021.
#[derive(Debug, Clone)]
pub struct MdlMandatory {
    /// Last name, surname, or primary identifier of the holder.
    pub family_name: String,
    /// First name(s), other name(s), or secondary identifier of the holder.
    pub given_name: String,
    /// Date of birth.
    pub birth_date: FullDate,
    /// Date when the `mDL` was issued.
    pub issue_date: FullDate,
    /// Date when the `mDL` expires.
    pub expiry_date: FullDate,
    /// Alpha-2 country code of the issuing authority.
    pub issuing_country: String,
    /// Issuing authority name.
    pub issuing_authority: String,
    /// Number assigned by the issuing authority.
    pub document_number: String,
    /// Portrait of the holder.
    pub portrait: Bytes,
    /// Distinguishing sign of the issuing country.
    pub un_distinguishing_sign: String,
}

impl From<MdlMandatory> for HashMap<DataElementIdentifier, DataElementValue> {
    fn from(mdl: MdlMandatory) -> Self {
        HashMap::from([
            ("family_name".into(), mdl.family_name.into()),
            ("given_name".into(), mdl.given_name.into()),
            ("birth_date".into(), mdl.birth_date.into()),
            ("issue_date".into(), mdl.issue_date.into()),
            ("expiry_date".into(), mdl.expiry_date.into()),
            ("issuing_country".into(), mdl.issuing_country.into()),
            ("issuing_authority".into(), mdl.issuing_authority.into()),
            ("document_number".into(), mdl.document_number.into()),
            ("portrait".into(), mdl.portrait.into()),
            (
                "un_distinguishing_sign".into(),
                mdl.un_distinguishing_sign.into(),
            ),
        ])
    }
}

impl From<MdlMandatory> for Claims {
    fn from(mdl: MdlMandatory) -> Self {
        Claims(HashMap::from([(MDL_NAMESPACE.into(), mdl.into())]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NameSpace;

    #[test]
    fn mandatory_elements_land_in_mdl_namespace() {
        let claims: Claims = MdlMandatory {
            family_name: "Doe".to_owned(),
            given_name: "John".to_owned(),
            birth_date: "1980-01-02".parse().unwrap(),
            issue_date: "2024-01-01".parse().unwrap(),
            expiry_date: "2029-01-01".parse().unwrap(),
            issuing_country: "HR".to_owned(),
            issuing_authority: "MUP".to_owned(),
            document_number: "1234".to_owned(),
            portrait: vec![1u8, 2, 3].into(),
            un_distinguishing_sign: "HR".to_owned(),
        }
        .into();

        let elements = &claims.0[&NameSpace::from(MDL_NAMESPACE)];
        assert_eq!(elements.len(), 10);
        assert_eq!(
            elements[&DataElementIdentifier::from("family_name")],
            "Doe".into()
        );

        let json = claims.into_json().unwrap();
        assert_eq!(json[MDL_NAMESPACE]["birth_date"], "1980-01-02");
    }
}
