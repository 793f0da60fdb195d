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

use bh_vc_jwt::{StatusPurpose, VcClaims, VerifiableCredential};
use bherror::{
    traits::{ErrorContext as _, ForeignError as _},
    Error as BhError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result, StatusList};

/// Credential type of a status list credential.
pub const BITSTRING_STATUS_LIST_CREDENTIAL_TYPE: &str = "BitstringStatusListCredential";
/// Type of the subject of a status list credential.
pub const BITSTRING_STATUS_LIST_TYPE: &str = "BitstringStatusList";
/// Type of the `credentialStatus` entries pointing into a status list.
pub const BITSTRING_STATUS_LIST_ENTRY_TYPE: &str = "BitstringStatusListEntry";

/// The `credentialSubject` of a status list credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusListSubject {
    /// Identifier of the list, usually the URL it is published at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Always [`BITSTRING_STATUS_LIST_TYPE`].
    #[serde(rename = "type")]
    pub subject_type: String,
    /// What a set bit means.
    pub status_purpose: StatusPurpose,
    /// GZIP compressed, base64url encoded bitstring.
    pub encoded_list: String,
}

impl StatusListSubject {
    /// Extract the subject from the claims of a status list credential.
    pub fn from_claims(claims: &VcClaims) -> Result<Self> {
        serde_json::from_value(Value::Object(claims.vc.credential_subject.clone()))
        .foreign_err(|| Error::MalformedStatusListCredential)
        .ctx(|| format!("credential issued by {}", claims.iss))
    }

    /// The decoded bitstring.
    pub fn status_list(&self) -> Result<StatusList> {
        StatusList::from_encoded(&self.encoded_list)
    }
}

/// Claims of a status list credential publishing `list` for `purpose`.
///
/// `id` is the URL the credential is published at, which is also what
/// `credentialStatus.statusListCredential` entries point to. The result is
/// meant to be signed with [`bh_vc_jwt::sign_credential`].
pub fn status_list_credential(
    id: &str,
    issuer: &str,
    purpose: StatusPurpose,
    list: &StatusList,
    issuance_date: &str,
) -> Result<VcClaims> {
    let subject = StatusListSubject {
        id: Some(format!("{}#list", id)),
        subject_type: BITSTRING_STATUS_LIST_TYPE.to_owned(),
        status_purpose: purpose,
        encoded_list: list.encode()?,
    };

    let Value::Object(subject) = serde_json::to_value(subject)
        .foreign_err(|| Error::MalformedStatusListCredential)?
    else {
        return Err(BhError::root(Error::MalformedStatusListCredential));
    };

    Ok(VcClaims {
        iss: issuer.to_owned(),
        sub: None,
        exp: None,
        nbf: None,
        iat: None,
        jti: Some(id.to_owned()),
        vc: VerifiableCredential::new(
            BITSTRING_STATUS_LIST_CREDENTIAL_TYPE,
            issuer,
            subject,
            issuance_date,
        ),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn credential_carries_the_encoded_list() {
        let mut list = StatusList::new(64);
        list.set(42, true).unwrap();

        let claims = status_list_credential(
            "https://issuer.example/status/1",
            "did:web:issuer.example",
            StatusPurpose::Revocation,
            &list,
            "2026-01-01T00:00:00Z",
        )
        .unwrap();

        assert_eq!(claims.jti.as_deref(), Some("https://issuer.example/status/1"));
        assert!(claims
            .vc
            .types
            .iter()
            .any(|t| t == BITSTRING_STATUS_LIST_CREDENTIAL_TYPE));
        assert_eq!(
            claims.vc.credential_subject["type"],
            json!(BITSTRING_STATUS_LIST_TYPE)
        );
        assert_eq!(
            claims.vc.credential_subject["statusPurpose"],
            json!("revocation")
        );

        let subject = StatusListSubject::from_claims(&claims).unwrap();
        assert_eq!(subject.status_list().unwrap(), list);
    }

    #[test]
    fn subject_without_encoded_list_is_malformed() {
        let mut claims = status_list_credential(
            "https://issuer.example/status/1",
            "did:web:issuer.example",
            StatusPurpose::Suspension,
            &StatusList::new(8),
            "2026-01-01T00:00:00Z",
        )
        .unwrap();
        claims.vc.credential_subject.remove("encodedList");

        let err = StatusListSubject::from_claims(&claims).unwrap_err();
        assert_eq!(err.error, Error::MalformedStatusListCredential);
    }
}
