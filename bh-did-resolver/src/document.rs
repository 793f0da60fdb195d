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

use bh_jws_utils::JwkPublic;
use serde::{Deserialize, Serialize};

use crate::Did;

/// Verification method type used for documents synthesized from `did:jwk`.
pub const JSON_WEB_KEY_2020: &str = "JsonWebKey2020";

/// The subset of a [DID document](https://www.w3.org/TR/did-core/#did-documents)
/// needed to find verification keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    /// The DID the document describes.
    pub id: String,
    /// Keys of the subject.
    #[serde(default)]
    pub verification_method: Vec<VerificationMethod>,
}

/// A single entry of `verificationMethod`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    /// Absolute (`did:web:example.com#key-1`) or relative (`#key-1`) id.
    pub id: String,
    /// Verification method type, e.g. `JsonWebKey2020`.
    #[serde(rename = "type")]
    pub method_type: String,
    /// The DID controlling the key.
    pub controller: String,
    /// The public key.
    pub public_key_jwk: JwkPublic,
}

impl DidDocument {
    /// The document of a `did:jwk`, which has exactly one verification method `#0`.
    pub fn from_did_jwk(did: &Did, jwk: JwkPublic) -> Self {
        let id = did.base();
        Self {
            verification_method: vec![VerificationMethod {
                id: format!("{}#0", id),
                method_type: JSON_WEB_KEY_2020.to_owned(),
                controller: id.clone(),
                public_key_jwk: jwk,
            }],
            id,
        }
    }

    /// Select the verification method named by `fragment`, or the first one
    /// if there is no fragment.
    pub fn select_verification_method(&self, fragment: Option<&str>) -> Option<&VerificationMethod> {
        match fragment {
            None => self.verification_method.first(),
            Some(fragment) => self.verification_method.iter().find(|method| {
                method
                    .id
                    .rsplit_once('#')
                    .is_some_and(|(_, id_fragment)| id_fragment == fragment)
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn document() -> DidDocument {
        serde_json::from_value(json!({
            "@context": ["https://www.w3.org/ns/did/v1"],
            "id": "did:web:example.com",
            "verificationMethod": [
                {
                    "id": "did:web:example.com#key-1",
                    "type": "JsonWebKey2020",
                    "controller": "did:web:example.com",
                    "publicKeyJwk": { "kty": "EC", "crv": "P-256", "x": "a", "y": "b" }
                },
                {
                    "id": "#key-2",
                    "type": "JsonWebKey2020",
                    "controller": "did:web:example.com",
                    "publicKeyJwk": { "kty": "EC", "crv": "P-384", "x": "c", "y": "d" }
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn selects_first_method_without_fragment() {
        let document = document();
        let method = document.select_verification_method(None).unwrap();
        assert_eq!(method.id, "did:web:example.com#key-1");
        assert_eq!(method.method_type, "JsonWebKey2020");
    }

    #[test]
    fn selects_method_by_fragment() {
        let document = document();

        let method = document.select_verification_method(Some("key-2")).unwrap();
        assert_eq!(method.public_key_jwk["crv"], "P-384");

        assert!(document.select_verification_method(Some("key-3")).is_none());
    }

    #[test]
    fn document_without_methods_has_no_key() {
        let document: DidDocument =
            serde_json::from_value(json!({ "id": "did:web:example.com" })).unwrap();
        assert!(document.select_verification_method(None).is_none());
    }
}
