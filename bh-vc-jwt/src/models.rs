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

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Seconds since the Unix epoch, as used by the JWT time claims.
pub type SecondsSinceEpoch = u64;

/// A JSON object.
pub type JsonObject = Map<String, Value>;

/// Base context of the W3C VC data model.
pub const CREDENTIALS_CONTEXT_V1: &str = "https://www.w3.org/2018/credentials/v1";
/// Type every credential carries.
pub const VERIFIABLE_CREDENTIAL_TYPE: &str = "VerifiableCredential";
/// Type every presentation carries.
pub const VERIFIABLE_PRESENTATION_TYPE: &str = "VerifiablePresentation";
/// JWT header `typ` of signed credentials and presentations.
pub const TYP_JWT: &str = "JWT";

/// Purpose of a status list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusPurpose {
    /// A set bit means the credential is revoked, permanently.
    Revocation,
    /// A set bit means the credential is suspended.
    Suspension,
}

/// The `credentialStatus` of a credential, pointing at a bit of a status list
/// credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialStatus {
    /// Identifier of this entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Entry type, e.g. `BitstringStatusListEntry`.
    #[serde(rename = "type")]
    pub status_type: String,
    /// What a set bit means.
    pub status_purpose: StatusPurpose,
    /// Bit index within the list; serialized as a decimal string.
    #[serde(
        serialize_with = "serialize_index",
        deserialize_with = "deserialize_index"
    )]
    pub status_list_index: usize,
    /// URL of the status list credential.
    pub status_list_credential: String,
}

fn serialize_index<S: Serializer>(index: &usize, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&index.to_string())
}

fn deserialize_index<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Index {
        Number(usize),
        Text(String),
    }

    match Index::deserialize(deserializer)? {
        Index::Number(index) => Ok(index),
        Index::Text(text) => text.parse().map_err(serde::de::Error::custom),
    }
}

/// The `vc` claim of a JWT credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiableCredential {
    /// JSON-LD contexts.
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    /// Credential types, including [`VERIFIABLE_CREDENTIAL_TYPE`].
    #[serde(rename = "type")]
    pub types: Vec<String>,
    /// Claims about the subject.
    pub credential_subject: JsonObject,
    /// Issuer DID.
    pub issuer: String,
    /// RFC 3339 issuance instant.
    pub issuance_date: String,
    /// RFC 3339 expiry instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
    /// Reference into a status list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_status: Option<CredentialStatus>,
}

impl VerifiableCredential {
    /// A credential of `credential_type` with the base context and type.
    pub fn new(
        credential_type: &str,
        issuer: impl Into<String>,
        credential_subject: JsonObject,
        issuance_date: impl Into<String>,
    ) -> Self {
        Self {
            context: vec![CREDENTIALS_CONTEXT_V1.to_owned()],
            types: vec![
                VERIFIABLE_CREDENTIAL_TYPE.to_owned(),
                credential_type.to_owned(),
            ],
            credential_subject,
            issuer: issuer.into(),
            issuance_date: issuance_date.into(),
            expiration_date: None,
            credential_status: None,
        }
    }

    /// The `id` of the credential subject, if present.
    pub fn subject_id(&self) -> Option<&str> {
        self.credential_subject.get("id").and_then(Value::as_str)
    }
}

/// Claims of a JWT credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VcClaims {
    /// Issuer DID.
    pub iss: String,
    /// Subject (holder) DID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<SecondsSinceEpoch>,
    /// Start of validity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<SecondsSinceEpoch>,
    /// Issuance instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<SecondsSinceEpoch>,
    /// Credential identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// The credential.
    pub vc: VerifiableCredential,
}

impl VcClaims {
    /// The holder the credential was issued to: `sub`, or else the subject `id`.
    pub fn holder(&self) -> Option<&str> {
        self.sub.as_deref().or_else(|| self.vc.subject_id())
    }
}

/// A single audience or a list of audiences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// `"aud": "https://verifier.example"`
    Single(String),
    /// `"aud": ["https://a.example", "https://b.example"]`
    Many(Vec<String>),
}

impl Audience {
    /// Whether `audience` is a member.
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Audience::Single(single) => single == audience,
            Audience::Many(many) => many.iter().any(|member| member == audience),
        }
    }
}

impl From<&str> for Audience {
    fn from(audience: &str) -> Self {
        Audience::Single(audience.to_owned())
    }
}

/// The `vp` claim of a JWT presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiablePresentation {
    /// JSON-LD contexts.
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    /// Presentation types, including [`VERIFIABLE_PRESENTATION_TYPE`].
    #[serde(rename = "type")]
    pub types: Vec<String>,
    /// Embedded credentials: JWT or SD-JWT VCs, or base64url mobile documents.
    #[serde(default)]
    pub verifiable_credential: Vec<String>,
    /// Holder DID.
    pub holder: String,
}

impl VerifiablePresentation {
    /// A presentation of `credentials` by `holder` with the base context and type.
    pub fn new(holder: impl Into<String>, credentials: Vec<String>) -> Self {
        Self {
            context: vec![CREDENTIALS_CONTEXT_V1.to_owned()],
            types: vec![VERIFIABLE_PRESENTATION_TYPE.to_owned()],
            verifiable_credential: credentials,
            holder: holder.into(),
        }
    }
}

/// Claims of a JWT presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VpClaims {
    /// The verifier's nonce.
    pub jti: String,
    /// Holder DID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Intended verifier(s).
    pub aud: Audience,
    /// Expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<SecondsSinceEpoch>,
    /// Start of validity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<SecondsSinceEpoch>,
    /// Creation instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<SecondsSinceEpoch>,
    /// The presentation.
    pub vp: VerifiablePresentation,
}
