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

use bherror::{
    traits::{ErrorContext as _, ForeignBoxed as _, ForeignError as _},
    Error, Result,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    base64_url_decode, base64_url_encode, construct_jws_payload, FormatError, PublicKey,
    SignatureError, Signer, SigningAlgorithm,
};

/// The protected header of a compact JWS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoseHeader {
    /// The algorithm the token claims to be signed with.
    pub alg: SigningAlgorithm,
    /// Key identifier, usually a DID URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Media type of the whole token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

/// Serialize `claims` and sign them into a compact JWS
/// `base64url(header).base64url(payload).base64url(signature)`.
///
/// The `alg` header is taken from the [`Signer`], and `kid` is embedded as
/// given.
pub fn sign_compact<C, S>(
    claims: &C,
    signer: &S,
    kid: &str,
    typ: Option<&str>,
) -> Result<String, SignatureError>
where
    C: Serialize + ?Sized,
    S: Signer + ?Sized,
{
    let header = JoseHeader {
        alg: signer.algorithm(),
        kid: Some(kid.to_owned()),
        typ: typ.map(str::to_owned),
    };

    let header = serde_json::to_vec(&header).foreign_err(|| SignatureError::SigningFailed)?;
    let claims = serde_json::to_vec(claims)
        .foreign_err(|| SignatureError::SigningFailed)
        .ctx(|| "claims are not serializable")?;

    let signing_input =
        construct_jws_payload(&base64_url_encode(header), &base64_url_encode(claims));

    let signature = signer
        .sign(signing_input.as_bytes())
        .foreign_boxed_err(|| SignatureError::SigningFailed)?;

    Ok(format!("{}.{}", signing_input, base64_url_encode(signature)))
}

/// A compact JWS that has been parsed but whose signature has **not** been
/// verified yet.
///
/// The header and claims may be inspected, e.g. to find the issuer whose key
/// is needed for verification, but must not be trusted until
/// [`UnverifiedJws::verify`] succeeds.
#[derive(Debug, Clone)]
pub struct UnverifiedJws {
    header: JoseHeader,
    claims: Map<String, Value>,
    signing_input: String,
    signature: Vec<u8>,
}

impl UnverifiedJws {
    /// Parse a compact JWS with a JSON object payload.
    pub fn parse(token: &str) -> Result<Self, FormatError> {
        let malformed = |message: &str| FormatError::MalformedJws(message.to_owned());

        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::root(malformed("expected three parts")));
        };

        let signing_input = construct_jws_payload(header, payload);

        let header_bytes =
            base64_url_decode(header).foreign_err(|| malformed("header is not base64url"))?;
        let header: JoseHeader = serde_json::from_slice(&header_bytes)
            .foreign_err(|| malformed("invalid header"))
            .ctx(|| "header is not JSON or has an unsupported `alg`")?;

        let payload_bytes =
            base64_url_decode(payload).foreign_err(|| malformed("payload is not base64url"))?;
        let claims: Map<String, Value> =
            serde_json::from_slice(&payload_bytes).foreign_err(|| malformed("invalid payload"))?;

        let signature =
            base64_url_decode(signature).foreign_err(|| malformed("signature is not base64url"))?;
        if signature.is_empty() {
            return Err(Error::root(malformed("empty signature")));
        }

        Ok(Self {
            header,
            claims,
            signing_input,
            signature,
        })
    }

    /// The unverified protected header.
    pub fn header(&self) -> &JoseHeader {
        &self.header
    }

    /// The unverified claims.
    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// Deserialize the unverified claims into `T`.
    pub fn claims_as<T: DeserializeOwned>(&self) -> Result<T, FormatError> {
        serde_json::from_value(Value::Object(self.claims.clone()))
            .foreign_err(|| FormatError::MalformedJws("unexpected claims shape".to_owned()))
    }

    /// Verify the signature with `public_key` and return the claims.
    ///
    /// The declared `alg` must belong to the family permitted by the key
    /// type, otherwise [`SignatureError::AlgorithmMismatch`] is returned.
    pub fn verify(self, public_key: &PublicKey) -> Result<Map<String, Value>, SignatureError> {
        let valid = public_key.verify(
            self.header.alg,
            self.signing_input.as_bytes(),
            &self.signature,
        )?;

        if !valid {
            return Err(Error::root(SignatureError::InvalidSignature));
        }

        Ok(self.claims)
    }

    /// Like [`UnverifiedJws::verify`], deserializing the verified claims into `T`.
    pub fn verify_as<T: DeserializeOwned>(
        self,
        public_key: &PublicKey,
    ) -> Result<T, SignatureError> {
        let claims = self.verify(public_key)?;

        serde_json::from_value(Value::Object(claims))
            .foreign_err(|| SignatureError::InvalidSignature)
            .ctx(|| "verified claims could not be deserialized")
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::{json_object, KeyType, SigningKey};

    #[test]
    fn sign_and_verify_round_trip() {
        let key = SigningKey::generate(KeyType::EcP256).unwrap();
        let claims = json_object!({ "iss": "did:web:issuer.example", "n": 1 });

        let token = sign_compact(&claims, &key, "did:web:issuer.example#key-1", None).unwrap();
        let jws = UnverifiedJws::parse(&token).unwrap();

        assert_eq!(jws.header().alg, SigningAlgorithm::Es256);
        assert_eq!(
            jws.header().kid.as_deref(),
            Some("did:web:issuer.example#key-1")
        );
        assert_eq!(jws.claims(), &claims);

        let verified = jws.verify(&key.public_key().unwrap()).unwrap();
        assert_eq!(verified, claims);
    }

    #[test]
    fn verify_with_other_key_fails() {
        let key = SigningKey::generate(KeyType::EcP384).unwrap();
        let other = SigningKey::generate(KeyType::EcP384).unwrap();
        let token = sign_compact(&json!({ "a": true }), &key, "kid", None).unwrap();

        let err = UnverifiedJws::parse(&token)
            .unwrap()
            .verify(&other.public_key().unwrap())
            .unwrap_err();
        assert_eq!(err.error, SignatureError::InvalidSignature);
    }

    #[test]
    fn header_algorithm_does_not_select_key_type() {
        let ec_key = SigningKey::generate(KeyType::EcP256).unwrap();
        let ed_key = SigningKey::generate(KeyType::Ed25519).unwrap();

        // Token signed with Ed25519 and checked against an EC key must not
        // be accepted, whatever the header says.
        let token = sign_compact(&json!({ "a": 1 }), &ed_key, "kid", None).unwrap();
        let err = UnverifiedJws::parse(&token)
            .unwrap()
            .verify(&ec_key.public_key().unwrap())
            .unwrap_err();
        assert_eq!(
            err.error,
            SignatureError::AlgorithmMismatch(SigningAlgorithm::EdDsa, KeyType::EcP256)
        );
    }

    #[test]
    fn tampered_payload_fails() {
        let key = SigningKey::generate(KeyType::EcP256).unwrap();
        let token = sign_compact(&json!({ "admin": false }), &key, "kid", None).unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = base64_url_encode(br#"{"admin":true}"#);
        parts[1] = &forged;
        let forged_token = parts.join(".");

        let err = UnverifiedJws::parse(&forged_token)
            .unwrap()
            .verify(&key.public_key().unwrap())
            .unwrap_err();
        assert_eq!(err.error, SignatureError::InvalidSignature);
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        for token in ["", "a.b", "a.b.c.d", "!!.e30.c2ln"] {
            let err = UnverifiedJws::parse(token).unwrap_err();
            assert_matches!(err.error, FormatError::MalformedJws(_));
        }

        // `alg: none` is not a supported algorithm
        let header = base64_url_encode(br#"{"alg":"none"}"#);
        let payload = base64_url_encode(b"{}");
        let token = format!("{header}.{payload}.c2ln");
        let err = UnverifiedJws::parse(&token).unwrap_err();
        assert_eq!(
            err.error,
            FormatError::MalformedJws("invalid header".to_owned())
        );

        // unsigned token
        let header = base64_url_encode(br#"{"alg":"ES256"}"#);
        let token = format!("{header}.{payload}.");
        let err = UnverifiedJws::parse(&token).unwrap_err();
        assert_eq!(
            err.error,
            FormatError::MalformedJws("empty signature".to_owned())
        );
    }

    #[test]
    fn rsa_signatures_verify_with_rsa_key() {
        let key = SigningKey::generate(KeyType::Rsa).unwrap();
        let token = sign_compact(&json!({ "sub": "x" }), &key, "kid", Some("JWT")).unwrap();

        let jws = UnverifiedJws::parse(&token).unwrap();
        assert_eq!(jws.header().alg, SigningAlgorithm::Rs256);
        assert_eq!(jws.header().typ.as_deref(), Some("JWT"));

        #[derive(Deserialize)]
        struct Claims {
            sub: String,
        }
        let claims: Claims = jws.verify_as(&key.public_key().unwrap()).unwrap();
        assert_eq!(claims.sub, "x");
    }
}
