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

//! Glue between `coset` structures, serde and the JOSE key types.

use bh_jws_utils::{base64_url_decode, base64_url_encode, JwkPublic, PublicKey, SigningAlgorithm};
use bherror::traits::{ErrorContext as _, ForeignError as _, PropagateError as _};
use ciborium::Value;
use coset::{
    iana::{Algorithm, Ec2KeyParameter, EllipticCurve},
    CoseKey, CoseKeyBuilder, KeyType, Label, RegisteredLabelWithPrivate,
};
use serde_json::Value as JsonValue;

use crate::error::{MdocError, Result};

/// EC2 curves allowed for device keys, paired with their JWK `crv` names.
const CURVES: [(EllipticCurve, &str); 3] = [
    (EllipticCurve::P_256, "P-256"),
    (EllipticCurve::P_384, "P-384"),
    (EllipticCurve::P_521, "P-521"),
];

/// COSE `ECDSA` algorithms and their JOSE counterparts.
const ECDSA: [(Algorithm, SigningAlgorithm); 3] = [
    (Algorithm::ES256, SigningAlgorithm::Es256),
    (Algorithm::ES384, SigningAlgorithm::Es384),
    (Algorithm::ES512, SigningAlgorithm::Es512),
];

/// `#[serde(with)]` adapter for types that only implement
/// [`coset::AsCborValue`].
pub(crate) mod as_cbor {
    use coset::AsCborValue;
    use serde::{Deserialize as _, Deserializer, Serialize as _, Serializer};

    pub(crate) fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: AsCborValue + Clone,
        S: Serializer,
    {
        value
            .clone()
            .to_cbor_value()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }

    pub(crate) fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: AsCborValue,
        D: Deserializer<'de>,
    {
        let value = ciborium::Value::deserialize(deserializer)?;
        T::from_cbor_value(value).map_err(serde::de::Error::custom)
    }
}

/// Builds an EC2 `COSE_Key` ([RFC 8152 section 13.1.1][1]) from a public JWK
/// on one of the NIST curves.
///
/// [1]: https://datatracker.ietf.org/doc/html/rfc8152#section-13.1.1
pub fn cose_key_from_jwk(jwk: &JwkPublic) -> Result<CoseKey> {
    let member = |name: &str| jwk.get(name).and_then(JsonValue::as_str);
    let unusable = |message: String| bherror::Error::root(MdocError::JwkToCoseKey(message));

    if member("kty") != Some("EC") {
        return Err(unusable("kty must be EC".to_owned()));
    }

    let crv = member("crv").unwrap_or_default();
    let Some((curve, _)) = CURVES.iter().find(|(_, name)| *name == crv) else {
        return Err(unusable(format!("curve {} is not supported", crv)));
    };

    let coordinate = |name: &str| -> Result<Vec<u8>> {
        let encoded = member(name).ok_or_else(|| unusable(format!("{} is missing", name)))?;
        base64_url_decode(encoded)
            .foreign_err(|| MdocError::JwkToCoseKey(format!("{} is not base64url", name)))
    };

    Ok(CoseKeyBuilder::new_ec2_pub_key(*curve, coordinate("x")?, coordinate("y")?).build())
}

/// The public JWK of an EC2 `COSE_Key`.
pub fn cose_key_to_jwk(cose_key: &CoseKey) -> Result<JwkPublic> {
    let unusable = |message: String| bherror::Error::root(MdocError::CoseKeyToJwk(message));

    if cose_key.kty != KeyType::Assigned(coset::iana::KeyType::EC2) {
        return Err(unusable(format!("key type {:?} is not EC2", cose_key.kty)));
    }

    let param = |label: Ec2KeyParameter| {
        ec2_param(cose_key, label).ok_or_else(|| unusable(format!("{:?} is missing", label)))
    };
    let coordinate = |name: Ec2KeyParameter| -> Result<String> {
        match param(name)? {
            Value::Bytes(bytes) => Ok(base64_url_encode(bytes)),
            _ => Err(unusable(format!("{:?} is not a byte string", name))),
        }
    };

    let curve = param(Ec2KeyParameter::Crv)?;
    let Some((_, crv)) = CURVES
        .iter()
        .find(|(known, _)| *curve == Value::from(*known as u64))
    else {
        return Err(unusable(format!("curve {:?} is not supported", curve)));
    };

    Ok(JwkPublic::from_iter([
        ("kty".to_owned(), JsonValue::from("EC")),
        ("crv".to_owned(), JsonValue::from(*crv)),
        ("x".to_owned(), coordinate(Ec2KeyParameter::X)?.into()),
        ("y".to_owned(), coordinate(Ec2KeyParameter::Y)?.into()),
    ]))
}

fn ec2_param(cose_key: &CoseKey, param: Ec2KeyParameter) -> Option<&Value> {
    let label = Label::Int(param as i64);
    cose_key
        .params
        .iter()
        .find_map(|(key, value)| (*key == label).then_some(value))
}

/// The JOSE algorithm of a COSE `ECDSA` algorithm.
pub(crate) fn signing_algorithm_of(alg: &Algorithm) -> Option<SigningAlgorithm> {
    ECDSA
        .iter()
        .find_map(|(cose, jose)| (cose == alg).then_some(*jose))
}

/// The COSE algorithm of a JOSE `ECDSA` algorithm.
pub(crate) fn cose_algorithm_of(alg: SigningAlgorithm) -> Option<Algorithm> {
    ECDSA
        .iter()
        .find_map(|(cose, jose)| (*jose == alg).then_some(*cose))
}

/// Picks the algorithm a `COSE_Sign1` is verified with.
///
/// It is always the one implied by the curve of `key`. A protected `alg`
/// naming anything else is an error, as is a key outside the EC family.
pub(crate) fn verification_algorithm(
    key: &PublicKey,
    header: &coset::Header,
) -> Result<SigningAlgorithm> {
    let key_type = key.key_type();
    if !key_type.is_ec() {
        return Err(bherror::Error::root(MdocError::UnsupportedKey(key_type)));
    }
    let implied = key_type.default_algorithm();

    let declared = match &header.alg {
        None => return Ok(implied),
        Some(RegisteredLabelWithPrivate::Assigned(alg)) => signing_algorithm_of(alg),
        Some(_) => None,
    };
    let Some(declared) = declared else {
        return Err(bherror::Error::root(MdocError::InvalidSignature))
            .ctx(|| format!("unsupported COSE algorithm {:?}", header.alg));
    };
    if declared != implied {
        return Err(bherror::Error::root(MdocError::AlgorithmMismatch(
            declared, key_type,
        )));
    }

    Ok(implied)
}

/// Verifies a raw `R || S` signature over `data`.
pub(crate) fn check_signature(
    key: &PublicKey,
    alg: SigningAlgorithm,
    signature: &[u8],
    data: &[u8],
) -> Result<()> {
    let valid = key
        .verify(alg, data, signature)
        .with_err(|| MdocError::InvalidSignature)?;

    valid.then_some(()).ok_or_else(|| {
        bherror::Error::root(MdocError::InvalidSignature).ctx("signature does not match")
    })
}

#[cfg(test)]
mod tests {
    use bh_jws_utils::{json_object, KeyType as JwsKeyType, SigningKey};
    use coset::HeaderBuilder;

    use super::*;

    fn public_key(key_type: JwsKeyType) -> PublicKey {
        SigningKey::generate(key_type)
            .unwrap()
            .public_key()
            .unwrap()
    }

    #[test]
    fn jwk_members_survive_conversion() {
        let jwk = json_object!({
            "kty": "EC",
            "crv": "P-256",
            "x": "f83OJ3D2xF1Bg8vub9tLe1gHMzV76e8Tus9uPHvRVEU",
            "y": "x_FEzRu9m36HLN_tue659LNpXW6pCyStikYjKIWI5a0",
            "kid": "ignored",
        });

        let converted = cose_key_to_jwk(&cose_key_from_jwk(&jwk).unwrap()).unwrap();
        assert_eq!(converted.len(), 4);
        for member in ["kty", "crv", "x", "y"] {
            assert_eq!(converted[member], jwk[member], "{member}");
        }
    }

    #[test]
    fn keys_on_every_curve_convert() {
        for key_type in [JwsKeyType::EcP256, JwsKeyType::EcP384, JwsKeyType::EcP521] {
            let key = public_key(key_type);

            let cose_key = cose_key_from_jwk(&key.to_jwk(None).unwrap()).unwrap();
            let converted = PublicKey::from_jwk(&cose_key_to_jwk(&cose_key).unwrap()).unwrap();
            assert_eq!(converted, key);
        }
    }

    #[test]
    fn unusable_jwks() {
        let cases = [
            (json_object!({ "kty": "RSA", "n": "AQAB", "e": "AQAB" }), "kty must be EC"),
            (
                json_object!({ "kty": "EC", "crv": "secp256k1", "x": "AA", "y": "AA" }),
                "curve secp256k1 is not supported",
            ),
            (json_object!({ "kty": "EC", "crv": "P-256", "x": "AA" }), "y is missing"),
            (
                json_object!({ "kty": "EC", "crv": "P-256", "x": "A*", "y": "AA" }),
                "x is not base64url",
            ),
        ];

        for (jwk, message) in cases {
            assert_eq!(
                cose_key_from_jwk(&jwk).unwrap_err().error,
                MdocError::JwkToCoseKey(message.to_owned())
            );
        }
    }

    #[test]
    fn non_ec2_cose_key() {
        let okp = CoseKeyBuilder::new_okp_key().build();
        assert!(matches!(
            cose_key_to_jwk(&okp).unwrap_err().error,
            MdocError::CoseKeyToJwk(_)
        ));
    }

    #[test]
    fn algorithm_tables_agree() {
        for (cose, jose) in ECDSA {
            assert_eq!(signing_algorithm_of(&cose), Some(jose));
            assert_eq!(cose_algorithm_of(jose), Some(cose));
        }
        assert_eq!(signing_algorithm_of(&Algorithm::EdDSA), None);
        assert_eq!(cose_algorithm_of(SigningAlgorithm::Rs256), None);
    }

    #[test]
    fn algorithm_is_implied_by_the_key() {
        let key = public_key(JwsKeyType::EcP384);

        let bare = coset::Header::default();
        assert_eq!(
            verification_algorithm(&key, &bare).unwrap(),
            SigningAlgorithm::Es384
        );

        let es384 = HeaderBuilder::new().algorithm(Algorithm::ES384).build();
        assert_eq!(
            verification_algorithm(&key, &es384).unwrap(),
            SigningAlgorithm::Es384
        );

        let es256 = HeaderBuilder::new().algorithm(Algorithm::ES256).build();
        assert_eq!(
            verification_algorithm(&key, &es256).unwrap_err().error,
            MdocError::AlgorithmMismatch(SigningAlgorithm::Es256, JwsKeyType::EcP384)
        );

        let eddsa = HeaderBuilder::new().algorithm(Algorithm::EdDSA).build();
        assert_eq!(
            verification_algorithm(&key, &eddsa).unwrap_err().error,
            MdocError::InvalidSignature
        );

        assert_eq!(
            verification_algorithm(&public_key(JwsKeyType::Ed25519), &bare)
                .unwrap_err()
                .error,
            MdocError::UnsupportedKey(JwsKeyType::Ed25519)
        );
    }
}
