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

use std::fmt;

use bherror::{
    traits::{ErrorContext as _, ForeignError as _},
    Error, Result,
};
use openssl::{
    bn::{BigNum, BigNumContext},
    ec::{EcGroup, EcKey, EcKeyRef},
    ecdsa::EcdsaSig,
    error::ErrorStack,
    hash::{hash, MessageDigest},
    nid::Nid,
    pkey::{HasPublic, Id, PKey, PKeyRef, Private, Public},
    rsa::Rsa,
    sign::{Signer as OpensslSigner, Verifier as OpensslVerifier},
};
use serde_json::Value;

use crate::{
    base64_url_encode, clean_up_after_openssl, get_str_field, json_object, parse_b64_field,
    BoxError, CryptoError, FormatError, JwkPublic, SignatureError, Signer, SigningAlgorithm,
    KTY_EC, KTY_OKP, KTY_RSA,
};

/// Modulus size of generated RSA keys, and the minimum accepted from a JWK.
const RSA_KEY_BITS: u32 = 2048;

const CRV_P256: &str = "P-256";
const CRV_P384: &str = "P-384";
const CRV_P521: &str = "P-521";
const CRV_ED25519: &str = "Ed25519";

/// The closed set of key kinds supported for signing and verification.
///
/// The [`KeyType`] of the key, and never the `alg` declared by a token,
/// determines which algorithms may be used with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum KeyType {
    /// ECDSA key on the NIST P-256 curve.
    #[strum(to_string = "EC P-256")]
    EcP256,
    /// ECDSA key on the NIST P-384 curve.
    #[strum(to_string = "EC P-384")]
    EcP384,
    /// ECDSA key on the NIST P-521 curve.
    #[strum(to_string = "EC P-521")]
    EcP521,
    /// RSA key.
    #[strum(to_string = "RSA")]
    Rsa,
    /// Ed25519 key.
    #[strum(to_string = "Ed25519")]
    Ed25519,
}

impl KeyType {
    /// The algorithm used when signing with a key of this type.
    pub fn default_algorithm(self) -> SigningAlgorithm {
        match self {
            KeyType::EcP256 => SigningAlgorithm::Es256,
            KeyType::EcP384 => SigningAlgorithm::Es384,
            KeyType::EcP521 => SigningAlgorithm::Es512,
            KeyType::Rsa => SigningAlgorithm::Rs256,
            KeyType::Ed25519 => SigningAlgorithm::EdDsa,
        }
    }

    /// Whether `alg` belongs to the algorithm family of this key type.
    ///
    /// Elliptic curve keys permit exactly the algorithm bound to their curve.
    pub fn permits(self, alg: SigningAlgorithm) -> bool {
        match self {
            KeyType::Rsa => matches!(
                alg,
                SigningAlgorithm::Rs256 | SigningAlgorithm::Rs384 | SigningAlgorithm::Rs512
            ),
            _ => alg == self.default_algorithm(),
        }
    }

    /// Returns `true` for the elliptic curve (ECDSA) key types.
    pub fn is_ec(self) -> bool {
        self.ec_params().is_some()
    }

    /// The JWK `crv` name of the key type, if it has one.
    pub fn curve_name(self) -> Option<&'static str> {
        match self {
            KeyType::EcP256 => Some(CRV_P256),
            KeyType::EcP384 => Some(CRV_P384),
            KeyType::EcP521 => Some(CRV_P521),
            KeyType::Ed25519 => Some(CRV_ED25519),
            KeyType::Rsa => None,
        }
    }

    /// Curve and byte length of a single coordinate (and of `R`/`S` in a
    /// signature) for elliptic curve key types.
    fn ec_params(self) -> Option<(Nid, usize)> {
        match self {
            KeyType::EcP256 => Some((Nid::X9_62_PRIME256V1, 32)),
            KeyType::EcP384 => Some((Nid::SECP384R1, 48)),
            KeyType::EcP521 => Some((Nid::SECP521R1, 66)),
            KeyType::Rsa | KeyType::Ed25519 => None,
        }
    }

    fn from_ec_curve_name(crv: &str) -> Option<Self> {
        match crv {
            CRV_P256 => Some(KeyType::EcP256),
            CRV_P384 => Some(KeyType::EcP384),
            CRV_P521 => Some(KeyType::EcP521),
            _ => None,
        }
    }

    fn from_nid(nid: Nid) -> Option<Self> {
        [KeyType::EcP256, KeyType::EcP384, KeyType::EcP521]
            .into_iter()
            .find(|key_type| matches!(key_type.ec_params(), Some((curve, _)) if curve == nid))
    }
}

fn message_digest(alg: SigningAlgorithm) -> Option<MessageDigest> {
    match alg {
        SigningAlgorithm::Es256 | SigningAlgorithm::Rs256 => Some(MessageDigest::sha256()),
        SigningAlgorithm::Es384 | SigningAlgorithm::Rs384 => Some(MessageDigest::sha384()),
        SigningAlgorithm::Es512 | SigningAlgorithm::Rs512 => Some(MessageDigest::sha512()),
        SigningAlgorithm::EdDsa => None,
    }
}

fn detect_key_type<T: HasPublic>(key: &PKeyRef<T>) -> Result<KeyType, CryptoError> {
    let id = key.id();

    if id == Id::EC {
        let ec = key.ec_key().foreign_err(|| CryptoError::CryptoBackend)?;
        let nid = ec
            .group()
            .curve_name()
            .ok_or_else(|| Error::root(CryptoError::Unsupported("unnamed curve".to_owned())))?;

        KeyType::from_nid(nid).ok_or_else(|| {
            Error::root(CryptoError::Unsupported(format!(
                "curve with NID {}",
                nid.as_raw()
            )))
        })
    } else if id == Id::RSA {
        Ok(KeyType::Rsa)
    } else if id == Id::ED25519 {
        Ok(KeyType::Ed25519)
    } else {
        Err(Error::root(CryptoError::Unsupported(format!(
            "key with id {}",
            id.as_raw()
        ))))
    }
}

/// A public key usable for signature verification.
#[derive(Clone)]
pub struct PublicKey {
    key: PKey<Public>,
    key_type: KeyType,
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("key_type", &self.key_type)
            .finish_non_exhaustive()
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.key_type == other.key_type && self.key.public_eq(&other.key)
    }
}

impl Eq for PublicKey {}

impl PublicKey {
    /// Wrap an [`openssl`] public key, detecting its [`KeyType`].
    ///
    /// Keys of any other kind, and elliptic curve keys on other curves, are
    /// rejected.
    pub fn from_pkey(key: PKey<Public>) -> Result<Self, CryptoError> {
        let key_type = detect_key_type(&key)?;
        Ok(Self { key, key_type })
    }

    /// Parse a public JWK.
    ///
    /// Supported are `EC` keys on `P-256`, `P-384` and `P-521`, `RSA` keys of
    /// at least 2048 bits, and `OKP` keys on `Ed25519`.
    pub fn from_jwk(jwk: &JwkPublic) -> Result<Self, FormatError> {
        match get_str_field(jwk, "kty")? {
            KTY_EC => ec_public_key_from_jwk(jwk),
            KTY_RSA => rsa_public_key_from_jwk(jwk),
            KTY_OKP => ed25519_public_key_from_jwk(jwk),
            other => Err(Error::root(FormatError::JwkParsingFailed(format!(
                "unsupported key type {}",
                other
            )))),
        }
    }

    /// The type of this key.
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// The underlying [`openssl`] key.
    pub fn as_pkey(&self) -> &PKey<Public> {
        &self.key
    }

    /// Construct a JWK JSON object for this public key, optionally with the
    /// given `kid`.
    pub fn to_jwk(&self, kid: Option<&str>) -> Result<JwkPublic, CryptoError> {
        public_key_to_jwk(&self.key, self.key_type, kid)
    }

    /// Verify a raw JWS `signature` over `message`.
    ///
    /// Fails with [`SignatureError::AlgorithmMismatch`] if `alg` is not
    /// permitted for this key type. Returns `Ok(false)` if the signature does
    /// not verify.
    pub fn verify(
        &self,
        alg: SigningAlgorithm,
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, SignatureError> {
        if !self.key_type.permits(alg) {
            return Err(Error::root(SignatureError::AlgorithmMismatch(
                alg,
                self.key_type,
            )));
        }

        let result = match (self.key_type.ec_params(), message_digest(alg)) {
            (Some((_, len)), Some(digest)) => {
                verify_ecdsa(&self.key, digest, len, message, signature)
            }
            (None, Some(digest)) => verify_rsa(&self.key, digest, message, signature),
            (_, None) => clean_up_after_openssl(|| {
                OpensslVerifier::new_without_digest(&self.key)?.verify_oneshot(signature, message)
            }),
        };

        result
            .foreign_err(|| SignatureError::InvalidSignature)
            .ctx(|| format!("{} signature could not be verified", alg))
    }
}

fn verify_ecdsa(
    key: &PKey<Public>,
    digest: MessageDigest,
    len: usize,
    message: &[u8],
    signature: &[u8],
) -> std::result::Result<bool, ErrorStack> {
    if signature.len() != 2 * len {
        return Ok(false);
    }

    let (r, s) = signature.split_at(len);
    let signature = EcdsaSig::from_private_components(BigNum::from_slice(r)?, BigNum::from_slice(s)?)?;
    let digest = hash(digest, message)?;
    let ec = key.ec_key()?;

    clean_up_after_openssl(|| signature.verify(&digest, &ec))
}

fn verify_rsa(
    key: &PKey<Public>,
    digest: MessageDigest,
    message: &[u8],
    signature: &[u8],
) -> std::result::Result<bool, ErrorStack> {
    let mut verifier = OpensslVerifier::new(digest, key)?;
    verifier.update(message)?;
    clean_up_after_openssl(|| verifier.verify(signature))
}

/// Returns the affine coordinates of the public key, each padded to `len` bytes.
fn to_affine_coords<T: HasPublic>(
    key: &EcKeyRef<T>,
    len: usize,
) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
    let mut x = BigNum::new().foreign_err(|| CryptoError::CryptoBackend)?;
    let mut y = BigNum::new().foreign_err(|| CryptoError::CryptoBackend)?;
    let mut ctx = BigNumContext::new().foreign_err(|| CryptoError::CryptoBackend)?;
    key.public_key()
        .affine_coordinates(key.group(), &mut x, &mut y, &mut ctx)
        .foreign_err(|| CryptoError::CryptoBackend)?;

    let x = x
        .to_vec_padded(len as i32)
        .foreign_err(|| CryptoError::CryptoBackend)?;
    let y = y
        .to_vec_padded(len as i32)
        .foreign_err(|| CryptoError::CryptoBackend)?;
    Ok((x, y))
}

fn public_key_to_jwk<T: HasPublic>(
    key: &PKeyRef<T>,
    key_type: KeyType,
    kid: Option<&str>,
) -> Result<JwkPublic, CryptoError> {
    let mut jwk = match (key_type.ec_params(), key_type.curve_name()) {
        (Some((_, len)), Some(crv)) => {
            let ec = key.ec_key().foreign_err(|| CryptoError::CryptoBackend)?;
            let (x, y) = to_affine_coords(&ec, len)?;
            json_object!({
                "kty": KTY_EC,
                "crv": crv,
                "x": base64_url_encode(x),
                "y": base64_url_encode(y),
            })
        }
        (None, Some(crv)) => {
            let x = key
                .raw_public_key()
                .foreign_err(|| CryptoError::CryptoBackend)?;
            json_object!({
                "kty": KTY_OKP,
                "crv": crv,
                "x": base64_url_encode(x),
            })
        }
        _ => {
            let rsa = key.rsa().foreign_err(|| CryptoError::CryptoBackend)?;
            json_object!({
                "kty": KTY_RSA,
                "n": base64_url_encode(rsa.n().to_vec()),
                "e": base64_url_encode(rsa.e().to_vec()),
            })
        }
    };

    jwk.insert(
        "alg".to_owned(),
        Value::String(key_type.default_algorithm().to_string()),
    );
    jwk.insert("use".to_owned(), Value::String("sig".to_owned()));

    if let Some(kid) = kid {
        jwk.insert("kid".to_owned(), Value::String(kid.to_owned()));
    }

    Ok(jwk)
}

fn ec_public_key_from_jwk(jwk: &JwkPublic) -> Result<PublicKey, FormatError> {
    let error = |message: &str| FormatError::JwkParsingFailed(message.to_owned());

    let crv = get_str_field(jwk, "crv")?;
    let (key_type, (nid, len)) = KeyType::from_ec_curve_name(crv)
        .and_then(|key_type| key_type.ec_params().map(|params| (key_type, params)))
        .ok_or_else(|| Error::root(error("unsupported curve")))
        .ctx(|| format!("curve {}", crv))?;

    let x = parse_coord(jwk, "x", len)?;
    let y = parse_coord(jwk, "y", len)?;

    let group = EcGroup::from_curve_name(nid).foreign_err(|| error("unknown curve"))?;
    let ec = EcKey::from_public_key_affine_coordinates(&group, &x, &y)
        .foreign_err(|| error("coordinate construction failed"))?;
    ec.check_key()
        .foreign_err(|| error("point is not on the curve"))?;
    let key = PKey::from_ec_key(ec).foreign_err(|| error("key construction failed"))?;

    Ok(PublicKey { key, key_type })
}

fn parse_coord(jwk: &JwkPublic, coord: &str, len: usize) -> Result<BigNum, FormatError> {
    let bytes = parse_b64_field(jwk, coord)?;

    if bytes.len() != len {
        return Err(Error::root(FormatError::JwkParsingFailed(
            "parsing coord failed".to_owned(),
        )))
        .ctx(|| format!("coordinate {} has {} bytes, expected {}", coord, bytes.len(), len));
    }

    BigNum::from_slice(&bytes)
        .foreign_err(|| FormatError::JwkParsingFailed("Failed to construct BigNum".to_owned()))
}

fn rsa_public_key_from_jwk(jwk: &JwkPublic) -> Result<PublicKey, FormatError> {
    let error = |message: &str| FormatError::JwkParsingFailed(message.to_owned());

    let n = BigNum::from_slice(&parse_b64_field(jwk, "n")?)
        .foreign_err(|| error("Failed to construct BigNum"))?;
    let e = BigNum::from_slice(&parse_b64_field(jwk, "e")?)
        .foreign_err(|| error("Failed to construct BigNum"))?;

    if n.num_bits() < RSA_KEY_BITS as i32 {
        return Err(Error::root(error("RSA modulus too small")))
            .ctx(|| format!("modulus has {} bits", n.num_bits()));
    }

    let rsa = Rsa::from_public_components(n, e).foreign_err(|| error("invalid RSA key"))?;
    let key = PKey::from_rsa(rsa).foreign_err(|| error("key construction failed"))?;

    Ok(PublicKey {
        key,
        key_type: KeyType::Rsa,
    })
}

fn ed25519_public_key_from_jwk(jwk: &JwkPublic) -> Result<PublicKey, FormatError> {
    let crv = get_str_field(jwk, "crv")?;
    if crv != CRV_ED25519 {
        return Err(Error::root(FormatError::JwkParsingFailed(
            "unsupported curve".to_owned(),
        )))
        .ctx(|| format!("curve {}", crv));
    }

    let x = parse_b64_field(jwk, "x")?;
    let key = PKey::public_key_from_raw_bytes(&x, Id::ED25519)
        .foreign_err(|| FormatError::JwkParsingFailed("invalid Ed25519 key".to_owned()))?;

    Ok(PublicKey {
        key,
        key_type: KeyType::Ed25519,
    })
}

/// A private key of one of the supported [`KeyType`]s, implementing [`Signer`]
/// with the [`openssl`] backend.
pub struct SigningKey {
    key: PKey<Private>,
    key_type: KeyType,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_type", &self.key_type)
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    /// Generate a fresh key of the given type.
    pub fn generate(key_type: KeyType) -> Result<Self, CryptoError> {
        let key = match key_type.ec_params() {
            Some((nid, _)) => {
                let group =
                    EcGroup::from_curve_name(nid).foreign_err(|| CryptoError::CryptoBackend)?;
                EcKey::generate(&group).and_then(PKey::from_ec_key)
            }
            None if key_type == KeyType::Rsa => {
                Rsa::generate(RSA_KEY_BITS).and_then(PKey::from_rsa)
            }
            None => PKey::generate_ed25519(),
        }
        .foreign_err(|| CryptoError::KeyGenerationFailed)?;

        Ok(Self { key, key_type })
    }

    /// Load a private key in the PEM format.
    pub fn from_pem(private_key_pem: &[u8]) -> Result<Self, CryptoError> {
        let key = PKey::private_key_from_pem(private_key_pem)
            .foreign_err(|| CryptoError::CryptoBackend)?;
        let key_type = detect_key_type(&key)?;

        Ok(Self { key, key_type })
    }

    /// Serialize the private key as PKCS#8 PEM.
    pub fn to_pem(&self) -> Result<Vec<u8>, CryptoError> {
        self.key
            .private_key_to_pem_pkcs8()
            .foreign_err(|| CryptoError::CryptoBackend)
    }

    /// The public key as PEM, e.g. for requesting a certificate.
    pub fn public_key_pem(&self) -> Result<Vec<u8>, CryptoError> {
        self.key
            .public_key_to_pem()
            .foreign_err(|| CryptoError::CryptoBackend)
    }

    /// The type of this key.
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// The underlying [`openssl`] key.
    pub fn as_pkey(&self) -> &PKey<Private> {
        &self.key
    }

    /// The public counterpart of this key.
    pub fn public_key(&self) -> Result<PublicKey, CryptoError> {
        let der = self
            .key
            .public_key_to_der()
            .foreign_err(|| CryptoError::CryptoBackend)?;
        let key = PKey::public_key_from_der(&der).foreign_err(|| CryptoError::CryptoBackend)?;

        Ok(PublicKey {
            key,
            key_type: self.key_type,
        })
    }

    /// Sign `message` with [`KeyType::default_algorithm`], producing a JWS
    /// signature.
    pub fn sign_bytes(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let alg = self.key_type.default_algorithm();

        let signature = match (self.key_type.ec_params(), message_digest(alg)) {
            (Some((_, len)), Some(digest)) => self.sign_ecdsa(digest, len, message),
            (None, Some(digest)) => OpensslSigner::new(digest, &self.key).and_then(|mut signer| {
                signer.update(message)?;
                signer.sign_to_vec()
            }),
            (_, None) => OpensslSigner::new_without_digest(&self.key)
                .and_then(|mut signer| signer.sign_oneshot_to_vec(message)),
        };

        signature
            .foreign_err(|| CryptoError::CryptoBackend)
            .ctx(|| format!("{} signing failed", alg))
    }

    fn sign_ecdsa(
        &self,
        digest: MessageDigest,
        len: usize,
        message: &[u8],
    ) -> std::result::Result<Vec<u8>, ErrorStack> {
        let ec = self.key.ec_key()?;
        let digest = hash(digest, message)?;
        let signature = EcdsaSig::sign(&digest, &ec)?;

        let mut jws = signature.r().to_vec_padded(len as i32)?;
        jws.extend(signature.s().to_vec_padded(len as i32)?);
        Ok(jws)
    }
}

impl Signer for SigningKey {
    fn algorithm(&self) -> SigningAlgorithm {
        self.key_type.default_algorithm()
    }

    fn sign(&self, message: &[u8]) -> std::result::Result<Vec<u8>, BoxError> {
        Ok(self.sign_bytes(message)?)
    }

    fn public_jwk(&self) -> std::result::Result<JwkPublic, BoxError> {
        Ok(public_key_to_jwk(&self.key, self.key_type, None)?)
    }
}
