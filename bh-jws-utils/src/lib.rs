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

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! This crate provides keys, signature algorithms and a codec for compact
//! [JSON Web Signatures (JWS)][1].
//!
//! [1]: https://datatracker.ietf.org/doc/html/rfc7515
//!
//! # Details
//!
//! Every key carries a [`KeyType`], a closed set of supported key kinds. The
//! signing algorithm is always derived from the key type and never from a
//! token: a [`SigningKey`] signs with [`KeyType::default_algorithm`], and an
//! [`UnverifiedJws`] only verifies if the algorithm in its header belongs to
//! the family permitted by the [`PublicKey`] used for verification. The
//! header is therefore only used to select a parser (and the hash within the
//! RSA family), never to select which kind of key is trusted.
//!
//! The [`Signer`] trait abstracts over signing backends so that hardware or
//! remote keys can be plugged in; [`SigningKey`] is the [`openssl`] backed
//! implementation.
//!
//! # Examples
//!
//! ## Sign and verify a JWT
//!
//! ```
//! use bh_jws_utils::{json_object, sign_compact, KeyType, SigningKey, UnverifiedJws};
//!
//! let key = SigningKey::generate(KeyType::EcP384).unwrap();
//!
//! let claims = json_object!({
//!    "sub": "1234567890",
//!    "name": "John Doe",
//!    "iat": 1516239022
//! });
//!
//! let token = sign_compact(&claims, &key, "did:example:123#key-1", Some("JWT")).unwrap();
//!
//! let public_key = key.public_key().unwrap();
//! let verified = UnverifiedJws::parse(&token)
//!     .unwrap()
//!     .verify(&public_key)
//!     .unwrap();
//!
//! assert_eq!(verified, claims);
//! ```

mod error;
mod jwk;
mod jws;
mod key;
mod traits;
mod utils;

pub use error::*;
pub use jwk::*;
pub use jws::*;
pub use key::*;
pub use traits::*;
pub use utils::*;

use std::str::FromStr;

use bherror::Error;
use serde::{Deserialize, Serialize};

/// JOSE `alg` values this crate signs and verifies with, from [RFC7518]
/// and [RFC8037].
///
/// Signing always uses [`KeyType::default_algorithm`]; the other members of
/// a key's family are accepted only when verifying.
///
/// [RFC7518]: https://datatracker.ietf.org/doc/html/rfc7518#section-3.1
/// [RFC8037]: https://datatracker.ietf.org/doc/html/rfc8037#section-3.1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SigningAlgorithm {
    /// ECDSA, P-256, SHA-256
    Es256,
    /// ECDSA, P-384, SHA-384
    Es384,
    /// ECDSA, P-521, SHA-512
    Es512,
    /// PKCS#1 v1.5 RSA, SHA-256
    Rs256,
    /// PKCS#1 v1.5 RSA, SHA-384
    Rs384,
    /// PKCS#1 v1.5 RSA, SHA-512
    Rs512,
    /// Ed25519
    #[serde(rename = "EdDSA")]
    EdDsa,
}

impl SigningAlgorithm {
    /// Every supported algorithm.
    pub const ALL: [Self; 7] = [
        Self::Es256,
        Self::Es384,
        Self::Es512,
        Self::Rs256,
        Self::Rs384,
        Self::Rs512,
        Self::EdDsa,
    ];

    /// The value of the JWS `alg` header.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Es256 => "ES256",
            Self::Es384 => "ES384",
            Self::Es512 => "ES512",
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
            Self::EdDsa => "EdDSA",
        }
    }
}

impl FromStr for SigningAlgorithm {
    type Err = Error<SignatureError>;

    fn from_str(alg: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|algorithm| algorithm.as_str() == alg)
            .ok_or_else(|| Error::root(SignatureError::InvalidSigningAlgorithm(alg.to_owned())))
    }
}

impl std::fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Construct a [`serde_json::Map`] from a JSON object literal.
///
/// Panics if the literal is not an object.
#[macro_export]
macro_rules! json_object {
    ($stuff:tt) => {
        match ::serde_json::json!($stuff) {
            ::serde_json::Value::Object(o) => o,
            _ => unreachable!("JSON literal wasn't an object"),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_names_match_serde() {
        for algorithm in SigningAlgorithm::ALL {
            let json = serde_json::to_value(algorithm).unwrap();
            assert_eq!(json, algorithm.as_str());
            assert_eq!(algorithm.as_str().parse::<SigningAlgorithm>().unwrap(), algorithm);
        }
        assert_eq!(SigningAlgorithm::EdDsa.to_string(), "EdDSA");
    }

    #[test]
    fn names_outside_the_supported_set_fail() {
        for alg in ["none", "HS256", "es256", "PS256", ""] {
            let err = alg.parse::<SigningAlgorithm>().unwrap_err();
            assert_eq!(
                err.error,
                SignatureError::InvalidSigningAlgorithm(alg.to_owned())
            );
        }
    }
}
