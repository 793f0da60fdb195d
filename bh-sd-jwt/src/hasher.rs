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

use std::{fmt, str::FromStr};

use bh_jws_utils::base64_url_encode;
use bherror::Error as BhError;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Digest algorithms accepted in `_sd_alg`, named as in the IANA
/// [Named Information Hash Algorithm Registry].
///
/// An absent `_sd_alg` means [`HashingAlgorithm::Sha256`].
///
/// [Named Information Hash Algorithm Registry]: https://www.iana.org/assignments/named-information/named-information.xhtml
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashingAlgorithm {
    /// `sha-256`
    #[serde(rename = "sha-256")]
    #[default]
    Sha256,
}

impl HashingAlgorithm {
    /// The `_sd_alg` name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha-256",
        }
    }
}

impl FromStr for HashingAlgorithm {
    type Err = BhError<Error>;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        [Self::Sha256]
            .into_iter()
            .find(|algorithm| algorithm.as_str() == name)
            .ok_or_else(|| BhError::root(Error::UnsupportedHashAlgorithm(name.to_owned())))
    }
}

impl fmt::Display for HashingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A digest function for disclosures, tagged with its [`HashingAlgorithm`].
pub trait Hasher: Send + Sync {
    /// Which algorithm [`Hasher::digest`] implements.
    fn algorithm(&self) -> HashingAlgorithm;

    /// Digest of `input`.
    fn digest(&self, input: &[u8]) -> Vec<u8>;
}

impl<H: Hasher + ?Sized> Hasher for &H {
    fn algorithm(&self) -> HashingAlgorithm {
        H::algorithm(self)
    }

    fn digest(&self, input: &[u8]) -> Vec<u8> {
        H::digest(self, input)
    }
}

/// OpenSSL `SHA-256`.
#[derive(Debug, Default, Copy, Clone)]
pub struct Sha256;

impl Hasher for Sha256 {
    fn algorithm(&self) -> HashingAlgorithm {
        HashingAlgorithm::Sha256
    }

    fn digest(&self, input: &[u8]) -> Vec<u8> {
        openssl::sha::sha256(input).into()
    }
}

/// Base64url digest of a disclosure.
///
/// What is hashed is the base64url text exactly as carried in the token,
/// never the decoded JSON array.
pub fn disclosure_digest(serialized_disclosure: &str, hasher: impl Hasher) -> String {
    base64_url_encode(hasher.digest(serialized_disclosure.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_answers() {
        for (input, expected) in [
            (
                &b"abc"[..],
                "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
            ),
            (
                &b""[..],
                "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
            ),
        ] {
            assert_eq!(hex::encode(Sha256.digest(input)), expected);
        }
        assert_eq!((&Sha256).algorithm(), HashingAlgorithm::Sha256);
    }

    /// The `family_name` disclosure of the SD-JWT draft, section 5.2.3.
    #[test]
    fn digest_hashes_the_encoded_disclosure() {
        let disclosure = "WyI2cU1RdlJMNWhhaiIsICJmYW1pbHlfbmFtZSIsICJNw7ZiaXVzIl0";

        assert_eq!(
            disclosure_digest(disclosure, Sha256),
            "uutlBuYeMDyjLLTpf6Jxi7yNkEF35jdyWMn9U7b_RYY"
        );
    }

    #[test]
    fn sd_alg_names() {
        let parsed: HashingAlgorithm = "sha-256".parse().unwrap();
        assert_eq!(parsed, HashingAlgorithm::default());
        assert_eq!(parsed.to_string(), "sha-256");
        assert_eq!(serde_json::to_value(parsed).unwrap(), "sha-256");

        for unsupported in ["SHA-256", "sha-512", "md5"] {
            let err = unsupported.parse::<HashingAlgorithm>().unwrap_err();
            assert_eq!(
                err.error,
                Error::UnsupportedHashAlgorithm(unsupported.to_owned())
            );
        }
    }
}
