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

use crate::models::data_retrieval::device_retrieval::issuer_auth::DigestAlgorithm;

/// Computes the digest of the `payload` with the given algorithm.
pub(crate) fn digest(alg: &DigestAlgorithm, payload: &[u8]) -> Vec<u8> {
    match alg {
        DigestAlgorithm::Sha256 => openssl::sha::sha256(payload).to_vec(),
        DigestAlgorithm::Sha384 => openssl::sha::sha384(payload).to_vec(),
        DigestAlgorithm::Sha512 => openssl::sha::sha512(payload).to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_lengths_follow_algorithm() {
        assert_eq!(digest(&DigestAlgorithm::Sha256, b"abc").len(), 32);
        assert_eq!(digest(&DigestAlgorithm::Sha384, b"abc").len(), 48);
        assert_eq!(digest(&DigestAlgorithm::Sha512, b"abc").len(), 64);
        assert_eq!(
            hex::encode(digest(&DigestAlgorithm::Sha256, b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
