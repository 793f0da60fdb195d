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

use crate::{BoxError, JwkPublic, SigningAlgorithm};

/// An external signing backend, to be used for computing a JWS or COSE signature.
///
/// # Algorithms
///
/// The algorithm must be the one implied by the type of the underlying key,
/// see [`KeyType::default_algorithm`](crate::KeyType::default_algorithm).
///
/// The output of the signer, regardless of the algorithm, must be a valid **JWS signature**,
/// i.e. ECDSA signatures are the fixed-size `R || S` concatenation.
/// See step 5 in [section 5.1 of RFC7515](https://www.rfc-editor.org/rfc/rfc7515.html#section-5.1)
/// for more information.
pub trait Signer {
    /// The algorithm this signer uses. Must be a constant function.
    fn algorithm(&self) -> SigningAlgorithm;

    /// Produce a signature as a byte array, not yet base64url-encoded.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, BoxError>;

    /// Public JWK of the key used for signing.
    fn public_jwk(&self) -> Result<JwkPublic, BoxError>;
}

impl<S: Signer + ?Sized> Signer for &S {
    fn algorithm(&self) -> SigningAlgorithm {
        (**self).algorithm()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, BoxError> {
        (**self).sign(message)
    }

    fn public_jwk(&self) -> Result<JwkPublic, BoxError> {
        (**self).public_jwk()
    }
}

impl<S: Signer + ?Sized> Signer for Box<S> {
    fn algorithm(&self) -> SigningAlgorithm {
        self.as_ref().algorithm()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, BoxError> {
        self.as_ref().sign(message)
    }

    fn public_jwk(&self) -> Result<JwkPublic, BoxError> {
        self.as_ref().public_jwk()
    }
}
