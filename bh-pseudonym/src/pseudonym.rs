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

use bh_jws_utils::{base64_url_decode, base64_url_encode};
use bherror::{
    traits::{ErrorContext as _, ForeignError as _},
    Error as BhError,
};
use openssl::{hash::MessageDigest, pkey::PKey};

use crate::{canonicalize_domain, registrable_domain, Error, Result};

/// Length of a seed, in bytes.
pub const SEED_LENGTH: usize = 32;

/// Length of a base64url encoded seed or pseudonym.
pub const ENCODED_LENGTH: usize = 43;

/// A holder's secret from which the pseudonyms for every verifier are
/// derived.
///
/// The value is never printed; [`Seed::to_base64url`] must be called
/// explicitly to obtain it.
#[derive(Clone, PartialEq, Eq)]
pub struct Seed([u8; SEED_LENGTH]);

impl Seed {
    /// Draw a fresh seed from the OpenSSL CSPRNG.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; SEED_LENGTH];
        openssl::rand::rand_bytes(&mut bytes).foreign_err(|| Error::RandomSource)?;

        Ok(Self(bytes))
    }

    /// Wrap raw seed bytes.
    pub fn from_bytes(bytes: [u8; SEED_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parse the 43 character base64url form of a seed.
    pub fn from_base64url(encoded: &str) -> Result<Self> {
        if encoded.len() != ENCODED_LENGTH {
            return Err(BhError::root(Error::InvalidSeed))
                .ctx(|| format!("expected {} characters", ENCODED_LENGTH));
        }

        let bytes = base64_url_decode(encoded).foreign_err(|| Error::InvalidSeed)?;
        let bytes: [u8; SEED_LENGTH] = bytes
            .try_into()
            .map_err(|_| BhError::root(Error::InvalidSeed))?;

        Ok(Self(bytes))
    }

    /// The seed as base64url without padding, 43 characters long.
    pub fn to_base64url(&self) -> String {
        base64_url_encode(self.0)
    }

    /// The raw seed bytes.
    pub fn as_bytes(&self) -> &[u8; SEED_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(..)")
    }
}

/// Derive the pseudonym of the holder owning `seed` at the verifier
/// `domain`.
///
/// The result is `base64url(HMAC-SHA256(seed, canonical_domain))`, see
/// [`canonicalize_domain`]. It is stable for a given seed and verifier and
/// unlinkable across verifiers.
pub fn derive_pseudonym(seed: &Seed, domain: &str) -> Result<String> {
    let domain = canonicalize_domain(domain)?;

    Ok(base64_url_encode(hmac_sha256(seed.as_bytes(), domain.as_bytes())?))
}

/// Like [`derive_pseudonym`], but every subdomain of a site shares the
/// pseudonym, see [`registrable_domain`].
pub fn derive_site_pseudonym(seed: &Seed, domain: &str) -> Result<String> {
    let domain = registrable_domain(domain)?;

    Ok(base64_url_encode(hmac_sha256(seed.as_bytes(), domain.as_bytes())?))
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let key = PKey::hmac(key).foreign_err(|| Error::Hmac)?;
    let mut signer =
        openssl::sign::Signer::new(MessageDigest::sha256(), &key).foreign_err(|| Error::Hmac)?;
    signer.update(message).foreign_err(|| Error::Hmac)?;

    signer.sign_to_vec().foreign_err(|| Error::Hmac)
}
