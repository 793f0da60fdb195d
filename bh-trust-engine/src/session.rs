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

//! Holder-side key material and its unlock state.

use std::fmt;

use bh_jws_utils::Signer;
use bh_pseudonym::{derive_pseudonym, Seed};
use bh_vc_jwt::{sign_presentation, SecondsSinceEpoch, VerifiablePresentation, VpClaims};
use bherror::{
    traits::{ErrorContext as _, ForeignError as _, PropagateError as _},
    Error as BhError,
};
use openssl::{hash::MessageDigest, memcmp, pkcs5::pbkdf2_hmac, rand::rand_bytes};

use crate::{ErrorKind, Result};

/// Lifetime of a signed presentation, in seconds.
pub const PRESENTATION_LIFETIME: SecondsSinceEpoch = 5 * 60;

/// PBKDF2 iterations of a [`StoredPin`].
pub const PIN_HASH_ITERATIONS: usize = 100_000;

const PIN_SALT_LENGTH: usize = 16;
const PIN_HASH_LENGTH: usize = 32;

/// Checks the PIN or passphrase that unlocks a [`HolderSession`].
pub trait PinVerifier {
    /// Whether `pin` is correct.
    fn verify_pin(&self, pin: &str) -> bool;
}

impl<F: Fn(&str) -> bool> PinVerifier for F {
    fn verify_pin(&self, pin: &str) -> bool {
        self(pin)
    }
}

/// A salted PBKDF2-HMAC-SHA256 hash of a PIN.
#[derive(Clone)]
pub struct StoredPin {
    salt: [u8; PIN_SALT_LENGTH],
    hash: [u8; PIN_HASH_LENGTH],
}

impl fmt::Debug for StoredPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StoredPin(..)")
    }
}

impl StoredPin {
    /// Hash `pin` under a fresh random salt.
    pub fn new(pin: &str) -> Result<Self> {
        let mut salt = [0u8; PIN_SALT_LENGTH];
        rand_bytes(&mut salt).foreign_err(|| ErrorKind::Internal)?;

        Ok(Self {
            salt,
            hash: hash_pin(pin, &salt)?,
        })
    }
}

impl PinVerifier for StoredPin {
    fn verify_pin(&self, pin: &str) -> bool {
        hash_pin(pin, &self.salt).is_ok_and(|hash| memcmp::eq(&hash, &self.hash))
    }
}

fn hash_pin(pin: &str, salt: &[u8]) -> Result<[u8; PIN_HASH_LENGTH]> {
    let mut hash = [0u8; PIN_HASH_LENGTH];
    pbkdf2_hmac(
        pin.as_bytes(),
        salt,
        PIN_HASH_ITERATIONS,
        MessageDigest::sha256(),
        &mut hash,
    )
    .foreign_err(|| ErrorKind::Internal)?;

    Ok(hash)
}

/// The loaded key of a holder, usable only while unlocked.
///
/// A session starts locked. [`HolderSession::unlock`] opens it after the PIN
/// checks out and [`HolderSession::lock`] closes it again; every operation
/// using the key fails with [`ErrorKind::Locked`] in between.
/// [`HolderSession::close`] drops the key.
pub struct HolderSession<S> {
    signer: S,
    did: String,
    kid: String,
    unlocked: bool,
}

impl<S> fmt::Debug for HolderSession<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HolderSession")
            .field("did", &self.did)
            .field("kid", &self.kid)
            .field("unlocked", &self.unlocked)
            .finish_non_exhaustive()
    }
}

impl<S: Signer> HolderSession<S> {
    /// Open a locked session over the key of holder `did`, whose
    /// verification method is `kid`.
    pub fn open(signer: S, did: impl Into<String>, kid: impl Into<String>) -> Self {
        Self {
            signer,
            did: did.into(),
            kid: kid.into(),
            unlocked: false,
        }
    }

    /// Unlock the session if `pin` is accepted by `verifier`.
    pub fn unlock(&mut self, pin: &str, verifier: &impl PinVerifier) -> Result<()> {
        if !verifier.verify_pin(pin) {
            tracing::warn!(did = %self.did, "holder session unlock rejected");
            return Err(BhError::root(ErrorKind::Locked)).ctx(|| "wrong PIN");
        }

        self.unlocked = true;
        tracing::debug!(did = %self.did, "holder session unlocked");

        Ok(())
    }

    /// Lock the session.
    pub fn lock(&mut self) {
        self.unlocked = false;
    }

    /// Whether the session is unlocked.
    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// The holder DID.
    pub fn did(&self) -> &str {
        &self.did
    }

    /// End the session, dropping the key.
    pub fn close(self) {
        tracing::debug!(did = %self.did, "holder session closed");
    }

    /// Sign a presentation of `credentials` for `audience`, bound to
    /// `nonce`, valid for [`PRESENTATION_LIFETIME`] from `now`.
    pub fn sign_presentation(
        &self,
        credentials: Vec<String>,
        nonce: &str,
        audience: &str,
        now: SecondsSinceEpoch,
    ) -> Result<String> {
        self.ensure_unlocked()?;

        let claims = VpClaims {
            jti: nonce.to_owned(),
            sub: Some(self.did.clone()),
            aud: audience.into(),
            exp: Some(now.saturating_add(PRESENTATION_LIFETIME)),
            nbf: None,
            iat: Some(now),
            vp: VerifiablePresentation::new(self.did.clone(), credentials),
        };

        sign_presentation(&claims, &self.signer, &self.kid).match_err(ErrorKind::credential)
    }

    /// The pairwise identifier of this holder at `domain`, derived from the
    /// opaque `seed` of one of its credentials.
    pub fn pairwise_id(&self, seed: &Seed, domain: &str) -> Result<String> {
        self.ensure_unlocked()?;

        derive_pseudonym(seed, domain).match_err(ErrorKind::pseudonym)
    }

    fn ensure_unlocked(&self) -> Result<()> {
        if !self.unlocked {
            return Err(BhError::root(ErrorKind::Locked));
        }

        Ok(())
    }
}
