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

use bh_jws_utils::{sign_compact, Signer};
use bherror::traits::{ErrorContext as _, PropagateError as _};

use crate::{Error, Result, VcClaims, VpClaims, TYP_JWT};

/// Sign credential `claims` into a compact JWT.
///
/// The algorithm follows from the signer's key type; `kid` should be the DID
/// URL of the issuer's verification method.
pub fn sign_credential<S: Signer + ?Sized>(
    claims: &VcClaims,
    signer: &S,
    kid: &str,
) -> Result<String> {
    sign_compact(claims, signer, kid, Some(TYP_JWT))
        .with_err(|| Error::SigningFailed)
        .ctx(|| "signing credential")
}

/// Sign presentation `claims` into a compact JWT.
///
/// `kid` should be the DID URL of the holder's verification method.
pub fn sign_presentation<S: Signer + ?Sized>(
    claims: &VpClaims,
    signer: &S,
    kid: &str,
) -> Result<String> {
    sign_compact(claims, signer, kid, Some(TYP_JWT))
        .with_err(|| Error::SigningFailed)
        .ctx(|| "signing presentation")
}
