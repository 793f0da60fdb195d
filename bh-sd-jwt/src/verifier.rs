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

use bh_did_resolver::KeyResolver;
use bh_vc_jwt::{JwtVerifier, SecondsSinceEpoch, VcClaims};
use bherror::traits::{ErrorContext as _, PropagateError as _};

use crate::{decode_claims, Error, Result, SdJwt};

/// Verify an SD-JWT credential at time `now` and reveal its presented
/// disclosures.
///
/// The issuer-signed JWT goes through every check of
/// [`JwtVerifier::verify_credential`]; its failure is reported as
/// [`Error::Credential`] carrying the credential error. Every presented
/// disclosure must then be committed to by the credential subject, otherwise
/// [`Error::DigestMismatch`] is returned. The returned claims carry the
/// subject with the presented disclosures merged in.
pub async fn verify_sd_jwt<R: KeyResolver>(
    token: &str,
    verifier: &JwtVerifier<R>,
    now: SecondsSinceEpoch,
) -> Result<VcClaims> {
    let sd_jwt: SdJwt = token.parse()?;

    let mut claims = verifier
        .verify_credential(sd_jwt.jwt(), now)
        .await
        .match_err(|error| Error::Credential(error.clone()))?;

    let subject = decode_claims(&claims.vc.credential_subject, sd_jwt.disclosures())
        .ctx(|| format!("decoding the subject of a credential issued by {}", claims.iss))?;
    claims.vc.credential_subject = subject;

    Ok(claims)
}
