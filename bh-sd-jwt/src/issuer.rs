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
use bh_vc_jwt::VcClaims;
use bherror::{
    traits::{ErrorContext as _, ForeignError as _, PropagateError as _},
    Error as BhError,
};
use serde_json::Value;

use crate::{
    encode_disclosable, DisclosableClaims, Error, HashingAlgorithm, Result, SdJwt, SD_ALG,
};

/// The `typ` header of an SD-JWT credential.
pub const TYP_VC_SD_JWT: &str = "vc+sd-jwt";

/// Sign `claims` as an SD-JWT credential in which the subject claims named in
/// `disclosable_keys` are selectively disclosable.
///
/// Only `vc.credentialSubject` is encoded; the registered claims and the
/// rest of `vc` stay in plain sight so that the credential verifies like any
/// JWT credential. `_sd_alg` is added to the top level of the payload.
///
/// Concealing the subject `id` hides the holder binding from verifiers that
/// are not shown it.
pub fn issue_sd_jwt<S: Signer + ?Sized>(
    claims: &VcClaims,
    disclosable_keys: &[&str],
    signer: &S,
    kid: &str,
) -> Result<SdJwt> {
    let DisclosableClaims {
        claims: subject,
        disclosures,
    } = encode_disclosable(&claims.vc.credential_subject, disclosable_keys)
        .ctx(|| "encoding the credential subject")?;

    let mut encoded = claims.clone();
    encoded.vc.credential_subject = subject;

    let Value::Object(mut payload) =
        serde_json::to_value(&encoded).foreign_err(|| Error::SigningFailed)?
    else {
        return Err(BhError::root(Error::SigningFailed));
    };
    payload.insert(
        SD_ALG.to_owned(),
        Value::from(HashingAlgorithm::Sha256.as_str()),
    );

    let jwt = sign_compact(&payload, signer, kid, Some(TYP_VC_SD_JWT))
        .with_err(|| Error::SigningFailed)?;

    Ok(SdJwt::new(jwt, disclosures))
}
