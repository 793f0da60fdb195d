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

//! Issuer-side flow: from a credential request to a signed credential.

use bh_jws_utils::{base64_url_encode, Signer};
use bh_pseudonym::{generate_or_retrieve_seed, SeedRegistry};
use bh_sd_jwt::issue_sd_jwt;
use bh_vc_jwt::{
    sign_credential, CredentialStatus, JsonObject, SecondsSinceEpoch, VcClaims,
    VerifiableCredential,
};
use bherror::{
    traits::{ErrorContext as _, ForeignError as _, PropagateError as _},
    Error as BhError,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::{ClaimValue, ErrorKind, Limits, Result};

/// Subject claim carrying the opaque identifier seed of the holder.
pub const OPAQUE_ID_SEED_CLAIM: &str = "opaque_id_seed";

/// Default lifetime of an issued credential, in seconds.
pub const DEFAULT_CREDENTIAL_VALIDITY: SecondsSinceEpoch = 365 * 24 * 60 * 60;

/// A request for a credential.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialRequest {
    /// DID of the holder, bound as `sub` and as the subject `id`.
    pub holder_did: String,
    /// Credential type, e.g. `PersonIdentification`.
    pub credential_type: String,
    /// Claims about the holder.
    pub subject: JsonObject,
    /// Subject claims to make selectively disclosable. If any are named, an
    /// SD-JWT is issued, otherwise a plain JWT.
    #[serde(default)]
    pub disclosable_keys: Vec<String>,
    /// Status list entry of the credential.
    #[serde(default)]
    pub credential_status: Option<CredentialStatus>,
}

/// A signed credential.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    /// The compact JWT or SD-JWT.
    pub token: String,
    /// The claims that were signed, with every subject claim in plain sight.
    pub claims: VcClaims,
    /// The holder's opaque identifier seed for this credential type,
    /// base64url encoded.
    pub opaque_id_seed: String,
}

/// Issues credentials signed with one key.
///
/// Every credential of a holder and type carries the same opaque identifier
/// seed, so renewals keep the pairwise identifiers derived from it stable
/// until the seed is invalidated in [`CredentialIssuer::seeds`].
pub struct CredentialIssuer<S> {
    did: String,
    kid: String,
    signer: S,
    seeds: SeedRegistry,
    limits: Limits,
    validity: SecondsSinceEpoch,
}

impl<S: Signer> CredentialIssuer<S> {
    /// Create an issuer `did` signing with `signer`, whose verification
    /// method is `kid`.
    pub fn new(did: impl Into<String>, kid: impl Into<String>, signer: S) -> Self {
        Self {
            did: did.into(),
            kid: kid.into(),
            signer,
            seeds: SeedRegistry::new(),
            limits: Limits::default(),
            validity: DEFAULT_CREDENTIAL_VALIDITY,
        }
    }

    /// Replace the resource ceilings.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Replace the credential lifetime.
    pub fn with_validity(mut self, validity: SecondsSinceEpoch) -> Self {
        self.validity = validity;
        self
    }

    /// The seed registry.
    pub fn seeds(&self) -> &SeedRegistry {
        &self.seeds
    }

    /// Issue the credential of `request` at time `now`.
    ///
    /// The request is rejected with [`ErrorKind::MalformedInput`] if the
    /// holder, type or subject is missing or the subject claims reserved
    /// names, and with [`ErrorKind::SizeLimitExceeded`] before any signing if
    /// it exceeds the [`Limits`].
    pub async fn issue(
        &self,
        request: &CredentialRequest,
        now: SecondsSinceEpoch,
    ) -> Result<IssuedCredential> {
        self.check_request(request)?;
        // same shape as the signed subject, checked before a seed is drawn
        let placeholder = "_".repeat(bh_pseudonym::ENCODED_LENGTH);
        ClaimValue::subject(&signed_subject(request, &placeholder), &self.limits)?;

        let seed = generate_or_retrieve_seed(
            &self.seeds,
            &request.holder_did,
            &request.credential_type,
        )
        .await
        .match_err(ErrorKind::pseudonym)?;
        let opaque_id_seed = seed.to_base64url();

        let subject = signed_subject(request, &opaque_id_seed);
        ClaimValue::subject(&subject, &self.limits)?;

        let expires_at = now.saturating_add(self.validity);
        let mut vc = VerifiableCredential::new(
            &request.credential_type,
            self.did.as_str(),
            subject,
            rfc3339(now)?,
        );
        vc.expiration_date = Some(rfc3339(expires_at)?);
        vc.credential_status = request.credential_status.clone();

        let claims = VcClaims {
            iss: self.did.clone(),
            sub: Some(request.holder_did.clone()),
            exp: Some(expires_at),
            nbf: None,
            iat: Some(now),
            jti: Some(credential_id()?),
            vc,
        };

        let token = if request.disclosable_keys.is_empty() {
            sign_credential(&claims, &self.signer, &self.kid).match_err(ErrorKind::credential)?
        } else {
            let keys: Vec<&str> = request.disclosable_keys.iter().map(String::as_str).collect();
            issue_sd_jwt(&claims, &keys, &self.signer, &self.kid)
                .match_err(ErrorKind::sd_jwt)?
                .to_string()
        };

        tracing::info!(
            issuer = %self.did,
            holder = %request.holder_did,
            credential_type = %request.credential_type,
            selective = !request.disclosable_keys.is_empty(),
            "credential issued"
        );

        Ok(IssuedCredential {
            token,
            claims,
            opaque_id_seed,
        })
    }

    fn check_request(&self, request: &CredentialRequest) -> Result<()> {
        let malformed =
            |message: &'static str| Err(BhError::root(ErrorKind::MalformedInput).ctx(message));

        if request.holder_did.trim().is_empty() || !request.holder_did.starts_with("did:") {
            return malformed("holder is not a DID");
        }
        if request.credential_type.trim().is_empty() {
            return malformed("credential type is empty");
        }
        if request.subject.is_empty() {
            return malformed("subject is empty");
        }
        if request.subject.contains_key(OPAQUE_ID_SEED_CLAIM) {
            return malformed("subject claims the opaque identifier seed");
        }
        if request
            .subject
            .get("id")
            .is_some_and(|id| id.as_str() != Some(request.holder_did.as_str()))
        {
            return malformed("subject id is not the holder");
        }

        let longest = request.holder_did.len().max(request.credential_type.len());
        if longest > self.limits.max_string_length {
            return Err(BhError::root(ErrorKind::SizeLimitExceeded(
                "max_string_length",
            )));
        }

        Ok(())
    }
}

/// The subject as signed: the requested claims plus the holder `id` and the
/// opaque identifier seed.
fn signed_subject(request: &CredentialRequest, opaque_id_seed: &str) -> JsonObject {
    let mut subject = request.subject.clone();
    subject.insert("id".to_owned(), Value::from(request.holder_did.as_str()));
    subject.insert(OPAQUE_ID_SEED_CLAIM.to_owned(), Value::from(opaque_id_seed));
    subject
}

fn rfc3339(timestamp: SecondsSinceEpoch) -> Result<String> {
    let seconds = i64::try_from(timestamp)
        .foreign_err(|| ErrorKind::MalformedInput)
        .ctx(|| "timestamp out of range")?;

    DateTime::<Utc>::from_timestamp(seconds, 0)
        .map(|instant| instant.to_rfc3339_opts(SecondsFormat::Secs, true))
        .ok_or_else(|| BhError::root(ErrorKind::MalformedInput).ctx("timestamp out of range"))
}

fn credential_id() -> Result<String> {
    let mut id = [0u8; 16];
    openssl::rand::rand_bytes(&mut id).foreign_err(|| ErrorKind::Internal)?;

    Ok(format!("urn:bh:credential:{}", base64_url_encode(id)))
}
