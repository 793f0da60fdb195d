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
use bh_jws_utils::UnverifiedJws;
use bherror::{
    traits::{ErrorContext as _, ForeignError as _, PropagateError as _},
    Error as BhError,
};
use chrono::DateTime;
use serde::de::DeserializeOwned;

use crate::{Error, Result, SecondsSinceEpoch, VcClaims, VerifiableCredential, VpClaims};

/// Verifies JWT credentials and presentations against keys obtained from a
/// [`KeyResolver`].
///
/// The key is always resolved from the DID the token claims as its issuer
/// (`iss` for credentials, `vp.holder` for presentations). The token's `kid`
/// only selects a verification method when it is a DID URL of that same DID.
#[derive(Debug)]
pub struct JwtVerifier<R> {
    resolver: R,
    leeway: SecondsSinceEpoch,
}

impl<R: KeyResolver> JwtVerifier<R> {
    /// Create a verifier without clock skew tolerance.
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            leeway: 0,
        }
    }

    /// Tolerate `leeway` seconds of clock skew in `exp` and `nbf` checks.
    pub fn with_leeway(mut self, leeway: SecondsSinceEpoch) -> Self {
        self.leeway = leeway;
        self
    }

    /// The underlying resolver.
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Verify a JWT credential at time `now`.
    ///
    /// The checks run in order, stopping at the first failure: token shape,
    /// issuer key resolution, signature, `exp`/`nbf`, `vc.expirationDate`.
    pub async fn verify_credential(&self, token: &str, now: SecondsSinceEpoch) -> Result<VcClaims> {
        let jws = parse(token)?;
        let unverified: VcClaims = jws
            .claims_as()
            .with_err(|| Error::MalformedToken)
            .ctx(|| "claims are not a JWT credential")?;

        let key_id = signer_key_id(&unverified.iss, jws.header().kid.as_deref());
        let claims: VcClaims = self.verify_signature(jws, &key_id).await?;

        self.check_time(claims.exp, claims.nbf, now)?;
        check_expiration_date(&claims.vc, now)?;

        tracing::debug!(issuer = %claims.iss, "credential verified");

        Ok(claims)
    }

    /// Verify a JWT presentation at time `now`, bound to `nonce` and
    /// `audience`.
    ///
    /// On top of the credential checks, `jti` must equal `nonce`, `aud` must
    /// contain `audience`, and `sub`, if present, must equal `vp.holder`.
    /// Embedded credentials are not verified here.
    pub async fn verify_presentation(
        &self,
        token: &str,
        nonce: &str,
        audience: &str,
        now: SecondsSinceEpoch,
    ) -> Result<VpClaims> {
        let jws = parse(token)?;
        let unverified: VpClaims = jws
            .claims_as()
            .with_err(|| Error::MalformedToken)
            .ctx(|| "claims are not a JWT presentation")?;

        let key_id = signer_key_id(&unverified.vp.holder, jws.header().kid.as_deref());
        let claims: VpClaims = self.verify_signature(jws, &key_id).await?;

        self.check_time(claims.exp, claims.nbf, now)?;

        if claims.jti != nonce {
            return Err(BhError::root(Error::NonceMismatch));
        }
        if !claims.aud.contains(audience) {
            return Err(BhError::root(Error::AudienceMismatch))
                .ctx(|| format!("expected audience {}", audience));
        }
        if claims
            .sub
            .as_deref()
            .is_some_and(|sub| sub != claims.vp.holder)
        {
            return Err(BhError::root(Error::HolderMismatch));
        }

        tracing::debug!(holder = %claims.vp.holder, "presentation verified");

        Ok(claims)
    }

    async fn verify_signature<T: DeserializeOwned>(
        &self,
        jws: UnverifiedJws,
        key_id: &str,
    ) -> Result<T> {
        let public_key = self
            .resolver
            .resolve(key_id)
            .await
            .with_err(|| Error::KeyResolution)
            .ctx(|| format!("resolving {}", key_id))?;

        jws.verify_as(&public_key).with_err(|| Error::InvalidSignature)
    }

    fn check_time(
        &self,
        exp: Option<SecondsSinceEpoch>,
        nbf: Option<SecondsSinceEpoch>,
        now: SecondsSinceEpoch,
    ) -> Result<()> {
        // https://www.rfc-editor.org/rfc/rfc7519.html#section-4.1.4
        if let Some(exp) = exp {
            // RFC: "on or after"
            if now >= exp.saturating_add(self.leeway) {
                return Err(BhError::root(Error::JwtExpired(now, exp)));
            }
        }

        // https://www.rfc-editor.org/rfc/rfc7519.html#section-4.1.5
        if let Some(nbf) = nbf {
            if now.saturating_add(self.leeway) < nbf {
                return Err(BhError::root(Error::JwtNotYetValid(now, nbf)));
            }
        }

        Ok(())
    }
}

fn parse(token: &str) -> Result<UnverifiedJws> {
    UnverifiedJws::parse(token).with_err(|| Error::MalformedToken)
}

/// The DID URL to resolve for a token claiming to be signed by `did`.
fn signer_key_id(did: &str, kid: Option<&str>) -> String {
    match kid {
        Some(kid)
            if kid
                .strip_prefix(did)
                .is_some_and(|fragment| fragment.starts_with('#')) =>
        {
            kid.to_owned()
        }
        _ => did.to_owned(),
    }
}

fn check_expiration_date(vc: &VerifiableCredential, now: SecondsSinceEpoch) -> Result<()> {
    let Some(expiration_date) = &vc.expiration_date else {
        return Ok(());
    };

    let expires_at = DateTime::parse_from_rfc3339(expiration_date)
        .foreign_err(|| Error::MalformedToken)
        .ctx(|| "vc.expirationDate is not an RFC 3339 date")?;

    if i64::try_from(now).unwrap_or(i64::MAX) >= expires_at.timestamp() {
        return Err(BhError::root(Error::CredentialExpired(
            expiration_date.clone(),
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use bh_did_resolver::test_utils::StaticKeyResolver;
    use bh_jws_utils::{sign_compact, KeyType, SigningKey};
    use serde_json::json;

    use super::*;
    use crate::{
        sign_credential, sign_presentation, Audience, VerifiablePresentation, VpClaims,
    };

    const ISSUER: &str = "did:web:issuer.example";
    const HOLDER: &str = "did:web:holder.example";
    const VERIFIER: &str = "https://verifier.example";
    const NOW: SecondsSinceEpoch = 1_780_000_000;

    fn credential_claims() -> VcClaims {
        VcClaims {
            iss: ISSUER.to_owned(),
            sub: Some(HOLDER.to_owned()),
            exp: Some(NOW + 3_600),
            nbf: Some(NOW - 60),
            iat: Some(NOW - 60),
            jti: Some("urn:uuid:1".to_owned()),
            vc: VerifiableCredential::new(
                "UniversityDegreeCredential",
                ISSUER,
                serde_json::from_value(json!({ "id": HOLDER, "degree": "BSc" })).unwrap(),
                "2026-06-01T00:00:00Z",
            ),
        }
    }

    fn presentation_claims(credentials: Vec<String>) -> VpClaims {
        VpClaims {
            jti: "nonce-123".to_owned(),
            sub: Some(HOLDER.to_owned()),
            aud: Audience::Many(vec!["https://other.example".to_owned(), VERIFIER.to_owned()]),
            exp: Some(NOW + 300),
            nbf: None,
            iat: Some(NOW),
            vp: VerifiablePresentation::new(HOLDER, credentials),
        }
    }

    fn setup() -> (SigningKey, SigningKey, JwtVerifier<StaticKeyResolver>) {
        let issuer_key = SigningKey::generate(KeyType::EcP256).unwrap();
        let holder_key = SigningKey::generate(KeyType::EcP384).unwrap();
        let resolver = StaticKeyResolver::new()
            .with_key(ISSUER, issuer_key.public_key().unwrap())
            .with_key(HOLDER, holder_key.public_key().unwrap());
        (issuer_key, holder_key, JwtVerifier::new(resolver))
    }

    #[tokio::test]
    async fn credential_round_trip() {
        let (issuer_key, _, verifier) = setup();
        let claims = credential_claims();

        let token = sign_credential(&claims, &issuer_key, &format!("{}#key-1", ISSUER)).unwrap();
        let verified = verifier.verify_credential(&token, NOW).await.unwrap();

        assert_eq!(verified, claims);
        assert_eq!(verifier.resolver().resolutions(), 1);
    }

    #[tokio::test]
    async fn credential_signed_by_other_key_is_rejected() {
        let (_, holder_key, verifier) = setup();
        let forger = SigningKey::generate(KeyType::EcP256).unwrap();

        let token = sign_credential(&credential_claims(), &forger, ISSUER).unwrap();
        let err = verifier.verify_credential(&token, NOW).await.unwrap_err();
        assert_eq!(err.error, Error::InvalidSignature);

        // a key of another family is rejected whatever `alg` the header names
        let token = sign_credential(&credential_claims(), &holder_key, ISSUER).unwrap();
        let err = verifier.verify_credential(&token, NOW).await.unwrap_err();
        assert_eq!(err.error, Error::InvalidSignature);

        let rsa = SigningKey::generate(KeyType::Rsa).unwrap();
        let token = sign_credential(&credential_claims(), &rsa, ISSUER).unwrap();
        let err = verifier.verify_credential(&token, NOW).await.unwrap_err();
        assert_eq!(err.error, Error::InvalidSignature);
    }

    #[tokio::test]
    async fn kid_of_another_did_is_ignored() {
        let (issuer_key, _, verifier) = setup();
        let token =
            sign_credential(&credential_claims(), &issuer_key, "did:web:evil.example#key-1")
                .unwrap();

        verifier.verify_credential(&token, NOW).await.unwrap();
    }

    #[tokio::test]
    async fn credential_time_checks() {
        let (issuer_key, _, verifier) = setup();
        let claims = credential_claims();
        let token = sign_credential(&claims, &issuer_key, ISSUER).unwrap();

        let exp = claims.exp.unwrap();
        let err = verifier.verify_credential(&token, exp).await.unwrap_err();
        assert_eq!(err.error, Error::JwtExpired(exp, exp));

        let nbf = claims.nbf.unwrap();
        let err = verifier
            .verify_credential(&token, nbf - 1)
            .await
            .unwrap_err();
        assert_eq!(err.error, Error::JwtNotYetValid(nbf - 1, nbf));

        let lenient = JwtVerifier::new(verifier.resolver).with_leeway(120);
        lenient.verify_credential(&token, nbf - 1).await.unwrap();
    }

    #[tokio::test]
    async fn credential_expiration_date_is_checked() {
        let (issuer_key, _, verifier) = setup();

        let mut claims = credential_claims();
        claims.vc.expiration_date = Some("2020-01-01T00:00:00Z".to_owned());
        let token = sign_credential(&claims, &issuer_key, ISSUER).unwrap();
        let err = verifier.verify_credential(&token, NOW).await.unwrap_err();
        assert_eq!(
            err.error,
            Error::CredentialExpired("2020-01-01T00:00:00Z".to_owned())
        );

        claims.vc.expiration_date = Some("next year".to_owned());
        let token = sign_credential(&claims, &issuer_key, ISSUER).unwrap();
        let err = verifier.verify_credential(&token, NOW).await.unwrap_err();
        assert_eq!(err.error, Error::MalformedToken);

        claims.vc.expiration_date = Some("2100-01-01T00:00:00+02:00".to_owned());
        let token = sign_credential(&claims, &issuer_key, ISSUER).unwrap();
        verifier.verify_credential(&token, NOW).await.unwrap();
    }

    #[tokio::test]
    async fn malformed_tokens_fail_before_resolution() {
        let (issuer_key, _, verifier) = setup();

        let err = verifier
            .verify_credential("not.a.jwt", NOW)
            .await
            .unwrap_err();
        assert_eq!(err.error, Error::MalformedToken);

        // signed, but not a credential
        let token = sign_compact(&json!({ "iss": ISSUER }), &issuer_key, ISSUER, None).unwrap();
        let err = verifier.verify_credential(&token, NOW).await.unwrap_err();
        assert_eq!(err.error, Error::MalformedToken);

        assert_eq!(verifier.resolver().resolutions(), 0);
    }

    #[tokio::test]
    async fn unknown_issuer_fails_resolution() {
        let (issuer_key, _, verifier) = setup();
        let mut claims = credential_claims();
        claims.iss = "did:web:unknown.example".to_owned();

        let token = sign_credential(&claims, &issuer_key, ISSUER).unwrap();
        let err = verifier.verify_credential(&token, NOW).await.unwrap_err();
        assert_eq!(err.error, Error::KeyResolution);
    }

    #[tokio::test]
    async fn presentation_round_trip() {
        let (_, holder_key, verifier) = setup();
        let claims = presentation_claims(vec!["eyJ...".to_owned()]);

        let token = sign_presentation(&claims, &holder_key, &format!("{}#key-1", HOLDER)).unwrap();
        let verified = verifier
            .verify_presentation(&token, "nonce-123", VERIFIER, NOW)
            .await
            .unwrap();

        assert_eq!(verified, claims);
    }

    #[tokio::test]
    async fn presentation_binding_checks() {
        let (_, holder_key, verifier) = setup();
        let token = sign_presentation(&presentation_claims(vec![]), &holder_key, HOLDER).unwrap();

        let err = verifier
            .verify_presentation(&token, "another-nonce", VERIFIER, NOW)
            .await
            .unwrap_err();
        assert_eq!(err.error, Error::NonceMismatch);

        let err = verifier
            .verify_presentation(&token, "nonce-123", "https://evil.example", NOW)
            .await
            .unwrap_err();
        assert_eq!(err.error, Error::AudienceMismatch);

        let err = verifier
            .verify_presentation(&token, "nonce-123", VERIFIER, NOW + 300)
            .await
            .unwrap_err();
        assert_matches!(err.error, Error::JwtExpired(..));

        let mut claims = presentation_claims(vec![]);
        claims.sub = Some("did:web:someone-else.example".to_owned());
        let token = sign_presentation(&claims, &holder_key, HOLDER).unwrap();
        let err = verifier
            .verify_presentation(&token, "nonce-123", VERIFIER, NOW)
            .await
            .unwrap_err();
        assert_eq!(err.error, Error::HolderMismatch);
    }

    #[tokio::test]
    async fn presentation_signed_by_issuer_key_is_rejected() {
        let (issuer_key, _, verifier) = setup();
        let token =
            sign_presentation(&presentation_claims(vec![]), &issuer_key, HOLDER).unwrap();

        let err = verifier
            .verify_presentation(&token, "nonce-123", VERIFIER, NOW)
            .await
            .unwrap_err();
        assert_eq!(err.error, Error::InvalidSignature);
    }
}
