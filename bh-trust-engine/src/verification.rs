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

//! Verifier-side flow: from a presentation to verified credentials.

use bh_did_resolver::KeyResolver;
use bh_jws_utils::{base64_url_decode, UnverifiedJws};
use bh_sd_jwt::verify_sd_jwt;
use bh_status_list::{check_credential_status, StatusListClient};
use bh_vc_jwt::{JwtVerifier, SecondsSinceEpoch, VcClaims};
use bherror::{
    traits::{ErrorContext as _, ForeignError as _, PropagateError as _},
    Error as BhError,
};
use bhmdoc::{PresentationSession, ValidationResult, Validator};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    CancellationToken, ClaimMap, ClaimValue, ErrorKind, IssuerTrustList, Limits, Result, Trust,
    TrustPolicy,
};

/// Base64url encoding of `{"`, the start of every JOSE header.
const JOSE_HEADER_PREFIX: &str = "eyJ";

const SD_JWT_DELIMITER: char = '~';

/// First bytes of a CBOR map, major type 5.
const CBOR_MAP_BYTES: std::ops::RangeInclusive<u8> = 0xa0..=0xbf;

/// The format of a credential embedded in a presentation.
#[derive(strum_macros::Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialFormat {
    /// A JWT credential.
    #[strum(to_string = "jwt_vc")]
    Jwt,
    /// An SD-JWT credential.
    #[strum(to_string = "vc+sd-jwt")]
    SdJwt,
    /// A base64url encoded `mso_mdoc` document or device response.
    #[strum(to_string = "mso_mdoc")]
    MobileDocument,
}

impl CredentialFormat {
    /// Tell the format of `credential` from its first bytes.
    pub fn sniff(credential: &str) -> Result<Self> {
        sniff(credential).map(|embedded| embedded.format())
    }
}

enum Embedded<'a> {
    Jwt(&'a str),
    SdJwt(&'a str),
    MobileDocument(Vec<u8>),
}

impl Embedded<'_> {
    fn format(&self) -> CredentialFormat {
        match self {
            Embedded::Jwt(_) => CredentialFormat::Jwt,
            Embedded::SdJwt(_) => CredentialFormat::SdJwt,
            Embedded::MobileDocument(_) => CredentialFormat::MobileDocument,
        }
    }
}

fn sniff(credential: &str) -> Result<Embedded<'_>> {
    if credential.starts_with(JOSE_HEADER_PREFIX) {
        return Ok(if credential.contains(SD_JWT_DELIMITER) {
            Embedded::SdJwt(credential)
        } else {
            Embedded::Jwt(credential)
        });
    }

    let bytes = base64_url_decode(credential)
        .foreign_err(|| ErrorKind::MalformedInput)
        .ctx(|| "credential is neither a JWT nor base64url")?;

    match bytes.first() {
        Some(first) if CBOR_MAP_BYTES.contains(first) => Ok(Embedded::MobileDocument(bytes)),
        _ => Err(BhError::root(ErrorKind::MalformedInput))
            .ctx(|| "credential is neither a JWT nor a CBOR map"),
    }
}

/// What a presentation must be bound to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PresentationRequest {
    /// The nonce the verifier issued.
    pub nonce: String,
    /// The verifier's client identifier, which is also the response URI of
    /// mobile document sessions.
    pub audience: String,
    /// The nonce the wallet generated for a mobile document session; the
    /// verifier nonce when absent.
    #[serde(default)]
    pub mdoc_generated_nonce: Option<String>,
}

impl PresentationRequest {
    /// A request bound to `nonce` and `audience`.
    pub fn new(nonce: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            nonce: nonce.into(),
            audience: audience.into(),
            mdoc_generated_nonce: None,
        }
    }

    /// Set the wallet-generated nonce of the mobile document session.
    pub fn with_mdoc_generated_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.mdoc_generated_nonce = Some(nonce.into());
        self
    }

    /// The mobile document session a device signature must cover.
    pub fn session(&self) -> PresentationSession {
        PresentationSession::new(
            self.audience.as_str(),
            self.audience.as_str(),
            self.nonce.as_str(),
            self.mdoc_generated_nonce
                .as_deref()
                .unwrap_or(self.nonce.as_str()),
        )
    }
}

/// A credential that passed every check.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedCredential {
    /// How the credential was encoded.
    pub format: CredentialFormat,
    /// The issuer DID; `None` for mobile documents, whose issuer is vouched
    /// for by its certificate chain.
    pub issuer: Option<String>,
    /// Credential types, or the document type of a mobile document.
    pub types: Vec<String>,
    /// The disclosed subject claims; for mobile documents, keyed by
    /// namespace.
    pub subject: ClaimMap,
    /// Trust in the issuer.
    pub trust: Trust,
}

/// A presentation that passed every check.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedPresentation {
    /// The holder DID.
    pub holder: String,
    /// The embedded credentials, in order.
    pub credentials: Vec<VerifiedCredential>,
    /// Combined trust in the issuers of every credential.
    pub trust: Trust,
}

/// One presentation of a batch, with the request it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    /// The compact JWT presentation.
    pub presentation: String,
    /// What it must be bound to.
    pub request: PresentationRequest,
}

/// Outcome of [`PresentationVerifier::verify_batch`].
#[derive(Debug)]
pub struct BatchReport {
    /// One result per processed entry, in order. Entries after a
    /// cancellation are not processed and have no result.
    pub results: Vec<Result<VerifiedPresentation>>,
    /// Whether the batch was cancelled.
    pub cancelled: bool,
}

impl BatchReport {
    /// Number of presentations that verified.
    pub fn verified(&self) -> usize {
        self.results.iter().filter(|result| result.is_ok()).count()
    }
}

/// Verifies presentations and the credentials embedded in them.
///
/// Per presentation, in order and each a hard failure:
///
/// 1. the size ceiling of [`Limits`],
/// 2. the presentation signature, time window, nonce and audience,
/// 3. per embedded credential, selected by format: its signature and time
///    window (JWT), additionally its disclosures (SD-JWT), or every check of
///    the mobile document [`Validator`],
/// 4. the subject ceilings of [`Limits`],
/// 5. the status list entry of the credential, if it has one,
/// 6. that the credential was issued to the presenting holder; mobile
///    documents are bound by their device signature instead,
/// 7. the combined [`Trust`] of every issuer under the [`TrustPolicy`].
pub struct PresentationVerifier<R, C> {
    jwt: JwtVerifier<R>,
    status: C,
    mdoc: Validator,
    limits: Limits,
    policy: TrustPolicy,
    issuers: IssuerTrustList,
}

impl<R: KeyResolver, C: StatusListClient> PresentationVerifier<R, C> {
    /// Create a verifier with the default [`Limits`] and [`TrustPolicy`] and
    /// an empty [`IssuerTrustList`].
    pub fn new(jwt: JwtVerifier<R>, status: C, mdoc: Validator) -> Self {
        Self {
            jwt,
            status,
            mdoc,
            limits: Limits::default(),
            policy: TrustPolicy::default(),
            issuers: IssuerTrustList::default(),
        }
    }

    /// Replace the resource ceilings.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Replace the trust policy.
    pub fn with_trust_policy(mut self, policy: TrustPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the trusted credential issuers.
    pub fn with_issuers(mut self, issuers: IssuerTrustList) -> Self {
        self.issuers = issuers;
        self
    }

    /// Verify `presentation` against `request` at time `now`.
    pub async fn verify(
        &self,
        presentation: &str,
        request: &PresentationRequest,
        now: SecondsSinceEpoch,
    ) -> Result<VerifiedPresentation> {
        self.limits.check_presentation(presentation)?;

        self.verify_presentation(presentation, request, now, &CancellationToken::new())
            .await
    }

    /// Verify every entry of `batch` at time `now`.
    ///
    /// A batch over the ceilings of [`Limits`] is rejected as a whole before
    /// any signature is checked. Otherwise each entry gets its own result.
    /// `cancel` is checked before every expensive step; once it is
    /// cancelled the entry in progress fails with [`ErrorKind::Cancelled`]
    /// and the remaining entries are skipped.
    pub async fn verify_batch(
        &self,
        batch: &[BatchEntry],
        now: SecondsSinceEpoch,
        cancel: &CancellationToken,
    ) -> Result<BatchReport> {
        self.limits
            .check_batch(batch.iter().map(|entry| entry.presentation.as_str()))?;

        let mut results = Vec::with_capacity(batch.len());
        for entry in batch {
            if cancel.is_cancelled() {
                break;
            }

            results.push(
                self.verify_presentation(&entry.presentation, &entry.request, now, cancel)
                    .await,
            );
        }

        let report = BatchReport {
            results,
            cancelled: cancel.is_cancelled(),
        };
        tracing::info!(
            entries = batch.len(),
            verified = report.verified(),
            cancelled = report.cancelled,
            "batch verified"
        );

        Ok(report)
    }

    async fn verify_presentation(
        &self,
        presentation: &str,
        request: &PresentationRequest,
        now: SecondsSinceEpoch,
        cancel: &CancellationToken,
    ) -> Result<VerifiedPresentation> {
        cancel.check()?;
        let claims = self
            .jwt
            .verify_presentation(presentation, &request.nonce, &request.audience, now)
            .await
            .match_err(ErrorKind::credential)?;
        let holder = claims.vp.holder;

        if claims.vp.verifiable_credential.is_empty() {
            return Err(BhError::root(ErrorKind::MalformedInput))
                .ctx(|| "presentation carries no credentials");
        }

        let mut credentials = Vec::with_capacity(claims.vp.verifiable_credential.len());
        for credential in &claims.vp.verifiable_credential {
            cancel.check()?;
            credentials.extend(
                self.verify_credential(credential, &holder, request, now, cancel)
                    .await?,
            );
        }

        let trust = Trust::all(credentials.iter().map(|credential| credential.trust));
        if !self.policy.accepts(trust) {
            tracing::warn!(%holder, ?trust, "presentation issuers not trusted");
            return Err(BhError::root(ErrorKind::Untrusted))
                .ctx(|| format!("presentation trust is {:?}", trust));
        }

        tracing::info!(
            %holder,
            credentials = credentials.len(),
            ?trust,
            "presentation verified"
        );

        Ok(VerifiedPresentation {
            holder,
            credentials,
            trust,
        })
    }

    async fn verify_credential(
        &self,
        credential: &str,
        holder: &str,
        request: &PresentationRequest,
        now: SecondsSinceEpoch,
        cancel: &CancellationToken,
    ) -> Result<Vec<VerifiedCredential>> {
        let embedded = sniff(credential)?;
        let format = embedded.format();
        tracing::debug!(%format, "verifying embedded credential");

        if let Embedded::Jwt(token) = embedded {
            self.check_unverified_subject(token)?;
        }

        let claims = match embedded {
            Embedded::Jwt(token) => self
                .jwt
                .verify_credential(token, now)
                .await
                .match_err(ErrorKind::credential)?,
            Embedded::SdJwt(token) => verify_sd_jwt(token, &self.jwt, now)
                .await
                .match_err(ErrorKind::sd_jwt)?,
            Embedded::MobileDocument(bytes) => {
                return self.verify_mobile_document(&bytes, request, now);
            }
        };

        let subject = ClaimValue::subject(&claims.vc.credential_subject, &self.limits)?;
        self.check_status(&claims, now, cancel).await?;

        if claims.holder() != Some(holder) {
            return Err(BhError::root(ErrorKind::HolderMismatch)).ctx(|| {
                format!(
                    "credential of {:?} presented by {}",
                    claims.holder(),
                    holder
                )
            });
        }

        Ok(vec![VerifiedCredential {
            format,
            trust: self.issuers.trust(&claims.iss),
            issuer: Some(claims.iss),
            types: claims.vc.types,
            subject,
        }])
    }

    /// Applies the subject ceilings to a still unverified JWT credential, so
    /// an oversized one costs no key resolution or status fetch. The verified
    /// subject is checked again afterwards.
    ///
    /// SD-JWT subjects carry digests until disclosed and are only checked
    /// once verified, which is still ahead of the status fetch.
    fn check_unverified_subject(&self, token: &str) -> Result<()> {
        // malformed tokens are reported by signature verification
        let Ok(jws) = UnverifiedJws::parse(token) else {
            return Ok(());
        };

        let subject = jws
            .claims()
            .get("vc")
            .and_then(|vc| vc.get("credentialSubject"))
            .and_then(Value::as_object);
        if let Some(subject) = subject {
            ClaimValue::subject(subject, &self.limits)?;
        }

        Ok(())
    }

    async fn check_status(
        &self,
        claims: &VcClaims,
        now: SecondsSinceEpoch,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let Some(status) = &claims.vc.credential_status else {
            return Ok(());
        };

        cancel.check()?;
        let asserted =
            check_credential_status(status, &claims.iss, &self.status, &self.jwt, now)
                .await
                .match_err(ErrorKind::status)?;

        if asserted {
            tracing::info!(
                issuer = %claims.iss,
                purpose = ?status.status_purpose,
                "credential status asserted"
            );
            return Err(BhError::root(ErrorKind::RevocationAsserted))
                .ctx(|| format!("{:?} at {}", status.status_purpose, status.status_list_index));
        }

        Ok(())
    }

    fn verify_mobile_document(
        &self,
        bytes: &[u8],
        request: &PresentationRequest,
        now: SecondsSinceEpoch,
    ) -> Result<Vec<VerifiedCredential>> {
        self.mdoc
            .validate(bytes, &request.session(), now)
            .match_err(ErrorKind::mdoc)?
            .into_iter()
            .map(|result| self.accept_mobile_document(result))
            .collect()
    }

    fn accept_mobile_document(&self, result: ValidationResult) -> Result<VerifiedCredential> {
        if !result.is_valid() {
            let kind = result
                .errors
                .first()
                .map_or(ErrorKind::SignatureInvalid, ErrorKind::mdoc);

            return Err(BhError::root(kind)).ctx(|| {
                format!(
                    "{} failed validation: {:?}",
                    result.doc_type, result.status
                )
            });
        }

        let claims = result.claims.into_json().ok_or_else(|| {
            BhError::root(ErrorKind::MalformedInput).ctx("mdoc claims have no JSON form")
        })?;

        Ok(VerifiedCredential {
            format: CredentialFormat::MobileDocument,
            issuer: None,
            types: vec![result.doc_type.to_string()],
            subject: ClaimValue::subject(&claims, &self.limits)?,
            trust: Trust::from(result.status.chain_trusted),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, time::Duration};

    use bh_did_resolver::{
        test_utils::{StaticKeyResolver, StubClient, StubReply},
        FetchPolicy,
    };
    use bh_jws_utils::{base64_url_encode, json_object, KeyType, SigningKey};
    use bh_sd_jwt::Disclosure;
    use bh_status_list::{
        status_list_credential, HttpStatusListClient, StatusList, BITSTRING_STATUS_LIST_ENTRY_TYPE,
    };
    use bh_vc_jwt::{sign_credential, CredentialStatus, StatusPurpose};
    use bhmdoc::{
        models::{
            data_retrieval::device_retrieval::issuer_auth::ValidityInfo,
            mdl::{MDL_DOCUMENT_TYPE, MDL_NAMESPACE},
            Claims, ElementSelection,
        },
        Device, DeviceKey, Issuer,
    };
    use bhx5chain::{Builder, Validity, X509Trust};

    use super::*;
    use crate::{CredentialIssuer, CredentialRequest, HolderSession};

    const ISSUER: &str = "did:web:issuer.example";
    const HOLDER: &str = "did:web:holder.example";
    const VERIFIER: &str = "https://verifier.example";
    const LIST_URL: &str = "https://issuer.example/status/1";
    const REVOKED_INDEX: usize = 5;

    type TestVerifier = PresentationVerifier<StaticKeyResolver, HttpStatusListClient<StubClient>>;

    fn now() -> SecondsSinceEpoch {
        chrono::Utc::now().timestamp() as SecondsSinceEpoch
    }

    struct Fixture {
        issuer: CredentialIssuer<SigningKey>,
        holder: HolderSession<SigningKey>,
        verifier: TestVerifier,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_trust(X509Trust::new(Vec::new()))
        }

        fn with_trust(trust: X509Trust) -> Self {
            let issuer_key = SigningKey::generate(KeyType::EcP256).unwrap();
            let holder_key = SigningKey::generate(KeyType::EcP256).unwrap();
            let resolver = StaticKeyResolver::new()
                .with_key(ISSUER, issuer_key.public_key().unwrap())
                .with_key(HOLDER, holder_key.public_key().unwrap());

            let mut list = StatusList::new(1_024);
            list.set(REVOKED_INDEX, true).unwrap();
            let list = status_list_credential(
                LIST_URL,
                ISSUER,
                StatusPurpose::Revocation,
                &list,
                "2026-01-01T00:00:00Z",
            )
            .unwrap();
            let list = sign_credential(&list, &issuer_key, ISSUER).unwrap();
            let status = HttpStatusListClient::with_client(
                StubClient::new([StubReply::body("application/vc+jwt", list)]),
                FetchPolicy {
                    timeout: Duration::from_millis(50),
                    retry_backoff: Duration::from_millis(1),
                },
            );

            let mut holder = HolderSession::open(holder_key, HOLDER, format!("{}#key-1", HOLDER));
            holder.unlock("1234", &|pin: &str| pin == "1234").unwrap();

            Self {
                issuer: CredentialIssuer::new(ISSUER, format!("{}#key-1", ISSUER), issuer_key),
                holder,
                verifier: PresentationVerifier::new(
                    JwtVerifier::new(resolver),
                    status,
                    Validator::new(trust),
                )
                .with_issuers(IssuerTrustList::new([ISSUER])),
            }
        }

        async fn issue(&self, request: CredentialRequest) -> String {
            self.issuer.issue(&request, now()).await.unwrap().token
        }

        fn present(&self, credentials: Vec<String>, nonce: &str) -> String {
            self.holder
                .sign_presentation(credentials, nonce, VERIFIER, now())
                .unwrap()
        }

        fn resolutions(&self) -> usize {
            self.verifier.jwt.resolver().resolutions()
        }
    }

    fn request() -> CredentialRequest {
        CredentialRequest {
            holder_did: HOLDER.to_owned(),
            credential_type: "PersonIdentification".to_owned(),
            subject: json_object!({ "given_name": "Ada", "family_name": "Lovelace" }),
            disclosable_keys: Vec::new(),
            credential_status: None,
        }
    }

    fn with_status(index: usize) -> CredentialRequest {
        CredentialRequest {
            credential_status: Some(CredentialStatus {
                id: None,
                status_type: BITSTRING_STATUS_LIST_ENTRY_TYPE.to_owned(),
                status_purpose: StatusPurpose::Revocation,
                status_list_index: index,
                status_list_credential: LIST_URL.to_owned(),
            }),
            ..request()
        }
    }

    fn selective() -> CredentialRequest {
        CredentialRequest {
            disclosable_keys: vec!["given_name".to_owned(), "family_name".to_owned()],
            ..request()
        }
    }

    #[test]
    fn formats_are_sniffed() {
        assert_eq!(
            CredentialFormat::sniff("eyJhbGciOiJFUzI1NiJ9.e30.c2ln").unwrap(),
            CredentialFormat::Jwt
        );
        assert_eq!(
            CredentialFormat::sniff("eyJhbGciOiJFUzI1NiJ9.e30.c2ln~WyJhIl0~").unwrap(),
            CredentialFormat::SdJwt
        );
        assert_eq!(
            CredentialFormat::sniff(&base64_url_encode([0xa3, 0x01])).unwrap(),
            CredentialFormat::MobileDocument
        );

        let cbor_array = base64_url_encode([0x83, 0x01]);
        for garbage in ["", "not base64!", cbor_array.as_str()] {
            let err = CredentialFormat::sniff(garbage).unwrap_err();
            assert_eq!(err.error, ErrorKind::MalformedInput);
        }
    }

    #[test]
    fn session_defaults_to_verifier_nonce() {
        let request = PresentationRequest::new("n", VERIFIER);
        assert_eq!(
            request.session(),
            PresentationSession::new(VERIFIER, VERIFIER, "n", "n")
        );

        let request = request.with_mdoc_generated_nonce("m");
        assert_eq!(
            request.session(),
            PresentationSession::new(VERIFIER, VERIFIER, "n", "m")
        );
    }

    #[tokio::test]
    async fn jwt_and_sd_jwt_credentials_verify() {
        let fixture = Fixture::new();
        let jwt = fixture.issue(with_status(REVOKED_INDEX - 1)).await;
        let sd_jwt = fixture.issue(selective()).await;
        let presentation = fixture.present(vec![jwt, sd_jwt], "nonce");

        let verified = fixture
            .verifier
            .verify(&presentation, &PresentationRequest::new("nonce", VERIFIER), now())
            .await
            .unwrap();

        assert_eq!(verified.holder, HOLDER);
        assert_eq!(verified.trust, Trust::Trusted);
        assert_eq!(verified.credentials.len(), 2);
        assert_eq!(verified.credentials[0].format, CredentialFormat::Jwt);
        assert_eq!(verified.credentials[1].format, CredentialFormat::SdJwt);
        for credential in &verified.credentials {
            assert_eq!(credential.issuer.as_deref(), Some(ISSUER));
            assert_eq!(
                credential.subject.get("given_name").and_then(ClaimValue::as_str),
                Some("Ada")
            );
            assert!(credential.subject.contains_key(crate::OPAQUE_ID_SEED_CLAIM));
        }
    }

    #[tokio::test]
    async fn revoked_credential_is_rejected() {
        let fixture = Fixture::new();
        let jwt = fixture.issue(with_status(REVOKED_INDEX)).await;
        let presentation = fixture.present(vec![jwt], "nonce");

        let err = fixture
            .verifier
            .verify(&presentation, &PresentationRequest::new("nonce", VERIFIER), now())
            .await
            .unwrap_err();
        assert_eq!(err.error, ErrorKind::RevocationAsserted);
    }

    #[tokio::test]
    async fn credential_of_another_holder_is_rejected() {
        let fixture = Fixture::new();
        let stolen = fixture
            .issue(CredentialRequest {
                holder_did: "did:web:victim.example".to_owned(),
                ..request()
            })
            .await;
        let presentation = fixture.present(vec![stolen], "nonce");

        let err = fixture
            .verifier
            .verify(&presentation, &PresentationRequest::new("nonce", VERIFIER), now())
            .await
            .unwrap_err();
        assert_eq!(err.error, ErrorKind::HolderMismatch);
    }

    #[tokio::test]
    async fn presentation_is_bound_to_the_request() {
        let fixture = Fixture::new();
        let presentation = fixture.present(vec![fixture.issue(request()).await], "nonce");

        for request in [
            PresentationRequest::new("other nonce", VERIFIER),
            PresentationRequest::new("nonce", "https://other.example"),
        ] {
            let err = fixture
                .verifier
                .verify(&presentation, &request, now())
                .await
                .unwrap_err();
            assert_eq!(err.error, ErrorKind::BindingMismatch);
        }
    }

    #[tokio::test]
    async fn forged_disclosure_is_a_digest_mismatch() {
        let fixture = Fixture::new();
        let sd_jwt = fixture.issue(selective()).await;
        let forged = Disclosure::new(
            "c2FsdA".to_owned(),
            Some("given_name".to_owned()),
            "Mallory".into(),
        );
        let presentation =
            fixture.present(vec![format!("{}{}~", sd_jwt, forged.as_str())], "nonce");

        let err = fixture
            .verifier
            .verify(&presentation, &PresentationRequest::new("nonce", VERIFIER), now())
            .await
            .unwrap_err();
        assert_eq!(err.error, ErrorKind::DigestMismatch);
    }

    #[tokio::test]
    async fn issuer_trust_is_three_valued() {
        let fixture = Fixture::new();
        let presentation = fixture.present(vec![fixture.issue(request()).await], "nonce");
        let request = PresentationRequest::new("nonce", VERIFIER);

        let verifier = fixture
            .verifier
            .with_issuers(IssuerTrustList::new(["did:web:someone-else.example"]));
        let err = verifier
            .verify(&presentation, &request, now())
            .await
            .unwrap_err();
        assert_eq!(err.error, ErrorKind::Untrusted);

        let verifier = verifier.with_issuers(IssuerTrustList::default());
        let err = verifier
            .verify(&presentation, &request, now())
            .await
            .unwrap_err();
        assert_eq!(err.error, ErrorKind::Untrusted);

        let verifier = verifier.with_trust_policy(TrustPolicy {
            accept_unknown: true,
        });
        let verified = verifier.verify(&presentation, &request, now()).await.unwrap();
        assert_eq!(verified.trust, Trust::Unknown);
    }

    #[tokio::test]
    async fn oversized_presentation_is_rejected_unverified() {
        let fixture = Fixture::new();
        let presentation = "x".repeat(crate::MAX_PRESENTATION_BYTES + 1);

        let err = fixture
            .verifier
            .verify(&presentation, &PresentationRequest::new("nonce", VERIFIER), now())
            .await
            .unwrap_err();
        assert_eq!(
            err.error,
            ErrorKind::SizeLimitExceeded("max_presentation_bytes")
        );
        assert_eq!(fixture.resolutions(), 0);
    }

    #[tokio::test]
    async fn oversized_subject_is_rejected_before_the_issuer_key_is_resolved() {
        let fixture = Fixture::new();
        // given_name, family_name, id and opaque_id_seed
        let jwt = fixture.issue(with_status(REVOKED_INDEX)).await;
        let presentation = fixture.present(vec![jwt], "nonce");
        let verifier = fixture.verifier.with_limits(Limits {
            max_subject_entries: 3,
            ..Default::default()
        });

        let err = verifier
            .verify(&presentation, &PresentationRequest::new("nonce", VERIFIER), now())
            .await
            .unwrap_err();
        assert_eq!(err.error, ErrorKind::SizeLimitExceeded("max_subject_entries"));
        // only the holder's presentation key
        assert_eq!(verifier.jwt.resolver().resolutions(), 1);
    }

    #[tokio::test]
    async fn oversized_disclosed_subject_is_rejected_before_the_status_fetch() {
        let fixture = Fixture::new();
        let revoked = CredentialRequest {
            disclosable_keys: selective().disclosable_keys,
            ..with_status(REVOKED_INDEX)
        };
        let sd_jwt = fixture.issue(revoked).await;
        let presentation = fixture.present(vec![sd_jwt], "nonce");
        let verifier = fixture.verifier.with_limits(Limits {
            max_subject_entries: 3,
            ..Default::default()
        });

        let err = verifier
            .verify(&presentation, &PresentationRequest::new("nonce", VERIFIER), now())
            .await
            .unwrap_err();
        assert_eq!(err.error, ErrorKind::SizeLimitExceeded("max_subject_entries"));
    }

    #[tokio::test]
    async fn batch_over_the_ceiling_is_rejected_before_any_signature_check() {
        let fixture = Fixture::new();
        let presentation = fixture.present(vec![fixture.issue(request()).await], "nonce");
        let batch = vec![
            BatchEntry {
                presentation,
                request: PresentationRequest::new("nonce", VERIFIER),
            };
            crate::MAX_BATCH_PRESENTATIONS + 1
        ];

        let err = fixture
            .verifier
            .verify_batch(&batch, now(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(
            err.error,
            ErrorKind::SizeLimitExceeded("max_batch_presentations")
        );
        assert_eq!(fixture.resolutions(), 0);
    }

    #[tokio::test]
    async fn batch_reports_each_entry() {
        let fixture = Fixture::new();
        let presentation = fixture.present(vec![fixture.issue(request()).await], "nonce");
        let batch = [
            BatchEntry {
                presentation: presentation.clone(),
                request: PresentationRequest::new("nonce", VERIFIER),
            },
            BatchEntry {
                presentation,
                request: PresentationRequest::new("replayed", VERIFIER),
            },
        ];

        let report = fixture
            .verifier
            .verify_batch(&batch, now(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(!report.cancelled);
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.verified(), 1);
        assert_eq!(
            report.results[1].as_ref().unwrap_err().error,
            ErrorKind::BindingMismatch
        );
    }

    #[tokio::test]
    async fn cancelled_batch_is_not_processed() {
        let fixture = Fixture::new();
        let presentation = fixture.present(vec![fixture.issue(request()).await], "nonce");
        let batch = vec![
            BatchEntry {
                presentation,
                request: PresentationRequest::new("nonce", VERIFIER),
            };
            3
        ];
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = fixture
            .verifier
            .verify_batch(&batch, now(), &cancel)
            .await
            .unwrap();

        assert!(report.cancelled);
        assert!(report.results.is_empty());
        assert_eq!(fixture.resolutions(), 0);
    }

    fn mobile_document(
        builder: &Builder,
        request: &PresentationRequest,
        now: SecondsSinceEpoch,
    ) -> String {
        let issuer_key = SigningKey::generate(KeyType::EcP256).unwrap();
        let x5chain = builder
            .generate_x5chain(
                &issuer_key.public_key_pem().unwrap(),
                Validity::days_from_now(-1, 30),
            )
            .unwrap();
        let device_key = SigningKey::generate(KeyType::EcP256).unwrap();

        let claims = Claims(HashMap::from([(
            MDL_NAMESPACE.into(),
            HashMap::from([
                ("given_name".into(), "Ada".into()),
                ("family_name".into(), "Lovelace".into()),
            ]),
        )]));
        let validity = ValidityInfo::new(
            now.try_into().unwrap(),
            now.try_into().unwrap(),
            (now + 86_400).try_into().unwrap(),
            None,
        )
        .unwrap();

        let issued = Issuer
            .issue(
                MDL_DOCUMENT_TYPE.into(),
                claims,
                DeviceKey::from_public_key(&device_key.public_key().unwrap()).unwrap(),
                &issuer_key,
                &x5chain,
                &mut rand::rng(),
                validity,
            )
            .unwrap();
        let device = Device::verify_issued(
            &issued.serialize_issuer_signed().unwrap(),
            MDL_DOCUMENT_TYPE.into(),
            now,
        )
        .unwrap();

        let selection = ElementSelection::new().element(MDL_NAMESPACE, "given_name");

        device
            .present(now, &selection, &request.session(), &device_key)
            .unwrap()
            .to_base64_cbor()
            .unwrap()
    }

    #[tokio::test]
    async fn mobile_document_verifies_within_its_session() {
        let builder =
            Builder::generate_root("Test IACA", Validity::days_from_now(-1, 365)).unwrap();
        let fixture = Fixture::with_trust(builder.trust());
        let request = PresentationRequest::new("nonce", VERIFIER).with_mdoc_generated_nonce("m");
        let presentation =
            fixture.present(vec![mobile_document(&builder, &request, now())], "nonce");

        let verified = fixture
            .verifier
            .verify(&presentation, &request, now())
            .await
            .unwrap();

        let credential = &verified.credentials[0];
        assert_eq!(credential.format, CredentialFormat::MobileDocument);
        assert_eq!(credential.issuer, None);
        assert_eq!(credential.types, vec![MDL_DOCUMENT_TYPE.to_owned()]);
        assert_eq!(credential.trust, Trust::Trusted);
        assert_eq!(
            credential.subject.get(MDL_NAMESPACE).map(ClaimValue::to_json),
            Some(serde_json::json!({ "given_name": "Ada" }))
        );

        let other_session = PresentationRequest::new("nonce", VERIFIER);
        let err = fixture
            .verifier
            .verify(&presentation, &other_session, now())
            .await
            .unwrap_err();
        assert_eq!(err.error, ErrorKind::SignatureInvalid);
    }

    #[tokio::test]
    async fn mobile_document_from_unknown_root_is_untrusted() {
        let builder =
            Builder::generate_root("Test IACA", Validity::days_from_now(-1, 365)).unwrap();
        let fixture = Fixture::new();
        let request = PresentationRequest::new("nonce", VERIFIER);
        let presentation =
            fixture.present(vec![mobile_document(&builder, &request, now())], "nonce");

        let err = fixture
            .verifier
            .verify(&presentation, &request, now())
            .await
            .unwrap_err();
        assert_eq!(err.error, ErrorKind::Untrusted);
    }
}
