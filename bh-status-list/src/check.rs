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
use bh_vc_jwt::{CredentialStatus, JwtVerifier, SecondsSinceEpoch};
use bherror::{
    traits::{ErrorContext as _, PropagateError as _},
    Error as BhError,
};

use crate::{
    Error, Result, StatusListClient, StatusListSubject, BITSTRING_STATUS_LIST_CREDENTIAL_TYPE,
};

/// Whether the status at `index` of the status list credential `token` is
/// asserted.
///
/// The credential is verified first, with every check of
/// [`JwtVerifier::verify_credential`]; a failure is reported as
/// [`Error::Credential`]. Only then is the list decoded and the bit read. An
/// index outside of the list is [`Error::IndexOutOfBounds`].
pub async fn check_status<R: KeyResolver>(
    token: &str,
    index: usize,
    verifier: &JwtVerifier<R>,
    now: SecondsSinceEpoch,
) -> Result<bool> {
    let (_, subject) = verified_list(token, verifier, now).await?;

    subject.status_list()?.is_asserted(index)
}

/// Fetch the list `status` points to and check whether its bit is asserted.
///
/// The list must be issued by `issuer`, the issuer of the credential holding
/// `status`; a list of anyone else is [`Error::MalformedStatusListCredential`].
/// The purpose of the list must equal the purpose of the entry, so a
/// suspension list is never consulted for revocation.
pub async fn check_credential_status<C, R>(
    status: &CredentialStatus,
    issuer: &str,
    client: &C,
    verifier: &JwtVerifier<R>,
    now: SecondsSinceEpoch,
) -> Result<bool>
where
    C: StatusListClient,
    R: KeyResolver,
{
    let token = client
        .fetch_status_list(&status.status_list_credential)
        .await?;
    let (list_issuer, subject) = verified_list(&token, verifier, now)
        .await
        .ctx(|| status.status_list_credential.clone())?;

    if list_issuer != issuer {
        return Err(BhError::root(Error::MalformedStatusListCredential)).ctx(|| {
            format!(
                "{} is issued by {}, not {}",
                status.status_list_credential, list_issuer, issuer
            )
        });
    }
    if subject.status_purpose != status.status_purpose {
        return Err(BhError::root(Error::PurposeMismatch))
            .ctx(|| status.status_list_credential.clone());
    }

    let asserted = subject
        .status_list()?
        .is_asserted(status.status_list_index)?;

    tracing::debug!(
        list = %status.status_list_credential,
        index = status.status_list_index,
        asserted,
        "status checked"
    );

    Ok(asserted)
}

/// The issuer and subject of a verified status list credential.
async fn verified_list<R: KeyResolver>(
    token: &str,
    verifier: &JwtVerifier<R>,
    now: SecondsSinceEpoch,
) -> Result<(String, StatusListSubject)> {
    let claims = verifier
        .verify_credential(token, now)
        .await
        .match_err(|error| Error::Credential(error.clone()))?;

    if !claims
        .vc
        .types
        .iter()
        .any(|t| t == BITSTRING_STATUS_LIST_CREDENTIAL_TYPE)
    {
        return Err(BhError::root(Error::MalformedStatusListCredential))
            .ctx(|| format!("credential types are {:?}", claims.vc.types));
    }

    let subject = StatusListSubject::from_claims(&claims)?;

    Ok((claims.iss, subject))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;
    use bh_did_resolver::{
        test_utils::{StaticKeyResolver, StubClient, StubReply},
        FetchPolicy,
    };
    use bh_jws_utils::{KeyType, SigningKey};
    use bh_vc_jwt::{sign_credential, StatusPurpose, VerifiableCredential};

    use super::*;
    use crate::{
        status_list_credential, HttpStatusListClient, StatusList,
        BITSTRING_STATUS_LIST_ENTRY_TYPE,
    };

    const ISSUER: &str = "did:web:issuer.example";
    const OTHER_ISSUER: &str = "did:web:other.example";
    const LIST_URL: &str = "https://issuer.example/status/1";
    const NOW: SecondsSinceEpoch = 1_780_000_000;

    fn setup() -> (SigningKey, JwtVerifier<StaticKeyResolver>) {
        let key = SigningKey::generate(KeyType::EcP256).unwrap();
        let resolver = StaticKeyResolver::new().with_key(ISSUER, key.public_key().unwrap());
        (key, JwtVerifier::new(resolver))
    }

    fn signed_list(key: &SigningKey, purpose: StatusPurpose, asserted: &[usize]) -> String {
        signed_list_of(ISSUER, key, purpose, asserted)
    }

    fn signed_list_of(
        issuer: &str,
        key: &SigningKey,
        purpose: StatusPurpose,
        asserted: &[usize],
    ) -> String {
        let mut list = StatusList::new(1_024);
        for &index in asserted {
            list.set(index, true).unwrap();
        }

        let claims =
            status_list_credential(LIST_URL, issuer, purpose, &list, "2026-01-01T00:00:00Z")
                .unwrap();
        sign_credential(&claims, key, &format!("{}#key-1", issuer)).unwrap()
    }

    fn entry(purpose: StatusPurpose, index: usize) -> CredentialStatus {
        CredentialStatus {
            id: None,
            status_type: BITSTRING_STATUS_LIST_ENTRY_TYPE.to_owned(),
            status_purpose: purpose,
            status_list_index: index,
            status_list_credential: LIST_URL.to_owned(),
        }
    }

    fn client(token: String) -> HttpStatusListClient<StubClient> {
        HttpStatusListClient::with_client(
            StubClient::new([StubReply::body("application/vc+jwt", token)]),
            FetchPolicy {
                timeout: Duration::from_millis(50),
                retry_backoff: Duration::from_millis(1),
            },
        )
    }

    #[tokio::test]
    async fn reads_bits_of_verified_list() {
        let (key, verifier) = setup();
        let token = signed_list(&key, StatusPurpose::Revocation, &[5, 1_000]);

        assert!(check_status(&token, 5, &verifier, NOW).await.unwrap());
        assert!(!check_status(&token, 4, &verifier, NOW).await.unwrap());
        assert!(check_status(&token, 1_000, &verifier, NOW).await.unwrap());

        let err = check_status(&token, 1_024, &verifier, NOW)
            .await
            .unwrap_err();
        assert_eq!(err.error, Error::IndexOutOfBounds(1_024, 1_024));
    }

    #[tokio::test]
    async fn list_signed_by_someone_else_is_rejected() {
        let (_, verifier) = setup();
        let impostor = SigningKey::generate(KeyType::EcP256).unwrap();
        let token = signed_list(&impostor, StatusPurpose::Revocation, &[]);

        let err = check_status(&token, 0, &verifier, NOW).await.unwrap_err();
        assert_eq!(
            err.error,
            Error::Credential(bh_vc_jwt::Error::InvalidSignature)
        );
    }

    #[tokio::test]
    async fn ordinary_credential_is_not_a_status_list() {
        let (key, verifier) = setup();
        let claims = bh_vc_jwt::VcClaims {
            iss: ISSUER.to_owned(),
            sub: None,
            exp: None,
            nbf: None,
            iat: None,
            jti: None,
            vc: VerifiableCredential::new(
                "PersonIdentification",
                ISSUER,
                Default::default(),
                "2026-01-01T00:00:00Z",
            ),
        };
        let token = sign_credential(&claims, &key, ISSUER).unwrap();

        let err = check_status(&token, 0, &verifier, NOW).await.unwrap_err();
        assert_eq!(err.error, Error::MalformedStatusListCredential);
    }

    #[tokio::test]
    async fn credential_status_is_fetched_and_checked() {
        let (key, verifier) = setup();
        let client = client(signed_list(&key, StatusPurpose::Suspension, &[7]));

        let suspended = check_credential_status(
            &entry(StatusPurpose::Suspension, 7),
            ISSUER,
            &client,
            &verifier,
            NOW,
        )
        .await
        .unwrap();
        assert!(suspended);

        let suspended = check_credential_status(
            &entry(StatusPurpose::Suspension, 8),
            ISSUER,
            &client,
            &verifier,
            NOW,
        )
        .await
        .unwrap();
        assert!(!suspended);
    }

    #[tokio::test]
    async fn list_of_another_issuer_is_rejected() {
        let other_key = SigningKey::generate(KeyType::EcP256).unwrap();
        let resolver =
            StaticKeyResolver::new().with_key(OTHER_ISSUER, other_key.public_key().unwrap());
        let verifier = JwtVerifier::new(resolver);
        let client = client(signed_list_of(
            OTHER_ISSUER,
            &other_key,
            StatusPurpose::Revocation,
            &[],
        ));

        let err = check_credential_status(
            &entry(StatusPurpose::Revocation, 7),
            ISSUER,
            &client,
            &verifier,
            NOW,
        )
        .await
        .unwrap_err();
        assert_eq!(err.error, Error::MalformedStatusListCredential);
    }

    #[tokio::test]
    async fn purpose_must_match() {
        let (key, verifier) = setup();
        let client = client(signed_list(&key, StatusPurpose::Suspension, &[7]));

        let err = check_credential_status(
            &entry(StatusPurpose::Revocation, 7),
            ISSUER,
            &client,
            &verifier,
            NOW,
        )
        .await
        .unwrap_err();
        assert_eq!(err.error, Error::PurposeMismatch);
    }

    #[tokio::test]
    async fn unreachable_list_fails() {
        let (_, verifier) = setup();
        let client = HttpStatusListClient::with_client(
            StubClient::new([StubReply::status(404)]),
            FetchPolicy::default(),
        );

        let err = check_credential_status(
            &entry(StatusPurpose::Revocation, 0),
            ISSUER,
            &client,
            &verifier,
            NOW,
        )
        .await
        .unwrap_err();
        assert_matches!(err.error, Error::UnsuccessfulStatusFetch(_));
    }
}
