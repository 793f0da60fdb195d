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

use std::future::Future;

use bh_jws_utils::{JwkPublic, KeyType, PublicKey};
use bherror::{
    traits::{ErrorContext as _, ForeignError as _, PropagateError as _},
    Error,
};
use reqwest::Client;

use crate::{
    get_with_retry, Clock, Did, DidDocument, DidMethod, FetchError, HttpGetClient, KeyCache,
    ReqwestGetClient, ResolutionError, ResolverConfig, Result, SystemClock,
    DID_DOCUMENT_MEDIA_TYPES,
};

const SUPPORTED_CURVES: [KeyType; 3] = [KeyType::EcP256, KeyType::EcP384, KeyType::EcP521];

/// Resolves a DID, or a DID URL naming one of its verification methods, to
/// a public key.
pub trait KeyResolver: Sync {
    /// Resolve `did` to the key it designates.
    fn resolve(&self, did: &str) -> impl Future<Output = Result<PublicKey>> + Send;
}

impl<R: KeyResolver> KeyResolver for &R {
    fn resolve(&self, did: &str) -> impl Future<Output = Result<PublicKey>> + Send {
        (**self).resolve(did)
    }
}

/// Caching resolver for `did:web` and `did:jwk`.
///
/// Only EC keys on P-256, P-384 and P-521 are accepted, anything else fails
/// with [`ResolutionError::UnsupportedKey`]. Resolved keys are cached for
/// [`ResolverConfig::cache_ttl`]; a fetch that times out twice is a hard
/// failure.
#[derive(Debug)]
pub struct DidResolver<C: HttpGetClient = ReqwestGetClient, K: Clock = SystemClock> {
    client: C,
    cache: KeyCache<K>,
    config: ResolverConfig,
}

impl DidResolver {
    /// Create a resolver fetching over HTTPS with [`reqwest`].
    pub fn new(config: ResolverConfig) -> Result<Self> {
        let client = ReqwestGetClient::from_builder(
            Client::builder()
                .https_only(true)
                .timeout(config.fetch.timeout),
        )
        .foreign_err(|| ResolutionError::Fetch)
        .ctx(|| "building the HTTP client")?;

        Ok(Self::with_client(client, SystemClock, config))
    }
}

impl<C: HttpGetClient, K: Clock> DidResolver<C, K> {
    /// Create a resolver on top of the given client and clock.
    pub fn with_client(client: C, clock: K, config: ResolverConfig) -> Self {
        Self {
            client,
            cache: KeyCache::new(config.cache_ttl, clock),
            config,
        }
    }

    /// Drop every cached key.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    /// The underlying key cache.
    pub fn cache(&self) -> &KeyCache<K> {
        &self.cache
    }

    /// Fetch or synthesize the DID document of `did`, bypassing the cache.
    pub async fn resolve_document(&self, did: &Did) -> Result<DidDocument> {
        let document = match did.method() {
            DidMethod::Jwk => DidDocument::from_did_jwk(did, did.embedded_jwk()?),
            DidMethod::Web => {
                let url = did.web_document_url()?;
                let body = get_with_retry(
                    &self.client,
                    &url,
                    DID_DOCUMENT_MEDIA_TYPES,
                    &self.config.fetch,
                )
                .await
                .match_err(|error| match error {
                    FetchError::NotFound => ResolutionError::NotFound,
                    FetchError::Timeout => ResolutionError::Timeout,
                    FetchError::InvalidContentType => ResolutionError::MalformedDocument,
                    FetchError::Transport | FetchError::UnexpectedStatus(_) => {
                        ResolutionError::Fetch
                    }
                })?;

                serde_json::from_slice(&body)
                    .foreign_err(|| ResolutionError::MalformedDocument)
                    .ctx(|| "response is not a DID document")?
            }
        };

        if document.id != did.base() {
            return Err(Error::root(ResolutionError::MalformedDocument))
                .ctx(|| format!("document id {} does not match the DID", document.id));
        }

        Ok(document)
    }

    async fn resolve_uncached(&self, did: &Did) -> Result<PublicKey> {
        let document = self.resolve_document(did).await?;

        let method = document
            .select_verification_method(did.fragment())
            .ok_or_else(|| Error::root(ResolutionError::MalformedDocument))
            .ctx(|| "no matching verification method")?;

        ec_public_key_from_jwk(&method.public_key_jwk)
    }
}

impl<C: HttpGetClient, K: Clock> KeyResolver for DidResolver<C, K> {
    async fn resolve(&self, did: &str) -> Result<PublicKey> {
        if let Some(public_key) = self.cache.get(did).await {
            tracing::debug!(did, "resolved key from cache");
            return Ok(public_key);
        }

        let parsed = Did::parse(did)?;
        let public_key = self
            .resolve_uncached(&parsed)
            .await
            .ctx(|| format!("resolving {}", did))?;

        tracing::debug!(did, key_type = %public_key.key_type(), "resolved key");

        Ok(self.cache.get_or_insert(did, public_key).await)
    }
}

/// Convert a verification method JWK into a key, accepting only EC keys on
/// the supported curves.
pub fn ec_public_key_from_jwk(jwk: &JwkPublic) -> Result<PublicKey> {
    let kty = jwk.get("kty").and_then(|kty| kty.as_str());
    let crv = jwk.get("crv").and_then(|crv| crv.as_str());

    let supported = kty == Some("EC")
        && SUPPORTED_CURVES
            .iter()
            .any(|key_type| key_type.curve_name() == crv);
    if !supported {
        return Err(Error::root(ResolutionError::UnsupportedKey))
            .ctx(|| format!("kty {:?} with crv {:?}", kty, crv));
    }

    let public_key = PublicKey::from_jwk(jwk)
        .with_err(|| ResolutionError::MalformedDocument)
        .ctx(|| "invalid EC public key")?;

    if !public_key.key_type().is_ec() {
        return Err(Error::root(ResolutionError::UnsupportedKey));
    }

    Ok(public_key)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;
    use bh_jws_utils::{base64_url_encode, SigningKey};
    use serde_json::json;

    use super::*;
    use crate::{
        cache::tests::ManualClock,
        test_utils::{StubClient, StubReply},
        FetchPolicy,
    };

    const DID: &str = "did:web:issuer.example";
    const NOW: u64 = 1_750_000_000;

    fn config() -> ResolverConfig {
        ResolverConfig {
            cache_ttl: Duration::from_secs(30 * 60),
            fetch: FetchPolicy {
                timeout: Duration::from_millis(50),
                retry_backoff: Duration::from_millis(1),
            },
        }
    }

    fn jwk_of(key_type: KeyType) -> (PublicKey, JwkPublic) {
        let public_key = SigningKey::generate(key_type)
            .unwrap()
            .public_key()
            .unwrap();
        let jwk = public_key.to_jwk(None).unwrap();
        (public_key, jwk)
    }

    fn document_reply(did: &str, jwk: &JwkPublic) -> StubReply {
        StubReply::json(json!({
            "@context": ["https://www.w3.org/ns/did/v1"],
            "id": did,
            "verificationMethod": [{
                "id": format!("{}#key-1", did),
                "type": "JsonWebKey2020",
                "controller": did,
                "publicKeyJwk": jwk,
            }]
        }))
    }

    fn resolver(
        replies: impl IntoIterator<Item = StubReply>,
    ) -> (DidResolver<StubClient, ManualClock>, ManualClock) {
        let clock = ManualClock::at(NOW);
        let resolver =
            DidResolver::with_client(StubClient::new(replies), clock.clone(), config());
        (resolver, clock)
    }

    #[tokio::test]
    async fn resolves_did_web_and_caches() {
        let (public_key, jwk) = jwk_of(KeyType::EcP256);
        let (resolver, _) = resolver([document_reply(DID, &jwk)]);

        assert_eq!(resolver.resolve(DID).await.unwrap(), public_key);
        assert_eq!(resolver.resolve(DID).await.unwrap(), public_key);

        assert_eq!(resolver.client.requests(), 1);
        assert_eq!(
            resolver.client.urls(),
            vec!["https://issuer.example/.well-known/did.json".to_owned()]
        );
    }

    #[tokio::test]
    async fn expired_entries_are_resolved_again() {
        let (_, jwk) = jwk_of(KeyType::EcP384);
        let (resolver, clock) = resolver([document_reply(DID, &jwk)]);

        resolver.resolve(DID).await.unwrap();
        clock.advance(30 * 60 - 1);
        resolver.resolve(DID).await.unwrap();
        assert_eq!(resolver.client.requests(), 1);

        clock.advance(1);
        resolver.resolve(DID).await.unwrap();
        assert_eq!(resolver.client.requests(), 2);
    }

    #[tokio::test]
    async fn clear_cache_forces_resolution() {
        let (_, jwk) = jwk_of(KeyType::EcP521);
        let (resolver, _) = resolver([document_reply(DID, &jwk)]);

        resolver.resolve(DID).await.unwrap();
        resolver.clear_cache().await;
        resolver.resolve(DID).await.unwrap();

        assert_eq!(resolver.client.requests(), 2);
    }

    #[tokio::test]
    async fn concurrent_resolutions_observe_single_winner() {
        let (first, first_jwk) = jwk_of(KeyType::EcP256);
        let (second, second_jwk) = jwk_of(KeyType::EcP256);
        let (resolver, _) = resolver([
            document_reply(DID, &first_jwk),
            document_reply(DID, &second_jwk),
        ]);

        let (a, b) = tokio::join!(resolver.resolve(DID), resolver.resolve(DID));

        // both fetched, but only one key was stored and handed out
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(resolver.client.requests(), 2);
        assert_eq!(a, b);
        assert!(a == first || a == second);
        assert_eq!(resolver.cache().get(DID).await, Some(a));
    }

    #[tokio::test]
    async fn non_ec_keys_fail_closed() {
        for key_type in [KeyType::Rsa, KeyType::Ed25519] {
            let (_, jwk) = jwk_of(key_type);
            let (resolver, _) = resolver([document_reply(DID, &jwk)]);

            let err = resolver.resolve(DID).await.unwrap_err();
            assert_eq!(err.error, ResolutionError::UnsupportedKey);
            assert!(resolver.cache().is_empty().await);
        }

        let err = ec_public_key_from_jwk(
            &serde_json::from_value(json!({ "kty": "EC", "crv": "secp256k1", "x": "AA", "y": "AA" }))
                .unwrap(),
        )
        .unwrap_err();
        assert_eq!(err.error, ResolutionError::UnsupportedKey);
    }

    #[tokio::test]
    async fn fragment_selects_verification_method() {
        let (public_key, jwk) = jwk_of(KeyType::EcP256);
        let (resolver, _) = resolver([document_reply(DID, &jwk)]);

        let did_url = format!("{}#key-1", DID);
        assert_eq!(resolver.resolve(&did_url).await.unwrap(), public_key);

        let err = resolver
            .resolve(&format!("{}#key-2", DID))
            .await
            .unwrap_err();
        assert_eq!(err.error, ResolutionError::MalformedDocument);
    }

    #[tokio::test]
    async fn resolves_did_jwk_without_io() {
        let (public_key, jwk) = jwk_of(KeyType::EcP384);
        let did = format!("did:jwk:{}", base64_url_encode(serde_json::to_vec(&jwk).unwrap()));
        let (resolver, _) = resolver([]);

        assert_eq!(resolver.resolve(&did).await.unwrap(), public_key);
        assert_eq!(
            resolver.resolve(&format!("{}#0", did)).await.unwrap(),
            public_key
        );
        assert_eq!(resolver.client.requests(), 0);

        let (_, ed_jwk) = jwk_of(KeyType::Ed25519);
        let did = format!(
            "did:jwk:{}",
            base64_url_encode(serde_json::to_vec(&ed_jwk).unwrap())
        );
        let err = resolver.resolve(&did).await.unwrap_err();
        assert_eq!(err.error, ResolutionError::UnsupportedKey);
    }

    #[tokio::test]
    async fn fetch_failures_map_to_resolution_errors() {
        let (resolver, _) = resolver([StubReply::status(404)]);
        let err = resolver.resolve(DID).await.unwrap_err();
        assert_eq!(err.error, ResolutionError::NotFound);
        assert_eq!(resolver.client.requests(), 1);

        let (resolver, _) = self::resolver([StubReply::Hang]);
        let err = resolver.resolve(DID).await.unwrap_err();
        assert_eq!(err.error, ResolutionError::Timeout);
        assert_eq!(resolver.client.requests(), 2);

        let (resolver, _) = self::resolver([StubReply::json("not json")]);
        let err = resolver.resolve(DID).await.unwrap_err();
        assert_eq!(err.error, ResolutionError::MalformedDocument);
    }

    #[tokio::test]
    async fn document_for_another_did_is_rejected() {
        let (_, jwk) = jwk_of(KeyType::EcP256);
        let (resolver, _) = resolver([document_reply("did:web:attacker.example", &jwk)]);

        let err = resolver.resolve(DID).await.unwrap_err();
        assert_eq!(err.error, ResolutionError::MalformedDocument);
    }

    #[tokio::test]
    async fn unsupported_method_does_no_io() {
        let (resolver, _) = resolver([]);

        let err = resolver.resolve("did:key:z6Mkabc").await.unwrap_err();
        assert_matches!(err.error, ResolutionError::UnsupportedMethod(_));
        assert_eq!(resolver.client.requests(), 0);
    }
}
