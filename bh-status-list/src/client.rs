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

//! Module defining the interface for a Status List client.

use std::future::Future;

use bh_did_resolver::{get_with_retry, FetchPolicy, HttpGetClient, ReqwestGetClient};
use bherror::traits::{ErrorContext as _, ForeignError as _, PropagateError as _};

use crate::{Error, Result};

/// Media types a status list credential may be served as.
pub const STATUS_LIST_MEDIA_TYPES: &[&str] = &[
    "application/vc+jwt",
    "application/vc+ld+json+jwt",
    "application/jwt",
    "text/plain",
];

/// Trait that defines the interface for a Status List client.
pub trait StatusListClient: Sync {
    /// Fetch the status list credential published at `url`, as a compact
    /// JWT.
    fn fetch_status_list(&self, url: &str) -> impl Future<Output = Result<String>> + Send;
}

/// [`StatusListClient`] fetching over HTTPS, with a bounded timeout and a
/// single retry.
#[derive(Debug)]
pub struct HttpStatusListClient<C: HttpGetClient = ReqwestGetClient> {
    client: C,
    policy: FetchPolicy,
}

impl HttpStatusListClient {
    /// Create a client on top of [`reqwest`].
    pub fn new(policy: FetchPolicy) -> Result<Self> {
        let client = ReqwestGetClient::from_builder(
            reqwest::Client::builder()
                .https_only(true)
                .timeout(policy.timeout),
        )
        .foreign_err(|| Error::HttpClient)?;

        Ok(Self::with_client(client, policy))
    }
}

impl<C: HttpGetClient> HttpStatusListClient<C> {
    /// Create a client on top of the given HTTP client.
    pub fn with_client(client: C, policy: FetchPolicy) -> Self {
        Self { client, policy }
    }
}

impl<C: HttpGetClient> StatusListClient for HttpStatusListClient<C> {
    async fn fetch_status_list(&self, url: &str) -> Result<String> {
        tracing::debug!(url, "fetching status list");

        let body = get_with_retry(&self.client, url, STATUS_LIST_MEDIA_TYPES, &self.policy)
            .await
            .with_err(|| Error::UnsuccessfulStatusFetch(url.to_owned()))?;

        let token = String::from_utf8(body)
            .foreign_err(|| Error::MalformedStatusListCredential)
            .ctx(|| "status list response is not UTF-8")?;

        Ok(token.trim().to_owned())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bh_did_resolver::test_utils::{StubClient, StubReply};

    use super::*;

    const URL: &str = "https://issuer.example/status/1";

    fn client(replies: impl IntoIterator<Item = StubReply>) -> HttpStatusListClient<StubClient> {
        HttpStatusListClient::with_client(
            StubClient::new(replies),
            FetchPolicy {
                timeout: Duration::from_millis(50),
                retry_backoff: Duration::from_millis(1),
            },
        )
    }

    #[tokio::test]
    async fn fetches_jwt_body() {
        let client = client([StubReply::body("application/vc+jwt", "aaa.bbb.ccc\n")]);

        let token = client.fetch_status_list(URL).await.unwrap();

        assert_eq!(token, "aaa.bbb.ccc");
        assert_eq!(client.client.urls(), vec![URL.to_owned()]);
    }

    #[tokio::test]
    async fn timeout_is_retried_once() {
        let client = client([StubReply::Hang]);

        let err = client.fetch_status_list(URL).await.unwrap_err();

        assert_eq!(err.error, Error::UnsuccessfulStatusFetch(URL.to_owned()));
        assert_eq!(client.client.requests(), 2);
    }

    #[tokio::test]
    async fn json_is_not_a_status_list_token() {
        let client = client([StubReply::json("{}")]);

        let err = client.fetch_status_list(URL).await.unwrap_err();

        assert_eq!(err.error, Error::UnsuccessfulStatusFetch(URL.to_owned()));
        assert_eq!(client.client.requests(), 1);
    }
}
