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

//! HTTP GET abstraction shared by the DID resolver and status-list fetching.

use std::future::Future;

use bherror::{
    traits::{ErrorContext as _, ForeignError as _},
    Error,
};
use reqwest::{Client, ClientBuilder, StatusCode};

use crate::{FetchPolicy, MAX_FETCH_RETRIES};

/// Interface providing functionality of sending HTTP GET request.
///
/// Implementations may restrict which hosts are reachable; the resolver
/// only ever issues requests for URLs derived from the DID being resolved.
pub trait HttpGetClient: Sync {
    /// Error type used by this trait.
    type Err: std::error::Error + Send + Sync + 'static;

    /// Performs a HTTP GET request with provided `url`.
    fn get(
        &self,
        url: &str,
    ) -> impl Future<Output = std::result::Result<reqwest::Response, Self::Err>> + Send;
}

/// [`HttpGetClient`] implementation using the [`reqwest`] crate.
#[derive(Debug, Clone)]
pub struct ReqwestGetClient(Client);

impl ReqwestGetClient {
    /// Construct [`ReqwestGetClient`] from [`Client`].
    pub fn new(client: Client) -> Self {
        Self(client)
    }

    /// Construct [`ReqwestGetClient`] from [`ClientBuilder`].
    pub fn from_builder(builder: ClientBuilder) -> reqwest::Result<Self> {
        Ok(Self(builder.build()?))
    }
}

impl HttpGetClient for ReqwestGetClient {
    type Err = reqwest::Error;

    fn get(&self, url: &str) -> impl Future<Output = reqwest::Result<reqwest::Response>> + Send {
        self.0.get(url).send()
    }
}

/// Error of a single fetch.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    #[strum(to_string = "Transport failure")]
    Transport,
    /// The attempt did not finish in time.
    #[strum(to_string = "Request timed out")]
    Timeout,
    /// The server responded with `404 Not Found`.
    #[strum(to_string = "Resource not found")]
    NotFound,
    /// The server responded with another unsuccessful status.
    #[strum(to_string = "Unexpected status code {0}")]
    UnexpectedStatus(u16),
    /// The response is not of an accepted media type.
    #[strum(to_string = "Unexpected content type")]
    InvalidContentType,
}

impl bherror::BhError for FetchError {}

impl FetchError {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport | FetchError::Timeout => true,
            FetchError::UnexpectedStatus(status) => *status >= 500,
            FetchError::NotFound | FetchError::InvalidContentType => false,
        }
    }
}

/// Media types a DID document may be served as.
pub const DID_DOCUMENT_MEDIA_TYPES: &[&str] = &[
    "application/json",
    "application/did+json",
    "application/did+ld+json",
];

/// GET `url` and return the body of a successful response whose media type
/// is one of `media_types`.
///
/// Each attempt is bounded by `policy.timeout`. Transient failures are
/// retried once after `policy.retry_backoff`; a missing resource is not.
pub async fn get_with_retry<C: HttpGetClient>(
    client: &C,
    url: &str,
    media_types: &[&str],
    policy: &FetchPolicy,
) -> bherror::Result<Vec<u8>, FetchError> {
    let mut attempt = 0;

    loop {
        let attempt_future = get_once(client, url, media_types);
        let result = match tokio::time::timeout(policy.timeout, attempt_future).await {
            Ok(result) => result,
            Err(_) => Err(Error::root(FetchError::Timeout)),
        };

        match result {
            Err(error) if error.error.is_transient() && attempt < MAX_FETCH_RETRIES => {
                attempt += 1;
                tracing::debug!(url, reason = %error.error, "retrying fetch");
                tokio::time::sleep(policy.retry_backoff).await;
            }
            result => return result.ctx(|| format!("fetching {}", url)),
        }
    }
}

async fn get_once<C: HttpGetClient>(
    client: &C,
    url: &str,
    media_types: &[&str],
) -> bherror::Result<Vec<u8>, FetchError> {
    let response = client
        .get(url)
        .await
        .foreign_err(|| FetchError::Transport)?;

    check_successful_response(&response, media_types)?;

    let body = response
        .bytes()
        .await
        .foreign_err(|| FetchError::Transport)
        .ctx(|| "reading response body")?;

    Ok(body.to_vec())
}

fn check_successful_response(
    response: &reqwest::Response,
    media_types: &[&str],
) -> bherror::Result<(), FetchError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(Error::root(FetchError::NotFound));
    }
    if !status.is_success() {
        return Err(Error::root(FetchError::UnexpectedStatus(status.as_u16())));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .ok_or_else(|| Error::root(FetchError::InvalidContentType))
        .ctx(|| "response content type was empty")?
        .to_str()
        .foreign_err(|| FetchError::InvalidContentType)?;

    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if !media_types.contains(&media_type.as_str()) {
        return Err(Error::root(FetchError::InvalidContentType))
            .ctx(|| format!("response content type was {}", content_type));
    }

    Ok(())
}
