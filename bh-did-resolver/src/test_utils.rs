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

//! Scripted collaborators for tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use bh_jws_utils::PublicKey;
use bherror::Error;

use crate::{Did, HttpGetClient, KeyResolver, ResolutionError, Result};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum StubReply {
    /// Respond with status, content type and body after yielding once to
    /// the scheduler.
    Respond(u16, &'static str, String),
    /// Never respond within any reasonable timeout.
    Hang,
}

impl StubReply {
    /// A `200 OK` JSON response with `body`.
    pub fn json(body: impl ToString) -> Self {
        Self::Respond(200, "application/json", body.to_string())
    }

    /// A `200 OK` response with `body` of media type `content_type`.
    pub fn body(content_type: &'static str, body: impl ToString) -> Self {
        Self::Respond(200, content_type, body.to_string())
    }

    /// An empty response with `status`.
    pub fn status(status: u16) -> Self {
        Self::Respond(status, "application/json", String::new())
    }
}

/// [`HttpGetClient`] returning scripted replies in order, repeating the
/// last one, and counting requests.
#[derive(Debug, Default)]
pub struct StubClient {
    replies: Mutex<VecDeque<StubReply>>,
    requests: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl StubClient {
    /// Create a client that answers with `replies`.
    pub fn new(replies: impl IntoIterator<Item = StubReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Default::default()
        }
    }

    /// Number of requests made so far.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// URLs requested so far.
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    fn next_reply(&self) -> StubReply {
        let mut replies = self.replies.lock().unwrap();
        if replies.len() > 1 {
            replies.pop_front().unwrap()
        } else {
            replies.front().cloned().unwrap_or(StubReply::status(404))
        }
    }
}

impl HttpGetClient for StubClient {
    type Err = reqwest::Error;

    async fn get(&self, url: &str) -> reqwest::Result<reqwest::Response> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_owned());
        let reply = self.next_reply();

        tokio::task::yield_now().await;

        match reply {
            StubReply::Respond(status, content_type, body) => {
                let response = http::Response::builder()
                    .status(status)
                    .header("Content-type", content_type)
                    .body(body)
                    .unwrap();
                Ok(reqwest::Response::from(response))
            }
            StubReply::Hang => {
                tokio::time::sleep(Duration::from_secs(3_600)).await;
                unreachable!("the caller times out first")
            }
        }
    }
}

/// [`KeyResolver`] over a fixed set of keys, counting resolutions.
///
/// A DID URL with a fragment resolves to the key registered for the exact
/// URL, or else to the key of its DID.
#[derive(Debug, Default)]
pub struct StaticKeyResolver {
    keys: HashMap<String, PublicKey>,
    resolutions: AtomicUsize,
}

impl StaticKeyResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `public_key` for `did`.
    pub fn with_key(mut self, did: impl Into<String>, public_key: PublicKey) -> Self {
        self.keys.insert(did.into(), public_key);
        self
    }

    /// Number of resolutions requested so far.
    pub fn resolutions(&self) -> usize {
        self.resolutions.load(Ordering::SeqCst)
    }
}

impl KeyResolver for StaticKeyResolver {
    async fn resolve(&self, did: &str) -> Result<PublicKey> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);

        if let Some(public_key) = self.keys.get(did) {
            return Ok(public_key.clone());
        }

        let base = Did::parse(did)?.base();
        self.keys
            .get(&base)
            .cloned()
            .ok_or_else(|| Error::root(ResolutionError::NotFound))
    }
}
