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

use std::{fmt, str::FromStr};

use bh_jws_utils::{base64_url_decode, JwkPublic};
use bherror::{
    traits::{ErrorContext as _, ForeignError as _},
    Error,
};

use crate::{ResolutionError, Result};

const DID_SCHEME: &str = "did";
const WELL_KNOWN_DID_PATH: &str = ".well-known";
const DID_DOCUMENT_FILE: &str = "did.json";
const ENCODED_PORT_SEPARATOR: &str = "%3A";

/// DID methods understood by the resolver.
#[derive(strum_macros::Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DidMethod {
    /// [`did:web`](https://w3c-ccg.github.io/did-method-web/), resolved over HTTPS.
    #[strum(to_string = "web")]
    Web,
    /// [`did:jwk`](https://github.com/quartzjer/did-jwk/blob/main/spec.md), the key is embedded
    /// in the identifier itself.
    #[strum(to_string = "jwk")]
    Jwk,
}

impl FromStr for DidMethod {
    type Err = Error<ResolutionError>;

    fn from_str(method: &str) -> Result<Self> {
        match method {
            "web" => Ok(Self::Web),
            "jwk" => Ok(Self::Jwk),
            other => Err(Error::root(ResolutionError::UnsupportedMethod(
                other.to_owned(),
            ))),
        }
    }
}

/// A parsed DID, optionally with a fragment pointing at a verification
/// method (`did:web:example.com#key-1`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Did {
    method: DidMethod,
    method_specific_id: String,
    fragment: Option<String>,
}

impl Did {
    /// Parse a DID or DID URL with a fragment.
    pub fn parse(did: &str) -> Result<Self> {
        let (did, fragment) = match did.split_once('#') {
            Some((did, fragment)) => (did, Some(fragment.to_owned())),
            None => (did, None),
        };

        let mut parts = did.splitn(3, ':');
        let (Some(DID_SCHEME), Some(method), Some(method_specific_id)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::root(ResolutionError::MalformedDid))
                .ctx(|| format!("`{}` is not of the form did:<method>:<id>", did));
        };

        let method = method.parse()?;

        if method_specific_id.is_empty()
            || method_specific_id
                .chars()
                .any(|c| c.is_whitespace() || c == '/' || c == '?')
        {
            return Err(Error::root(ResolutionError::MalformedDid))
                .ctx(|| "invalid method specific identifier");
        }

        Ok(Self {
            method,
            method_specific_id: method_specific_id.to_owned(),
            fragment: fragment.filter(|fragment| !fragment.is_empty()),
        })
    }

    /// The DID method.
    pub fn method(&self) -> DidMethod {
        self.method
    }

    /// The part after `did:<method>:`.
    pub fn method_specific_id(&self) -> &str {
        &self.method_specific_id
    }

    /// The fragment of a DID URL, without `#`.
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// The DID without its fragment.
    pub fn base(&self) -> String {
        format!("{}:{}:{}", DID_SCHEME, self.method, self.method_specific_id)
    }

    /// The HTTPS URL of the DID document of a `did:web` identifier.
    ///
    /// `did:web:example.com` maps to `https://example.com/.well-known/did.json`,
    /// `did:web:example.com%3A8443:users:alice` maps to
    /// `https://example.com:8443/users/alice/did.json`.
    pub fn web_document_url(&self) -> Result<String> {
        if self.method != DidMethod::Web {
            return Err(Error::root(ResolutionError::UnsupportedMethod(
                self.method.to_string(),
            )))
            .ctx(|| "only did:web identifiers have a document URL");
        }

        let mut segments = self.method_specific_id.split(':');
        let host = segments
            .next()
            .map(|host| host.replace(ENCODED_PORT_SEPARATOR, ":"))
            .filter(|host| !host.is_empty())
            .ok_or_else(|| Error::root(ResolutionError::MalformedDid))?;
        let path: Vec<&str> = segments.collect();

        if path.iter().any(|segment| segment.is_empty()) {
            return Err(Error::root(ResolutionError::MalformedDid))
                .ctx(|| "empty path segment");
        }

        let url = if path.is_empty() {
            format!("https://{}/{}/{}", host, WELL_KNOWN_DID_PATH, DID_DOCUMENT_FILE)
        } else {
            format!("https://{}/{}/{}", host, path.join("/"), DID_DOCUMENT_FILE)
        };

        // Reject hosts that do not survive URL parsing, e.g. `user@host`.
        let parsed = reqwest::Url::parse(&url)
            .foreign_err(|| ResolutionError::MalformedDid)
            .ctx(|| format!("{} is not a valid URL", url))?;
        if !parsed.username().is_empty() || parsed.host_str().is_none() {
            return Err(Error::root(ResolutionError::MalformedDid))
                .ctx(|| "did:web host must be a plain domain name");
        }

        Ok(url)
    }

    /// The JWK embedded in a `did:jwk` identifier.
    pub fn embedded_jwk(&self) -> Result<JwkPublic> {
        if self.method != DidMethod::Jwk {
            return Err(Error::root(ResolutionError::UnsupportedMethod(
                self.method.to_string(),
            )))
            .ctx(|| "only did:jwk identifiers embed a key");
        }

        let bytes = base64_url_decode(&self.method_specific_id)
            .foreign_err(|| ResolutionError::MalformedDid)
            .ctx(|| "did:jwk identifier is not base64url")?;

        serde_json::from_slice(&bytes)
            .foreign_err(|| ResolutionError::MalformedDid)
            .ctx(|| "did:jwk identifier is not a JSON object")
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base())?;
        if let Some(fragment) = &self.fragment {
            write!(f, "#{}", fragment)?;
        }
        Ok(())
    }
}
