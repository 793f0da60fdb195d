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

use bherror::{traits::ForeignError as _, Error as BhError};
use url::{Host, Url};

use crate::{Error, Result};

const WWW_PREFIX: &str = "www.";

/// Normalize `domain` to the host form pseudonyms are derived from.
///
/// The host is lowercased (internationalized names are taken in their
/// punycode form) and a leading `www.` and a trailing dot are stripped, so
/// `WWW.Forum.Example.com` and `forum.example.com` are the same verifier
/// while `other.example.com` is not. A URL is accepted as well, in which case
/// only its host is used. IP addresses are returned unchanged.
///
/// # Errors
///
/// [`Error::InvalidDomain`] is returned for an empty host, a label with
/// characters other than letters, digits and inner hyphens, or a host which
/// is itself a public suffix, e.g. `co.uk` or `gov.tw`.
pub fn canonicalize_domain(domain: &str) -> Result<String> {
    Ok(match parse_host(domain)? {
        ParsedHost::Domain { host, .. } | ParsedHost::Ip(host) => host,
    })
}

/// Like [`canonicalize_domain`], additionally reducing the host to its
/// registrable domain (effective TLD plus one label) per the Public Suffix
/// List.
///
/// Every subdomain of a site maps onto the same value, e.g.
/// `forum.example.co.uk` and `shop.example.co.uk` both yield
/// `example.co.uk`.
pub fn registrable_domain(domain: &str) -> Result<String> {
    Ok(match parse_host(domain)? {
        ParsedHost::Domain { registrable, .. } => registrable,
        ParsedHost::Ip(host) => host,
    })
}

enum ParsedHost {
    Domain { host: String, registrable: String },
    Ip(String),
}

fn parse_host(domain: &str) -> Result<ParsedHost> {
    let invalid = || BhError::root(Error::InvalidDomain(domain.to_owned()));

    let domain = domain.trim();
    let url = if domain.contains("://") {
        Url::parse(domain)
    } else {
        Url::parse(&format!("https://{}", domain))
    }
    .foreign_err(|| Error::InvalidDomain(domain.to_owned()))?;

    let host = match url.host() {
        Some(Host::Domain(host)) => host,
        Some(Host::Ipv4(ip)) => return Ok(ParsedHost::Ip(ip.to_string())),
        Some(Host::Ipv6(ip)) => return Ok(ParsedHost::Ip(ip.to_string())),
        None => return Err(invalid()),
    };

    let host = host.strip_suffix('.').unwrap_or(host);
    let host = host.strip_prefix(WWW_PREFIX).unwrap_or(host);

    if !host.split('.').all(is_valid_label) {
        return Err(invalid());
    }
    let registrable =
        psl::domain_str(host).ok_or_else(|| invalid().ctx("host is a public suffix"))?;

    Ok(ParsedHost::Domain {
        host: host.to_owned(),
        registrable: registrable.to_owned(),
    })
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= 63
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn case_and_www_are_normalized() {
        for domain in [
            "forum.example.com",
            "WWW.Forum.Example.com",
            "www.forum.example.com",
            "Forum.Example.COM.",
        ] {
            assert_eq!(canonicalize_domain(domain).unwrap(), "forum.example.com");
        }

        assert_ne!(
            canonicalize_domain("other.example.com").unwrap(),
            canonicalize_domain("forum.example.com").unwrap()
        );
    }

    #[test]
    fn reduced_to_registrable_domain() {
        assert_eq!(
            registrable_domain("a.b.c.example.org").unwrap(),
            "example.org"
        );
        assert_eq!(
            registrable_domain("WWW.Forum.Example.com").unwrap(),
            "example.com"
        );
        assert_eq!(
            registrable_domain("shop.example.co.uk").unwrap(),
            "example.co.uk"
        );
        assert_eq!(registrable_domain("example.co.uk").unwrap(), "example.co.uk");
        assert_eq!(registrable_domain("10.0.0.1").unwrap(), "10.0.0.1");
    }

    #[test]
    fn second_level_registries_are_suffixes() {
        assert_eq!(
            registrable_domain("login.wallet.gov.tw").unwrap(),
            "wallet.gov.tw"
        );
        assert_eq!(
            canonicalize_domain("https://login.wallet.gov.tw/").unwrap(),
            "login.wallet.gov.tw"
        );
        assert_eq!(registrable_domain("a.school.edu.tw").unwrap(), "school.edu.tw");
        assert_ne!(
            registrable_domain("a.example.org.tw").unwrap(),
            registrable_domain("b.other.org.tw").unwrap()
        );

        // private registries: every user site is its own verifier
        assert_eq!(
            registrable_domain("docs.alice.github.io").unwrap(),
            "alice.github.io"
        );
        assert_ne!(
            registrable_domain("alice.github.io").unwrap(),
            registrable_domain("mallory.github.io").unwrap()
        );
    }

    #[test]
    fn urls_use_their_host() {
        assert_eq!(
            canonicalize_domain("https://user@login.Example.com:8443/path?q=1").unwrap(),
            "login.example.com"
        );
        assert_eq!(canonicalize_domain("https://[::1]:443/").unwrap(), "::1");
        assert_eq!(canonicalize_domain("192.168.0.1").unwrap(), "192.168.0.1");
        assert_eq!(
            canonicalize_domain("bücher.example").unwrap(),
            "xn--bcher-kva.example"
        );
    }

    #[test]
    fn invalid_domains_are_rejected() {
        for domain in [
            "",
            "com",
            "co.uk",
            "gov.tw",
            "www.gov.tw",
            "github.io",
            "exa mple.com",
            "-bad.example.com",
            "a..b.com",
        ] {
            let err = canonicalize_domain(domain).unwrap_err();
            assert_matches!(err.error, Error::InvalidDomain(_), "{}", domain);

            let err = registrable_domain(domain).unwrap_err();
            assert_matches!(err.error, Error::InvalidDomain(_), "{}", domain);
        }
    }
}
