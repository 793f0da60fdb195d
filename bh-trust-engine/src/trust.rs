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

use std::{collections::HashSet, ops::BitAnd};

use serde::Deserialize;

/// Whether an issuer is trusted.
///
/// [`Trust::Unknown`] means no trust anchors were configured to decide
/// with, which is not the same as being found untrusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trust {
    /// Anchored in a configured trust list.
    Trusted,
    /// Checked against a trust list and not found.
    Untrusted,
    /// Not checked, nothing to check against.
    Unknown,
}

impl Trust {
    /// Combine the trust of two parts of one presentation.
    ///
    /// [`Trust::Untrusted`] dominates, otherwise any [`Trust::Unknown`] makes
    /// the whole unknown.
    pub fn and(self, other: Trust) -> Trust {
        match (self, other) {
            (Trust::Untrusted, _) | (_, Trust::Untrusted) => Trust::Untrusted,
            (Trust::Unknown, _) | (_, Trust::Unknown) => Trust::Unknown,
            (Trust::Trusted, Trust::Trusted) => Trust::Trusted,
        }
    }

    /// Combine the trust of every part; an empty iterator is trusted.
    pub fn all(parts: impl IntoIterator<Item = Trust>) -> Trust {
        parts.into_iter().fold(Trust::Trusted, Trust::and)
    }
}

impl BitAnd for Trust {
    type Output = Trust;

    fn bitand(self, other: Trust) -> Trust {
        self.and(other)
    }
}

impl From<Option<bool>> for Trust {
    fn from(trusted: Option<bool>) -> Self {
        match trusted {
            Some(true) => Trust::Trusted,
            Some(false) => Trust::Untrusted,
            None => Trust::Unknown,
        }
    }
}

/// Which [`Trust`] outcomes a verifier accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TrustPolicy {
    /// Accept presentations whose trust is [`Trust::Unknown`]. Off by default.
    pub accept_unknown: bool,
}

impl TrustPolicy {
    /// Whether `trust` is acceptable under this policy.
    pub fn accepts(&self, trust: Trust) -> bool {
        match trust {
            Trust::Trusted => true,
            Trust::Untrusted => false,
            Trust::Unknown => self.accept_unknown,
        }
    }
}

/// The DIDs of trusted credential issuers.
///
/// An empty list decides nothing: every issuer is then of
/// [`Trust::Unknown`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssuerTrustList(HashSet<String>);

impl IssuerTrustList {
    /// A trust list of `issuers`.
    pub fn new(issuers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(issuers.into_iter().map(Into::into).collect())
    }

    /// The trust of `issuer`.
    pub fn trust(&self, issuer: &str) -> Trust {
        if self.0.is_empty() {
            Trust::Unknown
        } else if self.0.contains(issuer) {
            Trust::Trusted
        } else {
            Trust::Untrusted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untrusted_dominates_unknown() {
        use Trust::*;

        assert_eq!(Trusted & Trusted, Trusted);
        assert_eq!(Trusted & Unknown, Unknown);
        assert_eq!(Unknown & Untrusted, Untrusted);
        assert_eq!(Untrusted & Trusted, Untrusted);
        assert_eq!(Trust::all([]), Trusted);
        assert_eq!(Trust::all([Trusted, Unknown, Trusted]), Unknown);
        assert_eq!(Trust::all([Unknown, Untrusted, Unknown]), Untrusted);
    }

    #[test]
    fn empty_trust_list_is_unknown() {
        assert_eq!(IssuerTrustList::default().trust("did:web:a"), Trust::Unknown);

        let list = IssuerTrustList::new(["did:web:a"]);
        assert_eq!(list.trust("did:web:a"), Trust::Trusted);
        assert_eq!(list.trust("did:web:b"), Trust::Untrusted);
    }

    #[test]
    fn policy_rejects_unknown_by_default() {
        let policy = TrustPolicy::default();
        assert!(policy.accepts(Trust::Trusted));
        assert!(!policy.accepts(Trust::Unknown));
        assert!(!policy.accepts(Trust::Untrusted));

        let lenient = TrustPolicy {
            accept_unknown: true,
        };
        assert!(lenient.accepts(Trust::Unknown));
        assert!(!lenient.accepts(Trust::Untrusted));
        assert_eq!(Trust::from(None), Trust::Unknown);
        assert_eq!(Trust::from(Some(false)), Trust::Untrusted);
    }
}
