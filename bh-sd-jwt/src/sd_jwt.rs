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

use std::{collections::HashSet, fmt, str::FromStr};

use bh_jws_utils::UnverifiedJws;
use bherror::{traits::PropagateError as _, Error as BhError};
use serde_json::{Map, Value};

use crate::{decode_claims, Disclosure, Error, Result};

/// A JSON object.
pub type JsonObject = Map<String, Value>;

/// Name of the digest array of an object.
pub const SD: &str = "_sd";
/// Name of the top-level claim naming the digest hash algorithm.
pub const SD_ALG: &str = "_sd_alg";
/// Key of the single-entry object standing in for a concealed array element.
pub const ELLIPSIS: &str = "...";

pub(crate) static RESERVED_CLAIM_NAMES: &[&str] = &[SD, SD_ALG, ELLIPSIS];

const SD_JWT_DELIMITER: char = '~';

/// An issuer-signed JWT followed by zero or more disclosures, serialized as
/// `<jwt>~<disclosure 1>~...~<disclosure N>~`.
#[derive(Debug, Clone, PartialEq)]
pub struct SdJwt {
    jwt: String,
    disclosures: Vec<Disclosure>,
}

impl SdJwt {
    /// Assemble an SD-JWT. Nothing is checked.
    pub fn new(jwt: String, disclosures: Vec<Disclosure>) -> Self {
        Self { jwt, disclosures }
    }

    /// The issuer-signed JWT.
    pub fn jwt(&self) -> &str {
        &self.jwt
    }

    /// The disclosures, in token order.
    pub fn disclosures(&self) -> &[Disclosure] {
        &self.disclosures
    }

    /// Split into the JWT and the disclosures.
    pub fn into_parts(self) -> (String, Vec<Disclosure>) {
        (self.jwt, self.disclosures)
    }

    /// Keep only the disclosures at `indexes`, e.g. to build a presentation
    /// that reveals a subset of the claims.
    ///
    /// The selected disclosures keep their token order and an index listed
    /// twice is taken once.
    pub fn select(&self, indexes: &[usize]) -> Result<SdJwt> {
        if let Some(&index) = indexes.iter().find(|&&i| i >= self.disclosures.len()) {
            return Err(BhError::root(Error::DisclosureIndexOutOfRange(
                index,
                self.disclosures.len(),
            )));
        }

        let selected: HashSet<usize> = indexes.iter().copied().collect();
        let disclosures = self
            .disclosures
            .iter()
            .enumerate()
            .filter(|(index, _)| selected.contains(index))
            .map(|(_, disclosure)| disclosure.clone())
            .collect();

        Ok(SdJwt::new(self.jwt.clone(), disclosures))
    }
}

impl FromStr for SdJwt {
    type Err = BhError<Error>;

    /// Parse `<jwt>~<disclosure>~...`. The trailing `~` is optional, empty
    /// disclosures are not allowed.
    ///
    /// The JWT is not parsed here.
    fn from_str(value: &str) -> Result<Self> {
        let mut parts = value.split(SD_JWT_DELIMITER);

        let jwt = match parts.next() {
            Some(jwt) if !jwt.is_empty() && value.contains(SD_JWT_DELIMITER) => jwt,
            _ => return Err(BhError::root(Error::InvalidSdJwtFormat)),
        };

        let mut parts: Vec<&str> = parts.collect();
        if parts.last().is_some_and(|last| last.is_empty()) {
            parts.pop();
        }

        let disclosures = parts
            .into_iter()
            .enumerate()
            .map(|(index, part)| {
                if part.is_empty() {
                    return Err(BhError::root(Error::InvalidSdJwtFormat)
                        .ctx(format!("disclosure {} is empty", index)));
                }
                Disclosure::try_from(part.to_owned())
            })
            .collect::<Result<_>>()?;

        Ok(SdJwt::new(jwt.to_owned(), disclosures))
    }
}

impl fmt::Display for SdJwt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.jwt, SD_JWT_DELIMITER)?;
        for disclosure in &self.disclosures {
            write!(f, "{}{}", disclosure.as_str(), SD_JWT_DELIMITER)?;
        }
        Ok(())
    }
}

/// Decode an SD-JWT into its flat claims, revealing only the disclosures at
/// `indexes`.
///
/// Disclosures that are not selected never appear in the output. A selected
/// disclosure whose digest is not committed to by the JWT fails with
/// [`Error::DigestMismatch`].
///
/// The JWT signature is **not** verified here, use
/// [`verify_sd_jwt`](crate::verify_sd_jwt) for credentials received from
/// another party.
pub fn decode_disclosed(token: &str, indexes: &[usize]) -> Result<JsonObject> {
    let presented = token.parse::<SdJwt>()?.select(indexes)?;

    let jws = UnverifiedJws::parse(presented.jwt()).with_err(|| Error::NonParseableJwt)?;

    decode_claims(jws.claims(), presented.disclosures())
}
