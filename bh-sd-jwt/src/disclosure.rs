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

use bh_jws_utils::{base64_url_decode, base64_url_encode};
use bherror::{
    traits::{ErrorContext as _, ForeignError as _},
    Error as BhError,
};
use serde_json::Value;

use crate::{Error, Result};

/// Base64url encoded disclosure salt.
pub type Salt = String;

/// Base64url encoded digest of a disclosure.
pub type Digest = String;

/// One selectively disclosable claim.
///
/// An object property travels as the JSON array `[salt, name, value]` and an
/// array element as `[salt, value]`, both base64url encoded. The encoded
/// text is kept as received because the digest is computed over it.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Disclosure {
    salt: Salt,
    claim_name: Option<String>,
    value: Value,
    encoded: String,
}

impl Disclosure {
    /// Disclose `value` as the property `claim_name`, or as an array element
    /// when no name is given.
    pub fn new(salt: Salt, claim_name: Option<String>, value: Value) -> Self {
        let mut parts = vec![Value::from(salt.as_str())];
        parts.extend(claim_name.as_deref().map(Value::from));
        parts.push(value.clone());
        // `, ` separated like the examples of the SD-JWT draft
        let json = parts
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            salt,
            claim_name,
            value,
            encoded: base64_url_encode(format!("[{}]", json)),
        }
    }

    /// The disclosed value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The property name; [`None`] for an array element.
    pub fn claim_name(&self) -> Option<&str> {
        self.claim_name.as_deref()
    }

    /// The salt.
    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// The base64url text that is hashed and carried in the token.
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// See [`Disclosure::as_str`].
    pub fn into_string(self) -> String {
        self.encoded
    }
}

impl TryFrom<String> for Disclosure {
    type Error = BhError<Error>;

    fn try_from(encoded: String) -> Result<Self> {
        let json = base64_url_decode(&encoded)
            .foreign_err(|| invalid("provided string is not base64url"))
            .ctx(|| encoded.clone())?;
        let parts: Vec<Value> = serde_json::from_slice(&json)
            .foreign_err(|| invalid("decoded disclosure is not a JSON array"))
            .ctx(|| encoded.clone())?;

        let (salt, claim_name, value) = match <[Value; 3]>::try_from(parts) {
            Ok([salt, name, value]) => (salt, Some(text(name, "key")?), value),
            Err(parts) => match <[Value; 2]>::try_from(parts) {
                Ok([salt, value]) => (salt, None, value),
                Err(_) => {
                    return Err(BhError::root(invalid(
                        "disclosure array must have two or three elements",
                    )))
                    .ctx(|| encoded.clone())
                }
            },
        };

        Ok(Self {
            salt: text(salt, "salt")?,
            claim_name,
            value,
            encoded,
        })
    }
}

fn invalid(message: &str) -> Error {
    Error::InvalidDisclosure(message.to_owned())
}

fn text(value: Value, what: &str) -> Result<String> {
    match value {
        Value::String(text) => Ok(text),
        _ => Err(BhError::root(invalid(&format!(
            "{} value is not a string",
            what
        )))),
    }
}
