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

use bherror::{
    traits::{ErrorContext as _, ForeignError as _},
    Error, Result,
};
use serde_json::{Map, Value};

use crate::{base64_url_decode, FormatError};

/// A JSON object meant to represent a public JWK.
///
/// Since this is a type alias, no aspects of the schema are enforced; this is
/// left to [`PublicKey::from_jwk`](crate::PublicKey::from_jwk).
pub type JwkPublic = Map<String, Value>;

/// JWK `kty` value for elliptic curve keys.
pub(crate) const KTY_EC: &str = "EC";
/// JWK `kty` value for RSA keys.
pub(crate) const KTY_RSA: &str = "RSA";
/// JWK `kty` value for octet key pairs, see [RFC8037](https://datatracker.ietf.org/doc/html/rfc8037#section-2).
pub(crate) const KTY_OKP: &str = "OKP";

pub(crate) fn get_str_field<'a>(jwk: &'a JwkPublic, field: &str) -> Result<&'a str, FormatError> {
    let error = |message| Error::root(FormatError::JwkParsingFailed(message));

    let value = jwk
        .get(field)
        .ok_or_else(|| error(format!("missing \"{}\" field", field)))?;

    value
        .as_str()
        .ok_or_else(|| error(format!("field \"{}\" is not a string", field)))
}

pub(crate) fn parse_b64_field(jwk: &JwkPublic, field: &str) -> Result<Vec<u8>, FormatError> {
    let encoded = get_str_field(jwk, field)?;

    base64_url_decode(encoded)
        .foreign_err(|| FormatError::JwkParsingFailed(format!("decoding \"{}\" failed", field)))
        .ctx(|| format!("value {0} is not base64url", encoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_object;

    #[test]
    fn missing_and_non_string_fields_fail() {
        let jwk = json_object!({ "kty": "EC", "crv": 7 });

        assert_eq!(get_str_field(&jwk, "kty").unwrap(), "EC");
        assert_eq!(
            get_str_field(&jwk, "x").unwrap_err().error,
            FormatError::JwkParsingFailed("missing \"x\" field".to_string())
        );
        assert_eq!(
            get_str_field(&jwk, "crv").unwrap_err().error,
            FormatError::JwkParsingFailed("field \"crv\" is not a string".to_string())
        );
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let jwk = json_object!({ "x": "not base64!" });

        let err = parse_b64_field(&jwk, "x").unwrap_err();
        assert!(matches!(err.error, FormatError::JwkParsingFailed(_)));
    }
}
