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

use std::collections::HashSet;

use bherror::Error as BhError;
use rand::{CryptoRng, RngCore};
use serde_json::Value;

use crate::{
    disclosure_digest, Disclosure, Error, Hasher, JsonObject, Result, Sha256,
    RESERVED_CLAIM_NAMES, SD,
};

/// Number of random bytes in a disclosure salt, 128 bits as recommended in
/// [section 11.4] of the draft.
///
/// [section 11.4]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt#name-minimum-length-of-the-salt
const SALT_ENTROPY_BYTES: usize = 16;

/// Claims in which some values are replaced by digests, together with the
/// disclosures revealing them.
#[derive(Debug, Clone, PartialEq)]
pub struct DisclosableClaims {
    /// The claims, with an `_sd` digest array in place of every disclosable
    /// claim.
    pub claims: JsonObject,
    /// One disclosure per disclosable claim, in the order the keys were
    /// given.
    pub disclosures: Vec<Disclosure>,
}

/// Conceal the top-level `disclosable_keys` of `claims` behind `SHA-256`
/// digests.
///
/// Claims not listed stay in plain sight. Each concealed claim gets a fresh
/// random salt.
///
/// # Errors
///
/// Encoding fails if `claims` already uses `_sd`, `_sd_alg` or `...` as a
/// claim name at any depth, if a key is listed twice, or if a key is not
/// present in `claims`.
pub fn encode_disclosable(
    claims: &JsonObject,
    disclosable_keys: &[&str],
) -> Result<DisclosableClaims> {
    encode_disclosable_with(claims, disclosable_keys, Sha256, &mut rand::rng())
}

/// Like [`encode_disclosable`], with an explicit hasher and salt source.
pub fn encode_disclosable_with<H: Hasher, R: CryptoRng + ?Sized>(
    claims: &JsonObject,
    disclosable_keys: &[&str],
    hasher: H,
    rng: &mut R,
) -> Result<DisclosableClaims> {
    if let Some(name) = find_reserved_name(claims) {
        return Err(BhError::root(Error::ReservedClaimName(name)));
    }

    let mut encoded = claims.clone();
    let mut disclosures = Vec::with_capacity(disclosable_keys.len());
    let mut digests = Vec::with_capacity(disclosable_keys.len());
    let mut seen = HashSet::new();

    for &key in disclosable_keys {
        if let Some(name) = reserved_name(key) {
            return Err(BhError::root(Error::ReservedClaimName(name)));
        }
        if !seen.insert(key) {
            return Err(BhError::root(Error::DuplicateDisclosableKey(
                key.to_owned(),
            )));
        }

        let value = encoded
            .remove(key)
            .ok_or_else(|| BhError::root(Error::NonExistentClaim(key.to_owned())))?;

        let disclosure = Disclosure::new(generate_salt(rng), Some(key.to_owned()), value);
        digests.push(disclosure_digest(disclosure.as_str(), &hasher));
        disclosures.push(disclosure);
    }

    if !digests.is_empty() {
        // sorted so that the position of a digest says nothing about its claim
        digests.sort_unstable();
        encoded.insert(
            SD.to_owned(),
            Value::Array(digests.into_iter().map(Value::String).collect()),
        );
    }

    Ok(DisclosableClaims {
        claims: encoded,
        disclosures,
    })
}

/// Generate a salt with [`SALT_ENTROPY_BYTES`] of entropy.
fn generate_salt<R: CryptoRng + ?Sized>(rng: &mut R) -> String {
    let mut salt = [0; SALT_ENTROPY_BYTES];
    rng.fill_bytes(&mut salt);
    bh_jws_utils::base64_url_encode(salt)
}

pub(crate) fn reserved_name(key: &str) -> Option<&'static str> {
    RESERVED_CLAIM_NAMES.iter().find(|&&name| key == name).copied()
}

fn find_reserved_name(object: &JsonObject) -> Option<&'static str> {
    object.iter().find_map(|(key, value)| {
        reserved_name(key).or_else(|| find_reserved_name_in_value(value))
    })
}

fn find_reserved_name_in_value(value: &Value) -> Option<&'static str> {
    match value {
        Value::Object(object) => find_reserved_name(object),
        Value::Array(array) => array.iter().find_map(find_reserved_name_in_value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use bh_jws_utils::json_object;
    use serde_json::json;

    use super::*;

    fn subject() -> JsonObject {
        json_object!({
            "given_name": "Ada",
            "family_name": "Lovelace",
            "birthdate": "1815-12-10",
            "address": { "locality": "London" },
        })
    }

    #[test]
    fn disclosable_claims_are_replaced_by_digests() {
        let encoded = encode_disclosable(&subject(), &["given_name", "address"]).unwrap();

        assert_eq!(encoded.claims.get("family_name"), Some(&json!("Lovelace")));
        assert_eq!(encoded.claims.get("birthdate"), Some(&json!("1815-12-10")));
        assert!(encoded.claims.get("given_name").is_none());
        assert!(encoded.claims.get("address").is_none());

        let sd = encoded.claims[SD].as_array().unwrap();
        assert_eq!(sd.len(), 2);

        assert_eq!(encoded.disclosures.len(), 2);
        assert_eq!(encoded.disclosures[0].claim_name(), Some("given_name"));
        assert_eq!(encoded.disclosures[0].value(), &json!("Ada"));
        assert_eq!(encoded.disclosures[1].claim_name(), Some("address"));

        for disclosure in &encoded.disclosures {
            let digest = disclosure_digest(disclosure.as_str(), Sha256);
            assert!(sd.contains(&Value::String(digest)));
        }
    }

    #[test]
    fn no_disclosable_keys_leaves_claims_untouched() {
        let encoded = encode_disclosable(&subject(), &[]).unwrap();

        assert_eq!(encoded.claims, subject());
        assert!(encoded.disclosures.is_empty());
    }

    #[test]
    fn salts_are_fresh() {
        let first = encode_disclosable(&subject(), &["given_name"]).unwrap();
        let second = encode_disclosable(&subject(), &["given_name"]).unwrap();

        assert_ne!(first.disclosures[0].salt(), second.disclosures[0].salt());
        assert_ne!(first.claims[SD], second.claims[SD]);
        assert_eq!(
            bh_jws_utils::base64_url_decode(first.disclosures[0].salt())
                .unwrap()
                .len(),
            SALT_ENTROPY_BYTES
        );
    }

    #[test]
    fn unknown_and_duplicate_keys_are_rejected() {
        let err = encode_disclosable(&subject(), &["nationality"]).unwrap_err();
        assert_eq!(err.error, Error::NonExistentClaim("nationality".to_owned()));

        let err = encode_disclosable(&subject(), &["given_name", "given_name"]).unwrap_err();
        assert_eq!(
            err.error,
            Error::DuplicateDisclosableKey("given_name".to_owned())
        );
    }

    #[test]
    fn reserved_names_are_rejected() {
        let err = encode_disclosable(&subject(), &["_sd"]).unwrap_err();
        assert_eq!(err.error, Error::ReservedClaimName("_sd"));

        let claims = json_object!({ "nested": [{ "...": "x" }] });
        let err = encode_disclosable(&claims, &[]).unwrap_err();
        assert_matches!(err.error, Error::ReservedClaimName("..."));
    }
}
