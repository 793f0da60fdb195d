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

use std::{
    collections::{HashMap, HashSet},
    str::FromStr as _,
};

use bherror::{traits::ErrorContext as _, Error as BhError};
use serde_json::Value;

use crate::{
    disclosure_digest, encoder::reserved_name, Digest, Disclosure, Error,
    HashingAlgorithm, JsonObject, Result, Sha256, ELLIPSIS, SD, SD_ALG,
};

/// Reconstruct `claims` with the given `disclosures` revealed.
///
/// Digests in `_sd` arrays and `{"...": digest}` array entries are replaced
/// by the claims of the matching disclosures, recursively, so a disclosure
/// may itself carry digests. Digests without a matching disclosure stay
/// hidden, and the `_sd` and top-level `_sd_alg` claims are removed from the
/// output.
///
/// # Errors
///
/// Every disclosure must be committed to by a digest reachable from
/// `claims`; a disclosure that is not fails the whole decoding with
/// [`Error::DigestMismatch`]. Duplicate digests, reserved claim names in the
/// revealed claims and claims revealed twice are also rejected.
pub fn decode_claims(claims: &JsonObject, disclosures: &[Disclosure]) -> Result<JsonObject> {
    let algorithm = hashing_algorithm(claims)?;
    let mut state = DecoderState::new(disclosures, algorithm)?;

    let decoded = decode_object(claims, &mut state, true)?;

    state.finalize()?;

    Ok(decoded)
}

struct DecoderState<'json, 'dis> {
    disclosures_by_digest: HashMap<Digest, &'dis Disclosure>,
    processed_digests: HashSet<&'json str>,
}

impl<'json, 'dis> DecoderState<'json, 'dis> {
    fn new(disclosures: &'dis [Disclosure], algorithm: HashingAlgorithm) -> Result<Self> {
        let hasher = match algorithm {
            HashingAlgorithm::Sha256 => Sha256,
        };

        let mut disclosures_by_digest = HashMap::with_capacity(disclosures.len());
        for disclosure in disclosures {
            let digest = disclosure_digest(disclosure.as_str(), hasher);
            if disclosures_by_digest.insert(digest, disclosure).is_some() {
                return Err(BhError::root(Error::DisclosureDigestCollision));
            }
        }

        Ok(Self {
            disclosures_by_digest,
            processed_digests: HashSet::new(),
        })
    }

    fn finalize(self) -> Result<()> {
        if !self.disclosures_by_digest.is_empty() {
            return Err(BhError::root(Error::DigestMismatch)).ctx(|| {
                format!(
                    "{} disclosure(s) not committed to by the claims",
                    self.disclosures_by_digest.len()
                )
            });
        }

        Ok(())
    }

    /// Find the disclosure committed to by `digest`, marking it as used.
    fn take(&mut self, digest: &'json Value) -> Result<Option<&'dis Disclosure>> {
        let digest = digest
            .as_str()
            .ok_or_else(|| BhError::root(Error::MalformedDigest(digest.to_string())))?;

        if !self.processed_digests.insert(digest) {
            return Err(BhError::root(Error::DuplicateDigest(digest.to_owned())));
        }

        Ok(self.disclosures_by_digest.remove(digest))
    }
}

fn hashing_algorithm(claims: &JsonObject) -> Result<HashingAlgorithm> {
    match claims.get(SD_ALG) {
        None => Ok(HashingAlgorithm::default()),
        Some(Value::String(name)) => HashingAlgorithm::from_str(name),
        Some(other) => Err(BhError::root(Error::UnsupportedHashAlgorithm(
            other.to_string(),
        ))),
    }
}

fn decode_object<'json, 'dis: 'json>(
    object: &'json JsonObject,
    state: &mut DecoderState<'json, 'dis>,
    top_level: bool,
) -> Result<JsonObject> {
    let mut decoded = JsonObject::new();

    if let Some(sd) = object.get(SD) {
        let digests = sd
            .as_array()
            .ok_or_else(|| BhError::root(Error::MalformedDigest(sd.to_string())))?;

        for digest in digests {
            let Some(disclosure) = state.take(digest)? else {
                continue;
            };

            let Some(key) = disclosure.claim_name() else {
                return Err(BhError::root(Error::MismatchedDisclosureFormat));
            };

            insert_decoded(key, disclosure.value(), &mut decoded, state)?;
        }
    }

    for (key, value) in object {
        if key == SD || (top_level && key == SD_ALG) {
            continue;
        }
        insert_decoded(key, value, &mut decoded, state)?;
    }

    Ok(decoded)
}

fn insert_decoded<'json, 'dis: 'json>(
    key: &'json str,
    value: &'json Value,
    object: &mut JsonObject,
    state: &mut DecoderState<'json, 'dis>,
) -> Result<()> {
    if let Some(name) = reserved_name(key) {
        return Err(BhError::root(Error::ReservedClaimName(name)));
    }

    let decoded = decode_value(value, state)?;

    if object.insert(key.to_owned(), decoded).is_some() {
        return Err(BhError::root(Error::DuplicateClaimName(key.to_owned())));
    }

    Ok(())
}

fn decode_array<'json, 'dis: 'json>(
    array: &'json [Value],
    state: &mut DecoderState<'json, 'dis>,
) -> Result<Value> {
    let mut decoded = Vec::with_capacity(array.len());

    for element in array {
        let digest = match element.as_object() {
            Some(object) if object.contains_key(ELLIPSIS) => {
                if object.len() != 1 {
                    return Err(BhError::root(Error::MalformedDigest(element.to_string())));
                }
                &object[ELLIPSIS]
            }
            _ => {
                decoded.push(decode_value(element, state)?);
                continue;
            }
        };

        let Some(disclosure) = state.take(digest)? else {
            continue;
        };

        if disclosure.claim_name().is_some() {
            return Err(BhError::root(Error::MismatchedDisclosureFormat));
        }

        decoded.push(decode_value(disclosure.value(), state)?);
    }

    Ok(Value::Array(decoded))
}

fn decode_value<'json, 'dis: 'json>(
    value: &'json Value,
    state: &mut DecoderState<'json, 'dis>,
) -> Result<Value> {
    match value {
        Value::Object(object) => decode_object(object, state, false).map(Value::Object),
        Value::Array(array) => decode_array(array, state),
        _ => Ok(value.clone()),
    }
}
