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

//! Conversions between _CBOR_ data elements and JSON.

use bh_jws_utils::base64_url_encode;
use ciborium::Value as Cbor;
use serde_json::{Map, Number, Value as Json};

fn integer_to_json(integer: ciborium::value::Integer) -> Option<Number> {
    let integer = i128::from(integer);

    u64::try_from(integer)
        .map(Number::from)
        .or_else(|_| i64::try_from(integer).map(Number::from))
        .ok()
}

/// Converts a data element to JSON.
///
/// Tags are dropped in favour of the tagged content and byte strings become
/// unpadded `base64url` text. [`None`] is returned for what JSON cannot carry
/// faithfully: map keys that are not text, integers outside the 64-bit range
/// and non-finite floats.
pub fn cbor_to_json(cbor: Cbor) -> Option<Json> {
    let json = match cbor {
        Cbor::Null => Json::Null,
        Cbor::Bool(boolean) => Json::Bool(boolean),
        Cbor::Text(text) => Json::String(text),
        Cbor::Bytes(bytes) => Json::String(base64_url_encode(bytes)),
        Cbor::Integer(integer) => Json::Number(integer_to_json(integer)?),
        Cbor::Float(float) => Json::Number(Number::from_f64(float)?),
        Cbor::Tag(_, content) => return cbor_to_json(*content),
        Cbor::Array(items) => Json::Array(
            items
                .into_iter()
                .map(cbor_to_json)
                .collect::<Option<Vec<_>>>()?,
        ),
        Cbor::Map(entries) => {
            let mut object = Map::with_capacity(entries.len());
            for (key, value) in entries {
                let Cbor::Text(key) = key else {
                    return None;
                };
                object.insert(key, cbor_to_json(value)?);
            }
            Json::Object(object)
        }
        _ => return None,
    };

    Some(json)
}

/// Converts JSON to a data element. Integers stay integers, other numbers
/// become floats.
pub fn json_to_cbor(json: Json) -> Cbor {
    match json {
        Json::Null => Cbor::Null,
        Json::Bool(boolean) => Cbor::Bool(boolean),
        Json::String(text) => Cbor::Text(text),
        Json::Number(number) => match (number.as_u64(), number.as_i64()) {
            (Some(unsigned), _) => Cbor::Integer(unsigned.into()),
            (None, Some(signed)) => Cbor::Integer(signed.into()),
            (None, None) => number.as_f64().map_or(Cbor::Null, Cbor::Float),
        },
        Json::Array(items) => Cbor::Array(items.into_iter().map(json_to_cbor).collect()),
        Json::Object(object) => Cbor::Map(
            object
                .into_iter()
                .map(|(key, value)| (Cbor::Text(key), json_to_cbor(value)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn json_survives_cbor() {
        let json = json!({
            "name": "John",
            "age": 42,
            "delta": -7,
            "height": 1.85,
            "tags": ["a", null, true],
            "nested": { "empty": {} },
        });

        assert_eq!(cbor_to_json(json_to_cbor(json.clone())), Some(json));
    }

    #[test]
    fn tags_and_bytes() {
        let full_date = Cbor::Tag(1004, Box::new(Cbor::Text("2024-01-01".to_owned())));
        assert_eq!(cbor_to_json(full_date), Some(json!("2024-01-01")));

        let portrait = Cbor::Bytes(vec![0xff, 0xd8, 0xff]);
        assert_eq!(cbor_to_json(portrait), Some(json!("_9j_")));
    }

    #[test]
    fn values_json_cannot_carry() {
        let integer_key = Cbor::Map(vec![(Cbor::Integer(1.into()), Cbor::Null)]);
        assert_eq!(cbor_to_json(integer_key), None);

        let huge = Cbor::Integer(ciborium::value::Integer::try_from(-(1i128 << 64)).unwrap());
        assert_eq!(cbor_to_json(Cbor::Array(vec![huge])), None);

        assert_eq!(cbor_to_json(Cbor::Float(f64::NAN)), None);
    }
}
