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

//! The `mdoc` data model of [ISO/IEC 18013-5:2021][1], limited to what issuing,
//! presenting and validating a single `mso_mdoc` Credential needs, plus the
//! CBOR primitives shared by all of it.
//!
//! [1]: <https://www.iso.org/standard/69084.html>

pub mod data_retrieval;
pub mod issue;
pub mod mdl;

use std::str::FromStr;

use bherror::traits::{ErrorContext as _, ForeignError as _};
use chrono::{Timelike as _, Utc};
use ciborium::value::Value;
pub use data_retrieval::{
    common::{DataElementIdentifier, DataElementValue, DocType, NameSpace},
    device_retrieval::response::{DeviceResponse, Document},
    Claims, ElementSelection,
};
use rand::Rng;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};

use crate::{utils::rand::generate_salt, MdocError};

/// `tdate`, RFC 8949 section 3.4.1.
const TDATE_TAG: u64 = 0;

/// `bstr .cbor`, i.e. a byte string with embedded CBOR.
const ENCODED_CBOR_TAG: u64 = 24;

/// `full-date`, RFC 8943.
const FULL_DATE_TAG: u64 = 1004;

fn encode_cbor<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, String> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes).map_err(|err| err.to_string())?;
    Ok(bytes)
}

fn untag(value: Value, tag: u64, what: &str) -> Result<Value, String> {
    match value {
        Value::Tag(found, inner) if found == tag => Ok(*inner),
        _ => Err(format!("`{what}` MUST be tagged with `{tag}`")),
    }
}

/// A CBOR byte string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Value")]
pub struct Bytes(Vec<u8>);

impl Bytes {
    /// The raw bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Fresh random salt for an issuer-signed item.
    pub fn random_salt<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(generate_salt(rng))
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<Bytes> for Value {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes.0)
    }
}

/// A value transported as `#6.24(bstr .cbor T)`.
///
/// Digests and signatures cover the embedded bytes, so a parsed value keeps
/// the encoding it arrived in and serializes back to exactly that.
#[derive(Clone, Debug, PartialEq)]
pub struct BytesCbor<T> {
    pub(crate) inner: T,
    pub(crate) encoded: Option<Vec<u8>>,
}

impl<T> BytesCbor<T> {
    /// Parse a tagged CBOR [`Value`], remembering its encoding.
    pub fn try_from_cbor(value: &Value) -> Result<Self, String>
    where
        T: DeserializeOwned,
    {
        let Value::Bytes(embedded) = untag(value.clone(), ENCODED_CBOR_TAG, "bstr .cbor")? else {
            return Err("`bstr .cbor` MUST be `Bytes`".to_owned());
        };

        let inner = ciborium::from_reader(embedded.as_slice()).map_err(|err| err.to_string())?;

        Ok(Self {
            inner,
            encoded: Some(encode_cbor(value)?),
        })
    }

    /// The tagged CBOR [`Value`], reusing the received encoding if any.
    pub fn try_into_cbor(&self) -> Result<Value, String>
    where
        T: Serialize,
    {
        match &self.encoded {
            Some(encoded) => {
                ciborium::from_reader(encoded.as_slice()).map_err(|err| err.to_string())
            }
            None => Ok(Value::Tag(
                ENCODED_CBOR_TAG,
                Box::new(Value::Bytes(encode_cbor(&self.inner)?)),
            )),
        }
    }
}

impl<T> From<T> for BytesCbor<T> {
    fn from(inner: T) -> Self {
        Self {
            inner,
            encoded: None,
        }
    }
}

impl<T: Serialize> Serialize for BytesCbor<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.try_into_cbor()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for BytesCbor<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::try_from_cbor(&value).map_err(serde::de::Error::custom)
    }
}

/// A `tdate`: RFC 3339 in UTC (`Z`) with whole seconds, tagged `0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Value", try_from = "Value")]
pub struct DateTime(chrono::DateTime<Utc>);

fn invalid_date_time(context: impl Into<String>) -> bherror::Error<MdocError> {
    bherror::Error::root(MdocError::InvalidDateTime).ctx(context.into())
}

impl DateTime {
    /// Seconds since the Unix epoch.
    pub fn timestamp(&self) -> i64 {
        self.0.timestamp()
    }
}

impl FromStr for DateTime {
    type Err = bherror::Error<MdocError>;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parsed = chrono::DateTime::parse_from_rfc3339(value)
            .foreign_err(|| MdocError::InvalidDateTime)
            .ctx(|| format!("`{value}` is not RFC 3339"))?;

        if parsed.offset().local_minus_utc() != 0 {
            return Err(invalid_date_time("offset must be `Z`"));
        }

        Self::try_from(parsed.with_timezone(&Utc))
    }
}

impl TryFrom<u64> for DateTime {
    type Error = bherror::Error<MdocError>;

    fn try_from(seconds: u64) -> Result<Self, Self::Error> {
        i64::try_from(seconds)
            .ok()
            .and_then(|seconds| chrono::DateTime::from_timestamp(seconds, 0))
            .ok_or_else(|| invalid_date_time(format!("{seconds} seconds out of range")))
            .and_then(Self::try_from)
    }
}

impl TryFrom<chrono::DateTime<Utc>> for DateTime {
    type Error = bherror::Error<MdocError>;

    fn try_from(value: chrono::DateTime<Utc>) -> Result<Self, Self::Error> {
        if value.nanosecond() != 0 {
            return Err(invalid_date_time("fractions of seconds are not allowed"));
        }

        Ok(Self(value))
    }
}

impl TryFrom<Value> for DateTime {
    type Error = bherror::Error<MdocError>;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match untag(value, TDATE_TAG, "tdate").map_err(invalid_date_time)? {
            Value::Text(text) => text.parse(),
            _ => Err(invalid_date_time("`tdate` MUST be `String`")),
        }
    }
}

impl From<DateTime> for Value {
    fn from(date_time: DateTime) -> Self {
        let text = date_time
            .0
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

        Self::Tag(TDATE_TAG, Box::new(Self::Text(text)))
    }
}

impl From<DateTime> for chrono::DateTime<Utc> {
    fn from(date_time: DateTime) -> Self {
        date_time.0
    }
}

/// A `full-date` (`YYYY-MM-DD`), tagged `1004`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Value", try_from = "Value")]
pub struct FullDate(chrono::NaiveDate);

const FULL_DATE_FORMAT: &str = "%Y-%m-%d";

impl FromStr for FullDate {
    type Err = chrono::ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        chrono::NaiveDate::parse_from_str(value, FULL_DATE_FORMAT).map(Self)
    }
}

impl TryFrom<Value> for FullDate {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match untag(value, FULL_DATE_TAG, "full-date")? {
            Value::Text(text) => text.parse().map_err(|err: chrono::ParseError| err.to_string()),
            _ => Err("`full-date` MUST be `String`".to_owned()),
        }
    }
}

impl From<FullDate> for Value {
    fn from(date: FullDate) -> Self {
        let text = date.0.format(FULL_DATE_FORMAT).to_string();
        Self::Tag(FULL_DATE_TAG, Box::new(Self::Text(text)))
    }
}
