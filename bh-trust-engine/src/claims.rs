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

use std::collections::BTreeMap;

use bherror::{traits::ErrorContext as _, Error as BhError};
use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::{ErrorKind, Limits, Result};

/// A map of claim names to values.
pub type ClaimMap = BTreeMap<String, ClaimValue>;

/// A credential claim value.
///
/// Values are only constructed through [`ClaimValue::subject`], which
/// enforces the entry count, nesting depth and string length ceilings of
/// [`Limits`], so every [`ClaimValue`] in circulation is within bounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ClaimValue {
    /// `null`
    Null,
    /// A boolean.
    Bool(bool),
    /// A number.
    Number(Number),
    /// A string.
    String(String),
    /// An array.
    Array(Vec<ClaimValue>),
    /// A nested map.
    Map(ClaimMap),
}

impl ClaimValue {
    /// Convert a credential subject, rejecting it with
    /// [`ErrorKind::SizeLimitExceeded`] if it exceeds `limits`.
    ///
    /// The subject itself is at depth 1, every nested map or array adds one
    /// level. Map entries and array elements at every level count towards
    /// the entry ceiling.
    pub fn subject(subject: &Map<String, Value>, limits: &Limits) -> Result<ClaimMap> {
        let mut budget = Budget {
            limits,
            entries: 0,
        };

        budget.map(subject, 1)
    }

    /// Nesting depth of the value: 0 for scalars, one more than the deepest
    /// child for maps and arrays.
    pub fn depth(&self) -> usize {
        match self {
            ClaimValue::Array(values) => 1 + values.iter().map(Self::depth).max().unwrap_or(0),
            ClaimValue::Map(map) => 1 + map.values().map(Self::depth).max().unwrap_or(0),
            _ => 0,
        }
    }

    /// The value as JSON.
    pub fn to_json(&self) -> Value {
        match self {
            ClaimValue::Null => Value::Null,
            ClaimValue::Bool(value) => Value::Bool(*value),
            ClaimValue::Number(value) => Value::Number(value.clone()),
            ClaimValue::String(value) => Value::String(value.clone()),
            ClaimValue::Array(values) => Value::Array(values.iter().map(Self::to_json).collect()),
            ClaimValue::Map(map) => Value::Object(map_to_json(map)),
        }
    }

    /// The string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ClaimValue::String(value) => Some(value),
            _ => None,
        }
    }
}

/// A [`ClaimMap`] as a JSON object.
pub fn map_to_json(map: &ClaimMap) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect()
}

struct Budget<'a> {
    limits: &'a Limits,
    entries: usize,
}

impl Budget<'_> {
    fn map(&mut self, map: &Map<String, Value>, depth: usize) -> Result<ClaimMap> {
        self.enter(depth)?;

        map.iter()
            .map(|(key, value)| -> Result<(String, ClaimValue)> {
                self.entry()?;
                self.string(key)?;
                Ok((key.clone(), self.value(value, depth)?))
            })
            .collect()
    }

    fn value(&mut self, value: &Value, depth: usize) -> Result<ClaimValue> {
        Ok(match value {
            Value::Null => ClaimValue::Null,
            Value::Bool(value) => ClaimValue::Bool(*value),
            Value::Number(value) => ClaimValue::Number(value.clone()),
            Value::String(value) => {
                self.string(value)?;
                ClaimValue::String(value.clone())
            }
            Value::Array(values) => {
                self.enter(depth + 1)?;
                let values = values
                    .iter()
                    .map(|value| -> Result<ClaimValue> {
                        self.entry()?;
                        self.value(value, depth + 1)
                    })
                    .collect::<Result<_>>()?;
                ClaimValue::Array(values)
            }
            Value::Object(map) => ClaimValue::Map(self.map(map, depth + 1)?),
        })
    }

    fn enter(&self, depth: usize) -> Result<()> {
        if depth > self.limits.max_subject_depth {
            return Err(BhError::root(ErrorKind::SizeLimitExceeded(
                "max_subject_depth",
            )))
            .ctx(|| format!("depth {}", depth));
        }

        Ok(())
    }

    fn entry(&mut self) -> Result<()> {
        self.entries += 1;
        if self.entries > self.limits.max_subject_entries {
            return Err(BhError::root(ErrorKind::SizeLimitExceeded(
                "max_subject_entries",
            )));
        }

        Ok(())
    }

    fn string(&self, value: &str) -> Result<()> {
        if value.len() > self.limits.max_string_length {
            return Err(BhError::root(ErrorKind::SizeLimitExceeded(
                "max_string_length",
            )))
            .ctx(|| format!("string of {} bytes", value.len()));
        }

        Ok(())
    }
}
