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

//! This module defines types and functions which implement the section "8.3 Data retrieval" of the
//! [ISO/IEC 18013-5:2021][1] standard.
//!
//! [1]: <https://www.iso.org/standard/69084.html>

pub mod common;
pub mod device_retrieval;

use std::collections::{HashMap, HashSet};

use common::{DataElementIdentifier, DataElementValue, NameSpace};

use crate::utils::json::cbor_to_json;

/// Data elements of a [`Document`][device_retrieval::response::Document], grouped by
/// [`NameSpace`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Claims(pub HashMap<NameSpace, HashMap<DataElementIdentifier, DataElementValue>>);

impl Claims {
    /// Returns the value of the data element `identifier` from `name_space`.
    pub fn get(&self, name_space: &str, identifier: &str) -> Option<&DataElementValue> {
        self.0
            .get(&NameSpace::from(name_space))?
            .get(&DataElementIdentifier::from(identifier))
    }

    /// Total number of data elements over all namespaces.
    pub fn len(&self) -> usize {
        self.0.values().map(HashMap::len).sum()
    }

    /// Returns `true` if there are no data elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds a single data element, creating the namespace if needed.
    pub(crate) fn insert(
        &mut self,
        name_space: NameSpace,
        identifier: DataElementIdentifier,
        value: DataElementValue,
    ) {
        self.0
            .entry(name_space)
            .or_default()
            .insert(identifier, value);
    }

    /// Converts the [`Claims`] into a JSON object keyed by namespace.
    ///
    /// [`None`] is returned when a value has no JSON counterpart, i.e. a CBOR
    /// number that does not fit into a JSON number or a `map` with
    /// non-`string` keys.
    pub fn into_json(self) -> Option<serde_json::Map<String, serde_json::Value>> {
        self.0
            .into_iter()
            .map(|(name_space, elements)| {
                let elements = elements
                    .into_iter()
                    .map(|(id, value)| Some((id.0, cbor_to_json(value.0)?)))
                    .collect::<Option<_>>()?;

                Some((name_space.0, serde_json::Value::Object(elements)))
            })
            .collect()
    }
}

/// The data elements a Device chooses to disclose, grouped by [`NameSpace`].
///
/// Selected elements the credential does not hold are ignored when
/// presenting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementSelection(HashMap<NameSpace, HashSet<DataElementIdentifier>>);

impl ElementSelection {
    /// An empty selection, disclosing nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects every element of `claims`.
    pub fn all(claims: &Claims) -> Self {
        Self(
            claims
                .0
                .iter()
                .map(|(name_space, elements)| {
                    (name_space.clone(), elements.keys().cloned().collect())
                })
                .collect(),
        )
    }

    /// Adds a single element.
    pub fn element(
        mut self,
        name_space: impl Into<NameSpace>,
        identifier: impl Into<DataElementIdentifier>,
    ) -> Self {
        self.0
            .entry(name_space.into())
            .or_default()
            .insert(identifier.into());
        self
    }

    /// Whether the element is selected.
    pub fn contains(&self, name_space: &NameSpace, identifier: &DataElementIdentifier) -> bool {
        self.0
            .get(name_space)
            .is_some_and(|elements| elements.contains(identifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_and_count() {
        let mut claims = Claims::default();
        assert!(claims.is_empty());

        claims.insert("ns".into(), "a".into(), 1u64.into());
        claims.insert("ns".into(), "b".into(), "two".into());
        claims.insert("other".into(), "a".into(), true.into());

        assert_eq!(claims.len(), 3);
        assert_eq!(claims.get("ns", "b"), Some(&"two".into()));
        assert_eq!(claims.get("missing", "a"), None);
    }

    #[test]
    fn byte_keys_are_not_json() {
        let mut claims = Claims::default();
        claims.insert(
            "ns".into(),
            "map".into(),
            ciborium::Value::Map(vec![(ciborium::Value::Bytes(vec![1]), 1u64.into())]).into(),
        );

        assert_eq!(claims.into_json(), None);
    }

    #[test]
    fn selection() {
        let mut claims = Claims::default();
        claims.insert("ns".into(), "a".into(), 1u64.into());
        claims.insert("ns".into(), "b".into(), 2u64.into());

        let all = ElementSelection::all(&claims);
        assert!(all.contains(&"ns".into(), &"a".into()));
        assert!(all.contains(&"ns".into(), &"b".into()));

        let some = ElementSelection::new().element("ns", "b").element("other", "a");
        assert!(!some.contains(&"ns".into(), &"a".into()));
        assert!(some.contains(&"ns".into(), &"b".into()));
        assert!(some.contains(&"other".into(), &"a".into()));
    }
}
