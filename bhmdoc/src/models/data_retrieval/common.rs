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

//! Identifiers and values shared by every part of an `mdoc`, see section
//! `8.3.1` of [ISO/IEC 18013-5:2021][1].
//!
//! [1]: <https://www.iso.org/standard/69084.html>

use ciborium::Value;
use serde::{Deserialize, Serialize};

macro_rules! text_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// The identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }
    };
}

text_identifier!(
    /// Type of a document, e.g. `org.iso.18013.5.1.mDL`.
    DocType
);

text_identifier!(
    /// Namespace grouping data elements, e.g. `org.iso.18013.5.1`.
    NameSpace
);

text_identifier!(
    /// Name of a single data element within a [`NameSpace`].
    DataElementIdentifier
);

/// Value of a data element. Any CBOR value is allowed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataElementValue(pub Value);

impl<T: Into<Value>> From<T> for DataElementValue {
    fn from(value: T) -> Self {
        Self(value.into())
    }
}
