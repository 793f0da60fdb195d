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

//! Resource ceilings enforced before any cryptographic work.

use bherror::{traits::ErrorContext as _, Error as BhError};
use serde::Deserialize;

use crate::{ErrorKind, Result};

/// Maximum number of presentations in one batch.
pub const MAX_BATCH_PRESENTATIONS: usize = 100;

/// Maximum size of a single presentation, in bytes.
pub const MAX_PRESENTATION_BYTES: usize = 256 * 1024;

/// Maximum summed size of the presentations of one batch, in bytes.
pub const MAX_BATCH_TOTAL_BYTES: usize = 4 * 1024 * 1024;

/// Maximum number of entries of a credential subject, counted over every
/// nested map and array.
pub const MAX_SUBJECT_ENTRIES: usize = 256;

/// Maximum nesting depth of a credential subject. The subject map itself is
/// at depth 1.
pub const MAX_SUBJECT_DEPTH: usize = 8;

/// Maximum length of any string in a credential subject, in bytes.
pub const MAX_STRING_LENGTH: usize = 8 * 1024;

/// The ceilings in effect, [`Default`] to the constants of this module.
///
/// Services may embed it in their own configuration; omitted fields keep
/// their default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    /// See [`MAX_BATCH_PRESENTATIONS`].
    pub max_batch_presentations: usize,
    /// See [`MAX_PRESENTATION_BYTES`].
    pub max_presentation_bytes: usize,
    /// See [`MAX_BATCH_TOTAL_BYTES`].
    pub max_batch_total_bytes: usize,
    /// See [`MAX_SUBJECT_ENTRIES`].
    pub max_subject_entries: usize,
    /// See [`MAX_SUBJECT_DEPTH`].
    pub max_subject_depth: usize,
    /// See [`MAX_STRING_LENGTH`].
    pub max_string_length: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_batch_presentations: MAX_BATCH_PRESENTATIONS,
            max_presentation_bytes: MAX_PRESENTATION_BYTES,
            max_batch_total_bytes: MAX_BATCH_TOTAL_BYTES,
            max_subject_entries: MAX_SUBJECT_ENTRIES,
            max_subject_depth: MAX_SUBJECT_DEPTH,
            max_string_length: MAX_STRING_LENGTH,
        }
    }
}

impl Limits {
    /// Reject a single presentation larger than the ceiling.
    pub fn check_presentation(&self, presentation: &str) -> Result<()> {
        if presentation.len() > self.max_presentation_bytes {
            return Err(exceeded("max_presentation_bytes"))
                .ctx(|| format!("presentation of {} bytes", presentation.len()));
        }

        Ok(())
    }

    /// Reject a batch that has too many presentations, one too large, or
    /// too many bytes in total.
    pub fn check_batch<'a>(&self, batch: impl ExactSizeIterator<Item = &'a str>) -> Result<()> {
        if batch.len() > self.max_batch_presentations {
            return Err(exceeded("max_batch_presentations"))
                .ctx(|| format!("batch of {} presentations", batch.len()));
        }

        let mut total = 0usize;
        for presentation in batch {
            self.check_presentation(presentation)?;
            total = total.saturating_add(presentation.len());
        }

        if total > self.max_batch_total_bytes {
            return Err(exceeded("max_batch_total_bytes"))
                .ctx(|| format!("batch of {} bytes", total));
        }

        Ok(())
    }
}

fn exceeded(ceiling: &'static str) -> BhError<ErrorKind> {
    BhError::root(ErrorKind::SizeLimitExceeded(ceiling))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let limits: Limits =
            serde_json::from_str(r#"{ "max_batch_presentations": 10 }"#).unwrap();

        assert_eq!(limits.max_batch_presentations, 10);
        assert_eq!(limits.max_subject_depth, MAX_SUBJECT_DEPTH);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<Limits>(r#"{ "max_batch": 10 }"#).is_err());
    }

    #[test]
    fn batch_ceilings() {
        let limits = Limits {
            max_batch_presentations: 2,
            max_presentation_bytes: 4,
            max_batch_total_bytes: 6,
            ..Default::default()
        };

        assert!(limits.check_batch(["abc", "abc"].into_iter()).is_ok());
        assert_eq!(
            limits
                .check_batch(["a", "b", "c"].into_iter())
                .unwrap_err()
                .error,
            ErrorKind::SizeLimitExceeded("max_batch_presentations")
        );
        assert_eq!(
            limits.check_batch(["abcde"].into_iter()).unwrap_err().error,
            ErrorKind::SizeLimitExceeded("max_presentation_bytes")
        );
        assert_eq!(
            limits
                .check_batch(["abcd", "abcd"].into_iter())
                .unwrap_err()
                .error,
            ErrorKind::SizeLimitExceeded("max_batch_total_bytes")
        );
    }
}
