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

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use openssl::error::ErrorStack;

/// Type alias for a boxed error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Create the signing input for a `JWS`, given its encoded header and claims.
///
/// The input is constructed by concatenating the header and claims by `.`
/// character, i.e. `<header>.<claims>`, as defined [here].
///
/// [here]: https://www.rfc-editor.org/rfc/rfc7515.html#section-5.1
pub fn construct_jws_payload(header: &str, claims: &str) -> String {
    format!("{header}.{claims}")
}

/// Returns the `base64url`-encoded string of the given `input`.
pub fn base64_url_encode<T: AsRef<[u8]>>(input: T) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

/// Decodes the given `payload` as the `base64url`-encoded string **without
/// padding** into bytes.
pub fn base64_url_decode<T: AsRef<[u8]>>(payload: T) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(payload)
}

/// Wrap a closure calling OpenSSL with low-level cleanup to make it safer in an async context.
///
/// Usage: wrap an `openssl` call in a closure and call this function with it.
/// Try to make the closure as small as possible.
pub(crate) fn clean_up_after_openssl<T>(
    f: impl FnOnce() -> Result<T, ErrorStack>,
) -> Result<T, ErrorStack> {
    let return_value = f()?;

    // The call succeeded, so anything left on the error stack is stale.
    drop(ErrorStack::get());

    Ok(return_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_url_has_no_padding() {
        assert_eq!(base64_url_encode([0xfbu8]), "-w");
        assert_eq!(base64_url_decode("-w").unwrap(), vec![0xfb]);
        assert!(base64_url_decode("-w==").is_err());
    }

    #[test]
    fn jws_payload_joins_with_dot() {
        assert_eq!(construct_jws_payload("aGVhZA", "Ym9keQ"), "aGVhZA.Ym9keQ");
    }
}
