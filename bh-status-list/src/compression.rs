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

use std::io::{Read as _, Write as _};

use bh_jws_utils::{base64_url_decode, base64_url_encode};
use bherror::{
    traits::{ErrorContext as _, ForeignError as _},
    Error as BhError,
};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};

use crate::{Error, Result};

/// Upper bound of an inflated bitstring, 16 MiB or about 134 million entries.
pub const MAX_DECOMPRESSED_BYTES: usize = 16 * 1024 * 1024;

/// Multibase prefix of base64url, optionally present on `encodedList`.
const MULTIBASE_BASE64URL_PREFIX: char = 'u';

/// The base64url encoding of the first bytes of every GZIP stream.
const GZIP_MAGIC_BASE64: &str = "H4sI";

/// Compress `payload` with GZIP at the highest compression level and
/// base64url-encode the result without padding.
pub(crate) fn compress_and_encode(payload: impl AsRef<[u8]>) -> Result<String> {
    let compressed = compress_gzip(payload).foreign_err(|| Error::Compression)?;
    Ok(base64_url_encode(compressed))
}

/// Reverse [`compress_and_encode`].
///
/// Decoding is lenient about the base64 flavour: padding, the standard
/// alphabet and a multibase `u` prefix are all accepted.
pub(crate) fn decode_and_decompress(encoded: &str) -> Result<Vec<u8>> {
    let encoded = encoded.trim();
    let encoded = match encoded.strip_prefix(MULTIBASE_BASE64URL_PREFIX) {
        Some(rest) if rest.starts_with(GZIP_MAGIC_BASE64) => rest,
        _ => encoded,
    };
    let normalized: String = encoded
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            c => c,
        })
        .collect();

    let decoded = base64_url_decode(normalized)
        .foreign_err(|| Error::Decompression)
        .ctx(|| "encoded list is not base64")?;

    decompress_gzip(&decoded)
}

fn compress_gzip(payload: impl AsRef<[u8]>) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(payload.as_ref())?;
    encoder.finish()
}

fn decompress_gzip(payload: &[u8]) -> Result<Vec<u8>> {
    let mut decompressed = Vec::new();
    GzDecoder::new(payload)
        .take(MAX_DECOMPRESSED_BYTES as u64 + 1)
        .read_to_end(&mut decompressed)
        .foreign_err(|| Error::Decompression)
        .ctx(|| "encoded list is not GZIP")?;

    if decompressed.len() > MAX_DECOMPRESSED_BYTES {
        return Err(BhError::root(Error::Decompression)).ctx(|| {
            format!(
                "status list inflates beyond {} bytes",
                MAX_DECOMPRESSED_BYTES
            )
        });
    }

    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let payload = [0xb9u8, 0xa3, 0x00, 0xff];

        let encoded = compress_and_encode(payload).unwrap();
        assert!(encoded.starts_with(GZIP_MAGIC_BASE64));
        assert!(!encoded.contains('='));

        assert_eq!(decode_and_decompress(&encoded).unwrap(), payload);
    }

    #[test]
    fn empty_payload() {
        let encoded = compress_and_encode([0u8; 0]).unwrap();

        assert!(decode_and_decompress(&encoded).unwrap().is_empty());
    }

    #[test]
    fn lenient_base64() {
        let payload = vec![0x5a; 300];
        let encoded = compress_and_encode(&payload).unwrap();

        let multibase = format!("u{}", encoded);
        assert_eq!(decode_and_decompress(&multibase).unwrap(), payload);

        let standard = encoded.replace('-', "+").replace('_', "/");
        let padded = format!("{}{}", standard, "=".repeat((4 - standard.len() % 4) % 4));
        assert_eq!(decode_and_decompress(&padded).unwrap(), payload);
    }

    #[test]
    fn invalid_input_is_rejected() {
        let err = decode_and_decompress("!!!").unwrap_err();
        assert_eq!(err.error, Error::Decompression);

        // base64 of something that is not GZIP
        let err = decode_and_decompress(&base64_url_encode(b"plain bytes")).unwrap_err();
        assert_eq!(err.error, Error::Decompression);
    }

    #[test]
    fn decompression_is_bounded() {
        let bomb = compress_and_encode(vec![0u8; MAX_DECOMPRESSED_BYTES + 1]).unwrap();

        let err = decode_and_decompress(&bomb).unwrap_err();
        assert_eq!(err.error, Error::Decompression);
    }
}
