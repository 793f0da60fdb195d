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

//! Errors of the crate API.

use bh_jws_utils::{KeyType, SigningAlgorithm};

use crate::models::data_retrieval::{
    common::{DocType, NameSpace},
    device_retrieval::response::DigestID,
};

/// Everything that can go wrong while issuing, presenting or validating an
/// `mdoc`.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum MdocError {
    // Decoding.
    /// The bytes are neither a `Document` nor a `DeviceResponse`.
    #[strum(to_string = "Malformed mobile document: {0}")]
    MalformedDocument(String),
    /// A `DeviceResponse` that does not decode.
    #[strum(to_string = "Invalid DeviceResponse: {0}")]
    DeviceResponseParse(String),
    /// A `DeviceResponse` carrying no documents.
    #[strum(to_string = "DeviceResponse without documents")]
    EmptyDeviceResponse,
    /// An issued credential handed to the Device could not be decoded.
    #[strum(to_string = "Invalid issued credential")]
    IssuerSignedParse,
    /// A `tdate` that is not RFC 3339 or out of range.
    #[strum(to_string = "Invalid tdate")]
    InvalidDateTime,
    /// `signed <= validFrom < validUntil` does not hold.
    #[strum(to_string = "Invalid ValidityInfo")]
    InvalidValidityInfo,

    // Issuer authentication.
    /// The MSO could not be built or encoded.
    #[strum(to_string = "Invalid Mobile Security Object")]
    MobileSecurityObject,
    /// The `IssuerAuth` structure or its payload is malformed.
    #[strum(to_string = "Invalid IssuerAuth")]
    IssuerAuth,
    /// The signer failed to produce a signature.
    #[strum(to_string = "Signing failed")]
    Signing,
    /// A signature did not verify.
    #[strum(to_string = "Signature verification failed")]
    InvalidSignature,
    /// The protected `alg` does not fit the curve of the verification key.
    #[strum(to_string = "{0} does not fit a {1} key")]
    AlgorithmMismatch(SigningAlgorithm, KeyType),
    /// Only elliptic curve keys take part in COSE `ECDSA`.
    #[strum(to_string = "Unsupported {0} key")]
    UnsupportedKey(KeyType),
    /// A key that cannot be used to verify signatures.
    #[strum(to_string = "Invalid public key")]
    InvalidPublicKey,
    /// The document type was expected to be the first, but the MSO was
    /// signed for the second.
    #[strum(to_string = "Expected document type {0}, found {1}")]
    InvalidDocType(DocType, DocType),
    /// The MSO `validFrom` lies after the given time.
    #[strum(to_string = "Not valid before {0}")]
    DocumentNotYetValid(i64),
    /// The MSO `validUntil` lies at or before the given time.
    #[strum(to_string = "Expired at {0}")]
    DocumentExpired(i64),
    /// The MSO holds no digests for a presented namespace.
    #[strum(to_string = "No digests for namespace {0}")]
    MissingDigestNamespace(NameSpace),
    /// The digest of an element is absent from the MSO or differs from it.
    #[strum(to_string = "Digest {1} of namespace {0} is missing or does not match")]
    MissingOrInvalidDigest(NameSpace, DigestID),

    // Certificates.
    /// The `x5chain` header is absent or not a certificate chain.
    #[strum(to_string = "Missing or invalid x5chain")]
    X5Chain,
    /// A certificate of the `x5chain` has expired.
    #[strum(to_string = "Issuer certificate expired")]
    CertificateExpired,
    /// A certificate of the `x5chain` is not valid yet.
    #[strum(to_string = "Issuer certificate not yet valid")]
    CertificateNotYetValid,
    /// The `x5chain` does not lead to a trusted IACA root.
    #[strum(to_string = "Issuer certificate chain is not trusted")]
    UntrustedChain,

    // Device authentication.
    /// The `DeviceAuthentication` structure could not be encoded.
    #[strum(to_string = "Unable to build DeviceAuthenticationBytes")]
    DeviceAuthentication,
    /// Only `deviceSignature` is supported.
    #[strum(to_string = "deviceMac is not supported")]
    DeviceMac,
    /// The key signing for the Device is unusable.
    #[strum(to_string = "Invalid Device signer: {0}")]
    InvalidDeviceSigner(String),
    /// A JWK that has no `COSE_Key` form.
    #[strum(to_string = "JWK is not a usable device key: {0}")]
    JwkToCoseKey(String),
    /// A `COSE_Key` that has no JWK form.
    #[strum(to_string = "COSE_Key cannot be expressed as a JWK: {0}")]
    CoseKeyToJwk(String),
}

impl bherror::BhError for MdocError {}

/// Result of the fallible operations of this crate.
pub type Result<T> = bherror::Result<T, MdocError>;
