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

use bhmdoc::MdocError;

/// The externally visible kinds of failure of the issuance and verification
/// flows.
///
/// Each component error is mapped onto exactly one kind. Only
/// [`ErrorKind::public_message`] is meant to leave the process; the
/// [`Display`](std::fmt::Display) output and the error context are local
/// diagnostics.
#[derive(strum_macros::Display, Debug, PartialEq, Eq, Clone, Copy)]
pub enum ErrorKind {
    /// The input could not be parsed or lacks required fields.
    #[strum(to_string = "Malformed input")]
    MalformedInput,

    /// A signature did not verify.
    #[strum(to_string = "Invalid signature")]
    SignatureInvalid,

    /// A token, credential, document or certificate has expired.
    #[strum(to_string = "Expired")]
    Expired,

    /// A token, credential, document or certificate is not valid yet.
    #[strum(to_string = "Not yet valid")]
    NotYetValid,

    /// The signer's key could not be resolved.
    #[strum(to_string = "Key resolution failed")]
    KeyResolutionFailed,

    /// The credential is revoked or suspended.
    #[strum(to_string = "Credential status asserted")]
    RevocationAsserted,

    /// The status list of a credential could not be obtained.
    #[strum(to_string = "Credential status unavailable")]
    StatusUnavailable,

    /// A resource ceiling was exceeded; names the ceiling.
    #[strum(to_string = "Size limit exceeded: {0}")]
    SizeLimitExceeded(&'static str),

    /// A disclosed claim does not match its signed digest.
    #[strum(to_string = "Digest mismatch")]
    DigestMismatch,

    /// An embedded credential was not issued to the presenting holder.
    #[strum(to_string = "Holder mismatch")]
    HolderMismatch,

    /// The presentation is not bound to the expected nonce or audience.
    #[strum(to_string = "Nonce or audience mismatch")]
    BindingMismatch,

    /// The issuer is not trusted, or its trust is unknown and unknown trust
    /// is not accepted.
    #[strum(to_string = "Untrusted issuer")]
    Untrusted,

    /// The holder session is not unlocked.
    #[strum(to_string = "Session locked")]
    Locked,

    /// The caller cancelled the operation.
    #[strum(to_string = "Cancelled")]
    Cancelled,

    /// An unexpected local failure, e.g. of the random source or signer.
    #[strum(to_string = "Internal error")]
    Internal,
}

impl bherror::BhError for ErrorKind {}

/// Result type alias for the crate.
pub type Result<T> = bherror::Result<T, ErrorKind>;

impl ErrorKind {
    /// The generic message that may be shown to a remote caller.
    pub fn public_message(&self) -> &'static str {
        match self {
            ErrorKind::MalformedInput => "The request is malformed.",
            ErrorKind::SignatureInvalid => "A signature could not be verified.",
            ErrorKind::Expired => "The credential has expired.",
            ErrorKind::NotYetValid => "The credential is not valid yet.",
            ErrorKind::KeyResolutionFailed => "The signing key could not be resolved.",
            ErrorKind::RevocationAsserted => "The credential has been revoked or suspended.",
            ErrorKind::StatusUnavailable => "The credential status could not be checked.",
            ErrorKind::SizeLimitExceeded(_) => "The request is too large.",
            ErrorKind::DigestMismatch => "A disclosed claim failed its integrity check.",
            ErrorKind::HolderMismatch => "A credential was not issued to the presenter.",
            ErrorKind::BindingMismatch => "The presentation is not bound to this request.",
            ErrorKind::Untrusted => "The issuer is not trusted.",
            ErrorKind::Locked => "The session is locked.",
            ErrorKind::Cancelled => "The operation was cancelled.",
            ErrorKind::Internal => "An internal error occurred.",
        }
    }

    /// Classify a JWT credential or presentation failure.
    pub fn credential(error: &bh_vc_jwt::Error) -> Self {
        use bh_vc_jwt::Error;

        match error {
            Error::MalformedToken => ErrorKind::MalformedInput,
            Error::KeyResolution => ErrorKind::KeyResolutionFailed,
            Error::InvalidSignature => ErrorKind::SignatureInvalid,
            Error::JwtExpired(..) | Error::CredentialExpired(_) => ErrorKind::Expired,
            Error::JwtNotYetValid(..) => ErrorKind::NotYetValid,
            Error::NonceMismatch | Error::AudienceMismatch => ErrorKind::BindingMismatch,
            Error::HolderMismatch => ErrorKind::HolderMismatch,
            Error::SigningFailed => ErrorKind::Internal,
        }
    }

    /// Classify an SD-JWT failure.
    pub fn sd_jwt(error: &bh_sd_jwt::Error) -> Self {
        use bh_sd_jwt::Error;

        match error {
            Error::Credential(error) => Self::credential(error),
            Error::DigestMismatch
            | Error::DisclosureDigestCollision
            | Error::DuplicateDigest(_)
            | Error::MismatchedDisclosureFormat => ErrorKind::DigestMismatch,
            Error::SigningFailed => ErrorKind::Internal,
            Error::InvalidSdJwtFormat
            | Error::NonParseableJwt
            | Error::InvalidDisclosure(_)
            | Error::ReservedClaimName(_)
            | Error::NonExistentClaim(_)
            | Error::DuplicateDisclosableKey(_)
            | Error::DisclosureIndexOutOfRange(..)
            | Error::MalformedDigest(_)
            | Error::DuplicateClaimName(_)
            | Error::UnsupportedHashAlgorithm(_) => ErrorKind::MalformedInput,
        }
    }

    /// Classify a status list failure.
    pub fn status(error: &bh_status_list::Error) -> Self {
        use bh_status_list::Error;

        match error {
            Error::Credential(error) => Self::credential(error),
            Error::HttpClient | Error::UnsuccessfulStatusFetch(_) => ErrorKind::StatusUnavailable,
            Error::Compression => ErrorKind::Internal,
            Error::Decompression
            | Error::IndexOutOfBounds(..)
            | Error::MalformedStatusListCredential
            | Error::PurposeMismatch => ErrorKind::MalformedInput,
        }
    }

    /// Classify a mobile document failure.
    pub fn mdoc(error: &MdocError) -> Self {
        match error {
            MdocError::MalformedDocument(_)
            | MdocError::DeviceResponseParse(_)
            | MdocError::EmptyDeviceResponse
            | MdocError::InvalidDocType(..)
            | MdocError::IssuerSignedParse
            | MdocError::MobileSecurityObject
            | MdocError::IssuerAuth
            | MdocError::InvalidDateTime
            | MdocError::InvalidValidityInfo
            | MdocError::JwkToCoseKey(_)
            | MdocError::CoseKeyToJwk(_) => ErrorKind::MalformedInput,
            MdocError::InvalidSignature
            | MdocError::AlgorithmMismatch(..)
            | MdocError::UnsupportedKey(_)
            | MdocError::InvalidPublicKey
            | MdocError::DeviceAuthentication
            | MdocError::DeviceMac => ErrorKind::SignatureInvalid,
            MdocError::DocumentExpired(_) | MdocError::CertificateExpired => ErrorKind::Expired,
            MdocError::DocumentNotYetValid(_) | MdocError::CertificateNotYetValid => {
                ErrorKind::NotYetValid
            }
            MdocError::MissingDigestNamespace(_) | MdocError::MissingOrInvalidDigest(..) => {
                ErrorKind::DigestMismatch
            }
            MdocError::X5Chain | MdocError::UntrustedChain => ErrorKind::Untrusted,
            MdocError::Signing | MdocError::InvalidDeviceSigner(_) => ErrorKind::Internal,
        }
    }

    /// Classify a pseudonym failure.
    pub fn pseudonym(error: &bh_pseudonym::Error) -> Self {
        use bh_pseudonym::Error;

        match error {
            Error::InvalidDomain(_) | Error::InvalidSeed => ErrorKind::MalformedInput,
            Error::RandomSource | Error::Hmac => ErrorKind::Internal,
        }
    }
}
