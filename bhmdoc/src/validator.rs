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

//! Verifier side validation of presented `mso_mdoc` documents.
//!
//! Unlike [`Device::verify_issued`](crate::Device::verify_issued), which fails
//! on the first broken check, the [`Validator`] runs every check and reports
//! each outcome in a [`ValidationStatus`]. Only hard decoding failures and a
//! document type mismatch abort the validation.

use bh_jws_utils::PublicKey;
use bherror::traits::PropagateError as _;
use bhx5chain::{X509Trust, X5Chain};

use crate::{
    models::{
        data_retrieval::device_retrieval::{
            device_auth::PresentationSession, issuer_auth::MobileSecurityObject,
        },
        Claims, DataElementIdentifier, DeviceResponse, DocType, Document, NameSpace,
    },
    MdocError, Result,
};

/// What to do when the Issuer certificate chain cannot be tied to a trusted
/// root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChainPolicy {
    /// Reject the document unless the chain verifies against a configured
    /// root. An empty trust store never verifies.
    #[default]
    RequireTrustedRoot,
    /// Skip the chain check. [`ValidationStatus::chain_trusted`] is reported
    /// as [`None`].
    AllowUntrustedChain,
}

/// The outcome of each check performed on a single document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStatus {
    /// The `IssuerAuth` signature verified with the leaf of the `x5chain`.
    pub issuer_signature: bool,
    /// The `DeviceAuth` signature verified with the `deviceKey` of the MSO.
    pub device_signature: bool,
    /// Every certificate of the `x5chain` is valid at the checked instant.
    pub certificate_validity: bool,
    /// The checked instant lies within `validFrom..=validUntil` of the MSO.
    pub validity_period: bool,
    /// Every presented data element matched its signed digest.
    pub digest_integrity: bool,
    /// Whether the chain leads to a trusted root, [`None`] if not checked.
    pub chain_trusted: Option<bool>,
}

impl ValidationStatus {
    /// Returns `true` if every performed check succeeded.
    pub fn is_valid(&self) -> bool {
        self.issuer_signature
            && self.device_signature
            && self.certificate_validity
            && self.validity_period
            && self.digest_integrity
            && self.chain_trusted != Some(false)
    }
}

/// Result of validating a single [`Document`].
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// The document type signed by the Issuer.
    pub doc_type: DocType,
    /// Data elements whose digest matched, empty if the Issuer signature did
    /// not verify.
    pub claims: Claims,
    /// Outcome of the individual checks.
    pub status: ValidationStatus,
    /// Data elements dropped because of a digest mismatch.
    pub rejected_elements: Vec<(NameSpace, DataElementIdentifier)>,
    /// The reasons of every failed check, in the order they were run.
    pub errors: Vec<MdocError>,
}

impl ValidationResult {
    /// Shorthand for [`ValidationStatus::is_valid`].
    pub fn is_valid(&self) -> bool {
        self.status.is_valid()
    }
}

/// Validates presented `mso_mdoc` documents against a set of trusted Issuer
/// roots.
#[derive(Debug, Clone)]
pub struct Validator {
    trust: X509Trust,
    policy: ChainPolicy,
}

impl Validator {
    /// Creates a [`Validator`] with the default [`ChainPolicy`].
    pub fn new(trust: X509Trust) -> Self {
        Self {
            trust,
            policy: ChainPolicy::default(),
        }
    }

    /// Replaces the [`ChainPolicy`].
    pub fn with_policy(mut self, policy: ChainPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Validates _CBOR_ `bytes` holding either a single [`Document`] or a
    /// [`DeviceResponse`], returning a result per document.
    pub fn validate(
        &self,
        bytes: &[u8],
        session: &PresentationSession,
        current_time: u64,
    ) -> Result<Vec<ValidationResult>> {
        if let Ok(document) = Document::from_cbor(bytes) {
            return Ok(vec![self.validate_document(&document, session, current_time)?]);
        }

        let response = DeviceResponse::from_cbor(bytes)
            .with_err(|| {
                MdocError::MalformedDocument("neither a Document nor a DeviceResponse".to_owned())
            })?;

        self.validate_response(&response, session, current_time)
    }

    /// Validates every document of `response`.
    pub fn validate_response(
        &self,
        response: &DeviceResponse,
        session: &PresentationSession,
        current_time: u64,
    ) -> Result<Vec<ValidationResult>> {
        if response.documents().is_empty() {
            return Err(bherror::Error::root(MdocError::EmptyDeviceResponse));
        }

        response
            .documents()
            .iter()
            .map(|document| self.validate_document(document, session, current_time))
            .collect()
    }

    /// Validates a single `document` presented within `session`.
    ///
    /// The returned error is reserved for documents that cannot be
    /// interpreted at all. Failed checks are reported through the
    /// [`ValidationResult`].
    pub fn validate_document(
        &self,
        document: &Document,
        session: &PresentationSession,
        current_time: u64,
    ) -> Result<ValidationResult> {
        let issuer_auth = &document.issuer_signed.issuer_auth;
        let mso = issuer_auth
            .mso()
            .with_err(|| MdocError::MalformedDocument("invalid MSO".to_owned()))?;
        mso.check_doc_type(document.doc_type())?;

        let doc_type = mso.doc_type().clone();
        let mut checks = Checks::default();

        let x5chain = checks.record(issuer_auth.x5chain());
        let leaf_key = x5chain.as_ref().and_then(|x5chain| {
            checks.record(x5chain.leaf_certificate_key().with_err(|| MdocError::X5Chain))
        });

        let status_certificate = x5chain
            .as_ref()
            .is_some_and(|x5chain| checks.check(check_certificates(x5chain, current_time)));
        let chain_trusted = self.check_chain(x5chain.as_ref(), &mut checks);

        let issuer_signature = leaf_key
            .as_ref()
            .is_some_and(|key| checks.check(issuer_auth.verify_signature(key)));

        let validity_period = checks.check(mso.validity_info().check(current_time));

        let (claims, rejected_elements) = if issuer_signature {
            verified_claims(document, &mso, &mut checks)
        } else {
            (Claims::default(), Vec::new())
        };
        let digest_integrity = issuer_signature && rejected_elements.is_empty();

        let device_signature = checks.check(verify_device_signature(document, &mso, session));

        let status = ValidationStatus {
            issuer_signature,
            device_signature,
            certificate_validity: status_certificate,
            validity_period,
            digest_integrity,
            chain_trusted,
        };

        if status.is_valid() {
            tracing::debug!(%doc_type, "mdoc validated");
        } else {
            tracing::warn!(%doc_type, ?status, "mdoc failed validation");
        }

        Ok(ValidationResult {
            doc_type,
            claims,
            status,
            rejected_elements,
            errors: checks.errors,
        })
    }

    fn check_chain(&self, x5chain: Option<&X5Chain>, checks: &mut Checks) -> Option<bool> {
        match (self.policy, x5chain) {
            (ChainPolicy::AllowUntrustedChain, _) => None,
            (ChainPolicy::RequireTrustedRoot, None) => Some(false),
            (ChainPolicy::RequireTrustedRoot, Some(x5chain)) => Some(
                checks.check(
                    x5chain
                        .verify_against_trusted_roots(&self.trust)
                        .with_err(|| MdocError::UntrustedChain),
                ),
            ),
        }
    }
}

/// Validates a single presented `mso_mdoc`, given as _CBOR_ `bytes` of either
/// a [`Document`] or a [`DeviceResponse`] with exactly one document, against
/// `trust` with the default [`ChainPolicy`].
pub fn validate_mobile_document(
    bytes: &[u8],
    trust: &X509Trust,
    session: &PresentationSession,
    current_time: u64,
) -> Result<ValidationResult> {
    let mut results = Validator::new(trust.clone()).validate(bytes, session, current_time)?;

    if results.len() != 1 {
        return Err(bherror::Error::root(MdocError::MalformedDocument(format!(
            "expected a single document, found {}",
            results.len()
        ))));
    }

    results
        .pop()
        .ok_or_else(|| bherror::Error::root(MdocError::EmptyDeviceResponse))
}

/// Collects the reasons of failed checks.
#[derive(Default)]
struct Checks {
    errors: Vec<MdocError>,
}

impl Checks {
    fn record<T>(&mut self, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::debug!(error = %err, "mdoc check failed");
                self.errors.push(err.error);
                None
            }
        }
    }

    fn check(&mut self, result: Result<()>) -> bool {
        self.record(result).is_some()
    }
}

fn check_certificates(x5chain: &X5Chain, current_time: u64) -> Result<()> {
    let now = i64::try_from(current_time).unwrap_or(i64::MAX);

    let Err(err) = x5chain.check_validity(now) else {
        return Ok(());
    };

    let error = match err.error {
        bhx5chain::Error::Expired => MdocError::CertificateExpired,
        bhx5chain::Error::NotYetValid => MdocError::CertificateNotYetValid,
        _ => MdocError::X5Chain,
    };

    Err(err).with_err(move || error)
}

/// Returns the data elements whose digest matches the MSO, together with the
/// identifiers of those that do not.
fn verified_claims(
    document: &Document,
    mso: &MobileSecurityObject,
    checks: &mut Checks,
) -> (Claims, Vec<(NameSpace, DataElementIdentifier)>) {
    let mut claims = Claims::default();
    let mut rejected = Vec::new();

    let Some(name_spaces) = &document.issuer_signed.name_spaces else {
        return (claims, rejected);
    };

    for (name_space, items) in &name_spaces.0 {
        for item in items {
            if checks.check(mso.check_item(name_space, item)) {
                claims.insert(
                    name_space.clone(),
                    item.element_identifier().clone(),
                    item.element_value().clone(),
                );
            } else {
                rejected.push((name_space.clone(), item.element_identifier().clone()));
            }
        }
    }

    (claims, rejected)
}

fn verify_device_signature(
    document: &Document,
    mso: &MobileSecurityObject,
    session: &PresentationSession,
) -> Result<()> {
    let key: PublicKey = mso.device_key().public_key()?;

    document
        .device_signed
        .verify_signature(session, mso.doc_type(), &key)
}
