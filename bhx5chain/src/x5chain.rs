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

use std::cmp::Ordering;

use bh_jws_utils::PublicKey;
use bherror::traits::{ErrorContext as _, ForeignError as _, PropagateError as _};
use openssl::{
    asn1::Asn1Time,
    error::ErrorStack,
    stack::Stack,
    x509::{
        store::{X509Store, X509StoreBuilder},
        verify::X509VerifyFlags,
        X509StoreContext, X509,
    },
};

use crate::{Error, Result};

fn invalid(message: &'static str) -> bherror::Error<Error> {
    bherror::Error::root(Error::X5Chain).ctx(message)
}

/// An ordered certificate chain, the `x5chain` of [RFC 9360][1].
///
/// The first certificate holds the end-entity (document signer) key and each
/// following certificate issued the one before it. The order is checked on
/// construction; trust is not, see [`X5Chain::verify_against_trusted_roots`].
///
/// [1]: <https://www.rfc-editor.org/rfc/rfc9360.html#section-2-5.4.1>
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct X5Chain {
    leaf: X509,
    issuers: Vec<X509>,
}

impl X5Chain {
    /// Build a chain from certificates ordered leaf first.
    ///
    /// Fails on an empty list or when a certificate is not signed by the one
    /// that follows it.
    pub fn new(certificates: Vec<X509>) -> Result<Self> {
        ensure_issued_in_order(&certificates)?;

        let mut certificates = certificates.into_iter();
        let Some(leaf) = certificates.next() else {
            return Err(invalid("chain is empty"));
        };

        Ok(Self {
            leaf,
            issuers: certificates.collect(),
        })
    }

    /// Build a chain from DER encoded certificates ordered leaf first.
    pub fn from_raw_bytes(der_certificates: &[Vec<u8>]) -> Result<Self> {
        let mut certificates = Vec::with_capacity(der_certificates.len());
        for (position, der) in der_certificates.iter().enumerate() {
            let certificate = X509::from_der(der)
                .foreign_err(|| Error::X5Chain)
                .ctx(|| format!("certificate {} is not valid DER", position))?;
            certificates.push(certificate);
        }

        Self::new(certificates)
    }

    /// Verify that the chain leads to one of the `trust` anchors.
    ///
    /// The anchor may also be carried inside the chain, but only the copy in
    /// `trust` counts. Nothing verifies against an empty `trust`.
    pub fn verify_against_trusted_roots(&self, trust: &X509Trust) -> Result<()> {
        if trust.is_empty() {
            return Err(invalid("no trusted root certificates are configured"));
        }

        let anchors = trust.to_store()?;
        // used only to build the path from the leaf to an anchor
        let untrusted = untrusted_stack(&self.issuers)?;

        let mut context = X509StoreContext::new().foreign_err(|| Error::X5Chain)?;
        let verified = context
            .init(&anchors, &self.leaf, &untrusted, |context| {
                discard_stale_errors(|| context.verify_cert())
            })
            .foreign_err(|| Error::X5Chain)?;

        if verified {
            return Ok(());
        }

        Err(invalid("chain does not lead to a trusted root").ctx(format!(
            "depth {}: {}",
            context.error_depth(),
            context.error()
        )))
    }

    /// DER encodings of the certificates, leaf first.
    pub fn as_bytes(&self) -> Result<Vec<Vec<u8>>> {
        self.certificates()
            .map(|certificate| certificate.to_der().foreign_err(|| Error::X5Chain))
            .collect()
    }

    /// The public key of the leaf certificate, if its type is supported.
    pub fn leaf_certificate_key(&self) -> Result<PublicKey> {
        let key = self
            .leaf
            .public_key()
            .foreign_err(|| Error::X5Chain)
            .ctx(|| "leaf certificate has no readable public key")?;

        PublicKey::from_pkey(key)
            .with_err(|| Error::X5Chain)
            .ctx(|| "leaf certificate key type is not supported")
    }

    /// Check every certificate's validity window against `now`, in seconds
    /// since the Unix epoch.
    ///
    /// The first certificate outside its window decides the error:
    /// [`Error::NotYetValid`] or [`Error::Expired`].
    pub fn check_validity(&self, now: i64) -> Result<()> {
        let now = Asn1Time::from_unix(now).foreign_err(|| Error::X5Chain)?;
        let compare = |time: &openssl::asn1::Asn1TimeRef| {
            time.compare(&now).foreign_err(|| Error::X5Chain)
        };

        for (depth, certificate) in self.certificates().enumerate() {
            if compare(certificate.not_before())? == Ordering::Greater {
                return Err(bherror::Error::root(Error::NotYetValid))
                    .ctx(|| format!("depth {}", depth));
            }
            if compare(certificate.not_after())? == Ordering::Less {
                return Err(bherror::Error::root(Error::Expired))
                    .ctx(|| format!("depth {}", depth));
            }
        }

        Ok(())
    }

    /// All certificates, leaf first.
    pub fn certificates(&self) -> impl Iterator<Item = &X509> {
        std::iter::once(&self.leaf).chain(&self.issuers)
    }

    /// The end-entity certificate.
    pub fn leaf_certificate(&self) -> &X509 {
        &self.leaf
    }
}

/// Trust anchors an [`X5Chain`] is verified against.
#[derive(Debug, Clone)]
pub struct X509Trust(Vec<X509>);

impl X509Trust {
    /// Trust exactly the given root certificates.
    pub fn new(roots: Vec<X509>) -> Self {
        Self(roots)
    }

    /// Trust every certificate of a PEM bundle.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        X509::stack_from_pem(pem)
            .map(Self)
            .foreign_err(|| Error::X5Chain)
            .ctx(|| "invalid PEM bundle of trusted roots")
    }

    /// Whether no root is trusted.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    // `X509Store` is not `Clone`, so one is built for every verification.
    fn to_store(&self) -> Result<X509Store> {
        let mut store = X509StoreBuilder::new().foreign_err(|| Error::X5Chain)?;
        store
            .set_flags(X509VerifyFlags::X509_STRICT | X509VerifyFlags::CHECK_SS_SIGNATURE)
            .foreign_err(|| Error::X5Chain)?;
        for root in &self.0 {
            store.add_cert(root.clone()).foreign_err(|| Error::X5Chain)?;
        }

        Ok(store.build())
    }
}

fn untrusted_stack(certificates: &[X509]) -> Result<Stack<X509>> {
    let mut stack = Stack::new().foreign_err(|| Error::X5Chain)?;
    for certificate in certificates {
        stack
            .push(certificate.clone())
            .foreign_err(|| Error::X5Chain)?;
    }

    Ok(stack)
}

/// Each certificate must be signed by the key of the next one.
///
/// Path building in OpenSSL reorders the untrusted certificates, so a
/// reversed chain would otherwise pass verification.
fn ensure_issued_in_order(certificates: &[X509]) -> Result<()> {
    if certificates.is_empty() {
        return Err(invalid("chain is empty"));
    }

    for (depth, pair) in certificates.windows(2).enumerate() {
        let [subject, issuer] = pair else {
            continue;
        };
        let signed = discard_stale_errors(|| subject.verify(issuer.public_key()?.as_ref()))
            .foreign_err(|| Error::X5Chain)?;
        if !signed {
            return Err(invalid("invalid chain order")
                .ctx(format!("certificate {} is not issued by the next one", depth)));
        }
    }

    Ok(())
}

/// Run an OpenSSL call and clear the thread's error queue when it succeeds.
///
/// A successful call may still leave entries behind, which would then be
/// reported by an unrelated later call on the same thread.
fn discard_stale_errors<T>(
    call: impl FnOnce() -> std::result::Result<T, ErrorStack>,
) -> std::result::Result<T, ErrorStack> {
    let value = call()?;
    drop(ErrorStack::get());

    Ok(value)
}
