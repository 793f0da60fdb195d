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

use std::time::{SystemTime, UNIX_EPOCH};

use bherror::traits::{ErrorContext as _, ForeignError as _};
use openssl::{
    asn1::{Asn1Integer, Asn1Time},
    bn::BigNum,
    ec::{EcGroup, EcKey},
    error::ErrorStack,
    hash::MessageDigest,
    nid::Nid,
    pkey::{PKey, Private, Public},
    x509::{
        extension::{AuthorityKeyIdentifier, BasicConstraints, KeyUsage, SubjectKeyIdentifier},
        X509Builder, X509Extension, X509Name, X509NameBuilder, X509NameRef, X509,
    },
};
use rand::RngCore;

use crate::{Error, Result, X509Trust, X5Chain};

/// Certificates are issued as X.509v3 (the field is zero based).
const X509_V3: i32 = 2;

/// Serial numbers are positive and at most 20 octets long, see
/// [RFC 5280 section 4.1.2.2](https://datatracker.ietf.org/doc/html/rfc5280#section-4.1.2.2).
const SERIAL_BITS: usize = 159;

const SECONDS_PER_DAY: i64 = 86_400;

const LEAF_COMMON_NAME: &str = "Document Signer";

trait OrBuilderError<T> {
    fn or_fail(self, step: &'static str) -> Result<T>;
}

impl<T> OrBuilderError<T> for std::result::Result<T, ErrorStack> {
    fn or_fail(self, step: &'static str) -> Result<T> {
        self.foreign_err(|| Error::Builder).ctx(|| step)
    }
}

/// The `notBefore`/`notAfter` window of a certificate, in seconds since the
/// Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validity {
    /// First valid instant.
    pub not_before: i64,
    /// Last valid instant.
    pub not_after: i64,
}

impl Validity {
    /// A window between two explicit instants.
    pub fn new(not_before: i64, not_after: i64) -> Self {
        Self {
            not_before,
            not_after,
        }
    }

    /// A window that opens `offset_days` from now and stays open for
    /// `duration_days`. Negative offsets open it in the past.
    pub fn days_from_now(offset_days: i64, duration_days: i64) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |since_epoch| since_epoch.as_secs() as i64);
        let opens = now + offset_days * SECONDS_PER_DAY;

        Self::new(opens, opens + duration_days * SECONDS_PER_DAY)
    }
}

/// `n_bits` uniformly random big endian bits, never all zero.
///
/// Zero samples are redrawn a bounded number of times; exhausting the bound
/// is an error rather than a loop.
pub(crate) fn nonzero_random_bits(n_bits: usize) -> Result<Vec<u8>> {
    const ATTEMPTS: usize = 256;

    if n_bits == 0 {
        return Err(bherror::Error::root(Error::Builder)).ctx(|| "no bits requested");
    }

    let mut bits = vec![0u8; n_bits.div_ceil(8)];
    let unused_high_bits = (bits.len() * 8 - n_bits) as u32;
    let top_byte_mask = u8::MAX >> unused_high_bits;

    let mut rng = rand::rng();
    for _ in 0..ATTEMPTS {
        rng.fill_bytes(&mut bits);
        bits[0] &= top_byte_mask;
        if bits.iter().any(|byte| *byte != 0) {
            return Ok(bits);
        }
    }

    Err(bherror::Error::root(Error::Builder)).ctx(|| "random source kept producing zeros")
}

fn random_serial() -> Result<Asn1Integer> {
    let bits = nonzero_random_bits(SERIAL_BITS)?;
    BigNum::from_slice(&bits)
        .and_then(|serial| serial.to_asn1_integer())
        .or_fail("serial number")
}

fn common_name(value: &str) -> Result<X509Name> {
    let mut name = X509NameBuilder::new().or_fail("name builder")?;
    name.append_entry_by_text("CN", value)
        .or_fail("common name")?;
    Ok(name.build())
}

fn append(
    certificate: &mut X509Builder,
    extension: X509Extension,
    what: &'static str,
) -> Result<()> {
    certificate.append_extension(extension).or_fail(what)
}

/// Everything needed to issue one certificate.
struct Issuance<'a> {
    /// `None` issues a self-signed certificate.
    issuer: Option<&'a X509>,
    issuer_key: &'a PKey<Private>,
    subject: &'a X509Name,
    subject_key: &'a PKey<Public>,
    validity: Validity,
    authority: bool,
}

impl Issuance<'_> {
    fn sign(self) -> Result<X509> {
        let mut certificate = X509::builder().or_fail("certificate builder")?;

        certificate.set_version(X509_V3).or_fail("version")?;
        let serial = random_serial()?;
        certificate
            .set_serial_number(&serial)
            .or_fail("serial number")?;
        certificate
            .set_subject_name(self.subject)
            .or_fail("subject name")?;
        let issuer_name: &X509NameRef = match self.issuer {
            Some(issuer) => issuer.subject_name(),
            None => self.subject,
        };
        certificate
            .set_issuer_name(issuer_name)
            .or_fail("issuer name")?;
        certificate.set_pubkey(self.subject_key).or_fail("public key")?;

        let not_before = Asn1Time::from_unix(self.validity.not_before).or_fail("notBefore")?;
        let not_after = Asn1Time::from_unix(self.validity.not_after).or_fail("notAfter")?;
        certificate.set_not_before(&not_before).or_fail("notBefore")?;
        certificate.set_not_after(&not_after).or_fail("notAfter")?;

        let (constraints, usage) = if self.authority {
            (
                BasicConstraints::new().critical().ca().build(),
                KeyUsage::new().critical().key_cert_sign().crl_sign().build(),
            )
        } else {
            (
                BasicConstraints::new().build(),
                KeyUsage::new().critical().digital_signature().build(),
            )
        };
        let constraints = constraints.or_fail("basicConstraints")?;
        append(&mut certificate, constraints, "basicConstraints")?;
        let usage = usage.or_fail("keyUsage")?;
        append(&mut certificate, usage, "keyUsage")?;

        let subject_key_id = SubjectKeyIdentifier::new()
            .build(&certificate.x509v3_context(self.issuer.map(|issuer| &**issuer), None))
            .or_fail("subjectKeyIdentifier")?;
        append(&mut certificate, subject_key_id, "subjectKeyIdentifier")?;

        if let Some(issuer) = self.issuer {
            let authority_key_id = AuthorityKeyIdentifier::new()
                .keyid(false)
                .issuer(false)
                .build(&certificate.x509v3_context(Some(&**issuer), None))
                .or_fail("authorityKeyIdentifier")?;
            append(&mut certificate, authority_key_id, "authorityKeyIdentifier")?;
        }

        certificate
            .sign(self.issuer_key, MessageDigest::sha256())
            .or_fail("signature")?;

        Ok(certificate.build())
    }
}

/// A throwaway certificate authority issuing [`X5Chain`]s.
///
/// It holds a root key and its self-signed certificate, and signs document
/// signer certificates for arbitrary public keys with any [`Validity`]. This
/// makes expired or future-dated chains easy to produce for tests and demos.
/// It is not meant to run a production CA.
#[derive(Debug)]
pub struct Builder {
    root_key: PKey<Private>,
    root_certificate: X509,
}

impl Builder {
    /// Load a CA from a PEM private key and the PEM certificate of that key.
    pub fn from_pem(root_private_key: &[u8], root_certificate: &[u8]) -> Result<Self> {
        let root_key = PKey::private_key_from_pem(root_private_key).or_fail("root private key")?;
        let root_certificate = X509::from_pem(root_certificate).or_fail("root certificate")?;

        let certified_key = root_certificate.public_key().or_fail("root certificate key")?;
        if !certified_key.public_eq(&root_key) {
            return Err(bherror::Error::root(Error::Builder))
                .ctx(|| "the private key is not the one certified by the root");
        }

        Ok(Self {
            root_key,
            root_certificate,
        })
    }

    /// Create a CA with a fresh P-256 key and a self-signed root certificate
    /// named `common_name`.
    pub fn generate_root(root_common_name: &str, validity: Validity) -> Result<Self> {
        let curve = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).or_fail("P-256 group")?;
        let root_key = EcKey::generate(&curve)
            .and_then(PKey::from_ec_key)
            .or_fail("root key generation")?;
        let root_public_key = root_key
            .public_key_to_der()
            .and_then(|der| PKey::public_key_from_der(&der))
            .or_fail("root public key")?;
        let subject = common_name(root_common_name)?;

        let root_certificate = Issuance {
            issuer: None,
            issuer_key: &root_key,
            subject: &subject,
            subject_key: &root_public_key,
            validity,
            authority: true,
        }
        .sign()
        .ctx(|| "root certificate")?;

        Ok(Self {
            root_key,
            root_certificate,
        })
    }

    /// The self-signed root certificate.
    pub fn root_certificate(&self) -> &X509 {
        &self.root_certificate
    }

    /// Trust anchored at this CA alone.
    pub fn trust(&self) -> X509Trust {
        X509Trust::new(vec![self.root_certificate.clone()])
    }

    /// Certify the PEM `leaf_public_key` for digital signatures and return
    /// the chain `[leaf, root]`.
    pub fn generate_x5chain(&self, leaf_public_key: &[u8], validity: Validity) -> Result<X5Chain> {
        let subject_key = PKey::public_key_from_pem(leaf_public_key).or_fail("leaf public key")?;
        let subject = common_name(LEAF_COMMON_NAME)?;

        let leaf = Issuance {
            issuer: Some(&self.root_certificate),
            issuer_key: &self.root_key,
            subject: &subject,
            subject_key: &subject_key,
            validity,
            authority: false,
        }
        .sign()
        .ctx(|| "leaf certificate")?;

        X5Chain::new(vec![leaf, self.root_certificate.clone()])
    }
}
