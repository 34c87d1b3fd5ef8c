//! OCRA credential descriptor: a parsed suite paired with key material.
//!
//! Construction validates the cross-field rules (counter and PIN are only
//! meaningful when the suite declares them) so that everything downstream
//! can assume a coherent descriptor. The descriptor is immutable; in
//! particular the engine never advances `counter_value` — rolling-counter
//! ownership lives with the credential store.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::OcraError;
use crate::secret::SecretMaterial;
use crate::suite::SuiteDescriptor;

/// A resolved OCRA credential: suite, shared secret, and the optional
/// stored inputs (counter, PIN hash, drift allowance, metadata).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OcraCredentialDescriptor {
    name: String,
    suite: SuiteDescriptor,
    shared_secret: SecretMaterial,
    counter_value: Option<u64>,
    pin_hash: Option<SecretMaterial>,
    allowed_timestamp_drift: Option<Duration>,
    metadata: BTreeMap<String, String>,
}

impl OcraCredentialDescriptor {
    /// Validate raw inputs into a descriptor.
    ///
    /// # Errors
    ///
    /// - [`OcraError::InvalidSuiteFormat`] /
    ///   [`OcraError::UnsupportedHashAlgorithm`] from suite parsing.
    /// - [`OcraError::InvalidCredential`] for a blank name, an empty secret,
    ///   a counter or PIN hash the suite does not declare, a missing counter
    ///   for a `C` suite, or a non-positive drift allowance.
    /// - [`OcraError::InvalidSecretMaterial`] for a PIN hash that does not
    ///   decode to the declared algorithm's digest length.
    pub fn new(
        name: &str,
        suite: &str,
        shared_secret: SecretMaterial,
        counter_value: Option<u64>,
        pin_hash_hex: Option<&str>,
        allowed_timestamp_drift: Option<Duration>,
        metadata: BTreeMap<String, String>,
    ) -> Result<Self, OcraError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(OcraError::InvalidCredential(
                "name must not be blank".to_owned(),
            ));
        }
        if shared_secret.is_empty() {
            return Err(OcraError::InvalidCredential(
                "shared secret must not be empty".to_owned(),
            ));
        }

        let suite = SuiteDescriptor::parse(suite)?;

        if suite.data_input().counter {
            if counter_value.is_none() {
                return Err(OcraError::InvalidCredential(format!(
                    "counter value required for suite {}",
                    suite.value()
                )));
            }
        } else if counter_value.is_some() {
            return Err(OcraError::InvalidCredential(format!(
                "counter value not permitted for suite {}",
                suite.value()
            )));
        }

        let pin_hash = match pin_hash_hex {
            None => None,
            Some(hex) if hex.trim().is_empty() => None,
            Some(hex) => {
                let Some(algorithm) = suite.data_input().pin_hash else {
                    return Err(OcraError::InvalidCredential(format!(
                        "PIN hash not permitted for suite {}",
                        suite.value()
                    )));
                };
                let material = SecretMaterial::from_hex(hex)?;
                if material.len() != algorithm.digest_len() {
                    return Err(OcraError::InvalidSecretMaterial(format!(
                        "PIN hash must be a {} digest of {} bytes, got {}",
                        algorithm.token(),
                        algorithm.digest_len(),
                        material.len()
                    )));
                }
                Some(material)
            }
        };

        if let Some(drift) = allowed_timestamp_drift {
            if drift.is_zero() {
                return Err(OcraError::InvalidCredential(
                    "allowed timestamp drift must be positive".to_owned(),
                ));
            }
        }

        Ok(Self {
            name: name.to_owned(),
            suite,
            shared_secret,
            counter_value,
            pin_hash,
            allowed_timestamp_drift,
            metadata,
        })
    }

    /// Credential identifier.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parsed suite.
    #[must_use]
    pub const fn suite(&self) -> &SuiteDescriptor {
        &self.suite
    }

    /// Shared secret bytes.
    #[must_use]
    pub const fn shared_secret(&self) -> &SecretMaterial {
        &self.shared_secret
    }

    /// Stored rolling counter, if the suite declares `C`. Read-only here;
    /// advancement is the store's responsibility.
    #[must_use]
    pub const fn counter_value(&self) -> Option<u64> {
        self.counter_value
    }

    /// Stored PIN hash, if enrolled with the credential.
    #[must_use]
    pub const fn pin_hash(&self) -> Option<&SecretMaterial> {
        self.pin_hash.as_ref()
    }

    /// Persisted drift allowance, surfaced for callers deriving replay
    /// windows. Not consulted implicitly by [`crate::verifier::verify`].
    #[must_use]
    pub const fn allowed_timestamp_drift(&self) -> Option<Duration> {
        self.allowed_timestamp_drift
    }

    /// Free-form descriptive attributes.
    #[must_use]
    pub const fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> SecretMaterial {
        SecretMaterial::from_hex("3132333435363738393031323334353637383930").expect("valid hex")
    }

    #[test]
    fn builds_minimal_descriptor() {
        let descriptor = OcraCredentialDescriptor::new(
            "token-001",
            "OCRA-1:HOTP-SHA1-6:QN08",
            secret(),
            None,
            None,
            None,
            BTreeMap::new(),
        )
        .expect("valid descriptor");
        assert_eq!(descriptor.name(), "token-001");
        assert!(descriptor.counter_value().is_none());
    }

    #[test]
    fn counter_required_for_counter_suite() {
        let result = OcraCredentialDescriptor::new(
            "token-001",
            "OCRA-1:HOTP-SHA256-8:C-QN08",
            secret(),
            None,
            None,
            None,
            BTreeMap::new(),
        );
        assert!(matches!(result, Err(OcraError::InvalidCredential(_))));
    }

    #[test]
    fn counter_rejected_for_counterless_suite() {
        let result = OcraCredentialDescriptor::new(
            "token-001",
            "OCRA-1:HOTP-SHA1-6:QN08",
            secret(),
            Some(5),
            None,
            None,
            BTreeMap::new(),
        );
        assert!(matches!(result, Err(OcraError::InvalidCredential(_))));
    }

    #[test]
    fn pin_hash_length_checked_against_declared_algorithm() {
        // SHA1 PIN digest is 20 bytes; supply 19.
        let result = OcraCredentialDescriptor::new(
            "token-001",
            "OCRA-1:HOTP-SHA256-8:QN08-PSHA1",
            secret(),
            None,
            Some(&"ab".repeat(19)),
            None,
            BTreeMap::new(),
        );
        assert!(matches!(result, Err(OcraError::InvalidSecretMaterial(_))));
    }

    #[test]
    fn pin_hash_rejected_without_pin_suite() {
        let result = OcraCredentialDescriptor::new(
            "token-001",
            "OCRA-1:HOTP-SHA1-6:QN08",
            secret(),
            None,
            Some("7110eda4d09e062aa5e4a390b0a572ac0d2c0220"),
            None,
            BTreeMap::new(),
        );
        assert!(matches!(result, Err(OcraError::InvalidCredential(_))));
    }

    #[test]
    fn zero_drift_rejected() {
        let result = OcraCredentialDescriptor::new(
            "token-001",
            "OCRA-1:HOTP-SHA1-6:QN08-T1M",
            secret(),
            None,
            None,
            Some(Duration::ZERO),
            BTreeMap::new(),
        );
        assert!(matches!(result, Err(OcraError::InvalidCredential(_))));
    }
}
