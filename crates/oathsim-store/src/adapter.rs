//! Persistence bridge between OCRA descriptors and versioned records.
//!
//! Attribute keys are part of the stored-credential contract; renaming one
//! is a breaking change for every existing store file.

use std::collections::BTreeMap;
use std::time::Duration;

use oathsim_core::OcraCredentialDescriptor;

use crate::error::StoreError;
use crate::record::{CredentialType, VersionedCredentialRecord, CURRENT_SCHEMA_VERSION};

/// Suite string attribute.
pub const ATTR_SUITE: &str = "ocra.suite";
/// Rolling counter attribute (decimal).
pub const ATTR_COUNTER: &str = "ocra.counter";
/// Enrolled PIN hash attribute (hex).
pub const ATTR_PIN_HASH: &str = "ocra.pinHash";
/// Timestamp drift allowance attribute (seconds, decimal).
pub const ATTR_ALLOWED_DRIFT_SECONDS: &str = "ocra.allowedTimestampDriftSeconds";
/// Prefix for free-form descriptor metadata.
pub const ATTR_METADATA_PREFIX: &str = "ocra.metadata.";

/// Serialize a descriptor into a schema-v1 record.
///
/// `now` (Unix seconds) stamps both timestamps; the store preserves the
/// original `created_at` on update.
#[must_use]
pub fn serialize(descriptor: &OcraCredentialDescriptor, now: u64) -> VersionedCredentialRecord {
    let mut attributes = BTreeMap::new();
    attributes.insert(ATTR_SUITE.to_owned(), descriptor.suite().value().to_owned());
    if let Some(counter) = descriptor.counter_value() {
        attributes.insert(ATTR_COUNTER.to_owned(), counter.to_string());
    }
    if let Some(pin_hash) = descriptor.pin_hash() {
        attributes.insert(ATTR_PIN_HASH.to_owned(), pin_hash.as_hex());
    }
    if let Some(drift) = descriptor.allowed_timestamp_drift() {
        attributes.insert(
            ATTR_ALLOWED_DRIFT_SECONDS.to_owned(),
            drift.as_secs().to_string(),
        );
    }
    for (key, value) in descriptor.metadata() {
        attributes.insert(format!("{ATTR_METADATA_PREFIX}{key}"), value.clone());
    }

    VersionedCredentialRecord {
        schema_version: CURRENT_SCHEMA_VERSION,
        name: descriptor.name().to_owned(),
        credential_type: CredentialType::OathOcra,
        secret: descriptor.shared_secret().clone(),
        created_at: now,
        updated_at: now,
        attributes,
    }
}

/// Deserialize a schema-v1 record back into a validated descriptor.
///
/// # Errors
///
/// - [`StoreError::UnsupportedSchemaVersion`] /
///   [`StoreError::UnsupportedCredentialType`] on an envelope mismatch.
/// - [`StoreError::MissingAttribute`] / [`StoreError::InvalidAttribute`] on
///   malformed attributes.
/// - [`StoreError::Core`] when the reassembled descriptor fails core
///   validation.
pub fn deserialize(
    record: &VersionedCredentialRecord,
) -> Result<OcraCredentialDescriptor, StoreError> {
    if record.schema_version != CURRENT_SCHEMA_VERSION {
        return Err(StoreError::UnsupportedSchemaVersion(record.schema_version));
    }
    if record.credential_type != CredentialType::OathOcra {
        return Err(StoreError::UnsupportedCredentialType(
            record.credential_type.as_db_str().to_owned(),
        ));
    }

    let suite = record
        .attributes
        .get(ATTR_SUITE)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| StoreError::MissingAttribute(ATTR_SUITE.to_owned()))?;

    let counter = parse_u64_attribute(&record.attributes, ATTR_COUNTER)?;
    let drift = parse_u64_attribute(&record.attributes, ATTR_ALLOWED_DRIFT_SECONDS)?
        .map(Duration::from_secs);
    let pin_hash = record
        .attributes
        .get(ATTR_PIN_HASH)
        .map(String::as_str)
        .filter(|value| !value.trim().is_empty());
    let metadata = extract_metadata(&record.attributes, ATTR_METADATA_PREFIX)?;

    let descriptor = OcraCredentialDescriptor::new(
        &record.name,
        suite,
        record.secret.clone(),
        counter,
        pin_hash,
        drift,
        metadata,
    )?;
    Ok(descriptor)
}

fn parse_u64_attribute(
    attributes: &BTreeMap<String, String>,
    key: &str,
) -> Result<Option<u64>, StoreError> {
    match attributes.get(key) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| StoreError::InvalidAttribute {
                attribute: key.to_owned(),
                reason: e.to_string(),
            }),
    }
}

/// Collect `prefix`-namespaced attributes into a metadata map.
pub(crate) fn extract_metadata(
    attributes: &BTreeMap<String, String>,
    prefix: &str,
) -> Result<BTreeMap<String, String>, StoreError> {
    let mut metadata = BTreeMap::new();
    for (key, value) in attributes {
        let Some(metadata_key) = key.strip_prefix(prefix) else {
            continue;
        };
        if metadata_key.trim().is_empty() {
            return Err(StoreError::InvalidAttribute {
                attribute: key.clone(),
                reason: "metadata key must not be blank".to_owned(),
            });
        }
        metadata.insert(metadata_key.to_owned(), value.clone());
    }
    Ok(metadata)
}
