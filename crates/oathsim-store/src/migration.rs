//! Record-level schema migrations.
//!
//! Distinct from the SQL migrations in [`crate::db`]: these upgrade the
//! *attribute envelope* of individual records. Records are upgraded lazily
//! on read and the upgraded form is written back.

use std::collections::BTreeMap;
use std::time::Duration;

use oathsim_core::OcraCredentialDescriptor;
use tracing::debug;

use crate::adapter;
use crate::error::StoreError;
use crate::record::{CredentialType, VersionedCredentialRecord, CURRENT_SCHEMA_VERSION};

/// A forward-only upgrade step for one credential type and source version.
pub trait RecordMigration {
    /// Whether this migration applies to the given type/version pair.
    fn supports(&self, credential_type: CredentialType, from_version: u32) -> bool;

    /// Upgrade the record to [`CURRENT_SCHEMA_VERSION`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the legacy record is malformed.
    fn upgrade(
        &self,
        record: &VersionedCredentialRecord,
    ) -> Result<VersionedCredentialRecord, StoreError>;
}

/// All registered record migrations, probed in order.
#[must_use]
pub fn registered_migrations() -> Vec<Box<dyn RecordMigration>> {
    vec![Box::new(OcraRecordV0ToV1)]
}

// ── OCRA v0 → v1 ────────────────────────────────────────────────────

const LEGACY_SUITE: &str = "suite";
const LEGACY_COUNTER: &str = "counter";
const LEGACY_PIN_HASH: &str = "pinHash";
const LEGACY_ALLOWED_DRIFT_SECONDS: &str = "allowedDriftSeconds";
const LEGACY_METADATA_PREFIX: &str = "metadata.";

/// Upgrades legacy OCRA records (schema version 0, flat attribute names)
/// into the v1 envelope with `ocra.`-namespaced attributes.
pub struct OcraRecordV0ToV1;

impl RecordMigration for OcraRecordV0ToV1 {
    fn supports(&self, credential_type: CredentialType, from_version: u32) -> bool {
        credential_type == CredentialType::OathOcra && from_version == 0
    }

    fn upgrade(
        &self,
        record: &VersionedCredentialRecord,
    ) -> Result<VersionedCredentialRecord, StoreError> {
        let suite = record
            .attributes
            .get(LEGACY_SUITE)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| StoreError::MissingAttribute(LEGACY_SUITE.to_owned()))?;

        let counter = parse_legacy_u64(&record.attributes, LEGACY_COUNTER)?;
        let drift = parse_legacy_u64(&record.attributes, LEGACY_ALLOWED_DRIFT_SECONDS)?
            .map(Duration::from_secs);
        let pin_hash = record
            .attributes
            .get(LEGACY_PIN_HASH)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty());
        let metadata = adapter::extract_metadata(&record.attributes, LEGACY_METADATA_PREFIX)?;

        // Validate through the descriptor so a corrupt legacy record fails
        // the upgrade instead of producing an unusable v1 record.
        let descriptor = OcraCredentialDescriptor::new(
            &record.name,
            suite,
            record.secret.clone(),
            counter,
            pin_hash,
            drift,
            metadata,
        )?;

        let mut upgraded = adapter::serialize(&descriptor, record.updated_at);
        upgraded.created_at = record.created_at;
        upgraded.updated_at = record.updated_at;

        debug!(
            name = %record.name,
            from_version = record.schema_version,
            to_version = CURRENT_SCHEMA_VERSION,
            "upgraded legacy OCRA record"
        );
        Ok(upgraded)
    }
}

fn parse_legacy_u64(
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
