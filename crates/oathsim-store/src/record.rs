//! Versioned credential record envelope.
//!
//! Every stored credential is one record: identity, type, secret, and a
//! flat attribute map whose keys are namespaced per protocol (`ocra.*`).
//! The envelope's `schema_version` gates how the attributes are read; old
//! versions are upgraded through [`crate::migration`] before use.

use std::collections::BTreeMap;

use oathsim_core::SecretMaterial;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Schema version written by the current adapter set.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Protocols this store holds credentials for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialType {
    /// HMAC-based one-time password (RFC 4226).
    OathHotp,
    /// Time-based one-time password (RFC 6238).
    OathTotp,
    /// Challenge-response one-time password (RFC 6287).
    OathOcra,
}

impl CredentialType {
    /// Convert to the `snake_case` string stored in `SQLite`.
    #[must_use]
    pub const fn as_db_str(self) -> &'static str {
        match self {
            Self::OathHotp => "oath_hotp",
            Self::OathTotp => "oath_totp",
            Self::OathOcra => "oath_ocra",
        }
    }

    /// Parse from the database `TEXT` value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnsupportedCredentialType`] for unknown tokens.
    pub fn from_db_str(s: &str) -> Result<Self, StoreError> {
        match s {
            "oath_hotp" => Ok(Self::OathHotp),
            "oath_totp" => Ok(Self::OathTotp),
            "oath_ocra" => Ok(Self::OathOcra),
            other => Err(StoreError::UnsupportedCredentialType(other.to_owned())),
        }
    }
}

/// One persisted credential, envelope plus attributes.
///
/// Timestamps are Unix seconds supplied by the caller; the store keeps no
/// clock of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedCredentialRecord {
    /// Envelope schema version; see [`CURRENT_SCHEMA_VERSION`].
    pub schema_version: u32,
    /// Credential identifier, unique per store.
    pub name: String,
    /// Protocol this credential belongs to.
    pub credential_type: CredentialType,
    /// Shared secret bytes.
    pub secret: SecretMaterial,
    /// Creation time, Unix seconds.
    pub created_at: u64,
    /// Last update time, Unix seconds.
    pub updated_at: u64,
    /// Namespaced protocol attributes.
    pub attributes: BTreeMap<String, String>,
}
