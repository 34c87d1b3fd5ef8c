//! `oathsim-store` — Versioned credential store for the simulator.
//!
//! Persists credentials as versioned records over `SQLite`, bridges OCRA
//! records to validated [`oathsim_core::OcraCredentialDescriptor`] values,
//! and upgrades legacy record envelopes on read. The store owns everything
//! the core engine deliberately does not: durable state, identifiers, and
//! rolling-counter advancement policy.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;

pub mod record;

pub mod adapter;

pub mod migration;

pub mod db;

pub use db::CredentialStore;
pub use error::StoreError;
pub use migration::{registered_migrations, OcraRecordV0ToV1, RecordMigration};
pub use record::{CredentialType, VersionedCredentialRecord, CURRENT_SCHEMA_VERSION};
