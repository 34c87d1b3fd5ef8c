//! `SQLite` database connection, schema migration runner, and credential CRUD.
//!
//! The store is deliberately plain: simulator credentials are inspectable
//! sample data, so rows are not encrypted at rest. Record-level attribute
//! envelopes are upgraded lazily on read (see [`crate::migration`]) and the
//! upgraded form is written back.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use oathsim_core::OcraCredentialDescriptor;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::adapter;
use crate::error::StoreError;
use crate::migration::registered_migrations;
use crate::record::{CredentialType, VersionedCredentialRecord, CURRENT_SCHEMA_VERSION};

// ---------------------------------------------------------------------------
// Embedded migrations
// ---------------------------------------------------------------------------

/// Forward-only SQL migrations, embedded at compile time.
/// Index 0 → version 1, index 1 → version 2, etc.
const MIGRATIONS: &[&str] = &[include_str!("../migrations/001_initial_schema.sql")];

// ---------------------------------------------------------------------------
// CredentialStore
// ---------------------------------------------------------------------------

/// Handle to an open, migrated credential database.
pub struct CredentialStore {
    conn: Connection,
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialStore(***)")
    }
}

impl CredentialStore {
    /// Open (or create) a credential database at `path`.
    ///
    /// Enables WAL journal mode and runs any pending SQL migrations.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Database`] for `SQLite` errors.
    /// - [`StoreError::Migration`] if a migration fails.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        let mut store = Self { conn };
        store.run_migrations()?;
        Ok(store)
    }

    /// Open an in-memory store, primarily for tests.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] / [`StoreError::Migration`] as
    /// [`open`](Self::open).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let mut store = Self { conn };
        store.run_migrations()?;
        Ok(store)
    }

    /// Returns the current SQL schema version (`PRAGMA user_version`).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the pragma query fails.
    pub fn schema_version(&self) -> Result<i32, StoreError> {
        let v: i32 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;
        Ok(v)
    }

    /// Insert or replace a credential record.
    ///
    /// On update, `created_at` of the existing row is preserved and only
    /// `updated_at` moves.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on `SQLite` failures.
    pub fn save(&self, record: &VersionedCredentialRecord) -> Result<(), StoreError> {
        let attributes = serde_json::to_string(&record.attributes)
            .map_err(|e| StoreError::Database(format!("attribute encoding failed: {e}")))?;
        self.conn.execute(
            "INSERT INTO credentials
                 (name, credential_type, schema_version, secret_hex,
                  created_at, updated_at, attributes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(name) DO UPDATE SET
                 credential_type = excluded.credential_type,
                 schema_version  = excluded.schema_version,
                 secret_hex      = excluded.secret_hex,
                 updated_at      = excluded.updated_at,
                 attributes      = excluded.attributes",
            params![
                record.name,
                record.credential_type.as_db_str(),
                record.schema_version,
                record.secret.as_hex(),
                i64::try_from(record.created_at)
                    .map_err(|_| StoreError::Database("created_at out of range".to_owned()))?,
                i64::try_from(record.updated_at)
                    .map_err(|_| StoreError::Database("updated_at out of range".to_owned()))?,
                attributes,
            ],
        )?;
        Ok(())
    }

    /// Look up a credential by name, upgrading a legacy record envelope in
    /// place when one is found.
    ///
    /// Not-found is `Ok(None)` — the caller owns that error, not this store.
    ///
    /// # Errors
    ///
    /// - [`StoreError::UnsupportedSchemaVersion`] when no registered
    ///   migration can upgrade the stored version.
    /// - [`StoreError::Database`] on `SQLite` failures, and migration errors
    ///   from the record upgrade itself.
    pub fn find_by_name(
        &self,
        name: &str,
    ) -> Result<Option<VersionedCredentialRecord>, StoreError> {
        let Some(record) = self.load_raw(name.trim())? else {
            return Ok(None);
        };
        if record.schema_version == CURRENT_SCHEMA_VERSION {
            return Ok(Some(record));
        }
        let upgraded = self.upgrade_record(&record)?;
        self.save(&upgraded)?;
        Ok(Some(upgraded))
    }

    /// Resolve a stored OCRA credential into a validated descriptor.
    ///
    /// This is the seam the engines consume: identifier in, descriptor or
    /// `None` out.
    ///
    /// # Errors
    ///
    /// As [`find_by_name`](Self::find_by_name), plus adapter errors for a
    /// record that is not a well-formed OCRA credential.
    pub fn find_ocra_descriptor(
        &self,
        name: &str,
    ) -> Result<Option<OcraCredentialDescriptor>, StoreError> {
        match self.find_by_name(name)? {
            None => Ok(None),
            Some(record) => adapter::deserialize(&record).map(Some),
        }
    }

    /// All credential names, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on `SQLite` failures.
    pub fn list_names(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM credentials ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Delete a credential by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no such credential exists.
    pub fn delete(&self, name: &str) -> Result<(), StoreError> {
        let affected = self
            .conn
            .execute("DELETE FROM credentials WHERE name = ?1", params![name])?;
        if affected == 0 {
            return Err(StoreError::NotFound(name.to_owned()));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn load_raw(&self, name: &str) -> Result<Option<VersionedCredentialRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT schema_version, credential_type, secret_hex,
                    created_at, updated_at, attributes
             FROM credentials WHERE name = ?1",
        )?;
        let row = stmt
            .query_row(params![name], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .optional()?;

        let Some((schema_version, type_token, secret_hex, created_at, updated_at, attributes)) =
            row
        else {
            return Ok(None);
        };

        let schema_version = u32::try_from(schema_version)
            .map_err(|_| StoreError::Database("negative schema_version".to_owned()))?;
        let created_at = u64::try_from(created_at)
            .map_err(|_| StoreError::Database("negative created_at".to_owned()))?;
        let updated_at = u64::try_from(updated_at)
            .map_err(|_| StoreError::Database("negative updated_at".to_owned()))?;
        let credential_type = CredentialType::from_db_str(&type_token)?;
        let secret = oathsim_core::SecretMaterial::from_hex(&secret_hex)?;
        let attributes: BTreeMap<String, String> = serde_json::from_str(&attributes)
            .map_err(|e| StoreError::Database(format!("attribute decoding failed: {e}")))?;

        Ok(Some(VersionedCredentialRecord {
            schema_version,
            name: name.to_owned(),
            credential_type,
            secret,
            created_at,
            updated_at,
            attributes,
        }))
    }

    fn upgrade_record(
        &self,
        record: &VersionedCredentialRecord,
    ) -> Result<VersionedCredentialRecord, StoreError> {
        for migration in registered_migrations() {
            if migration.supports(record.credential_type, record.schema_version) {
                debug!(
                    name = %record.name,
                    from_version = record.schema_version,
                    "applying record migration"
                );
                return migration.upgrade(record);
            }
        }
        Err(StoreError::UnsupportedSchemaVersion(record.schema_version))
    }

    /// Apply all pending SQL migrations sequentially.
    ///
    /// Each migration runs in a transaction; `user_version` is bumped
    /// atomically on commit.
    fn run_migrations(&mut self) -> Result<(), StoreError> {
        let current = self.schema_version()?;

        for (idx, sql) in MIGRATIONS.iter().enumerate() {
            // Migration versions are 1-indexed: index 0 → version 1.
            let version = idx
                .checked_add(1)
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(|| StoreError::Migration("migration index overflow".into()))?;

            if version <= current {
                continue; // already applied
            }

            let tx = self.conn.transaction().map_err(|e| {
                StoreError::Migration(format!(
                    "failed to start transaction for migration {version}: {e}"
                ))
            })?;

            tx.execute_batch(sql)
                .map_err(|e| StoreError::Migration(format!("migration {version} failed: {e}")))?;

            tx.pragma_update(None, "user_version", version).map_err(|e| {
                StoreError::Migration(format!("failed to update user_version to {version}: {e}"))
            })?;

            tx.commit().map_err(|e| {
                StoreError::Migration(format!("failed to commit migration {version}: {e}"))
            })?;

            info!(version, "applied credential store migration");
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
