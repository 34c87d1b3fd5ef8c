//! End-to-end store coverage: save/resolve round trips, lazy legacy record
//! upgrades, and the resolve-then-verify flow the CLI/REST layers drive.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

use std::collections::BTreeMap;
use std::time::Duration;

use oathsim_core::{
    calculator, verify, ExecutionContext, OcraCredentialDescriptor, SecretMaterial,
    VerificationOutcome,
};
use oathsim_store::{
    adapter, CredentialStore, CredentialType, StoreError, VersionedCredentialRecord,
    CURRENT_SCHEMA_VERSION,
};

const KEY_32_HEX: &str = "3132333435363738393031323334353637383930313233343536373839303132";

fn sample_descriptor(name: &str) -> OcraCredentialDescriptor {
    let mut metadata = BTreeMap::new();
    metadata.insert("issuer".to_owned(), "integration".to_owned());
    OcraCredentialDescriptor::new(
        name,
        "OCRA-1:HOTP-SHA256-8:C-QN08",
        SecretMaterial::from_hex(KEY_32_HEX).expect("valid key"),
        Some(0),
        None,
        Some(Duration::from_secs(60)),
        metadata,
    )
    .expect("valid descriptor")
}

#[test]
fn save_and_resolve_round_trip_on_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("credentials.db");

    {
        let store = CredentialStore::open(&path).expect("open");
        let record = adapter::serialize(&sample_descriptor("token-a"), 1_700_000_000);
        store.save(&record).expect("save");
    }

    // Reopen: data survives the connection.
    let store = CredentialStore::open(&path).expect("reopen");
    let descriptor = store
        .find_ocra_descriptor("token-a")
        .expect("resolve")
        .expect("present");
    assert_eq!(descriptor, sample_descriptor("token-a"));
}

#[test]
fn resolve_then_verify_flow() {
    let store = CredentialStore::open_in_memory().expect("open");
    let record = adapter::serialize(&sample_descriptor("token-b"), 1_700_000_000);
    store.save(&record).expect("save");

    let descriptor = store
        .find_ocra_descriptor("token-b")
        .expect("resolve")
        .expect("present");

    // Prover generated at counter 2; store-side nominal counter is 0.
    let context = ExecutionContext {
        counter: Some(2),
        question: Some("00000000".to_owned()),
        ..ExecutionContext::default()
    };
    let otp = calculator::generate(&descriptor, &context).expect("generate");

    let nominal = ExecutionContext {
        question: Some("00000000".to_owned()),
        ..ExecutionContext::default()
    };
    let result = verify(&descriptor, &nominal, &otp, 0, 3);
    assert_eq!(result.outcome, VerificationOutcome::Match);
    assert_eq!(result.matched_delta, Some(2));
}

#[test]
fn legacy_v0_record_is_upgraded_on_read_and_persisted() {
    let store = CredentialStore::open_in_memory().expect("open");

    let mut attributes = BTreeMap::new();
    attributes.insert("suite".to_owned(), "OCRA-1:HOTP-SHA256-8:C-QN08".to_owned());
    attributes.insert("counter".to_owned(), "3".to_owned());
    attributes.insert("metadata.issuer".to_owned(), "legacy".to_owned());
    let legacy = VersionedCredentialRecord {
        schema_version: 0,
        name: "legacy-token".to_owned(),
        credential_type: CredentialType::OathOcra,
        secret: SecretMaterial::from_hex(KEY_32_HEX).expect("valid key"),
        created_at: 1_600_000_000,
        updated_at: 1_650_000_000,
        attributes,
    };
    store.save(&legacy).expect("seed legacy record");

    let upgraded = store
        .find_by_name("legacy-token")
        .expect("read")
        .expect("present");
    assert_eq!(upgraded.schema_version, CURRENT_SCHEMA_VERSION);
    assert_eq!(upgraded.created_at, 1_600_000_000);
    assert_eq!(
        upgraded.attributes.get("ocra.suite").map(String::as_str),
        Some("OCRA-1:HOTP-SHA256-8:C-QN08")
    );
    assert_eq!(
        upgraded.attributes.get("ocra.counter").map(String::as_str),
        Some("3")
    );
    assert!(!upgraded.attributes.contains_key("suite"));

    // The upgrade was written back: a second read needs no migration and
    // the record resolves as a descriptor.
    let second = store
        .find_by_name("legacy-token")
        .expect("read")
        .expect("present");
    assert_eq!(second.schema_version, CURRENT_SCHEMA_VERSION);
    let descriptor = store
        .find_ocra_descriptor("legacy-token")
        .expect("resolve")
        .expect("present");
    assert_eq!(descriptor.counter_value(), Some(3));
}

#[test]
fn unknown_schema_version_is_rejected() {
    let store = CredentialStore::open_in_memory().expect("open");
    let mut record = adapter::serialize(&sample_descriptor("future-token"), 1_700_000_000);
    record.schema_version = 99;
    store.save(&record).expect("save");

    assert!(matches!(
        store.find_by_name("future-token"),
        Err(StoreError::UnsupportedSchemaVersion(99))
    ));
}

#[test]
fn update_preserves_created_at() {
    let store = CredentialStore::open_in_memory().expect("open");
    let record = adapter::serialize(&sample_descriptor("token-c"), 1_700_000_000);
    store.save(&record).expect("first save");

    let mut updated = adapter::serialize(&sample_descriptor("token-c"), 1_700_000_500);
    updated
        .attributes
        .insert("ocra.counter".to_owned(), "9".to_owned());
    store.save(&updated).expect("second save");

    let loaded = store
        .find_by_name("token-c")
        .expect("read")
        .expect("present");
    assert_eq!(loaded.created_at, 1_700_000_000);
    assert_eq!(loaded.updated_at, 1_700_000_500);
    assert_eq!(
        loaded.attributes.get("ocra.counter").map(String::as_str),
        Some("9")
    );
}

#[test]
fn list_and_delete() {
    let store = CredentialStore::open_in_memory().expect("open");
    for name in ["zeta", "alpha", "mid"] {
        let descriptor = OcraCredentialDescriptor::new(
            name,
            "OCRA-1:HOTP-SHA1-6:QN08",
            SecretMaterial::from_hex(KEY_32_HEX).expect("valid key"),
            None,
            None,
            None,
            BTreeMap::new(),
        )
        .expect("valid descriptor");
        store
            .save(&adapter::serialize(&descriptor, 1_700_000_000))
            .expect("save");
    }

    assert_eq!(store.list_names().expect("list"), vec!["alpha", "mid", "zeta"]);

    store.delete("mid").expect("delete");
    assert_eq!(store.list_names().expect("list"), vec!["alpha", "zeta"]);
    assert!(matches!(
        store.delete("mid"),
        Err(StoreError::NotFound(_))
    ));
    assert!(store.find_by_name("mid").expect("read").is_none());
}
