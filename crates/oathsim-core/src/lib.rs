//! `oathsim-core` — Pure OATH OTP algorithm engines for the simulator.
//!
//! This crate is the audit target: zero network, zero async, zero I/O.
//! It implements the OCRA challenge-response algorithm (RFC 6287) — suite
//! parsing, data-input assembly, response calculation, replay verification —
//! plus the HOTP/TOTP engines (RFC 4226/6238) it shares its truncation
//! primitive with. All state lives in caller-supplied values; the engines
//! never read a clock or mutate a rolling counter.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;

pub mod secret;

pub mod suite;

pub mod data_input;

pub mod credential;

pub mod calculator;

pub mod verifier;

pub mod oath;

pub use calculator::generate;
pub use credential::OcraCredentialDescriptor;
pub use data_input::{ExecutionContext, Timestamp};
pub use error::OcraError;
pub use oath::{generate_hotp, generate_totp, validate_totp, OtpDigits};
pub use secret::{SecretEncoding, SecretMaterial};
pub use suite::{
    ChallengeFormat, ChallengeSpec, CryptoFunction, DataInput, HashAlgorithm, SessionSpec,
    SuiteDescriptor, TimestampSpec,
};
pub use verifier::{verify, VerificationOutcome, VerificationReason, VerificationResult};
