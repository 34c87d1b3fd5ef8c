//! OCRA suite string grammar (RFC 6287 §6).
//!
//! A suite string such as `OCRA-1:HOTP-SHA256-8:C-QN08-PSHA1` selects the
//! HMAC hash, the response truncation width, and which optional data-input
//! fields participate in the computation. The parsed [`SuiteDescriptor`] is
//! immutable and is the wire contract for every stored credential, so the
//! grammar here must not drift.

use std::fmt;
use std::str::FromStr;

use ring::hmac;

use crate::error::OcraError;

/// Fixed width of the challenge field inside the data input, in bytes.
pub const CHALLENGE_FIELD_LEN: usize = 128;

// ── Hash algorithm ──────────────────────────────────────────────────

/// SHA family member used for HMAC and PIN hashing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// SHA-1 (20-byte digest).
    Sha1,
    /// SHA-256 (32-byte digest).
    Sha256,
    /// SHA-512 (64-byte digest).
    Sha512,
}

impl HashAlgorithm {
    /// Suite token rendering (`SHA1`, `SHA256`, `SHA512`).
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
        }
    }

    /// Digest length in bytes.
    #[must_use]
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha512 => 64,
        }
    }

    /// Parse a suite token. Case is normalized before comparison — a
    /// deliberate leniency for common casing variance, not RFC grammar.
    ///
    /// # Errors
    ///
    /// Returns [`OcraError::UnsupportedHashAlgorithm`] for anything outside
    /// the SHA1/SHA256/SHA512 set.
    pub fn from_token(token: &str) -> Result<Self, OcraError> {
        match token.to_ascii_uppercase().as_str() {
            "SHA1" => Ok(Self::Sha1),
            "SHA256" => Ok(Self::Sha256),
            "SHA512" => Ok(Self::Sha512),
            _ => Err(OcraError::UnsupportedHashAlgorithm(token.to_owned())),
        }
    }

    /// Map to the corresponding `ring::hmac::Algorithm`.
    pub(crate) fn hmac_algorithm(self) -> hmac::Algorithm {
        match self {
            Self::Sha1 => hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY,
            Self::Sha256 => hmac::HMAC_SHA256,
            Self::Sha512 => hmac::HMAC_SHA512,
        }
    }
}

// ── Crypto function ─────────────────────────────────────────────────

/// The `HOTP-SHAx-d` segment: hash plus response truncation width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CryptoFunction {
    /// HMAC hash algorithm.
    pub hash_algorithm: HashAlgorithm,
    /// Decimal OTP digits, `0` (full untruncated response) or 4..=10.
    pub truncation_digits: u8,
}

impl CryptoFunction {
    fn parse(segment: &str) -> Result<Self, OcraError> {
        let mut parts = segment.split('-');
        let (Some(family), Some(hash), Some(digits), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(OcraError::InvalidSuiteFormat(format!(
                "crypto function must be HOTP-SHAx-d: {segment}"
            )));
        };
        if family != "HOTP" {
            return Err(OcraError::InvalidSuiteFormat(format!(
                "only HOTP-derived crypto functions are supported: {segment}"
            )));
        }
        let hash_algorithm = HashAlgorithm::from_token(hash)?;
        let truncation_digits: u8 = digits.parse().map_err(|_| {
            OcraError::InvalidSuiteFormat(format!("response length must be numeric: {segment}"))
        })?;
        if truncation_digits != 0 && !(4..=10).contains(&truncation_digits) {
            return Err(OcraError::InvalidSuiteFormat(format!(
                "response length must be 0 or 4..=10: {segment}"
            )));
        }
        Ok(Self {
            hash_algorithm,
            truncation_digits,
        })
    }
}

// ── Data input tokens ───────────────────────────────────────────────

/// Challenge question format selector (`Q` token).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChallengeFormat {
    /// Decimal digits, encoded through the RFC 4226 numeric-to-hex path.
    Numeric,
    /// ASCII letters and digits, encoded as raw bytes.
    Alphanumeric,
    /// Hex digits, carried as ASCII bytes.
    Hex,
}

impl ChallengeFormat {
    /// Suite token letter (`N`, `A`, `H`).
    #[must_use]
    pub const fn token(self) -> char {
        match self {
            Self::Numeric => 'N',
            Self::Alphanumeric => 'A',
            Self::Hex => 'H',
        }
    }
}

/// Mandatory challenge declaration: format plus declared length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChallengeSpec {
    /// Challenge format.
    pub format: ChallengeFormat,
    /// Declared challenge length, 4..=64 characters.
    pub length: u8,
}

/// Session information declaration (`Snnn` token).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionSpec {
    /// Declared session byte length: 64, 128, 256, or 512.
    pub length_bytes: u16,
}

/// Timestamp declaration (`Ttu` token), reduced to a step length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimestampSpec {
    /// Time-step length in seconds. Always non-zero.
    pub step_seconds: u32,
}

/// Which optional data-input fields the suite declares, in their fixed
/// relative order `[C] QFxx [PHash] [Snnn] [Ttu]`.
///
/// A closed, fixed-shape record: the RFC defines no further fields and
/// callers match on presence, not on subtypes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DataInput {
    /// `C` — 8-byte counter participates.
    pub counter: bool,
    /// `Q` — challenge question (mandatory for OCRA).
    pub challenge: ChallengeSpec,
    /// `P` — hashed PIN participates, with its hash algorithm.
    pub pin_hash: Option<HashAlgorithm>,
    /// `S` — session information participates.
    pub session: Option<SessionSpec>,
    /// `T` — time-step participates.
    pub timestamp: Option<TimestampSpec>,
}

// ── Suite descriptor ────────────────────────────────────────────────

/// Parsed, validated form of an OCRA suite string.
///
/// `value` preserves the input string byte-for-byte (after trimming) because
/// the data input is HMAC'd over the *original* spelling, not a canonical
/// re-rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuiteDescriptor {
    value: String,
    crypto_function: CryptoFunction,
    data_input: DataInput,
}

impl SuiteDescriptor {
    /// Parse and validate a suite string.
    ///
    /// # Errors
    ///
    /// Returns [`OcraError::InvalidSuiteFormat`] when the string fails the
    /// `OCRA-1:<CryptoFunction>:<DataInput>` grammar, token order, or range
    /// checks, and [`OcraError::UnsupportedHashAlgorithm`] for a SHA token
    /// outside the supported family.
    pub fn parse(suite: &str) -> Result<Self, OcraError> {
        let trimmed = suite.trim();
        if trimmed.is_empty() {
            return Err(OcraError::InvalidSuiteFormat(
                "suite must not be blank".to_owned(),
            ));
        }

        let segments: Vec<&str> = trimmed.split(':').collect();
        let [prefix, crypto, data] = segments.as_slice() else {
            return Err(OcraError::InvalidSuiteFormat(format!(
                "expected three colon-separated segments: {trimmed}"
            )));
        };
        if *prefix != "OCRA-1" {
            return Err(OcraError::InvalidSuiteFormat(format!(
                "unsupported suite prefix: {prefix}"
            )));
        }

        let crypto_function = CryptoFunction::parse(crypto)?;
        let data_input = parse_data_input(data)?;

        Ok(Self {
            value: trimmed.to_owned(),
            crypto_function,
            data_input,
        })
    }

    /// The suite string exactly as supplied (trimmed).
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Hash algorithm and truncation width.
    #[must_use]
    pub const fn crypto_function(&self) -> CryptoFunction {
        self.crypto_function
    }

    /// Declared data-input fields.
    #[must_use]
    pub const fn data_input(&self) -> &DataInput {
        &self.data_input
    }

    /// Canonical rendering. Re-parsing it yields an equivalent descriptor,
    /// though not necessarily the same spelling (`T60S` renders as `T1M`).
    #[must_use]
    pub fn canonical(&self) -> String {
        let mut out = format!(
            "OCRA-1:HOTP-{}-{}:",
            self.crypto_function.hash_algorithm.token(),
            self.crypto_function.truncation_digits
        );
        if self.data_input.counter {
            out.push_str("C-");
        }
        out.push('Q');
        out.push(self.data_input.challenge.format.token());
        out.push_str(&format!("{:02}", self.data_input.challenge.length));
        if let Some(pin) = self.data_input.pin_hash {
            out.push_str("-P");
            out.push_str(pin.token());
        }
        if let Some(session) = self.data_input.session {
            out.push_str(&format!("-S{:03}", session.length_bytes));
        }
        if let Some(timestamp) = self.data_input.timestamp {
            out.push_str(&render_timestamp_token(timestamp.step_seconds));
        }
        out
    }
}

impl fmt::Display for SuiteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl FromStr for SuiteDescriptor {
    type Err = OcraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ── Data input parsing ──────────────────────────────────────────────

fn parse_data_input(segment: &str) -> Result<DataInput, OcraError> {
    let mut counter = false;
    let mut challenge = None;
    let mut pin_hash = None;
    let mut session = None;
    let mut timestamp = None;

    // Tokens carry a fixed rank; ranks must strictly increase, which also
    // rejects duplicates.
    let mut last_rank: i8 = -1;

    for token in segment.split('-') {
        if token.is_empty() {
            return Err(OcraError::InvalidSuiteFormat(format!(
                "empty data input token: {segment}"
            )));
        }
        let rank: i8 = match token.chars().next() {
            Some('C') if token == "C" => {
                counter = true;
                0
            }
            Some('Q') => {
                challenge = Some(parse_challenge_token(token)?);
                1
            }
            Some('P') => {
                pin_hash = Some(parse_pin_token(token)?);
                2
            }
            Some('S') => {
                session = Some(parse_session_token(token)?);
                3
            }
            Some('T') => {
                timestamp = Some(parse_timestamp_token(token)?);
                4
            }
            _ => {
                return Err(OcraError::InvalidSuiteFormat(format!(
                    "unsupported data input token: {token}"
                )))
            }
        };
        if rank <= last_rank {
            return Err(OcraError::InvalidSuiteFormat(format!(
                "data input tokens out of order at {token}: expected [C]QFxx[PHash][Snnn][Ttu]"
            )));
        }
        last_rank = rank;
    }

    let Some(challenge) = challenge else {
        return Err(OcraError::InvalidSuiteFormat(format!(
            "challenge (Q) token is mandatory: {segment}"
        )));
    };

    Ok(DataInput {
        counter,
        challenge,
        pin_hash,
        session,
        timestamp,
    })
}

fn parse_challenge_token(token: &str) -> Result<ChallengeSpec, OcraError> {
    let mut chars = token.chars();
    chars.next(); // consume 'Q'
    let format = match chars.next() {
        Some('N') => ChallengeFormat::Numeric,
        Some('A') => ChallengeFormat::Alphanumeric,
        Some('H') => ChallengeFormat::Hex,
        _ => {
            return Err(OcraError::InvalidSuiteFormat(format!(
                "challenge format must be N, A, or H: {token}"
            )))
        }
    };
    let length_token = chars.as_str();
    if length_token.is_empty() || !length_token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(OcraError::InvalidSuiteFormat(format!(
            "challenge length must be numeric: {token}"
        )));
    }
    let length: u8 = length_token.parse().map_err(|_| {
        OcraError::InvalidSuiteFormat(format!("challenge length out of range: {token}"))
    })?;
    if !(4..=64).contains(&length) {
        return Err(OcraError::InvalidSuiteFormat(format!(
            "challenge length must be 4..=64: {token}"
        )));
    }
    Ok(ChallengeSpec { format, length })
}

fn parse_pin_token(token: &str) -> Result<HashAlgorithm, OcraError> {
    let hash_token = &token[1..];
    if hash_token.is_empty() {
        return Err(OcraError::InvalidSuiteFormat(format!(
            "PIN token requires a hash algorithm: {token}"
        )));
    }
    HashAlgorithm::from_token(hash_token)
}

fn parse_session_token(token: &str) -> Result<SessionSpec, OcraError> {
    let length_token = &token[1..];
    if length_token.len() != 3 || !length_token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(OcraError::InvalidSuiteFormat(format!(
            "session token must be S064, S128, S256, or S512: {token}"
        )));
    }
    let length_bytes: u16 = length_token.parse().map_err(|_| {
        OcraError::InvalidSuiteFormat(format!("session length out of range: {token}"))
    })?;
    if !matches!(length_bytes, 64 | 128 | 256 | 512) {
        return Err(OcraError::InvalidSuiteFormat(format!(
            "session length must be one of 064/128/256/512: {token}"
        )));
    }
    Ok(SessionSpec { length_bytes })
}

fn parse_timestamp_token(token: &str) -> Result<TimestampSpec, OcraError> {
    // Bare `T` defaults to a 60-second step.
    if token == "T" {
        return Ok(TimestampSpec { step_seconds: 60 });
    }
    let body = &token[1..];
    let Some(unit) = body.chars().last() else {
        return Err(OcraError::InvalidSuiteFormat(format!(
            "timestamp token requires step digits and a unit: {token}"
        )));
    };
    let digits = &body[..body.len().saturating_sub(unit.len_utf8())];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(OcraError::InvalidSuiteFormat(format!(
            "timestamp step must be numeric: {token}"
        )));
    }
    let value: u32 = digits.parse().map_err(|_| {
        OcraError::InvalidSuiteFormat(format!("timestamp step out of range: {token}"))
    })?;
    // Unit ranges per the suite grammar: 1..59 S/M, 1..48 H. Scaling cannot
    // overflow u32 for those ranges.
    #[allow(clippy::arithmetic_side_effects)]
    let step_seconds = match unit {
        'S' if (1..=59).contains(&value) => value,
        'M' if (1..=59).contains(&value) => value * 60,
        'H' if (1..=48).contains(&value) => value * 3600,
        _ => {
            return Err(OcraError::InvalidSuiteFormat(format!(
                "timestamp step/unit out of range: {token}"
            )))
        }
    };
    Ok(TimestampSpec { step_seconds })
}

/// Render a step length back into a `T` token, preferring the coarsest unit
/// that divides it evenly. Divisors are non-zero constants.
#[allow(clippy::arithmetic_side_effects)]
fn render_timestamp_token(step_seconds: u32) -> String {
    if step_seconds % 3600 == 0 && (1..=48).contains(&(step_seconds / 3600)) {
        format!("-T{}H", step_seconds / 3600)
    } else if step_seconds % 60 == 0 && (1..=59).contains(&(step_seconds / 60)) {
        format!("-T{}M", step_seconds / 60)
    } else {
        format!("-T{step_seconds}S")
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_challenge_suite() {
        let suite = SuiteDescriptor::parse("OCRA-1:HOTP-SHA1-6:QN08").expect("valid suite");
        assert_eq!(suite.value(), "OCRA-1:HOTP-SHA1-6:QN08");
        assert_eq!(suite.crypto_function().hash_algorithm, HashAlgorithm::Sha1);
        assert_eq!(suite.crypto_function().truncation_digits, 6);
        assert!(!suite.data_input().counter);
        assert_eq!(
            suite.data_input().challenge,
            ChallengeSpec {
                format: ChallengeFormat::Numeric,
                length: 8
            }
        );
        assert!(suite.data_input().pin_hash.is_none());
        assert!(suite.data_input().session.is_none());
        assert!(suite.data_input().timestamp.is_none());
    }

    #[test]
    fn parses_full_data_input() {
        let suite = SuiteDescriptor::parse("OCRA-1:HOTP-SHA512-8:C-QA10-PSHA256-S128-T1H")
            .expect("valid suite");
        let data_input = suite.data_input();
        assert!(data_input.counter);
        assert_eq!(data_input.challenge.format, ChallengeFormat::Alphanumeric);
        assert_eq!(data_input.challenge.length, 10);
        assert_eq!(data_input.pin_hash, Some(HashAlgorithm::Sha256));
        assert_eq!(data_input.session, Some(SessionSpec { length_bytes: 128 }));
        assert_eq!(
            data_input.timestamp,
            Some(TimestampSpec { step_seconds: 3600 })
        );
    }

    #[test]
    fn hash_name_case_is_normalized() {
        let suite = SuiteDescriptor::parse("OCRA-1:HOTP-sha256-8:QN08").expect("valid suite");
        assert_eq!(
            suite.crypto_function().hash_algorithm,
            HashAlgorithm::Sha256
        );
    }

    #[test]
    fn rejects_missing_challenge() {
        let result = SuiteDescriptor::parse("OCRA-1:HOTP-SHA1-6:C");
        assert!(matches!(result, Err(OcraError::InvalidSuiteFormat(_))));
    }

    #[test]
    fn rejects_tokens_out_of_order() {
        // All tokens individually well-formed, but P before Q.
        let result = SuiteDescriptor::parse("OCRA-1:HOTP-SHA1-6:PSHA1-QN08");
        assert!(matches!(result, Err(OcraError::InvalidSuiteFormat(_))));
    }

    #[test]
    fn rejects_duplicate_tokens() {
        let result = SuiteDescriptor::parse("OCRA-1:HOTP-SHA1-6:QN08-QN08");
        assert!(matches!(result, Err(OcraError::InvalidSuiteFormat(_))));
    }

    #[test]
    fn rejects_bad_segment_count() {
        assert!(SuiteDescriptor::parse("OCRA-1:HOTP-SHA1-6").is_err());
        assert!(SuiteDescriptor::parse("OCRA-1:HOTP-SHA1-6:QN08:extra").is_err());
    }

    #[test]
    fn rejects_unknown_hash() {
        let result = SuiteDescriptor::parse("OCRA-1:HOTP-SHA384-6:QN08");
        assert!(matches!(
            result,
            Err(OcraError::UnsupportedHashAlgorithm(_))
        ));
    }

    #[test]
    fn rejects_bad_truncation_digits() {
        for digits in ["1", "2", "3", "11"] {
            let suite = format!("OCRA-1:HOTP-SHA1-{digits}:QN08");
            assert!(
                SuiteDescriptor::parse(&suite).is_err(),
                "digits {digits} should be rejected"
            );
        }
        assert!(SuiteDescriptor::parse("OCRA-1:HOTP-SHA1-0:QN08").is_ok());
    }

    #[test]
    fn rejects_challenge_length_out_of_range() {
        assert!(SuiteDescriptor::parse("OCRA-1:HOTP-SHA1-6:QN03").is_err());
        assert!(SuiteDescriptor::parse("OCRA-1:HOTP-SHA1-6:QN65").is_err());
        assert!(SuiteDescriptor::parse("OCRA-1:HOTP-SHA1-6:QN04").is_ok());
        assert!(SuiteDescriptor::parse("OCRA-1:HOTP-SHA1-6:QN64").is_ok());
    }

    #[test]
    fn rejects_bad_session_lengths() {
        assert!(SuiteDescriptor::parse("OCRA-1:HOTP-SHA1-6:QN08-S100").is_err());
        assert!(SuiteDescriptor::parse("OCRA-1:HOTP-SHA1-6:QN08-S64").is_err());
        assert!(SuiteDescriptor::parse("OCRA-1:HOTP-SHA1-6:QN08-S064").is_ok());
    }

    #[test]
    fn timestamp_units_scale_to_seconds() {
        let cases = [
            ("T20S", 20),
            ("T1M", 60),
            ("T59M", 3540),
            ("T1H", 3600),
            ("T48H", 172_800),
        ];
        for (token, expected) in cases {
            let suite = format!("OCRA-1:HOTP-SHA1-6:QN08-{token}");
            let parsed = SuiteDescriptor::parse(&suite).expect("valid suite");
            assert_eq!(
                parsed.data_input().timestamp,
                Some(TimestampSpec {
                    step_seconds: expected
                }),
                "token {token}"
            );
        }
    }

    #[test]
    fn rejects_malformed_timestamp_tokens() {
        for token in ["T0S", "T60M", "T49H", "TS", "T5X", "T5"] {
            let suite = format!("OCRA-1:HOTP-SHA1-6:QN08-{token}");
            assert!(
                SuiteDescriptor::parse(&suite).is_err(),
                "token {token} should be rejected"
            );
        }
    }

    #[test]
    fn canonical_round_trips_to_equivalent_descriptor() {
        let suites = [
            "OCRA-1:HOTP-SHA1-6:QN08",
            "OCRA-1:HOTP-SHA256-8:C-QN08-PSHA1",
            "OCRA-1:HOTP-SHA512-8:QA10-S512-T30S",
            "OCRA-1:HOTP-SHA256-0:QH40-T2H",
            "OCRA-1:HOTP-SHA1-6:QN08-T1M",
        ];
        for suite in suites {
            let parsed = SuiteDescriptor::parse(suite).expect("valid suite");
            let reparsed = SuiteDescriptor::parse(&parsed.canonical()).expect("canonical parses");
            assert_eq!(
                parsed.crypto_function(),
                reparsed.crypto_function(),
                "suite {suite}"
            );
            assert_eq!(
                parsed.data_input(),
                reparsed.data_input(),
                "suite {suite}"
            );
        }
    }
}
