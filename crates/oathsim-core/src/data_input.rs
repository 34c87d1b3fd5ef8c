//! OCRA data-input assembly (RFC 6287 §5.1).
//!
//! Builds the exact byte message that gets HMAC'd:
//!
//! ```text
//! suite-string | 0x00 | [C: 8] | Q: 128 | [P: digest] | [S: declared] | [T: 8]
//! ```
//!
//! Field lengths are fixed by the suite; a single off-by-one here produces a
//! wrong OTP with no structural error, so every optional field is checked
//! both ways — absent-but-required and present-but-undeclared are errors.

use std::fmt::Write as _;

use data_encoding::HEXLOWER;

use crate::error::OcraError;
use crate::suite::{ChallengeFormat, ChallengeSpec, SuiteDescriptor, CHALLENGE_FIELD_LEN};

/// Time input for suites declaring a `T` token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timestamp {
    /// Wall-clock seconds since the Unix epoch; divided by the suite's step.
    Unix(u64),
    /// Pre-computed time-step counter, used verbatim. Lets tests and replay
    /// verification pin an exact step.
    Step(u64),
}

impl Timestamp {
    /// Parse a pre-computed time-step from its hex spelling (as carried in
    /// RFC vectors and replay requests).
    ///
    /// # Errors
    ///
    /// Returns [`OcraError::InvalidTimestamp`] when the value is empty,
    /// non-hex, or wider than 64 bits.
    pub fn from_step_hex(hex: &str) -> Result<Self, OcraError> {
        let trimmed = hex.trim();
        if trimmed.is_empty() {
            return Err(OcraError::InvalidTimestamp(
                "time-step hex must not be empty".to_owned(),
            ));
        }
        let step = u64::from_str_radix(trimmed, 16).map_err(|e| {
            OcraError::InvalidTimestamp(format!("invalid time-step hex {trimmed:?}: {e}"))
        })?;
        Ok(Self::Step(step))
    }

    /// Resolve to a step counter given the suite's step length.
    ///
    /// `step_seconds` is non-zero by construction of the suite's timestamp
    /// spec.
    #[allow(clippy::arithmetic_side_effects)]
    pub(crate) const fn resolve_step(self, step_seconds: u32) -> u64 {
        match self {
            Self::Unix(seconds) => seconds / step_seconds as u64,
            Self::Step(step) => step,
        }
    }
}

/// Per-call runtime inputs for one OCRA computation.
///
/// Exactly the fields the suite declares must be populated; anything extra
/// is rejected rather than silently ignored. Constructed per invocation and
/// never retained by the engine.
#[derive(Clone, Debug, Default)]
pub struct ExecutionContext {
    /// Counter value for `C` suites.
    pub counter: Option<u64>,
    /// One-way challenge question.
    pub question: Option<String>,
    /// Client half of a mutual challenge.
    pub client_challenge: Option<String>,
    /// Server half of a mutual challenge.
    pub server_challenge: Option<String>,
    /// Already-hashed PIN, hex encoded, for `P` suites.
    pub pin_hash_hex: Option<String>,
    /// Session information, hex encoded, for `S` suites.
    pub session_hex: Option<String>,
    /// Time input for `T` suites.
    pub timestamp: Option<Timestamp>,
}

/// Assemble the exact HMAC message for `suite` from `context`.
///
/// No truncation or hashing happens here; the returned bytes are the
/// complete message.
///
/// # Errors
///
/// - [`OcraError::MissingField`] / [`OcraError::UnexpectedField`] when the
///   context shape does not match the suite's declared data input.
/// - [`OcraError::InvalidChallengeFormat`] on a challenge that violates the
///   declared format or length.
/// - [`OcraError::InvalidSessionLength`] when the session bytes do not match
///   the declared length exactly.
/// - [`OcraError::InvalidSecretMaterial`] on a malformed PIN hash.
pub fn build(suite: &SuiteDescriptor, context: &ExecutionContext) -> Result<Vec<u8>, OcraError> {
    let data_input = suite.data_input();

    // Shape checks first: reject undeclared fields before touching bytes.
    if context.counter.is_some() && !data_input.counter {
        return Err(OcraError::UnexpectedField { field: "counter" });
    }
    if context.pin_hash_hex.is_some() && data_input.pin_hash.is_none() {
        return Err(OcraError::UnexpectedField {
            field: "pin_hash_hex",
        });
    }
    if context.session_hex.is_some() && data_input.session.is_none() {
        return Err(OcraError::UnexpectedField {
            field: "session_hex",
        });
    }
    if context.timestamp.is_some() && data_input.timestamp.is_none() {
        return Err(OcraError::UnexpectedField { field: "timestamp" });
    }

    let mut message = Vec::with_capacity(suite.value().len().saturating_add(274));
    message.extend_from_slice(suite.value().as_bytes());
    message.push(0x00);

    if data_input.counter {
        let counter = context
            .counter
            .ok_or(OcraError::MissingField { field: "counter" })?;
        message.extend_from_slice(&counter.to_be_bytes());
    }

    let (challenge, mutual) = resolve_challenge(context)?;
    encode_challenge(&mut message, data_input.challenge, &challenge, mutual)?;

    if let Some(pin_algorithm) = data_input.pin_hash {
        let hex = context
            .pin_hash_hex
            .as_deref()
            .ok_or(OcraError::MissingField {
                field: "pin_hash_hex",
            })?;
        let digest = decode_hex_field(hex)?;
        if digest.len() != pin_algorithm.digest_len() {
            return Err(OcraError::InvalidSecretMaterial(format!(
                "PIN hash must be a {} digest of {} bytes, got {}",
                pin_algorithm.token(),
                pin_algorithm.digest_len(),
                digest.len()
            )));
        }
        message.extend_from_slice(&digest);
    }

    if let Some(session) = data_input.session {
        let hex = context
            .session_hex
            .as_deref()
            .ok_or(OcraError::MissingField {
                field: "session_hex",
            })?;
        let bytes = decode_hex_field(hex)?;
        let expected = usize::from(session.length_bytes);
        if bytes.len() != expected {
            return Err(OcraError::InvalidSessionLength {
                expected,
                actual: bytes.len(),
            });
        }
        message.extend_from_slice(&bytes);
    }

    if let Some(spec) = data_input.timestamp {
        let timestamp = context
            .timestamp
            .ok_or(OcraError::MissingField { field: "timestamp" })?;
        let step = timestamp.resolve_step(spec.step_seconds);
        message.extend_from_slice(&step.to_be_bytes());
    }

    Ok(message)
}

/// Pick the challenge input: either a one-way `question`, or the mutual
/// pair combined as `server_challenge + client_challenge` (server first).
fn resolve_challenge(context: &ExecutionContext) -> Result<(String, bool), OcraError> {
    let question = context.question.as_deref().map(str::trim);
    let client = context.client_challenge.as_deref().map(str::trim);
    let server = context.server_challenge.as_deref().map(str::trim);

    match (question, client, server) {
        (Some(_), Some(_), _) => Err(OcraError::UnexpectedField {
            field: "client_challenge",
        }),
        (Some(_), _, Some(_)) => Err(OcraError::UnexpectedField {
            field: "server_challenge",
        }),
        (Some(q), None, None) if !q.is_empty() => Ok((q.to_owned(), false)),
        (None, Some(c), Some(s)) if !c.is_empty() && !s.is_empty() => {
            Ok((format!("{s}{c}"), true))
        }
        (None, Some(_), None) => Err(OcraError::MissingField {
            field: "server_challenge",
        }),
        (None, None, Some(_)) => Err(OcraError::MissingField {
            field: "client_challenge",
        }),
        _ => Err(OcraError::MissingField { field: "question" }),
    }
}

/// Validate the challenge against the declared format and length, then
/// append its fixed 128-byte field: left-justified, zero-padded right.
fn encode_challenge(
    message: &mut Vec<u8>,
    spec: ChallengeSpec,
    challenge: &str,
    mutual: bool,
) -> Result<(), OcraError> {
    if !challenge.is_ascii() {
        return Err(OcraError::InvalidChallengeFormat(
            "challenge must be ASCII".to_owned(),
        ));
    }

    // The declared length is the per-challenge minimum; a mutual pair may
    // run to twice the 64-character grammar cap.
    let declared = usize::from(spec.length);
    let cap = if mutual { 128 } else { 64 };
    let len = challenge.len();
    if len < declared {
        return Err(OcraError::InvalidChallengeFormat(format!(
            "challenge must contain at least {declared} characters, got {len}"
        )));
    }
    if len > cap {
        return Err(OcraError::InvalidChallengeFormat(format!(
            "challenge must contain at most {cap} characters, got {len}"
        )));
    }

    let encoded = match spec.format {
        ChallengeFormat::Numeric => {
            if !challenge.bytes().all(|b| b.is_ascii_digit()) {
                return Err(OcraError::InvalidChallengeFormat(
                    "numeric challenge must contain digits only".to_owned(),
                ));
            }
            numeric_challenge_bytes(challenge)
        }
        ChallengeFormat::Alphanumeric => {
            if !challenge.bytes().all(|b| b.is_ascii_alphanumeric()) {
                return Err(OcraError::InvalidChallengeFormat(
                    "alphanumeric challenge must contain ASCII letters and digits only"
                        .to_owned(),
                ));
            }
            challenge.as_bytes().to_vec()
        }
        ChallengeFormat::Hex => {
            if !challenge.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(OcraError::InvalidChallengeFormat(
                    "hex challenge must contain hexadecimal characters only".to_owned(),
                ));
            }
            // Carried as ASCII bytes; not decoded to binary.
            challenge.as_bytes().to_vec()
        }
    };

    if encoded.len() > CHALLENGE_FIELD_LEN {
        return Err(OcraError::InvalidChallengeFormat(format!(
            "encoded challenge exceeds the {CHALLENGE_FIELD_LEN}-byte field"
        )));
    }

    message.extend_from_slice(&encoded);
    let padding = CHALLENGE_FIELD_LEN.saturating_sub(encoded.len());
    message.resize(message.len().saturating_add(padding), 0x00);
    Ok(())
}

/// RFC 4226-style numeric challenge conversion: interpret the decimal
/// string, render as hex, append a trailing `0` on odd length, decode to
/// bytes. `"11111111"` becomes `A9 8A C7`, not the ASCII digit bytes.
fn numeric_challenge_bytes(decimal: &str) -> Vec<u8> {
    // Accumulate into little-endian base-256. Intermediate values stay
    // below 2^16: 255 * 10 + carry(<=10) + digit(<=9).
    #[allow(clippy::arithmetic_side_effects)]
    let little_endian = {
        let mut acc: Vec<u8> = Vec::new();
        for byte in decimal.bytes() {
            let mut carry = u16::from(byte - b'0');
            for slot in &mut acc {
                let value = u16::from(*slot) * 10 + carry;
                *slot = (value & 0xFF) as u8;
                carry = value >> 8;
            }
            while carry > 0 {
                acc.push((carry & 0xFF) as u8);
                carry >>= 8;
            }
        }
        acc
    };

    let mut hex = String::with_capacity(little_endian.len().saturating_mul(2));
    for byte in little_endian.iter().rev() {
        let _ = write!(hex, "{byte:02x}");
    }
    let trimmed = hex.trim_start_matches('0');
    let mut hex = if trimmed.is_empty() {
        "0".to_owned()
    } else {
        trimmed.to_owned()
    };
    if hex.len() % 2 != 0 {
        hex.push('0');
    }
    HEXLOWER
        .decode(hex.as_bytes())
        .unwrap_or_default()
}

/// Decode a caller-supplied hex field (PIN hash, session). Tolerates
/// whitespace and either case; an odd digit count is left-zero padded, as
/// is customary for runtime hex inputs.
fn decode_hex_field(hex: &str) -> Result<Vec<u8>, OcraError> {
    let mut normalized: String = hex
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if normalized.is_empty() {
        return Err(OcraError::InvalidSecretMaterial(
            "hex value must not be empty".to_owned(),
        ));
    }
    if let Some(bad) = normalized.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(OcraError::InvalidSecretMaterial(format!(
            "hex value contains non-hex character {bad:?}"
        )));
    }
    if normalized.len() % 2 != 0 {
        normalized.insert(0, '0');
    }
    HEXLOWER
        .decode(normalized.as_bytes())
        .map_err(|e| OcraError::InvalidSecretMaterial(format!("invalid hex: {e}")))
}

// ── Tests ───────────────────────────────────────────────────────────
