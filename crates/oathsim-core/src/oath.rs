//! RFC 4226 HOTP and RFC 6238 TOTP generation engine.
//!
//! Uses `ring::hmac` for HMAC-SHA1/SHA256/SHA512. The dynamic truncation
//! primitive defined here is shared with the OCRA response calculator, which
//! applies the identical RFC 4226 §5.3 extraction to its own message.

use ring::hmac;

use crate::error::OcraError;
use crate::suite::HashAlgorithm;

/// Default TOTP period in seconds (RFC 6238 §4).
pub const DEFAULT_PERIOD: u32 = 30;

/// Time-step window for TOTP validation (±1 step per RFC 6238 §5.2).
pub const TOTP_WINDOW: u32 = 1;

/// Number of digits in an HOTP/TOTP code (6 or 8 only).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OtpDigits {
    /// 6-digit code (standard).
    Six,
    /// 8-digit code.
    Eight,
}

impl OtpDigits {
    /// Return the numeric digit count.
    #[must_use]
    pub const fn value(self) -> u8 {
        match self {
            Self::Six => 6,
            Self::Eight => 8,
        }
    }

    /// Return the modulus value (10^digits) for truncation.
    const fn modulus(self) -> u32 {
        match self {
            Self::Six => 1_000_000,
            Self::Eight => 100_000_000,
        }
    }
}

/// Constant-time byte comparison for OTP codes.
///
/// Returns `true` iff both slices have equal length and identical contents.
/// The early return on length mismatch is acceptable for OTP codes because
/// the expected digit count is public information.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Dynamic truncation per RFC 4226 §5.3: the low nibble of the last digest
/// byte selects a 4-byte window, whose big-endian value is masked to 31 bits.
pub(crate) fn dynamic_truncation(digest: &[u8]) -> u32 {
    let offset = usize::from(digest[digest.len().wrapping_sub(1)] & 0x0F);
    u32::from_be_bytes([
        digest[offset] & 0x7F,
        digest[offset.wrapping_add(1)],
        digest[offset.wrapping_add(2)],
        digest[offset.wrapping_add(3)],
    ])
}

/// Generate an HOTP code per RFC 4226.
///
/// # Errors
///
/// Returns [`OcraError::InvalidSecretMaterial`] if the secret is empty.
#[must_use = "OTP code should be used or stored"]
pub fn generate_hotp(
    secret: &[u8],
    counter: u64,
    digits: OtpDigits,
    algorithm: HashAlgorithm,
) -> Result<String, OcraError> {
    if secret.is_empty() {
        return Err(OcraError::InvalidSecretMaterial(
            "secret must not be empty".to_owned(),
        ));
    }

    // HMAC(K, C) where C is counter as 8-byte big-endian (RFC 4226 §5.2).
    let key = hmac::Key::new(algorithm.hmac_algorithm(), secret);
    let tag = hmac::sign(&key, &counter.to_be_bytes());
    let binary_code = dynamic_truncation(tag.as_ref());

    // modulus is always 1_000_000 or 100_000_000 (never zero).
    #[allow(clippy::arithmetic_side_effects)]
    let code = binary_code % digits.modulus();
    let width = usize::from(digits.value());
    Ok(format!("{code:0>width$}"))
}

/// Generate a TOTP code per RFC 6238.
///
/// # Errors
///
/// Returns [`OcraError::InvalidSecretMaterial`] if the secret is empty and
/// [`OcraError::InvalidTimestamp`] if `period` is 0.
#[must_use = "OTP code should be used or stored"]
pub fn generate_totp(
    secret: &[u8],
    time: u64,
    digits: OtpDigits,
    period: u32,
    algorithm: HashAlgorithm,
) -> Result<String, OcraError> {
    if period == 0 {
        return Err(OcraError::InvalidTimestamp(
            "period must be > 0".to_owned(),
        ));
    }
    // T = floor(time / period) per RFC 6238 §4; period validated non-zero.
    #[allow(clippy::arithmetic_side_effects)]
    let time_step = time / u64::from(period);
    generate_hotp(secret, time_step, digits, algorithm)
}

/// Validate a TOTP code with a ±1 time-step window (RFC 6238 §5.2).
///
/// # Errors
///
/// Returns [`OcraError::InvalidSecretMaterial`] if the secret is empty and
/// [`OcraError::InvalidTimestamp`] if `period` is 0.
#[must_use = "validation result should be checked"]
pub fn validate_totp(
    secret: &[u8],
    time: u64,
    code: &str,
    digits: OtpDigits,
    period: u32,
    algorithm: HashAlgorithm,
) -> Result<bool, OcraError> {
    if period == 0 {
        return Err(OcraError::InvalidTimestamp(
            "period must be > 0".to_owned(),
        ));
    }
    // period validated non-zero above.
    #[allow(clippy::arithmetic_side_effects)]
    let time_step = time / u64::from(period);

    // Saturating bounds: at time_step=0 the window starts at 0, not u64::MAX.
    let start = time_step.saturating_sub(u64::from(TOTP_WINDOW));
    let end = time_step.saturating_add(u64::from(TOTP_WINDOW));

    let mut valid = false;
    let mut step = start;
    loop {
        let expected = generate_hotp(secret, step, digits, algorithm)?;
        if constant_time_eq(expected.as_bytes(), code.as_bytes()) {
            valid = true;
        }
        if step == end {
            break;
        }
        step = step.wrapping_add(1);
    }
    Ok(valid)
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 4226 Appendix D: secret "12345678901234567890", SHA1, 6 digits.
    const RFC4226_SECRET: &[u8] = b"12345678901234567890";

    #[test]
    fn hotp_rfc4226_first_vectors() {
        let expected = ["755224", "287082", "359152", "969429"];
        for (counter, code) in expected.iter().enumerate() {
            let generated = generate_hotp(
                RFC4226_SECRET,
                counter as u64,
                OtpDigits::Six,
                HashAlgorithm::Sha1,
            )
            .expect("HOTP generation should succeed");
            assert_eq!(&generated, code, "counter {counter}");
        }
    }

    #[test]
    fn totp_window_accepts_adjacent_steps_only() {
        let secret = RFC4226_SECRET;
        let time = 1_234_567_890u64;
        let code = generate_totp(secret, time, OtpDigits::Six, 30, HashAlgorithm::Sha1)
            .expect("generate");
        for (offset, expected) in [(0u64, true), (30, true), (60, false)] {
            let valid = validate_totp(
                secret,
                time.wrapping_add(offset),
                &code,
                OtpDigits::Six,
                30,
                HashAlgorithm::Sha1,
            )
            .expect("validate");
            assert_eq!(valid, expected, "offset {offset}");
        }
    }

    #[test]
    fn empty_secret_rejected() {
        let result = generate_hotp(&[], 0, OtpDigits::Six, HashAlgorithm::Sha1);
        assert!(matches!(
            result,
            Err(OcraError::InvalidSecretMaterial(_))
        ));
    }

    #[test]
    fn period_zero_rejected() {
        let result = generate_totp(b"secret", 59, OtpDigits::Six, 0, HashAlgorithm::Sha1);
        assert!(matches!(result, Err(OcraError::InvalidTimestamp(_))));
    }

    #[test]
    fn constant_time_eq_basics() {
        assert!(constant_time_eq(b"123456", b"123456"));
        assert!(!constant_time_eq(b"123456", b"123457"));
        assert!(!constant_time_eq(b"123456", b"12345"));
    }
}
