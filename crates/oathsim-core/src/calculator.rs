//! OCRA response calculation (RFC 6287 §5.2).
//!
//! HMAC over the assembled data input, RFC 4226 dynamic truncation, decimal
//! rendering. Pure and deterministic: identical descriptor and context
//! always yield the identical OTP string.

use ring::hmac;

use crate::credential::OcraCredentialDescriptor;
use crate::data_input::{self, ExecutionContext};
use crate::error::OcraError;
use crate::oath::dynamic_truncation;
use crate::secret::SecretMaterial;

/// Generate the OCRA response for `descriptor` under `context`.
///
/// Stored descriptor fields (counter, PIN hash) fill in for absent context
/// fields; an explicit context value always wins.
///
/// # Errors
///
/// Propagates [`data_input::build`] errors unchanged.
#[must_use = "OTP code should be used or stored"]
pub fn generate(
    descriptor: &OcraCredentialDescriptor,
    context: &ExecutionContext,
) -> Result<String, OcraError> {
    let suite = descriptor.suite();
    let context = resolve_context(descriptor, context);
    let message = data_input::build(suite, &context)?;

    let crypto = suite.crypto_function();
    let key = hmac::Key::new(
        crypto.hash_algorithm.hmac_algorithm(),
        descriptor.shared_secret().expose(),
    );
    let tag = hmac::sign(&key, &message);
    let value = dynamic_truncation(tag.as_ref());

    Ok(render_otp(value, crypto.truncation_digits))
}

/// Merge stored credential inputs into the runtime context.
fn resolve_context(
    descriptor: &OcraCredentialDescriptor,
    context: &ExecutionContext,
) -> ExecutionContext {
    let data_input = descriptor.suite().data_input();
    let mut resolved = context.clone();
    if data_input.counter && resolved.counter.is_none() {
        resolved.counter = descriptor.counter_value();
    }
    if data_input.pin_hash.is_some() && resolved.pin_hash_hex.is_none() {
        resolved.pin_hash_hex = descriptor.pin_hash().map(SecretMaterial::as_hex);
    }
    resolved
}

/// Render the truncated 31-bit value as the response string: the full
/// unsigned decimal for `digits == 0`, otherwise `value mod 10^digits`
/// left-zero-padded to exactly `digits` characters.
fn render_otp(value: u32, digits: u8) -> String {
    if digits == 0 {
        return value.to_string();
    }
    // digits is 4..=10 past suite validation, so 10^digits fits in u64.
    #[allow(clippy::arithmetic_side_effects)]
    let code = u64::from(value) % 10u64.pow(u32::from(digits));
    format!("{code:0>width$}", width = usize::from(digits))
}
