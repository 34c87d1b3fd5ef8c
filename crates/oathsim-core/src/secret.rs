//! Secret material handling for shared secrets and PIN hashes.
//!
//! Wraps raw key bytes in [`secrecy::SecretSlice`] so they are zeroized on
//! drop and masked in `Debug`/`Display` output. Decoding accepts the hex,
//! Base32, and Base64 spellings found in credential records and CLI input.

use std::fmt;

use data_encoding::{BASE32_NOPAD, BASE64_NOPAD, HEXLOWER};
use secrecy::{ExposeSecret, SecretSlice};
use zeroize::Zeroize;

use crate::error::OcraError;
use crate::oath::constant_time_eq;

/// Encoding of a textual shared-secret input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SecretEncoding {
    /// UTF-8 bytes of the string itself.
    Raw,
    /// Hexadecimal, whitespace and `0x` prefix tolerated.
    Hex,
    /// RFC 4648 Base32, the customary OATH key spelling.
    Base32,
    /// RFC 4648 Base64.
    Base64,
}

/// Raw secret bytes with zeroize-on-drop and masked diagnostics.
pub struct SecretMaterial {
    inner: SecretSlice<u8>,
}

impl SecretMaterial {
    /// Wrap raw bytes. The caller should zeroize its own copy afterwards.
    #[must_use]
    pub fn from_bytes(data: &[u8]) -> Self {
        Self {
            inner: data.to_vec().into(),
        }
    }

    /// Decode a textual secret according to `encoding`.
    ///
    /// # Errors
    ///
    /// Returns [`OcraError::InvalidSecretMaterial`] when the value is blank
    /// or does not decode under the named encoding.
    pub fn decode(value: &str, encoding: SecretEncoding) -> Result<Self, OcraError> {
        match encoding {
            SecretEncoding::Raw => {
                if value.trim().is_empty() {
                    return Err(OcraError::InvalidSecretMaterial(
                        "secret must not be blank".to_owned(),
                    ));
                }
                Ok(Self::from_bytes(value.as_bytes()))
            }
            SecretEncoding::Hex => Self::from_hex(value),
            SecretEncoding::Base32 => Self::from_base32(value),
            SecretEncoding::Base64 => Self::from_base64(value),
        }
    }

    /// Decode a hex secret. Accepts a `0x` prefix, interior whitespace, and
    /// either case; requires an even number of digits.
    ///
    /// # Errors
    ///
    /// Returns [`OcraError::InvalidSecretMaterial`] on empty, odd-length, or
    /// non-hexadecimal input.
    pub fn from_hex(value: &str) -> Result<Self, OcraError> {
        let normalized = normalize_hex(value)?;
        let mut bytes = HEXLOWER
            .decode(normalized.as_bytes())
            .map_err(|e| OcraError::InvalidSecretMaterial(format!("invalid hex: {e}")))?;
        let material = Self::from_bytes(&bytes);
        bytes.zeroize();
        Ok(material)
    }

    /// Decode a Base32 secret. Whitespace and `=` padding are stripped,
    /// lowercase is folded to the RFC 4648 uppercase alphabet.
    ///
    /// # Errors
    ///
    /// Returns [`OcraError::InvalidSecretMaterial`] on empty or malformed
    /// input.
    pub fn from_base32(value: &str) -> Result<Self, OcraError> {
        let cleaned: String = value
            .chars()
            .filter(|c| !c.is_ascii_whitespace() && *c != '=')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        if cleaned.is_empty() {
            return Err(OcraError::InvalidSecretMaterial(
                "secret must not be blank".to_owned(),
            ));
        }
        let mut bytes = BASE32_NOPAD
            .decode(cleaned.as_bytes())
            .map_err(|e| OcraError::InvalidSecretMaterial(format!("invalid Base32: {e}")))?;
        let material = Self::from_bytes(&bytes);
        bytes.zeroize();
        Ok(material)
    }

    /// Decode a Base64 secret. Whitespace and `=` padding are stripped.
    ///
    /// # Errors
    ///
    /// Returns [`OcraError::InvalidSecretMaterial`] on empty or malformed
    /// input.
    pub fn from_base64(value: &str) -> Result<Self, OcraError> {
        let cleaned: String = value
            .chars()
            .filter(|c| !c.is_ascii_whitespace() && *c != '=')
            .collect();
        if cleaned.is_empty() {
            return Err(OcraError::InvalidSecretMaterial(
                "secret must not be blank".to_owned(),
            ));
        }
        let mut bytes = BASE64_NOPAD
            .decode(cleaned.as_bytes())
            .map_err(|e| OcraError::InvalidSecretMaterial(format!("invalid Base64: {e}")))?;
        let material = Self::from_bytes(&bytes);
        bytes.zeroize();
        Ok(material)
    }

    /// Borrow the raw secret bytes.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        self.inner.expose_secret()
    }

    /// Lowercase hex rendering, used at the persistence boundary.
    #[must_use]
    pub fn as_hex(&self) -> String {
        HEXLOWER.encode(self.expose())
    }

    /// Secret length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.expose().len()
    }

    /// Returns `true` if the secret holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }
}

impl Clone for SecretMaterial {
    fn clone(&self) -> Self {
        Self::from_bytes(self.expose())
    }
}

impl PartialEq for SecretMaterial {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq(self.expose(), other.expose())
    }
}

impl Eq for SecretMaterial {}

impl fmt::Debug for SecretMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretMaterial(***)")
    }
}

impl fmt::Display for SecretMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretMaterial(***)")
    }
}

/// Normalize a hex string: trim, strip a `0x`/`0X` prefix, drop interior
/// whitespace, fold to lowercase.
///
/// # Errors
///
/// Returns [`OcraError::InvalidSecretMaterial`] when the result is empty,
/// has odd length, or contains a non-hex character.
pub(crate) fn normalize_hex(value: &str) -> Result<String, OcraError> {
    let trimmed = value.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let normalized: String = trimmed
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if normalized.is_empty() {
        return Err(OcraError::InvalidSecretMaterial(
            "hex value must not be empty".to_owned(),
        ));
    }
    if normalized.len() % 2 != 0 {
        return Err(OcraError::InvalidSecretMaterial(
            "hex value must contain an even number of characters".to_owned(),
        ));
    }
    if let Some(bad) = normalized.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(OcraError::InvalidSecretMaterial(format!(
            "hex value contains non-hex character {bad:?}"
        )));
    }
    Ok(normalized)
}
