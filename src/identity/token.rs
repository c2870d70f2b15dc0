//! Strong name public key tokens.

use std::fmt;

use sha1::{Digest, Sha1};

use crate::Result;

/// The 8-byte token identifying the public key a module was signed with.
///
/// Displayed as 16 lowercase hex digits in byte order, which is the form used in
/// display names (`PublicKeyToken=b77a5c561934e089`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKeyToken([u8; 8]);

impl PublicKeyToken {
    /// Create a token from its raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Derive the token of a full public key.
    ///
    /// The token is the last eight bytes of the SHA-1 digest of the key, in reverse
    /// order.
    #[must_use]
    pub fn from_public_key(public_key: &[u8]) -> Self {
        let digest = Sha1::digest(public_key);

        let mut bytes = [0u8; 8];
        for (i, byte) in digest.iter().rev().take(8).enumerate() {
            bytes[i] = *byte;
        }
        Self(bytes)
    }

    /// Parse a token from 16 hex digits.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the input is not exactly 16 hex digits.
    pub fn parse(value: &str) -> Result<Self> {
        if value.len() != 16 || !value.is_ascii() {
            return Err(malformed_error!(
                "PublicKeyToken must be exactly 16 hex characters, got '{}'",
                value
            ));
        }

        let mut bytes = [0u8; 8];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = &value[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16)
                .map_err(|_| malformed_error!("Invalid hex in PublicKeyToken '{}'", value))?;
        }
        Ok(Self(bytes))
    }

    /// The raw token bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Display for PublicKeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}
