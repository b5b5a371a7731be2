//! PIN credentials and their one-way hash.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand::rngs::OsRng;

use pinledger_core::{DomainError, DomainResult};

/// A plaintext PIN: exactly six ASCII digits.
///
/// Never printed: `Debug` is redacted and there is no `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct Pin(String);

impl Pin {
    pub const LEN: usize = 6;

    pub fn parse(raw: impl AsRef<str>) -> DomainResult<Self> {
        let raw = raw.as_ref();
        if raw.len() != Self::LEN || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::validation("PIN must be exactly 6 digits"));
        }
        Ok(Self(raw.to_string()))
    }

    /// Hash with Argon2id and a fresh random salt.
    pub fn hash(&self) -> DomainResult<PinHash> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(self.0.as_bytes(), &salt)
            .map_err(|e| DomainError::system(format!("failed to hash PIN: {e}")))?
            .to_string();
        Ok(PinHash(hash))
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl core::fmt::Debug for Pin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Pin(******)")
    }
}

/// Stored PIN hash (PHC string format).
#[derive(Clone, PartialEq, Eq)]
pub struct PinHash(String);

impl PinHash {
    /// Wrap a hash loaded from the store.
    pub fn from_stored(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `false` on mismatch and on a malformed stored hash.
    pub fn verify(&self, pin: &Pin) -> bool {
        let Ok(parsed) = PasswordHash::new(&self.0) else {
            return false;
        };
        Argon2::default()
            .verify_password(pin.as_bytes(), &parsed)
            .is_ok()
    }
}

impl core::fmt::Debug for PinHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PinHash(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_must_be_six_digits() {
        assert!(Pin::parse("12345").is_err());
        assert!(Pin::parse("1234567").is_err());
        assert!(Pin::parse("12a456").is_err());
        assert!(Pin::parse("").is_err());
        assert!(Pin::parse("000000").is_ok());
    }

    #[test]
    fn hash_verifies_only_the_original_pin() {
        let pin = Pin::parse("123456").unwrap();
        let hash = pin.hash().unwrap();

        assert!(hash.as_str().starts_with("$argon2id$"));
        assert!(hash.verify(&pin));
        assert!(!hash.verify(&Pin::parse("654321").unwrap()));
    }

    #[test]
    fn malformed_stored_hash_never_verifies() {
        let hash = PinHash::from_stored("not-a-phc-string");
        assert!(!hash.verify(&Pin::parse("123456").unwrap()));
    }

    #[test]
    fn debug_output_is_redacted() {
        let pin = Pin::parse("123456").unwrap();
        assert!(!format!("{pin:?}").contains("123456"));
        let hash = pin.hash().unwrap();
        assert!(!format!("{hash:?}").contains("argon2"));
    }
}
