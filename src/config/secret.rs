//! Credential handling for enrichment API keys
//!
//! Keys are wrapped in `secrecy` containers so they are zeroed on drop and
//! never appear in `Debug` output or logs. Call `expose_secret()` only at the
//! point where a request header is built.
//!
//! # Example
//!
//! ```rust
//! use pii_detector::config::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let key = secret_string("sk-test".to_string());
//! assert_eq!(key.expose_secret().as_ref(), "sk-test");
//! assert!(!format!("{key:?}").contains("sk-test"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// String newtype that can live inside `secrecy::Secret`
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// API key held in a zeroizing, redacted container
pub type SecretString = Secret<SecretValue>;

/// Wraps a plain string
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

/// Wraps an optional plain string, dropping blank values
#[inline]
pub fn secret_string_opt(value: Option<String>) -> Option<SecretString> {
    value
        .filter(|s| !s.trim().is_empty())
        .map(|s| Secret::new(SecretValue::from(s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_secret_string_creation() {
        let secret = secret_string("sk-live-123".to_string());
        assert_eq!(secret.expose_secret().as_ref(), "sk-live-123");
    }

    #[test]
    fn test_secret_string_opt_some() {
        let secret = secret_string_opt(Some("sk-live-123".to_string()));
        assert!(secret.is_some());
        assert_eq!(secret.unwrap().expose_secret().as_ref(), "sk-live-123");
    }

    #[test]
    fn test_secret_string_opt_none_or_blank() {
        assert!(secret_string_opt(None).is_none());
        assert!(secret_string_opt(Some("   ".to_string())).is_none());
    }

    #[test]
    fn test_secret_debug_redacted() {
        let secret = secret_string("gz-secret-key".to_string());
        let debug_output = format!("{secret:?}");

        // Should not contain the actual secret
        assert!(!debug_output.contains("gz-secret-key"));
        // Should contain redaction indicator
        assert!(debug_output.contains("REDACTED") || debug_output.contains("Secret"));
    }

    #[test]
    fn test_secret_serde() {
        use serde::{Deserialize, Serialize};

        #[derive(Serialize, Deserialize)]
        struct ProviderKeys {
            api_key: SecretString,
        }

        let config = ProviderKeys {
            api_key: secret_string("test123".to_string()),
        };

        // Serialize
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("test123"));

        // Deserialize
        let deserialized: ProviderKeys = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.api_key.expose_secret().as_ref(), "test123");
    }
}
