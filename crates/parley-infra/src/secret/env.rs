//! Environment variable secret provider.
//!
//! Read-only: secrets are set through the shell, the hosting platform, or a
//! `.env` file loaded at startup. Blank values are treated as unset.

use secrecy::SecretString;

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub struct EnvSecretProvider {
    lookup: Lookup,
}

impl EnvSecretProvider {
    /// Provider backed by the real process environment.
    pub fn new() -> Self {
        // Non-unicode values are treated as not found: secrets must be
        // valid strings.
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Provider backed by an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            lookup: Box::new(lookup),
        }
    }

    /// Fetch `key`, trimmed. `None` when unset or blank.
    pub fn get(&self, key: &str) -> Option<SecretString> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(SecretString::from)
    }
}

impl Default for EnvSecretProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_get_trims_value() {
        let provider = EnvSecretProvider::from_lookup(|_| Some("  tok \n".to_string()));
        assert_eq!(provider.get("ANY").unwrap().expose_secret(), "tok");
    }

    #[test]
    fn test_get_missing_and_blank_are_none() {
        let missing = EnvSecretProvider::from_lookup(|_| None);
        assert!(missing.get("ANY").is_none());

        let blank = EnvSecretProvider::from_lookup(|_| Some(String::new()));
        assert!(blank.get("ANY").is_none());
    }

    #[test]
    fn test_real_env_unset_key_is_none() {
        let provider = EnvSecretProvider::new();
        assert!(provider.get("PARLEY_TEST_SURELY_UNSET_VARIABLE_8F3A").is_none());
    }
}
