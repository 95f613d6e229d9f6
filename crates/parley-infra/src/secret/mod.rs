//! Secret resolution.
//!
//! Both credentials the proxy needs come from the process environment
//! (optionally seeded from `.env`). Values are wrapped in
//! [`secrecy::SecretString`] as soon as they are read.

pub mod env;

use secrecy::SecretString;

use parley_types::error::ConfigError;

use self::env::EnvSecretProvider;

/// Environment variable holding the Telegram bot token.
pub const TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";

/// Environment variable holding the model API key.
pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";

/// The credentials required to start.
///
/// Does NOT derive Debug; the fields are secrets.
pub struct Secrets {
    pub telegram_token: SecretString,
    pub model_api_key: SecretString,
}

impl Secrets {
    /// Resolve every required secret, reporting all missing ones at once.
    pub fn load(provider: &EnvSecretProvider) -> Result<Self, ConfigError> {
        let telegram = provider.get(TELEGRAM_BOT_TOKEN);
        let model = provider.get(GEMINI_API_KEY);

        match (telegram, model) {
            (Some(telegram_token), Some(model_api_key)) => Ok(Self {
                telegram_token,
                model_api_key,
            }),
            (telegram, model) => {
                let missing: Vec<&str> = [
                    telegram.is_none().then_some(TELEGRAM_BOT_TOKEN),
                    model.is_none().then_some(GEMINI_API_KEY),
                ]
                .into_iter()
                .flatten()
                .collect();
                Err(ConfigError::MissingSecret(missing.join(", ")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn provider(pairs: &[(&str, &str)]) -> EnvSecretProvider {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvSecretProvider::from_lookup(move |key| vars.get(key).cloned())
    }

    #[test]
    fn test_load_returns_both_secrets() {
        let secrets = Secrets::load(&provider(&[
            (TELEGRAM_BOT_TOKEN, "123:abc"),
            (GEMINI_API_KEY, "g-key"),
        ]))
        .unwrap();
        assert_eq!(secrets.telegram_token.expose_secret(), "123:abc");
        assert_eq!(secrets.model_api_key.expose_secret(), "g-key");
    }

    #[test]
    fn test_load_names_every_missing_secret() {
        let err = Secrets::load(&provider(&[])).err().unwrap();
        let msg = err.to_string();
        assert!(msg.contains(TELEGRAM_BOT_TOKEN));
        assert!(msg.contains(GEMINI_API_KEY));
    }

    #[test]
    fn test_blank_secret_counts_as_missing() {
        let err = Secrets::load(&provider(&[
            (TELEGRAM_BOT_TOKEN, "123:abc"),
            (GEMINI_API_KEY, "   "),
        ]))
        .err()
        .unwrap();
        assert!(matches!(err, ConfigError::MissingSecret(ref k) if k == GEMINI_API_KEY));
    }
}
