use thiserror::Error;

/// Errors raised while assembling process configuration.
///
/// Every variant is fatal: the process refuses to start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required secret '{0}' (set it in the environment or .env)")]
    MissingSecret(String),

    #[error("failed to read config file {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("invalid config file {path}: {reason}")]
    Invalid { path: String, reason: String },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Errors from chat platform operations.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("platform API error: {0}")]
    Api(String),

    #[error("malformed update: {0}")]
    MalformedUpdate(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingSecret("GEMINI_API_KEY".to_string());
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_channel_error_display() {
        let err = ChannelError::Api("Bad Request: chat not found".to_string());
        assert_eq!(err.to_string(), "platform API error: Bad Request: chat not found");
    }
}
