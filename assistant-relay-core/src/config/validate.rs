//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.assistant.assistant_id.trim().is_empty() {
        errors.push("assistant.assistant_id must not be empty".to_string());
    }
    if config.assistant.api_base.trim().is_empty() {
        errors.push("assistant.api_base must not be empty".to_string());
    }
    if config.assistant.request_timeout_secs == 0 {
        errors.push("assistant.request_timeout_secs must be > 0".to_string());
    }

    if config.polling.interval_ms == 0 {
        errors.push("polling.interval_ms must be > 0".to_string());
    }
    if config.polling.max_attempts == 0 {
        errors.push("polling.max_attempts must be > 0".to_string());
    }
    if !(1..=100).contains(&config.polling.history_limit) {
        errors.push("polling.history_limit must be in [1, 100]".to_string());
    }

    if config.server.port == 0 {
        errors.push("server.port must be > 0".to_string());
    }

    let format = config.logging.format.to_ascii_lowercase();
    if format != "text" && format != "json" {
        errors.push(format!(
            "logging.format must be \"text\" or \"json\", got \"{}\"",
            config.logging.format
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.assistant.assistant_id = "asst_test".to_string();
        config
    }

    #[test]
    fn test_validate_accepts_defaults_with_assistant_id() {
        validate_config(&valid_config()).unwrap();
    }

    #[test]
    fn test_validate_requires_assistant_id() {
        let err = validate_config(&Config::default()).unwrap_err();
        assert!(err.to_string().contains("assistant.assistant_id"));
    }

    #[test]
    fn test_validate_aggregates_polling_errors() {
        let mut config = valid_config();
        config.polling.interval_ms = 0;
        config.polling.history_limit = 500;

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("polling.interval_ms"));
        assert!(err.contains("polling.history_limit"));
    }

    #[test]
    fn test_validate_rejects_unknown_log_format() {
        let mut config = valid_config();
        config.logging.format = "yaml".to_string();

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("logging.format"));
    }
}
