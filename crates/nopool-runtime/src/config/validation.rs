//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotConfig, LogOutput, LoggingConfig, NoPoolConfig, TransportConfig};

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validates the entire configuration.
pub fn validate_config(config: &NoPoolConfig) -> ConfigResult<()> {
    validate_bot_config(&config.bot)?;
    validate_transport_config(&config.transport)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validates bot settings.
fn validate_bot_config(bot: &BotConfig) -> ConfigResult<()> {
    validate_url(&bot.api_base)?;

    if let Some(token) = &bot.token
        && token.trim().is_empty()
    {
        return Err(ConfigError::validation("Bot token cannot be blank"));
    }

    Ok(())
}

/// Validates transport settings.
fn validate_transport_config(transport: &TransportConfig) -> ConfigResult<()> {
    let timeouts = [
        ("connect_timeout_ms", transport.connect_timeout_ms),
        ("read_timeout_ms", transport.read_timeout_ms),
        ("total_timeout_ms", transport.total_timeout_ms),
    ];
    for (name, value) in timeouts {
        if value == 0 {
            return Err(ConfigError::validation(format!(
                "transport.{name} must be greater than 0"
            )));
        }
    }

    if transport.max_in_flight == Some(0) {
        return Err(ConfigError::validation(
            "transport.max_in_flight must be at least 1",
        ));
    }

    if let Some(user_agent) = &transport.user_agent
        && user_agent.trim().is_empty()
    {
        return Err(ConfigError::validation("transport.user_agent cannot be blank"));
    }

    transport.proxy()?;
    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    validate_level(&logging.level, "logging.level")?;

    for (module, level) in &logging.filters {
        if module.is_empty() {
            return Err(ConfigError::validation("Log filter module cannot be empty"));
        }
        if !level.eq_ignore_ascii_case("off") {
            validate_level(level, &format!("logging.filters.{module}"))?;
        }
    }

    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    Ok(())
}

fn validate_level(level: &str, field: &str) -> ConfigResult<()> {
    if !VALID_LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
        return Err(ConfigError::validation(format!(
            "Invalid log level for {field}: {level}. Valid values are: {VALID_LOG_LEVELS:?}"
        )));
    }
    Ok(())
}

/// Validates an http(s) URL.
fn validate_url(url: &str) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::missing_field("bot.api_base"));
    }

    let valid_schemes = ["http://", "https://"];
    if !valid_schemes.iter().any(|s| url.starts_with(s)) {
        return Err(ConfigError::invalid_url(
            url,
            format!("URL must start with one of: {valid_schemes:?}"),
        ));
    }

    Ok(())
}
