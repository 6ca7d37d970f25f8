//! Configuration loader using figment.
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: enables TOML configuration files (`nopool.toml`, `config.toml`)
//! - `yaml-config`: enables YAML configuration files (`nopool.yaml`, `nopool.yml`, etc.)
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Profile-specific config file (`nopool.{profile}.toml` / `nopool.{profile}.yaml`)
//! 3. Main config file (`nopool.toml` / `nopool.yaml`)
//! 4. Standard variables from a `.env` file in the first search path that has one
//! 5. Standard environment variables (see below)
//! 6. Environment variables (`NOPOOL_*`)
//! 7. Programmatic overrides ([`ConfigLoader::merge`])
//!
//! The `.env` file only feeds the standard variables below. It never
//! modifies the process environment, and a non-empty process variable wins
//! over the same name in the file.
//!
//! # Standard Environment Variables
//!
//! | Variable | Key |
//! |----------|-----|
//! | `TELEGRAM_BOT_TOKEN` | `bot.token` |
//! | `ALLOWED_TELEGRAM_USER_ID` | `bot.allowed_user_id` |
//! | `HTTPS_PROXY`, `HTTP_PROXY`, `https_proxy`, `http_proxy` | `transport.proxy_url` (first non-empty wins) |
//!
//! # Environment Variable Mapping
//!
//! - `NOPOOL_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `NOPOOL_TRANSPORT__READ_TIMEOUT_MS=60000` → `transport.read_timeout_ms = 60000`
//! - `NOPOOL_TRANSPORT__STRATEGY=shared-no-idle` → `transport.strategy = "shared-no-idle"`
//!
//! # Example
//!
//! ```rust,ignore
//! use nopool_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .file("./config/nopool.toml")
//!     .load()?;
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::NoPoolConfig;

/// Environment variable holding the bot token.
pub const TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Environment variable holding the allowed user id.
pub const ALLOWED_USER_ENV: &str = "ALLOWED_TELEGRAM_USER_ID";

/// Name of the dotenv file looked up in the search paths.
pub const DOTENV_FILE: &str = ".env";

/// Proxy variables, in lookup order.
pub const PROXY_ENVS: [&str; 4] = ["HTTPS_PROXY", "HTTP_PROXY", "https_proxy", "http_proxy"];

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default)]
pub enum Profile {
    /// Development profile (default).
    #[default]
    Development,
    /// Production profile.
    Production,
    /// Custom profile name.
    Custom(String),
}

impl Profile {
    /// Returns the profile name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `NOPOOL_PROFILE`, defaulting to Development.
    pub fn from_env() -> Self {
        std::env::var("NOPOOL_PROFILE")
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    /// Programmatic overrides, merged last.
    overrides: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a new configuration loader with defaults.
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables the `.env`, standard and `NOPOOL_*` environment layers.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges a complete configuration over every other source.
    pub fn merge(mut self, config: NoPoolConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Sets a single key over every other source, e.g.
    /// `set("transport.max_in_flight", 1)`.
    pub fn set<T: serde::Serialize>(mut self, key: &str, value: T) -> Self {
        self.overrides = self.overrides.merge(Serialized::default(key, value));
        self
    }

    /// Loads and returns the configuration.
    pub fn load(self) -> ConfigResult<NoPoolConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: NoPoolConfig = figment.extract()?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            strategy = %config.transport.strategy,
            has_token = config.bot.token.is_some(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Builds the figment instance with all sources.
    fn build_figment(self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(NoPoolConfig::default()));

        if let Some(path) = &self.config_file {
            if path.exists() {
                info!(path = %path.display(), "Loading configuration file");
                figment = Self::merge_config_file(figment, path)?;
            } else {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            if let Some(vars) = self.load_dotenv() {
                figment = merge_standard_vars(figment, |name| non_empty(vars.get(name).cloned()));
            }
            figment = merge_standard_vars(figment, |name| non_empty(std::env::var(name).ok()));

            trace!("Loading environment variables with NOPOOL_ prefix");
            figment = figment.merge(Env::prefixed("NOPOOL_").ignore(&["profile"]).split("__"));
        }

        Ok(figment.merge(self.overrides))
    }

    /// Merges a single config file into the figment, dispatching on file extension.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Reads the first `.env` file found in the search paths.
    fn load_dotenv(&self) -> Option<HashMap<String, String>> {
        let path = self
            .resolve_search_paths()
            .into_iter()
            .map(|dir| dir.join(DOTENV_FILE))
            .find(|path| path.is_file())?;

        let iter = match dotenvy::from_path_iter(&path) {
            Ok(iter) => iter,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to open dotenv file");
                return None;
            }
        };

        let mut vars = HashMap::new();
        for item in iter {
            match item {
                Ok((key, value)) => {
                    vars.insert(key, value);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping malformed dotenv line");
                }
            }
        }
        debug!(path = %path.display(), count = vars.len(), "Loaded dotenv file");
        Some(vars)
    }

    /// Resolves the effective list of search paths.
    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("nopool"));
        }
        paths
    }

    /// Tries `search_paths × base_names`: the profile variant first, then
    /// the base file. Stops at the first base file found.
    #[cfg(any(feature = "toml-config", feature = "yaml-config"))]
    fn load_format_files<F>(
        &self,
        mut figment: Figment,
        search_paths: &[PathBuf],
        base_names: &[&str],
        merge_fn: F,
    ) -> (Figment, bool)
    where
        F: Fn(Figment, &Path) -> Figment,
    {
        for search_path in search_paths {
            for base_name in base_names {
                let Some((stem, ext)) = base_name.rsplit_once('.') else {
                    continue;
                };

                let profile_path =
                    search_path.join(format!("{stem}.{}.{ext}", self.profile.as_str()));
                if profile_path.exists() {
                    debug!(path = %profile_path.display(), "Loading profile-specific config");
                    figment = merge_fn(figment, &profile_path);
                }

                let base_path = search_path.join(base_name);
                if base_path.exists() {
                    info!(path = %base_path.display(), "Loading configuration file");
                    figment = merge_fn(figment, &base_path);
                    return (figment, true);
                }
            }
        }
        (figment, false)
    }

    /// Searches for and loads configuration files from search paths.
    #[allow(unused_mut)]
    fn load_config_files(&self, mut figment: Figment) -> Figment {
        let search_paths = self.resolve_search_paths();
        let mut found = false;

        #[cfg(feature = "toml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["nopool.toml", "config.toml"],
                |fig, path| fig.merge(Toml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        #[cfg(feature = "yaml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["nopool.yaml", "nopool.yml", "config.yaml", "config.yml"],
                |fig, path| fig.merge(Yaml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        if !found {
            debug!(paths = ?search_paths, "No configuration file found, using defaults");
        }
        figment
    }
}

/// Trims a variable's value, treating blank values as unset.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Maps the conventional bot and proxy variables onto config keys.
fn merge_standard_vars<F>(mut figment: Figment, lookup: F) -> Figment
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = lookup(TOKEN_ENV) {
        figment = figment.merge(Serialized::default("bot.token", token));
    }

    if let Some(raw) = lookup(ALLOWED_USER_ENV) {
        match raw.parse::<i64>() {
            Ok(id) => figment = figment.merge(Serialized::default("bot.allowed_user_id", id)),
            Err(_) => warn!(
                variable = ALLOWED_USER_ENV,
                "Ignoring non-numeric allowed user id"
            ),
        }
    }

    if let Some((name, proxy)) = PROXY_ENVS
        .iter()
        .find_map(|name| lookup(name).map(|value| (*name, value)))
    {
        debug!(variable = name, "Using proxy from environment");
        figment = figment.merge(Serialized::default("transport.proxy_url", proxy));
    }

    figment
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<NoPoolConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from a specific file, with environment overrides.
pub fn load_config_from_file(path: impl AsRef<Path>) -> ConfigResult<NoPoolConfig> {
    ConfigLoader::new().file(path).load()
}

// =============================================================================
// Tests
// =============================================================================
