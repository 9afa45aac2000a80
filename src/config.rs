//! Environment configuration.
//!
//! Values come from the process environment, falling back to a `.env` file in
//! the working directory. The real environment always wins.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use agent_gateway_gemini::{DEFAULT_GEMINI_MODEL, GEMINI_PROVIDER_ID};
use agent_gateway_mock::MOCK_PROVIDER_ID;
use thiserror::Error;

pub const PROVIDER_ENV_VAR: &str = "HUNTER_PROVIDER";
pub const API_KEY_ENV_VAR: &str = "GOOGLE_API_KEY";
pub const MODEL_ENV_VAR: &str = "HUNTER_GEMINI_MODEL";
pub const BASE_URL_ENV_VAR: &str = "HUNTER_GEMINI_BASE_URL";
pub const TIMEOUT_ENV_VAR: &str = "HUNTER_GEMINI_TIMEOUT_SEC";
pub const SYSTEM_INSTRUCTIONS_ENV_VAR: &str = "HUNTER_SYSTEM_INSTRUCTIONS";
pub const LOG_FILE_ENV_VAR: &str = "HUNTER_LOG_FILE";
pub const LOG_FILTER_ENV_VAR: &str = "RUST_LOG";

pub const DEFAULT_MODEL: &str = DEFAULT_GEMINI_MODEL;
pub const DEFAULT_LOG_FILTER: &str = "info";
pub const DEFAULT_SYSTEM_INSTRUCTIONS: &str =
    "You are Hunter, a concise and friendly assistant. Use the calculator tool for any arithmetic instead of computing it yourself, and say so plainly when you cannot help.";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GOOGLE_API_KEY not found. Set it in the environment or in a .env file")]
    MissingApiKey,
    #[error("unsupported provider '{0}'. Available providers: gemini, mock")]
    UnknownProvider(String),
    #[error("HUNTER_GEMINI_TIMEOUT_SEC must be a whole number of seconds > 0, got '{0}'")]
    InvalidTimeout(String),
    #[error("failed to read {}: {source}", .path.display())]
    DotEnv {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    Mock,
}

impl ProviderKind {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            GEMINI_PROVIDER_ID => Ok(Self::Gemini),
            MOCK_PROVIDER_ID => Ok(Self::Mock),
            _ => Err(ConfigError::UnknownProvider(value.trim().to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => GEMINI_PROVIDER_ID,
            Self::Mock => MOCK_PROVIDER_ID,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunterConfig {
    pub provider: ProviderKind,
    /// Present whenever `provider` is `Gemini`.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub system_instructions: String,
    pub log_file: Option<PathBuf>,
    pub log_filter: String,
}

impl HunterConfig {
    /// Reads the process environment plus `./.env` when it exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        let dotenv_path = Path::new(".env");
        let file = if dotenv_path.is_file() {
            load_dotenv_file(dotenv_path)?
        } else {
            HashMap::new()
        };

        Self::from_lookup(|key| env::var(key).ok().or_else(|| file.get(key).cloned()))
    }

    /// Builds and validates a config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |key: &str| non_blank(lookup(key));

        let provider = match value(PROVIDER_ENV_VAR) {
            Some(raw) => ProviderKind::parse(&raw)?,
            None => ProviderKind::Gemini,
        };

        let api_key = value(API_KEY_ENV_VAR).map(|key| key.trim().to_string());
        if provider == ProviderKind::Gemini && api_key.is_none() {
            return Err(ConfigError::MissingApiKey);
        }

        let timeout = value(TIMEOUT_ENV_VAR)
            .map(|raw| parse_timeout(&raw))
            .transpose()?;

        Ok(Self {
            provider,
            api_key,
            model: value(MODEL_ENV_VAR)
                .map(|model| model.trim().to_string())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: value(BASE_URL_ENV_VAR).map(|url| url.trim().to_string()),
            timeout,
            system_instructions: value(SYSTEM_INSTRUCTIONS_ENV_VAR)
                .map(|text| text.trim().to_string())
                .unwrap_or_else(|| DEFAULT_SYSTEM_INSTRUCTIONS.to_string()),
            log_file: value(LOG_FILE_ENV_VAR).map(PathBuf::from),
            log_filter: value(LOG_FILTER_ENV_VAR)
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        })
    }
}

/// Parses a `.env` file into a map without touching the process environment.
pub fn load_dotenv_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let dotenv_error = |source| ConfigError::DotEnv {
        path: path.to_path_buf(),
        source,
    };

    let mut values = HashMap::new();
    for item in dotenvy::from_path_iter(path).map_err(dotenv_error)? {
        let (key, value) = item.map_err(dotenv_error)?;
        values.insert(key, value);
    }

    Ok(values)
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(seconds) if seconds > 0 => Ok(Duration::from_secs(seconds)),
        _ => Err(ConfigError::InvalidTimeout(raw.trim().to_string())),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn gemini_defaults_apply_when_only_the_key_is_set() {
        let config = HunterConfig::from_lookup(lookup_from(&[(API_KEY_ENV_VAR, " secret ")]))
            .expect("valid config");

        assert_eq!(
            config,
            HunterConfig {
                provider: ProviderKind::Gemini,
                api_key: Some("secret".to_string()),
                model: "gemini-1.5-flash".to_string(),
                base_url: None,
                timeout: None,
                system_instructions: DEFAULT_SYSTEM_INSTRUCTIONS.to_string(),
                log_file: None,
                log_filter: "info".to_string(),
            }
        );
    }

    #[test]
    fn missing_key_is_fatal_only_for_gemini() {
        let error = HunterConfig::from_lookup(lookup_from(&[])).expect_err("key required");
        assert!(matches!(error, ConfigError::MissingApiKey));
        assert!(error.to_string().contains("GOOGLE_API_KEY"));

        let config = HunterConfig::from_lookup(lookup_from(&[(PROVIDER_ENV_VAR, "Mock")]))
            .expect("mock needs no key");
        assert_eq!(config.provider, ProviderKind::Mock);
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn overrides_are_trimmed_and_blank_values_fall_back() {
        let config = HunterConfig::from_lookup(lookup_from(&[
            (API_KEY_ENV_VAR, "k"),
            (MODEL_ENV_VAR, " gemini-2.0-flash "),
            (BASE_URL_ENV_VAR, "http://localhost:8080/v1beta"),
            (TIMEOUT_ENV_VAR, "45"),
            (SYSTEM_INSTRUCTIONS_ENV_VAR, "   "),
            (LOG_FILE_ENV_VAR, "/tmp/hunter.log"),
            (LOG_FILTER_ENV_VAR, "hunter=debug"),
        ]))
        .expect("valid config");

        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:8080/v1beta"));
        assert_eq!(config.timeout, Some(Duration::from_secs(45)));
        assert_eq!(config.system_instructions, DEFAULT_SYSTEM_INSTRUCTIONS);
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/hunter.log")));
        assert_eq!(config.log_filter, "hunter=debug");
    }

    #[test]
    fn invalid_provider_and_timeout_are_rejected() {
        let error = HunterConfig::from_lookup(lookup_from(&[(PROVIDER_ENV_VAR, "openai")]))
            .expect_err("unknown provider");
        assert!(error.to_string().contains("unsupported provider 'openai'"));

        for raw in ["0", "-3", "soon"] {
            let error = HunterConfig::from_lookup(lookup_from(&[
                (API_KEY_ENV_VAR, "k"),
                (TIMEOUT_ENV_VAR, raw),
            ]))
            .expect_err("bad timeout");
            assert!(matches!(error, ConfigError::InvalidTimeout(value) if value == raw));
        }
    }

    #[test]
    fn dotenv_file_values_are_loaded_without_touching_the_environment() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "# local settings").expect("write");
        writeln!(file, "HUNTER_PROVIDER=mock").expect("write");
        writeln!(file, "HUNTER_GEMINI_MODEL=\"gemini-from-file\"").expect("write");

        let values = load_dotenv_file(file.path()).expect("parse .env");
        let config = HunterConfig::from_lookup(|key| values.get(key).cloned()).expect("config");

        assert_eq!(config.provider, ProviderKind::Mock);
        assert_eq!(config.model, "gemini-from-file");
        assert!(env::var("HUNTER_GEMINI_MODEL").is_err());
    }

    #[test]
    fn unreadable_dotenv_reports_its_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("absent.env");

        let error = load_dotenv_file(&missing).expect_err("missing file");

        assert!(error.to_string().contains("absent.env"));
    }
}
