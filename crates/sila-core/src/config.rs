use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_MODEL: &str = "gemini-pro";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1";

/// Language used for assistant-visible error explanations and UI labels.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    #[serde(rename = "ar")]
    Arabic,
    #[serde(rename = "en")]
    English,
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ar" | "arabic" => Ok(Language::Arabic),
            "en" | "english" => Ok(Language::English),
            other => Err(format!("unsupported language '{other}' (expected ar or en)")),
        }
    }
}

/// External synthesiser invocation and narration parameters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SpeechConfig {
    pub program: String,
    pub args: Vec<String>,
    pub locale: String,
    pub rate: f32,
    pub pitch: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            program: "espeak-ng".to_string(),
            args: ["-v", "{voice}", "-s", "{rate}", "-p", "{pitch}", "{text}"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            locale: "ar-SA".to_string(),
            rate: 0.85,
            pitch: 1.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Gemini access key. Without one every request resolves to a
    /// configuration error.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub language: Language,
    pub speech_enabled: bool,
    pub speech: SpeechConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            language: Language::default(),
            speech_enabled: true,
            speech: SpeechConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the config file (defaults when missing), then applies `.env`
    /// and process environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut config = Self::load_from(&Self::get_config_path()?)?;
        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Environment wins over the file. Empty values are treated as unset.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = var("GEMINI_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(model) = var("SILA_MODEL") {
            self.model = model;
        }
        if let Some(base_url) = var("SILA_BASE_URL") {
            self.base_url = base_url;
        }
        if let Some(language) = var("SILA_LANGUAGE").and_then(|l| l.parse().ok()) {
            self.language = language;
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    fn get_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("sila").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults_without_credential() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert!(!config.has_api_key());
        assert_eq!(config.speech.locale, "ar-SA");
        assert_eq!(config.speech.rate, 0.85);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"api_key": "file-key", "model": "gemini-1.5-flash", "language": "en"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("file-key"));
        assert_eq!(config.model, "gemini-1.5-flash");
        assert_eq!(config.language, Language::English);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.speech_enabled);
    }

    #[test]
    fn test_malformed_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_env_overrides_file_and_ignores_blank_values() {
        let mut config = Config::new();
        config.api_key = Some("file-key".to_string());

        let env: HashMap<&str, &str> = [
            ("GEMINI_API_KEY", "env-key"),
            ("SILA_MODEL", "  "),
            ("SILA_LANGUAGE", "english"),
        ]
        .into_iter()
        .collect();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.api_key.as_deref(), Some("env-key"));
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.language, Language::English);
    }

    #[test]
    fn test_language_parsing() {
        assert_eq!("ar".parse::<Language>(), Ok(Language::Arabic));
        assert_eq!(" English ".parse::<Language>(), Ok(Language::English));
        assert!("fr".parse::<Language>().unwrap_err().contains("fr"));
    }
}
