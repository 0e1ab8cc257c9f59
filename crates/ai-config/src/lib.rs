//! TOML configuration for ai.
//!
//! Reads `<config dir>/ai/config.toml` (or `$AI_CONFIG_DIR/config.toml`).
//! The gateway key may also come from `PROXYAPI_KEY`, which wins over the
//! file. A missing file is replaced by a commented template.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ai_api::Endpoints;
use ai_types::ConfigError;
use serde::{Deserialize, Serialize};

/// Environment variable holding the gateway key.
pub const API_KEY_ENV: &str = "PROXYAPI_KEY";

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "AI_CONFIG_DIR";

/// The key placeholder written into the template.
pub const KEY_PLACEHOLDER: &str = "sk-...";

pub const DEFAULT_SEARCH_MODEL: &str = "perplexity/sonar";
pub const DEFAULT_ASK_MODEL: &str = "deepseek/deepseek-v3.2";
pub const DEFAULT_CHAT_MODEL: &str = "claude-opus-4-5-20251101";

/// Default request timeout for the OpenAI-compatible clients.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const DEFAULT_CONFIG_TEMPLATE: &str = r#"# ai configuration

[api]
# Gateway key. PROXYAPI_KEY in the environment takes precedence.
proxyapi_key = "sk-..."
# native_base_url = "https://api.proxyapi.ru/anthropic"
# openai_base_url = "https://api.proxyapi.ru/openai/v1"
# relay_base_url = "https://api.proxyapi.ru/openrouter/v1"
timeout_secs = 60

[models]
search = "perplexity/sonar"
ask = "deepseek/deepseek-v3.2"
chat = "claude-opus-4-5-20251101"

[storage]
# chats_dir = "~/.local/share/ai/chats"
"#;

/// Resolved, immutable configuration for one invocation.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub endpoints: Endpoints,
    pub timeout: Duration,
    pub models: ModelSelection,
    pub chats_dir: PathBuf,
    pub config_path: PathBuf,
}

/// Model used by each command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub search: String,
    pub ask: String,
    pub chat: String,
}

/// Settings as they appear in the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub models: ModelSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiSettings {
    pub proxyapi_key: Option<String>,
    pub native_base_url: Option<String>,
    pub openai_base_url: Option<String>,
    /// Older config files call this `base_url`.
    #[serde(alias = "base_url")]
    pub relay_base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelSettings {
    pub search: Option<String>,
    pub ask: Option<String>,
    pub chat: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    pub chats_dir: Option<String>,
}

impl AppConfig {
    /// Load from the default location with the key from the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_dir().join("config.toml");
        let env_key = std::env::var(API_KEY_ENV).ok();
        Self::load_from(&path, env_key)
    }

    /// Load from `path`. `env_key`, when non-empty, overrides the file's key.
    pub fn load_from(path: &Path, env_key: Option<String>) -> Result<Self, ConfigError> {
        if !path.exists() {
            write_template(path)?;
            return Err(ConfigError::Created {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let settings: SettingsFile =
            toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let config = Self::resolve(settings, env_key, path)?;
        tracing::debug!(
            path = %path.display(),
            chats_dir = %config.chats_dir.display(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Apply defaults and precedence to parsed settings.
    pub fn resolve(
        settings: SettingsFile,
        env_key: Option<String>,
        path: &Path,
    ) -> Result<Self, ConfigError> {
        // Key: env > config file; the template placeholder counts as unset.
        let api_key = env_key
            .filter(|k| !k.trim().is_empty())
            .or(settings.api.proxyapi_key)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty() && k != KEY_PLACEHOLDER)
            .ok_or_else(|| ConfigError::MissingKey {
                key: format!(
                    "api.proxyapi_key (set {API_KEY_ENV} or edit {})",
                    path.display()
                ),
            })?;

        let defaults = Endpoints::default();
        let endpoints = Endpoints {
            native: base_url("api.native_base_url", settings.api.native_base_url, defaults.native)?,
            direct: base_url("api.openai_base_url", settings.api.openai_base_url, defaults.direct)?,
            relay: base_url("api.relay_base_url", settings.api.relay_base_url, defaults.relay)?,
        };

        let timeout_secs = settings.api.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "api.timeout_secs".into(),
                message: "must be greater than zero".into(),
            });
        }

        let models = ModelSelection {
            search: model_or(settings.models.search, DEFAULT_SEARCH_MODEL),
            ask: model_or(settings.models.ask, DEFAULT_ASK_MODEL),
            chat: model_or(settings.models.chat, DEFAULT_CHAT_MODEL),
        };

        let chats_dir = settings
            .storage
            .chats_dir
            .filter(|d| !d.trim().is_empty())
            .map(|d| expand_home(d.trim()))
            .unwrap_or_else(|| data_dir().join("chats"));

        Ok(AppConfig {
            api_key,
            endpoints,
            timeout: Duration::from_secs(timeout_secs),
            models,
            chats_dir,
            config_path: path.to_path_buf(),
        })
    }
}

fn model_or(value: Option<String>, default: &str) -> String {
    value
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn base_url(key: &str, value: Option<String>, default: String) -> Result<String, ConfigError> {
    let Some(url) = value.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()) else {
        return Ok(default);
    };
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url)
    } else {
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected an http(s) URL, got '{url}'"),
        })
    }
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs_next::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest),
        None if path == "~" => dirs_next::home_dir().unwrap_or_else(|| PathBuf::from(".")),
        None => PathBuf::from(path),
    }
}

fn write_template(path: &Path) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE).map_err(io_err)?;
    tracing::info!("Wrote default config to {}", path.display());
    Ok(())
}

/// Get the ai config directory (`$AI_CONFIG_DIR` or `<config dir>/ai`).
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ai")
}

/// Get the ai data directory (`<data dir>/ai`), home of chats and the log.
pub fn data_dir() -> PathBuf {
    dirs_next::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ai")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> SettingsFile {
        toml::from_str(toml_str).unwrap()
    }

    fn resolve(settings: SettingsFile, env_key: Option<&str>) -> Result<AppConfig, ConfigError> {
        AppConfig::resolve(
            settings,
            env_key.map(str::to_string),
            Path::new("/tmp/ai/config.toml"),
        )
    }

    #[test]
    fn test_template_parses_to_placeholder_key() {
        let settings = parse(DEFAULT_CONFIG_TEMPLATE);
        assert_eq!(settings.api.proxyapi_key.as_deref(), Some(KEY_PLACEHOLDER));
        assert_eq!(settings.api.timeout_secs, Some(60));
        assert_eq!(settings.models.search.as_deref(), Some(DEFAULT_SEARCH_MODEL));
        assert!(settings.storage.chats_dir.is_none());
    }

    #[test]
    fn test_placeholder_key_is_missing() {
        let err = resolve(parse(DEFAULT_CONFIG_TEMPLATE), None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { .. }));
        assert!(err.to_string().contains("PROXYAPI_KEY"));
    }

    #[test]
    fn test_env_key_wins_over_file() {
        let settings = parse("[api]\nproxyapi_key = \"sk-file\"\n");
        let config = resolve(settings.clone(), Some("sk-env")).unwrap();
        assert_eq!(config.api_key, "sk-env");

        let config = resolve(settings, Some("  ")).unwrap();
        assert_eq!(config.api_key, "sk-file");
    }

    #[test]
    fn test_defaults_applied() {
        let config = resolve(SettingsFile::default(), Some("sk-env")).unwrap();
        assert_eq!(config.endpoints, Endpoints::default());
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.models.search, DEFAULT_SEARCH_MODEL);
        assert_eq!(config.models.ask, DEFAULT_ASK_MODEL);
        assert_eq!(config.models.chat, DEFAULT_CHAT_MODEL);
        assert!(config.chats_dir.ends_with("chats"));
    }

    #[test]
    fn test_overrides_applied() {
        let settings = parse(
            r#"
[api]
proxyapi_key = "sk-real"
relay_base_url = "http://localhost:8080/v1"
timeout_secs = 15

[models]
chat = "openai/gpt-4o"

[storage]
chats_dir = "/var/lib/ai/chats"
"#,
        );
        let config = resolve(settings, None).unwrap();
        assert_eq!(config.endpoints.relay, "http://localhost:8080/v1");
        assert_eq!(config.endpoints.native, Endpoints::default().native);
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.models.chat, "openai/gpt-4o");
        assert_eq!(config.models.ask, DEFAULT_ASK_MODEL);
        assert_eq!(config.chats_dir, PathBuf::from("/var/lib/ai/chats"));
    }

    #[test]
    fn test_legacy_base_url_sets_relay() {
        let settings = parse(
            "[api]\nproxyapi_key = \"sk-old\"\nbase_url = \"https://relay.example.com/v1\"\n",
        );
        let config = resolve(settings, None).unwrap();
        assert_eq!(config.endpoints.relay, "https://relay.example.com/v1");
        assert_eq!(config.endpoints.direct, Endpoints::default().direct);
    }

    #[test]
    fn test_invalid_base_url() {
        let settings = parse("[api]\nnative_base_url = \"api.example.com\"\n");
        match resolve(settings, Some("sk-x")) {
            Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, "api.native_base_url"),
            other => panic!("Expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let settings = parse("[api]\ntimeout_secs = 0\n");
        assert!(matches!(
            resolve(settings, Some("sk-x")),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_expand_home() {
        let expanded = expand_home("~/chats");
        assert!(expanded.ends_with("chats"));
        assert!(!expanded.starts_with("~"));
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
    }

    #[test]
    fn test_missing_file_writes_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let err = AppConfig::load_from(&path, Some("sk-env".into())).unwrap_err();
        assert!(matches!(err, ConfigError::Created { .. }));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("proxyapi_key = \"sk-...\""));

        // Second load reads the template; the env key makes it usable.
        let config = AppConfig::load_from(&path, Some("sk-env".into())).unwrap();
        assert_eq!(config.api_key, "sk-env");
        assert_eq!(config.config_path, path);
    }

    #[test]
    fn test_parse_error_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api\nproxyapi_key = 1").unwrap();

        match AppConfig::load_from(&path, None) {
            Err(ConfigError::Parse { path: p, .. }) => assert!(p.ends_with("config.toml")),
            other => panic!("Expected Parse error, got {other:?}"),
        }
    }
}
