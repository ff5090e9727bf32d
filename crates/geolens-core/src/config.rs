use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;
pub const DEFAULT_CONFIG_PATH: &str = "geolens.yaml";
pub const DEFAULT_STORE_DIR: &str = ".geolens";

/// Everything the binary needs, resolved once at startup and passed down.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, rename = "configVersion", alias = "version")]
    pub version: u32,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub files: FileSettings,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<ProviderSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Fs,
    Sqlite,
    Github,
    Memory,
}

impl StoreBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fs" | "file" | "local" => Some(StoreBackend::Fs),
            "sqlite" => Some(StoreBackend::Sqlite),
            "github" | "gh" => Some(StoreBackend::Github),
            "memory" | "mem" => Some(StoreBackend::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Directory for `fs`, database file for `sqlite`.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// GitHub Enterprise API root, e.g. `https://github.example.com/api/v3`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_root: Option<String>,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Fs,
            path: default_store_path(),
            repo: None,
            branch: None,
            api_root: None,
            token_env: default_token_env(),
            token: None,
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_DIR)
}

fn default_token_env() -> String {
    "GH_TOKEN".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSettings {
    #[serde(default = "default_targets_file")]
    pub targets: String,
    #[serde(default = "default_history_file")]
    pub history: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            targets: default_targets_file(),
            history: default_history_file(),
        }
    }
}

fn default_targets_file() -> String {
    crate::storage::targets::DEFAULT_TARGETS_PATH.to_string()
}

fn default_history_file() -> String {
    crate::storage::history::DEFAULT_HISTORY_PATH.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Openai,
    Gemini,
}

impl ProviderKind {
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Openai => "gpt-4o",
            ProviderKind::Gemini => "gemini-1.5-flash",
        }
    }

    pub fn default_key_env(&self) -> &'static str {
        match self {
            ProviderKind::Openai => "OPENAI_API_KEY",
            ProviderKind::Gemini => "GOOGLE_API_KEY",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub name: ProviderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl ProviderSettings {
    pub fn new(name: ProviderKind) -> Self {
        Self {
            name,
            model: None,
            temperature: None,
            api_key_env: None,
            api_key: None,
        }
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(self.name.default_model())
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(0.2)
    }

    pub fn key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or(self.name.default_key_env())
    }
}

impl Settings {
    /// Providers that have an API key after environment resolution.
    pub fn enabled_providers(&self) -> Vec<&ProviderSettings> {
        self.providers
            .iter()
            .filter(|p| p.api_key.as_deref().is_some_and(|k| !k.is_empty()))
            .collect()
    }

    pub fn parallel(&self) -> usize {
        self.parallel.unwrap_or(1).max(1)
    }

    /// Apply environment overrides and secrets through `env`, then fill in
    /// defaults. Called exactly once, by the binary.
    pub fn resolve_with<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = env("GEOLENS_STORE") {
            self.store.backend = StoreBackend::parse(&v)
                .ok_or_else(|| ConfigError(format!("unknown store backend in GEOLENS_STORE: {v}")))?;
        }
        if let Some(v) = env("GEOLENS_STORE_PATH") {
            self.store.path = PathBuf::from(v);
        }
        if let Some(v) = env("GEOLENS_REPO") {
            self.store.repo = Some(v);
        }
        if let Some(v) = env("GEOLENS_PARALLEL") {
            let n = v
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError(format!("GEOLENS_PARALLEL must be a number, got {v}")))?;
            self.parallel = Some(n);
        }

        self.store.token = env(&self.store.token_env).filter(|t| !t.is_empty());
        if self.store.backend == StoreBackend::Sqlite && self.store.path == default_store_path() {
            self.store.path = default_store_path().join("geolens.db");
        }

        if self.providers.is_empty() {
            self.providers = vec![
                ProviderSettings::new(ProviderKind::Openai),
                ProviderSettings::new(ProviderKind::Gemini),
            ];
        }
        for p in &mut self.providers {
            p.api_key = env(p.key_env()).filter(|k| !k.is_empty());
        }
        Ok(())
    }

    pub fn resolve_from_env(&mut self) -> Result<(), ConfigError> {
        self.resolve_with(|k| std::env::var(k).ok())
    }
}

/// Load settings from `path`. A missing file is only an error when the caller
/// named it explicitly.
pub fn load_settings(path: &Path, explicit: bool, strict: bool) -> Result<Settings, ConfigError> {
    if !path.exists() {
        if explicit {
            return Err(ConfigError(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        return Ok(Settings::default());
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;
    parse_settings(&raw, strict)
        .map_err(|ConfigError(msg)| ConfigError(format!("{msg} (file: {})", path.display())))
}

pub fn parse_settings(raw: &str, strict: bool) -> Result<Settings, ConfigError> {
    if raw.trim().is_empty() {
        return Ok(Settings::default());
    }

    let mut ignored_keys = std::collections::BTreeSet::new();
    let deserializer = serde_yaml::Deserializer::from_str(raw);
    let cfg: Settings = serde_ignored::deserialize(deserializer, |path| {
        ignored_keys.insert(path.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;

    let meaningful: Vec<_> = ignored_keys
        .iter()
        .filter(|k| !k.starts_with('_') && !k.starts_with("x-"))
        .collect();
    if !meaningful.is_empty() {
        if strict {
            return Err(ConfigError(format!(
                "Unknown fields detected in strict mode: {:?}",
                meaningful
            )));
        }
        tracing::warn!(
            event = "geolens.config.unknown_fields",
            fields = ?meaningful,
            "ignoring unknown config fields"
        );
    }

    if cfg.version != 0 && cfg.version != SUPPORTED_CONFIG_VERSION {
        return Err(ConfigError(format!(
            "unsupported config version {} (supported: 0, {})",
            cfg.version, SUPPORTED_CONFIG_VERSION
        )));
    }
    if cfg.store.backend == StoreBackend::Github && cfg.store.repo.is_none() {
        return Err(ConfigError("store.backend github requires store.repo".into()));
    }

    Ok(cfg)
}

pub fn write_sample_config(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(
        path,
        r#"configVersion: 1
store:
  backend: fs          # fs | sqlite | github | memory
  path: .geolens
  # repo: your-org/geo-enterprise
  # token_env: GH_TOKEN
  # api_root: https://github.example.com/api/v3
files:
  targets: tracking_config.json
  history: history.csv
providers:
  - name: openai
    model: gpt-4o
    temperature: 0.2
  - name: gemini
    model: gemini-1.5-flash
parallel: 2
"#,
    )
    .map_err(|e| ConfigError(format!("failed to write sample config: {}", e)))?;
    Ok(())
}
