// src/config/ai.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

pub const ENV_AI_CONFIG_PATH: &str = "VALUE_AI_CONFIG_PATH";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

fn default_provider() -> AiProviderKind {
    AiProviderKind::Gemini
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Supported text-generation backends. Parsed case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AiProviderKind {
    Gemini,
    OpenAi,
}

impl TryFrom<String> for AiProviderKind {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            other => Err(format!("unsupported provider: {other}")),
        }
    }
}

impl From<AiProviderKind> for String {
    fn from(p: AiProviderKind) -> Self {
        match p {
            AiProviderKind::Gemini => "gemini".to_string(),
            AiProviderKind::OpenAi => "openai".to_string(),
        }
    }
}

impl AiProviderKind {
    fn key_env(self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_provider")]
    pub provider: AiProviderKind,
    /// Provider-specific model name; each provider has its own default.
    #[serde(default)]
    pub model: Option<String>,
    /// "ENV" means: read from GEMINI_API_KEY / OPENAI_API_KEY (by provider).
    #[serde(default = "default_api_key")]
    pub api_key: String,
    /// Upper bound for one importance request, in seconds (1..=120).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            model: None,
            api_key: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl AiConfig {
    /// Load from a `.toml` or `.json` file and resolve the API key.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading AI config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let mut cfg: AiConfig = match ext.as_str() {
            "toml" => toml::from_str(&data)?,
            "json" => serde_json::from_str(&data)?,
            other => bail!("unsupported AI config format: {other:?}"),
        };

        // Resolve api key if "ENV" (only needed when the provider will be called)
        if cfg.enabled && cfg.api_key.trim().eq_ignore_ascii_case("env") {
            let var = cfg.provider.key_env();
            cfg.api_key = env::var(var).map_err(|_| anyhow!("Missing {var} env var"))?;
        }

        cfg.timeout_secs = cfg.timeout_secs.clamp(1, 120);
        Ok(cfg)
    }

    /// Resolve the config location:
    /// 1) $VALUE_AI_CONFIG_PATH
    /// 2) config/ai.toml
    /// 3) config/ai.json
    ///
    /// Without any file the AI estimate is disabled.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_AI_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                bail!("{ENV_AI_CONFIG_PATH} points to non-existent path");
            }
            return Self::load_from_file(&pb);
        }
        for candidate in ["config/ai.toml", "config/ai.json"] {
            let pb = PathBuf::from(candidate);
            if pb.exists() {
                return Self::load_from_file(&pb);
            }
        }
        Ok(Self::default())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.clamp(1, 120))
    }
}
