//! Configuration for the talk service, read once from the environment at startup.

use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::talk::core::errors::{TalkError, TalkResult};

/// Default characters spoken per second.
pub const DEFAULT_CHARS_PER_SEC: f64 = 6.2;

/// Default server port.
pub const DEFAULT_PORT: u16 = 8000;

/// Top-level configuration for the talk service.
#[derive(Clone, Debug)]
pub struct TalkConfig {
    /// Completion backend credential. `None` keeps the server up but disables `/generate`.
    pub openai_api_key: Option<String>,
    /// Completion backend base URL (without the `/chat/completions` suffix).
    pub base_url: String,
    /// Model identifier sent with every completion.
    pub model: String,
    /// Allowed CORS origins; a single `*` allows any origin.
    pub allowed_origins: Vec<String>,
    /// HTTP port to listen on.
    pub port: u16,
    /// Prompt construction settings.
    pub prompt: PromptConfig,
    /// Completion call settings.
    pub llm: LlmConfig,
}

impl Default for TalkConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            allowed_origins: vec!["*".to_string()],
            port: DEFAULT_PORT,
            prompt: PromptConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl TalkConfig {
    /// Load the configuration from the process environment.
    ///
    /// # Errors
    /// Returns an error if a variable is set but cannot be parsed, or if the
    /// resulting configuration is invalid.
    pub fn from_env() -> TalkResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration through an arbitrary key lookup.
    ///
    /// # Errors
    /// Returns an error if a value cannot be parsed or the configuration is invalid.
    pub fn from_lookup<F>(lookup: F) -> TalkResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Self::default();
        let config = Self {
            openai_api_key: get("OPENAI_API_KEY"),
            base_url: get("OPENAI_BASE_URL").map_or(defaults.base_url, |url| {
                url.trim_end_matches('/').to_string()
            }),
            model: get("OPENAI_MODEL").unwrap_or(defaults.model),
            allowed_origins: get("ALLOWED_ORIGINS")
                .map_or(defaults.allowed_origins, |origins| parse_origins(&origins)),
            port: parse_or("TALK_PORT", get("TALK_PORT"), defaults.port)?,
            prompt: PromptConfig {
                chars_per_sec: parse_or(
                    "CHARS_PER_SEC",
                    get("CHARS_PER_SEC"),
                    defaults.prompt.chars_per_sec,
                )?,
                max_alternatives: parse_or(
                    "TALK_MAX_ALTERNATIVES",
                    get("TALK_MAX_ALTERNATIVES"),
                    defaults.prompt.max_alternatives,
                )?,
            },
            llm: LlmConfig {
                temperature: parse_or(
                    "TALK_TEMPERATURE",
                    get("TALK_TEMPERATURE"),
                    defaults.llm.temperature,
                )?,
                max_tokens: parse_or(
                    "TALK_MAX_TOKENS",
                    get("TALK_MAX_TOKENS"),
                    defaults.llm.max_tokens,
                )?,
                timeout_secs: parse_or(
                    "TALK_TIMEOUT_SECS",
                    get("TALK_TIMEOUT_SECS"),
                    defaults.llm.timeout_secs,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Whether the completion backend credential is present.
    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.openai_api_key.is_some()
    }

    /// Whether every origin is allowed.
    #[must_use]
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> TalkResult<()> {
        if !(self.prompt.chars_per_sec.is_finite() && self.prompt.chars_per_sec > 0.0) {
            return Err(TalkError::Configuration(
                "chars_per_sec must be a positive number".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(TalkError::Configuration(
                "temperature must be within [0, 2]".to_string(),
            ));
        }

        if self.llm.max_tokens == 0 {
            return Err(TalkError::Configuration(
                "max_tokens must be > 0".to_string(),
            ));
        }

        if self.llm.timeout_secs == 0 {
            return Err(TalkError::Configuration(
                "timeout_secs must be > 0".to_string(),
            ));
        }

        if self.model.trim().is_empty() {
            return Err(TalkError::Configuration("model must not be empty".to_string()));
        }

        Url::parse(&self.base_url)?;
        Ok(())
    }
}

/// Prompt construction settings.
#[derive(Clone, Debug)]
pub struct PromptConfig {
    /// Spoken characters per second used to turn a duration into a length target.
    pub chars_per_sec: f64,
    /// Maximum alternative phrasings per script line (2 in the base schema, 0 when strict).
    pub max_alternatives: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            chars_per_sec: DEFAULT_CHARS_PER_SEC,
            max_alternatives: 2,
        }
    }
}

/// Completion call settings.
#[derive(Clone, Debug)]
pub struct LlmConfig {
    /// Sampling temperature.
    pub temperature: f64,
    /// Output token ceiling.
    pub max_tokens: u32,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            max_tokens: 4096,
            timeout_secs: 90,
        }
    }
}

impl LlmConfig {
    /// Request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> TalkResult<T> {
    value.map_or(Ok(default), |raw| {
        raw.parse()
            .map_err(|_| TalkError::Configuration(format!("{key} has an invalid value: {raw:?}")))
    })
}
