//! Application state shared across all request handlers.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::talk::core::config::TalkConfig;
use crate::talk::core::errors::{TalkError, TalkResult};
use crate::talk::generation::{CompletionBackend, OpenAiChatClient};
use crate::talk::schema::OutputSchema;

/// Shared application state, built once at startup and never mutated.
pub struct AppState {
    /// Service configuration.
    pub config: TalkConfig,
    /// Completion backend; `None` when no credential is configured.
    pub backend: Option<Arc<dyn CompletionBackend>>,
    /// Canonical output schema used for both requests and validation.
    pub schema: OutputSchema,
    /// When the process started serving.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create the application state from configuration.
    ///
    /// A missing API key is not an error here: the server starts and `/generate`
    /// answers 503 until one is configured.
    ///
    /// # Errors
    /// Returns an error if the output schema is not strict or the HTTP client cannot be built.
    pub fn new(config: TalkConfig) -> TalkResult<Arc<Self>> {
        let backend: Option<Arc<dyn CompletionBackend>> = if config.has_api_key() {
            Some(Arc::new(OpenAiChatClient::from_config(&config)?))
        } else {
            tracing::warn!("OPENAI_API_KEY is not set; /generate will answer 503");
            None
        };
        Self::with_backend(config, backend)
    }

    /// Create the application state around an explicit backend.
    ///
    /// # Errors
    /// Returns an error if the output schema is not strict.
    pub fn with_backend(
        config: TalkConfig,
        backend: Option<Arc<dyn CompletionBackend>>,
    ) -> TalkResult<Arc<Self>> {
        let schema = OutputSchema::new(config.prompt.max_alternatives);
        schema.ensure_strict()?;

        Ok(Arc::new(Self {
            config,
            backend,
            schema,
            started_at: Utc::now(),
        }))
    }

    /// The completion backend, or a configuration error when none is set.
    ///
    /// # Errors
    /// Returns [`TalkError::Configuration`] if no credential was configured.
    pub fn backend(&self) -> TalkResult<&dyn CompletionBackend> {
        self.backend
            .as_deref()
            .ok_or_else(|| TalkError::Configuration("OPENAI_API_KEY is not configured".to_string()))
    }

    /// Whether a completion credential is configured.
    #[must_use]
    pub const fn key_configured(&self) -> bool {
        self.backend.is_some()
    }
}
