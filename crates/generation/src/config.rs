use std::time::Duration;

/// Default per-submit timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Default number of in-flight submissions (1 = sequential).
pub const DEFAULT_MAX_CONCURRENT: usize = 1;

/// Generation adapter configuration loaded from environment variables.
///
/// The credential is optional on purpose: a client built without one
/// still constructs, and reports `NotConfigured` when asked to work.
#[derive(Clone)]
pub struct GenerationConfig {
    /// Adapter endpoint receiving generation requests.
    pub endpoint: String,
    /// Opaque credential sent as a bearer token.
    pub credential: Option<String>,
    /// Opaque model identifier forwarded with each request.
    pub model: Option<String>,
    /// Per-submit timeout (default: `60000` ms).
    pub default_timeout_ms: u64,
    /// In-flight submission bound (default: `1`, sequential).
    pub max_concurrent_submissions: usize,
}

impl std::fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("endpoint", &self.endpoint)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("default_timeout_ms", &self.default_timeout_ms)
            .field("max_concurrent_submissions", &self.max_concurrent_submissions)
            .finish()
    }
}

/// Errors loading [`GenerationConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl GenerationConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            credential: None,
            model: None,
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            max_concurrent_submissions: DEFAULT_MAX_CONCURRENT,
        }
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default      |
    /// |-----------------------------|--------------|
    /// | `GENERATION_ENDPOINT`       | *(required)* |
    /// | `GENERATION_API_KEY`        | unset        |
    /// | `GENERATION_MODEL`          | unset        |
    /// | `GENERATION_TIMEOUT_MS`     | `60000`      |
    /// | `GENERATION_MAX_CONCURRENT` | `1`          |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let endpoint = non_empty("GENERATION_ENDPOINT").ok_or(ConfigError::Missing("GENERATION_ENDPOINT"))?;

        let default_timeout_ms = match non_empty("GENERATION_TIMEOUT_MS") {
            Some(raw) => parse_positive("GENERATION_TIMEOUT_MS", &raw)?,
            None => DEFAULT_TIMEOUT_MS,
        };

        let max_concurrent_submissions = match non_empty("GENERATION_MAX_CONCURRENT") {
            Some(raw) => parse_positive("GENERATION_MAX_CONCURRENT", &raw)? as usize,
            None => DEFAULT_MAX_CONCURRENT,
        };

        Ok(Self {
            endpoint,
            credential: non_empty("GENERATION_API_KEY"),
            model: non_empty("GENERATION_MODEL"),
            default_timeout_ms,
            max_concurrent_submissions,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}

fn parse_positive(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            var,
            reason: "must be greater than zero".into(),
        }),
        Ok(v) => Ok(v),
        Err(e) => Err(ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
    }
}
