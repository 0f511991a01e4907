//! Configuration types for the runner.
//!
//! Runtime settings come from environment variables: which oracle backend to
//! call (URL, credentials, model), how fast to tick, and where the scenario,
//! behavior tuning and template overrides live. Agent tuning itself is in the
//! behavior YAML, not here.

use std::time::Duration;

use crate::error::RunnerError;

/// Complete runner configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Oracle backend configuration.
    pub oracle: OracleConfig,
    /// Transport timeout of a single oracle call.
    pub decision_timeout: Duration,
    /// Simulation ticks per second.
    pub tick_rate_hz: u32,
    /// Scenario YAML describing the world.
    pub scenario_path: String,
    /// Optional behavior YAML; defaults apply when absent.
    pub behavior_config_path: Option<String>,
    /// Optional directory of prompt template overrides.
    pub templates_dir: Option<String>,
    /// Prompt language override. The scenario's locale wins over this, and
    /// this wins over the behavior config.
    pub locale: Option<String>,
    /// Log output format.
    pub log_format: LogFormat,
}

/// Configuration for the oracle backend.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// The backend type.
    pub backend_type: BackendType,
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    pub api_url: String,
    /// Primary credential.
    pub api_key: String,
    /// Credential rotated to once after a rate limit.
    pub secondary_api_key: Option<String>,
    /// Model identifier.
    pub model: String,
}

/// Supported oracle backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible API (works with `OpenAI`, `DeepSeek`, Ollama).
    OpenAi,
    /// Anthropic Messages API (different request format).
    Anthropic,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Pretty,
    /// One JSON object per event.
    Json,
}

impl RunnerConfig {
    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `ORACLE_BACKEND` -- backend type (`openai`, `anthropic`, ...)
    /// - `ORACLE_API_URL` -- API base URL
    /// - `ORACLE_API_KEY` -- primary API key
    /// - `ORACLE_MODEL` -- model name
    ///
    /// Optional variables:
    /// - `ORACLE_API_KEY_SECONDARY` -- credential used after a rate limit
    /// - `DECISION_TIMEOUT_MS` -- oracle call timeout in milliseconds (default 7000)
    /// - `TICK_RATE_HZ` -- ticks per second (default 20)
    /// - `SCENARIO_PATH` -- scenario file (default `scenario.yaml`)
    /// - `BEHAVIOR_CONFIG_PATH` -- behavior tuning YAML
    /// - `TEMPLATES_DIR` -- prompt template overrides
    /// - `ORACLE_LOCALE` -- prompt language (default: behavior config, `en`)
    /// - `LOG_FORMAT` -- `pretty` (default) or `json`
    pub fn from_env() -> Result<Self, RunnerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RunnerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| RunnerError::Config(format!("missing required env var {name}")))
        };

        let backend_type = parse_backend(&required("ORACLE_BACKEND")?)?;
        let oracle = OracleConfig {
            backend_type,
            api_url: required("ORACLE_API_URL")?,
            api_key: required("ORACLE_API_KEY")?,
            secondary_api_key: lookup("ORACLE_API_KEY_SECONDARY").filter(|k| !k.trim().is_empty()),
            model: required("ORACLE_MODEL")?,
        };

        let decision_timeout_ms: u64 = lookup("DECISION_TIMEOUT_MS")
            .unwrap_or_else(|| "7000".to_owned())
            .parse()
            .map_err(|e| RunnerError::Config(format!("invalid DECISION_TIMEOUT_MS: {e}")))?;

        let tick_rate_hz: u32 = lookup("TICK_RATE_HZ")
            .unwrap_or_else(|| "20".to_owned())
            .parse()
            .map_err(|e| RunnerError::Config(format!("invalid TICK_RATE_HZ: {e}")))?;
        if tick_rate_hz == 0 || tick_rate_hz > 1_000 {
            return Err(RunnerError::Config(format!(
                "TICK_RATE_HZ must be within 1..=1000, got {tick_rate_hz}"
            )));
        }

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("" | "pretty" | "text") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(RunnerError::Config(format!("unknown LOG_FORMAT: {other}")));
            }
        };

        Ok(Self {
            oracle,
            decision_timeout: Duration::from_millis(decision_timeout_ms),
            tick_rate_hz,
            scenario_path: lookup("SCENARIO_PATH").unwrap_or_else(|| "scenario.yaml".to_owned()),
            behavior_config_path: lookup("BEHAVIOR_CONFIG_PATH"),
            templates_dir: lookup("TEMPLATES_DIR"),
            locale: lookup("ORACLE_LOCALE").filter(|l| !l.trim().is_empty()),
            log_format,
        })
    }

    /// Length of one tick.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(1)
            .checked_div(self.tick_rate_hz)
            .unwrap_or(Duration::from_millis(50))
    }

    /// Transport timeout actually used for oracle calls.
    ///
    /// An agent abandons a request at its local `decision_deadline`. The
    /// call must have finished, and its answer been drained, at least one
    /// tick before that, or the agent could start a second call while the
    /// first is still running.
    pub fn dispatch_timeout(&self, decision_deadline: Duration) -> Duration {
        let ceiling = decision_deadline.saturating_sub(self.tick_period());
        self.decision_timeout.min(ceiling)
    }
}

/// Read the log format on its own, before the rest of the configuration is
/// validated, so startup errors are logged in the requested format.
pub fn log_format_from_env() -> LogFormat {
    match std::env::var("LOG_FORMAT") {
        Ok(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
        _ => LogFormat::Pretty,
    }
}

fn parse_backend(name: &str) -> Result<BackendType, RunnerError> {
    match name.to_lowercase().as_str() {
        "openai" | "deepseek" | "ollama" => Ok(BackendType::OpenAi),
        "anthropic" | "claude" => Ok(BackendType::Anthropic),
        other => Err(RunnerError::Config(format!("unknown backend type: {other}"))),
    }
}
