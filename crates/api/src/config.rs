//! Environment configuration.
//!
//! Values are read through a lookup function rather than `std::env` directly
//! so tests can feed a plain map. [`AppConfig::from_env`] is the production
//! entry point.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use chaincast_core::cursor::RateLimitPolicy;
use chaincast_gemini::GeminiConfig;
use chaincast_pipeline::retry::RetryPolicy;
use chaincast_pipeline::DispatcherConfig;
use chaincast_twitter::{OAuthCredentials, TwitterConfig};

/// Fatal configuration problems. The binary refuses to start on either.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Reads variables and remembers every required one that is absent.
struct EnvReader<F> {
    lookup: F,
    missing: Vec<&'static str>,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn new(lookup: F) -> Self {
        Self {
            lookup,
            missing: Vec::new(),
        }
    }

    /// Trimmed value; blank counts as unset.
    fn optional(&self, var: &'static str) -> Option<String> {
        (self.lookup)(var)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&mut self, var: &'static str) -> String {
        match self.optional(var) {
            Some(value) => value,
            None => {
                self.missing.push(var);
                String::new()
            }
        }
    }

    fn parsed<T>(&self, var: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.optional(var) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
                var,
                reason: format!("'{raw}': {e}"),
            }),
        }
    }

    fn flag(&self, var: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.optional(var).map(|v| v.to_ascii_lowercase()) {
            None => Ok(default),
            Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
            Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
            Some(v) => Err(ConfigError::Invalid {
                var,
                reason: format!("'{v}' is not a boolean"),
            }),
        }
    }

    fn positive(&self, var: &'static str, default: u64) -> Result<u64, ConfigError> {
        let value: u64 = self.parsed(var, default)?;
        if value == 0 {
            return Err(ConfigError::Invalid {
                var,
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(value)
    }

    fn finish_required(&mut self) -> Result<(), ConfigError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing(std::mem::take(&mut self.missing)))
        }
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `120`).
    pub request_timeout_secs: u64,
    /// When set, `/api/cron` requires `Authorization: Bearer <secret>`.
    pub cron_secret: Option<String>,
    /// Emit JSON log lines instead of human-readable ones.
    pub json_logs: bool,
}

// ---------------------------------------------------------------------------
// Bot
// ---------------------------------------------------------------------------

/// Dispatch, collaborator and storage settings.
#[derive(Clone)]
pub struct BotConfig {
    pub database_url: String,
    pub bot_id: String,
    pub rate_limit: RateLimitPolicy,
    /// Lease TTL; derived from the outbound timings when unset.
    pub dispatch_budget_secs: Option<u64>,
    pub outbound_timeout_secs: u64,
    pub retry_backoff_ms: u64,
    pub thread_delay_ms: u64,
    pub generation_fallback: bool,
    pub gemini: GeminiConfig,
    pub twitter: TwitterConfig,
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("bot_id", &self.bot_id)
            .field("rate_limit", &self.rate_limit)
            .field("dispatch_budget_secs", &self.dispatch_budget_secs)
            .field("outbound_timeout_secs", &self.outbound_timeout_secs)
            .field("thread_delay_ms", &self.thread_delay_ms)
            .field("generation_fallback", &self.generation_fallback)
            .field("gemini", &self.gemini)
            .field("twitter", &self.twitter)
            .finish_non_exhaustive()
    }
}

impl BotConfig {
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        let mut config = DispatcherConfig::new(self.bot_id.clone(), self.rate_limit);
        config.retry = RetryPolicy {
            timeout: Duration::from_secs(self.outbound_timeout_secs),
            backoff: Duration::from_millis(self.retry_backoff_ms),
            max_attempts: 2,
        };
        config.thread_delay = Duration::from_millis(self.thread_delay_ms);
        config.dispatch_budget = match self.dispatch_budget_secs {
            Some(secs) => chrono::Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)),
            None => config.min_dispatch_budget(),
        };
        config.fallback_enabled = self.generation_fallback;
        config
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Everything the binary needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub bot: BotConfig,
}

impl AppConfig {
    /// Load from the process environment.
    ///
    /// | Env Var                       | Default                  |
    /// |-------------------------------|--------------------------|
    /// | `GEMINI_API_KEY`              | required                 |
    /// | `TWITTER_API_KEY`             | required                 |
    /// | `TWITTER_API_SECRET`          | required                 |
    /// | `TWITTER_ACCESS_TOKEN`        | required                 |
    /// | `TWITTER_ACCESS_TOKEN_SECRET` | required                 |
    /// | `DATABASE_URL`                | required                 |
    /// | `HOST`                        | `0.0.0.0`                |
    /// | `PORT`                        | `3000`                   |
    /// | `CORS_ORIGINS`                | none                     |
    /// | `REQUEST_TIMEOUT_SECS`        | `120`                    |
    /// | `CRON_SECRET`                 | none                     |
    /// | `LOG_FORMAT`                  | `pretty` (or `json`)     |
    /// | `BOT_ID`                      | `chaincast`              |
    /// | `RATE_LIMIT_MAX`              | `1`                      |
    /// | `RATE_LIMIT_WINDOW_SECS`      | `12600`                  |
    /// | `DISPATCH_BUDGET_SECS`        | worst-case attempt       |
    /// | `OUTBOUND_TIMEOUT_SECS`       | `20`                     |
    /// | `RETRY_BACKOFF_MS`            | `1000`                   |
    /// | `THREAD_DELAY_MS`             | `2000`                   |
    /// | `GENERATION_FALLBACK`         | `false`                  |
    /// | `GEMINI_MODEL`                | `gemini-2.0-flash-exp`   |
    /// | `GEMINI_API_BASE`             | Google endpoint          |
    /// | `GEMINI_TEMPERATURE`          | `0.7`                    |
    /// | `GEMINI_MAX_OUTPUT_TOKENS`    | `300`                    |
    /// | `TWITTER_API_BASE`            | `https://api.twitter.com`|
    ///
    /// An explicit `DISPATCH_BUDGET_SECS` below the worst case of one attempt
    /// is rejected: the lease would lapse while a post may still go out.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut env = EnvReader::new(lookup);

        let gemini_api_key = env.required("GEMINI_API_KEY");
        let consumer_key = env.required("TWITTER_API_KEY");
        let consumer_secret = env.required("TWITTER_API_SECRET");
        let access_token = env.required("TWITTER_ACCESS_TOKEN");
        let access_token_secret = env.required("TWITTER_ACCESS_TOKEN_SECRET");
        let database_url = env.required("DATABASE_URL");
        env.finish_required()?;

        let json_logs = match env.optional("LOG_FORMAT").as_deref() {
            None | Some("pretty") => false,
            Some("json") => true,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "LOG_FORMAT",
                    reason: format!("'{other}' is not one of pretty, json"),
                })
            }
        };

        let cors_origins: Vec<String> = env
            .optional("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        if let Some(bad) = cors_origins
            .iter()
            .find(|o| HeaderValue::from_str(o).is_err())
        {
            return Err(ConfigError::Invalid {
                var: "CORS_ORIGINS",
                reason: format!("'{}' is not a valid origin header value", bad.escape_debug()),
            });
        }

        let server = ServerConfig {
            host: env.optional("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: env.parsed("PORT", 3000)?,
            cors_origins,
            request_timeout_secs: env.positive("REQUEST_TIMEOUT_SECS", 120)?,
            cron_secret: env.optional("CRON_SECRET"),
            json_logs,
        };

        let rate_limit_max: u32 = env.parsed("RATE_LIMIT_MAX", 1)?;
        let window_secs = env.positive("RATE_LIMIT_WINDOW_SECS", 12_600)?;
        let rate_limit = RateLimitPolicy::new(
            rate_limit_max,
            chrono::Duration::seconds(i64::try_from(window_secs).unwrap_or(i64::MAX)),
        )
        .map_err(|e| ConfigError::Invalid {
            var: "RATE_LIMIT_MAX",
            reason: e.to_string(),
        })?;

        let outbound_timeout_secs = env.positive("OUTBOUND_TIMEOUT_SECS", 20)?;

        let mut gemini = GeminiConfig::new(gemini_api_key);
        if let Some(model) = env.optional("GEMINI_MODEL") {
            gemini.model = model;
        }
        if let Some(base) = env.optional("GEMINI_API_BASE") {
            gemini.api_base = base.trim_end_matches('/').to_string();
        }
        gemini.temperature = env.parsed("GEMINI_TEMPERATURE", gemini.temperature)?;
        gemini.max_output_tokens =
            env.parsed("GEMINI_MAX_OUTPUT_TOKENS", gemini.max_output_tokens)?;
        gemini.timeout = Duration::from_secs(outbound_timeout_secs);

        let mut twitter = TwitterConfig::new(OAuthCredentials {
            consumer_key,
            consumer_secret,
            access_token,
            access_token_secret,
        });
        if let Some(base) = env.optional("TWITTER_API_BASE") {
            twitter.api_base = base.trim_end_matches('/').to_string();
        }
        twitter.timeout = Duration::from_secs(outbound_timeout_secs);

        let bot = BotConfig {
            database_url,
            bot_id: env.optional("BOT_ID").unwrap_or_else(|| "chaincast".into()),
            rate_limit,
            dispatch_budget_secs: env
                .optional("DISPATCH_BUDGET_SECS")
                .map(|_| env.positive("DISPATCH_BUDGET_SECS", 1))
                .transpose()?,
            outbound_timeout_secs,
            retry_backoff_ms: env.parsed("RETRY_BACKOFF_MS", 1000)?,
            thread_delay_ms: env.parsed("THREAD_DELAY_MS", 2000)?,
            generation_fallback: env.flag("GENERATION_FALLBACK", false)?,
            gemini,
            twitter,
        };

        let dispatcher = bot.dispatcher_config();
        let required = dispatcher.min_dispatch_budget();
        if dispatcher.dispatch_budget < required {
            return Err(ConfigError::Invalid {
                var: "DISPATCH_BUDGET_SECS",
                reason: format!(
                    "{}s does not cover one attempt with retries and thread replies \
                     (at least {}s)",
                    dispatcher.dispatch_budget.num_seconds(),
                    (required.num_milliseconds() + 999) / 1000
                ),
            });
        }

        Ok(Self { server, bot })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use assert_matches::assert_matches;

    fn required_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("GEMINI_API_KEY", "g-key"),
            ("TWITTER_API_KEY", "t-key"),
            ("TWITTER_API_SECRET", "t-secret"),
            ("TWITTER_ACCESS_TOKEN", "t-token"),
            ("TWITTER_ACCESS_TOKEN_SECRET", "t-token-secret"),
            ("DATABASE_URL", "postgres://localhost/chaincast"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|var| vars.get(var).map(|v| v.to_string()))
    }

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let config = load(&required_vars()).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert!(config.server.cors_origins.is_empty());
        assert_eq!(config.server.request_timeout_secs, 120);
        assert!(config.server.cron_secret.is_none());
        assert!(!config.server.json_logs);

        assert_eq!(config.bot.bot_id, "chaincast");
        assert_eq!(config.bot.rate_limit.limit(), 1);
        assert_eq!(config.bot.rate_limit.window(), chrono::Duration::seconds(12_600));
        assert!(!config.bot.generation_fallback);
        assert_eq!(config.bot.gemini.model, "gemini-2.0-flash-exp");
        assert_eq!(config.bot.twitter.credentials.consumer_key, "t-key");
    }

    #[test]
    fn every_missing_required_var_is_reported() {
        let mut vars = required_vars();
        vars.remove("GEMINI_API_KEY");
        vars.remove("DATABASE_URL");
        vars.insert("TWITTER_API_SECRET", "   ");

        assert_eq!(
            load(&vars).unwrap_err(),
            ConfigError::Missing(vec![
                "GEMINI_API_KEY",
                "TWITTER_API_SECRET",
                "DATABASE_URL"
            ])
        );
    }

    #[test]
    fn malformed_values_are_rejected() {
        let mut vars = required_vars();
        vars.insert("RATE_LIMIT_MAX", "many");
        assert_matches!(
            load(&vars),
            Err(ConfigError::Invalid {
                var: "RATE_LIMIT_MAX",
                ..
            })
        );

        let mut vars = required_vars();
        vars.insert("RATE_LIMIT_MAX", "0");
        assert_matches!(load(&vars), Err(ConfigError::Invalid { .. }));

        let mut vars = required_vars();
        vars.insert("GENERATION_FALLBACK", "sometimes");
        assert_matches!(
            load(&vars),
            Err(ConfigError::Invalid {
                var: "GENERATION_FALLBACK",
                ..
            })
        );

        let mut vars = required_vars();
        vars.insert("CORS_ORIGINS", "http://ok.test,http://bad\u{1}.test");
        assert_matches!(
            load(&vars),
            Err(ConfigError::Invalid {
                var: "CORS_ORIGINS",
                ..
            })
        );

        let mut vars = required_vars();
        vars.insert("LOG_FORMAT", "xml");
        assert_matches!(load(&vars), Err(ConfigError::Invalid { var: "LOG_FORMAT", .. }));
    }

    #[test]
    fn overrides_flow_into_collaborator_configs() {
        let mut vars = required_vars();
        vars.insert("RATE_LIMIT_MAX", "3");
        vars.insert("RATE_LIMIT_WINDOW_SECS", "600");
        vars.insert("OUTBOUND_TIMEOUT_SECS", "7");
        vars.insert("RETRY_BACKOFF_MS", "250");
        vars.insert("THREAD_DELAY_MS", "500");
        vars.insert("DISPATCH_BUDGET_SECS", "120");
        vars.insert("GENERATION_FALLBACK", "yes");
        vars.insert("GEMINI_API_BASE", "http://localhost:9000/");
        vars.insert("CORS_ORIGINS", "http://a.test, http://b.test,");
        vars.insert("LOG_FORMAT", "json");

        let config = load(&vars).unwrap();
        assert_eq!(config.server.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert!(config.server.json_logs);
        assert_eq!(config.bot.gemini.api_base, "http://localhost:9000");
        assert_eq!(config.bot.gemini.timeout, Duration::from_secs(7));

        let dispatcher = config.bot.dispatcher_config();
        assert_eq!(dispatcher.rate_limit.limit(), 3);
        assert_eq!(dispatcher.retry.timeout, Duration::from_secs(7));
        assert_eq!(dispatcher.retry.backoff, Duration::from_millis(250));
        assert_eq!(dispatcher.thread_delay, Duration::from_millis(500));
        assert_eq!(dispatcher.dispatch_budget, chrono::Duration::seconds(120));
        assert!(dispatcher.fallback_enabled);
    }

    #[test]
    fn dispatch_budget_defaults_to_worst_case_attempt() {
        let dispatcher = load(&required_vars()).unwrap().bot.dispatcher_config();
        assert_eq!(dispatcher.dispatch_budget, dispatcher.min_dispatch_budget());
        assert_eq!(dispatcher.dispatch_budget, chrono::Duration::seconds(202));
    }

    #[test]
    fn dispatch_budget_shorter_than_one_attempt_is_rejected() {
        let mut vars = required_vars();
        vars.insert("DISPATCH_BUDGET_SECS", "60");
        assert_matches!(
            load(&vars),
            Err(ConfigError::Invalid {
                var: "DISPATCH_BUDGET_SECS",
                ..
            })
        );

        // Shorter timeouts make the same budget sufficient.
        vars.insert("OUTBOUND_TIMEOUT_SECS", "5");
        vars.insert("THREAD_DELAY_MS", "0");
        assert!(load(&vars).is_ok());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = load(&required_vars()).unwrap();
        let rendered = format!("{:?}", config.bot);
        assert!(!rendered.contains("g-key"));
        assert!(!rendered.contains("t-secret"));
        assert!(!rendered.contains("postgres://"));
    }
}
