use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::prompt::StylePolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_reddit_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_reddit_api_url")]
    pub api_url: String,
}

fn default_user_agent() -> String {
    format!("replybot/{}", env!("CARGO_PKG_VERSION"))
}

fn default_reddit_auth_url() -> String {
    "https://www.reddit.com".to_string()
}

fn default_reddit_api_url() -> String {
    "https://oauth.reddit.com".to_string()
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            username: String::new(),
            password: String::new(),
            user_agent: default_user_agent(),
            auth_url: default_reddit_auth_url(),
            api_url: default_reddit_api_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereConfig {
    #[serde(default = "default_cohere_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_cohere_model")]
    pub model: String,
}

fn default_cohere_url() -> String {
    "https://api.cohere.ai".to_string()
}

fn default_cohere_model() -> String {
    "command".to_string()
}

impl Default for CohereConfig {
    fn default() -> Self {
        Self {
            api_url: default_cohere_url(),
            api_key: String::new(),
            model: default_cohere_model(),
        }
    }
}

/// Decoding parameters sent with every generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_stop_sequences")]
    pub stop_sequences: Vec<String>,
    #[serde(default = "default_frequency_penalty")]
    pub frequency_penalty: f32,
}

fn default_max_tokens() -> u32 {
    200
}

fn default_temperature() -> f32 {
    0.97
}

fn default_stop_sequences() -> Vec<String> {
    vec!["\n\n".to_string()]
}

fn default_frequency_penalty() -> f32 {
    0.5
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            stop_sequences: default_stop_sequences(),
            frequency_penalty: default_frequency_penalty(),
        }
    }
}

/// Immutable settings handed to the cycle orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleConfig {
    pub subreddit: String,
    pub feed_limit: usize,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub reddit: RedditConfig,
    #[serde(default)]
    pub cohere: CohereConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub style: StylePolicy,

    // Target and polling
    #[serde(default = "default_subreddit")]
    pub subreddit: String,
    #[serde(default = "default_feed_limit")]
    pub feed_limit: usize,
    #[serde(default = "default_poll_interval", alias = "check_interval_seconds")]
    pub poll_interval_secs: u64,

    // Persistence
    #[serde(default = "default_seen_path")]
    pub seen_path: String,
    #[serde(default)]
    pub activity_log_path: Option<String>,

    // Liveness + keep-alive
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub self_ping_url: Option<String>,
    #[serde(default = "default_self_ping_interval")]
    pub self_ping_interval_secs: u64,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

fn default_subreddit() -> String {
    "AskReddit".to_string()
}

fn default_feed_limit() -> usize {
    10
}

fn default_poll_interval() -> u64 {
    900
}

fn default_seen_path() -> String {
    "processed_posts.txt".to_string()
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_self_ping_interval() -> u64 {
    600
}

fn default_http_timeout() -> u64 {
    30
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            reddit: RedditConfig::default(),
            cohere: CohereConfig::default(),
            generation: GenerationConfig::default(),
            style: StylePolicy::default(),
            subreddit: default_subreddit(),
            feed_limit: default_feed_limit(),
            poll_interval_secs: default_poll_interval(),
            seen_path: default_seen_path(),
            activity_log_path: None,
            bind: default_bind(),
            self_ping_url: None,
            self_ping_interval_secs: default_self_ping_interval(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

impl BotConfig {
    /// Load config from a TOML file (when present), then apply env var overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {:?}", path))?;
                let config = Self::from_toml(&contents)
                    .with_context(|| format!("Failed to parse config {:?}", path))?;
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Some(path) => {
                tracing::warn!("Config file {:?} not found, using defaults + env vars", path);
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Invalid config TOML")
    }

    /// Apply overrides from a key lookup (the process environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = non_empty("REDDIT_CLIENT_ID") {
            self.reddit.client_id = value;
        }
        if let Some(value) = non_empty("REDDIT_CLIENT_SECRET") {
            self.reddit.client_secret = value;
        }
        if let Some(value) = non_empty("REDDIT_USERNAME") {
            self.reddit.username = value;
        }
        if let Some(value) = non_empty("REDDIT_PASSWORD") {
            self.reddit.password = value;
        }
        if let Some(value) = non_empty("REDDIT_USER_AGENT") {
            self.reddit.user_agent = value;
        }
        if let Some(value) = non_empty("COHERE_API_KEY") {
            self.cohere.api_key = value;
        }
        if let Some(value) = non_empty("COHERE_MODEL") {
            self.cohere.model = value;
        }
        if let Some(value) = non_empty("BOT_SUBREDDIT") {
            self.subreddit = value.trim().trim_start_matches("r/").to_string();
        }
        if let Some(seconds) = non_empty("BOT_CHECK_INTERVAL").and_then(|v| v.trim().parse().ok()) {
            self.poll_interval_secs = seconds;
        }
        if let Some(limit) = non_empty("BOT_FEED_LIMIT").and_then(|v| v.trim().parse().ok()) {
            self.feed_limit = limit;
        }
        if let Some(value) = non_empty("BOT_SEEN_PATH") {
            self.seen_path = value;
        }
        if let Some(value) = non_empty("BOT_ACTIVITY_LOG") {
            self.activity_log_path = Some(value);
        }
        if let Some(value) = non_empty("BOT_BIND") {
            self.bind = value;
        } else if let Some(port) = non_empty("PORT").and_then(|v| v.trim().parse::<u16>().ok()) {
            // Hosting platforms hand out the port only.
            self.bind = format!("0.0.0.0:{}", port);
        }
        if let Some(value) = non_empty("SELF_PING_URL") {
            self.self_ping_url = Some(value.trim_end_matches('/').to_string());
        }
        if let Some(seconds) = non_empty("SELF_PING_INTERVAL").and_then(|v| v.trim().parse().ok()) {
            self.self_ping_interval_secs = seconds;
        }
        if let Some(seconds) = non_empty("BOT_HTTP_TIMEOUT").and_then(|v| v.trim().parse().ok()) {
            self.http_timeout_secs = seconds;
        }
    }

    /// Checks everything the posting loop needs.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.reddit.client_id.trim().is_empty() {
            missing.push("REDDIT_CLIENT_ID");
        }
        if self.reddit.client_secret.trim().is_empty() {
            missing.push("REDDIT_CLIENT_SECRET");
        }
        if self.reddit.username.trim().is_empty() {
            missing.push("REDDIT_USERNAME");
        }
        if self.reddit.password.trim().is_empty() {
            missing.push("REDDIT_PASSWORD");
        }
        if !missing.is_empty() {
            anyhow::bail!("Missing Reddit credentials: {}", missing.join(", "));
        }

        self.validate_generation()?;

        if self.subreddit.trim().is_empty() {
            anyhow::bail!("Subreddit name must not be empty");
        }
        if self.poll_interval_secs == 0 {
            anyhow::bail!("Poll interval must be at least one second");
        }
        if !(1..=100).contains(&self.feed_limit) {
            anyhow::bail!("Feed limit must be between 1 and 100 (got {})", self.feed_limit);
        }
        self.bind_addr()?;
        Ok(())
    }

    /// Checks only what reply previews need.
    pub fn validate_generation(&self) -> Result<()> {
        if self.cohere.api_key.trim().is_empty() {
            anyhow::bail!("Missing generation key: COHERE_API_KEY");
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.bind
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid bind address '{}' (expected host:port)", self.bind))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    pub fn cycle_config(&self) -> CycleConfig {
        CycleConfig {
            subreddit: self.subreddit.clone(),
            feed_limit: self.feed_limit,
            poll_interval: Duration::from_secs(self.poll_interval_secs),
        }
    }
}
