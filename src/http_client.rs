use std::time::Duration;

use anyhow::{Context, Result};

/// Build the shared HTTP client used for Reddit, generation and self-ping calls.
///
/// System proxy discovery is opt-in via `REPLYBOT_ENABLE_SYSTEM_PROXY`; when it
/// fails we fall back to a direct client instead of aborting startup.
pub fn build_http_client(user_agent: &str, timeout: Option<Duration>) -> Result<reqwest::Client> {
    let allow_system_proxy = std::env::var("REPLYBOT_ENABLE_SYSTEM_PROXY")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    if allow_system_proxy {
        match attempt_build(user_agent, timeout, false) {
            Ok(client) => return Ok(client),
            Err(e) => tracing::warn!(
                "HTTP client initialization with system proxy failed ({}); retrying with no_proxy",
                e
            ),
        }
    }

    attempt_build(user_agent, timeout, true).context("Failed to initialize HTTP client")
}

fn attempt_build(
    user_agent: &str,
    timeout: Option<Duration>,
    no_proxy: bool,
) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder().user_agent(user_agent.to_string());
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout).connect_timeout(timeout);
    }
    if no_proxy {
        builder = builder.no_proxy();
    }
    builder.build()
}
