//! Self-ping loop that keeps free-tier hosts from idling the process out.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;

pub fn ping_url(base_url: &str) -> String {
    format!("{}/ping", base_url.trim_end_matches('/'))
}

pub async fn ping_once(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Self-ping to {} failed", url))?;

    if !response.status().is_success() {
        anyhow::bail!("Self-ping to {} returned {}", url, response.status());
    }

    Ok(response.text().await.unwrap_or_default())
}

/// Ping `{base_url}/ping` every `interval`. Failures are logged and ignored.
pub fn spawn_self_ping(
    client: reqwest::Client,
    base_url: String,
    interval: Duration,
) -> JoinHandle<()> {
    let url = ping_url(&base_url);
    tokio::spawn(async move {
        tracing::info!("Self-ping active: {} every {}s", url, interval.as_secs());
        loop {
            tokio::time::sleep(interval).await;
            match ping_once(&client, &url).await {
                Ok(body) => tracing::debug!("Self-ping ok: {}", body.trim()),
                Err(e) => tracing::warn!("{:#}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn ping_url_strips_trailing_slash() {
        assert_eq!(ping_url("https://bot.example.com/"), "https://bot.example.com/ping");
        assert_eq!(ping_url("http://localhost:8080"), "http://localhost:8080/ping");
    }

    #[tokio::test]
    async fn ping_once_reads_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
            .expect(1)
            .mount(&server)
            .await;

        let body = ping_once(&reqwest::Client::new(), &ping_url(&server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "pong");
    }

    #[tokio::test]
    async fn ping_once_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        assert!(ping_once(&reqwest::Client::new(), &ping_url(&server.uri()))
            .await
            .is_err());
    }
}
