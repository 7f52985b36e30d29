use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{Forum, Item};
use crate::config::RedditConfig;

/// Refresh this long before the token actually expires.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

// ========================================================================
// Reddit API Types
// ========================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    kind: String,
    data: LinkData,
}

#[derive(Debug, Deserialize)]
struct LinkData {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    locked: bool,
}

#[derive(Debug, Deserialize)]
struct CommentResponse {
    json: CommentJson,
}

#[derive(Debug, Deserialize)]
struct CommentJson {
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + ChronoDuration::seconds(TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }
}

// ========================================================================
// Reddit Forum
// ========================================================================

/// Reddit "script app" client using the password grant.
pub struct RedditForum {
    config: RedditConfig,
    client: Client,
    token: Arc<RwLock<Option<AccessToken>>>,
}

impl RedditForum {
    pub fn new(config: RedditConfig, client: Client) -> Self {
        Self {
            config,
            client,
            token: Arc::new(RwLock::new(None)),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.api_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn access_token(&self) -> Result<String> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
                return Ok(token.value.clone());
            }
        }

        let mut cached = self.token.write().await;
        // Another caller may have refreshed while we waited for the write lock.
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.value.clone());
        }

        let token = self.request_token().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn request_token(&self) -> Result<AccessToken> {
        let url = format!(
            "{}/api/v1/access_token",
            self.config.auth_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", self.config.username.as_str()),
                ("password", self.config.password.as_str()),
            ])
            .send()
            .await
            .context("Failed to request Reddit access token")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Reddit token request failed: {} - {}", status, body);
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse Reddit token response (check app credentials)")?;
        tracing::debug!("Obtained Reddit access token (expires in {}s)", token.expires_in);

        Ok(AccessToken {
            value: token.access_token,
            expires_at: Utc::now() + ChronoDuration::seconds(token.expires_in),
        })
    }

    async fn invalidate_token(&self) {
        *self.token.write().await = None;
    }
}

#[async_trait]
impl Forum for RedditForum {
    fn name(&self) -> &str {
        "reddit"
    }

    async fn fetch_new(&self, community: &str, limit: usize) -> Result<Vec<Item>> {
        let token = self.access_token().await?;
        let url = self.api_url(&format!("r/{}/new", community));
        let response = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .query(&[("limit", limit.to_string()), ("raw_json", "1".to_string())])
            .send()
            .await
            .with_context(|| format!("Failed to fetch r/{}/new", community))?;

        if !response.status().is_success() {
            let status = response.status();
            if status == reqwest::StatusCode::UNAUTHORIZED {
                self.invalidate_token().await;
            }
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to fetch r/{}/new: {} - {}", community, status, body);
        }

        let listing: Listing = response
            .json()
            .await
            .context("Failed to parse subreddit listing")?;

        let items = listing
            .data
            .children
            .into_iter()
            .filter(|thing| thing.kind == "t3")
            .take(limit)
            .map(|thing| Item {
                id: thing.data.id,
                title: thing.data.title,
                locked: thing.data.locked,
            })
            .collect();

        Ok(items)
    }

    async fn reply(&self, item: &Item, text: &str) -> Result<()> {
        let token = self.access_token().await?;
        let url = self.api_url("api/comment");
        let thing_id = format!("t3_{}", item.id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .form(&[("api_type", "json"), ("thing_id", thing_id.as_str()), ("text", text)])
            .send()
            .await
            .with_context(|| format!("Failed to send reply to {}", item.id))?;

        if !response.status().is_success() {
            let status = response.status();
            if status == reqwest::StatusCode::UNAUTHORIZED {
                self.invalidate_token().await;
            }
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to reply to {}: {} - {}", item.id, status, body);
        }

        let posted: CommentResponse = response
            .json()
            .await
            .context("Failed to parse comment response")?;

        if !posted.json.errors.is_empty() {
            anyhow::bail!(
                "Reddit rejected reply to {}: {}",
                item.id,
                serde_json::Value::Array(posted.json.errors)
            );
        }

        Ok(())
    }
}
