pub mod reddit;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One discussion thread from the forum feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Stable identifier, unique within the forum.
    pub id: String,
    pub title: String,
    /// Locked threads cannot receive replies.
    #[serde(default)]
    pub locked: bool,
}

impl Item {
    pub fn new(id: impl Into<String>, title: impl Into<String>, locked: bool) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            locked,
        }
    }
}

/// A forum the bot can read from and reply on.
#[async_trait]
pub trait Forum: Send + Sync {
    /// Human-readable name for logs
    fn name(&self) -> &str;

    /// Newest-first window of at most `limit` threads from `community`.
    /// The returned order is authoritative.
    async fn fetch_new(&self, community: &str, limit: usize) -> Result<Vec<Item>>;

    /// Post `text` as a reply to `item`.
    async fn reply(&self, item: &Item, text: &str) -> Result<()>;
}
