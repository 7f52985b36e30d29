use std::sync::Arc;

use thiserror::Error;

use crate::forum::{Forum, Item};
use crate::memory::{append_blocking, SeenStore};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Nothing was posted; the item stays eligible.
    #[error("failed to post reply to {item_id}: {source}")]
    Post { item_id: String, source: BoxError },

    /// The reply is live but the item was not recorded, so it may be picked again.
    #[error("reply to {item_id} was posted but could not be recorded: {source}")]
    Commit { item_id: String, source: BoxError },
}

impl ExecutionError {
    pub fn item_id(&self) -> &str {
        match self {
            ExecutionError::Post { item_id, .. } | ExecutionError::Commit { item_id, .. } => {
                item_id
            }
        }
    }
}

/// Posts a reply, then records the item. Never records before posting.
#[derive(Clone)]
pub struct ActionExecutor {
    forum: Arc<dyn Forum>,
    store: Arc<dyn SeenStore>,
}

impl ActionExecutor {
    pub fn new(forum: Arc<dyn Forum>, store: Arc<dyn SeenStore>) -> Self {
        Self { forum, store }
    }

    pub async fn execute(&self, item: &Item, reply: &str) -> Result<(), ExecutionError> {
        self.forum
            .reply(item, reply)
            .await
            .map_err(|e| ExecutionError::Post {
                item_id: item.id.clone(),
                source: e.into(),
            })?;

        append_blocking(self.store.clone(), item.id.clone())
            .await
            .map_err(|e| ExecutionError::Commit {
                item_id: item.id.clone(),
                source: e.into(),
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeForum, MemorySeenStore};

    #[tokio::test]
    async fn posts_then_commits() {
        let forum = Arc::new(FakeForum::new(vec![]));
        let store = Arc::new(MemorySeenStore::default());
        let executor = ActionExecutor::new(forum.clone(), store.clone());

        executor
            .execute(&Item::new("p1", "q", false), "hello")
            .await
            .unwrap();

        assert_eq!(forum.replies(), vec![("p1".to_string(), "hello".to_string())]);
        assert!(store.load().unwrap().contains("p1"));
    }

    #[tokio::test]
    async fn failed_post_leaves_store_untouched() {
        let forum = Arc::new(FakeForum::new(vec![]).fail_replies());
        let store = Arc::new(MemorySeenStore::default());
        let executor = ActionExecutor::new(forum.clone(), store.clone());

        let err = executor
            .execute(&Item::new("p1", "q", false), "hello")
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutionError::Post { .. }));
        assert_eq!(err.item_id(), "p1");
        assert!(store.load().unwrap().is_empty());
        assert_eq!(store.append_calls(), 0);
    }

    #[tokio::test]
    async fn commit_failure_after_post_is_reported() {
        let forum = Arc::new(FakeForum::new(vec![]));
        let store = Arc::new(MemorySeenStore::default().fail_appends());
        let executor = ActionExecutor::new(forum.clone(), store);

        let err = executor
            .execute(&Item::new("p1", "q", false), "hello")
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutionError::Commit { .. }));
        assert!(err.to_string().contains("posted but could not be recorded"));
        assert_eq!(forum.replies().len(), 1);
    }
}
