//! In-memory doubles for the forum, generation service and seen-set.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Notify;

use crate::forum::{Forum, Item};
use crate::llm_client::{CompletionService, Generation, GenerationRequest, GenerationResponse};
use crate::memory::SeenStore;

pub struct FakeForum {
    window: Mutex<Vec<Item>>,
    replies: Mutex<Vec<(String, String)>>,
    fetches: AtomicUsize,
    fail_fetch: bool,
    fail_replies: bool,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl FakeForum {
    pub fn new(window: Vec<Item>) -> Self {
        Self {
            window: Mutex::new(window),
            replies: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
            fail_fetch: false,
            fail_replies: false,
            gate: None,
        }
    }

    pub fn fail_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub fn fail_replies(mut self) -> Self {
        self.fail_replies = true;
        self
    }

    /// `fetch_new` signals `entered`, then waits on `release`.
    pub fn gated(mut self, entered: Arc<Notify>, release: Arc<Notify>) -> Self {
        self.gate = Some((entered, release));
        self
    }

    pub fn set_window(&self, window: Vec<Item>) {
        *self.window.lock().unwrap() = window;
    }

    pub fn replies(&self) -> Vec<(String, String)> {
        self.replies.lock().unwrap().clone()
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Forum for FakeForum {
    fn name(&self) -> &str {
        "fake"
    }

    async fn fetch_new(&self, _community: &str, limit: usize) -> Result<Vec<Item>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }
        if self.fail_fetch {
            anyhow::bail!("feed unavailable");
        }
        Ok(self
            .window
            .lock()
            .unwrap()
            .iter()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn reply(&self, item: &Item, text: &str) -> Result<()> {
        if self.fail_replies {
            anyhow::bail!("403 Forbidden");
        }
        self.replies
            .lock()
            .unwrap()
            .push((item.id.clone(), text.to_string()));
        Ok(())
    }
}

pub struct FakeCompletion {
    texts: Vec<String>,
    error: Option<String>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl FakeCompletion {
    pub fn replying(texts: &[&str]) -> Self {
        Self {
            texts: texts.iter().map(|t| t.to_string()).collect(),
            error: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            texts: Vec::new(),
            error: Some(message.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for FakeCompletion {
    async fn complete(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(message) = &self.error {
            anyhow::bail!("{}", message);
        }
        Ok(GenerationResponse {
            generations: self
                .texts
                .iter()
                .map(|text| Generation { text: text.clone() })
                .collect(),
        })
    }
}

#[derive(Default)]
pub struct MemorySeenStore {
    ids: Mutex<Vec<String>>,
    appends: AtomicUsize,
    fail_load: bool,
    fail_appends: bool,
}

impl MemorySeenStore {
    pub fn with_ids(ids: &[&str]) -> Self {
        let store = Self::default();
        *store.ids.lock().unwrap() = ids.iter().map(|id| id.to_string()).collect();
        store
    }

    pub fn fail_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    pub fn fail_appends(mut self) -> Self {
        self.fail_appends = true;
        self
    }

    pub fn append_calls(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }
}

impl SeenStore for MemorySeenStore {
    fn load(&self) -> Result<HashSet<String>> {
        if self.fail_load {
            anyhow::bail!("permission denied");
        }
        Ok(self.ids.lock().unwrap().iter().cloned().collect())
    }

    fn append(&self, id: &str) -> Result<()> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        if self.fail_appends {
            anyhow::bail!("disk full");
        }
        self.ids.lock().unwrap().push(id.to_string());
        Ok(())
    }
}
