use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use flume::{Receiver, Sender};
use tokio::task::JoinHandle;

use crate::activity::{note, spawn_event_bridge, ActivityLog};
use crate::agent::generator::{GenerationOutcome, ReplyGenerator};
use crate::agent::{Agent, AgentEvent, CycleOutcome};
use crate::config::BotConfig;
use crate::forum::reddit::RedditForum;
use crate::forum::Forum;
use crate::http_client::build_http_client;
use crate::keepalive::spawn_self_ping;
use crate::llm_client::{CohereClient, CompletionService};
use crate::memory::{FileSeenStore, SeenStore};
use crate::prompt::{PromptTemplate, RedditorPrompt};
use crate::server::serve_liveness;

pub struct BotRuntime {
    pub config: BotConfig,
    pub agent: Arc<Agent>,
    pub http: reqwest::Client,
}

/// Wires config into concrete clients. Any backend can be swapped before `build`.
pub struct BotRuntimeBuilder {
    config: BotConfig,
    event_tx: Sender<AgentEvent>,
    forum: Option<Arc<dyn Forum>>,
    completion: Option<Arc<dyn CompletionService>>,
    store: Option<Arc<dyn SeenStore>>,
    template: Option<Arc<dyn PromptTemplate>>,
}

impl BotRuntimeBuilder {
    pub fn new(config: BotConfig, event_tx: Sender<AgentEvent>) -> Self {
        Self {
            config,
            event_tx,
            forum: None,
            completion: None,
            store: None,
            template: None,
        }
    }

    pub fn with_forum(mut self, forum: Arc<dyn Forum>) -> Self {
        self.forum = Some(forum);
        self
    }

    pub fn with_completion(mut self, completion: Arc<dyn CompletionService>) -> Self {
        self.completion = Some(completion);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn SeenStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_template(mut self, template: Arc<dyn PromptTemplate>) -> Self {
        self.template = Some(template);
        self
    }

    pub fn build(self) -> Result<BotRuntime> {
        let config = self.config;
        let http = build_http_client(&config.reddit.user_agent, Some(config.http_timeout()))?;

        let forum = self
            .forum
            .unwrap_or_else(|| Arc::new(RedditForum::new(config.reddit.clone(), http.clone())));
        tracing::info!("Forum {} enabled: r/{}", forum.name(), config.subreddit);

        let store = self.store.unwrap_or_else(|| {
            let file_store = FileSeenStore::new(&config.seen_path);
            tracing::info!("Seen-set file: {:?}", file_store.path());
            Arc::new(file_store)
        });

        let generator = build_generator(&config, &http, self.completion, self.template);

        let agent = Arc::new(Agent::new(
            config.cycle_config(),
            forum,
            store,
            generator,
            self.event_tx,
        ));

        Ok(BotRuntime {
            config,
            agent,
            http,
        })
    }
}

fn build_generator(
    config: &BotConfig,
    http: &reqwest::Client,
    completion: Option<Arc<dyn CompletionService>>,
    template: Option<Arc<dyn PromptTemplate>>,
) -> ReplyGenerator {
    let completion = completion.unwrap_or_else(|| {
        let client = CohereClient::new(
            config.cohere.api_url.clone(),
            config.cohere.api_key.clone(),
            config.cohere.model.clone(),
            http.clone(),
        );
        tracing::info!("Generation backend: Cohere ({})", client.model());
        Arc::new(client)
    });
    let template = template.unwrap_or_else(|| {
        Arc::new(RedditorPrompt::new(
            config.subreddit.clone(),
            config.style.clone(),
        ))
    });
    ReplyGenerator::new(completion, template, config.generation.clone())
}

/// Generator only, for previews that never touch Reddit.
pub fn standalone_generator(config: &BotConfig) -> Result<ReplyGenerator> {
    let http = build_http_client(&config.reddit.user_agent, Some(config.http_timeout()))?;
    Ok(build_generator(config, &http, None, None))
}

/// Generate a reply for `question` without posting it, journaling both sides.
pub async fn preview_reply(
    generator: &ReplyGenerator,
    question: &str,
    journal: Option<&ActivityLog>,
) -> GenerationOutcome {
    tracing::info!("Question: {}", question);
    note(journal, &format!("Question: {}", question)).await;

    let outcome = generator.generate(question).await;
    match &outcome {
        GenerationOutcome::Reply(reply) => {
            tracing::info!("Response: {}", reply);
            note(journal, &format!("Response: {}", reply)).await;
        }
        GenerationOutcome::NoReply(reason) => {
            note(journal, &format!("Error: no reply ({:?})", reason)).await;
        }
    }
    outcome
}

impl BotRuntime {
    pub fn bootstrap(config: BotConfig, event_tx: Sender<AgentEvent>) -> Result<Self> {
        BotRuntimeBuilder::new(config, event_tx).build()
    }

    pub fn spawn_agent_loop(&self) -> JoinHandle<()> {
        let agent = self.agent.clone();
        tokio::spawn(async move { agent.run_loop().await })
    }

    pub fn spawn_self_ping(&self) -> Option<JoinHandle<()>> {
        let base_url = self.config.self_ping_url.clone()?;
        Some(spawn_self_ping(
            self.http.clone(),
            base_url,
            Duration::from_secs(self.config.self_ping_interval_secs.max(1)),
        ))
    }

    fn journal(&self) -> Option<ActivityLog> {
        let journal = self.config.activity_log_path.as_ref().map(ActivityLog::new);
        if let Some(journal) = &journal {
            tracing::info!("Activity log: {:?}", journal.path());
        }
        journal
    }

    /// One cycle with the journal attached. Returns after every event is written.
    pub async fn run_once(self, event_rx: Receiver<AgentEvent>) -> CycleOutcome {
        let bridge = spawn_event_bridge(event_rx, self.journal());
        let outcome = self.agent.run_cycle().await;

        // The agent owns the last sender; dropping it lets the bridge drain and stop.
        drop(self);
        if let Err(e) = bridge.await {
            tracing::warn!("Activity bridge stopped abnormally: {}", e);
        }
        outcome
    }

    /// Run the posting loop, liveness server and self-ping until Ctrl-C.
    pub async fn serve(self, event_rx: Receiver<AgentEvent>) -> Result<()> {
        let bind_addr = self.config.bind_addr()?;

        spawn_event_bridge(event_rx, self.journal());
        let agent_loop = self.spawn_agent_loop();
        let self_ping = self.spawn_self_ping();

        let result = tokio::select! {
            result = serve_liveness(bind_addr) => result,
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for shutdown signal")?;
                tracing::info!("Shutdown requested");
                Ok(())
            }
        };

        agent_loop.abort();
        if let Some(handle) = self_ping {
            handle.abort();
        }
        result
    }
}
