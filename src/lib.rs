pub mod activity;
pub mod agent;
pub mod config;
pub mod forum;
pub mod http_client;
pub mod keepalive;
pub mod llm_client;
pub mod memory;
pub mod prompt;
pub mod runtime;
pub mod server;

#[cfg(test)]
mod testing;
