//! Human-readable activity journal fed by agent events.
//!
//! Lines look like `2024-05-01 12:00:00 - Commented on abc123: idk man...`.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use flume::Receiver;

use crate::agent::{preview, AgentEvent};

#[derive(Debug, Clone)]
pub struct ActivityLog {
    path: PathBuf,
}

impl ActivityLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, message: &str) -> Result<()> {
        self.record_at(Local::now(), message)
    }

    /// `record` on the blocking pool.
    pub async fn record_blocking(&self, message: String) -> Result<()> {
        let log = self.clone();
        tokio::task::spawn_blocking(move || log.record(&message))
            .await
            .context("Activity log task failed")?
    }

    fn record_at(&self, at: DateTime<Local>, message: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open activity log {:?}", self.path))?;
        writeln!(file, "{} - {}", at.format("%Y-%m-%d %H:%M:%S"), message)
            .with_context(|| format!("Failed to write activity log {:?}", self.path))?;
        Ok(())
    }
}

/// Journal line for an event, or `None` for events not worth keeping.
pub fn describe_event(event: &AgentEvent) -> Option<String> {
    match event {
        AgentEvent::StateChanged(_) | AgentEvent::CandidateSelected { .. } => None,
        AgentEvent::Observation(text) => Some(text.clone()),
        AgentEvent::ActionTaken { item_id, reply, .. } => {
            Some(format!("Commented on {}: {}", item_id, preview(reply)))
        }
        AgentEvent::CommitAnomaly { item_id, error } => Some(format!(
            "Posted on {} but failed to record it: {}",
            item_id, error
        )),
        AgentEvent::Error(error) => Some(format!("Error: {}", error)),
    }
}

/// Write a journal line if a journal is configured; failures are only logged.
pub async fn note(journal: Option<&ActivityLog>, message: &str) {
    let Some(journal) = journal else {
        return;
    };
    if let Err(e) = journal.record_blocking(message.to_string()).await {
        tracing::warn!("Activity log write failed: {:#}", e);
    }
}

/// Drain agent events into the journal until every sender is dropped.
pub fn spawn_event_bridge(
    event_rx: Receiver<AgentEvent>,
    journal: Option<ActivityLog>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Ok(event) = event_rx.recv_async().await {
            if let Some(line) = describe_event(&event) {
                note(journal.as_ref(), &line).await;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::CycleState;
    use chrono::TimeZone;

    #[test]
    fn formats_lines_with_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let log = ActivityLog::new(dir.path().join("logs.txt"));
        let at = Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        log.record_at(at, "=== Bot Started ===").unwrap();
        log.record_at(at, "Commented on p1: hi").unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(
            contents,
            "2024-05-01 12:00:00 - === Bot Started ===\n2024-05-01 12:00:00 - Commented on p1: hi\n"
        );
    }

    #[test]
    fn describes_only_journal_worthy_events() {
        assert!(describe_event(&AgentEvent::StateChanged(CycleState::Idle)).is_none());

        let line = describe_event(&AgentEvent::ActionTaken {
            item_id: "p1".to_string(),
            title: "q".to_string(),
            reply: "x".repeat(80),
        })
        .unwrap();
        assert_eq!(line, format!("Commented on p1: {}...", "x".repeat(50)));

        assert_eq!(
            describe_event(&AgentEvent::Error("boom".to_string())).as_deref(),
            Some("Error: boom")
        );
    }

    #[tokio::test]
    async fn note_appends_and_tolerates_missing_journal() {
        let dir = tempfile::tempdir().unwrap();
        let log = ActivityLog::new(dir.path().join("logs.txt"));

        note(None, "Session started").await;
        note(Some(&log), "Session started").await;
        note(Some(&log), "Question: why").await;

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" - Session started"));
        assert!(lines[1].ends_with(" - Question: why"));
    }

    #[tokio::test]
    async fn bridge_writes_events_until_channel_closes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs.txt");
        let (tx, rx) = flume::unbounded();
        let handle = spawn_event_bridge(rx, Some(ActivityLog::new(&path)));

        tx.send(AgentEvent::StateChanged(CycleState::Loading)).unwrap();
        tx.send(AgentEvent::ActionTaken {
            item_id: "p1".to_string(),
            title: "q".to_string(),
            reply: "idk man pizza i guess lol".to_string(),
        })
        .unwrap();
        drop(tx);
        handle.await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.ends_with("- Commented on p1: idk man pizza i guess lol\n"));
    }
}
