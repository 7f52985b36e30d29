//! Prompt construction for reply generation.
//!
//! Everything here is pure: the same title, policy and forum name always yield
//! the same prompt, so it can be tested without calling the generation service.

use serde::{Deserialize, Serialize};

/// Tone, length and format instructions embedded in every prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StylePolicy {
    /// Free-text persona instruction placed in the opening frame.
    #[serde(default = "default_voice")]
    pub voice: String,
    /// Numbered rule lines appended after the frame.
    #[serde(default = "default_rules")]
    pub rules: Vec<String>,
}

fn default_voice() -> String {
    "respond exactly like a real human would - use casual language, sarcastic humor, \
     natural imperfections and relatable analogies. Avoid AI patterns and formal responses."
        .to_string()
}

fn default_rules() -> Vec<String> {
    [
        "Maximum 200 tokens (about 40 words)",
        "End responses naturally",
        "Keep responses SHORT (max 1-3 sentences)",
        "Sound like a real human comment, not AI",
        "Use internet slang",
        "No perfect grammar",
        "No lists or bullet points",
        "Respond like a sarcastic Reddit veteran",
        "Use 80% lowercase letters",
        "Use common abbreviations (ikr, fr, smh, tl;dr)",
    ]
    .iter()
    .map(|rule| rule.to_string())
    .collect()
}

impl Default for StylePolicy {
    fn default() -> Self {
        Self {
            voice: default_voice(),
            rules: default_rules(),
        }
    }
}

/// Anything that can turn a thread title into a generation prompt.
pub trait PromptTemplate: Send + Sync {
    fn render(&self, title: &str) -> String;
}

/// Default template: a seasoned regular answering in one subreddit.
#[derive(Debug, Clone)]
pub struct RedditorPrompt {
    subreddit: String,
    policy: StylePolicy,
}

impl RedditorPrompt {
    pub fn new(subreddit: impl Into<String>, policy: StylePolicy) -> Self {
        Self {
            subreddit: subreddit.into(),
            policy,
        }
    }
}

impl PromptTemplate for RedditorPrompt {
    fn render(&self, title: &str) -> String {
        build_prompt(title, &self.policy, &self.subreddit)
    }
}

/// Make the title read as a question by ensuring it ends with exactly one `?`.
///
/// Trailing whitespace is dropped first. A title already ending in `?` is
/// returned unchanged apart from that trim.
pub fn normalize_title(title: &str) -> String {
    let trimmed = title.trim_end();
    if trimmed.ends_with('?') {
        trimmed.to_string()
    } else {
        format!("{}?", trimmed)
    }
}

pub fn build_prompt(title: &str, policy: &StylePolicy, subreddit: &str) -> String {
    let mut prompt = format!(
        "Act as a seasoned Redditor replying to a thread on r/{}. {}\n\n",
        subreddit,
        policy.voice.trim()
    );

    if !policy.rules.is_empty() {
        prompt.push_str("Follow these rules:\n");
        for (index, rule) in policy.rules.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", index + 1, rule.trim()));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!("Post Question: {}\n\n", normalize_title(title)));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_question_mark_once() {
        assert_eq!(normalize_title("whats your favorite"), "whats your favorite?");
        assert_eq!(normalize_title("what is it?"), "what is it?");
        assert_eq!(normalize_title("spaces after  "), "spaces after?");
        assert_eq!(normalize_title(&normalize_title("twice")), "twice?");
    }

    #[test]
    fn prompt_embeds_forum_policy_and_title() {
        let policy = StylePolicy::default();
        let prompt = build_prompt("whats your favorite", &policy, "AskReddit");

        assert!(prompt.starts_with("Act as a seasoned Redditor replying to a thread on r/AskReddit."));
        assert!(prompt.contains(policy.voice.as_str()));
        assert!(prompt.contains("1. Maximum 200 tokens (about 40 words)\n"));
        assert!(prompt.contains("No lists"));
        assert!(prompt.contains(". Respond like a sarcastic Reddit veteran\n"));
        assert!(prompt.contains(". Use 80% lowercase letters\n"));
        assert!(prompt.contains("(ikr, fr, smh, tl;dr)"));
        assert!(prompt.ends_with("Post Question: whats your favorite?\n\n"));
        assert!(!prompt.contains("favorite??"));
    }

    #[test]
    fn prompt_is_deterministic() {
        let template = RedditorPrompt::new("AskReddit", StylePolicy::default());
        assert_eq!(template.render("why?"), template.render("why?"));
        assert_eq!(
            template.render("why"),
            build_prompt("why", &StylePolicy::default(), "AskReddit")
        );
    }

    #[test]
    fn empty_rule_list_skips_rule_block() {
        let policy = StylePolicy {
            voice: "Be brief.".to_string(),
            rules: Vec::new(),
        };
        let prompt = build_prompt("hi", &policy, "test");
        assert!(!prompt.contains("Follow these rules"));
        assert_eq!(
            prompt,
            "Act as a seasoned Redditor replying to a thread on r/test. Be brief.\n\nPost Question: hi?\n\n"
        );
    }
}
