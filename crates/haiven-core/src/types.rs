use std::fmt;

use serde::{Deserialize, Serialize};

pub type PromptId = String;

/// Prompt type as reported upstream. Unknown values are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PromptKind {
    #[default]
    Chat,
    Other(String),
}

impl PromptKind {
    pub fn as_str(&self) -> &str {
        match self {
            PromptKind::Chat => "chat",
            PromptKind::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for PromptKind {
    fn from(s: String) -> Self {
        if s == "chat" {
            PromptKind::Chat
        } else {
            PromptKind::Other(s)
        }
    }
}

impl From<PromptKind> for String {
    fn from(k: PromptKind) -> Self {
        match k {
            PromptKind::Chat => "chat".to_string(),
            PromptKind::Other(s) => s,
        }
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog metadata for one prompt, as listed by `GET /api/prompts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptSummary {
    pub identifier: PromptId,
    pub title: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(
        rename = "help_prompt_description",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub help_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_user_input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_sample_input: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: PromptKind,
}

impl PromptSummary {
    /// `"<title>: <description> (Categories: a, b)"`, used for prompt listings.
    pub fn describe(&self) -> String {
        let mut out = format!(
            "{}: {}",
            self.title,
            self.help_description.as_deref().unwrap_or_default()
        );
        if !self.categories.is_empty() {
            out.push_str(&format!(" (Categories: {})", self.categories.join(", ")));
        }
        out
    }
}

/// Full body of one prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptContent {
    pub prompt_id: PromptId,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: PromptKind,
    pub follow_ups: Vec<String>,
}
