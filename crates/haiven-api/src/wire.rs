use haiven_core::{PromptContent, PromptKind, PromptSummary};
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
pub(crate) struct SummaryWire {
    identifier: String,
    title: String,
    #[serde(default)]
    categories: Option<Vec<String>>,
    #[serde(default)]
    help_prompt_description: Option<String>,
    #[serde(default)]
    help_user_input: Option<String>,
    #[serde(default)]
    help_sample_input: Option<String>,
    #[serde(rename = "type", default)]
    kind: PromptKind,
    #[serde(default)]
    download_restricted: Option<bool>,
}

/// Drop restricted and unnamed entries; keep upstream order.
pub(crate) fn into_summaries(list: Vec<SummaryWire>) -> Vec<PromptSummary> {
    list.into_iter()
        .filter_map(|w| {
            if w.download_restricted.unwrap_or(false) {
                return None;
            }
            if w.identifier.trim().is_empty() {
                warn!(title = %w.title, "skipping prompt with missing identifier");
                return None;
            }
            Some(PromptSummary {
                identifier: w.identifier,
                title: w.title,
                categories: w.categories.unwrap_or_default(),
                help_description: w.help_prompt_description,
                help_user_input: w.help_user_input,
                help_sample_input: w.help_sample_input,
                kind: w.kind,
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentWire {
    #[serde(default)]
    identifier: Option<String>,
    title: String,
    content: String,
    #[serde(rename = "type", default)]
    kind: PromptKind,
    #[serde(default)]
    follow_ups: Option<Vec<String>>,
}

/// The content endpoint answers with either one object or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ContentPayload {
    One(ContentWire),
    Many(Vec<ContentWire>),
}

impl ContentPayload {
    pub(crate) fn into_content(self, requested_id: &str) -> Option<PromptContent> {
        let wire = match self {
            ContentPayload::One(w) => w,
            ContentPayload::Many(list) => list.into_iter().next()?,
        };
        Some(PromptContent {
            prompt_id: wire
                .identifier
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| requested_id.to_string()),
            title: wire.title,
            content: wire.content,
            kind: wire.kind,
            follow_ups: wire.follow_ups.unwrap_or_default(),
        })
    }
}
