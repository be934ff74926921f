use std::collections::HashMap;
use std::time::{Duration, Instant};

use haiven_core::PromptSummary;
use serde::Serialize;
use tracing::warn;

/// One entry of the prompt registry exposed through `prompts/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptDescriptor {
    pub name: String,
    pub title: String,
    pub description: String,
}

impl PromptDescriptor {
    fn from_summary(s: &PromptSummary) -> Self {
        Self {
            name: s.identifier.clone(),
            title: s.title.clone(),
            description: s.describe(),
        }
    }
}

/// Result of one successful catalog fetch. Never mutated; a refresh builds a new one.
#[derive(Debug)]
pub struct CatalogSnapshot {
    summaries: Vec<PromptSummary>,
    index: HashMap<String, usize>,
    descriptors: Vec<PromptDescriptor>,
    fetched_at: Instant,
    generation: u64,
}

impl CatalogSnapshot {
    pub(crate) fn new(list: Vec<PromptSummary>, generation: u64) -> Self {
        let mut summaries = Vec::with_capacity(list.len());
        let mut index = HashMap::with_capacity(list.len());
        for s in list {
            if index.contains_key(&s.identifier) {
                warn!(prompt_id = %s.identifier, "duplicate prompt identifier; keeping first");
                continue;
            }
            index.insert(s.identifier.clone(), summaries.len());
            summaries.push(s);
        }
        let descriptors = summaries.iter().map(PromptDescriptor::from_summary).collect();
        Self {
            summaries,
            index,
            descriptors,
            fetched_at: Instant::now(),
            generation,
        }
    }

    /// Summaries in upstream order.
    pub fn summaries(&self) -> &[PromptSummary] {
        &self.summaries
    }

    pub fn get(&self, id: &str) -> Option<&PromptSummary> {
        self.index.get(id).map(|&i| &self.summaries[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn descriptors(&self) -> &[PromptDescriptor] {
        &self.descriptors
    }

    pub fn describe(&self, id: &str) -> Option<&str> {
        self.index
            .get(id)
            .map(|&i| self.descriptors[i].description.as_str())
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }
}
