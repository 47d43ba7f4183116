//! Citation context for answers, bounded by a token budget.
//!
//! A node's citations are folded into the prompt in stored order. Entries
//! are added while the running estimate stays within the budget; the first
//! entry that would overflow is replaced by a short summary and everything
//! after it is dropped.

use crate::conversation::Conversation;
use crate::error::Result;
use crate::graph::Graph;
use crate::utils::truncate_chars;

/// Budget for citation context, in estimated tokens.
pub const TOKEN_BUDGET: usize = 1000;

/// Context used when a node has nothing to cite.
pub const NO_CONTEXT: &str = "No supporting information available.";

const TITLE_CHARS: usize = 50;
const SNIPPET_CHARS: usize = 200;
const SUMMARY_CHARS: usize = 100;

/// Rough token count: one token per four characters, rounded down.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

/// Truncated, labelled stand-in for text that did not fit the budget.
pub fn summarize_text(text: &str) -> String {
    format!("[SUMMARY] {}...", truncate_chars(text.trim(), SUMMARY_CHARS))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CitationContext {
    /// `- <title>: <snippet>` lines, in citation order.
    pub entries: Vec<String>,
    /// Estimated tokens of the entries that fit in full.
    pub tokens: usize,
    /// (cited id, summary) for the entry that overflowed, if any.
    pub summarized: Option<(String, String)>,
}

impl CitationContext {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            NO_CONTEXT.to_string()
        } else {
            self.entries.join("\n")
        }
    }
}

/// Greedy single pass over the citations of `id`.
/// Cited ids that no longer resolve are skipped.
pub fn build_citation_context(graph: &Graph, id: &str, budget: usize) -> Result<CitationContext> {
    let mut context = CitationContext::default();

    for cited_id in &graph.node(id)?.citations {
        let Some(cited) = graph.get(cited_id) else {
            tracing::warn!(id, cited = %cited_id, "citation points at unknown node");
            continue;
        };
        let title = truncate_chars(&cited.prompt, TITLE_CHARS);
        let snippet = truncate_chars(&cited.response, SNIPPET_CHARS);
        let entry = format!("- {}: {}", title, snippet);
        let cost = estimate_tokens(&entry);

        if context.tokens + cost <= budget {
            context.entries.push(entry);
            context.tokens += cost;
        } else {
            let summary = summarize_text(snippet);
            context.entries.push(format!("- {}: {}", title, summary));
            context.summarized = Some((cited_id.clone(), summary));
            tracing::debug!(id, cited = %cited_id, tokens = context.tokens, "citation context over budget");
            break;
        }
    }

    Ok(context)
}

impl Conversation {
    /// Answer `prompt` with the citations of `id` as supporting context.
    ///
    /// The citation that overflowed the budget, if any, keeps its summary
    /// in its `summary` field.
    pub fn ask_with_context(&mut self, id: &str, prompt: &str) -> Result<String> {
        let context = build_citation_context(&self.graph, id, TOKEN_BUDGET)?;
        if let Some((ref cited_id, ref summary)) = context.summarized {
            self.graph.set_summary(cited_id, summary)?;
        }
        tracing::debug!(llm = self.llm.name(), id, entries = context.entries.len(), "answering with context");
        Ok(self.llm.answer_with_context(&context.render(), prompt)?)
    }

    /// Answer without any graph context.
    pub fn ask_direct(&self, prompt: &str) -> Result<String> {
        tracing::debug!(llm = self.llm.name(), "answering directly");
        Ok(self.llm.answer(prompt)?)
    }

    pub fn suggest_replies(&mut self, id: &str, k: usize) -> Result<String> {
        let context = self.graph.node(id)?.context_text().trim().to_string();
        let prompt = format!(
            "Based on the following conversation:\n\n{}\n\nSuggest {} relevant follow-up questions.",
            context, k
        );
        self.ask_with_context(id, &prompt)
    }

    pub fn suggest_tags(&mut self, id: &str, k: usize) -> Result<String> {
        let node = self.graph.node(id)?;
        let prompt = format!(
            "Suggest {} useful tags for organizing the following content:\n\n{}\n\n{}",
            k, node.prompt, node.response
        );
        Ok(self.ask_with_context(id, &prompt)?.trim().to_string())
    }

    pub fn suggest_validation_sources(&mut self, id: &str, k: usize) -> Result<String> {
        let response = self.graph.node(id)?.response.trim().to_string();
        let prompt = format!(
            "Suggest {} sources or search queries I could use to validate or fact-check this explanation:\n\n{}",
            k, response
        );
        self.ask_with_context(id, &prompt)
    }
}
