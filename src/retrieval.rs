//! Smart-ask: retrieval-augmented questions over the graph.
//!
//! `smart_ask` finds the closest nodes, answers with them as context and
//! caches the result. `promote_smart_ask` turns the cached result into a
//! child node citing its sources; `smart_thread` does both in one go.

use crate::conversation::Conversation;
use crate::db::SmartAskResult;
use crate::error::{GraphError, Result};

pub const SMART_ASK_TAG: &str = "smart-ask";

impl Conversation {
    /// Ask `question` with the `top_k` most similar nodes as context.
    ///
    /// A known `from` anchor also contributes its own citations (see
    /// `ask_with_context`); otherwise the generator is called directly.
    /// The result replaces any previously cached smart-ask.
    pub fn smart_ask(&mut self, question: &str, from: Option<&str>, top_k: Option<usize>) -> Result<String> {
        let k = top_k.unwrap_or(self.settings.smart_ask_top_k);
        let matches = self.similarity_search(question, k)?;

        let mut chunks = Vec::new();
        let mut citations = Vec::new();
        for (id, score) in matches {
            let Some(node) = self.graph.get(&id) else { continue };
            let text = node.context_text().trim();
            if text.is_empty() {
                continue;
            }
            tracing::debug!(id = %id, score, "smart-ask match");
            chunks.push(format!("[CONTEXT from {}]\n{}", id, text));
            citations.push(id);
        }

        let mut prompt = chunks.join("\n\n");
        prompt.push_str("\n\n[QUESTION]\n");
        prompt.push_str(question.trim());

        let anchor = from.filter(|id| self.graph.contains(id));
        if from.is_some() && anchor.is_none() {
            tracing::warn!(from = ?from, "smart-ask anchor not found, answering without it");
        }
        let response = match anchor {
            Some(id) => self.ask_with_context(id, &prompt)?,
            None => self.ask_direct(&prompt)?,
        };

        tracing::info!(matches = citations.len(), "smart-ask answered");
        self.graph.set_last_smart_ask(SmartAskResult {
            from_node_id: from.map(str::to_string),
            question: question.trim().to_string(),
            response: response.clone(),
            citations,
        })?;
        Ok(response)
    }

    /// Store the cached smart-ask as a new child of `parent_id`.
    ///
    /// Fails with `State` if nothing is cached or the cached result was asked
    /// from a different node. Citation errors are propagated.
    pub fn promote_smart_ask(&mut self, parent_id: &str) -> Result<String> {
        self.promote_cached(Some(parent_id))
    }

    /// A `None` parent promotes an anchorless smart-ask to a new root.
    fn promote_cached(&mut self, parent_id: Option<&str>) -> Result<String> {
        let cached = self
            .graph
            .last_smart_ask()
            .cloned()
            .ok_or_else(|| GraphError::State("No smart-ask result available to promote.".to_string()))?;
        if cached.from_node_id.as_deref() != parent_id {
            return Err(GraphError::State(
                "Smart-ask result does not match current node.".to_string(),
            ));
        }
        if let Some(parent_id) = parent_id {
            self.graph.node(parent_id)?;
        }
        // a fresh node has no incoming edges, so only unknown ids can fail
        for cited in &cached.citations {
            self.graph.node(cited)?;
        }

        let mut node = self.graph.draft(&cached.question, parent_id);
        node.response = cached.response;
        node.tags.push(SMART_ASK_TAG.to_string());
        let id = self.graph.add_node(node)?;

        for cited in &cached.citations {
            self.graph.add_citation(&id, cited)?;
        }
        self.auto_embed(&id)?;

        tracing::info!(id = %id, citations = cached.citations.len(), "promoted smart-ask");
        Ok(id)
    }

    /// Apply the cached citations to `target` (default: the cached anchor).
    /// Returns how many citations were newly added.
    pub fn cite_smart_ask(&mut self, target: Option<&str>) -> Result<usize> {
        let cached = self
            .graph
            .last_smart_ask()
            .cloned()
            .ok_or_else(|| GraphError::State("No smart-ask result available to cite.".to_string()))?;
        let target = target
            .map(str::to_string)
            .or(cached.from_node_id)
            .ok_or_else(|| GraphError::State("No target node for smart-ask citations.".to_string()))?;

        let mut added = 0;
        for cited in &cached.citations {
            if self.add_citation(&target, cited)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Ask, promote and cite in one step. Returns (new node id, answer).
    pub fn smart_thread(
        &mut self,
        question: &str,
        from: Option<&str>,
        top_k: Option<usize>,
    ) -> Result<(String, String)> {
        let answer = self.smart_ask(question, from, top_k)?;
        let id = self.promote_cached(from)?;

        let citations = self
            .graph
            .last_smart_ask()
            .map(|cached| cached.citations.clone())
            .unwrap_or_default();
        for cited in &citations {
            self.graph.add_citation(&id, cited)?;
        }
        Ok((id, answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedded_conversation() -> (Conversation, String, String) {
        let mut conv = Conversation::in_memory();
        let a = conv.graph_mut().create_root("Halide").unwrap();
        conv.graph_mut()
            .edit_response(&a, "Halide separates algorithm from schedule.")
            .unwrap();
        let b = conv.graph_mut().create_root("TVM").unwrap();
        conv.graph_mut()
            .edit_response(&b, "TVM compiles tensor programs for many targets.")
            .unwrap();
        conv.embed_all(false).unwrap();
        (conv, a, b)
    }

    #[test]
    fn test_smart_ask_caches_result() {
        let (mut conv, a, b) = embedded_conversation();
        let answer = conv.smart_ask("How does TVM compile tensor programs?", Some(&a), Some(2)).unwrap();
        assert!(answer.contains(&format!("[CONTEXT from {}]", b)));
        assert!(answer.contains("[QUESTION]\nHow does TVM compile tensor programs?"));

        let cached = conv.graph().last_smart_ask().unwrap();
        assert_eq!(cached.from_node_id.as_deref(), Some(a.as_str()));
        assert_eq!(cached.response, answer);
        assert_eq!(cached.citations[0], b);
        assert_eq!(cached.citations.len(), 2);
    }

    #[test]
    fn test_smart_ask_without_embeddings() {
        let mut conv = Conversation::in_memory();
        let answer = conv.smart_ask("Anything?", None, None).unwrap();
        assert!(answer.contains("[QUESTION]\nAnything?"));
        assert!(conv.graph().last_smart_ask().unwrap().citations.is_empty());
    }

    #[test]
    fn test_promote_creates_child_with_citations() {
        let (mut conv, a, b) = embedded_conversation();
        let x = conv.graph_mut().create_reply(&a, "anchor").unwrap();
        let answer = conv.smart_ask("Q", Some(&x), Some(2)).unwrap();

        let promoted = conv.promote_smart_ask(&x).unwrap();
        let node = conv.graph().get(&promoted).unwrap();
        assert_eq!(node.parent_id.as_deref(), Some(x.as_str()));
        assert_eq!(node.response, answer);
        assert_eq!(node.prompt, "Q");
        assert!(node.has_tag(SMART_ASK_TAG));
        let cached = conv.graph().last_smart_ask().unwrap().citations.clone();
        assert_eq!(node.citations, cached);
        assert!(cached.contains(&b));
        assert!(conv.graph().get(&x).unwrap().children.contains(&promoted));
    }

    #[test]
    fn test_promote_requires_matching_cache() {
        let (mut conv, a, b) = embedded_conversation();
        assert!(matches!(conv.promote_smart_ask(&a), Err(GraphError::State(_))));

        conv.smart_ask("Q", Some(&a), None).unwrap();
        assert!(matches!(conv.promote_smart_ask(&b), Err(GraphError::State(_))));
        assert!(conv.promote_smart_ask(&a).is_ok());
    }

    #[test]
    fn test_promote_propagates_citation_errors() {
        let (mut conv, a, b) = embedded_conversation();
        conv.smart_ask("Q", Some(&a), Some(2)).unwrap();
        // cache naming a node that no longer resolves
        let mut cached = conv.graph().last_smart_ask().unwrap().clone();
        cached.citations = vec![b.clone(), "ghost".to_string()];
        conv.graph_mut().set_last_smart_ask(cached).unwrap();
        let children = conv.graph().get(&a).unwrap().children.clone();
        let count = conv.graph().len();

        assert!(matches!(conv.promote_smart_ask(&a), Err(GraphError::NotFound(_))));
        assert_eq!(conv.graph().get(&a).unwrap().children, children);
        assert_eq!(conv.graph().len(), count);
    }

    #[test]
    fn test_cite_smart_ask_defaults_to_anchor() {
        let (mut conv, a, b) = embedded_conversation();
        assert!(matches!(conv.cite_smart_ask(None), Err(GraphError::State(_))));

        let anchor = conv.graph_mut().create_root("anchor").unwrap();
        conv.smart_ask("tensor", Some(&anchor), Some(2)).unwrap();
        assert_eq!(conv.cite_smart_ask(None).unwrap(), 2);
        assert_eq!(conv.cite_smart_ask(None).unwrap(), 0);
        let cites = conv.graph().citations_of(&anchor).unwrap();
        assert!(cites.contains(&a) && cites.contains(&b));
    }

    #[test]
    fn test_cite_smart_ask_without_anchor_needs_target() {
        let (mut conv, _, _) = embedded_conversation();
        conv.smart_ask("tensor", None, Some(1)).unwrap();
        assert!(matches!(conv.cite_smart_ask(None), Err(GraphError::State(_))));
        let target = conv.graph_mut().create_root("target").unwrap();
        assert_eq!(conv.cite_smart_ask(Some(&target)).unwrap(), 1);
    }

    #[test]
    fn test_smart_thread_under_anchor() {
        let (mut conv, a, _) = embedded_conversation();
        let (id, answer) = conv.smart_thread("What is Halide?", Some(&a), Some(1)).unwrap();
        let node = conv.graph().get(&id).unwrap();
        assert_eq!(node.parent_id.as_deref(), Some(a.as_str()));
        assert_eq!(node.response, answer);
        assert_eq!(node.citations.len(), 1);
    }

    #[test]
    fn test_smart_thread_without_anchor_starts_root() {
        let (mut conv, _, _) = embedded_conversation();
        let (id, _) = conv.smart_thread("What is TVM?", None, Some(2)).unwrap();
        let node = conv.graph().get(&id).unwrap();
        assert!(node.is_root());
        assert_eq!(node.citations.len(), 2);
        assert!(conv.graph().integrity_issues().is_empty());
    }
}
