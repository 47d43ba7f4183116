//! The conversation facade: a `Graph` plus the answer generator and
//! embedding provider it talks to.
//!
//! Store-level operations live on `Graph`; anything that needs a
//! collaborator (generating responses, embedding, smart-ask) lives here,
//! spread over `embeddings.rs`, `context.rs`, `retrieval.rs` and `import.rs`.

use std::path::Path;

use crate::ai_client::{self, AnswerGenerator, EmbeddingProvider, MockEmbedder, MockGenerator};
use crate::db::Storage;
use crate::error::Result;
use crate::graph::Graph;
use crate::settings::Settings;

pub struct Conversation {
    pub(crate) graph: Graph,
    pub(crate) llm: Box<dyn AnswerGenerator>,
    pub(crate) embedder: Box<dyn EmbeddingProvider>,
    pub(crate) settings: Settings,
}

impl Conversation {
    pub fn new(
        graph: Graph,
        llm: Box<dyn AnswerGenerator>,
        embedder: Box<dyn EmbeddingProvider>,
        settings: Settings,
    ) -> Self {
        Self { graph, llm, embedder, settings }
    }

    /// Open `storage` with the backends named in `settings`.
    pub fn open(storage: Storage, settings: Settings) -> Result<Self> {
        let llm = ai_client::answer_generator(&settings)?;
        let embedder = ai_client::embedding_provider(&settings)?;
        tracing::info!(
            llm = llm.name(),
            embedder = embedder.name(),
            path = ?storage.path(),
            "conversation opened"
        );
        Ok(Self::new(Graph::open(storage), llm, embedder, settings))
    }

    /// Ephemeral conversation with mock backends and default settings.
    pub fn in_memory() -> Self {
        let settings = Settings::default();
        Self::new(
            Graph::in_memory(),
            Box::new(MockGenerator::new(settings.mock_response.clone())),
            Box::new(MockEmbedder::new(settings.embedding_dim)),
            settings,
        )
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_auto_embed(&mut self, enabled: bool) {
        self.settings.auto_embed = enabled;
    }

    pub(crate) fn auto_embed(&mut self, id: &str) -> Result<()> {
        if self.settings.auto_embed {
            self.embed_node(id, false)?;
        }
        Ok(())
    }

    /// Start a thread: new root whose response comes from the generator.
    pub fn new_thread(&mut self, prompt: &str) -> Result<String> {
        let id = self.graph.create_root(prompt)?;
        let response = self.llm.answer(prompt)?;
        self.graph.edit_response(&id, &response)?;
        self.auto_embed(&id)?;
        Ok(id)
    }

    /// Reply under `parent_id`; the answer sees the parent's citations.
    pub fn reply(&mut self, parent_id: &str, prompt: &str) -> Result<String> {
        let id = self.graph.create_reply(parent_id, prompt)?;
        let response = self.ask_with_context(parent_id, prompt)?;
        self.graph.edit_response(&id, &response)?;
        self.auto_embed(&id)?;
        Ok(id)
    }

    /// Regenerate a response, optionally with a new prompt.
    pub fn retry(&mut self, id: &str, new_prompt: Option<&str>) -> Result<()> {
        let prompt = match new_prompt {
            Some(p) => p.to_string(),
            None => self.graph.node(id)?.prompt.clone(),
        };
        let response = self.llm.answer(&prompt)?;
        if new_prompt.is_some() {
            self.graph.set_prompt(id, &prompt)?;
        }
        self.graph.edit_response(id, &response)?;
        self.auto_embed(id)
    }

    pub fn edit_response(&mut self, id: &str, text: &str) -> Result<()> {
        self.graph.edit_response(id, text)?;
        self.auto_embed(id)
    }

    pub fn set_comment(&mut self, id: &str, text: &str) -> Result<()> {
        self.graph.set_comment(id, text)?;
        self.auto_embed(id)
    }

    pub fn add_citation(&mut self, from_id: &str, to_id: &str) -> Result<bool> {
        let added = self.graph.add_citation(from_id, to_id)?;
        self.auto_embed(from_id)?;
        Ok(added)
    }

    /// Replace the graph with a snapshot file, re-embedding the imported
    /// nodes when auto-embed is on.
    pub fn import_graph(&mut self, path: &Path) -> Result<usize> {
        let count = self.graph.import_from_file(path)?;
        if self.settings.auto_embed {
            self.embed_all(false)?;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;

    #[test]
    fn test_new_thread_fills_response() {
        let mut conv = Conversation::in_memory();
        let id = conv.new_thread("What is Halide?").unwrap();
        let node = conv.graph().get(&id).unwrap();
        assert_eq!(node.prompt, "What is Halide?");
        assert!(node.response.contains("What is Halide?"));
        assert!(node.embedding.is_none());
    }

    #[test]
    fn test_reply_links_and_answers() {
        let mut conv = Conversation::in_memory();
        let root = conv.new_thread("Tell me about scheduling.").unwrap();
        let child = conv.reply(&root, "Explain it").unwrap();
        assert_eq!(conv.graph().get(&child).unwrap().parent_id.as_deref(), Some(root.as_str()));
        assert!(conv.graph().get(&child).unwrap().response.contains("Explain it"));
        assert!(matches!(conv.reply("missing", "x"), Err(GraphError::NotFound(_))));
    }

    #[test]
    fn test_retry_replaces_prompt() {
        let mut conv = Conversation::in_memory();
        let id = conv.new_thread("Old prompt").unwrap();
        conv.retry(&id, Some("New prompt")).unwrap();
        let node = conv.graph().get(&id).unwrap();
        assert_eq!(node.prompt, "New prompt");
        assert!(node.response.contains("New prompt"));

        conv.retry(&id, None).unwrap();
        assert_eq!(conv.graph().get(&id).unwrap().prompt, "New prompt");
        assert!(conv.retry("missing", None).is_err());
    }

    #[test]
    fn test_auto_embed_on_mutations() {
        let mut conv = Conversation::in_memory();
        conv.set_auto_embed(true);
        let id = conv.new_thread("Embedded on creation").unwrap();
        let before = conv.graph().get(&id).unwrap().embedding.clone().unwrap();

        conv.edit_response(&id, "Completely different words now").unwrap();
        let after = conv.graph().get(&id).unwrap().embedding.clone().unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_import_graph_embeds_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        let mut source = Graph::in_memory();
        let root = source.create_root("Imported root").unwrap();
        source.create_reply(&root, "Imported child").unwrap();
        source.export_to_file(&path).unwrap();

        let mut plain = Conversation::in_memory();
        assert_eq!(plain.import_graph(&path).unwrap(), 2);
        assert!(plain.graph().nodes().all(|n| n.embedding.is_none()));

        let mut conv = Conversation::in_memory();
        conv.set_auto_embed(true);
        assert_eq!(conv.import_graph(&path).unwrap(), 2);
        assert!(conv.graph().nodes().all(|n| n.embedding.is_some()));
    }
}
