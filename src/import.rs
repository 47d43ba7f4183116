//! Documents and web results as graph nodes.
//!
//! Text files are read as UTF-8, `.pdf` files go through `pdf-extract`.
//! Web search is a deterministic stand-in returning fixed results.

use std::fs;
use std::path::Path;

use url::Url;

use crate::conversation::Conversation;
use crate::db::{NodeType, WebResult};
use crate::error::{GraphError, Result};
use crate::utils::truncate_chars;

pub const DOC_TAG: &str = "doc";
pub const IMPROVED_TAG: &str = "improved";
pub const WEB_TAG: &str = "web";
pub const DEFAULT_WEB_SOURCE: &str = "tavily";

const IMPROVED_PREVIEW_CHARS: usize = 300;

/// Text content of a document on disk.
pub fn read_document(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(GraphError::NotFound(format!("file {}", path.display())));
    }
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

    if is_pdf {
        pdf_extract::extract_text(path).map_err(|e| {
            GraphError::InvalidInput(format!("could not extract text from {}: {}", path.display(), e))
        })
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

/// Deterministic search results: `Result N for '<query>'` on example.com.
pub fn mock_websearch(query: &str, max_results: usize) -> Vec<WebResult> {
    (1..=max_results)
        .map(|i| WebResult {
            title: format!("Result {} for '{}'", i, query),
            snippet: format!("This is a mock snippet for result {}.", i),
            url: format!("https://example.com/{}", i),
            source: None,
        })
        .collect()
}

impl Conversation {
    /// Import a file as a `doc` node, optionally under `parent` and cut to
    /// the first `truncate` characters.
    pub fn import_doc(&mut self, path: &Path, parent: Option<&str>, truncate: Option<usize>) -> Result<String> {
        if truncate == Some(0) {
            return Err(GraphError::InvalidInput("truncate must be a positive integer".to_string()));
        }
        if let Some(parent_id) = parent {
            self.graph.node(parent_id)?;
        }

        let mut content = read_document(path)?;
        if let Some(limit) = truncate {
            content = truncate_chars(&content, limit).to_string();
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let mut node = self.graph.draft(&format!("Imported document: {}", name), parent);
        node.response = content;
        node.node_type = Some(NodeType::Doc);
        node.filename = Some(name);
        node.tags.push(DOC_TAG.to_string());
        let id = self.graph.add_node(node)?;
        self.auto_embed(&id)?;

        tracing::info!(id = %id, path = %path.display(), "imported document");
        Ok(id)
    }

    /// Write a node's response to `path`.
    pub fn save_doc(&self, id: &str, path: &Path) -> Result<()> {
        let node = self.graph.node(id)?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, &node.response)?;
        tracing::info!(id, path = %path.display(), "saved document");
        Ok(())
    }

    /// Child `doc` node holding an improved draft of `id`, citing it.
    pub fn improve_doc(&mut self, id: &str) -> Result<String> {
        let original = self.graph.node(id)?;
        let filename = original.filename.clone();
        let response = format!(
            "[IMPROVED VERSION]\n{}...",
            truncate_chars(&original.response, IMPROVED_PREVIEW_CHARS)
        );

        let prompt = format!("Improved version of {}", filename.as_deref().unwrap_or(""));
        let mut node = self.graph.draft(&prompt, Some(id));
        node.response = response;
        node.node_type = Some(NodeType::Doc);
        node.filename = Some(filename.unwrap_or_else(|| "improved".to_string()));
        node.tags = vec![DOC_TAG.to_string(), IMPROVED_TAG.to_string()];
        let new_id = self.graph.add_node(node)?;

        self.graph.add_citation(&new_id, id)?;
        self.auto_embed(&new_id)?;
        Ok(new_id)
    }

    /// Store a search hit as a `web-result` node. The URL must parse.
    pub fn save_web_result(&mut self, result: &WebResult, parent: Option<&str>) -> Result<String> {
        let url = Url::parse(&result.url)
            .map_err(|e| GraphError::InvalidInput(format!("invalid url {}: {}", result.url, e)))?;
        if let Some(parent_id) = parent {
            self.graph.node(parent_id)?;
        }

        let mut node = self.graph.draft(&result.title, parent);
        node.response = result.snippet.clone();
        node.node_type = Some(NodeType::WebResult);
        node.url = Some(url.to_string());
        node.source = Some(
            result
                .source
                .clone()
                .unwrap_or_else(|| DEFAULT_WEB_SOURCE.to_string()),
        );
        node.tags.push(WEB_TAG.to_string());
        let id = self.graph.add_node(node)?;
        self.auto_embed(&id)?;
        Ok(id)
    }
}
