use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NodeType {
    #[serde(rename = "doc")]
    Doc,
    #[serde(rename = "web-result")]
    WebResult,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Doc => "doc",
            NodeType::WebResult => "web-result",
        }
    }
}

// Tree edges: parent_id/children (children is the inverse of parent_id).
// Citation edges: citations, kept acyclic by the store.

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: String,
    pub parent_id: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
    pub prompt: String,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub citations: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtree_summary: Option<String>,
    // Kept on the node so a snapshot is self-contained
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<NodeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl Node {
    pub fn new(id: String, prompt: String, parent_id: Option<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id,
            parent_id,
            children: Vec::new(),
            prompt,
            response: String::new(),
            tags: Vec::new(),
            citations: Vec::new(),
            comment: None,
            summary: None,
            subtree_summary: None,
            embedding: None,
            node_type: None,
            filename: None,
            url: None,
            source: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Text handed to the embedding provider.
    pub fn embedding_text(&self) -> String {
        format!("{}\n{}", self.prompt, self.response)
    }

    /// Response if present, otherwise the prompt.
    pub fn context_text(&self) -> &str {
        if self.response.trim().is_empty() {
            &self.prompt
        } else {
            &self.response
        }
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().timestamp_millis();
    }
}

/// Cached outcome of the most recent smart-ask, waiting to be promoted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SmartAskResult {
    pub from_node_id: Option<String>,
    pub question: String,
    pub response: String,
    #[serde(default)]
    pub citations: Vec<String>,
}

/// A single web search hit (title, snippet, url).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_type_names_match_serde() {
        for node_type in [NodeType::Doc, NodeType::WebResult] {
            let json = serde_json::to_string(&node_type).unwrap();
            assert_eq!(json, format!("\"{}\"", node_type.as_str()));
        }
    }

    #[test]
    fn test_node_serializes_type_field() {
        let mut node = Node::new("abcd1234".to_string(), "Imported".to_string(), None);
        node.node_type = Some(NodeType::Doc);
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "doc");
        assert!(json.get("embedding").is_none());
        assert!(json["parent_id"].is_null());
    }

    #[test]
    fn test_node_deserializes_minimal_record() {
        let json = r#"{"id": "n1", "parent_id": null, "prompt": "Hi"}"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert_eq!(node.response, "");
        assert!(node.children.is_empty());
        assert!(node.citations.is_empty());
        assert_eq!(node.created_at, 0);
    }

    #[test]
    fn test_context_text_falls_back_to_prompt() {
        let mut node = Node::new("n1".to_string(), "Question?".to_string(), None);
        assert_eq!(node.context_text(), "Question?");
        node.response = "Answer.".to_string();
        assert_eq!(node.context_text(), "Answer.");
    }
}
