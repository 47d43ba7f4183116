//! Conch: a branching conversation graph.
//!
//! Prompts and responses are nodes in a reply tree. Nodes can also cite
//! each other (kept acyclic), carry embeddings for semantic search, and
//! feed retrieval-augmented "smart-ask" questions whose answers can be
//! promoted back into the tree. The whole graph is persisted as a JSON
//! snapshot after every change.

pub mod ai_client;
pub mod citations;
pub mod context;
pub mod conversation;
pub mod db;
pub mod embeddings;
pub mod error;
pub mod export;
pub mod graph;
pub mod hierarchy;
pub mod import;
pub mod retrieval;
pub mod settings;
pub mod similarity;
pub mod utils;
pub mod vcs;

pub use ai_client::{AnswerGenerator, EmbeddingProvider, MockEmbedder, MockGenerator, OllamaClient};
pub use conversation::Conversation;
pub use db::{Node, NodeType, SmartAskResult, Storage, WebResult};
pub use error::{GraphError, Result};
pub use graph::Graph;
pub use settings::Settings;
