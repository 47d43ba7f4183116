mod models;
mod snapshot;

pub use models::{Node, NodeType, SmartAskResult, WebResult};
pub use snapshot::{load, parse, save, GraphState, Storage};
