use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("expected a graph of class '{expected}', found '{found}'")]
    ClassMismatch { expected: String, found: String },

    #[error("duplicate node id {0}")]
    DuplicateNode(usize),

    #[error("edge {source_id} -> {target_id} refers to an unknown node")]
    UnknownEndpoint { source_id: usize, target_id: usize },

    #[error("closure matrix has {rows} rows of {cols} entries for {nodes} nodes")]
    ClosureShape { rows: usize, cols: usize, nodes: usize },

    #[error("invalid match parameter: {0}")]
    InvalidParams(String),

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type GraphResult<T> = Result<T, GraphError>;
