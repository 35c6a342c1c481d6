use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchematicError {
    #[error("{kind} file not found: {}", path.display())]
    InputMissing { kind: &'static str, path: PathBuf },

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("invalid key pattern {pattern:?} on board {board}: {source}")]
    InvalidPattern {
        board: String,
        pattern: String,
        #[source]
        source: fancy_regex::Error,
    },

    #[error("unknown library symbol: {0}")]
    UnknownSymbol(String),

    #[error("duplicate reference designator {0}")]
    DuplicateReference(String),

    #[error("symbol {lib_id} has no pin {pin}")]
    MissingPin { lib_id: String, pin: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
