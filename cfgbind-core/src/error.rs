use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("bind takes an open string-keyed map or a record, got {0}")]
    InvalidBindTarget(String),

    #[error("strict binding takes a record, got {0}")]
    InvalidStrictTarget(String),

    #[error("text decoding failed for key '{key}': {message}")]
    CodecDecode { key: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
