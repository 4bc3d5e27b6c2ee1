use thiserror::Error;

#[derive(Error, Debug)]
pub enum Txt2SqlError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("generator error: {0}")]
    Generator(String),

    #[error("tracing initialization failed: {0}")]
    Tracing(String),
}

pub type Result<T> = std::result::Result<T, Txt2SqlError>;
