use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Backend returned status {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Malformed timestamp {raw:?}: {source}")]
    MalformedTimestamp {
        raw: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Malformed payload: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DataSourceError>;
