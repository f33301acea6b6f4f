use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to create HTTP client: {0}")]
    Builder(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unsuccessful status {status} from {url}, response is {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Parse(#[from] vsfetch_core::ParseError),
}

impl ClientError {
    /// Transport failures and timeouts, as opposed to a response the remote
    /// side rejected.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Request { .. })
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
