use thiserror::Error;

/// Failure of an outbound call to a feed, webhook or the face service.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered {status}")]
    Status { url: String, status: u16 },

    #[error("unexpected response: {0}")]
    UnexpectedShape(String),

    #[error("no webhook configured for {0}")]
    NotConfigured(&'static str),

    /// The remote service reported an error of its own.
    #[error("{0}")]
    Service(String),
}
