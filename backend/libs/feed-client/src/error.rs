use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("a submission is already in flight")]
    SubmissionInFlight,
}

#[derive(Debug, Error)]
pub enum ClientError {
    /// Non-2xx answer; `message` is the server's `error` field
    #[error("server returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("not logged in")]
    NotAuthenticated,

    #[error("http transport: {0}")]
    Http(#[from] reqwest::Error),

    #[error("websocket transport: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("undecodable payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
