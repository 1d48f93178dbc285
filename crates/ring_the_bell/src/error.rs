use thiserror::Error;

/// Why an `X-Hub-Signature` check turned a request away.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing X-Hub-Signature header")]
    MissingHeader,
    #[error("X-Hub-Signature is not a sha1=<hex> value")]
    MalformedHeader,
    #[error("signature mismatch")]
    Mismatch,
}

/// Hub responses to a subscribe/unsubscribe form post, by fault line: 400 is
/// our request, 404 is our endpoint choice, anything else unexpected is the
/// hub's problem but still ours to log.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("hub rejected the request: {body}")]
    BadRequest { body: String },
    #[error("hub endpoint not found: {body}")]
    NotFound { body: String },
    #[error("unexpected hub response {status}: {body}")]
    UnexpectedResponse { status: u16, body: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

impl HubError {
    /// Transient failures are worth another attempt on the next sweep;
    /// a 400/404 will not get better by retrying.
    pub fn is_permanent(&self) -> bool {
        matches!(self, HubError::BadRequest { .. } | HubError::NotFound { .. })
    }
}

#[derive(Debug, Error)]
pub enum YoutubeApiError {
    #[error("youtube api returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

impl YoutubeApiError {
    pub fn is_retryable(&self) -> bool {
        match self {
            YoutubeApiError::Status { status, .. } => *status >= 500 || *status == 429,
            YoutubeApiError::Transport(_) => true,
        }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("llm response was not the expected json shape: {0}")]
    BadPayload(String),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

impl LlmError {
    /// A body that arrived but failed to parse will parse no better on a
    /// second delivery.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Status { status, .. } => *status >= 500 || *status == 429,
            LlmError::BadPayload(_) => false,
            LlmError::Transport(_) => true,
        }
    }
}
