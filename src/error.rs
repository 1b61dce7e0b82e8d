use serde::Deserialize;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// A superseded operation; never shown and never applied
    #[error("Request cancelled")]
    Cancelled,

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Remote store returned status {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Operation already in flight for item {0}")]
    Busy(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppError::Cancelled)
    }

    /// Text for a user-visible notice.
    ///
    /// Remote rejections carry the server's own message (for example the
    /// refusal to remove the last season), which is shown as-is.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Remote { message, .. } if !message.trim().is_empty() => message.clone(),
            AppError::Remote { status, .. } => format!("Remote store rejected the request ({})", status),
            AppError::HttpClient(_) => "Could not reach the catalog service.".to_string(),
            AppError::NotFound(what) => format!("{} no longer exists.", what),
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::Cancelled
            | AppError::Busy(_)
            | AppError::MalformedResponse(_)
            | AppError::Internal(_) => self.to_string(),
        }
    }
}

/// Error body returned by the remote store on non-2xx responses
#[derive(Debug, Deserialize)]
pub struct RemoteErrorBody {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl RemoteErrorBody {
    /// Builds an `AppError::Remote` from a status code and raw response body
    pub fn into_error(status: u16, body: &str) -> AppError {
        let message = match serde_json::from_str::<RemoteErrorBody>(body) {
            Ok(parsed) => parsed
                .message
                .or(parsed.error)
                .unwrap_or_else(|| body.to_string()),
            Err(_) => body.to_string(),
        };
        AppError::Remote { status, message }
    }
}

pub type AppResult<T> = Result<T, AppError>;
