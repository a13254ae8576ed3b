use thiserror::Error;

#[derive(Error, Debug)]
pub enum AzrgError {
    #[error("config error: {0}")]
    Config(String),

    #[error("credential error: {0}")]
    Credential(String),

    /// The source is not configured or not reachable here. Only this error
    /// lets a credential chain move on to its next source.
    #[error("credential unavailable: {0}")]
    CredentialUnavailable(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Error body returned by Azure Resource Manager. Displays as the bare
    /// service message so tool responses read like the service wrote them.
    #[error("{message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AzrgError>;
