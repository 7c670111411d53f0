use thiserror::Error;

/// Reasons an incoming NHS UK change event is turned away by the receiver
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ODSCode is missing")]
    MissingOdsCode,

    #[error("ODSCode '{0}' is shorter than 5 characters")]
    OdsCodeTooShort(String),

    #[error("ODSCode '{0}' contains non alphanumeric characters")]
    OdsCodeNotAlphanumeric(String),

    #[error("Unexpected OrganisationTypeId '{0}'")]
    UnexpectedOrganisationType(String),

    #[error("Unexpected OrganisationSubType '{0}'")]
    UnexpectedOrganisationSubType(String),
}

#[derive(Error, Debug)]
pub enum DosIntegrationError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid change event: {0}")]
    Validation(#[from] ValidationError),

    #[error("Malformed change event: {0}")]
    MalformedEvent(String),

    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("Secrets error: {0}")]
    Secrets(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid change request: {0}")]
    InvalidChangeRequest(String),

    #[error("Change request rejected with status {status}: {body}")]
    ChangeRequestRejected { status: u16, body: String },

    #[error("Function URL {url} returned status {status}: {body}")]
    FunctionRejected { url: String, status: u16, body: String },

    #[error("Channel send error: {0}")]
    ChannelSend(String),
}

impl From<config::ConfigError> for DosIntegrationError {
    fn from(err: config::ConfigError) -> Self {
        DosIntegrationError::Config(err.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for DosIntegrationError {
    fn from(err: tokio::sync::mpsc::error::SendError<T>) -> Self {
        DosIntegrationError::ChannelSend(err.to_string())
    }
}

impl DosIntegrationError {
    /// Short label used for error metrics
    pub fn kind(&self) -> &'static str {
        match self {
            DosIntegrationError::Config(_) => "config",
            DosIntegrationError::Validation(_)
            | DosIntegrationError::MalformedEvent(_)
            | DosIntegrationError::InvalidChangeRequest(_) => "validation",
            DosIntegrationError::Database(_) => "database",
            DosIntegrationError::Secrets(_) => "secrets",
            DosIntegrationError::Http(_)
            | DosIntegrationError::ChangeRequestRejected { .. }
            | DosIntegrationError::FunctionRejected { .. } => "http",
            DosIntegrationError::Io(_) => "io",
            DosIntegrationError::ChannelSend(_) => "channel",
        }
    }
}
