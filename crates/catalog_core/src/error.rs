use thiserror::Error;

/// Failure of a single catalog read, normalized at the HTTP boundary.
///
/// The `Display` output is the human-readable message surfaced to views, so
/// both branches keep the exact wording existing consumers match on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request never produced an HTTP response (connect, DNS, timeout).
    #[error("An error occurred: {0}")]
    Transport(String),
    /// The backend answered with a non-success status.
    #[error("Backend returned code {status}: {message}")]
    Server { status: u16, message: String },
}

impl FetchError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(_) => None,
            Self::Server { status, .. } => Some(*status),
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid catalog base url '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("unsupported scheme '{scheme}' in catalog base url '{url}'")]
    UnsupportedScheme { url: String, scheme: String },
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}
