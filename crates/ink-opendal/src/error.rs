//! Error handling for blob storage operations.

/// Result type alias for storage operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for blob storage operations.
#[derive(Debug, thiserror::Error)]
#[error("{}", .message.as_ref().map(|m| format!("{}: {}", .kind, m)).unwrap_or_else(|| .kind.to_string()))]
pub struct Error {
    /// The specific kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional additional message providing more context.
    pub message: Option<String>,
    /// Optional source error for additional context.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a source error to this error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config).with_message(message)
    }

    /// Creates a backend error from an OpenDAL failure.
    pub fn backend(source: opendal::Error) -> Self {
        let kind = match source.kind() {
            opendal::ErrorKind::NotFound => ErrorKind::NotFound,
            opendal::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            opendal::ErrorKind::RateLimited => ErrorKind::Transient,
            _ if source.is_temporary() => ErrorKind::Transient,
            _ => ErrorKind::Backend,
        };
        Self::new(kind)
            .with_message(source.to_string())
            .with_source(source)
    }

    /// Creates an I/O error for the local read side of an upload.
    pub fn io(source: std::io::Error) -> Self {
        Self::new(ErrorKind::Io)
            .with_message(source.to_string())
            .with_source(source)
    }

    /// Returns true if retrying the operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::Transient)
    }
}

/// Specific kinds of blob storage errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or incomplete storage configuration.
    Config,
    /// The addressed blob does not exist.
    NotFound,
    /// The backend rejected the credentials or operation.
    PermissionDenied,
    /// Temporary backend failure, worth retrying.
    Transient,
    /// Any other backend failure.
    Backend,
    /// Local I/O failure while reading upload data.
    Io,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config => write!(f, "Storage configuration error"),
            Self::NotFound => write!(f, "Blob not found"),
            Self::PermissionDenied => write!(f, "Storage permission denied"),
            Self::Transient => write!(f, "Transient storage failure"),
            Self::Backend => write!(f, "Storage backend failure"),
            Self::Io => write!(f, "Storage I/O failure"),
        }
    }
}
