use crate::transport::TransportError;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Request field or configuration key that caused the error (e.g., "examId", "PAYPAL_CLIENT_ID")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected type, actual value)
    pub details: Option<String>,
    /// Component that raised the error (e.g., "explain", "credentials")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the gateway.
///
/// Variants map onto the HTTP boundary: `InvalidRequest` is the only
/// client-side error, everything else surfaces as a 500.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{message}")]
    InvalidRequest {
        message: String,
        context: ErrorContext,
    },

    #[error("All {attempts} model attempts failed; last error: {last_error}")]
    AllModelsFailed { attempts: usize, last_error: String },

    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    #[error("{provider} error{}: {message}", format_status(.status))]
    Provider {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Credential error: {message}{}", format_context(.context))]
    UnreachableCredential {
        message: String,
        context: ErrorContext,
    },

    #[error("{0} is not available")]
    Unavailable(String),

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Network transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn format_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {})", code),
        None => String::new(),
    }
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Missing or malformed request field.
    pub fn invalid_request(msg: impl Into<String>, field: impl Into<String>) -> Self {
        Error::InvalidRequest {
            message: msg.into(),
            context: ErrorContext::new().with_field_path(field),
        }
    }

    pub fn provider(provider: impl Into<String>, status: Option<u16>, msg: impl Into<String>) -> Self {
        Error::Provider {
            provider: provider.into(),
            status,
            message: msg.into(),
        }
    }

    pub fn credential_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::UnreachableCredential {
            message: msg.into(),
            context,
        }
    }

    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// True for errors the caller caused (400 at the HTTP boundary).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidRequest { .. })
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::InvalidRequest { context, .. }
            | Error::UnreachableCredential { context, .. }
            | Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }
}
