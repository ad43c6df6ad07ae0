//! Structured logging: `tracing` subscriber setup and payload redaction.
//!
//! Log lines carry timestamp, level and target. Every field on every event
//! goes through the redacting formatter in [`format`]: sensitive field names
//! are masked outright, JSON values are walked with [`redact`], and
//! `key=...` style pairs inside free text lose their value.

mod format;
mod redact;

pub use format::{build_subscriber, format_field};
pub use redact::{is_sensitive_key, redact, redact_text, Redacted, REDACTED, SENSITIVE_TERMS};

use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `level` accepts a bare level (`debug`) or
/// full `EnvFilter` directives (`info,explainer_gateway=debug`); an invalid
/// value falls back to `info`.
///
/// Returns `false` if a subscriber was already installed (e.g. in tests).
pub fn init(level: &str) -> bool {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    build_subscriber(filter, std::io::stdout, true).try_init().is_ok()
}
