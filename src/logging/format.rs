//! Field formatter that redacts every event and span field on the way out.

use std::fmt;
use tracing::field::Field;
use tracing::Subscriber;
use tracing_subscriber::field::MakeExt;
use tracing_subscriber::fmt::format::{debug_fn, Writer};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

use super::redact::{is_sensitive_key, redact_text, REDACTED};

/// Render one field. Sensitive names lose their value entirely; other values
/// pass through [`redact_text`].
pub fn format_field(writer: &mut Writer<'_>, field: &Field, value: &dyn fmt::Debug) -> fmt::Result {
    let name = field.name();
    if is_sensitive_key(name) {
        return write!(writer, "{}={}", name, REDACTED);
    }
    let rendered = format!("{:?}", value);
    let rendered = redact_text(&rendered);
    if name == "message" {
        write!(writer, "{}", rendered)
    } else {
        write!(writer, "{}={}", name, rendered)
    }
}

/// `fmt` subscriber with timestamp, level, target and redacted fields.
pub fn build_subscriber<W>(filter: EnvFilter, writer: W, ansi: bool) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(ansi)
        .fmt_fields(debug_fn(format_field).delimited(" "))
        .with_writer(writer)
        .finish()
}
