//! Outbound HTTP plumbing shared by the Gemini, Firestore, PayPal and token clients.

mod http;

pub use http::{build_client, provider_message, read_json, send_json, TransportError};
