//! Environment-sourced service configuration, read once at startup.

use secrecy::SecretString;
use std::path::PathBuf;

use crate::credentials::CredentialSource;
use crate::{Error, ErrorContext, Result};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_COLLECTION: &str = "exam_explanations";

/// Models tried in order by the explanation fallback loop.
pub const DEFAULT_MODELS: &[&str] = &["gemini-2.0-flash", "gemini-1.5-flash", "gemini-1.5-pro"];

/// Payment provider environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentMode {
    Sandbox,
    Live,
}

impl DeploymentMode {
    /// `production` (any case) selects live; everything else is sandbox.
    pub fn from_app_env(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("production") => DeploymentMode::Live,
            _ => DeploymentMode::Sandbox,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PayPalCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub log_level: String,
    pub port: u16,
    pub credential_source: CredentialSource,
    pub gemini_api_key: Option<SecretString>,
    pub gemini_models: Vec<String>,
    /// `GEMINI_TEMPERATURE`; model default when unset.
    pub gemini_temperature: Option<f64>,
    /// `GEMINI_MAX_OUTPUT_TOKENS`; model default when unset.
    pub gemini_max_output_tokens: Option<u32>,
    pub deployment_mode: DeploymentMode,
    pub paypal: Option<PayPalCredentials>,
    pub explanations_collection: String,
    /// `host:port` of a Firestore emulator; bypasses credential bootstrap.
    pub firestore_emulator_host: Option<String>,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = parse_var(&get, "PORT")?.unwrap_or(DEFAULT_PORT);

        let gemini_models = get("GEMINI_MODELS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|models| !models.is_empty())
            .unwrap_or_else(|| DEFAULT_MODELS.iter().map(|m| m.to_string()).collect());

        let paypal = match (get("PAYPAL_CLIENT_ID"), get("PAYPAL_CLIENT_SECRET")) {
            (Some(client_id), Some(secret)) => Some(PayPalCredentials {
                client_id,
                client_secret: SecretString::new(secret),
            }),
            _ => None,
        };

        Ok(Self {
            log_level: get("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            port,
            credential_source: Self::credential_source(&get),
            gemini_api_key: get("GEMINI_API_KEY").map(SecretString::new),
            gemini_models,
            gemini_temperature: parse_var(&get, "GEMINI_TEMPERATURE")?,
            gemini_max_output_tokens: parse_var(&get, "GEMINI_MAX_OUTPUT_TOKENS")?,
            deployment_mode: DeploymentMode::from_app_env(get("APP_ENV").as_deref()),
            paypal,
            explanations_collection: get("EXPLANATIONS_COLLECTION")
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            firestore_emulator_host: get("FIRESTORE_EMULATOR_HOST"),
        })
    }

    // Inline JSON wins over a file path, which wins over the ambient default.
    fn credential_source(get: &dyn Fn(&str) -> Option<String>) -> CredentialSource {
        if let Some(json) = get("FIREBASE_SERVICE_ACCOUNT_JSON") {
            return CredentialSource::Inline(SecretString::new(json));
        }
        if let Some(path) =
            get("FIREBASE_SERVICE_ACCOUNT_PATH").or_else(|| get("GOOGLE_APPLICATION_CREDENTIALS"))
        {
            return CredentialSource::File(PathBuf::from(path));
        }
        CredentialSource::Ambient {
            project_id: get("GOOGLE_CLOUD_PROJECT").or_else(|| get("GCLOUD_PROJECT")),
        }
    }

    /// Non-secret summary for the startup log line.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "port": self.port,
            "logLevel": self.log_level,
            "bootstrapSource": self.credential_source.kind(),
            "geminiConfigured": self.gemini_api_key.is_some(),
            "geminiModels": self.gemini_models,
            "deploymentMode": format!("{:?}", self.deployment_mode),
            "paypalConfigured": self.paypal.is_some(),
            "collection": self.explanations_collection,
            "firestoreEmulator": self.firestore_emulator_host,
        })
    }
}

fn parse_var<T>(get: &dyn Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(name) {
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid {} '{}'", name, raw),
                ErrorContext::new()
                    .with_field_path(name)
                    .with_details(e.to_string()),
            )
        }),
        None => Ok(None),
    }
}
