//! Model fallback: try each candidate model in order, advancing only on failure.

use std::future::Future;
use tracing::warn;

use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct ModelFallback {
    candidates: Vec<String>, // model ids, highest priority first
}

impl ModelFallback {
    pub fn new(candidates: Vec<String>) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Run `attempt` against each candidate in order and return the first
    /// success together with the model that produced it.
    ///
    /// One pass only: a failed model is never retried.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<(String, T)>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error: Option<Error> = None;

        for (i, model) in self.candidates.iter().enumerate() {
            match attempt(model.clone()).await {
                Ok(value) => return Ok((model.clone(), value)),
                Err(e) => {
                    warn!(
                        model = %model,
                        attempt = i + 1,
                        of = self.candidates.len(),
                        error = %e,
                        "model attempt failed, falling back"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(Error::AllModelsFailed {
            attempts: self.candidates.len(),
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no models configured".to_string()),
        })
    }
}
