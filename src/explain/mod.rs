//! Explanation cache-and-generate orchestration.
//!
//! ## Flow
//!
//! 1. Validate the request (`examId` and a non-empty `questions` list).
//! 2. Look the exam up in the document store; a hit is returned as-is.
//! 3. On a miss, build one prompt for the whole exam and run it through
//!    [`ModelFallback`] until a model returns parseable JSON.
//! 4. Persist the result, then return it.
//!
//! Concurrent misses for the same exam may both generate and both write;
//! the last write wins.

mod fallback;
mod parse;
mod prompt;

pub use fallback::ModelFallback;
pub use parse::{parse_explanations, strip_code_fences};
pub use prompt::{build_prompt, UNKNOWN_ANSWER};

use std::sync::Arc;
use tracing::{info, warn};

use crate::genai::TextGenerator;
use crate::store::ExplanationStore;
use crate::types::{ExplanationRecord, ExplanationRequest, Explanations, Question};
use crate::{Error, Result};

/// Which path produced an explanation set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Cache,
    Generated { model: String },
}

#[derive(Debug, Clone)]
pub struct ExplainOutcome {
    pub explanations: Explanations,
    pub origin: Origin,
}

pub struct ExplanationService {
    store: Option<Arc<dyn ExplanationStore>>,
    generator: Option<Arc<dyn TextGenerator>>,
    fallback: ModelFallback,
}

impl ExplanationService {
    /// `store` and `generator` are `None` when their startup initialization failed.
    pub fn new(
        store: Option<Arc<dyn ExplanationStore>>,
        generator: Option<Arc<dyn TextGenerator>>,
        models: Vec<String>,
    ) -> Self {
        Self {
            store,
            generator,
            fallback: ModelFallback::new(models),
        }
    }

    pub fn models(&self) -> &[String] {
        self.fallback.candidates()
    }

    pub async fn explain(&self, request: &ExplanationRequest) -> Result<Explanations> {
        self.explain_with_origin(request).await.map(|o| o.explanations)
    }

    pub async fn explain_with_origin(&self, request: &ExplanationRequest) -> Result<ExplainOutcome> {
        let (exam_id, questions) = validate(request)?;

        let store = self
            .store
            .as_ref()
            .ok_or_else(|| Error::Unavailable("document store".to_string()))?;

        if let Some(record) = store.get(exam_id).await? {
            info!(exam_id, store = store.name(), "explanations served from cache");
            return Ok(ExplainOutcome {
                explanations: record.explanations,
                origin: Origin::Cache,
            });
        }

        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| Error::Unavailable("generative AI client".to_string()))?;

        let title = request.title_or_placeholder();
        let prompt = Arc::new(build_prompt(title, questions));

        let (model, explanations) = self
            .fallback
            .run(|model| {
                let generator = Arc::clone(generator);
                let prompt = Arc::clone(&prompt);
                async move {
                    let text = generator.generate(&model, &prompt).await?;
                    parse_explanations(&text)
                }
            })
            .await?;

        let missing = questions
            .iter()
            .filter(|q| !explanations.contains_key(&q.id))
            .count();
        if missing > 0 {
            warn!(exam_id, model = %model, missing, "model skipped some questions");
        }

        let record = ExplanationRecord::new(exam_id, title, explanations);
        store.put(&record).await?;
        info!(
            exam_id,
            model = %model,
            count = record.explanations.len(),
            "explanations generated and cached"
        );

        Ok(ExplainOutcome {
            explanations: record.explanations,
            origin: Origin::Generated { model },
        })
    }
}

fn validate(request: &ExplanationRequest) -> Result<(&str, &[Question])> {
    let exam_id = request
        .exam_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());
    let questions = request.questions.as_deref().filter(|q| !q.is_empty());

    match (exam_id, questions) {
        (Some(id), Some(questions)) => Ok((id, questions)),
        (None, _) => Err(Error::invalid_request("examId and questions are required", "examId")),
        (_, None) => Err(Error::invalid_request("examId and questions are required", "questions")),
    }
}
