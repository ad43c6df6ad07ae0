//! Cache-or-generate behaviour of ExplanationService against an in-memory
//! store and a scripted generator.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use explainer_gateway::explain::Origin;
use explainer_gateway::genai::TextGenerator;
use explainer_gateway::store::{ExplanationStore, MemoryStore};
use explainer_gateway::{Error, ExplanationRecord, ExplanationRequest, ExplanationService, Explanations, Question};

/// Replies per model; models without a script fail with a provider error.
#[derive(Default)]
struct ScriptedGenerator {
    replies: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn reply(mut self, model: &str, text: &str) -> Self {
        self.replies.insert(model.to_string(), text.to_string());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, model: &str, _prompt: &str) -> explainer_gateway::Result<String> {
        self.calls.lock().unwrap().push(model.to_string());
        self.replies
            .get(model)
            .cloned()
            .ok_or_else(|| Error::provider("scripted", Some(503), format!("{model} overloaded")))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

fn models() -> Vec<String> {
    vec!["m1".to_string(), "m2".to_string(), "m3".to_string()]
}

fn request(exam_id: &str) -> ExplanationRequest {
    ExplanationRequest {
        exam_id: Some(exam_id.to_string()),
        exam_title: Some("Networking Basics".to_string()),
        questions: Some(vec![
            Question {
                id: "q1".into(),
                text: "What port does HTTPS use?".into(),
                options: vec!["80".into(), "443".into()],
                correct_index: Some(1),
            },
            Question {
                id: "q2".into(),
                text: "Which layer is IP?".into(),
                options: vec!["Network".into(), "Transport".into()],
                correct_index: Some(0),
            },
        ]),
    }
}

fn service(store: &Arc<MemoryStore>, generator: &Arc<ScriptedGenerator>) -> ExplanationService {
    let store: Arc<dyn ExplanationStore> = store.clone();
    let generator: Arc<dyn TextGenerator> = generator.clone();
    ExplanationService::new(Some(store), Some(generator), models())
}

#[tokio::test]
async fn test_cache_hit_skips_generation() {
    let store = Arc::new(MemoryStore::new());
    let mut cached = Explanations::new();
    cached.insert("q1".into(), "cached text".into());
    store.seed(ExplanationRecord::new("exam-1", "Networking Basics", cached.clone()));

    let generator = Arc::new(ScriptedGenerator::default().reply("m1", r#"{"q1":"fresh"}"#));
    let outcome = service(&store, &generator)
        .explain_with_origin(&request("exam-1"))
        .await
        .unwrap();

    assert_eq!(outcome.origin, Origin::Cache);
    assert_eq!(outcome.explanations, cached);
    assert!(generator.calls().is_empty());
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn test_miss_generates_and_persists_once() {
    let store = Arc::new(MemoryStore::new());
    let generator = Arc::new(
        ScriptedGenerator::default().reply("m1", r#"{"q1":"443 is HTTPS.","q2":"IP is layer 3."}"#),
    );
    let svc = service(&store, &generator);

    let outcome = svc.explain_with_origin(&request("exam-2")).await.unwrap();
    assert_eq!(outcome.origin, Origin::Generated { model: "m1".into() });
    assert_eq!(outcome.explanations["q1"], "443 is HTTPS.");
    assert_eq!(store.writes(), 1);

    let stored = store.get("exam-2").await.unwrap().unwrap();
    assert_eq!(stored.exam_title, "Networking Basics");
    assert_eq!(stored.explanations, outcome.explanations);
    assert!(stored.created_at.is_some());

    // Second request is a hit.
    let again = svc.explain_with_origin(&request("exam-2")).await.unwrap();
    assert_eq!(again.origin, Origin::Cache);
    assert_eq!(generator.calls(), vec!["m1"]);
    assert_eq!(store.writes(), 1);
}

#[tokio::test]
async fn test_falls_back_past_failing_and_unparseable_models() {
    let store = Arc::new(MemoryStore::new());
    // m1 errors (no script), m2 returns prose, m3 returns fenced JSON.
    let generator = Arc::new(
        ScriptedGenerator::default()
            .reply("m2", "Sure! Here are your explanations.")
            .reply("m3", "```json\n{\"q1\":\"a\",\"q2\":\"b\"}\n```"),
    );

    let outcome = service(&store, &generator)
        .explain_with_origin(&request("exam-3"))
        .await
        .unwrap();

    assert_eq!(outcome.origin, Origin::Generated { model: "m3".into() });
    assert_eq!(outcome.explanations["q2"], "b");
    assert_eq!(generator.calls(), vec!["m1", "m2", "m3"]);
    assert_eq!(store.writes(), 1);
}

#[tokio::test]
async fn test_all_models_failing_writes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let generator = Arc::new(ScriptedGenerator::default().reply("m3", "not json"));

    let err = service(&store, &generator)
        .explain(&request("exam-4"))
        .await
        .unwrap_err();

    match err {
        Error::AllModelsFailed { attempts, last_error } => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("Malformed model output"), "{last_error}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.writes(), 0);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_fenced_and_plain_output_agree() {
    let plain = r#"{"q1":"x","q2":"y"}"#;
    let fenced = format!("```json\n{plain}\n```");

    let mut results = Vec::new();
    for text in [plain.to_string(), fenced] {
        let store = Arc::new(MemoryStore::new());
        let generator = Arc::new(ScriptedGenerator::default().reply("m1", &text));
        results.push(service(&store, &generator).explain(&request("exam-5")).await.unwrap());
    }
    assert_eq!(results[0], results[1]);
}

#[tokio::test]
async fn test_invalid_request_touches_nothing() {
    let store = Arc::new(MemoryStore::new());
    let generator = Arc::new(ScriptedGenerator::default().reply("m1", "{}"));
    let svc = service(&store, &generator);

    let mut req = request("exam-6");
    req.questions = None;
    let err = svc.explain(&req).await.unwrap_err();
    assert!(err.is_client_error());
    assert_eq!(err.to_string(), "examId and questions are required");
    assert_eq!(store.reads(), 0);
    assert!(generator.calls().is_empty());
}

#[tokio::test]
async fn test_missing_collaborators_are_unavailable() {
    let generator: Arc<dyn TextGenerator> = Arc::new(ScriptedGenerator::default());
    let no_store = ExplanationService::new(None, Some(generator), models());
    let err = no_store.explain(&request("exam-7")).await.unwrap_err();
    assert!(matches!(err, Error::Unavailable(ref what) if what == "document store"));

    let store: Arc<dyn ExplanationStore> = Arc::new(MemoryStore::new());
    let no_generator = ExplanationService::new(Some(store), None, models());
    let err = no_generator.explain(&request("exam-7")).await.unwrap_err();
    assert!(matches!(err, Error::Unavailable(ref what) if what == "generative AI client"));
}

/// Accepts reads, rejects every write.
struct ReadOnlyStore;

#[async_trait]
impl ExplanationStore for ReadOnlyStore {
    async fn get(&self, _exam_id: &str) -> explainer_gateway::Result<Option<ExplanationRecord>> {
        Ok(None)
    }

    async fn put(&self, _record: &ExplanationRecord) -> explainer_gateway::Result<()> {
        Err(Error::provider("firestore", Some(403), "Missing or insufficient permissions."))
    }

    fn name(&self) -> &'static str {
        "read-only"
    }
}

#[tokio::test]
async fn test_failed_write_is_not_reported_as_success() {
    let generator = Arc::new(ScriptedGenerator::default().reply("m1", r#"{"q1":"a","q2":"b"}"#));
    let store: Arc<dyn ExplanationStore> = Arc::new(ReadOnlyStore);
    let dyn_generator: Arc<dyn TextGenerator> = generator.clone();
    let svc = ExplanationService::new(Some(store), Some(dyn_generator), models());

    let err = svc.explain(&request("exam-8")).await.unwrap_err();
    assert!(!err.is_client_error());
    assert!(matches!(err, Error::Provider { status: Some(403), .. }));
    assert_eq!(generator.calls(), vec!["m1"]);
}
