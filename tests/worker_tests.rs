use async_trait::async_trait;
use newslens_node::error::PipelineError;
use newslens_node::events::{ObjectRef, TriggerEvent};
use newslens_node::generation::ArticleGenerator;
use newslens_node::store::{MemoryStore, ObjectStore};
use newslens_node::vision::VisionAnalyzer;
use newslens_node::worker::{PipelineWorker, WorkerOutcome, ARTICLE_CONTENT_TYPE};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const BUCKET: &str = "test-bucket";

/// Vision double returning fixed analysis facts while counting each call.
struct ScriptedVision {
    labels: Vec<String>,
    faces: usize,
    celebrities: Vec<String>,
    label_calls: AtomicUsize,
    face_calls: AtomicUsize,
    celebrity_calls: AtomicUsize,
}

impl ScriptedVision {
    fn new(labels: &[&str], faces: usize, celebrities: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            labels: labels.iter().map(|s| s.to_string()).collect(),
            faces,
            celebrities: celebrities.iter().map(|s| s.to_string()).collect(),
            label_calls: AtomicUsize::new(0),
            face_calls: AtomicUsize::new(0),
            celebrity_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl VisionAnalyzer for ScriptedVision {
    async fn detect_labels(
        &self,
        _image: &ObjectRef,
        _max_labels: u32,
    ) -> Result<Vec<String>, PipelineError> {
        self.label_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.labels.clone())
    }

    async fn detect_faces(&self, _image: &ObjectRef) -> Result<usize, PipelineError> {
        self.face_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.faces)
    }

    async fn recognize_celebrities(
        &self,
        _image: &ObjectRef,
    ) -> Result<Vec<String>, PipelineError> {
        self.celebrity_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.celebrities.clone())
    }
}

/// Generator double producing a numbered article per call.
struct CountingGenerator {
    calls: AtomicUsize,
    fail: bool,
    empty: bool,
}

impl CountingGenerator {
    fn ok() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: false,
            empty: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: true,
            empty: false,
        })
    }

    fn empty() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: false,
            empty: true,
        })
    }
}

#[async_trait]
impl ArticleGenerator for CountingGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, PipelineError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail {
            return Err(PipelineError::upstream(
                "generation",
                Some(500),
                "generation endpoint returned 500",
            ));
        }
        if self.empty {
            return Ok("   \n  ".to_string());
        }
        Ok(format!("Generated Title #{call}\nBody derived from: {prompt}"))
    }
}

fn worker_with(
    store: Arc<MemoryStore>,
    vision: Arc<ScriptedVision>,
    generator: Arc<CountingGenerator>,
) -> PipelineWorker {
    PipelineWorker::new(store, vision, generator, 10)
}

fn event_for(key: &str) -> String {
    TriggerEvent::for_object(BUCKET, key).to_json()
}

#[tokio::test]
async fn success_writes_article_at_derived_key() {
    let store = Arc::new(MemoryStore::new());
    let vision = ScriptedVision::new(&["cat", "grass"], 0, &[]);
    let generator = CountingGenerator::ok();
    let worker = worker_with(store.clone(), vision.clone(), generator.clone());

    let outcome = worker.handle(&event_for("uploads/cat.jpg")).await;
    match outcome {
        WorkerOutcome::Success { article_key } => {
            assert_eq!(article_key, "articles/cat_article.txt")
        }
        other => panic!("expected success, got {other:?}"),
    }

    let object = store.get(BUCKET, "articles/cat_article.txt").await.unwrap();
    assert_eq!(object.content_type, ARTICLE_CONTENT_TYPE);
    let text = String::from_utf8(object.bytes).unwrap();
    assert!(text.starts_with("Generated Title #1"));
}

#[tokio::test]
async fn zero_labels_short_circuits_every_downstream_call() {
    let store = Arc::new(MemoryStore::new());
    let vision = ScriptedVision::new(&[], 3, &["X"]);
    let generator = CountingGenerator::ok();
    let worker = worker_with(store.clone(), vision.clone(), generator.clone());

    let outcome = worker.handle(&event_for("uploads/blank.gif")).await;
    assert!(
        matches!(outcome, WorkerOutcome::EmptyResult { collaborator: "vision", .. }),
        "{outcome:?}"
    );

    assert_eq!(vision.label_calls.load(Ordering::SeqCst), 1);
    assert_eq!(vision.face_calls.load(Ordering::SeqCst), 0);
    assert_eq!(vision.celebrity_calls.load(Ordering::SeqCst), 0);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.object_count(), 0);
}

#[tokio::test]
async fn identity_lookup_skipped_without_faces() {
    let store = Arc::new(MemoryStore::new());
    let vision = ScriptedVision::new(&["cat"], 0, &[]);
    let generator = CountingGenerator::ok();
    let worker = worker_with(store, vision.clone(), generator);

    let outcome = worker.handle(&event_for("uploads/cat.jpg")).await;
    assert!(outcome.is_success());
    assert_eq!(vision.face_calls.load(Ordering::SeqCst), 1);
    assert_eq!(vision.celebrity_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn identity_lookup_called_once_with_faces() {
    let store = Arc::new(MemoryStore::new());
    let vision = ScriptedVision::new(&["people"], 3, &["X"]);
    let generator = CountingGenerator::ok();
    let worker = worker_with(store, vision.clone(), generator);

    let outcome = worker.handle(&event_for("uploads/group.png")).await;
    assert!(outcome.is_success());
    assert_eq!(vision.celebrity_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn duplicate_invocations_overwrite_the_same_key() {
    let store = Arc::new(MemoryStore::new());
    let vision = ScriptedVision::new(&["cat"], 0, &[]);
    let generator = CountingGenerator::ok();
    let worker = worker_with(store.clone(), vision, generator);

    let raw = event_for("uploads/cat.jpg");
    assert!(worker.handle(&raw).await.is_success());
    assert!(worker.handle(&raw).await.is_success());

    // Second write wins; image objects aside, no extra article objects exist
    assert_eq!(store.object_count(), 1);
    let object = store.get(BUCKET, "articles/cat_article.txt").await.unwrap();
    let text = String::from_utf8(object.bytes).unwrap();
    assert!(text.starts_with("Generated Title #2"));
}

#[tokio::test]
async fn malformed_event_is_a_client_error_without_collaborator_calls() {
    let store = Arc::new(MemoryStore::new());
    let vision = ScriptedVision::new(&["cat"], 0, &[]);
    let generator = CountingGenerator::ok();
    let worker = worker_with(store.clone(), vision.clone(), generator.clone());

    for raw in ["not json", "{}", r#"{"Records":[]}"#] {
        let outcome = worker.handle(raw).await;
        assert!(matches!(outcome, WorkerOutcome::ClientError { .. }), "{raw}");
    }

    assert_eq!(vision.label_calls.load(Ordering::SeqCst), 0);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.object_count(), 0);
}

#[tokio::test]
async fn generation_failure_writes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let vision = ScriptedVision::new(&["cat"], 0, &[]);
    let generator = CountingGenerator::failing();
    let worker = worker_with(store.clone(), vision, generator);

    let outcome = worker.handle(&event_for("uploads/cat.jpg")).await;
    match outcome {
        WorkerOutcome::UpstreamError {
            collaborator,
            status,
            ..
        } => {
            assert_eq!(collaborator, "generation");
            assert_eq!(status, Some(500));
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
    assert_eq!(store.object_count(), 0);
}

#[tokio::test]
async fn blank_generation_output_is_an_empty_result() {
    let store = Arc::new(MemoryStore::new());
    let vision = ScriptedVision::new(&["cat"], 0, &[]);
    let generator = CountingGenerator::empty();
    let worker = worker_with(store.clone(), vision, generator);

    let outcome = worker.handle(&event_for("uploads/cat.jpg")).await;
    assert!(
        matches!(outcome, WorkerOutcome::EmptyResult { collaborator: "generation", .. }),
        "{outcome:?}"
    );
    assert_eq!(store.object_count(), 0);
}
