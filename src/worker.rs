//! Pipeline worker.
//!
//! Invoked once per storage trigger event. Orchestrates the analysis and
//! generation collaborators and writes the article object back to the store
//! under a key derived deterministically from the image key. Nothing waits
//! synchronously on its return value; the written object is the only effect
//! the rest of the system observes. Every failure is classified into a
//! structured outcome and logged with enough context to diagnose.

use crate::error::PipelineError;
use crate::events::{ObjectRef, TriggerEvent};
use crate::generation::{self, compose_prompt, ArticleGenerator};
use crate::keys;
use crate::metrics;
use crate::store::ObjectStore;
use crate::vision::{self, AnalysisResult, VisionAnalyzer};
use std::sync::Arc;
use tracing::{error, info, warn};

pub const ARTICLE_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Structured invocation outcome.
#[derive(Debug)]
pub enum WorkerOutcome {
    Success { article_key: String },
    ClientError { message: String },
    UpstreamError { collaborator: &'static str, status: Option<u16>, message: String },
    EmptyResult { collaborator: &'static str, message: String },
    InternalError { message: String },
}

impl WorkerOutcome {
    /// Outcome class label used in logs and metrics.
    pub fn class(&self) -> &'static str {
        match self {
            WorkerOutcome::Success { .. } => "success",
            WorkerOutcome::ClientError { .. } => "client_error",
            WorkerOutcome::UpstreamError { .. } => "upstream_error",
            WorkerOutcome::EmptyResult { .. } => "upstream_empty",
            WorkerOutcome::InternalError { .. } => "internal_error",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WorkerOutcome::Success { .. })
    }

    fn from_error(err: PipelineError) -> Self {
        match err {
            PipelineError::Client(message) => WorkerOutcome::ClientError { message },
            PipelineError::UpstreamService {
                collaborator,
                status,
                message,
            } => WorkerOutcome::UpstreamError {
                collaborator,
                status,
                message,
            },
            PipelineError::UpstreamEmpty {
                collaborator,
                message,
            } => WorkerOutcome::EmptyResult {
                collaborator,
                message,
            },
            PipelineError::Store(err) => WorkerOutcome::InternalError {
                message: format!("store write failed: {}", err),
            },
            PipelineError::Internal(message) => WorkerOutcome::InternalError { message },
        }
    }
}

/// Stateless per-event handler. Cheap to clone; every invocation is
/// independent of every other, so concurrent duplicate deliveries for the
/// same image key just overwrite the same article key.
#[derive(Clone)]
pub struct PipelineWorker {
    store: Arc<dyn ObjectStore>,
    vision: Arc<dyn VisionAnalyzer>,
    generator: Arc<dyn ArticleGenerator>,
    max_labels: u32,
}

impl PipelineWorker {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        vision: Arc<dyn VisionAnalyzer>,
        generator: Arc<dyn ArticleGenerator>,
        max_labels: u32,
    ) -> Self {
        Self {
            store,
            vision,
            generator,
            max_labels,
        }
    }

    /// Handle one raw trigger event payload.
    ///
    /// Every record in the event is processed independently; the reported
    /// outcome is the first failure, or success with the first written key.
    pub async fn handle(&self, raw_event: &str) -> WorkerOutcome {
        let invocation_id = uuid::Uuid::new_v4();
        let timer = metrics::Timer::new();

        let outcome = match TriggerEvent::decode(raw_event) {
            Ok(refs) => self.handle_records(invocation_id, &refs).await,
            Err(err) => {
                warn!(%invocation_id, error = %err, "rejecting malformed trigger event");
                WorkerOutcome::from_error(err)
            }
        };

        timer.observe_duration_seconds(&metrics::WORKER_DURATION);
        metrics::WORKER_OUTCOMES
            .with_label_values(&[outcome.class()])
            .inc();
        outcome
    }

    async fn handle_records(
        &self,
        invocation_id: uuid::Uuid,
        refs: &[ObjectRef],
    ) -> WorkerOutcome {
        let mut first_key: Option<String> = None;
        for image in refs {
            match self.process_image(invocation_id, image).await {
                Ok(article_key) => {
                    first_key.get_or_insert(article_key);
                }
                Err(err) => {
                    self.log_failure(invocation_id, image, &err);
                    return WorkerOutcome::from_error(err);
                }
            }
        }
        // decode() guarantees at least one record
        match first_key {
            Some(article_key) => WorkerOutcome::Success { article_key },
            None => WorkerOutcome::InternalError {
                message: "event contained no records".to_string(),
            },
        }
    }

    /// Run the full analyze-compose-generate-write sequence for one image.
    async fn process_image(
        &self,
        invocation_id: uuid::Uuid,
        image: &ObjectRef,
    ) -> Result<String, PipelineError> {
        let labels = self.vision.detect_labels(image, self.max_labels).await?;
        if labels.is_empty() {
            // No grounding for an article; skip the remaining collaborator
            // calls entirely.
            return Err(PipelineError::empty(
                vision::COLLABORATOR,
                "no labels detected in the image",
            ));
        }

        let face_count = self.vision.detect_faces(image).await?;

        // Identity recognition only pays off when faces are present
        let celebrities = if face_count > 0 {
            self.vision.recognize_celebrities(image).await?
        } else {
            Vec::new()
        };

        let analysis = AnalysisResult {
            labels,
            face_count,
            celebrities,
        };
        info!(
            %invocation_id,
            bucket = %image.bucket,
            key = %image.key,
            labels = analysis.labels.len(),
            faces = analysis.face_count,
            celebrities = analysis.celebrities.len(),
            "image analysis complete"
        );

        let prompt = compose_prompt(&analysis.labels, analysis.face_count, &analysis.celebrities);
        let article = self.generator.generate(&prompt).await?;
        let article = article.trim();
        if article.is_empty() {
            return Err(PipelineError::empty(
                generation::COLLABORATOR,
                "generated text was empty",
            ));
        }

        // The write is the last step: it only happens after every validation
        // has passed, and it overwrites whatever a duplicate invocation may
        // have written before.
        let article_key = keys::article_key(&image.key);
        self.store
            .put(
                &image.bucket,
                &article_key,
                article.as_bytes().to_vec(),
                ARTICLE_CONTENT_TYPE,
            )
            .await?;

        metrics::ARTICLES_WRITTEN.inc();
        info!(
            %invocation_id,
            bucket = %image.bucket,
            key = %image.key,
            article_key = %article_key,
            "article saved"
        );
        Ok(article_key)
    }

    fn log_failure(&self, invocation_id: uuid::Uuid, image: &ObjectRef, err: &PipelineError) {
        match err {
            PipelineError::UpstreamService {
                collaborator,
                status,
                message,
            } => error!(
                %invocation_id,
                bucket = %image.bucket,
                key = %image.key,
                collaborator,
                status = status.map(|s| s as i64).unwrap_or(-1),
                %message,
                "collaborator call failed"
            ),
            PipelineError::UpstreamEmpty {
                collaborator,
                message,
            } => warn!(
                %invocation_id,
                bucket = %image.bucket,
                key = %image.key,
                collaborator,
                %message,
                "collaborator returned nothing usable"
            ),
            other => error!(
                %invocation_id,
                bucket = %image.bucket,
                key = %image.key,
                error = %other,
                "pipeline invocation failed"
            ),
        }
    }
}
