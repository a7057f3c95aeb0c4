pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod generation;
pub mod keys;
pub mod metrics;
pub mod poll;
pub mod server;
pub mod store;
pub mod vision;
pub mod worker;

// Re-export commonly used types for easier testing
pub use crate::config::Config;
pub use crate::dispatch::{spawn_dispatcher, EventBus};
pub use crate::error::{PipelineError, StoreError};
pub use crate::events::{ObjectRef, TriggerEvent};
pub use crate::generation::{compose_prompt, ArticleGenerator, OpenAiGenerator};
pub use crate::poll::{fetch_article, wait_for_object, Article, WaitOutcome};
pub use crate::store::{MemoryStore, ObjectHead, ObjectStore, SledStore, StoredObject};
pub use crate::vision::{AnalysisResult, HttpVisionClient, VisionAnalyzer};
pub use crate::worker::{PipelineWorker, WorkerOutcome};
