use anyhow::Result;
use newslens_node::config::Config;
use newslens_node::dispatch::{spawn_dispatcher, EventBus};
use newslens_node::generation::OpenAiGenerator;
use newslens_node::metrics;
use newslens_node::server::{self, AppState};
use newslens_node::store::{MemoryStore, ObjectStore, SledStore};
use newslens_node::vision::HttpVisionClient;
use newslens_node::worker::PipelineWorker;
use std::sync::Arc;

#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with filters
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting newslens pipeline node...");

    // Initialize metrics
    metrics::init_metrics();

    // Load configuration. A missing generation credential fails here, before
    // any request is accepted.
    let config = Config::load()?;

    // Construct the shared object store
    let store: Arc<dyn ObjectStore> = match &config.store_config.data_dir {
        Some(dir) => {
            tracing::info!(data_dir = %dir, "using sled object store");
            Arc::new(SledStore::open(dir)?)
        }
        None => {
            tracing::info!("using in-memory object store");
            Arc::new(MemoryStore::new())
        }
    };

    // Construct the collaborator clients. Construction failure aborts
    // startup; the node never serves with a half-wired pipeline.
    let vision = Arc::new(HttpVisionClient::new(&config.vision_config)?);
    let generator = Arc::new(OpenAiGenerator::new(&config.generation_config)?);

    let worker = PipelineWorker::new(
        store.clone(),
        vision,
        generator,
        config.vision_config.max_labels,
    );

    // Wire the trigger bus and start dispatching events to the worker
    let (bus, rx) = EventBus::channel();
    let dispatcher = spawn_dispatcher(worker, rx);

    let state = Arc::new(AppState {
        store,
        bus,
        config: config.clone(),
    });
    let app = server::router(state);

    let bind_addr = format!("{}:{}", config.api_host, config.api_port);
    tracing::info!("API listening on http://{}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    dispatcher.abort();
    Ok(())
}
