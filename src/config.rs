use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_host: String,
    pub api_port: u16,
    pub store_config: StoreConfig,
    pub vision_config: VisionConfig,
    pub generation_config: GenerationConfig,
    pub poll_config: PollConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub bucket: String,
    /// Data directory for the sled backend; None selects the in-memory store.
    pub data_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub max_labels: u32,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    pub interval_ms: u64,
    pub wait_timeout_secs: u64,
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let api_port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let bucket = env::var("STORE_BUCKET").unwrap_or_else(|_| "news-images".to_string());

        // Empty DATA_DIR selects the in-memory backend (tests, ephemeral deploys)
        let data_dir = env::var("DATA_DIR").ok().filter(|s| !s.is_empty());

        // Vision collaborator configuration
        let vision_endpoint = env::var("VISION_ENDPOINT")
            .unwrap_or_else(|_| "http://localhost:9090/v1/vision".to_string());

        let vision_api_key = env::var("VISION_API_KEY").ok().filter(|s| !s.is_empty());

        let max_labels = env::var("VISION_MAX_LABELS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let vision_timeout = env::var("VISION_TIMEOUT_SECS")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .unwrap_or(15);

        // Generation collaborator configuration. The bearer credential is
        // required: its absence is a startup-time configuration error, not a
        // per-request one.
        let generation_api_key = env::var("GENERATION_API_KEY")
            .map_err(|_| anyhow::anyhow!("GENERATION_API_KEY must be set"))?;

        let generation_endpoint = env::var("GENERATION_ENDPOINT")
            .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string());

        let generation_model =
            env::var("GENERATION_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string());

        let generation_timeout = env::var("GENERATION_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        // Poll loop configuration
        let poll_interval_ms = env::var("POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()
            .unwrap_or(1000);

        let wait_timeout_secs = env::var("WAIT_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .unwrap_or(60);

        Ok(Self {
            api_host,
            api_port,
            store_config: StoreConfig { bucket, data_dir },
            vision_config: VisionConfig {
                endpoint: vision_endpoint,
                api_key: vision_api_key,
                max_labels,
                request_timeout_secs: vision_timeout,
            },
            generation_config: GenerationConfig {
                endpoint: generation_endpoint,
                api_key: generation_api_key,
                model: generation_model,
                request_timeout_secs: generation_timeout,
            },
            poll_config: PollConfig {
                interval_ms: poll_interval_ms,
                wait_timeout_secs,
            },
        })
    }
}
