//! Object store abstraction.
//!
//! The shared key-value blob store is the only channel between the pipeline
//! worker (producer) and the upload client (consumer): the worker writes the
//! article object, the client polls for it. Both sides talk to the same
//! `ObjectStore` trait.
//!
//! ## Backends
//! - **MemoryStore**: DashMap-backed, for tests and ephemeral deployments
//! - **SledStore**: sled-backed persistent store (bincode-serialized records)
//!
//! Puts overwrite unconditionally. Duplicate worker invocations for the same
//! image key converge on the same article key, so overwrite semantics absorb
//! at-least-once trigger delivery without coordination.

use crate::error::StoreError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub type Result<T> = std::result::Result<T, StoreError>;

/// A stored object's content as returned by `get`.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Object metadata as returned by `head`.
#[derive(Debug, Clone)]
pub struct ObjectHead {
    pub size: u64,
    pub content_type: String,
}

/// Durable key-value blob store addressed by `(bucket, key)`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write an object, overwriting any existing object at the same key.
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<()>;

    /// Fetch an object's content.
    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject>;

    /// Existence check returning metadata without the body.
    async fn head(&self, bucket: &str, key: &str) -> Result<ObjectHead>;
}

/// On-disk record for a stored object.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ObjectRecord {
    bytes: Vec<u8>,
    content_type: String,
    stored_at: i64,
}

impl ObjectRecord {
    fn new(bytes: Vec<u8>, content_type: &str) -> Self {
        Self {
            bytes,
            content_type: content_type.to_string(),
            stored_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// In-memory store keyed `bucket/key`.
#[derive(Default)]
pub struct MemoryStore {
    objects: DashMap<String, ObjectRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn compound_key(bucket: &str, key: &str) -> String {
        format!("{}/{}", bucket, key)
    }

    /// Number of stored objects across all buckets.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        self.objects.insert(
            Self::compound_key(bucket, key),
            ObjectRecord::new(bytes, content_type),
        );
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject> {
        match self.objects.get(&Self::compound_key(bucket, key)) {
            Some(record) => Ok(StoredObject {
                bytes: record.bytes.clone(),
                content_type: record.content_type.clone(),
            }),
            None => Err(StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
        }
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<ObjectHead> {
        match self.objects.get(&Self::compound_key(bucket, key)) {
            Some(record) => Ok(ObjectHead {
                size: record.bytes.len() as u64,
                content_type: record.content_type.clone(),
            }),
            None => Err(StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
        }
    }
}

/// Persistent store on sled, one tree per bucket.
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let config = sled::Config::new()
            .path(path.as_ref())
            .flush_every_ms(Some(1000))
            .mode(sled::Mode::HighThroughput)
            .use_compression(true);

        let db = config.open()?;
        tracing::info!(path = %path.as_ref().display(), "sled object store opened");
        Ok(Self { db })
    }

    fn tree(&self, bucket: &str) -> Result<sled::Tree> {
        Ok(self.db.open_tree(bucket)?)
    }

    fn load(&self, bucket: &str, key: &str) -> Result<ObjectRecord> {
        let tree = self.tree(bucket)?;
        match tree.get(key.as_bytes())? {
            Some(raw) => bincode::deserialize(&raw)
                .map_err(|e| StoreError::Backend(format!("corrupt object record: {}", e))),
            None => Err(StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
        }
    }
}

#[async_trait]
impl ObjectStore for SledStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let record = ObjectRecord::new(bytes, content_type);
        let raw = bincode::serialize(&record)
            .map_err(|e| StoreError::Backend(format!("serialize object record: {}", e)))?;
        let tree = self.tree(bucket)?;
        tree.insert(key.as_bytes(), raw)?;
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject> {
        let record = self.load(bucket, key)?;
        Ok(StoredObject {
            bytes: record.bytes,
            content_type: record.content_type,
        })
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<ObjectHead> {
        let record = self.load(bucket, key)?;
        Ok(ObjectHead {
            size: record.bytes.len() as u64,
            content_type: record.content_type,
        })
    }
}
