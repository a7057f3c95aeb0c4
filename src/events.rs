//! Storage trigger events.
//!
//! The pipeline worker is invoked with a bucket-notification style JSON
//! payload. Object keys travel URL-encoded inside it (`+` for space, `%XX`
//! escapes) and are decoded on receipt. A malformed event is a client error:
//! the worker rejects it before calling any collaborator.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Decoded `(namespace, key)` reference to an object in the shared store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    #[serde(rename = "Records")]
    pub records: Vec<TriggerRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRecord {
    pub bucket: BucketRef,
    pub object: ObjectKeyRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketRef {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectKeyRef {
    /// URL-encoded object key as delivered by the notification.
    pub key: String,
}

impl TriggerEvent {
    /// Build a well-formed single-record event for a key the caller just wrote.
    pub fn for_object(bucket: &str, key: &str) -> Self {
        Self {
            records: vec![TriggerRecord {
                bucket: BucketRef {
                    name: bucket.to_string(),
                },
                object: ObjectKeyRef {
                    key: encode_key(key),
                },
            }],
        }
    }

    /// Parse and validate a raw event payload into decoded object references.
    pub fn decode(raw: &str) -> Result<Vec<ObjectRef>, PipelineError> {
        let event: TriggerEvent = serde_json::from_str(raw)?;
        if event.records.is_empty() {
            return Err(PipelineError::Client("event has no records".to_string()));
        }

        event
            .records
            .iter()
            .map(|record| {
                if record.bucket.name.is_empty() {
                    return Err(PipelineError::Client("record has no bucket name".to_string()));
                }
                let key = unquote_plus(&record.object.key)?;
                if key.is_empty() {
                    return Err(PipelineError::Client("record has no object key".to_string()));
                }
                Ok(ObjectRef {
                    bucket: record.bucket.name.clone(),
                    key,
                })
            })
            .collect()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("trigger event serializes")
    }
}

/// URL-encode an object key for transport inside an event record.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Decode a URL-encoded object key, treating `+` as space.
fn unquote_plus(encoded: &str) -> Result<String, PipelineError> {
    let mut bytes = Vec::with_capacity(encoded.len());
    let mut iter = encoded.bytes();
    while let Some(b) = iter.next() {
        match b {
            b'+' => bytes.push(b' '),
            b'%' => {
                let hi = iter.next();
                let lo = iter.next();
                match (hi, lo) {
                    (Some(hi), Some(lo)) => {
                        let hex = [hi, lo];
                        let hex = std::str::from_utf8(&hex)
                            .ok()
                            .and_then(|s| u8::from_str_radix(s, 16).ok());
                        match hex {
                            Some(byte) => bytes.push(byte),
                            None => {
                                return Err(PipelineError::Client(format!(
                                    "invalid percent escape in object key: {}",
                                    encoded
                                )))
                            }
                        }
                    }
                    _ => {
                        return Err(PipelineError::Client(format!(
                            "truncated percent escape in object key: {}",
                            encoded
                        )))
                    }
                }
            }
            _ => bytes.push(b),
        }
    }
    String::from_utf8(bytes)
        .map_err(|_| PipelineError::Client(format!("object key is not valid UTF-8: {}", encoded)))
}
