//! Storage event documents.
//!
//! Upload notifications arrive as `{"Records": [...]}`. Records are read one by
//! one so that a single malformed record is skipped instead of failing the batch.

use rollup_core::constants::STORAGE_EVENT_SOURCE;
use rollup_core::{PipelineError, PipelineResult};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BucketRef {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ObjectRef {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StorageEntity {
    #[serde(default)]
    pub bucket: Option<BucketRef>,
    #[serde(default)]
    pub object: Option<ObjectRef>,
}

/// One record of a storage event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "eventSource", default)]
    pub event_source: Option<String>,
    #[serde(rename = "eventName", default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub s3: Option<StorageEntity>,
}

impl EventRecord {
    /// Storage upload record for `bucket`/`key`.
    pub fn upload(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            event_source: Some(STORAGE_EVENT_SOURCE.to_string()),
            event_name: Some("ObjectCreated:Put".to_string()),
            s3: Some(StorageEntity {
                bucket: Some(BucketRef {
                    name: Some(bucket.into()),
                }),
                object: Some(ObjectRef {
                    key: Some(urlencoding::encode(&key.into()).into_owned()),
                    size: None,
                }),
            }),
        }
    }

    pub fn is_storage_event(&self) -> bool {
        self.event_source.as_deref() == Some(STORAGE_EVENT_SOURCE)
    }

    pub fn bucket(&self) -> Option<&str> {
        self.s3.as_ref()?.bucket.as_ref()?.name.as_deref()
    }

    /// Object key, URL-decoded. Falls back to the raw key when it does not decode.
    pub fn key(&self) -> Option<String> {
        let raw = self.s3.as_ref()?.object.as_ref()?.key.as_deref()?;
        Some(decode_key(raw))
    }
}

/// Decode a key as it appears in storage events (`+` for space, `%XX` escapes).
pub fn decode_key(raw: &str) -> String {
    let plus_decoded = raw.replace('+', " ");
    match urlencoding::decode(&plus_decoded) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

/// Read the records of a storage event.
///
/// A document without `Records` has no records. Each element either parses into an
/// `EventRecord` or is returned as an error message for that position.
pub fn parse_upload_event(event: &Value) -> PipelineResult<Vec<Result<EventRecord, String>>> {
    let object = event
        .as_object()
        .ok_or_else(|| PipelineError::InvalidEvent("event must be a JSON object".to_string()))?;

    let records = match object.get("Records") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(records)) => records,
        Some(_) => {
            return Err(PipelineError::InvalidEvent(
                "Records must be an array".to_string(),
            ))
        }
    };

    Ok(records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            EventRecord::deserialize(record)
                .map_err(|e| format!("record {} is malformed: {}", index, e))
        })
        .collect())
}
