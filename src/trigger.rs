//! Defines a _trigger_, the location of one created object as
//! reported by a single record of an S3 notification event.

use anyhow::{anyhow, ensure, Context, Result};
use serde::Deserialize;
use serde_json::Value;

/// The top-level notification payload. Records are kept as raw
/// values so that each one can be decoded on its own.
#[derive(Debug, Deserialize)]
pub struct Notification {
    #[serde(rename = "Records")]
    pub records: Vec<Value>,
}

/// The subset of an S3 notification record the handler reads. Any
/// other field delivered by S3 is ignored.
#[derive(Debug, Deserialize)]
pub struct Record {
    #[serde(rename = "eventName", default)]
    pub event_name: Option<String>,
    pub s3: S3Entity,
}

#[derive(Debug, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Deserialize)]
pub struct S3Bucket {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct S3Object {
    #[serde(default)]
    pub key: Option<String>,
}

impl Notification {
    /// Extract the sequence of records from a notification payload.
    pub fn from_payload(payload: Value) -> Result<Self> {
        if payload.get("Records").map_or(true, Value::is_null) {
            return Err(anyhow!("payload has no Records field"));
        }
        serde_json::from_value(payload).context("Records is not a sequence")
    }
}

/// The location of the object that caused the notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub bucket: String,
    pub key: String,
    pub event_name: Option<String>,
}

impl Trigger {
    /// Builds a trigger from a raw notification record. Both the
    /// bucket name and the object key must be present and non-empty.
    pub fn from_record(record: Value) -> Result<Self> {
        let record: Record =
            serde_json::from_value(record).context("record doesn't have the S3 record shape")?;
        let bucket = record
            .s3
            .bucket
            .name
            .ok_or_else(|| anyhow!("record is missing s3.bucket.name"))?;
        let key = record
            .s3
            .object
            .key
            .ok_or_else(|| anyhow!("record is missing s3.object.key"))?;
        ensure!(!bucket.is_empty(), "record has an empty s3.bucket.name");
        ensure!(!key.is_empty(), "record has an empty s3.object.key");
        Ok(Trigger {
            bucket,
            key,
            event_name: record.event_name,
        })
    }
}
