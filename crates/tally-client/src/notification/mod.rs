//! Storage upload notifications and the object identity they name.
//!
//! The wire shape follows the S3 event format: a `Records` array whose entries
//! carry an `s3` block with the bucket and object. Every field is optional on
//! the wire; [`identity::extract_identity`] decides what a partial payload means.

pub mod identity;

use serde::{Deserialize, Serialize};

use crate::{ClientError, ClientResult};

pub use identity::extract_identity;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadNotification {
    #[serde(rename = "Records", default, skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<UploadRecord>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
    #[serde(rename = "eventName", default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    #[serde(rename = "eventTime", default, skip_serializing_if = "Option::is_none")]
    pub event_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<StorageEntity>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<BucketEntity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<ObjectEntity>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketEntity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(rename = "versionId", default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// A validated reference to one object version. Bucket and key are always both
/// non-blank; an event that names neither produces no identity at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectIdentity {
    pub bucket: String,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
}

impl ObjectIdentity {
    pub fn location(&self) -> String {
        match &self.version_id {
            Some(version) => format!("{}/{}?versionId={version}", self.bucket, self.key),
            None => format!("{}/{}", self.bucket, self.key),
        }
    }
}

impl UploadNotification {
    pub fn from_json(content: &str) -> ClientResult<Self> {
        serde_json::from_str::<Self>(content.trim())
            .map_err(|error| ClientError::notification_malformed(&error.to_string()))
    }

    /// Convenience constructor for the common single-record case.
    pub fn single(bucket: &str, key: &str, version_id: Option<&str>) -> Self {
        Self {
            records: Some(vec![UploadRecord {
                event_name: Some("ObjectCreated:Put".to_string()),
                event_time: None,
                s3: Some(StorageEntity {
                    bucket: Some(BucketEntity {
                        name: Some(bucket.to_string()),
                    }),
                    object: Some(ObjectEntity {
                        key: Some(key.to_string()),
                        version_id: version_id.map(str::to_string),
                        size: None,
                    }),
                }),
            }]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::UploadNotification;

    #[test]
    fn parses_s3_event_shape() {
        let parsed = UploadNotification::from_json(
            r#"{
                "Records": [
                    {
                        "eventName": "ObjectCreated:Put",
                        "s3": {
                            "bucket": {"name": "txns"},
                            "object": {"key": "2024-01.csv", "versionId": "v1", "size": 120}
                        }
                    }
                ]
            }"#,
        );
        assert!(parsed.is_ok());
        if let Ok(notification) = parsed {
            let records = notification.records.unwrap_or_default();
            assert_eq!(records.len(), 1);
            let storage = records[0].s3.clone().unwrap_or_default();
            let bucket = storage.bucket.unwrap_or_default();
            let object = storage.object.unwrap_or_default();
            assert_eq!(records[0].event_name.as_deref(), Some("ObjectCreated:Put"));
            assert_eq!(bucket.name.as_deref(), Some("txns"));
            assert_eq!(object.key.as_deref(), Some("2024-01.csv"));
            assert_eq!(object.version_id.as_deref(), Some("v1"));
            assert_eq!(object.size, Some(120));
        }
    }

    #[test]
    fn missing_records_deserialize_to_none() {
        let parsed = UploadNotification::from_json("{}");
        assert!(parsed.is_ok());
        if let Ok(notification) = parsed {
            assert!(notification.records.is_none());
        }
    }

    #[test]
    fn invalid_json_is_reported_as_malformed() {
        let parsed = UploadNotification::from_json("{\"Records\": [");
        assert!(parsed.is_err());
        if let Err(error) = parsed {
            assert_eq!(error.code, "notification_malformed");
        }
    }
}
