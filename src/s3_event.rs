use derive_more::{Constructor, From};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub const RECORDS_KEY: &str = "Records";

/// One entry of an S3 notification. Every level is optional: a record
/// missing any of `s3.bucket.name` / `s3.object.key` is skipped, while a
/// field of the wrong type fails to decode. Each level must be a JSON
/// object; serde would otherwise fill struct fields from an array by
/// position.
#[derive(Debug, Deserialize)]
pub struct NotificationRecord {
    #[serde(default, deserialize_with = "optional_object")]
    pub(crate) s3: Option<S3Entity>,
}

#[derive(Debug, Deserialize)]
pub struct S3Entity {
    #[serde(default, deserialize_with = "optional_object")]
    pub(crate) bucket: Option<S3Bucket>,
    #[serde(default, deserialize_with = "optional_object")]
    pub(crate) object: Option<S3Object>,
}

#[derive(Debug, Deserialize)]
pub struct S3Bucket {
    pub(crate) name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct S3Object {
    pub(crate) key: Option<String>,
}

fn object<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let map = Map::<String, Value>::deserialize(deserializer)?;

    T::deserialize(Value::Object(map)).map_err(D::Error::custom)
}

fn optional_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Option::<Map<String, Value>>::deserialize(deserializer)?
        .map(|map| {
            T::deserialize(Value::Object(map)).map_err(D::Error::custom)
        })
        .transpose()
}

impl NotificationRecord {
    pub fn from_value(record: &Value) -> Result<Self, serde_json::Error> {
        object(record)
    }

    /// Returns `(bucket, key)` when both are present.
    pub fn location(self) -> Option<(String, String)> {
        let s3 = self.s3?;
        let name = s3.bucket?.name?;
        let key = s3.object?.key?;

        Some((name, key))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryStatus {
    Processed,
    #[serde(rename = "Skipped - Invalid S3 Event")]
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Constructor)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedFile {
    file_name: String,
    bucket_name: String,
    status: EntryStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Constructor)]
pub struct SkippedRecord {
    record: Value,
    status: EntryStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, From)]
#[serde(untagged)]
pub enum ProcessedEntry {
    Processed(ProcessedFile),
    Skipped(SkippedRecord),
}

impl ProcessedEntry {
    pub fn processed(bucket_name: String, file_name: String) -> Self {
        ProcessedFile::new(file_name, bucket_name, EntryStatus::Processed)
            .into()
    }

    pub fn skipped(record: Value) -> Self {
        SkippedRecord::new(record, EntryStatus::Skipped).into()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    processed_files: Option<&'a [ProcessedEntry]>,
}

/// Gateway-style response: `body` holds the JSON-encoded [`ResponseBody`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResult {
    pub status_code: u16,
    pub body: String,
}

impl InvocationResult {
    pub fn message(
        status_code: u16,
        message: &str,
    ) -> Result<Self, serde_json::Error> {
        Self::encode(status_code, &ResponseBody {
            message,
            processed_files: None,
        })
    }

    pub fn with_files(
        message: &str,
        processed_files: &[ProcessedEntry],
    ) -> Result<Self, serde_json::Error> {
        Self::encode(200, &ResponseBody {
            message,
            processed_files: Some(processed_files),
        })
    }

    /// The 500 result. Encoding a single string field cannot fail, so this
    /// goes through `Value`'s `Display` instead of returning a `Result`.
    pub fn internal_error(description: &str) -> Self {
        let body = serde_json::json!({
            "message": format!("Internal handler error: {description}"),
        });

        InvocationResult {
            status_code: 500,
            body: body.to_string(),
        }
    }

    fn encode(
        status_code: u16,
        body: &ResponseBody<'_>,
    ) -> Result<Self, serde_json::Error> {
        Ok(InvocationResult {
            status_code,
            body: serde_json::to_string(body)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::{InvocationResult, NotificationRecord, ProcessedEntry};

    #[test]
    fn test_location_requires_bucket_name_and_key() {
        let record = NotificationRecord::from_value(&json!({
            "s3": { "bucket": { "name": "my-bucket" }, "object": {} }
        }))
        .unwrap();

        assert_eq!(record.location(), None);
    }

    #[test]
    fn test_null_fields_decode_as_absent() {
        let record = NotificationRecord::from_value(&json!({
            "s3": { "bucket": null, "object": { "key": "file.txt" } }
        }))
        .unwrap();

        assert_eq!(record.location(), None);
    }

    #[test]
    fn test_array_levels_fail_to_decode() {
        let shapes = [
            json!([{ "bucket": { "name": "b" }, "object": { "key": "k" } }]),
            json!({ "s3": [{ "name": "b" }, { "key": "k" }] }),
            json!({ "s3": { "bucket": ["b"], "object": { "key": "k" } } }),
            json!({ "s3": { "bucket": { "name": "b" }, "object": ["k"] } }),
            json!(null),
        ];

        for shape in shapes {
            let result = NotificationRecord::from_value(&shape);
            assert!(result.is_err(), "{shape}");
        }
    }

    #[test]
    fn test_wrong_field_type_fails_to_decode() {
        let result = NotificationRecord::from_value(&json!({
            "s3": { "bucket": { "name": 42 }, "object": { "key": "a" } }
        }));

        assert!(result.is_err());
    }

    #[test]
    fn test_entries_serialize_with_gateway_field_names() {
        let processed = ProcessedEntry::processed(
            "my-bucket".to_string(),
            "file.txt".to_string(),
        );
        let skipped = ProcessedEntry::skipped(json!({ "eventName": "x" }));

        assert_eq!(
            serde_json::to_value(&processed).unwrap(),
            json!({
                "fileName": "file.txt",
                "bucketName": "my-bucket",
                "status": "Processed"
            })
        );
        assert_eq!(
            serde_json::to_value(&skipped).unwrap(),
            json!({
                "record": { "eventName": "x" },
                "status": "Skipped - Invalid S3 Event"
            })
        );
    }

    #[test]
    fn test_body_is_double_encoded() {
        let result = InvocationResult::message(400, "nope").unwrap();
        let encoded = serde_json::to_value(&result).unwrap();

        assert_eq!(encoded["statusCode"], 400);
        assert!(encoded["body"].is_string());

        let body: Value =
            serde_json::from_str(encoded["body"].as_str().unwrap()).unwrap();
        assert_eq!(body, json!({ "message": "nope" }));
    }

    #[test]
    fn test_internal_error_message() {
        let result = InvocationResult::internal_error("boom");
        let body: Value = serde_json::from_str(&result.body).unwrap();

        assert_eq!(result.status_code, 500);
        assert_eq!(body["message"], "Internal handler error: boom");
    }
}
