use anyhow::Context;
use derive_new::new;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::event_handler::EventHandler;
use crate::s3_event::{
    InvocationResult, NotificationRecord, ProcessedEntry, RECORDS_KEY,
};

pub const NO_RECORDS_MESSAGE: &str =
    "No S3 records found in the event or unexpected format.";
pub const COMPLETED_MESSAGE: &str = "S3 event processing completed.";
pub const NO_VALID_RECORDS_MESSAGE: &str =
    "No valid S3 records found for processing.";

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("'Records' must be a list, found {0}")]
    MalformedRecords(&'static str),
    #[error("record {index} has an unexpected shape")]
    MalformedRecord {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode response body")]
    Encode(#[from] serde_json::Error),
}

/// Outcome of walking the `Records` list, before it is encoded.
#[derive(Debug, PartialEq)]
pub enum Extraction {
    NoRecords,
    Entries(Vec<ProcessedEntry>),
}

/// Classifies every record of an S3 object-created notification as
/// processed or skipped. Holds no state between invocations.
#[derive(new, Debug)]
pub struct RecordExtractor;

impl RecordExtractor {
    pub fn extract(&self, event: &Value) -> Result<Extraction, ExtractError> {
        let Some(records) = event.get(RECORDS_KEY) else {
            warn!("No '{RECORDS_KEY}' in the event, not an S3 notification");
            return Ok(Extraction::NoRecords);
        };

        let records = records
            .as_array()
            .ok_or_else(|| ExtractError::MalformedRecords(type_name(records)))?;

        let mut processed_files = Vec::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            processed_files.push(classify(index, record)?);
        }

        Ok(Extraction::Entries(processed_files))
    }
}

fn classify(
    index: usize,
    record: &Value,
) -> Result<ProcessedEntry, ExtractError> {
    let decoded = NotificationRecord::from_value(record)
        .map_err(|source| ExtractError::MalformedRecord { index, source })?;

    match decoded.location() {
        Some((bucket, key)) => {
            info!(%bucket, %key, "S3 event received for s3://{bucket}/{key}");

            Ok(ProcessedEntry::processed(bucket, key))
        }
        None => {
            warn!(%record, "Record does not carry the expected S3 fields");

            Ok(ProcessedEntry::skipped(record.clone()))
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

impl TryFrom<Extraction> for InvocationResult {
    type Error = ExtractError;

    fn try_from(extraction: Extraction) -> Result<Self, Self::Error> {
        let result = match extraction {
            Extraction::NoRecords => {
                InvocationResult::message(400, NO_RECORDS_MESSAGE)?
            }
            Extraction::Entries(entries) if entries.is_empty() => {
                info!("No valid S3 record was processed in the event");
                InvocationResult::message(200, NO_VALID_RECORDS_MESSAGE)?
            }
            Extraction::Entries(entries) => {
                info!(count = entries.len(), "S3 event processing completed");
                InvocationResult::with_files(COMPLETED_MESSAGE, &entries)?
            }
        };

        Ok(result)
    }
}

impl EventHandler for RecordExtractor {
    async fn process_event(
        &self,
        event: &Value,
    ) -> anyhow::Result<InvocationResult> {
        info!("Extracting file names from S3 event");

        let extraction =
            self.extract(event).context("Failed to classify records")?;

        let result = InvocationResult::try_from(extraction)
            .context("Failed to build response")?;

        Ok(result)
    }
}
