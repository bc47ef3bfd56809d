//! JSON array codec for message values

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::{AppError, AppResult};

/// Encode a batch of records as one message value
pub fn encode<T: Serialize>(records: &[T]) -> AppResult<String> {
    Ok(serde_json::to_string(records)?)
}

/// Split a message value into its raw records.
///
/// Records are decoded one by one afterwards so that a single bad record does
/// not take the rest of the batch down with it.
pub fn decode_batch(payload: &str) -> AppResult<Vec<Value>> {
    match serde_json::from_str::<Value>(payload)? {
        Value::Array(records) => Ok(records),
        other => Err(AppError::BadRequest(format!(
            "Expected a JSON array of records, got {}",
            kind(&other)
        ))),
    }
}

pub fn decode_record<T: DeserializeOwned>(record: Value) -> AppResult<T> {
    Ok(serde_json::from_value(record)?)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
