//! Unwrapping of `tools/call` responses
//!
//! Tool results arrive in a JSON-RPC envelope, and the useful payload is
//! usually a JSON document serialized into `result.content[0].text`. The
//! two decode stages are kept separate so each has its own error type.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Why an envelope could not be turned into a payload object
#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("JSON-RPC error: {0}")]
    Rpc(Value),

    #[error("missing JSON-RPC result payload")]
    MissingResult,

    #[error("unable to decode tool payload: {cause}")]
    PayloadDecode {
        text: String,
        #[source]
        cause: PayloadDecodeError,
    },

    #[error("unexpected tool response format")]
    UnexpectedFormat,
}

/// Second stage failure: the embedded text is not a JSON object
#[derive(Error, Debug)]
pub enum PayloadDecodeError {
    #[error("tool text payload is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("tool text payload is a JSON {0}, not an object")]
    NotAnObject(&'static str),
}

/// Decode a text-encoded JSON object
pub fn decode_text_payload(text: &str) -> Result<Map<String, Value>, PayloadDecodeError> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(PayloadDecodeError::NotAnObject(json_kind(&other))),
        Err(e) => Err(PayloadDecodeError::InvalidJson(e)),
    }
}

/// Extract the payload object from a parsed JSON-RPC response
pub fn unwrap_envelope(envelope: Value) -> Result<Map<String, Value>, EnvelopeError> {
    let Value::Object(mut envelope) = envelope else {
        return Err(EnvelopeError::UnexpectedFormat);
    };

    if let Some(error) = envelope.remove("error") {
        return Err(EnvelopeError::Rpc(error));
    }

    let result = match envelope.remove("result") {
        Some(Value::Object(result)) => result,
        _ => return Err(EnvelopeError::MissingResult),
    };

    if let Some(text) = first_text_content(&result) {
        debug!("Decoding text-encoded tool payload ({} bytes)", text.len());
        return decode_text_payload(text).map_err(|cause| EnvelopeError::PayloadDecode {
            text: text.to_string(),
            cause,
        });
    }

    debug!("Using structured tool result directly");
    Ok(result)
}

/// `result.content[0].text` when every step has the expected type
fn first_text_content(result: &Map<String, Value>) -> Option<&str> {
    result
        .get("content")?
        .as_array()?
        .first()?
        .as_object()?
        .get("text")?
        .as_str()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
