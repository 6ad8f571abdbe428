//! Block Kit payload parsing.

use {
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
};

use crate::error::{Error, Result};

/// One Block Kit block. Only `type` is checked; everything else is passed to
/// Slack untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Parse Block Kit JSON.
///
/// Accepts either a bare array of blocks or the `{"blocks": [...]}` object
/// the Block Kit Builder exports.
pub fn parse_blocks(raw: &str) -> Result<Vec<Block>> {
    let value: Value = serde_json::from_str(raw).map_err(Error::body_parse)?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("blocks") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(Error::body_parse(
                    "expected an object with a \"blocks\" array",
                ));
            },
        },
        other => {
            return Err(Error::body_parse(format!(
                "expected an array of blocks, got {}",
                json_kind(&other)
            )));
        },
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let block: Block = serde_json::from_value(item)
                .map_err(|e| Error::body_parse(format!("block {index}: {e}")))?;
            if block.kind.is_empty() {
                return Err(Error::body_parse(format!("block {index}: empty type")));
            }
            Ok(block)
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
