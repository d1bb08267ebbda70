//! Argument extraction shared by the tools.
//!
//! The executor validates arguments against each tool's schema first; these
//! helpers only trim, default, and convert.

use std::fmt::Display;

use judgebot_core::error::ToolError;
use serde_json::Value;

use crate::spellbook::Decklist;

/// A trimmed, non-empty string argument.
pub fn opt_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub fn req_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    opt_str(args, key)
        .ok_or_else(|| ToolError::InvalidArguments(format!("'{key}' must be a non-empty string")))
}

pub fn int_or(args: &Value, key: &str, default: u32) -> u32 {
    args.get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(default)
}

pub fn bool_or(args: &Value, key: &str, default: bool) -> bool {
    args.get(key).and_then(Value::as_bool).unwrap_or(default)
}

/// Non-blank entries of a string array, trimmed.
pub fn str_list(args: &Value, key: &str) -> Vec<String> {
    args.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// `decklist_url` wins over `decklist_text`; one of them is required.
pub fn decklist(args: &Value) -> Result<Decklist, ToolError> {
    if let Some(url) = opt_str(args, "decklist_url") {
        return Ok(Decklist::Url(url.to_string()));
    }
    if let Some(text) = opt_str(args, "decklist_text") {
        return Ok(Decklist::Text(text.to_string()));
    }
    Err(ToolError::InvalidArguments(
        "Please provide either a decklist URL or pasted card list.".into(),
    ))
}

pub fn failed(tool: &str, reason: impl Display) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: tool.to_string(),
        reason: reason.to_string(),
    }
}
