//! Content normalizer
//!
//! Turns the loosely shaped payload returned by the AI gateway into a
//! [`CourseDraft`]. The module count is a hard floor and is never repaired;
//! a short takeaway list is padded with `"Key point {n}"` entries until it
//! reaches [`MIN_KEY_TAKEAWAYS`]. Longer lists are kept as they are.
//!
//! Pure and deterministic: the same payload always yields the same draft.

use crate::models::{CourseDraft, ModuleDraft, MIN_KEY_TAKEAWAYS, MIN_MODULES};
use notebook_common::{Error, Result};
use serde_json::{Map, Value};
use tracing::debug;

/// Summary used when a module arrives without one
pub const DEFAULT_SUMMARY: &str = "No summary provided";

/// Normalize an untrusted course payload
pub fn normalize(raw: &Value) -> Result<CourseDraft> {
    let missing = || Error::Validation("missing required fields".to_string());

    let object = raw.as_object().ok_or_else(missing)?;

    let title = object
        .get("title")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(missing)?;
    let description = object
        .get("description")
        .and_then(Value::as_str)
        .ok_or_else(missing)?;
    let modules = object
        .get("modules")
        .and_then(Value::as_array)
        .ok_or_else(missing)?;

    if modules.len() < MIN_MODULES {
        debug!(modules = modules.len(), "Rejecting payload with too few modules");
        return Err(Error::Validation("insufficient modules".to_string()));
    }

    let modules = modules
        .iter()
        .enumerate()
        .map(|(index, module)| normalize_module(index, module))
        .collect();

    Ok(CourseDraft {
        title: title.to_string(),
        description: description.to_string(),
        modules,
    })
}

fn normalize_module(index: usize, raw: &Value) -> ModuleDraft {
    // Non-object entries are treated as modules with every field absent
    let empty = Map::new();
    let fields = raw.as_object().unwrap_or(&empty);

    let heading = non_empty_str(fields.get("heading"))
        .map(str::to_string)
        .unwrap_or_else(|| format!("Module {}", index + 1));
    let summary = non_empty_str(fields.get("summary"))
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_SUMMARY.to_string());

    let mut key_takeaways: Vec<String> = fields
        .get("key_takeaways")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(takeaway_text).collect())
        .unwrap_or_default();

    if key_takeaways.len() < MIN_KEY_TAKEAWAYS {
        debug!(
            module = index + 1,
            takeaways = key_takeaways.len(),
            "Padding key takeaways to {}",
            MIN_KEY_TAKEAWAYS
        );
        while key_takeaways.len() < MIN_KEY_TAKEAWAYS {
            key_takeaways.push(format!("Key point {}", key_takeaways.len() + 1));
        }
    }

    ModuleDraft {
        heading,
        summary,
        key_takeaways,
    }
}

/// Blank strings count as absent, matching [`crate::models::validate_modules`]
fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

/// Bare strings and `{content}` records; anything else is dropped
fn takeaway_text(item: &Value) -> Option<String> {
    match item {
        Value::String(text) => Some(text.clone()),
        Value::Object(record) => record
            .get("content")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}
