//! Validation of a remotely supplied category map.
//!
//! Two shapes are accepted for each category:
//!
//! ```json
//! {
//!   "general": [
//!     {"name": "BBC", "address": "https://feeds.bbci.co.uk/news/rss.xml"},
//!     {"address": "https://www.bbc.com/news", "kind": "html", "selector": "h3"}
//!   ],
//!   "sports": ["https://feeds.bbci.co.uk/sport/rss.xml"]
//! }
//! ```
//!
//! A category is validated as a whole: one bad entry empties it. Only a
//! document that is not a JSON object fails outright.

use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::error::ConfigResolutionError;
use crate::models::{CategoryMap, SourceDescriptor, SourceKind};

/// Parse the text of a configuration post into a [`CategoryMap`].
pub fn parse_category_map(text: &str) -> Result<CategoryMap, ConfigResolutionError> {
    let value: Value = serde_json::from_str(text.trim())?;
    let Value::Object(categories) = value else {
        return Err(ConfigResolutionError::Schema(format!(
            "expected an object of categories, found {}",
            type_name(&value)
        )));
    };

    let mut map = CategoryMap::new();
    for (category, entries) in categories {
        let sources = match parse_category(&entries) {
            Ok(sources) => {
                debug!(%category, count = sources.len(), "Accepted category");
                sources
            }
            Err(reason) => {
                warn!(%category, %reason, "Category rejected; resolving it to no sources");
                Vec::new()
            }
        };
        map.insert(category, sources);
    }
    Ok(map)
}

fn parse_category(entries: &Value) -> Result<Vec<SourceDescriptor>, String> {
    let Value::Array(entries) = entries else {
        return Err(format!("expected an array, found {}", type_name(entries)));
    };
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| parse_entry(entry).map_err(|e| format!("entry {i}: {e}")))
        .collect()
}

fn parse_entry(entry: &Value) -> Result<SourceDescriptor, String> {
    match entry {
        Value::String(address) => {
            let address = parse_address(address)?;
            Ok(SourceDescriptor::feed(SourceDescriptor::host_tag(&address), address))
        }
        Value::Object(fields) => parse_object_entry(fields),
        other => Err(format!("expected a string or object, found {}", type_name(other))),
    }
}

fn parse_object_entry(fields: &Map<String, Value>) -> Result<SourceDescriptor, String> {
    let address = match fields.get("address") {
        Some(Value::String(address)) => parse_address(address)?,
        Some(other) => return Err(format!("address must be a string, found {}", type_name(other))),
        None => return Err("missing address".to_string()),
    };

    let name = match fields.get("name") {
        None | Some(Value::Null) => SourceDescriptor::host_tag(&address),
        Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
        Some(other) => return Err(format!("name must be a non-empty string, found {other}")),
    };

    let kind = match fields.get("kind") {
        None | Some(Value::Null) => SourceKind::Feed,
        Some(Value::String(kind)) => match kind.as_str() {
            "feed" => SourceKind::Feed,
            "html" => SourceKind::Html,
            unknown => return Err(format!("unknown kind {unknown:?}")),
        },
        Some(other) => return Err(format!("kind must be a string, found {}", type_name(other))),
    };

    match kind {
        SourceKind::Feed => Ok(SourceDescriptor::feed(name, address)),
        SourceKind::Html => match fields.get("selector") {
            Some(Value::String(selector)) if !selector.trim().is_empty() => {
                Ok(SourceDescriptor::html(name, address, selector.trim()))
            }
            _ => Err("html source without a selector".to_string()),
        },
    }
}

fn parse_address(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim()).map_err(|e| format!("invalid address {raw:?}: {e}"))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(format!("address {raw:?} is not an absolute http(s) URL")),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
