//! Minimal narrative backfill for Bundle entries.
//!
//! Runs on the raw JSON before a [`Document`](crate::document::Document) is
//! built. Validation never depends on it.

use serde_json::{Map, Value, json};
use tracing::debug;

use crate::core::BUNDLE_RESOURCE_TYPE;

const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Resource types that carry no `text` element.
const NON_DOMAIN_RESOURCES: &[&str] = &[BUNDLE_RESOURCE_TYPE, "Binary", "Parameters"];

/// Give every entry resource without a narrative a generated one.
///
/// Returns how many resources were filled. Anything that is not a Bundle is
/// left alone.
pub fn ensure_minimal_narrative(bundle: &mut Value) -> usize {
    if bundle.get("resourceType").and_then(Value::as_str) != Some(BUNDLE_RESOURCE_TYPE) {
        return 0;
    }
    let Some(entries) = bundle.get_mut("entry").and_then(Value::as_array_mut) else {
        return 0;
    };

    let filled = entries
        .iter_mut()
        .filter_map(|entry| entry.get_mut("resource").and_then(Value::as_object_mut))
        .map(backfill)
        .filter(|filled| *filled)
        .count();

    debug!(filled, "Narrative backfill finished");
    filled
}

fn backfill(resource: &mut Map<String, Value>) -> bool {
    let Some(resource_type) = resource.get("resourceType").and_then(Value::as_str) else {
        return false;
    };
    if NON_DOMAIN_RESOURCES.contains(&resource_type) || has_narrative(resource) {
        return false;
    }

    let mut summary = escape(resource_type);
    if let Some(id) = resource.get("id").and_then(Value::as_str).filter(|id| !id.is_empty()) {
        summary.push(' ');
        summary.push_str(&escape(id));
    }
    let div = format!(r#"<div xmlns="{XHTML_NAMESPACE}"><p>{summary}</p></div>"#);

    match resource.get_mut("text").and_then(Value::as_object_mut) {
        Some(text) => {
            text.insert("status".into(), json!("generated"));
            text.insert("div".into(), json!(div));
        }
        None => {
            resource.insert("text".into(), json!({"status": "generated", "div": div}));
        }
    }
    true
}

fn has_narrative(resource: &Map<String, Value>) -> bool {
    resource
        .get("text")
        .and_then(|text| text.get("div"))
        .and_then(Value::as_str)
        .is_some_and(|div| !div.trim().is_empty())
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
