//! Template loading from the clipper settings document.
//!
//! The settings JSON carries an ordered `template_list` of ids plus one
//! `template_<id>` object per id. Order in `template_list` is the load order
//! the selector respects.

use serde_json::Value as JsonValue;
use tracing::warn;

use clipnote_core::{Error, Result, Template};

/// Load templates from a parsed settings document, preserving list order.
///
/// A listed id without a matching `template_<id>` object, or an object that
/// fails to deserialize, is skipped with a warning rather than failing the
/// whole load.
pub fn load_templates(settings: &JsonValue) -> Result<Vec<Template>> {
    let list = settings
        .get("template_list")
        .ok_or_else(|| Error::Config("settings missing template_list".to_string()))?
        .as_array()
        .ok_or_else(|| Error::Config("template_list is not an array".to_string()))?;

    let mut templates = Vec::with_capacity(list.len());
    for entry in list {
        let id = match entry.as_str() {
            Some(id) => id,
            None => {
                warn!(?entry, "non-string template id in template_list");
                continue;
            }
        };
        let key = format!("template_{id}");
        let Some(raw) = settings.get(&key) else {
            warn!(template_id = id, "template listed but not defined");
            continue;
        };
        match serde_json::from_value::<Template>(raw.clone()) {
            Ok(mut template) => {
                template.id = id.to_string();
                templates.push(template);
            }
            Err(e) => {
                warn!(template_id = id, error = %e, "template failed to deserialize");
            }
        }
    }

    Ok(templates)
}

/// Parse raw settings text and load templates from it.
pub fn load_templates_str(raw: &str) -> Result<Vec<Template>> {
    let settings: JsonValue = serde_json::from_str(raw)
        .map_err(|e| Error::Config(format!("settings not valid JSON: {e}")))?;
    load_templates(&settings)
}
