//! Clip template data model.
//!
//! A template bundles trigger patterns with format strings that define how a
//! URL's content becomes a structured note. Templates are loaded once at
//! startup and never mutated.

use serde::{Deserialize, Serialize};

/// Reserved name of the general-purpose fallback template.
pub const GENERAL_TEMPLATE_NAME: &str = "通用";

/// One declared property of a template: a name and an expression string that
/// may contain `{{...}}` tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateProperty {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// A named bundle of trigger patterns and format strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// Glob-style URL patterns (`*` matches any sequence), anchored at start.
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub properties: Vec<TemplateProperty>,
    #[serde(rename = "noteContentFormat", default = "default_content_format")]
    pub note_content_format: String,
    #[serde(rename = "noteNameFormat", default = "default_name_format")]
    pub note_name_format: String,
}

fn default_content_format() -> String {
    "{{content}}".to_string()
}

fn default_name_format() -> String {
    "{{title}}".to_string()
}

impl Template {
    /// The synthesized last-resort template used when nothing is loaded:
    /// `content` body, `title` name, no properties.
    pub fn fallback() -> Self {
        Self {
            id: String::new(),
            name: "Fallback".to_string(),
            triggers: Vec::new(),
            properties: Vec::new(),
            note_content_format: default_content_format(),
            note_name_format: default_name_format(),
        }
    }

    /// Whether this is the designated general template.
    pub fn is_general(&self) -> bool {
        self.name == GENERAL_TEMPLATE_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_template_shape() {
        let t = Template::fallback();
        assert_eq!(t.note_content_format, "{{content}}");
        assert_eq!(t.note_name_format, "{{title}}");
        assert!(t.properties.is_empty());
        assert!(t.triggers.is_empty());
    }

    #[test]
    fn test_is_general() {
        let mut t = Template::fallback();
        assert!(!t.is_general());
        t.name = GENERAL_TEMPLATE_NAME.to_string();
        assert!(t.is_general());
    }

    #[test]
    fn test_deserialize_settings_shape() {
        let json = r#"{
            "name": "知乎",
            "triggers": ["https://zhuanlan.zhihu.com/*"],
            "properties": [
                {"name": "title", "value": "{{title | replace:\" - 知乎\",\"\"}}"},
                {"name": "source", "value": "{{url}}"}
            ],
            "noteContentFormat": "{{content}}",
            "noteNameFormat": "{{title}}"
        }"#;
        let t: Template = serde_json::from_str(json).unwrap();
        assert_eq!(t.name, "知乎");
        assert_eq!(t.triggers.len(), 1);
        assert_eq!(t.properties.len(), 2);
        assert_eq!(t.properties[0].name, "title");
    }

    #[test]
    fn test_deserialize_defaults_missing_formats() {
        let t: Template = serde_json::from_str(r#"{"name": "bare"}"#).unwrap();
        assert_eq!(t.note_content_format, "{{content}}");
        assert_eq!(t.note_name_format, "{{title}}");
    }
}
