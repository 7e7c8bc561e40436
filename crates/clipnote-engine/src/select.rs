//! Template selection by URL trigger.

use regex::Regex;
use tracing::debug;

use clipnote_core::Template;

/// Picks a template for a URL from an ordered set of loaded templates.
///
/// Triggers are glob patterns where `*` matches any character sequence.
/// Matching is anchored at the start of the URL. Selection never fails: a
/// URL with no matching trigger falls back to the general template, then to
/// the first loaded template, then to a synthesized default.
pub struct TemplateSelector {
    templates: Vec<Template>,
}

impl TemplateSelector {
    /// Load order is significant: the first template whose trigger matches
    /// wins.
    pub fn new(templates: Vec<Template>) -> Self {
        Self { templates }
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn select(&self, url: &str) -> Template {
        for template in &self.templates {
            for trigger in &template.triggers {
                if trigger_matches(trigger, url) {
                    debug!(template = %template.name, trigger = %trigger, url, "trigger matched");
                    return template.clone();
                }
            }
        }

        if let Some(general) = self.templates.iter().find(|t| t.is_general()) {
            debug!(url, "no trigger matched, using general template");
            return general.clone();
        }

        if let Some(first) = self.templates.first() {
            debug!(url, template = %first.name, "no trigger matched, using first template");
            return first.clone();
        }

        debug!(url, "no templates loaded, using built-in fallback");
        Template::fallback()
    }
}

/// Anchored glob match: `*` becomes `.*`, everything else is literal.
fn trigger_matches(trigger: &str, url: &str) -> bool {
    let pattern = format!("^{}", regex::escape(trigger).replace(r"\*", ".*"));
    match Regex::new(&pattern) {
        Ok(re) => re.is_match(url),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipnote_core::GENERAL_TEMPLATE_NAME;

    fn named(name: &str, triggers: &[&str]) -> Template {
        Template {
            id: name.to_lowercase(),
            name: name.to_string(),
            triggers: triggers.iter().map(|s| s.to_string()).collect(),
            properties: Vec::new(),
            note_content_format: "{{content}}".to_string(),
            note_name_format: "{{title}}".to_string(),
        }
    }

    #[test]
    fn test_trigger_glob_matches_prefix_and_wildcard() {
        assert!(trigger_matches(
            "https://example.com/*",
            "https://example.com/posts/1"
        ));
        assert!(trigger_matches("https://example.com", "https://example.com/x"));
        assert!(!trigger_matches(
            "https://example.com/*",
            "https://other.com/example.com/"
        ));
    }

    #[test]
    fn test_trigger_escapes_regex_metacharacters() {
        // Dots in the trigger are literal, not "any character".
        assert!(!trigger_matches("https://a.b.com/*", "https://aXb.com/page"));
    }

    #[test]
    fn test_first_matching_template_wins() {
        let selector = TemplateSelector::new(vec![
            named("First", &["https://example.com/*"]),
            named("Second", &["https://example.com/*"]),
        ]);
        assert_eq!(selector.select("https://example.com/a").name, "First");
    }

    #[test]
    fn test_falls_back_to_general_template() {
        let selector = TemplateSelector::new(vec![
            named("Blog", &["https://blog.example.com/*"]),
            named(GENERAL_TEMPLATE_NAME, &[]),
        ]);
        assert_eq!(
            selector.select("https://nothing.matches/").name,
            GENERAL_TEMPLATE_NAME
        );
    }

    #[test]
    fn test_falls_back_to_first_loaded_without_general() {
        let selector = TemplateSelector::new(vec![
            named("Blog", &["https://blog.example.com/*"]),
            named("News", &["https://news.example.com/*"]),
        ]);
        assert_eq!(selector.select("https://nothing.matches/").name, "Blog");
    }

    #[test]
    fn test_empty_selector_synthesizes_default() {
        let selector = TemplateSelector::new(Vec::new());
        let t = selector.select("https://anything/");
        assert_eq!(t.note_content_format, "{{content}}");
        assert_eq!(t.note_name_format, "{{title}}");
    }
}
