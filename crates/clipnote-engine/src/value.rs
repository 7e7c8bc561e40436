//! Values flowing through the extraction pipeline.
//!
//! A resolved source or filter output is one of three shapes: text, a list of
//! strings, or a timestamp. Filters transform values; the renderer coerces
//! whatever comes out into display text.

use chrono::{DateTime, Local};

/// A value produced by source resolution or filter application.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    List(Vec<String>),
    Date(DateTime<Local>),
}

impl Value {
    /// Empty text value, the degraded result of any failed resolution.
    pub fn empty() -> Self {
        Value::Text(String::new())
    }

    /// Coerce to display text. Lists join with `", "`, dates render as
    /// `YYYY-MM-DD HH:MM:SS`.
    pub fn render(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::List(items) => items.join(", "),
            Value::Date(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// The string form filters like `replace` and `split` operate on.
    /// Identical to `render` today; kept separate because filter string
    /// coercion and display coercion are distinct contracts.
    pub fn as_text(&self) -> String {
        self.render()
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_render_text() {
        assert_eq!(Value::Text("hello".into()).render(), "hello");
    }

    #[test]
    fn test_render_list_joins_with_comma_space() {
        let v = Value::List(vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(v.render(), "a, b, c");
    }

    #[test]
    fn test_render_date() {
        let dt = Local.with_ymd_and_hms(2024, 3, 5, 9, 30, 0).unwrap();
        assert_eq!(Value::Date(dt).render(), "2024-03-05 09:30:00");
    }

    #[test]
    fn test_empty() {
        assert_eq!(Value::empty().render(), "");
    }
}
