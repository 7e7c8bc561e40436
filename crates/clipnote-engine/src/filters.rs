//! Filter library: pure, stateless value transformers.
//!
//! Filters apply left-to-right. A filter's internal failure (bad arguments,
//! unparseable date, invalid selector) makes it a no-op rather than aborting
//! the chain, so a value always comes out the other end.

use chrono::{NaiveDate, NaiveDateTime};
use scraper::{Html, Selector};
use tracing::debug;

use crate::expression::FilterInvocation;
use crate::value::Value;

/// The closed set of known filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Date,
    Replace,
    Split,
    Join,
    Slice,
    Markdown,
    RemoveTags,
    Wikilink,
    First,
}

impl Filter {
    /// Look up a filter by its expression-language name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "date" => Some(Filter::Date),
            "replace" => Some(Filter::Replace),
            "split" => Some(Filter::Split),
            "join" => Some(Filter::Join),
            "slice" => Some(Filter::Slice),
            "markdown" => Some(Filter::Markdown),
            "remove_tags" => Some(Filter::RemoveTags),
            "wikilink" => Some(Filter::Wikilink),
            "first" => Some(Filter::First),
            _ => None,
        }
    }
}

/// Apply one filter invocation to a value. Unknown filters and internal
/// failures pass the value through unchanged.
pub fn apply(value: Value, inv: &FilterInvocation) -> Value {
    let Some(filter) = Filter::from_name(&inv.name) else {
        debug!(filter = %inv.name, "unknown filter, passing value through");
        return value;
    };

    match filter {
        Filter::Date => apply_date(value, &inv.args),
        Filter::Replace => {
            let old = inv.args.first().map(String::as_str).unwrap_or("");
            let new = inv.args.get(1).map(String::as_str).unwrap_or("");
            Value::Text(value.as_text().replace(old, new))
        }
        Filter::Split => {
            let sep = inv
                .args
                .first()
                .filter(|s| !s.is_empty())
                .map(String::as_str)
                .unwrap_or(",");
            Value::List(value.as_text().split(sep).map(str::to_string).collect())
        }
        Filter::Join => match value {
            Value::List(items) => {
                let sep = inv.args.first().map(String::as_str).unwrap_or(" ");
                Value::Text(items.join(sep))
            }
            other => other,
        },
        Filter::Slice => apply_slice(value, &inv.args),
        Filter::Markdown => match htmd::convert(&value.as_text()) {
            Ok(md) => Value::Text(md),
            Err(_) => value,
        },
        Filter::RemoveTags => {
            let css = inv.args.first().map(String::as_str).unwrap_or("");
            match remove_tags(&value.as_text(), css) {
                Some(html) => Value::Text(html),
                None => value,
            }
        }
        Filter::Wikilink => match value {
            Value::List(items) => {
                Value::List(items.into_iter().map(|v| format!("[[{v}]]")).collect())
            }
            other => Value::Text(format!("[[{}]]", other.render())),
        },
        Filter::First => match value {
            Value::List(items) if !items.is_empty() => {
                Value::Text(items.into_iter().next().unwrap_or_default())
            }
            other => other,
        },
    }
}

/// Default strftime format when `date` gets no argument.
const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Substitute Moment-style tokens into strftime specifiers.
fn moment_to_strftime(fmt: &str) -> String {
    fmt.replace("YYYY", "%Y")
        .replace("MM", "%m")
        .replace("DD", "%d")
        .replace("HH", "%H")
        .replace("mm", "%M")
        .replace("ss", "%S")
}

fn apply_date(value: Value, args: &[String]) -> Value {
    let fmt = args
        .first()
        .map(|a| moment_to_strftime(a))
        .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string());

    match &value {
        Value::Date(dt) => match render_strftime(dt.format(&fmt)) {
            Some(out) => Value::Text(out),
            None => value,
        },
        Value::Text(s) => match parse_loose_date(s).and_then(|dt| render_strftime(dt.format(&fmt))) {
            Some(out) => Value::Text(out),
            None => value,
        },
        Value::List(_) => value,
    }
}

/// Render a chrono `DelayedFormat` without trusting the format string.
/// A malformed specifier (e.g. a trailing `%`) surfaces as a `fmt::Error`
/// here instead of aborting in `to_string`.
fn render_strftime(delayed: impl std::fmt::Display) -> Option<String> {
    use std::fmt::Write;
    let mut out = String::new();
    match write!(out, "{delayed}") {
        Ok(()) => Some(out),
        Err(_) => {
            debug!("invalid date format, passing value through");
            None
        }
    }
}

/// Best-effort parse of a free-form date string.
fn parse_loose_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc2822(s) {
        return Some(dt.naive_local());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y年%m月%d日", "%B %d, %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn apply_slice(value: Value, args: &[String]) -> Value {
    let parse = |s: &str| s.parse::<usize>().ok();

    match args {
        [n] => {
            let Some(end) = parse(n) else { return value };
            slice_range(value, 0, Some(end))
        }
        [a, b, ..] => {
            let Some(start) = parse(a) else { return value };
            // Empty end means "to end of sequence".
            let end = if b.is_empty() {
                None
            } else {
                match parse(b) {
                    Some(e) => Some(e),
                    None => return value,
                }
            };
            slice_range(value, start, end)
        }
        [] => value,
    }
}

/// Half-open `[start, end)` over characters (Text) or elements (List).
fn slice_range(value: Value, start: usize, end: Option<usize>) -> Value {
    let take = |len: usize| end.unwrap_or(len).saturating_sub(start);
    match value {
        Value::Text(s) => {
            let len = s.chars().count();
            Value::Text(s.chars().skip(start).take(take(len)).collect())
        }
        Value::List(items) => {
            let len = items.len();
            Value::List(items.into_iter().skip(start).take(take(len)).collect())
        }
        other => other,
    }
}

/// Remove all elements matching the selector and return serialized HTML.
/// Returns None when the selector is invalid.
fn remove_tags(html: &str, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    let fragment = Html::parse_fragment(html);
    let mut out = fragment.root_element().inner_html();
    for element in fragment.select(&selector) {
        out = out.replace(&element.html(), "");
    }
    Some(out)
}
