//! Expression token parser.
//!
//! One `{{source | filter:arg,arg | ...}}` token parses into a source
//! identifier and an ordered filter chain. The grammar is one level deep:
//! filters cannot contain nested expressions. Parsing is total — malformed
//! input degrades to a best-effort result, never an error.

/// A single filter application: a name plus its raw string arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterInvocation {
    pub name: String,
    pub args: Vec<String>,
}

/// A parsed expression: `(source, [filter_invocation...])`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub source: String,
    pub filters: Vec<FilterInvocation>,
}

impl Expression {
    /// Parse a raw `{{...}}` token (delimiters optional).
    pub fn parse(token: &str) -> Self {
        let content = token.trim().trim_matches(|c| c == '{' || c == '}');

        let mut segments = split_unquoted(content, '|');
        let source = segments
            .next()
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        let filters = segments
            .map(|seg| parse_filter_spec(seg.trim()))
            .filter(|f| !f.name.is_empty())
            .collect();

        Self { source, filters }
    }
}

/// Parse a `name` or `name:argstring` filter spec.
fn parse_filter_spec(spec: &str) -> FilterInvocation {
    match spec.split_once(':') {
        Some((name, argstring)) => FilterInvocation {
            name: name.trim().to_string(),
            args: parse_args(argstring),
        },
        None => FilterInvocation {
            name: spec.to_string(),
            args: Vec::new(),
        },
    }
}

/// Split an argument string on commas, tracking single/double-quote nesting so
/// commas inside quotes do not split arguments. Surrounding quotes are
/// stripped; an unterminated quote still yields the accumulated text.
pub fn parse_args(argstring: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote_char: Option<char> = None;

    for c in argstring.chars() {
        match c {
            '"' | '\'' => match quote_char {
                None => quote_char = Some(c),
                Some(q) if q == c => quote_char = None,
                Some(_) => current.push(c),
            },
            ',' if quote_char.is_none() => {
                args.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        args.push(current.trim().to_string());
    }

    args
}

/// Split on a delimiter, ignoring occurrences inside quotes.
fn split_unquoted(input: &str, delim: char) -> impl Iterator<Item = &str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quote_char: Option<char> = None;

    for (i, c) in input.char_indices() {
        match c {
            '"' | '\'' => match quote_char {
                None => quote_char = Some(c),
                Some(q) if q == c => quote_char = None,
                Some(_) => {}
            },
            _ if c == delim && quote_char.is_none() => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts.into_iter()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_source() {
        let expr = Expression::parse("{{title}}");
        assert_eq!(expr.source, "title");
        assert!(expr.filters.is_empty());
    }

    #[test]
    fn test_parse_source_with_filters() {
        let expr = Expression::parse("{{selector:.title | replace:\"A\",\"B\" | slice:0,40}}");
        assert_eq!(expr.source, "selector:.title");
        assert_eq!(expr.filters.len(), 2);
        assert_eq!(expr.filters[0].name, "replace");
        assert_eq!(expr.filters[0].args, vec!["A", "B"]);
        assert_eq!(expr.filters[1].name, "slice");
        assert_eq!(expr.filters[1].args, vec!["0", "40"]);
    }

    #[test]
    fn test_parse_round_trip_quoted_comma() {
        // Commas inside quotes never split arguments.
        let expr = Expression::parse("{{a|b:\"x,y\",z}}");
        assert_eq!(expr.source, "a");
        assert_eq!(expr.filters.len(), 1);
        assert_eq!(expr.filters[0].name, "b");
        assert_eq!(expr.filters[0].args, vec!["x,y", "z"]);
    }

    #[test]
    fn test_parse_pipe_inside_quotes_does_not_split() {
        let expr = Expression::parse("{{title | replace:\"a|b\",\"c\"}}");
        assert_eq!(expr.filters.len(), 1);
        assert_eq!(expr.filters[0].args, vec!["a|b", "c"]);
    }

    #[test]
    fn test_parse_args_single_quotes() {
        assert_eq!(parse_args("'x,y',z"), vec!["x,y", "z"]);
    }

    #[test]
    fn test_parse_args_mixed_quote_inside_other_quote() {
        assert_eq!(parse_args("\"it's\",b"), vec!["it's", "b"]);
    }

    #[test]
    fn test_parse_args_unterminated_quote_best_effort() {
        assert_eq!(parse_args("\"abc"), vec!["abc"]);
    }

    #[test]
    fn test_parse_args_trailing_empty_dropped() {
        assert_eq!(parse_args("2,"), vec!["2"]);
    }

    #[test]
    fn test_parse_args_whitespace_trimmed() {
        assert_eq!(parse_args(" - 知乎 , \"\""), vec!["- 知乎", ""]);
    }

    #[test]
    fn test_parse_filter_without_args() {
        let expr = Expression::parse("{{content | markdown}}");
        assert_eq!(expr.filters[0].name, "markdown");
        assert!(expr.filters[0].args.is_empty());
    }

    #[test]
    fn test_parse_degenerate_never_panics() {
        for raw in ["", "{{}}", "{{|}}", "{{|||}}", "{{a|:}}", "{{a|b:}}"] {
            let expr = Expression::parse(raw);
            // A value is always produced, even on degenerate parses.
            assert!(expr.filters.iter().all(|f| !f.name.is_empty()), "{raw}");
        }
    }

    #[test]
    fn test_parse_selector_arg_keeps_colon_payload() {
        let expr = Expression::parse("{{selectorHtml:#js_content | markdown}}");
        assert_eq!(expr.source, "selectorHtml:#js_content");
        assert_eq!(expr.filters[0].name, "markdown");
    }
}
