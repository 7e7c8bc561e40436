//! Source resolution: mapping a source identifier to a value.
//!
//! Resolution is total. Every page-access failure degrades to an empty
//! string, and an unknown identifier resolves to itself as literal text, so
//! template rendering never sees an error from this layer.

use chrono::{DateTime, Local};
use scraper::{Html, Selector};
use tracing::{debug, warn};

use clipnote_core::defaults::EXTRACTION_MIN_CHARS;
use clipnote_core::traits::PageHandle;

use crate::value::Value;

/// Host whose pages hide the article inside a known content container and
/// bury it under heavy navigation chrome.
const WECHAT_HOST: &str = "mp.weixin.qq.com";

/// Per-render state bound to one URL.
///
/// `now` is captured once at construction so multiple `date` sources agree
/// within one render.
pub struct ExtractionContext<'a> {
    page: &'a dyn PageHandle,
    url: &'a str,
    now: DateTime<Local>,
}

impl<'a> ExtractionContext<'a> {
    pub fn new(page: &'a dyn PageHandle, url: &'a str) -> Self {
        Self {
            page,
            url,
            now: Local::now(),
        }
    }

    pub fn url(&self) -> &str {
        self.url
    }

    /// Resolve a source identifier to a value. Never fails.
    pub async fn resolve(&self, source: &str) -> Value {
        match source {
            "url" => Value::Text(self.url.to_string()),
            "date" => Value::Date(self.now),
            "title" => Value::Text(self.page.title().await.unwrap_or_default()),
            "author" => self.meta("author").await,
            "description" => self.meta("description").await,
            "content" => self.content().await,
            other => {
                if let Some(css) = other.strip_prefix("selector:") {
                    self.locator_text(css.trim()).await
                } else if let Some(css) = other.strip_prefix("selectorHtml:") {
                    self.locator_html(css.trim()).await
                } else {
                    // Unknown identifiers act as literal text.
                    Value::Text(other.to_string())
                }
            }
        }
    }

    async fn meta(&self, name: &str) -> Value {
        match self.page.meta_attribute(name).await {
            Ok(Some(v)) => Value::Text(v),
            Ok(None) => Value::empty(),
            Err(e) => {
                debug!(meta = name, error = %e, "meta attribute lookup failed");
                Value::empty()
            }
        }
    }

    async fn locator_text(&self, css: &str) -> Value {
        match self.page.locator_text(css).await {
            Ok(Some(text)) => Value::Text(text),
            Ok(None) => Value::empty(),
            Err(e) => {
                debug!(selector = css, error = %e, "selector text lookup failed");
                Value::empty()
            }
        }
    }

    async fn locator_html(&self, css: &str) -> Value {
        match self.page.locator_html(css).await {
            Ok(Some(html)) => Value::Text(html),
            Ok(None) => Value::empty(),
            Err(e) => {
                debug!(selector = css, error = %e, "selector html lookup failed");
                Value::empty()
            }
        }
    }

    /// Main-content extraction with boilerplate stripping and a
    /// whole-document fallback.
    async fn content(&self) -> Value {
        let html = match self.page.content().await {
            Ok(h) => h,
            Err(e) => {
                warn!(url = self.url, error = %e, "full document access failed");
                return Value::empty();
            }
        };
        Value::Text(extract_content(&html, self.url))
    }
}

/// Convert a rendered document into Markdown body content.
pub fn extract_content(html: &str, url: &str) -> String {
    let html = rewrite_lazy_images(html);

    let container = if url.contains(WECHAT_HOST) {
        wechat_container(&html)
    } else {
        main_container(&html)
    };

    let markdown = match container {
        Some(inner) => html_to_markdown(&inner),
        None => html_to_markdown(&body_without_boilerplate(&html)),
    };

    // A near-empty result from a page that clearly had markup means the
    // extractor missed the content; convert the whole document instead.
    if markdown.trim().len() < EXTRACTION_MIN_CHARS && html.contains("<html") {
        debug!(url, "weak extraction, converting whole document");
        return html_to_markdown(&html);
    }

    markdown
}

/// Rewrite lazy-loaded image attributes so converters pick the images up.
fn rewrite_lazy_images(html: &str) -> String {
    html.replace("data-src=\"", "src=\"")
        .replace("data-original-src=\"", "src=\"")
}

/// Locate the WeChat article container and strip script/style from it.
fn wechat_container(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    for css in ["#js_content", ".rich_media_content"] {
        let selector = Selector::parse(css).ok()?;
        if let Some(element) = document.select(&selector).next() {
            return Some(strip_elements(&element.inner_html(), &["script", "style"]));
        }
    }
    None
}

/// Candidate containers that usually hold the main article content.
const MAIN_CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role='main']",
    "#content",
    "#main",
    ".content",
    ".main",
    ".post-content",
    ".entry-content",
];

/// First matching main-content candidate, if any.
fn main_container(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    for css in MAIN_CONTENT_SELECTORS {
        if let Ok(selector) = Selector::parse(css) {
            if let Some(element) = document.select(&selector).next() {
                return Some(element.inner_html());
            }
        }
    }
    None
}

const BOILERPLATE_SELECTORS: &[&str] = &[
    "nav", "header", "footer", "aside", "script", "style", "noscript", "iframe", ".nav",
    ".navbar", ".sidebar", ".menu", ".advertisement", ".ads", "#nav", "#header", "#footer",
    "#sidebar",
];

/// The document body with navigation/boilerplate elements removed.
fn body_without_boilerplate(html: &str) -> String {
    let document = Html::parse_document(html);
    let body = Selector::parse("body").ok().and_then(|sel| {
        document
            .select(&sel)
            .next()
            .map(|element| element.inner_html())
    });
    match body {
        Some(inner) => strip_elements(&inner, BOILERPLATE_SELECTORS),
        None => html.to_string(),
    }
}

/// Remove all elements matching any selector from an HTML fragment.
fn strip_elements(html: &str, selectors: &[&str]) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = fragment.root_element().inner_html();
    for css in selectors {
        if let Ok(selector) = Selector::parse(css) {
            for element in fragment.select(&selector) {
                out = out.replace(&element.html(), "");
            }
        }
    }
    out
}

/// HTML to Markdown, degrading to plain text extraction on converter failure.
fn html_to_markdown(html: &str) -> String {
    htmd::convert(html).unwrap_or_else(|_| {
        let document = Html::parse_document(html);
        document.root_element().text().collect::<String>()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use clipnote_core::Result;
    use std::time::Duration;

    struct StubPage {
        title: String,
        html: String,
        author: Option<String>,
    }

    #[async_trait]
    impl PageHandle for StubPage {
        async fn title(&self) -> Result<String> {
            Ok(self.title.clone())
        }

        async fn content(&self) -> Result<String> {
            Ok(self.html.clone())
        }

        async fn wait_for_selector(&self, _css: &str, _timeout: Duration) -> Result<()> {
            Ok(())
        }

        async fn locator_text(&self, css: &str) -> Result<Option<String>> {
            if css == ".headline" {
                Ok(Some("Breaking".to_string()))
            } else {
                Ok(None)
            }
        }

        async fn locator_html(&self, css: &str) -> Result<Option<String>> {
            if css == ".headline" {
                Ok(Some("<b>Breaking</b>".to_string()))
            } else {
                Ok(None)
            }
        }

        async fn meta_attribute(&self, name: &str) -> Result<Option<String>> {
            if name == "author" {
                Ok(self.author.clone())
            } else {
                Ok(None)
            }
        }
    }

    fn stub() -> StubPage {
        StubPage {
            title: "Page Title".to_string(),
            html: "<html><body><article><p>Body text that is long enough to count as a real \
                   extraction result for the threshold check.</p></article></body></html>"
                .to_string(),
            author: Some("ada".to_string()),
        }
    }

    #[tokio::test]
    async fn test_resolve_url_and_title() {
        let page = stub();
        let ctx = ExtractionContext::new(&page, "https://example.com/a");
        assert_eq!(
            ctx.resolve("url").await,
            Value::Text("https://example.com/a".into())
        );
        assert_eq!(ctx.resolve("title").await, Value::Text("Page Title".into()));
    }

    #[tokio::test]
    async fn test_resolve_date_fixed_within_render() {
        let page = stub();
        let ctx = ExtractionContext::new(&page, "https://example.com");
        let a = ctx.resolve("date").await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let b = ctx.resolve("date").await;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_resolve_author_present_and_description_absent() {
        let page = stub();
        let ctx = ExtractionContext::new(&page, "https://example.com");
        assert_eq!(ctx.resolve("author").await, Value::Text("ada".into()));
        assert_eq!(ctx.resolve("description").await, Value::empty());
    }

    #[tokio::test]
    async fn test_resolve_selector_text_and_html() {
        let page = stub();
        let ctx = ExtractionContext::new(&page, "https://example.com");
        assert_eq!(
            ctx.resolve("selector:.headline").await,
            Value::Text("Breaking".into())
        );
        assert_eq!(
            ctx.resolve("selectorHtml:.headline").await,
            Value::Text("<b>Breaking</b>".into())
        );
        // No match degrades to empty, never an error.
        assert_eq!(ctx.resolve("selector:.missing").await, Value::empty());
    }

    #[tokio::test]
    async fn test_resolve_unknown_identifier_is_literal() {
        let page = stub();
        let ctx = ExtractionContext::new(&page, "https://example.com");
        assert_eq!(ctx.resolve("clippings").await, Value::Text("clippings".into()));
    }

    #[tokio::test]
    async fn test_resolve_content_extracts_article() {
        let page = stub();
        let ctx = ExtractionContext::new(&page, "https://example.com");
        let content = ctx.resolve("content").await.render();
        assert!(content.contains("Body text"), "{content}");
        assert!(!content.contains("<article>"));
    }

    #[test]
    fn test_rewrite_lazy_images() {
        let html = r#"<img data-src="a.png"><img data-original-src="b.png">"#;
        let out = rewrite_lazy_images(html);
        assert_eq!(out.matches("src=\"").count(), 2);
        assert!(!out.contains("data-src"));
    }

    #[test]
    fn test_wechat_container_preferred() {
        let html = r#"<html><body>
            <div class="nav">menu menu menu</div>
            <div id="js_content"><script>track()</script><p>正文内容在这里，足够长的一段文字用来通过阈值检查，正文内容在这里。</p></div>
        </body></html>"#;
        let out = extract_content(html, "https://mp.weixin.qq.com/s/abc");
        assert!(out.contains("正文内容"), "{out}");
        assert!(!out.contains("track()"));
        assert!(!out.contains("menu"));
    }

    #[test]
    fn test_main_content_skips_boilerplate() {
        let html = "<html><body><nav>nav links</nav><main><p>The actual article body, long \
                    enough for the weak-extraction threshold to pass comfortably.</p></main>\
                    </body></html>";
        let out = extract_content(html, "https://example.com");
        assert!(out.contains("actual article body"));
        assert!(!out.contains("nav links"));
    }

    #[test]
    fn test_weak_extraction_falls_back_to_whole_document() {
        // The <main> container is nearly empty; the body holds the content.
        let html = "<html><body><main> </main><p>Fallback paragraph with enough text to pass \
                    the extraction threshold after whole-document conversion.</p></body></html>";
        let out = extract_content(html, "https://example.com");
        assert!(out.contains("Fallback paragraph"), "{out}");
    }

    #[test]
    fn test_strip_elements() {
        let html = "<div><script>x</script><p>keep</p><style>y</style></div>";
        let out = strip_elements(html, &["script", "style"]);
        assert!(out.contains("keep"));
        assert!(!out.contains("<script>"));
        assert!(!out.contains("<style>"));
    }
}
