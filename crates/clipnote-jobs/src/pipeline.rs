//! The clip pipeline: fetch, render, store, analyze.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use clipnote_core::traits::{ArticleStore, PageRenderer, TextAnalyzer};
use clipnote_core::{defaults, Article, ClipReport, ClipStatus, Error, Template};
use clipnote_engine::{render_note, TemplateSelector};

use crate::handler::{TaskContext, TaskHandler, TaskResult};

/// Matches `selector:<css>` / `selectorHtml:<css>` inside a template string.
static WAIT_SELECTOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"selector(?:Html)?:([^|}]*)").unwrap());

/// End-to-end clip handler: navigates the URL, renders the selected template,
/// stores the article, and optionally runs text analysis.
pub struct ClipPipeline {
    renderer: Arc<dyn PageRenderer>,
    selector: TemplateSelector,
    articles: Arc<dyn ArticleStore>,
    analyzer: Option<Arc<dyn TextAnalyzer>>,
}

impl ClipPipeline {
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        selector: TemplateSelector,
        articles: Arc<dyn ArticleStore>,
    ) -> Self {
        Self {
            renderer,
            selector,
            articles,
            analyzer: None,
        }
    }

    /// Attach a text-analysis collaborator.
    pub fn with_analyzer(mut self, analyzer: Arc<dyn TextAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    async fn run(&self, ctx: &TaskContext) -> std::result::Result<ClipReport, String> {
        let url = ctx.url().to_string();

        ctx.progress(5, "checking", "checking for existing article").await;
        match self.articles.find_by_url(&url).await {
            Ok(Some(article)) if !article.full_content.is_empty() => {
                info!(%url, "article already clipped, skipping fetch");
                return Ok(ClipReport {
                    status: ClipStatus::Exists,
                    message: "article already clipped".to_string(),
                    note: None,
                });
            }
            Ok(_) => {}
            Err(e) => return Err(format!("article lookup failed: {e}")),
        }

        let template = self.selector.select(&url);

        ctx.progress(20, "fetching", "loading page").await;
        let page = self.navigate_with_retries(&url).await?;

        if let Some(css) = derive_wait_selector(&template) {
            ctx.progress(40, "waiting", "waiting for page content").await;
            let wait = Duration::from_millis(defaults::SELECTOR_WAIT_TIMEOUT_MS);
            if let Err(e) = page.wait_for_selector(&css, wait).await {
                // The content selector may simply never attach; render anyway.
                debug!(%url, selector = %css, error = %e, "wait for selector timed out");
            }
            tokio::time::sleep(Duration::from_millis(defaults::SETTLE_DELAY_MS)).await;
        }

        ctx.progress(60, "rendering", "rendering template").await;
        let note = render_note(&template, page.as_ref(), &url).await;
        let title = page.title().await.unwrap_or_default();

        ctx.progress(80, "saving", "storing article").await;
        let article = Article {
            url: url.clone(),
            title,
            full_content: note.content.clone(),
            full_markdown: note.markdown.clone(),
            clipper_metadata: serde_json::to_value(&note.properties)
                .map_err(|e| format!("metadata serialization failed: {e}"))?,
            llm_fields: None,
            updated_at: Utc::now(),
        };
        let existed = self
            .articles
            .upsert(article)
            .await
            .map_err(|e| format!("article store failed: {e}"))?;

        if ctx.task.use_summary {
            if let Some(analyzer) = &self.analyzer {
                ctx.progress(90, "analyzing", "running text analysis").await;
                // Bound the analysis input; the stored article keeps full text.
                let text: String = note
                    .content
                    .chars()
                    .take(defaults::ANALYSIS_MAX_CHARS)
                    .collect();
                let fields = analyzer
                    .analyze(&text)
                    .await
                    .map_err(|e| format!("analysis failed: {e}"))?;
                self.articles
                    .merge_fields(&url, fields)
                    .await
                    .map_err(|e| format!("analysis merge failed: {e}"))?;
            }
        }

        let status = if existed {
            ClipStatus::Updated
        } else {
            ClipStatus::Success
        };
        Ok(ClipReport {
            status,
            message: format!("clipped with template '{}'", template.name),
            note: Some(note),
        })
    }

    /// Navigate with an escalating timeout ladder. Only fetch-class errors
    /// are retried; anything else fails immediately.
    async fn navigate_with_retries(
        &self,
        url: &str,
    ) -> std::result::Result<Box<dyn clipnote_core::traits::PageHandle>, String> {
        let max = defaults::FETCH_MAX_RETRIES;
        for attempt in 0..max {
            let timeout_ms =
                defaults::FETCH_BASE_TIMEOUT_MS + attempt as u64 * defaults::FETCH_TIMEOUT_STEP_MS;
            match self
                .renderer
                .navigate(url, Duration::from_millis(timeout_ms))
                .await
            {
                Ok(page) => return Ok(page),
                Err(e @ Error::Fetch(_)) if attempt + 1 < max => {
                    warn!(
                        %url,
                        attempt = attempt + 1,
                        timeout_ms,
                        error = %e,
                        "page load failed, retrying with longer timeout"
                    );
                }
                Err(e) => return Err(format!("page load failed: {e}")),
            }
        }
        Err("page load failed: retries exhausted".to_string())
    }
}

#[async_trait]
impl TaskHandler for ClipPipeline {
    async fn execute(&self, ctx: TaskContext) -> TaskResult {
        match self.run(&ctx).await {
            Ok(report) => TaskResult::Success(report),
            Err(message) => TaskResult::Failed(message),
        }
    }
}

/// Derive the CSS selector worth waiting for before rendering: the first
/// `selector:`/`selectorHtml:` payload mentioned anywhere in the template.
pub fn derive_wait_selector(template: &Template) -> Option<String> {
    let mut haystacks: Vec<&str> = template.properties.iter().map(|p| p.value.as_str()).collect();
    haystacks.push(&template.note_content_format);
    haystacks.push(&template.note_name_format);

    for text in haystacks {
        if let Some(caps) = WAIT_SELECTOR_RE.captures(text) {
            let css = caps[1].trim().to_string();
            if !css.is_empty() {
                return Some(css);
            }
        }
    }
    None
}
