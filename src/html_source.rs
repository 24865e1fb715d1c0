use std::path::PathBuf;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, COOKIE};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::config::SourceConfig;
use crate::source::{Fragment, MediaFetcher, PageSource};

const CONTAINER_SELECTOR: &str = r#"[data-urn*="activity"]"#;
const FALLBACK_CONTAINER_SELECTOR: &str = ".feed-shared-update-v2";
const TEXT_SELECTOR: &str = ".feed-shared-update-v2__description, .break-words";
const MEDIA_SELECTOR: &str = r#"img[src*="media"]"#;
const DATE_SELECTOR: &str = ".feed-shared-actor__sub-description, time";

#[derive(Debug, Clone)]
pub enum PageOrigin {
    /// Activity page saved from a logged-in browser.
    File(PathBuf),
    /// Live activity page, fetched with the configured cookie.
    Url(Url),
}

/// Activity-page source backed by `scraper` selectors.
pub struct HtmlPageSource {
    origin: PageOrigin,
    config: SourceConfig,
    client: reqwest::Client,
    page: tokio::sync::OnceCell<String>,
}

impl HtmlPageSource {
    pub fn new(origin: PageOrigin, config: SourceConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(config.user_agent.clone())
            .build()
            .context("build page source http client")?;
        Ok(Self {
            origin,
            config,
            client,
            page: tokio::sync::OnceCell::new(),
        })
    }

    async fn page(&self) -> anyhow::Result<&str> {
        let html = self
            .page
            .get_or_try_init(|| async { self.load_page().await })
            .await?;
        Ok(html.as_str())
    }

    async fn load_page(&self) -> anyhow::Result<String> {
        match &self.origin {
            PageOrigin::File(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("read saved activity page: {}", path.display())),
            PageOrigin::Url(url) => {
                tracing::info!(url = %url, "fetch activity page");
                let mut request = self
                    .client
                    .get(url.clone())
                    .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8");
                if let Some(cookie) = self.config.cookie.as_deref() {
                    request = request.header(COOKIE, cookie);
                }
                let response = request
                    .send()
                    .await
                    .with_context(|| format!("GET {url}"))?;

                if is_login_wall(response.url()) {
                    anyhow::bail!(
                        "session expired: redirected to {} (refresh POSTFOLD_COOKIE)",
                        response.url()
                    );
                }
                let status = response.status();
                if !status.is_success() {
                    anyhow::bail!("activity page request failed ({status}): {url}");
                }
                response.text().await.context("read activity page body")
            }
        }
    }
}

#[async_trait]
impl MediaFetcher for HtmlPageSource {
    async fn fetch_bytes(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        if !self.config.delay.is_zero() {
            tokio::time::sleep(self.config.delay).await;
        }
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("media request failed ({status}): {url}");
        }
        let bytes = response.bytes().await.context("read media body")?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl PageSource for HtmlPageSource {
    async fn prepare(&self) -> anyhow::Result<()> {
        self.page().await.context("load activity page")?;
        Ok(())
    }

    async fn fetch_candidates(&self, limit: usize) -> anyhow::Result<Vec<Box<dyn Fragment>>> {
        let html = self.page().await.context("load activity page")?;
        let fragments = parse_fragments(html, limit)?;
        tracing::info!(found = fragments.len(), limit, "potential posts found");
        Ok(fragments
            .into_iter()
            .map(|fragment| Box::new(fragment) as Box<dyn Fragment>)
            .collect())
    }
}

pub fn is_login_wall(url: &Url) -> bool {
    let url = url.as_str().to_ascii_lowercase();
    url.contains("login") || url.contains("authwall")
}

/// Fragment data copied out of the parsed DOM.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlFragment {
    pub token: Option<String>,
    pub text: String,
    pub media_urls: Vec<String>,
    pub date_text: String,
}

impl Fragment for HtmlFragment {
    fn token(&self) -> Option<String> {
        self.token.clone()
    }

    fn text(&self) -> anyhow::Result<String> {
        Ok(self.text.clone())
    }

    fn media_urls(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.media_urls.clone())
    }

    fn date_text(&self) -> anyhow::Result<String> {
        Ok(self.date_text.clone())
    }
}

struct Selectors {
    container: Selector,
    fallback_container: Selector,
    text: Selector,
    media: Selector,
    date: Selector,
}

impl Selectors {
    fn new() -> anyhow::Result<Self> {
        Ok(Self {
            container: selector(CONTAINER_SELECTOR)?,
            fallback_container: selector(FALLBACK_CONTAINER_SELECTOR)?,
            text: selector(TEXT_SELECTOR)?,
            media: selector(MEDIA_SELECTOR)?,
            date: selector(DATE_SELECTOR)?,
        })
    }
}

fn selector(css: &str) -> anyhow::Result<Selector> {
    Selector::parse(css).map_err(|err| anyhow::anyhow!("parse selector {css:?}: {err:?}"))
}

/// Splits an activity page into at most `limit` fragments.
pub fn parse_fragments(html: &str, limit: usize) -> anyhow::Result<Vec<HtmlFragment>> {
    let selectors = Selectors::new()?;
    let document = Html::parse_document(html);

    let mut containers: Vec<ElementRef<'_>> = document.select(&selectors.container).collect();
    if containers.is_empty() {
        tracing::debug!("no activity containers; falling back to feed update selector");
        containers = document.select(&selectors.fallback_container).collect();
    }

    Ok(containers
        .into_iter()
        .take(limit)
        .map(|container| fragment_from(&selectors, container))
        .collect())
}

fn fragment_from(selectors: &Selectors, container: ElementRef<'_>) -> HtmlFragment {
    let token = container
        .value()
        .attr("data-urn")
        .or_else(|| container.value().attr("data-id"))
        .map(str::to_owned);

    let text = container
        .select(&selectors.text)
        .next()
        .map(inner_text)
        .unwrap_or_default();

    let mut media_urls = Vec::new();
    for img in container.select(&selectors.media) {
        if let Some(src) = img.value().attr("src") {
            let src = src.trim().to_owned();
            if !src.is_empty() && !media_urls.contains(&src) {
                media_urls.push(src);
            }
        }
    }

    let date_text = container
        .select(&selectors.date)
        .next()
        .map(inner_text)
        .unwrap_or_default();

    HtmlFragment {
        token,
        text,
        media_urls,
        date_text,
    }
}

/// Approximates rendered text: `<br>` and block elements break lines,
/// markup indentation collapses.
fn inner_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    for node in element.descendants() {
        if let Some(text) = node.value().as_text() {
            raw.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }));
        } else if let Some(el) = node.value().as_element() {
            match el.name() {
                "br" => raw.push('\n'),
                "p" | "div" | "li" if !raw.is_empty() => raw.push('\n'),
                _ => {}
            }
        }
    }
    normalize_text(&raw)
}

fn normalize_text(raw: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in raw.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() && lines.last().is_some_and(|l| l.is_empty()) {
            continue;
        }
        lines.push(collapsed);
    }
    lines.join("\n").trim().to_owned()
}
