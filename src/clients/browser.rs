//! Browser automation capability used by the listing scraper.
//!
//! The scraper only talks to [`BrowserSession`]; how pages are rendered is up
//! to the implementation. Production scrapes drive a real browser through
//! [`crate::clients::webdriver`]. [`HtmlBrowser`] is a static-DOM session: it
//! loads server-rendered HTML through a [`PageSource`] and follows a control's
//! link when asked to click it.

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::ScraperConfig;

#[derive(Debug, Clone, Error)]
pub enum BrowserError {
    #[error("Timed out after {timeout:?} waiting for '{selector}'")]
    Timeout { selector: String, timeout: Duration },

    /// The element was detached from the page between locating and using it.
    #[error("Stale element reference for '{0}'")]
    StaleElement(String),

    #[error("Invalid selector '{0}'")]
    InvalidSelector(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Interaction failed: {0}")]
    Interaction(String),

    #[error("Browser session could not start: {0}")]
    Launch(String),
}

/// Snapshot of one element as located on the current page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub text: String,
    pub attributes: HashMap<String, String>,
    pub displayed: bool,
    pub enabled: bool,
}

impl Element {
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Waits until at least one element matches `selector`.
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// All elements currently matching `selector`, in document order.
    /// An empty result is not an error.
    async fn find_elements(&mut self, selector: &str) -> Result<Vec<Element>, BrowserError>;

    /// Clicks the `index`-th element matching `selector`, locating it afresh.
    async fn click(&mut self, selector: &str, index: usize) -> Result<(), BrowserError>;

    async fn close(&mut self);
}

/// Opens a fresh session for each platform scrape.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// Supplies raw HTML for a URL.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String, BrowserError>;
}

#[derive(Clone)]
pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    #[must_use]
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            client: Client::builder()
                .user_agent(config.user_agent.as_str())
                .timeout(Duration::from_secs(config.page_load_timeout_seconds.max(1)))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_page(&self, url: &str) -> Result<String, BrowserError> {
        let navigation_error = |message: String| BrowserError::Navigation {
            url: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| navigation_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(navigation_error(format!("HTTP {}", response.status())));
        }

        response
            .text()
            .await
            .map_err(|e| navigation_error(e.to_string()))
    }
}

/// Static-DOM browser session.
///
/// The document is kept as text and parsed per query, since parsed trees are
/// not `Send` and sessions live across await points.
pub struct HtmlBrowser {
    source: Arc<dyn PageSource>,
    current_url: Option<Url>,
    document: String,
}

impl HtmlBrowser {
    #[must_use]
    pub fn new(source: Arc<dyn PageSource>) -> Self {
        Self {
            source,
            current_url: None,
            document: String::new(),
        }
    }

    #[must_use]
    pub fn current_url(&self) -> Option<&Url> {
        self.current_url.as_ref()
    }

    fn select(&self, selector: &str) -> Result<Vec<Element>, BrowserError> {
        let selector = parse_selector(selector)?;
        let html = Html::parse_document(&self.document);
        Ok(html.select(&selector).map(snapshot).collect())
    }
}

#[async_trait]
impl BrowserSession for HtmlBrowser {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        let parsed = Url::parse(url).map_err(|e| BrowserError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        debug!(url = %parsed, "Loading page");
        self.document = self.source.fetch_page(parsed.as_str()).await?;
        self.current_url = Some(parsed);
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        // A static document never changes, so there is nothing to wait for.
        if self.select(selector)?.is_empty() {
            return Err(BrowserError::Timeout {
                selector: selector.to_string(),
                timeout,
            });
        }
        Ok(())
    }

    async fn find_elements(&mut self, selector: &str) -> Result<Vec<Element>, BrowserError> {
        self.select(selector)
    }

    async fn click(&mut self, selector: &str, index: usize) -> Result<(), BrowserError> {
        let elements = self.select(selector)?;
        let element = elements
            .get(index)
            .ok_or_else(|| BrowserError::StaleElement(selector.to_string()))?;

        let href = element
            .attribute("href")
            .filter(|href| !href.trim().is_empty() && !href.trim_start().starts_with('#'))
            .ok_or_else(|| {
                BrowserError::Interaction(format!(
                    "'{selector}' has no link to follow in a static page"
                ))
            })?;

        let base = self
            .current_url
            .as_ref()
            .ok_or_else(|| BrowserError::Interaction("no page loaded".to_string()))?;

        let target = base.join(href.trim()).map_err(|e| BrowserError::Navigation {
            url: href.to_string(),
            message: e.to_string(),
        })?;

        self.navigate(target.as_str()).await
    }

    async fn close(&mut self) {
        self.document.clear();
        self.current_url = None;
    }
}

#[derive(Clone)]
pub struct HtmlBrowserLauncher {
    source: Arc<dyn PageSource>,
}

impl HtmlBrowserLauncher {
    #[must_use]
    pub fn new(source: Arc<dyn PageSource>) -> Self {
        Self { source }
    }

    #[must_use]
    pub fn over_http(config: &ScraperConfig) -> Self {
        Self::new(Arc::new(HttpPageSource::new(config)))
    }
}

#[async_trait]
impl BrowserLauncher for HtmlBrowserLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        Ok(Box::new(HtmlBrowser::new(Arc::clone(&self.source))))
    }
}

pub fn parse_selector(selector: &str) -> Result<Selector, BrowserError> {
    Selector::parse(selector).map_err(|_| BrowserError::InvalidSelector(selector.to_string()))
}

fn snapshot(element: ElementRef<'_>) -> Element {
    let value = element.value();
    let attributes: HashMap<String, String> = value
        .attrs()
        .map(|(name, val)| (name.to_string(), val.to_string()))
        .collect();

    let hidden_style = value
        .attr("style")
        .map(|style| style.replace(' ', "").to_ascii_lowercase())
        .is_some_and(|style| style.contains("display:none") || style.contains("visibility:hidden"));

    let displayed =
        value.attr("hidden").is_none() && value.attr("aria-hidden") != Some("true") && !hidden_style;

    Element {
        text: element.text().collect::<String>(),
        enabled: value.attr("disabled").is_none(),
        displayed,
        attributes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OnePage(&'static str);

    #[async_trait]
    impl PageSource for OnePage {
        async fn fetch_page(&self, _url: &str) -> Result<String, BrowserError> {
            Ok(self.0.to_string())
        }
    }

    const PAGE: &str = r#"
        <ul>
          <li class="item"><h3> 善意的競爭 </h3><a href="/drama/1">watch</a></li>
          <li class="item"><h3>淚之女王</h3><a href="https://cdn.example.com/2">watch</a></li>
        </ul>
        <a class="next" href="?page=2" aria-disabled="false">next</a>
        <button class="more" disabled>more</button>
        <span class="ghost" style="display: none">x</span>
    "#;

    async fn browser() -> HtmlBrowser {
        let mut browser = HtmlBrowser::new(Arc::new(OnePage(PAGE)));
        browser.navigate("https://video.example.com/list").await.unwrap();
        browser
    }

    #[tokio::test]
    async fn finds_elements_in_document_order() {
        let mut browser = browser().await;
        let titles = browser.find_elements(".item h3").await.unwrap();
        let texts: Vec<_> = titles.iter().map(|e| e.text.trim().to_string()).collect();
        assert_eq!(texts, vec!["善意的競爭", "淚之女王"]);

        let links = browser.find_elements(".item a").await.unwrap();
        assert_eq!(links[0].attribute("href"), Some("/drama/1"));
    }

    #[tokio::test]
    async fn reports_visibility_and_enabled_state() {
        let mut browser = browser().await;
        let more = browser.find_elements(".more").await.unwrap();
        assert!(!more[0].enabled);

        let ghost = browser.find_elements(".ghost").await.unwrap();
        assert!(!ghost[0].displayed);
    }

    #[tokio::test]
    async fn wait_for_missing_selector_times_out() {
        let mut browser = browser().await;
        let err = browser
            .wait_for(".missing", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, BrowserError::Timeout { .. }));
    }

    #[tokio::test]
    async fn click_follows_relative_link() {
        let mut browser = browser().await;
        browser.click(".next", 0).await.unwrap();
        assert_eq!(
            browser.current_url().unwrap().as_str(),
            "https://video.example.com/list?page=2"
        );
    }

    #[tokio::test]
    async fn click_without_link_is_an_interaction_error() {
        let mut browser = browser().await;
        let err = browser.click(".more", 0).await.unwrap_err();
        assert!(matches!(err, BrowserError::Interaction(_)));
    }

    #[tokio::test]
    async fn invalid_selector_is_reported() {
        let mut browser = browser().await;
        let err = browser.find_elements("li[").await.unwrap_err();
        assert!(matches!(err, BrowserError::InvalidSelector(_)));
    }
}
