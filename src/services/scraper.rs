//! Paginated listing scraper.
//!
//! One generic state machine interprets a [`PlatformConfig`]:
//!
//! ```text
//! INIT -> LOAD_PAGE -> EXTRACT -> FIND_NEXT -+-> CLICK_NEXT -> LOAD_PAGE
//!                                            +-> DONE
//! any state -> FAILED
//! ```
//!
//! Titles are deduplicated first-seen-wins within a session. A missing or
//! non-interactive "next" control ends the scrape successfully.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clients::browser::{BrowserError, BrowserLauncher, BrowserSession, Element};
use crate::config::ScraperConfig;
use crate::domain::PlatformId;
use crate::models::PlatformConfig;

#[derive(Debug, Clone, Error)]
pub enum ScrapeError {
    #[error("Page load timed out: {0}")]
    Timeout(String),

    #[error("Page interaction failed: {0}")]
    Interaction(String),

    #[error("Browser failure: {0}")]
    Browser(String),

    #[error("Invalid platform configuration: {0}")]
    Config(String),

    #[error("Platform requires signing in, which is not supported")]
    LoginRequired,
}

impl From<BrowserError> for ScrapeError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::Timeout { .. } => Self::Timeout(err.to_string()),
            BrowserError::StaleElement(_) | BrowserError::Interaction(_) => {
                Self::Interaction(err.to_string())
            }
            BrowserError::InvalidSelector(_) => Self::Config(err.to_string()),
            BrowserError::Navigation { .. } | BrowserError::Launch(_) => {
                Self::Browser(err.to_string())
            }
        }
    }
}

/// A scrape that ended in FAILED, with whatever it collected before failing.
#[derive(Debug, Clone, Error)]
#[error("Scrape of {platform} failed after {pages_completed} page(s): {error}")]
pub struct ScrapeFailure {
    pub platform: PlatformId,
    pub error: ScrapeError,
    pub pages_completed: u32,
    pub partial: BTreeMap<String, String>,
}

/// Result of a scrape that reached DONE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Harvest {
    pub platform: PlatformId,
    pub entries: BTreeMap<String, String>,
    pub pages: u32,
}

/// Per-scrape state: what was collected and which titles were already seen.
#[derive(Debug, Default)]
pub struct ScrapeSession {
    seen: HashSet<String>,
    entries: BTreeMap<String, String>,
    pages: u32,
}

impl ScrapeSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a pair unless the title was already seen in this session.
    /// Returns whether the pair was kept.
    pub fn record(&mut self, title: &str, url: String) -> bool {
        if !self.seen.insert(title.to_string()) {
            return false;
        }
        self.entries.insert(title.to_string(), url);
        true
    }

    #[must_use]
    pub const fn pages(&self) -> u32 {
        self.pages
    }

    #[must_use]
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    #[must_use]
    pub fn into_entries(self) -> BTreeMap<String, String> {
        self.entries
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScrapeState {
    Init,
    LoadPage,
    Extract,
    FindNext,
    ClickNext,
    Done,
}

/// Timing and safety bounds of the scraper.
#[derive(Debug, Clone)]
pub struct ScraperSettings {
    pub page_load_timeout: Duration,
    pub page_delay: Duration,
    pub max_pages: u32,
    pub max_stale_retries: u32,
}

impl From<&ScraperConfig> for ScraperSettings {
    fn from(config: &ScraperConfig) -> Self {
        Self {
            page_load_timeout: Duration::from_secs(config.page_load_timeout_seconds),
            page_delay: Duration::from_millis(config.page_delay_ms),
            max_pages: config.max_pages.max(1),
            max_stale_retries: config.max_stale_retries,
        }
    }
}

#[derive(Clone)]
pub struct PaginatedScraper {
    launcher: Arc<dyn BrowserLauncher>,
    settings: ScraperSettings,
}

impl PaginatedScraper {
    #[must_use]
    pub fn new(launcher: Arc<dyn BrowserLauncher>, settings: ScraperSettings) -> Self {
        Self { launcher, settings }
    }

    #[must_use]
    pub const fn settings(&self) -> &ScraperSettings {
        &self.settings
    }

    /// Scrapes one platform listing into a title to watch-URL map.
    ///
    /// The browser session is opened for this scrape only and always closed.
    pub async fn scrape_platform(&self, config: &PlatformConfig) -> Result<Harvest, ScrapeFailure> {
        let start = Instant::now();
        let mut session = ScrapeSession::new();

        if config.requires_login {
            return Err(failure(config, ScrapeError::LoginRequired, session));
        }

        let mut browser = match self.launcher.launch().await {
            Ok(browser) => browser,
            Err(e) => return Err(failure(config, e.into(), session)),
        };

        let result = self.drive(browser.as_mut(), config, &mut session).await;
        browser.close().await;

        metrics::counter!("dramawatch_scrape_pages_total").increment(u64::from(session.pages));

        match result {
            Ok(()) => {
                info!(
                    platform = %config.id,
                    pages = session.pages,
                    works = session.entries.len(),
                    duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "Scrape finished"
                );
                let pages = session.pages;
                Ok(Harvest {
                    platform: config.id.clone(),
                    entries: session.into_entries(),
                    pages,
                })
            }
            Err(e) => {
                warn!(
                    platform = %config.id,
                    pages = session.pages,
                    works = session.entries.len(),
                    error = %e,
                    "Scrape failed"
                );
                Err(failure(config, e, session))
            }
        }
    }

    async fn drive(
        &self,
        browser: &mut dyn BrowserSession,
        config: &PlatformConfig,
        session: &mut ScrapeSession,
    ) -> Result<(), ScrapeError> {
        let mut state = ScrapeState::Init;
        let mut stale_retries = 0;

        loop {
            state = match state {
                ScrapeState::Init => {
                    browser.navigate(&config.listing_url).await?;
                    ScrapeState::LoadPage
                }
                ScrapeState::LoadPage => {
                    browser
                        .wait_for(&config.title_selector, self.settings.page_load_timeout)
                        .await?;
                    ScrapeState::Extract
                }
                ScrapeState::Extract => {
                    extract_page(browser, config, session).await?;
                    session.pages += 1;

                    if session.pages >= self.settings.max_pages {
                        warn!(
                            platform = %config.id,
                            max_pages = self.settings.max_pages,
                            "Page cap reached, ending scrape"
                        );
                        ScrapeState::Done
                    } else {
                        ScrapeState::FindNext
                    }
                }
                ScrapeState::FindNext => {
                    let controls = browser.find_elements(&config.next_page_selector).await?;
                    match controls.first() {
                        None => {
                            debug!(platform = %config.id, "No next page control");
                            ScrapeState::Done
                        }
                        Some(control) if !is_interactive(control) => {
                            debug!(platform = %config.id, "Next page control is not clickable");
                            ScrapeState::Done
                        }
                        Some(_) => {
                            // Courtesy pause before each new page, not on re-locates.
                            if stale_retries == 0 {
                                tokio::time::sleep(self.settings.page_delay).await;
                            }
                            ScrapeState::ClickNext
                        }
                    }
                }
                ScrapeState::ClickNext => {
                    match browser.click(&config.next_page_selector, 0).await {
                        Ok(()) => {
                            stale_retries = 0;
                            ScrapeState::LoadPage
                        }
                        Err(BrowserError::StaleElement(_))
                            if stale_retries < self.settings.max_stale_retries =>
                        {
                            stale_retries += 1;
                            debug!(platform = %config.id, attempt = stale_retries, "Stale next control, locating it again");
                            ScrapeState::FindNext
                        }
                        Err(e) => {
                            return Err(ScrapeError::Interaction(format!(
                                "clicking next page failed: {e}"
                            )));
                        }
                    }
                }
                ScrapeState::Done => return Ok(()),
            };
        }
    }
}

/// Reads every (title, link) pair on the current page into the session.
async fn extract_page(
    browser: &mut dyn BrowserSession,
    config: &PlatformConfig,
    session: &mut ScrapeSession,
) -> Result<(), ScrapeError> {
    let titles = browser.find_elements(&config.title_selector).await?;
    let links = if config.link_selector == config.title_selector {
        titles.clone()
    } else {
        browser.find_elements(&config.link_selector).await?
    };

    for (index, element) in titles.iter().enumerate() {
        let title = element.text.trim();
        if title.is_empty() {
            continue;
        }

        let Some(link) = links
            .get(index)
            .and_then(|l| l.attribute(&config.link_attribute))
        else {
            debug!(platform = %config.id, title, "No link for title, skipping");
            continue;
        };

        let url = config.resolve_watch_url(link);
        if session.record(title, url) {
            debug!(platform = %config.id, title, link, "Fetched work");
        }
    }

    Ok(())
}

/// A control is clickable unless explicitly disabled, hidden or not enabled.
fn is_interactive(control: &Element) -> bool {
    let aria_disabled = control
        .attribute("aria-disabled")
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));

    !aria_disabled && control.attribute("disabled").is_none() && control.displayed && control.enabled
}

fn failure(config: &PlatformConfig, error: ScrapeError, session: ScrapeSession) -> ScrapeFailure {
    let pages_completed = session.pages;
    ScrapeFailure {
        platform: config.id.clone(),
        error,
        pages_completed,
        partial: session.into_entries(),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted browser for exercising the state machine without a real page.

    use super::*;
    use crate::domain::WorkType;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    pub const TITLE: &str = ".t";
    pub const LINK: &str = ".l";
    pub const NEXT: &str = ".n";

    #[derive(Debug, Clone)]
    pub enum Next {
        Absent,
        AriaDisabled,
        Hidden,
        Clickable,
    }

    #[derive(Debug, Clone)]
    pub enum Click {
        Ok,
        StaleThenOk(u32),
        AlwaysStale,
        Fail,
    }

    #[derive(Debug, Clone)]
    pub struct Page {
        pub items: Vec<(&'static str, &'static str)>,
        pub next: Next,
        pub click: Click,
        pub loads: bool,
    }

    impl Page {
        pub fn new(items: Vec<(&'static str, &'static str)>, next: Next) -> Self {
            Self {
                items,
                next,
                click: Click::Ok,
                loads: true,
            }
        }
    }

    pub fn platform() -> PlatformConfig {
        PlatformConfig {
            id: PlatformId::new("TestTV", WorkType::Drama),
            listing_url: "https://test.example.com/list".to_string(),
            title_selector: TITLE.to_string(),
            link_selector: LINK.to_string(),
            link_attribute: "href".to_string(),
            url_prefix: "https://test.example.com".to_string(),
            next_page_selector: NEXT.to_string(),
            requires_login: false,
        }
    }

    pub fn settings() -> ScraperSettings {
        ScraperSettings {
            page_load_timeout: Duration::from_secs(10),
            page_delay: Duration::ZERO,
            max_pages: 50,
            max_stale_retries: 3,
        }
    }

    #[derive(Default)]
    pub struct Counters {
        pub launched: u32,
        pub closed: u32,
        pub clicks: u32,
    }

    pub struct FakeBrowser {
        pages: Arc<Vec<Page>>,
        counters: Arc<Mutex<Counters>>,
        current: Option<usize>,
        stale_left: HashMap<usize, u32>,
    }

    #[async_trait]
    impl BrowserSession for FakeBrowser {
        async fn navigate(&mut self, _url: &str) -> Result<(), BrowserError> {
            self.current = Some(0);
            Ok(())
        }

        async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
            let page = self.page()?;
            if page.loads && !page.items.is_empty() {
                Ok(())
            } else {
                Err(BrowserError::Timeout {
                    selector: selector.to_string(),
                    timeout,
                })
            }
        }

        async fn find_elements(&mut self, selector: &str) -> Result<Vec<Element>, BrowserError> {
            let page = self.page()?.clone();
            let elements = match selector {
                TITLE => page
                    .items
                    .iter()
                    .map(|(title, _)| Element {
                        text: (*title).to_string(),
                        displayed: true,
                        enabled: true,
                        ..Element::default()
                    })
                    .collect(),
                LINK => page
                    .items
                    .iter()
                    .map(|(_, href)| Element {
                        attributes: HashMap::from([("href".to_string(), (*href).to_string())]),
                        displayed: true,
                        enabled: true,
                        ..Element::default()
                    })
                    .collect(),
                NEXT => match page.next {
                    Next::Absent => vec![],
                    Next::AriaDisabled => vec![Element {
                        attributes: HashMap::from([(
                            "aria-disabled".to_string(),
                            "true".to_string(),
                        )]),
                        displayed: true,
                        enabled: true,
                        ..Element::default()
                    }],
                    Next::Hidden => vec![Element {
                        displayed: false,
                        enabled: true,
                        ..Element::default()
                    }],
                    Next::Clickable => vec![Element {
                        displayed: true,
                        enabled: true,
                        ..Element::default()
                    }],
                },
                other => return Err(BrowserError::InvalidSelector(other.to_string())),
            };
            Ok(elements)
        }

        async fn click(&mut self, selector: &str, _index: usize) -> Result<(), BrowserError> {
            self.counters.lock().unwrap().clicks += 1;
            let index = self.current.unwrap_or(0);
            let page = self.page()?.clone();

            match page.click {
                Click::Ok => {}
                Click::StaleThenOk(times) => {
                    let left = self.stale_left.entry(index).or_insert(times);
                    if *left > 0 {
                        *left -= 1;
                        return Err(BrowserError::StaleElement(selector.to_string()));
                    }
                }
                Click::AlwaysStale => return Err(BrowserError::StaleElement(selector.to_string())),
                Click::Fail => return Err(BrowserError::Interaction("intercepted".to_string())),
            }

            if index + 1 >= self.pages.len() {
                return Err(BrowserError::Interaction("no page behind the control".to_string()));
            }
            self.current = Some(index + 1);
            Ok(())
        }

        async fn close(&mut self) {
            self.counters.lock().unwrap().closed += 1;
        }
    }

    impl FakeBrowser {
        fn page(&self) -> Result<&Page, BrowserError> {
            self.current
                .and_then(|i| self.pages.get(i))
                .ok_or_else(|| BrowserError::Interaction("no page loaded".to_string()))
        }
    }

    #[derive(Clone, Default)]
    pub struct FakeLauncher {
        pub pages: Arc<Vec<Page>>,
        pub counters: Arc<Mutex<Counters>>,
    }

    impl FakeLauncher {
        pub fn new(pages: Vec<Page>) -> Self {
            Self {
                pages: Arc::new(pages),
                counters: Arc::new(Mutex::new(Counters::default())),
            }
        }
    }

    #[async_trait]
    impl BrowserLauncher for FakeLauncher {
        async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
            self.counters.lock().unwrap().launched += 1;
            Ok(Box::new(FakeBrowser {
                pages: Arc::clone(&self.pages),
                counters: Arc::clone(&self.counters),
                current: None,
                stale_left: HashMap::new(),
            }))
        }
    }
}
