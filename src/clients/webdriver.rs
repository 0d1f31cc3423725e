//! [`BrowserSession`] over a WebDriver endpoint (chromedriver by default).
//!
//! Listings that render client-side or paginate through "load more" buttons
//! only work in a real browser. Element state is read in one script call per
//! query so a page re-render between reads cannot mix two documents.

use async_trait::async_trait;
use fantoccini::error::{CmdError, ErrorStatus};
use fantoccini::{Client, ClientBuilder, Locator};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::clients::browser::{
    BrowserError, BrowserLauncher, BrowserSession, Element, parse_selector,
};
use crate::config::ScraperConfig;

const SNAPSHOT_SCRIPT: &str = r"
return Array.from(document.querySelectorAll(arguments[0])).map((e) => ({
  text: e.innerText ?? e.textContent ?? '',
  attributes: Object.fromEntries(Array.from(e.attributes).map((a) => [a.name, a.value])),
  displayed: !!(e.offsetWidth || e.offsetHeight || e.getClientRects().length),
  enabled: !e.disabled,
}));
";

#[derive(Debug, Deserialize)]
struct ElementState {
    #[serde(default)]
    text: String,
    #[serde(default)]
    attributes: HashMap<String, String>,
    #[serde(default)]
    displayed: bool,
    #[serde(default)]
    enabled: bool,
}

impl From<ElementState> for Element {
    fn from(state: ElementState) -> Self {
        Self {
            text: state.text,
            attributes: state.attributes,
            displayed: state.displayed,
            enabled: state.enabled,
        }
    }
}

pub struct WebDriverSession {
    client: Option<Client>,
}

impl WebDriverSession {
    fn client(&self) -> Result<&Client, BrowserError> {
        self.client
            .as_ref()
            .ok_or_else(|| BrowserError::Interaction("browser session already closed".to_string()))
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        debug!(url, "Loading page");
        self.client()?
            .goto(url)
            .await
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        parse_selector(selector)?;
        self.client()?
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(selector))
            .await
            .map(|_| ())
            .map_err(|e| match e {
                CmdError::WaitTimeout => BrowserError::Timeout {
                    selector: selector.to_string(),
                    timeout,
                },
                other => command_error(selector, other),
            })
    }

    async fn find_elements(&mut self, selector: &str) -> Result<Vec<Element>, BrowserError> {
        parse_selector(selector)?;
        let value = self
            .client()?
            .execute(SNAPSHOT_SCRIPT, vec![json!(selector)])
            .await
            .map_err(|e| command_error(selector, e))?;

        element_states(value)
    }

    async fn click(&mut self, selector: &str, index: usize) -> Result<(), BrowserError> {
        parse_selector(selector)?;
        let client = self.client()?;
        let mut elements = client
            .find_all(Locator::Css(selector))
            .await
            .map_err(|e| command_error(selector, e))?;

        if index >= elements.len() {
            return Err(BrowserError::StaleElement(selector.to_string()));
        }

        elements
            .swap_remove(index)
            .click()
            .await
            .map_err(|e| command_error(selector, e))
    }

    async fn close(&mut self) {
        if let Some(client) = self.client.take()
            && let Err(e) = client.close().await
        {
            warn!(error = %e, "Failed to close browser session");
        }
    }
}

fn element_states(value: Value) -> Result<Vec<Element>, BrowserError> {
    let states: Vec<ElementState> = serde_json::from_value(value)
        .map_err(|e| BrowserError::Interaction(format!("unreadable element state: {e}")))?;
    Ok(states.into_iter().map(Element::from).collect())
}

/// Maps a WebDriver failure onto the scraper's error vocabulary.
fn command_error(selector: &str, err: CmdError) -> BrowserError {
    match err {
        CmdError::Standard(ref e)
            if matches!(
                e.error,
                ErrorStatus::StaleElementReference | ErrorStatus::NoSuchElement
            ) =>
        {
            BrowserError::StaleElement(selector.to_string())
        }
        CmdError::Standard(ref e) if matches!(e.error, ErrorStatus::InvalidSelector) => {
            BrowserError::InvalidSelector(selector.to_string())
        }
        other => BrowserError::Interaction(format!("'{selector}': {other}")),
    }
}

/// Connects a fresh WebDriver session per scrape.
#[derive(Debug, Clone)]
pub struct WebDriverLauncher {
    webdriver_url: String,
    capabilities: Map<String, Value>,
}

impl WebDriverLauncher {
    #[must_use]
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            capabilities: chrome_capabilities(config),
        }
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let mut builder = ClientBuilder::native();
        builder.capabilities(self.capabilities.clone());

        let client = builder
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| BrowserError::Launch(format!("{}: {e}", self.webdriver_url)))?;

        Ok(Box::new(WebDriverSession {
            client: Some(client),
        }))
    }
}

fn chrome_capabilities(config: &ScraperConfig) -> Map<String, Value> {
    let mut args = vec![
        format!("--user-agent={}", config.user_agent),
        "--disable-dev-shm-usage".to_string(),
        "--no-sandbox".to_string(),
    ];
    if config.headless {
        args.push("--headless=new".to_string());
        args.push("--disable-gpu".to_string());
    }

    let mut capabilities = Map::new();
    capabilities.insert("browserName".to_string(), json!("chrome"));
    capabilities.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
    capabilities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_chrome_carries_the_user_agent() {
        let config = ScraperConfig::default();
        let capabilities = chrome_capabilities(&config);
        let args: Vec<&str> = capabilities["goog:chromeOptions"]["args"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();

        assert!(args.contains(&"--headless=new"));
        assert!(args.iter().any(|a| a.starts_with("--user-agent=Mozilla/5.0")));
    }

    #[test]
    fn headed_chrome_has_no_headless_flag() {
        let config = ScraperConfig {
            headless: false,
            ..ScraperConfig::default()
        };
        let capabilities = chrome_capabilities(&config);
        let args = capabilities["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(!args.iter().any(|a| a.as_str() == Some("--headless=new")));
    }

    #[test]
    fn stale_references_map_to_stale_element() {
        let stale = CmdError::Standard(fantoccini::error::WebDriver::new(
            ErrorStatus::StaleElementReference,
            "element is not attached to the page document",
        ));
        assert!(matches!(
            command_error("#result_more", stale),
            BrowserError::StaleElement(selector) if selector == "#result_more"
        ));

        let intercepted = CmdError::Standard(fantoccini::error::WebDriver::new(
            ErrorStatus::ElementClickIntercepted,
            "other element would receive the click",
        ));
        assert!(matches!(
            command_error("#result_more", intercepted),
            BrowserError::Interaction(_)
        ));
    }

    #[test]
    fn element_state_reads_script_output() {
        let value = json!([
            {"text": " 淚之女王 ", "attributes": {"href": "/drama/2"}, "displayed": true, "enabled": true},
            {"text": "", "attributes": {"aria-disabled": "true"}, "displayed": false, "enabled": true}
        ]);
        let elements = element_states(value).unwrap();

        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].text.trim(), "淚之女王");
        assert_eq!(elements[0].attribute("href"), Some("/drama/2"));
        assert!(!elements[1].displayed);
    }
}
