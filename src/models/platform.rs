use serde::{Deserialize, Serialize};

use crate::domain::{PlatformId, WorkType};

/// Scrape configuration for one platform listing.
///
/// The scraper interprets these rules generically: no platform gets its own
/// code path. Selectors are CSS selectors evaluated against the listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub id: PlatformId,

    /// First listing page; pagination starts here.
    pub listing_url: String,

    /// Elements whose trimmed text is a work title.
    pub title_selector: String,

    /// Elements carrying the watch link, paired with titles by position.
    pub link_selector: String,

    #[serde(default = "default_link_attribute")]
    pub link_attribute: String,

    /// Prepended to links that are not already absolute.
    pub url_prefix: String,

    /// The "next page" control. Its absence ends the scrape.
    pub next_page_selector: String,

    #[serde(default)]
    pub requires_login: bool,
}

fn default_link_attribute() -> String {
    "href".to_string()
}

impl PlatformConfig {
    #[must_use]
    pub const fn work_type(&self) -> WorkType {
        self.id.work_type()
    }

    #[must_use]
    pub fn base_name(&self) -> &str {
        self.id.base_name()
    }

    /// Turns a scraped link into an absolute watch URL.
    #[must_use]
    pub fn resolve_watch_url(&self, link: &str) -> String {
        let link = link.trim();
        if link.starts_with("http://") || link.starts_with("https://") {
            link.to_string()
        } else {
            format!("{}{}", self.url_prefix, link)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PlatformConfig {
        PlatformConfig {
            id: PlatformId::new("friDay影音", WorkType::Drama),
            listing_url: "https://video.friday.tw/drama".to_string(),
            title_selector: ".title".to_string(),
            link_selector: ".title a".to_string(),
            link_attribute: default_link_attribute(),
            url_prefix: "https://video.friday.tw".to_string(),
            next_page_selector: ".next".to_string(),
            requires_login: false,
        }
    }

    #[test]
    fn relative_links_get_prefix() {
        assert_eq!(
            config().resolve_watch_url("/drama/detail/1"),
            "https://video.friday.tw/drama/detail/1"
        );
    }

    #[test]
    fn absolute_links_are_kept() {
        assert_eq!(
            config().resolve_watch_url(" https://cdn.example.com/x "),
            "https://cdn.example.com/x"
        );
    }

    #[test]
    fn link_attribute_defaults_to_href() {
        let toml_str = r#"
            id = "MyVideo-movie"
            listing_url = "https://www.myvideo.net.tw/movie"
            title_selector = "h3 a"
            link_selector = "h3 a"
            url_prefix = "https://www.myvideo.net.tw"
            next_page_selector = ".more"
        "#;
        let parsed: PlatformConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(parsed.link_attribute, "href");
        assert_eq!(parsed.work_type(), WorkType::Movie);
        assert!(!parsed.requires_login);
    }
}
