//! Registry of the streaming-platform listings that get scraped.
//!
//! Selectors may need updating whenever a platform redesigns its pages; they
//! are validated once when the registry is built.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::clients::browser::parse_selector;
use crate::domain::{PlatformId, WorkType};
use crate::models::PlatformConfig;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Platform {platform} has an invalid {field} selector: '{selector}'")]
    InvalidSelector {
        platform: PlatformId,
        field: &'static str,
        selector: String,
    },

    #[error("Platform {platform} has an invalid listing URL: {url}")]
    InvalidUrl { platform: PlatformId, url: String },

    #[error("Platform {0} is configured more than once")]
    Duplicate(PlatformId),
}

#[derive(Debug, Clone)]
pub struct PlatformRegistry {
    platforms: BTreeMap<PlatformId, PlatformConfig>,
}

impl PlatformRegistry {
    pub fn new(configs: impl IntoIterator<Item = PlatformConfig>) -> Result<Self, RegistryError> {
        let mut platforms = BTreeMap::new();

        for config in configs {
            validate(&config)?;
            let id = config.id.clone();
            if platforms.insert(id.clone(), config).is_some() {
                return Err(RegistryError::Duplicate(id));
            }
        }

        Ok(Self { platforms })
    }

    /// Uses the configured platforms, or the built-in table when none are set.
    pub fn from_config(configs: &[PlatformConfig]) -> Result<Self, RegistryError> {
        if configs.is_empty() {
            Self::new(builtin_platforms())
        } else {
            Self::new(configs.iter().cloned())
        }
    }

    #[must_use]
    pub fn get(&self, id: &PlatformId) -> Option<&PlatformConfig> {
        self.platforms.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlatformConfig> {
        self.platforms.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &PlatformId> {
        self.platforms.keys()
    }

    pub fn for_work_type(&self, work_type: WorkType) -> impl Iterator<Item = &PlatformConfig> {
        self.platforms
            .values()
            .filter(move |p| p.work_type() == work_type)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }
}

fn validate(config: &PlatformConfig) -> Result<(), RegistryError> {
    for (field, selector) in [
        ("title", &config.title_selector),
        ("link", &config.link_selector),
        ("next page", &config.next_page_selector),
    ] {
        if parse_selector(selector).is_err() {
            return Err(RegistryError::InvalidSelector {
                platform: config.id.clone(),
                field,
                selector: selector.clone(),
            });
        }
    }

    if url::Url::parse(&config.listing_url).is_err() {
        return Err(RegistryError::InvalidUrl {
            platform: config.id.clone(),
            url: config.listing_url.clone(),
        });
    }

    Ok(())
}

fn platform(
    base_name: &str,
    work_type: WorkType,
    listing_url: &str,
    title_selector: &str,
    link_selector: &str,
    url_prefix: &str,
    next_page_selector: &str,
) -> PlatformConfig {
    PlatformConfig {
        id: PlatformId::new(base_name, work_type),
        listing_url: listing_url.to_string(),
        title_selector: title_selector.to_string(),
        link_selector: link_selector.to_string(),
        link_attribute: "href".to_string(),
        url_prefix: url_prefix.to_string(),
        next_page_selector: next_page_selector.to_string(),
        requires_login: false,
    }
}

/// Korean-content listings on Taiwanese platforms that can be scraped
/// without signing in.
#[must_use]
pub fn builtin_platforms() -> Vec<PlatformConfig> {
    const FRIDAY: &str = "friDay影音";
    const HAMI: &str = "中華電信Hami Video";

    vec![
        platform(
            FRIDAY,
            WorkType::Drama,
            "https://video.friday.tw/drama/filter/all/all/all/korea",
            ".filmcase-name-bottom h4",
            ".filmcase a",
            "https://video.friday.tw",
            ".common-paging > a.active ~ a.arrowBtn",
        ),
        platform(
            FRIDAY,
            WorkType::Movie,
            "https://video.friday.tw/movie/filter/all/all/all/korea",
            ".filmcase-name-bottom h4",
            ".filmcase a",
            "https://video.friday.tw",
            ".common-paging > a.active ~ a.arrowBtn",
        ),
        platform(
            HAMI,
            WorkType::Drama,
            "https://hamivideo.hinet.net/%E5%BD%B1%E5%8A%87%E9%A4%A8%E2%81%BA/%E6%88%B2%E5%8A%87/%E9%9F%93%E5%8A%87.do",
            ".list_item .title h3",
            ".list_item a",
            "https://hamivideo.hinet.net",
            "#result_more",
        ),
        // No country filter exists for this listing, so every movie is
        // collected. Keep its refresh infrequent.
        platform(
            HAMI,
            WorkType::Movie,
            "https://hamivideo.hinet.net/more.do?type=card_vod_horizontal&key=1611&menuId=171&filterType=new&getStr=0&isNew=1&isPopular=1&isScore=1&filter=1&mn=%E5%BD%B1%E5%8A%87%E9%A4%A8%E2%81%BA&submn=%E9%9B%BB%E5%BD%B1&lastmn=%E6%8E%A8%E8%96%A6&title=%E6%9C%AC%E9%80%B1%E4%B8%8A%E6%9E%B6",
            ".list_item .title h3",
            ".list_item a",
            "https://hamivideo.hinet.net",
            "#result_more",
        ),
        platform(
            "MyVideo",
            WorkType::Movie,
            "https://www.myvideo.net.tw/movie/genre/all/all/%E9%9F%93%E5%9C%8B/all/?orderBy=1",
            "#vidioListUl li h3 a",
            "#vidioListUl li h3 a",
            "https://www.myvideo.net.tw",
            ".more",
        ),
        platform(
            "LINE TV",
            WorkType::Drama,
            "https://www.linetv.tw/channel/1/genre/44?genre_token=44&sort=VIEW_COUNT_LAST_7_DAYS&source=CHANNEL_PREDEFINED_FILTER&source_channel_id=1&source_feed_id=13",
            "[class^=ChannelFilterResult__DramaGridItemTitle]",
            "[class^=ChannelFilterResult__DramaGrid] a",
            "https://www.linetv.tw",
            "li.Pagination-next a.Pagination-nextLink",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_is_valid() {
        let registry = PlatformRegistry::from_config(&[]).unwrap();
        assert_eq!(registry.len(), 6);
        assert_eq!(registry.for_work_type(WorkType::Drama).count(), 3);
        assert_eq!(registry.for_work_type(WorkType::Movie).count(), 3);
    }

    #[test]
    fn invalid_selector_is_rejected() {
        let mut config = builtin_platforms().remove(0);
        config.title_selector = "h4[".to_string();
        let err = PlatformRegistry::new(vec![config]).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidSelector { field: "title", .. }));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let config = builtin_platforms().remove(0);
        let err = PlatformRegistry::new(vec![config.clone(), config]).unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate(_)));
    }

    #[test]
    fn configured_platforms_replace_builtins() {
        let only = builtin_platforms().remove(4);
        let registry = PlatformRegistry::from_config(std::slice::from_ref(&only)).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&only.id).is_some());
    }
}
