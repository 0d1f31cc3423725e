pub mod fetcher {
    use std::time::Duration;

    pub const LIMIT_FOR_PERIOD: u32 = 5;

    pub const LIMIT_REFRESH_PERIOD: Duration = Duration::from_secs(1);

    pub const LIMIT_BURST: u32 = 1;

    pub const RATE_LIMIT_TIMEOUT: Duration = Duration::from_secs(2);

    pub const MAX_ATTEMPTS: u32 = 3;

    pub const BACKOFF_BASE: Duration = Duration::from_millis(500);

    pub const BACKOFF_MULTIPLIER: f64 = 2.0;

    pub const BACKOFF_MAX: Duration = Duration::from_secs(3);
}

pub mod scraper {
    use std::time::Duration;

    pub const PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

    pub const WEBDRIVER_URL: &str = "http://localhost:9515";

    pub const PAGE_DELAY: Duration = Duration::from_secs(5);

    pub const MAX_PAGES: u32 = 200;

    pub const MAX_STALE_RETRIES: u32 = 5;
}

pub mod cache {
    use std::time::Duration;

    pub const PLATFORM_DELAY: Duration = Duration::from_secs(3);

    pub const DEFAULT_DIRECTORY: &str = "cache";
}

pub mod catalog {
    /// TMDB's `status_code` for "The resource you requested could not be found."
    pub const NOT_FOUND_STATUS_CODE: i64 = 34;

    pub const LEAD_CAST_LIMIT: usize = 10;

    pub const DIRECTOR_JOBS: &[&str] = &["Director", "Co-Director"];

    pub const WRITER_JOBS: &[&str] = &["Writer"];

    /// Fixed home pages for providers reported by the catalog's watch data.
    pub const INTERNATIONAL_PLATFORMS: &[(&str, &str)] = &[
        ("Netflix", "https://www.netflix.com"),
        ("Disney Plus", "https://www.disneyplus.com"),
        ("Amazon Prime Video", "https://www.primevideo.com"),
        ("Apple TV", "https://tv.apple.com"),
        ("Catchplay", "https://www.catchplay.com"),
        ("HBO Max", "https://www.hbomax.com/tw"),
    ];
}
