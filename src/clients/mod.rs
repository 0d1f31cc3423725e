pub mod browser;
pub mod fetcher;
pub mod tmdb;
pub mod webdriver;
