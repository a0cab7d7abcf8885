//! roadcap - roadshow listing crawler and media capture tool.
//!
//! Searches a roadshow listing site for a keyword, collects the matching
//! records across pages, captures the stream URLs of individual media pages,
//! and downloads them with yt-dlp.

pub mod browser;
pub mod capture;
pub mod config;
pub mod crawl;
pub mod download;
pub mod export;
pub mod extract;
pub mod models;
pub mod report;
pub mod selectors;
pub mod utils;
