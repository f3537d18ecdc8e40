//! TLE (Two-Line Element) data management module
//!
//! Parsing of element set files, a per-satellite disk cache and a background
//! fetcher for Celestrak.

pub mod cache;
pub mod fetcher;
pub mod parser;
pub mod types;

pub use cache::TleCache;
pub use fetcher::{fetch_blocking, start_tle_worker};
pub use parser::{parse_tle_epoch_to_utc, parse_tle_file};
pub use types::{FetchChannels, FetchCommand, FetchResultMsg, TleData};
