//! TLE data types and communication structures

use chrono::{DateTime, Utc};
use std::sync::mpsc::{Receiver, Sender};

/// One two-line element set, optionally preceded by a name line
#[derive(Debug, Clone, PartialEq)]
pub struct TleData {
    pub name: Option<String>,
    pub line1: String,
    pub line2: String,
    pub epoch_utc: DateTime<Utc>,
}

/// Commands for the TLE fetcher worker thread
#[derive(Debug)]
pub enum FetchCommand {
    Fetch(u32),
    FetchGroup { group: String },
}

/// Results from the TLE fetcher worker thread
#[derive(Debug)]
pub enum FetchResultMsg {
    Success { norad: u32, tle: TleData },
    Failure { norad: u32, error: String },
    GroupDone { group: String, count: usize },
    GroupFailure { group: String, error: String },
}

/// Channels for communicating with the TLE worker thread
pub struct FetchChannels {
    pub cmd_tx: Sender<FetchCommand>,
    pub res_rx: Receiver<FetchResultMsg>,
}
