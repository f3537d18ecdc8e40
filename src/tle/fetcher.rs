//! Element set fetching from Celestrak
//!
//! A worker thread owns a tokio runtime and a `reqwest::Client` and answers
//! [`FetchCommand`]s over channels. [`fetch_blocking`] drives the worker from
//! synchronous code and keeps the disk cache in step.

use crate::tle::cache::{CachedTle, TleCache};
use crate::tle::parser::{catalog_number, extract_tle_block, parse_tle_file};
use crate::tle::types::{FetchChannels, FetchCommand, FetchResultMsg, TleData};
use anyhow::Context;
use std::collections::BTreeSet;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const GP_URL: &str = "https://celestrak.org/NORAD/elements/gp.php";

/// Start the background TLE worker thread
pub fn start_tle_worker() -> FetchChannels {
    let (cmd_tx, cmd_rx) = mpsc::channel::<FetchCommand>();
    let (res_tx, res_rx) = mpsc::channel::<FetchResultMsg>();

    thread::spawn(move || {
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                error!("TLE worker could not start a runtime: {}", e);
                return;
            }
        };
        rt.block_on(async move {
            let client = reqwest::Client::new();

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    FetchCommand::Fetch(norad) => {
                        let msg = match fetch_one(&client, norad).await {
                            Ok(tle) => {
                                info!("norad={} fetched, epoch={}", norad, tle.epoch_utc.to_rfc3339());
                                FetchResultMsg::Success { norad, tle }
                            }
                            Err(e) => {
                                warn!("norad={} fetch failed: {:#}", norad, e);
                                FetchResultMsg::Failure {
                                    norad,
                                    error: e.to_string(),
                                }
                            }
                        };
                        let _ = res_tx.send(msg);
                    }
                    FetchCommand::FetchGroup { group } => {
                        match fetch_group(&client, &group, &res_tx).await {
                            Ok(count) => {
                                info!("group={} fetched {} element sets", group, count);
                                let _ = res_tx.send(FetchResultMsg::GroupDone { group, count });
                            }
                            Err(e) => {
                                warn!("group={} fetch failed: {:#}", group, e);
                                let _ = res_tx.send(FetchResultMsg::GroupFailure {
                                    group,
                                    error: e.to_string(),
                                });
                            }
                        }
                    }
                }
            }
        });
    });

    FetchChannels { cmd_tx, res_rx }
}

async fn fetch_text(client: &reqwest::Client, url: &str) -> anyhow::Result<(reqwest::StatusCode, String)> {
    let resp = client
        .get(url)
        .header("accept", "text/plain")
        .send()
        .await
        .with_context(|| format!("GET {}", url))?;
    let status = resp.status();
    let body = resp.text().await?;
    debug!("status={} url={} bytes={}", status, url, body.len());
    Ok((status, body))
}

async fn fetch_one(client: &reqwest::Client, norad: u32) -> anyhow::Result<TleData> {
    let url = format!("{}?CATNR={}&FORMAT=TLE", GP_URL, norad);
    let (status, body) = fetch_text(client, &url).await?;
    // parse before the status check so HTML error bodies end up in the message
    let tle = extract_tle_block(&body, norad)?;
    if !status.is_success() {
        anyhow::bail!("HTTP {} after parse", status);
    }
    Ok(tle)
}

async fn fetch_group(
    client: &reqwest::Client,
    group: &str,
    res_tx: &Sender<FetchResultMsg>,
) -> anyhow::Result<usize> {
    let url = format!("{}?GROUP={}&FORMAT=TLE", GP_URL, group);
    let (status, body) = fetch_text(client, &url).await?;
    if !status.is_success() {
        anyhow::bail!("HTTP {} for group fetch", status);
    }

    let mut count = 0;
    for tle in parse_tle_file(&body) {
        let Some(norad) = catalog_number(&tle.line1) else {
            continue;
        };
        debug!("group={} norad={} name={:?}", group, norad, tle.name);
        let _ = res_tx.send(FetchResultMsg::Success { norad, tle });
        count += 1;
    }
    Ok(count)
}

/// Load element sets for `norads` and `groups`, preferring valid cache entries.
///
/// Network results are written back to the cache. Requests still
/// outstanding when `timeout` expires are reported and skipped.
pub fn fetch_blocking(
    norads: &[u32],
    groups: &[String],
    cache: Option<&TleCache>,
    timeout: Duration,
) -> anyhow::Result<Vec<TleData>> {
    let mut out = Vec::new();
    let mut pending_sats = BTreeSet::new();

    for &norad in norads {
        let cached = match cache.map(|c| c.read(norad)).transpose() {
            Ok(entry) => entry.flatten(),
            Err(e) => {
                warn!("norad={} cache entry unreadable: {:#}", norad, e);
                None
            }
        };
        match (cached, cache) {
            (Some(entry), Some(c)) if c.is_valid(&entry) => {
                debug!("norad={} served from cache", norad);
                out.push(entry.to_tle());
            }
            _ => {
                pending_sats.insert(norad);
            }
        }
    }

    if pending_sats.is_empty() && groups.is_empty() {
        return Ok(out);
    }

    let channels = start_tle_worker();
    for &norad in &pending_sats {
        channels.cmd_tx.send(FetchCommand::Fetch(norad))?;
    }
    for group in groups {
        channels.cmd_tx.send(FetchCommand::FetchGroup {
            group: group.clone(),
        })?;
    }

    let mut pending_groups = groups.len();
    let deadline = Instant::now() + timeout;
    while !pending_sats.is_empty() || pending_groups > 0 {
        let left = deadline.saturating_duration_since(Instant::now());
        let msg = match channels.res_rx.recv_timeout(left) {
            Ok(msg) => msg,
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "TLE fetch timed out with {} satellites and {} groups outstanding",
                    pending_sats.len(),
                    pending_groups
                );
                break;
            }
            Err(RecvTimeoutError::Disconnected) => anyhow::bail!("TLE worker stopped"),
        };

        match msg {
            FetchResultMsg::Success { norad, tle } => {
                pending_sats.remove(&norad);
                if let Some(c) = cache {
                    if let Err(e) = c.write(&CachedTle::from_tle(norad, &tle)) {
                        warn!("norad={} cache write failed: {:#}", norad, e);
                    }
                }
                out.push(tle);
            }
            FetchResultMsg::Failure { norad, error } => {
                pending_sats.remove(&norad);
                error!("norad={} not loaded: {}", norad, error);
            }
            FetchResultMsg::GroupDone { group, count } => {
                pending_groups = pending_groups.saturating_sub(1);
                debug!("group={} done ({} sets)", group, count);
            }
            FetchResultMsg::GroupFailure { group, error } => {
                pending_groups = pending_groups.saturating_sub(1);
                error!("group={} not loaded: {}", group, error);
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tle::cache::tests::unique_temp_dir;
    use crate::tle::parser::tests::ISS_TLE;

    #[test]
    fn test_fetch_blocking_serves_valid_cache_without_network() {
        let cache = TleCache::new_in_dir(unique_temp_dir("fetch"), 100_000).expect("cache dir");
        let tle = parse_tle_file(ISS_TLE).remove(0);
        cache
            .write(&CachedTle::from_tle(25544, &tle))
            .expect("write");

        let loaded = fetch_blocking(&[25544], &[], Some(&cache), Duration::from_millis(10))
            .expect("served from cache");
        assert_eq!(loaded, vec![tle]);
    }

    #[test]
    fn test_fetch_blocking_nothing_requested() {
        let loaded = fetch_blocking(&[], &[], None, Duration::from_millis(10)).expect("empty");
        assert!(loaded.is_empty());
    }
}
