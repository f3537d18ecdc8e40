//! TLE parsing utilities

use crate::tle::types::TleData;
use chrono::{DateTime, Utc};

/// Parse TLE epoch from line 1 to UTC DateTime
pub fn parse_tle_epoch_to_utc(line1: &str) -> Option<DateTime<Utc>> {
    // TLE line1 epoch fields (columns 19–32, 1-based; 18..32 0-based)
    let s = line1.get(18..32)?;
    let mut parts = s.trim().split('.');
    let yyddd = parts.next()?;
    let frac = parts.next().unwrap_or("0");
    if yyddd.len() < 3 {
        return None;
    }
    let (yy_str, ddd_str) = yyddd.split_at(2);
    let yy: i32 = yy_str.parse().ok()?;
    let ddd: i32 = ddd_str.parse().ok()?;
    let year = if yy >= 57 { 1900 + yy } else { 2000 + yy };
    let jan1 = chrono::NaiveDate::from_ymd_opt(year, 1, 1)?;
    let date = jan1.checked_add_signed(chrono::Duration::days((ddd - 1) as i64))?;
    let frac_sec: f64 = format!("0.{}", frac).parse::<f64>().ok()? * 86400.0;
    let secs = frac_sec.trunc() as i64;
    let nanos = ((frac_sec - (secs as f64)) * 1e9).round() as i64;
    let ndt = date.and_hms_opt(0, 0, 0)?
        + chrono::Duration::seconds(secs)
        + chrono::Duration::nanoseconds(nanos);
    Some(DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
}

/// Catalogue number from columns 3-7 of either TLE line
pub fn catalog_number(line: &str) -> Option<u32> {
    line.get(2..7)?.trim().parse().ok()
}

fn clean_lines(body: &str) -> Vec<&str> {
    body.lines()
        // trim BOM/CRLF/space
        .map(|raw| raw.trim_matches(|c| c == '\u{feff}' || c == '\r' || c == '\n' || c == ' '))
        .filter(|line| !line.is_empty())
        .collect()
}

fn is_tle_line(line: &str, first: char) -> bool {
    line.starts_with(first) && line.len() >= 69
}

/// Parse every element set in a 2-line or 3-line TLE text
///
/// A name line is recognised as any non-TLE line immediately preceding line 1.
/// Element sets whose epoch cannot be parsed are skipped.
pub fn parse_tle_file(body: &str) -> Vec<TleData> {
    let lines = clean_lines(body);
    let mut out = Vec::new();
    let mut i = 0usize;
    while i + 1 < lines.len() {
        let (l1, l2) = (lines[i], lines[i + 1]);
        if is_tle_line(l1, '1') && is_tle_line(l2, '2') && catalog_number(l1) == catalog_number(l2)
        {
            let name = if i > 0 && !is_tle_line(lines[i - 1], '1') && !is_tle_line(lines[i - 1], '2')
            {
                Some(lines[i - 1].to_string())
            } else {
                None
            };
            if let Some(epoch_utc) = parse_tle_epoch_to_utc(l1) {
                out.push(TleData {
                    name,
                    line1: l1.to_string(),
                    line2: l2.to_string(),
                    epoch_utc,
                });
            }
            i += 2;
        } else {
            i += 1;
        }
    }
    out
}

/// Scan an arbitrary response body for the element set of one satellite
pub fn extract_tle_block(body: &str, requested_sat: u32) -> anyhow::Result<TleData> {
    if let Some(tle) = parse_tle_file(body)
        .into_iter()
        .find(|tle| catalog_number(&tle.line1) == Some(requested_sat))
    {
        return Ok(tle);
    }
    let sample: String = body.lines().take(6).collect::<Vec<_>>().join("\\n");
    anyhow::bail!("No valid TLE pair found for {}. Sample: {}", requested_sat, sample);
}
