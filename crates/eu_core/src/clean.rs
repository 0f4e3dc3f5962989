use std::str::FromStr;

use chrono::{DateTime, Days, FixedOffset, Months, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::types::{Article, ArticleRecord};
use crate::Error;

/// Zone dashboards display timestamps in unless told otherwise.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::London;

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Epoch values at or above this are read as milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Shorter digit runs are compact dates (`2025`, `20250601`), not epochs.
const EPOCH_MIN_DIGITS: usize = 9;

/// Date-times without an offset, and bare dates at midnight.
fn parse_naive(raw: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?.and_hms_opt(0, 0, 0))
}

/// `YYYYMMDD` or a bare year, at midnight.
fn parse_compact_date(digits: &str) -> Option<NaiveDateTime> {
    let date = match digits.len() {
        8 => NaiveDate::parse_from_str(digits, "%Y%m%d").ok()?,
        4 => NaiveDate::from_ymd_opt(digits.parse().ok()?, 1, 1)?,
        _ => return None,
    };
    date.and_hms_opt(0, 0, 0)
}

/// Parses the timestamp shapes seen in search results and cache files.
/// Values without an offset are taken to be UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts);
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(raw) {
        return Some(ts);
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }
    if let Some(naive) = parse_naive(raw) {
        return Some(Utc.from_utc_datetime(&naive).fixed_offset());
    }
    let digits = raw.trim_start_matches('-');
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) && digits.len() < EPOCH_MIN_DIGITS {
        let naive = parse_compact_date(raw)?;
        return Some(Utc.from_utc_datetime(&naive).fixed_offset());
    }
    if let Ok(epoch) = raw.parse::<i64>() {
        let ts = if epoch.abs() >= EPOCH_MILLIS_THRESHOLD {
            DateTime::from_timestamp_millis(epoch)
        } else {
            DateTime::from_timestamp(epoch, 0)
        };
        return ts.map(|ts| ts.fixed_offset());
    }

    None
}

/// Coerces every row's timestamp and drops the rows that fail to parse.
/// Dropped rows are not repaired.
pub fn clean_articles(rows: Vec<ArticleRecord>) -> Vec<Article> {
    let total = rows.len();
    let cleaned: Vec<Article> = rows
        .into_iter()
        .filter_map(|row| {
            let ts = parse_timestamp(&row.timestamp)?;
            Some(Article::from_record(row, ts))
        })
        .collect();

    let dropped = total - cleaned.len();
    if dropped > 0 {
        tracing::debug!(dropped, kept = cleaned.len(), "dropped rows with unparseable timestamps");
    }
    cleaned
}

/// Lower bound for [`filter_articles_by_time`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cutoff {
    Aware(DateTime<FixedOffset>),
    /// Interpreted in the filter's timezone
    Naive(NaiveDateTime),
}

impl<Z: TimeZone> From<DateTime<Z>> for Cutoff {
    fn from(ts: DateTime<Z>) -> Self {
        Cutoff::Aware(ts.fixed_offset())
    }
}

impl From<NaiveDateTime> for Cutoff {
    fn from(ts: NaiveDateTime) -> Self {
        Cutoff::Naive(ts)
    }
}

impl FromStr for Cutoff {
    type Err = Error;

    /// Values without an offset stay naive so the filter can localize them.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(naive) = parse_naive(s) {
            return Ok(Cutoff::Naive(naive));
        }
        parse_timestamp(s)
            .map(Cutoff::Aware)
            .ok_or_else(|| Error::Config(format!("Unrecognised cutoff: {}", s)))
    }
}

impl Cutoff {
    pub fn resolve(&self, tz: Tz) -> DateTime<FixedOffset> {
        match self {
            Cutoff::Aware(ts) => ts.with_timezone(&tz).fixed_offset(),
            // A local time skipped by a DST jump has no earliest mapping; read it as UTC then.
            Cutoff::Naive(naive) => tz
                .from_local_datetime(naive)
                .earliest()
                .unwrap_or_else(|| tz.from_utc_datetime(naive))
                .fixed_offset(),
        }
    }
}

/// Keeps rows at or after `cutoff`, expressed in `tz`, oldest first.
pub fn filter_articles_by_time(articles: &[Article], cutoff: impl Into<Cutoff>, tz: Tz) -> Vec<Article> {
    let cutoff = cutoff.into().resolve(tz);
    let mut kept: Vec<Article> = articles
        .iter()
        .filter(|a| a.timestamp >= cutoff)
        .cloned()
        .map(|mut a| {
            a.timestamp = a.timestamp.with_timezone(&tz).fixed_offset();
            a
        })
        .collect();
    kept.sort_by_key(|a| a.timestamp);
    kept
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowUnit {
    Days,
    Months,
    Years,
}

impl FromStr for WindowUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "d" | "day" | "days" => Ok(WindowUnit::Days),
            "mo" | "month" | "months" => Ok(WindowUnit::Months),
            "y" | "year" | "years" => Ok(WindowUnit::Years),
            other => Err(Error::Config(format!("Unknown window unit: {}", other))),
        }
    }
}

/// A look-back window such as "30 days" or "2 years".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub amount: u32,
    pub unit: WindowUnit,
}

impl Window {
    pub fn new(amount: u32, unit: WindowUnit) -> Self {
        Self { amount, unit }
    }

    pub fn cutoff_from<Z: TimeZone>(&self, now: DateTime<Z>) -> Option<DateTime<Z>> {
        match self.unit {
            WindowUnit::Days => now.checked_sub_days(Days::new(u64::from(self.amount))),
            WindowUnit::Months => now.checked_sub_months(Months::new(self.amount)),
            WindowUnit::Years => now.checked_sub_months(Months::new(self.amount.checked_mul(12)?)),
        }
    }
}

impl FromStr for Window {
    type Err = Error;

    /// Accepts "1d", "3mo", "2 years" and the like.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (amount, unit) = s.split_at(split);
        let amount = amount
            .parse::<u32>()
            .map_err(|_| Error::Config(format!("Window must start with a number: {}", s)))?;
        Ok(Window::new(amount, unit.parse()?))
    }
}
