use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;
use clap::{Args, Subcommand};
use eu_core::{clean_articles, filter_articles_by_time, keyword_index, Article, Error, FetchOutcome, KeywordHit, Result, Window};

use crate::manager::FetchManager;

/// Durations written as "30", "30s", "2m" or "1h15m30s".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_unit = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if let Ok(num) = current_number.parse::<u64>() {
                match c {
                    's' => total_seconds += num,
                    'm' => total_seconds += num * 60,
                    'h' => total_seconds += num * 3600,
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                }
                current_number.clear();
                has_unit = true;
            } else if !c.is_whitespace() {
                return Err(format!("Invalid character in duration: {}", c));
            }
        }

        // a trailing bare number counts as seconds
        if !current_number.is_empty() {
            let num = current_number
                .parse::<u64>()
                .map_err(|_| "Invalid number in duration".to_string())?;
            total_seconds += num;
            has_unit = true;
        }

        if !has_unit {
            return Err("Duration must include a number".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Search query, matched exactly against cached rows
    pub query: String,
    /// Number of articles to request
    #[arg(short = 'n', long, default_value_t = 10)]
    pub size: usize,
}

#[derive(Subcommand, Debug, Clone)]
pub enum FetchCommands {
    /// Fetch articles for a query, from cache when possible
    Fetch(QueryArgs),
    /// Show cleaned articles newer than a look-back window
    Recent {
        #[command(flatten)]
        args: QueryArgs,
        /// Look-back window such as 1d, 2mo or 1y
        #[arg(long, default_value = "1d")]
        window: String,
    },
    /// Title keywords shared by more than one article
    Keywords(QueryArgs),
}

pub async fn handle_command(command: FetchCommands, manager: &FetchManager, tz: Tz) -> Result<()> {
    match command {
        FetchCommands::Fetch(args) => {
            let Some(articles) = fetch_clean(manager, &args).await else {
                return Ok(());
            };
            print!("{}", render_articles(&articles));
        }
        FetchCommands::Recent { args, window } => {
            let window: Window = window.parse()?;
            let cutoff = window
                .cutoff_from(Utc::now())
                .ok_or_else(|| Error::Config(format!("Window out of range: {:?}", window)))?;
            let Some(articles) = fetch_clean(manager, &args).await else {
                return Ok(());
            };
            let recent = filter_articles_by_time(&articles, cutoff.fixed_offset(), tz);
            tracing::info!("🕒 {} of {} articles since {}", recent.len(), articles.len(), cutoff.with_timezone(&tz));
            print!("{}", render_articles(&recent));
        }
        FetchCommands::Keywords(args) => {
            let Some(articles) = fetch_clean(manager, &args).await else {
                return Ok(());
            };
            print!("{}", render_keywords(&keyword_index(&articles)));
        }
    }
    Ok(())
}

/// Fetches and cleans, printing the message instead when the fetch produced one.
pub async fn fetch_clean(manager: &FetchManager, args: &QueryArgs) -> Option<Vec<Article>> {
    match manager.fetch_or_retrieve(&args.query, args.size).await {
        FetchOutcome::Message(message) => {
            println!("{}", message);
            None
        }
        outcome => Some(clean_articles(outcome.into_rows())),
    }
}

pub fn render_articles(articles: &[Article]) -> String {
    if articles.is_empty() {
        return "No articles.\n".to_string();
    }
    articles
        .iter()
        .map(|a| format!("{}  {}  {}\n", a.timestamp.format("%Y-%m-%d %H:%M %Z"), a.title, a.url))
        .collect()
}

pub fn render_keywords(hits: &[KeywordHit]) -> String {
    if hits.is_empty() {
        return "No shared keywords.\n".to_string();
    }
    hits.iter()
        .map(|h| format!("{:<20} {:>3}  {}\n", h.keyword, h.count, h.ids.join(", ")))
        .collect()
}
