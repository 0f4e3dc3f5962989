use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use eu_core::{filter_articles_by_time, filter_by_entities, Article, Error, Result, Window};
use eu_fetch::cli::{fetch_clean, handle_command, FetchCommands, HumanDuration, QueryArgs};
use eu_fetch::{init_logging, FetchManager, SearchClient, SearchConfig};
use eu_inference::{create_annotator, create_summarizer, InferenceConfig};
use eu_web::AppState;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Follow how a news story unfolds", long_about = None)]
struct Cli {
    /// Search endpoint
    #[arg(long, env = "API_URL")]
    api_url: String,
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    /// Search request timeout, e.g. 30 or 1m
    #[arg(long, env = "SEARCH_TIMEOUT_SECS", default_value = "30")]
    timeout: HumanDuration,
    #[arg(long, env = "STORAGE", default_value = "csv", help = "Cache backend. Available: csv (default), memory")]
    storage: String,
    #[arg(long, env = "CACHE_PATH", default_value = eu_storage::DEFAULT_CACHE_PATH)]
    cache_path: PathBuf,
    /// Zone timestamps are shown and filtered in
    #[arg(long, env = "TIMEZONE", default_value = "Europe/London")]
    timezone: String,
    /// JSON file of {"people": [...], "organizations": [...]} for the built-in recognizer
    #[arg(long, env = "ENTITIES_PATH")]
    entities_path: Option<PathBuf>,
    /// JSON file of extra {"word": valence} sentiment entries
    #[arg(long, env = "LEXICON_PATH")]
    lexicon_path: Option<PathBuf>,
    /// Token-classification endpoint used instead of the built-in recognizer
    #[arg(long, env = "NER_URL")]
    ner_url: Option<String>,
    /// Political leaning classifier endpoint
    #[arg(long, env = "LEAN_URL")]
    lean_url: Option<String>,
    #[arg(long, env = "MODEL_API_KEY", hide_env_values = true)]
    model_api_key: Option<String>,
    /// OpenAI-compatible base URL for story summaries
    #[arg(long, env = "SUMMARIZER_URL")]
    summarizer_url: Option<String>,
    #[arg(long, env = "SUMMARIZER_KEY", hide_env_values = true)]
    summarizer_key: Option<String>,
    #[arg(long, env = "SUMMARIZER_MODEL")]
    summarizer_model: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn inference_config(&self) -> InferenceConfig {
        InferenceConfig {
            lexicon_path: self.lexicon_path.clone(),
            entities_path: self.entities_path.clone(),
            ner_url: self.ner_url.clone(),
            lean_url: self.lean_url.clone(),
            model_api_key: self.model_api_key.clone(),
            summarizer_url: self.summarizer_url.clone(),
            summarizer_key: self.summarizer_key.clone(),
            summarizer_model: self.summarizer_model.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(flatten)]
    Fetch(FetchCommands),
    /// Fetch, then score sentiment and extract people and organizations
    Annotate {
        #[command(flatten)]
        args: QueryArgs,
        /// Only keep articles newer than this window, e.g. 7d or 3mo
        #[arg(long)]
        window: Option<String>,
        /// Keep articles mentioning any of these people
        #[arg(long = "person")]
        people: Vec<String>,
        /// Keep articles mentioning any of these organizations
        #[arg(long = "org")]
        orgs: Vec<String>,
    },
    /// Political leaning of each headline
    Lean(QueryArgs),
    /// Ask the summarizer how the story unfolded
    Summarize {
        #[command(flatten)]
        args: QueryArgs,
        #[arg(long)]
        window: Option<String>,
    },
    /// Serve the dashboard JSON API
    Serve {
        #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:8000")]
        addr: SocketAddr,
    },
}

fn within_window(articles: Vec<Article>, window: Option<&str>, tz: Tz) -> Result<Vec<Article>> {
    let Some(window) = window else {
        return Ok(articles);
    };
    let window: Window = window.parse()?;
    let cutoff = window
        .cutoff_from(Utc::now())
        .ok_or_else(|| Error::Config(format!("Window out of range: {:?}", window)))?;
    Ok(filter_articles_by_time(&articles, cutoff, tz))
}

fn join(names: &std::collections::BTreeSet<String>) -> String {
    names.iter().cloned().collect::<Vec<_>>().join(", ")
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let logger = init_logging("info");
    let cli = Cli::parse();

    info!("💾 Opening {} cache", cli.storage);
    let cache = eu_storage::create_storage(&cli.storage, Some(&cli.cache_path))?;
    let search = SearchConfig::new(&cli.api_url)?
        .with_api_key(cli.api_key.clone())
        .with_timeout(cli.timeout.0);
    let client = SearchClient::new(search)?;
    logger.debug(&format!("{:?}", client));
    let manager = FetchManager::new(Arc::new(client), cache);
    let tz: Tz = cli
        .timezone
        .parse()
        .map_err(|e| Error::Config(format!("Unknown timezone '{}': {}", cli.timezone, e)))?;
    let inference = cli.inference_config();

    match cli.command {
        Commands::Fetch(command) => handle_command(command, &manager, tz).await?,
        Commands::Annotate {
            args,
            window,
            people,
            orgs,
        } => {
            let annotator = create_annotator(&inference)?;
            let Some(articles) = fetch_clean(&manager, &args).await else {
                return Ok(());
            };
            let mut articles = within_window(articles, window.as_deref(), tz)?;
            annotator.annotate(&mut articles).await?;
            let articles = filter_by_entities(articles, &people, &orgs);
            info!("✨ {} articles annotated", articles.len());
            for article in &articles {
                let Some(annotation) = &article.annotation else { continue };
                println!(
                    "{}  {:>+.3} {:<13}  {}\n    people: {}\n    orgs: {}",
                    article.timestamp.with_timezone(&tz).format("%Y-%m-%d %H:%M"),
                    annotation.sentiment,
                    annotation.sentiment_category,
                    article.title,
                    join(&annotation.people),
                    join(&annotation.organizations),
                );
            }
        }
        Commands::Lean(args) => {
            let annotator = create_annotator(&inference)?;
            if !annotator.has_leaning() {
                return Err(Error::Config("No leaning classifier configured (set --lean-url)".to_string()));
            }
            let Some(mut articles) = fetch_clean(&manager, &args).await else {
                return Ok(());
            };
            annotator.annotate(&mut articles).await?;
            for article in &articles {
                match article.annotation.as_ref().and_then(|a| a.leaning) {
                    Some(score) => println!("{:<6} {:.3}  {}", score.leaning, score.score, article.title),
                    None => println!("{:<6} {:>5}  {}", "?", "-", article.title),
                }
            }
        }
        Commands::Summarize { args, window } => {
            let summarizer = create_summarizer(&inference)?
                .ok_or_else(|| Error::Config("No summarizer configured (set --summarizer-url)".to_string()))?;
            let Some(articles) = fetch_clean(&manager, &args).await else {
                return Ok(());
            };
            let articles = within_window(articles, window.as_deref(), tz)?;
            info!("🤖 Summarizing {} articles with {}", articles.len(), summarizer.name());
            println!("{}", summarizer.summarize(&args.query, &articles).await?);
        }
        Commands::Serve { addr } => {
            let annotator = create_annotator(&inference)?;
            let state = AppState::new(Arc::new(manager), Arc::new(annotator))
                .with_summarizer(create_summarizer(&inference)?)
                .with_timezone(tz);
            eu_web::serve(addr, state).await?;
        }
    }

    Ok(())
}
