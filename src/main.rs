// src/main.rs

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use paperscout::config::CONFIG;
use paperscout::engine::{RecommendationEngine, RefreshOptions};
use paperscout::fetch::CrossrefClient;
use paperscout::keywords::KeywordSet;
use paperscout::store::types::{ListFilter, SortOrder, Status};
use paperscout::store::{create_pool, RecommendationStore};

#[derive(Parser)]
#[command(name = "paperscout", about = "Journal monitoring and paper recommendations")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one scan cycle over the active target journals
    Refresh {
        /// Scan a single journal by name
        #[arg(long)]
        journal: Option<String>,
        /// Recent-articles window in days
        #[arg(long)]
        days: Option<i64>,
        /// Freshness window override in hours
        #[arg(long)]
        window_hours: Option<i64>,
    },
    /// List cached recommendations
    List {
        #[arg(long)]
        journal: Option<String>,
        #[arg(long)]
        keyword: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        min_score: Option<f64>,
        /// newest or oldest
        #[arg(long, default_value = "newest")]
        sort: String,
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Mark a recommendation as unread, confirmed or dismissed
    SetStatus { doi: String, status: String },
    /// Delete one recommendation by DOI
    Remove { doi: String },
    /// Print one recommendation by DOI
    Show {
        doi: String,
        /// Query Crossref directly instead of the local cache
        #[arg(long)]
        fetch: bool,
    },
    /// Manage target journals
    Journals {
        #[command(subcommand)]
        command: JournalCommand,
    },
    /// Recommendation counts by status
    Stats,
    /// Delete old reviewed recommendations
    Prune {
        #[arg(long)]
        days: Option<i64>,
    },
}

#[derive(Subcommand)]
enum JournalCommand {
    List,
    Add {
        name: String,
        #[arg(long)]
        issn: Option<String>,
        /// Comma-separated keyword list
        #[arg(long, default_value = "")]
        keywords: String,
    },
    Activate { id: i64 },
    Deactivate { id: i64 },
    Remove { id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let config = CONFIG.clone();

    let pool = create_pool(&config.database_url, config.sqlite_max_connections).await?;
    let store = RecommendationStore::new(pool);
    store.init_schema().await?;

    let keywords = Arc::new(KeywordSet::load(
        config.keyword_overrides_path.as_deref().map(std::path::Path::new),
    )?);

    match cli.command {
        Command::Refresh {
            journal,
            days,
            window_hours,
        } => {
            let source = Arc::new(CrossrefClient::new(&config)?);
            let engine =
                RecommendationEngine::new(store, source, keywords, config.clone());
            info!("starting refresh");

            let options = RefreshOptions {
                journal,
                days,
                window_hours,
            };
            let progress = |name: &str, fetched: usize, matched: usize| {
                println!("{name}: {fetched} fetched, {matched} matched");
            };
            let report = engine.refresh(&options, Some(&progress)).await?;

            println!();
            println!(
                "{} journals scanned: {} succeeded, {} failed",
                report.journals.len(),
                report.succeeded(),
                report.failed()
            );
            println!(
                "{} articles fetched, {} matched, {} new, {} refreshed",
                report.total_fetched(),
                report.total_matched(),
                report.total_inserted(),
                report.total_refreshed()
            );
            for outcome in report.journals.iter().filter(|j| !j.succeeded()) {
                println!(
                    "  failed: {} ({})",
                    outcome.journal,
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
        Command::List {
            journal,
            keyword,
            status,
            min_score,
            sort,
            limit,
        } => {
            let journal_id = match journal {
                Some(name) => Some(
                    store
                        .find_journal(&name)
                        .await?
                        .ok_or_else(|| anyhow::anyhow!("unknown journal '{name}'"))?
                        .id,
                ),
                None => None,
            };
            let filter = ListFilter {
                journal_id,
                keyword,
                status: status.as_deref().map(str::parse).transpose()?,
                min_score: min_score.or(Some(config.min_score)),
                sort: match sort.as_str() {
                    "oldest" => SortOrder::Oldest,
                    _ => SortOrder::Newest,
                },
                limit,
            };

            let records = store.list(&filter).await?;
            for record in &records {
                println!(
                    "[{:.2}] {} ({}) {}",
                    record.score,
                    record.title,
                    record.status,
                    record.doi
                );
                println!("       {} | {}", record.journal_name, record.reason);
            }
            println!("{} recommendations", records.len());
        }
        Command::SetStatus { doi, status } => {
            let status: Status = status.parse()?;
            store.set_status(&doi, status).await?;
            println!("{doi} -> {status}");
        }
        Command::Remove { doi } => {
            store.remove_recommendation(&doi).await?;
            println!("removed {doi}");
        }
        Command::Show { doi, fetch } => {
            if fetch {
                let client = CrossrefClient::new(&config)?;
                match client.fetch_by_doi(&doi).await? {
                    Some(article) => {
                        println!("{} ({})", article.title, article.doi);
                        if !article.authors.is_empty() {
                            println!("  {}", article.authors.join(", "));
                        }
                        if let Some(year) = article.year {
                            println!("  published {year}");
                        }
                        if let Some(abstract_text) = &article.abstract_text {
                            println!("  {abstract_text}");
                        }
                    }
                    None => println!("{doi}: not found on Crossref"),
                }
            } else {
                match store.get_by_doi(&doi).await? {
                    Some(record) => {
                        println!(
                            "[{:.2}] {} ({}) {}",
                            record.score, record.title, record.status, record.doi
                        );
                        println!("       {} | {}", record.journal_name, record.reason);
                        if !record.matched_keywords.is_empty() {
                            println!("       keywords: {}", record.matched_keywords.join(", "));
                        }
                    }
                    None => println!("{doi}: not cached"),
                }
            }
        }
        Command::Journals { command } => match command {
            JournalCommand::List => {
                for journal in store.list_journals(false).await? {
                    println!(
                        "{:>4} {} {} ({} keywords){}",
                        journal.id,
                        if journal.active { "[active]  " } else { "[inactive]" },
                        journal.name,
                        journal.keywords.len(),
                        journal
                            .last_fetched
                            .map(|t| format!(", last fetched {t}"))
                            .unwrap_or_default()
                    );
                }
            }
            JournalCommand::Add {
                name,
                issn,
                keywords: keyword_list,
            } => {
                let keywords: Vec<String> = keyword_list
                    .split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect();
                let id = store.add_journal(&name, issn.as_deref(), &keywords).await?;
                println!("added journal {name} (id {id})");
            }
            JournalCommand::Activate { id } => store.set_journal_active(id, true).await?,
            JournalCommand::Deactivate { id } => store.set_journal_active(id, false).await?,
            JournalCommand::Remove { id } => store.remove_journal(id).await?,
        },
        Command::Stats => {
            let stats = store.stats().await?;
            println!("total:     {}", stats.total);
            println!("unread:    {}", stats.unread);
            println!("confirmed: {}", stats.confirmed);
            println!("dismissed: {}", stats.dismissed);
        }
        Command::Prune { days } => {
            let deleted = store
                .prune_reviewed(days.unwrap_or(config.prune_after_days))
                .await?;
            println!("deleted {deleted} reviewed recommendations");
        }
    }

    Ok(())
}
