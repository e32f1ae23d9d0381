//! # verity
//!
//! Command-line front end: wires configuration, the HTTP gateway and the
//! client stores together, runs one action and prints the outcome along
//! with any notifications it raised.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use configs::{LogFormat, Settings};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vr_core::{CommentInput, CreateNewsPayload, NewsId, NewsItem, NewsView, PageRequest, Severity, StatusFilter, Vote};
use vr_gateway_http::{EnvToken, HttpGateway, StaticToken, TokenChain};
use vr_store::{NewsStore, NotificationQueue, UserDirectory};

#[derive(Parser, Debug)]
#[command(author, version, about = "verity: community fact-check client", long_about = None)]
struct Cli {
    /// Settings file (defaults to ./verity.toml when present).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override `api.base_url`.
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List active news with their verdicts.
    List {
        /// all | fake | not-fake | equal
        #[arg(long, default_value = "all")]
        status: StatusFilter,
    },
    /// Show one news item with its comments.
    Show { id: i64 },
    /// List removed news (admin).
    Removed,
    /// Report a news item.
    Create {
        #[arg(long)]
        topic: String,
        #[arg(long, default_value = "")]
        short_detail: String,
        #[arg(long, default_value = "")]
        full_detail: String,
        #[arg(long, default_value = "")]
        image: String,
        #[arg(long)]
        reporter: String,
        /// ISO-8601; the server stamps the current time when omitted.
        #[arg(long)]
        date_time: Option<String>,
    },
    /// Vote on a news item with a comment.
    Vote {
        news_id: i64,
        #[arg(long)]
        username: String,
        #[arg(long, value_parser = parse_vote)]
        vote: Vote,
        #[arg(long, default_value = "")]
        text: String,
        #[arg(long)]
        image: Option<String>,
    },
    /// Vote tallies of a news item.
    Summary { news_id: i64 },
    /// Soft-delete a news item (admin).
    Remove { id: i64 },
    /// Delete a comment (admin).
    DeleteComment { news_id: i64, comment_id: i64 },
    /// List user accounts (admin).
    Users,
    /// Grant the member role.
    Promote { id: i64 },
    /// Revoke the member role.
    Demote { id: i64 },
}

fn parse_vote(raw: &str) -> Result<Vote, String> {
    Vote::parse(raw).ok_or_else(|| format!("'{raw}' is not a vote; expected 'real' or 'fake'"))
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log.level));
    let registry = tracing_subscriber::registry().with(filter);
    match settings.log.format {
        LogFormat::Json => registry.with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr)).init(),
        LogFormat::Compact => registry.with(fmt::layer().compact().with_writer(std::io::stderr)).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    if let Some(base_url) = cli.base_url.clone() {
        settings.api.base_url = base_url;
        settings.validate()?;
    }
    init_tracing(&settings);

    let mut tokens = TokenChain::new();
    if let Some(secret) = settings.api.token.take() {
        tokens = tokens.with(Arc::new(StaticToken::new(secret)));
    }
    tokens = tokens.with(Arc::new(EnvToken::new(settings.api.token_env.clone())));

    let gateway = Arc::new(HttpGateway::new(&settings.api.base_url, settings.timeout(), Arc::new(tokens))?);
    let notifications = Arc::new(NotificationQueue::new(settings.notification_ttl()));
    let news = NewsStore::new(gateway.clone())
        .with_notifier(notifications.clone())
        .with_comment_page(PageRequest { page: 0, size: settings.api.comment_page_size });
    let users = UserDirectory::new(gateway).with_notifier(notifications.clone());

    info!(base_url = %settings.api.base_url, "verity client ready");

    let result = run(cli.command, &news, &users).await;

    for notice in notifications.snapshot() {
        let tag = match notice.severity {
            Severity::Success => "ok",
            Severity::Error => "error",
            Severity::Info => "info",
        };
        eprintln!("[{tag}] {}", notice.message);
    }
    result
}

async fn run(command: Commands, news: &NewsStore, users: &UserDirectory) -> anyhow::Result<()> {
    match command {
        Commands::List { status } => {
            news.fetch_all().await;
            if let Some(err) = news.last_error() {
                anyhow::bail!(err);
            }
            for view in news.with_status(status) {
                print_row(&view);
            }
        }
        Commands::Show { id } => {
            let item = news.fetch_by_id(NewsId(id)).await?;
            print_detail(&NewsView::new(item));
        }
        Commands::Removed => {
            news.fetch_removed().await;
            if let Some(err) = news.last_error() {
                anyhow::bail!(err);
            }
            for item in news.removed() {
                print_row(&NewsView::new(item));
            }
        }
        Commands::Create { topic, short_detail, full_detail, image, reporter, date_time } => {
            let payload = CreateNewsPayload { topic, short_detail, full_detail, image, reporter, date_time };
            match news.create(payload).await? {
                Some(item) => println!("created #{} {}", item.id, item.topic),
                None => println!("created; list refreshed ({} items)", news.combined().len()),
            }
        }
        Commands::Vote { news_id, username, vote, text, image } => {
            let outcome = news.submit_comment(NewsId(news_id), CommentInput { username, text, image, vote }).await;
            if let Some(err) = outcome.error {
                anyhow::bail!(err);
            }
            if let Some(view) = news.current().map(NewsView::new) {
                println!("vote recorded; #{} is now {}", view.news.id, view.display_status());
            }
        }
        Commands::Summary { news_id } => {
            let summary = news.summary(NewsId(news_id)).await?;
            println!("real {} / fake {} ({})", summary.real, summary.fake, summary.verdict());
        }
        Commands::Remove { id } => {
            news.remove(NewsId(id)).await?;
            println!("removed #{id}");
        }
        Commands::DeleteComment { news_id, comment_id } => {
            news.delete_comment(NewsId(news_id), comment_id).await?;
            println!("deleted comment {comment_id} of #{news_id}");
        }
        Commands::Users => {
            users.fetch_all().await;
            for user in users.users() {
                println!("{:>5}  {:<20} {}", user.id, user.username, user.roles.join(","));
            }
        }
        Commands::Promote { id } => {
            users.promote(id).await?;
        }
        Commands::Demote { id } => {
            users.demote(id).await?;
        }
    }
    Ok(())
}

fn print_row(view: &NewsView) {
    let NewsItem { id, topic, reporter, .. } = &view.news;
    println!("#{id:<6} [{:<8}] {topic} ({reporter}, {} votes)", view.display_status().to_string(), view.news.total_votes());
}

fn print_detail(view: &NewsView) {
    let news = &view.news;
    println!("#{} {} [{}]", news.id, news.topic, view.display_status());
    println!("reported by {}", news.reporter);
    if let Some(at) = news.date_time {
        println!("at {}", at.to_rfc3339());
    }
    println!();
    println!("{}", news.full_detail);
    println!();
    println!("real {} / fake {}", news.vote_summary.real, news.vote_summary.fake);
    for comment in &news.comments {
        println!("  {} {} ({}): {}", comment.time.format("%Y-%m-%d %H:%M"), comment.author, comment.vote, comment.text);
    }
}
