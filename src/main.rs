//! Petrel main entry point
//!
//! This is the command-line interface for the Petrel blog crawler.

use anyhow::Context;
use clap::{Parser, Subcommand};
use petrel::config::load_config_or_default;
use petrel::export::{build_export, write_export};
use petrel::jobs::JobRunner;
use petrel::render::HttpRenderer;
use petrel::storage::{open_storage, JobStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Petrel: a polite blog post crawler
///
/// Petrel crawls a blog from a seed URL: it follows pagination, extracts
/// structured post data, optionally fetches each post's own page for full
/// content, and stores everything in a local database.
#[derive(Parser, Debug)]
#[command(name = "petrel")]
#[command(version = "0.1.0")]
#[command(about = "A polite blog post crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used if omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a blog and store the extracted posts
    Crawl {
        /// Seed URL of the blog to crawl
        url: String,

        /// Maximum number of listing pages to walk (defaults from config)
        #[arg(long)]
        max_pages: Option<u32>,

        /// Fetch each post's own page for full content
        #[arg(long)]
        full_content: bool,
    },

    /// List stored crawl jobs, newest first
    Jobs {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },

    /// List stored posts, newest first
    Posts {
        /// Only show posts from this blog URL
        #[arg(long)]
        blog_url: Option<String>,

        #[arg(long, default_value_t = 20)]
        limit: u32,
    },

    /// Export stored posts to a JSON file
    Export {
        /// Path of the JSON file to write
        output: PathBuf,

        /// Only export posts from this blog URL
        #[arg(long)]
        blog_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load_config_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.command {
        Command::Crawl {
            url,
            max_pages,
            full_content,
        } => handle_crawl(config, &url, max_pages, full_content).await,
        Command::Jobs { limit } => handle_jobs(&config, limit),
        Command::Posts { blog_url, limit } => handle_posts(&config, blog_url.as_deref(), limit),
        Command::Export { output, blog_url } => {
            handle_export(&config, &output, blog_url.as_deref())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("petrel=info,warn"),
            1 => EnvFilter::new("petrel=debug,info"),
            2 => EnvFilter::new("petrel=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the crawl command: runs one job to completion
async fn handle_crawl(
    config: petrel::Config,
    url: &str,
    max_pages: Option<u32>,
    full_content: bool,
) -> anyhow::Result<()> {
    let max_pages = max_pages.unwrap_or(config.crawler.max_pages);
    let store = open_storage(Path::new(&config.output.database_path))
        .context("Failed to open database")?;
    let store: Arc<Mutex<dyn JobStore + Send>> = Arc::new(Mutex::new(store));

    let runner = JobRunner::new(
        Arc::clone(&store),
        Arc::new(HttpRenderer::new()),
        config,
    );

    let job = runner.submit(url).await?;
    runner.run_job(job.id, max_pages, full_content).await?;

    let finished = store
        .lock()
        .await
        .get_job(job.id)?
        .context("Job vanished from the database")?;

    println!("Job:    {}", finished.id);
    println!("URL:    {}", finished.seed_url);
    println!("Status: {}", finished.status);
    println!("Pages:  {}", finished.pages_scraped);
    println!("Posts:  {}", finished.posts_found);
    if let Some(message) = &finished.error_message {
        println!("Error:  {}", message);
        anyhow::bail!("Crawl failed: {}", message);
    }

    Ok(())
}

/// Handles the jobs command: lists stored jobs
fn handle_jobs(config: &petrel::Config, limit: u32) -> anyhow::Result<()> {
    let store = open_storage(Path::new(&config.output.database_path))
        .context("Failed to open database")?;

    let jobs = store.list_jobs(limit, 0)?;
    if jobs.is_empty() {
        println!("No jobs recorded.");
        return Ok(());
    }

    for job in jobs {
        println!(
            "{}  {:<11}  pages={:<3} posts={:<4} {}",
            job.id, job.status, job.pages_scraped, job.posts_found, job.seed_url
        );
        if let Some(message) = &job.error_message {
            println!("    error: {}", message);
        }
    }

    Ok(())
}

/// Handles the posts command: lists stored posts
fn handle_posts(
    config: &petrel::Config,
    blog_url: Option<&str>,
    limit: u32,
) -> anyhow::Result<()> {
    let store = open_storage(Path::new(&config.output.database_path))
        .context("Failed to open database")?;

    let (posts, total) = store.list_posts(blog_url, limit, 0)?;
    if posts.is_empty() {
        println!("No posts stored.");
        return Ok(());
    }

    for post in &posts {
        let date = post
            .published_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "----------".to_string());
        println!(
            "{:>5}  {}  {}",
            post.id,
            date,
            post.title
        );
        if let Some(url) = &post.post_url {
            println!("       {}", url);
        }
    }
    println!("\nShowing {} of {} posts", posts.len(), total);

    Ok(())
}

/// Handles the export command: writes stored posts as JSON
fn handle_export(
    config: &petrel::Config,
    output: &Path,
    blog_url: Option<&str>,
) -> anyhow::Result<()> {
    let store = open_storage(Path::new(&config.output.database_path))
        .context("Failed to open database")?;

    let document = build_export(&store, blog_url)?;
    write_export(&document, output)?;

    println!(
        "✓ Exported {} posts to: {}",
        document.total_posts,
        output.display()
    );

    Ok(())
}
