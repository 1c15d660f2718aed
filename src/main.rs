mod config;
mod db;
mod email;
mod error;
mod generator;
mod llm;
mod mailer;
mod models;
mod pipeline;
mod prompts;
mod scheduler;
mod selector;

use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use config::Config;
use db::Database;
use error::{Error, Result};
use llm::OpenAiClient;
use mailer::{NullMailer, SmtpMailer};
use pipeline::RunOptions;

#[derive(Parser)]
#[command(name = "primer")]
#[command(about = "Daily knowledge email with spaced-repetition reviews")]
#[command(version)]
struct Cli {
    /// Run selection and generation but skip email dispatch and store updates
    #[arg(long)]
    dry_run: bool,

    /// Pick today's topic from the static catalog instead of the LLM
    #[arg(long = "static")]
    static_mode: bool,

    /// Skip email dispatch but still update the store
    #[arg(long)]
    skip_email: bool,

    /// Show learned/due counts and exit
    #[arg(long)]
    status: bool,

    /// Check connectivity to the generation and mail services
    #[arg(long)]
    test: bool,

    /// Create the store if absent and exit
    #[arg(long)]
    init_db: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env()?;
    let today = Local::now().date_naive();

    if cli.init_db {
        let db = Database::open(&config.db_path)?;
        db.init()?;
        println!("Database initialized at: {}", config.db_path.display());
        return Ok(());
    }

    if cli.status {
        let db = Database::open(&config.db_path)?;
        db.init()?;
        return show_status(&db, today);
    }

    if cli.test {
        return run_checks(&config);
    }

    // Config problems are fatal before any external call, except in dry
    // runs, which exist precisely to exercise the pipeline without them.
    let problems = config.validate();
    if !problems.is_empty() && !cli.dry_run {
        return Err(Error::Config(problems.join("; ")));
    }

    let db = Database::open(&config.db_path)?;
    let llm = OpenAiClient::new(&config.llm)?;

    let opts = RunOptions {
        dry_run: cli.dry_run,
        skip_email: cli.skip_email,
        static_mode: cli.static_mode,
    };

    let summary = if cli.dry_run || cli.skip_email {
        pipeline::run(&config, &db, &llm, &NullMailer, today, &opts)?
    } else {
        let mailer = SmtpMailer::new(&config.smtp)?;
        pipeline::run(&config, &db, &llm, &mailer, today, &opts)?
    };

    if let Some(topic) = &summary.new_topic {
        println!("New topic: {}", topic);
    }
    println!(
        "Reviews: {} | email {} | store {}",
        summary.reviews,
        if summary.dispatched { "sent" } else { "skipped" },
        if summary.persisted { "updated" } else { "untouched" },
    );

    Ok(())
}

fn show_status(db: &Database, today: NaiveDate) -> Result<()> {
    let stats = db.stats(today)?;

    println!();
    println!("=== Learning Status ===");
    println!("Topics learned: {}", stats.learned);

    if !stats.by_category.is_empty() {
        println!();
        println!("By category:");
        for (category, count) in &stats.by_category {
            println!(
                "  {} {}: {}",
                config::category_emoji(category),
                category,
                count
            );
        }
    }

    let cards = db.all_cards()?;
    let due = scheduler::due_reviews(today, &cards);
    if due.is_empty() {
        println!();
        println!("No reviews due today.");
    } else {
        println!();
        println!("Due for review today: {}", due.len());
        for card in due.iter().take(5) {
            println!(
                "  {} {} (stage {})",
                config::category_emoji(&card.category),
                card.topic,
                card.review_stage
            );
        }
        if due.len() > 5 {
            println!("  ... and {} more", due.len() - 5);
        }
    }

    println!();
    Ok(())
}

fn run_checks(config: &Config) -> Result<()> {
    println!();
    println!("Testing connections...");

    print!("  Generation service: ");
    match OpenAiClient::new(&config.llm).and_then(|client| client.check()) {
        Ok(()) => println!("ok ({})", config.llm.model),
        Err(e) => println!("FAILED ({})", e),
    }

    print!("  SMTP: ");
    match SmtpMailer::new(&config.smtp).and_then(|mailer| mailer.check()) {
        Ok(()) => println!("ok ({}:{})", config.smtp.server, config.smtp.port),
        Err(e) => println!("FAILED ({})", e),
    }

    let problems = config.validate();
    if problems.is_empty() {
        println!("  Configuration: ok");
    } else {
        println!("  Configuration problems:");
        for p in &problems {
            println!("    - {}", p);
        }
    }

    println!();
    Ok(())
}
