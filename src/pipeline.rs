use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::{Database, NewLearning};
use crate::email;
use crate::error::Result;
use crate::generator::{self, ReviewItem};
use crate::llm::CompletionClient;
use crate::mailer::Mailer;
use crate::scheduler;
use crate::selector;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    pub skip_email: bool,
    pub static_mode: bool,
}

/// What the run did, for logging and tests.
#[derive(Debug)]
pub struct RunSummary {
    pub new_topic: Option<String>,
    pub reviews: usize,
    pub dispatched: bool,
    pub persisted: bool,
}

/// The daily workflow, strictly sequential:
/// load store -> compute due reviews -> select new topic -> generate
/// content -> assemble email -> dispatch -> persist. All generation happens
/// before any side effect, and persistence is a single transaction, so a
/// failed run leaves both the mailbox and the store untouched.
pub fn run(
    config: &Config,
    db: &Database,
    llm: &dyn CompletionClient,
    mailer: &dyn Mailer,
    today: NaiveDate,
    opts: &RunOptions,
) -> Result<RunSummary> {
    let mode = if opts.static_mode { "static" } else { "dynamic" };
    info!(date = %today, mode, "starting daily knowledge run");

    db.init()?;
    let cards = db.all_cards()?;
    let history = db.learned_topics()?;
    info!(learned = history.len(), "store loaded");

    let due = scheduler::due_reviews(today, &cards);
    info!(due = due.len(), "computed due reviews");

    let new_topic = if opts.static_mode {
        let catalog = selector::load_catalog(config.catalog_path.as_deref())?;
        let picked = selector::select_static(&catalog, &history, &mut rand::thread_rng())?;
        info!(topic = %picked.topic, "selected catalog topic");
        picked
    } else {
        selector::select_dynamic(
            llm,
            &history,
            &config.profile,
            today,
            config.max_topic_retries,
        )?
    };

    let lesson = generator::generate_lesson(
        llm,
        &new_topic,
        config.llm.temperature,
        config.llm.max_tokens,
    )?;

    let mut reviews = Vec::with_capacity(due.len());
    for card in due {
        let question = generator::generate_quiz(llm, &card)?;
        reviews.push(ReviewItem { card, question });
    }

    let stats = db.stats(today)?;
    let subject = email::subject(today, Some(&new_topic.topic), reviews.len());
    let html = email::render_html(today, Some((&new_topic, &lesson)), &reviews, &stats);
    let text = email::render_text(today, Some((&new_topic, &lesson)), &reviews);

    if opts.dry_run {
        let preview = preview_path(config);
        fs::write(&preview, &html)?;
        info!(preview = %preview.display(), "dry run: wrote preview, skipping dispatch and persist");
        return Ok(RunSummary {
            new_topic: Some(new_topic.topic),
            reviews: reviews.len(),
            dispatched: false,
            persisted: false,
        });
    }

    let dispatched = if opts.skip_email {
        warn!("skipping email dispatch");
        false
    } else {
        mailer.send(&subject, &html, &text)?;
        info!(subject = %subject, "email dispatched");
        true
    };

    let reviewed_ids: Vec<i64> = reviews.iter().map(|r| r.card.id).collect();
    let commit = db.commit_run(
        Some(&NewLearning {
            topic: &new_topic.topic,
            category: &new_topic.category,
            summary: &lesson.summary,
        }),
        &reviewed_ids,
        today,
    )?;

    if let Some(card) = &commit.new_card {
        info!(topic = %card.topic, next_review = %card.next_review_date, "recorded new learning");
    }
    for card in &commit.reviewed {
        info!(
            topic = %card.topic,
            stage = card.review_stage,
            next_review = %card.next_review_date,
            "advanced review stage"
        );
    }

    info!("daily run completed");
    Ok(RunSummary {
        new_topic: Some(new_topic.topic),
        reviews: reviews.len(),
        dispatched,
        persisted: true,
    })
}

fn preview_path(config: &Config) -> PathBuf {
    config.db_path.with_file_name("email_preview.html")
}
