use regex::Regex;
use tracing::info;

use crate::error::Result;
use crate::llm::{CompletionClient, CompletionRequest};
use crate::models::{KnowledgeCard, SelectedTopic};
use crate::prompts;

const SUMMARY_MAX_CHARS: usize = 200;

/// Generated teaching content for a new topic. `summary` is the short
/// recall line that gets persisted on the card.
#[derive(Debug, Clone)]
pub struct Lesson {
    pub content: String,
    pub summary: String,
}

/// A due card paired with its generated review question.
#[derive(Debug, Clone)]
pub struct ReviewItem {
    pub card: KnowledgeCard,
    pub question: String,
}

pub fn generate_lesson(
    llm: &dyn CompletionClient,
    topic: &SelectedTopic,
    temperature: f64,
    max_tokens: u32,
) -> Result<Lesson> {
    let request = CompletionRequest {
        system: Some(prompts::lesson_system_prompt()),
        user: prompts::lesson_user_prompt(&topic.topic, &topic.category, &topic.why),
        temperature,
        max_tokens,
    };

    let content = llm.complete(&request)?;
    let summary = extract_summary(&content)
        .unwrap_or_else(|| format!("Core ideas of {}", topic.topic));

    info!(topic = %topic.topic, "generated lesson content");
    Ok(Lesson { content, summary })
}

pub fn generate_quiz(llm: &dyn CompletionClient, card: &KnowledgeCard) -> Result<String> {
    // Higher temperature than the lesson for variety across review rounds.
    let request = CompletionRequest {
        system: Some(prompts::quiz_system_prompt()),
        user: prompts::quiz_user_prompt(card),
        temperature: 0.8,
        max_tokens: 1000,
    };

    let question = llm.complete(&request)?;
    info!(topic = %card.topic, stage = card.review_stage, "generated review question");
    Ok(question)
}

/// Pull the TL;DR line out of the lesson markdown. Strips emphasis markers,
/// collapses whitespace, truncates to a storable length.
pub fn extract_summary(content: &str) -> Option<String> {
    let patterns = [
        r"(?im)^\s*\*\*TL;DR\*\*[:：]\s*(.+)$",
        r"(?im)^\s*TL;DR[:：]\s*(.+)$",
        r"(?ims)^###\s*⚡.*?\n(.+?)(?:\n#|\z)",
    ];

    for pattern in patterns {
        let re = Regex::new(pattern).ok()?;
        if let Some(captures) = re.captures(content) {
            let raw = captures.get(1)?.as_str();
            let cleaned = raw.replace('*', "");
            let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
            if collapsed.is_empty() {
                continue;
            }
            return Some(collapsed.chars().take(SUMMARY_MAX_CHARS).collect());
        }
    }

    None
}
