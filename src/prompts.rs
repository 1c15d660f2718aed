use chrono::NaiveDate;

use crate::config::{category_description, category_emoji};
use crate::models::{KnowledgeCard, UserProfile};
use crate::scheduler;

pub fn topic_system_prompt(profile: &UserProfile, learned: &[String]) -> String {
    let learned_block = if learned.is_empty() {
        "- (no learning history yet)".to_string()
    } else {
        learned
            .iter()
            .map(|t| format!("- {}", t))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let background = if profile.background.is_empty() {
        "A curious engineer studying AI fundamentals."
    } else {
        &profile.background
    };

    format!(
        r#"You are a senior AI mentor who designs a personalised daily study plan.

## Learner profile
{background}
Preferred difficulty: {min} to {max} on a 1-10 scale.

## Your task
Recommend exactly ONE AI concept worth studying in depth today.

## Selection principles
1. Favour important recent advances or overlooked fundamentals.
2. Match the learner's difficulty range; no introductory fluff.
3. Cover theory, methods, systems and applications across days.
4. NEVER recommend a topic from the already-learned list below.

## Already learned (do not repeat)
{learned_block}

## Output format (strict JSON, nothing else)
{{"topic": "<concept name>", "category": "<one of: Foundations/Architecture/Training/Alignment/Efficiency/Multimodal/Agent/Generation/Application/Frontier>", "why": "<one sentence tied to the learner>", "difficulty": <1-10>, "tags": ["..."]}}"#,
        background = background,
        min = profile.min_difficulty,
        max = profile.max_difficulty,
        learned_block = learned_block,
    )
}

pub fn topic_user_prompt(today: NaiveDate, profile: &UserProfile, learned_count: usize) -> String {
    let mut prompt = format!(
        "Recommend today's AI study topic.\n\nDate: {}\nTopics learned so far: {}",
        today.format("%Y-%m-%d"),
        learned_count,
    );

    if !profile.interests.is_empty() {
        prompt.push_str(&format!(
            "\n\nI am currently focused on: {}",
            profile.interests.join(", ")
        ));
    }
    if !profile.skip_topics.is_empty() {
        prompt.push_str(&format!(
            "\nSkip these areas I already know well: {}",
            profile.skip_topics.join(", ")
        ));
    }

    prompt
}

pub fn lesson_system_prompt() -> String {
    r#"You are a technical writer producing a daily learning newsletter for an
AI practitioner. Write a focused markdown article on the given concept:
intuition first, then the mechanism, then where it matters in practice.
Use headings, keep it under 900 words, and end with a one-line summary
prefixed exactly with "**TL;DR**:" for quick recall."#
        .to_string()
}

pub fn lesson_user_prompt(topic: &str, category: &str, why: &str) -> String {
    let why = if why.is_empty() {
        "A concept worth studying in depth."
    } else {
        why
    };

    format!(
        "Topic: {}\nCategory: {} {} - {}\nWhy today: {}",
        topic,
        category_emoji(category),
        category,
        category_description(category),
        why,
    )
}

pub fn quiz_system_prompt() -> String {
    r#"You are an examiner running spaced-repetition reviews. Given a concept
the learner studied earlier, write ONE short active-recall question in
markdown, then the answer inside a collapsed <details> block so the learner
can self-check. Keep the whole thing under 200 words."#
        .to_string()
}

pub fn quiz_user_prompt(card: &KnowledgeCard) -> String {
    let summary = if card.summary.is_empty() {
        "(no stored summary)"
    } else {
        &card.summary
    };

    format!(
        "Concept: {}\nCategory: {} {}\nStored summary: {}\nFirst learned: {}\nReview round: {} (interval {} days)",
        card.topic,
        category_emoji(&card.category),
        card.category,
        summary,
        card.created_at.format("%Y-%m-%d"),
        card.review_stage + 1,
        scheduler::interval_for_stage(card.review_stage),
    )
}
