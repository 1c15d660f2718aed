use chrono::NaiveDate;
use pulldown_cmark::{html, Options, Parser};

use crate::config::category_emoji;
use crate::generator::{Lesson, ReviewItem};
use crate::models::{SelectedTopic, StoreStats};

// Inline styles so the email renders the same across clients.
const EMAIL_STYLES: &str = r#"<style>
body { font-family: -apple-system, 'Segoe UI', Roboto, 'Helvetica Neue', Arial, sans-serif;
       line-height: 1.6; color: #333; max-width: 700px; margin: 0 auto; padding: 20px;
       background-color: #f5f5f5; }
.container { background-color: #ffffff; border-radius: 8px; padding: 30px;
             box-shadow: 0 2px 4px rgba(0,0,0,0.1); }
h1 { color: #1a73e8; border-bottom: 2px solid #1a73e8; padding-bottom: 10px; }
h2 { color: #34a853; margin-top: 30px; }
h3 { color: #5f6368; margin-top: 20px; }
.category-badge { display: inline-block; padding: 4px 12px; border-radius: 16px;
                  font-size: 14px; font-weight: 500; margin-bottom: 15px;
                  background-color: #e8f0fe; color: #1967d2; }
pre { background-color: #f8f9fa; border: 1px solid #e8eaed; border-radius: 8px;
      padding: 16px; overflow-x: auto; font-size: 14px; }
code { font-family: 'Fira Code', 'Monaco', 'Consolas', monospace;
       background-color: #f1f3f4; padding: 2px 6px; border-radius: 4px; font-size: 0.9em; }
pre code { background-color: transparent; padding: 0; }
blockquote { border-left: 4px solid #1a73e8; margin: 16px 0; padding-left: 16px; color: #5f6368; }
.review-section { background-color: #fff8e1; border-left: 4px solid #f9a825;
                  padding: 16px; margin: 20px 0; border-radius: 0 8px 8px 0; }
.new-section { background-color: #e8f5e9; border-left: 4px solid #34a853;
               padding: 16px; margin: 20px 0; border-radius: 0 8px 8px 0; }
.review-card { margin: 20px 0; padding: 15px; background: white; border-radius: 8px; }
.footer { margin-top: 30px; padding-top: 20px; border-top: 1px solid #e8eaed;
          color: #5f6368; font-size: 12px; text-align: center; }
.stats { margin: 20px 0; padding: 15px; background-color: #f8f9fa; border-radius: 8px; }
.stat-value { font-size: 24px; font-weight: bold; color: #1a73e8; }
.stat-label { font-size: 12px; color: #5f6368; }
</style>"#;

pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut out, parser);
    out
}

pub fn subject(today: NaiveDate, new_topic: Option<&str>, review_count: usize) -> String {
    let mut parts = vec![format!("🧠 [{}] Daily Knowledge", today.format("%m/%d"))];
    if let Some(topic) = new_topic {
        parts.push(format!("New: {}", topic));
    }
    if review_count > 0 {
        parts.push(format!("Review: {}", review_count));
    }
    parts.join(" | ")
}

/// Render the full HTML body: stats strip, new-lesson section, review
/// section, empty-state fallback, footer.
pub fn render_html(
    today: NaiveDate,
    new: Option<(&SelectedTopic, &Lesson)>,
    reviews: &[ReviewItem],
    stats: &StoreStats,
) -> String {
    let mut parts = vec![format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
{styles}
</head>
<body>
<div class="container">
<h1>🧠 Daily Knowledge</h1>
<p style="color: #5f6368;">📅 {date}</p>
"#,
        styles = EMAIL_STYLES,
        date = today.format("%Y-%m-%d"),
    )];

    parts.push(format!(
        r#"<div class="stats">
<span class="stat-value">{}</span> <span class="stat-label">topics learned</span>
&nbsp;&nbsp;
<span class="stat-value">{}</span> <span class="stat-label">due today</span>
</div>
"#,
        stats.learned, stats.due_today,
    ));

    if let Some((topic, lesson)) = new {
        parts.push(format!(
            r#"<div class="new-section">
<h2>🌟 Today's New Topic</h2>
<span class="category-badge">{emoji} {category}</span>
<h3>{topic}</h3>
{body}
</div>
"#,
            emoji = category_emoji(&topic.category),
            category = escape(&topic.category),
            topic = escape(&topic.topic),
            body = markdown_to_html(&lesson.content),
        ));
    }

    if !reviews.is_empty() {
        parts.push(
            r#"<div class="review-section">
<h2>🔄 Today's Reviews</h2>
<p>Spaced-repetition picks scheduled for today:</p>
"#
            .to_string(),
        );
        for item in reviews {
            parts.push(format!(
                r#"<div class="review-card">
<span class="category-badge">{emoji} {category}</span>
{body}
</div>
"#,
                emoji = category_emoji(&item.card.category),
                category = escape(&item.card.category),
                body = markdown_to_html(&item.question),
            ));
        }
        parts.push("</div>\n".to_string());
    }

    if new.is_none() && reviews.is_empty() {
        parts.push(
            r#"<div style="text-align: center; padding: 40px;">
<p style="font-size: 48px;">🎉</p>
<h2>Nothing scheduled today</h2>
<p>No new topic and no reviews due.</p>
</div>
"#
            .to_string(),
        );
    }

    parts.push(
        r#"<div class="footer">
<p>📚 primer — daily knowledge digest</p>
<p>Spaced repetition on the Ebbinghaus forgetting curve</p>
</div>
</div>
</body>
</html>
"#
        .to_string(),
    );

    parts.concat()
}

/// Plain-text alternative part for clients that refuse HTML.
pub fn render_text(
    today: NaiveDate,
    new: Option<(&SelectedTopic, &Lesson)>,
    reviews: &[ReviewItem],
) -> String {
    let mut parts = vec![format!("Daily Knowledge - {}\n\n", today.format("%Y-%m-%d"))];

    if let Some((topic, lesson)) = new {
        parts.push(format!(
            "Today's new topic: {}\n\n{}\n\n",
            topic.topic, lesson.content
        ));
    }

    if !reviews.is_empty() {
        parts.push("Today's reviews:\n\n".to_string());
        let questions: Vec<&str> = reviews.iter().map(|r| r.question.as_str()).collect();
        parts.push(questions.join("\n---\n"));
        parts.push("\n".to_string());
    }

    if new.is_none() && reviews.is_empty() {
        parts.push("Nothing scheduled today.\n".to_string());
    }

    parts.concat()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
