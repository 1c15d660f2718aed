use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row in the knowledge_cards table. Created once per topic, mutated
/// only when the card is reviewed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeCard {
    pub id: i64,
    pub topic: String,
    pub category: String,
    pub summary: String,
    pub created_at: NaiveDate,
    pub next_review_date: NaiveDate,
    pub review_stage: i64,
}

// An entry in the static topic catalog (topics.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogTopic {
    pub topic: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub topics: Vec<CatalogTopic>,
}

/// A topic chosen for today, either drawn from the catalog or generated
/// by the completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedTopic {
    pub topic: String,
    pub category: String,
    #[serde(default)]
    pub why: String,
    #[serde(default)]
    pub difficulty: Option<u8>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<CatalogTopic> for SelectedTopic {
    fn from(t: CatalogTopic) -> Self {
        SelectedTopic {
            topic: t.topic,
            category: t.category,
            why: String::new(),
            difficulty: None,
            tags: t.tags,
        }
    }
}

fn default_min_difficulty() -> u8 {
    1
}

fn default_max_difficulty() -> u8 {
    10
}

/// Learner profile supplied to the topic generator. Read once per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub skip_topics: Vec<String>,
    #[serde(default = "default_min_difficulty")]
    pub min_difficulty: u8,
    #[serde(default = "default_max_difficulty")]
    pub max_difficulty: u8,
}

impl Default for UserProfile {
    fn default() -> Self {
        UserProfile {
            background: String::new(),
            interests: Vec::new(),
            skip_topics: Vec::new(),
            min_difficulty: default_min_difficulty(),
            max_difficulty: default_max_difficulty(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub learned: i64,
    pub due_today: i64,
    pub by_category: Vec<(String, i64)>,
}
