use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};

use crate::error::{Error, Result};
use crate::models::{KnowledgeCard, StoreStats};
use crate::scheduler;

/// Owns the knowledge_cards table. All mutation goes through this type;
/// the rest of the pipeline only reads snapshots.
pub struct Database {
    conn: Connection,
}

/// New card to insert when a run commits.
pub struct NewLearning<'a> {
    pub topic: &'a str,
    pub category: &'a str,
    pub summary: &'a str,
}

/// Rows written by a committed run.
pub struct RunCommit {
    pub new_card: Option<KnowledgeCard>,
    pub reviewed: Vec<KnowledgeCard>,
}

fn card_from_row(row: &Row) -> rusqlite::Result<KnowledgeCard> {
    Ok(KnowledgeCard {
        id: row.get(0)?,
        topic: row.get(1)?,
        category: row.get(2)?,
        summary: row.get(3)?,
        created_at: row.get(4)?,
        next_review_date: row.get(5)?,
        review_stage: row.get(6)?,
    })
}

const CARD_COLUMNS: &str =
    "id, topic, category, summary, created_at, next_review_date, review_stage";

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::Config(format!("cannot create db directory: {}", e)))?;
            }
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS knowledge_cards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                topic TEXT NOT NULL UNIQUE,
                category TEXT NOT NULL,
                summary TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                next_review_date TEXT NOT NULL,
                review_stage INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_cards_next_review
            ON knowledge_cards(next_review_date);
            "#,
        )?;
        Ok(())
    }

    pub fn learned_topics(&self) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT topic FROM knowledge_cards")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<HashSet<String>>>()?)
    }

    pub fn all_cards(&self) -> Result<Vec<KnowledgeCard>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM knowledge_cards ORDER BY created_at DESC, id DESC",
            CARD_COLUMNS
        ))?;
        let rows = stmt.query_map([], card_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn card_by_topic(&self, topic: &str) -> Result<Option<KnowledgeCard>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM knowledge_cards WHERE topic = ?1",
            CARD_COLUMNS
        ))?;

        match stmt.query_row(params![topic], card_from_row) {
            Ok(card) => Ok(Some(card)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Insert a new card with its first review scheduled.
    pub fn add_card(&self, new: &NewLearning, created_at: NaiveDate) -> Result<KnowledgeCard> {
        Self::insert_card(&self.conn, new, created_at)
    }

    fn insert_card(
        conn: &Connection,
        new: &NewLearning,
        created_at: NaiveDate,
    ) -> Result<KnowledgeCard> {
        let next_review = scheduler::first_review(created_at);
        conn.execute(
            r#"
            INSERT INTO knowledge_cards
            (topic, category, summary, created_at, next_review_date, review_stage)
            VALUES (?1, ?2, ?3, ?4, ?5, 0)
            "#,
            params![new.topic, new.category, new.summary, created_at, next_review],
        )?;

        Ok(KnowledgeCard {
            id: conn.last_insert_rowid(),
            topic: new.topic.to_string(),
            category: new.category.to_string(),
            summary: new.summary.to_string(),
            created_at,
            next_review_date: next_review,
            review_stage: 0,
        })
    }

    /// Commit the run's writes atomically: the new card and every review
    /// stage update land together or not at all.
    pub fn commit_run(
        &self,
        new: Option<&NewLearning>,
        reviewed_ids: &[i64],
        today: NaiveDate,
    ) -> Result<RunCommit> {
        let tx = self.conn.unchecked_transaction()?;

        let new_card = match new {
            Some(learning) => Some(Self::insert_card(&tx, learning, today)?),
            None => None,
        };

        let mut reviewed = Vec::with_capacity(reviewed_ids.len());
        for &id in reviewed_ids {
            let mut card = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {} FROM knowledge_cards WHERE id = ?1",
                    CARD_COLUMNS
                ))?;
                stmt.query_row(params![id], card_from_row)?
            };

            let (stage, next) = scheduler::advance_stage(card.review_stage, today);
            tx.execute(
                "UPDATE knowledge_cards SET review_stage = ?1, next_review_date = ?2 WHERE id = ?3",
                params![stage, next, id],
            )?;

            card.review_stage = stage;
            card.next_review_date = next;
            reviewed.push(card);
        }

        tx.commit()?;
        Ok(RunCommit { new_card, reviewed })
    }

    pub fn stats(&self, today: NaiveDate) -> Result<StoreStats> {
        let learned: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM knowledge_cards", [], |row| row.get(0))?;

        let due_today: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM knowledge_cards WHERE next_review_date <= ?1",
            params![today],
            |row| row.get(0),
        )?;

        let mut stmt = self.conn.prepare(
            r#"
            SELECT category, COUNT(*) AS n
            FROM knowledge_cards
            GROUP BY category
            ORDER BY n DESC, category
            "#,
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let by_category = rows.collect::<rusqlite::Result<Vec<(String, i64)>>>()?;

        Ok(StoreStats {
            learned,
            due_today,
            by_category,
        })
    }
}
