use chrono::{Duration, NaiveDate};

use crate::models::KnowledgeCard;

// Spaced-repetition intervals in days, indexed by review stage. Stage k
// means the next review falls intervals[k] days after the last review
// (or creation, for stage 0).
pub const REVIEW_INTERVALS: [i64; 7] = [1, 2, 4, 7, 15, 30, 60];

// A card past the last interval is "graduated": its stage is capped one
// past the final index and the next review is pushed a year out.
pub const GRADUATED_INTERVAL_DAYS: i64 = 365;

pub fn graduated_stage() -> i64 {
    REVIEW_INTERVALS.len() as i64
}

/// Scheduled date of the first review for a card created on `created_at`.
pub fn first_review(created_at: NaiveDate) -> NaiveDate {
    created_at + Duration::days(REVIEW_INTERVALS[0])
}

/// All cards due on or before `today`, ordered by next review date then id
/// so output is deterministic for a given store snapshot.
pub fn due_reviews(today: NaiveDate, cards: &[KnowledgeCard]) -> Vec<KnowledgeCard> {
    let mut due: Vec<KnowledgeCard> = cards
        .iter()
        .filter(|c| c.next_review_date <= today)
        .cloned()
        .collect();
    due.sort_by(|a, b| {
        a.next_review_date
            .cmp(&b.next_review_date)
            .then(a.id.cmp(&b.id))
    });
    due
}

/// Stage and next review date after a successful review on `today`.
pub fn advance_stage(stage: i64, today: NaiveDate) -> (i64, NaiveDate) {
    let next_stage = stage + 1;
    if (next_stage as usize) < REVIEW_INTERVALS.len() {
        (
            next_stage,
            today + Duration::days(REVIEW_INTERVALS[next_stage as usize]),
        )
    } else {
        (
            graduated_stage(),
            today + Duration::days(GRADUATED_INTERVAL_DAYS),
        )
    }
}

/// The interval a card at `stage` was scheduled with, for display.
pub fn interval_for_stage(stage: i64) -> i64 {
    REVIEW_INTERVALS
        .get(stage as usize)
        .copied()
        .unwrap_or(GRADUATED_INTERVAL_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn card(id: i64, created: NaiveDate, next: NaiveDate, stage: i64) -> KnowledgeCard {
        KnowledgeCard {
            id,
            topic: format!("topic-{}", id),
            category: "General".into(),
            summary: String::new(),
            created_at: created,
            next_review_date: next,
            review_stage: stage,
        }
    }

    mod due_reviews_tests {
        use super::*;

        #[test]
        fn empty_store_returns_empty() {
            let today = date(2025, 1, 1);
            assert!(due_reviews(today, &[]).is_empty());
        }

        #[test]
        fn card_due_exactly_today_is_included() {
            let today = date(2025, 1, 2);
            let cards = vec![card(1, date(2025, 1, 1), today, 0)];
            assert_eq!(due_reviews(today, &cards).len(), 1);
        }

        #[test]
        fn overdue_card_is_included() {
            let today = date(2025, 1, 10);
            let cards = vec![card(1, date(2025, 1, 1), date(2025, 1, 2), 0)];
            assert_eq!(due_reviews(today, &cards).len(), 1);
        }

        #[test]
        fn future_card_is_excluded() {
            let today = date(2025, 1, 1);
            let cards = vec![card(1, today, date(2025, 1, 2), 0)];
            assert!(due_reviews(today, &cards).is_empty());
        }

        #[test]
        fn output_sorted_by_date_then_id() {
            let today = date(2025, 2, 1);
            let cards = vec![
                card(3, date(2025, 1, 1), date(2025, 1, 5), 1),
                card(1, date(2025, 1, 1), date(2025, 1, 5), 1),
                card(2, date(2025, 1, 1), date(2025, 1, 2), 0),
            ];
            let due = due_reviews(today, &cards);
            let ids: Vec<i64> = due.iter().map(|c| c.id).collect();
            assert_eq!(ids, vec![2, 1, 3]);
        }

        #[test]
        fn idempotent_for_same_snapshot_and_date() {
            let today = date(2025, 2, 1);
            let cards = vec![
                card(1, date(2025, 1, 1), date(2025, 1, 5), 1),
                card(2, date(2025, 1, 1), date(2025, 3, 1), 2),
            ];
            assert_eq!(due_reviews(today, &cards), due_reviews(today, &cards));
        }
    }

    mod stage_tests {
        use super::*;

        #[test]
        fn first_review_is_one_day_after_creation() {
            let created = date(2025, 1, 1);
            assert_eq!(first_review(created), date(2025, 1, 2));
        }

        #[test]
        fn stage_zero_reviewed_moves_to_stage_one() {
            // Card created D1, due D1+1, reviewed that day: next review
            // lands at D1 + 1 + intervals[1] = D1 + 3.
            let d1 = date(2025, 1, 1);
            let review_day = d1 + Duration::days(1);
            let (stage, next) = advance_stage(0, review_day);
            assert_eq!(stage, 1);
            assert_eq!(next, d1 + Duration::days(3));
        }

        #[test]
        fn intermediate_stages_use_interval_table() {
            let today = date(2025, 6, 1);
            let (stage, next) = advance_stage(3, today);
            assert_eq!(stage, 4);
            assert_eq!(next, today + Duration::days(15));
        }

        #[test]
        fn final_stage_graduates() {
            let today = date(2025, 6, 1);
            let last = REVIEW_INTERVALS.len() as i64 - 1;
            let (stage, next) = advance_stage(last, today);
            assert_eq!(stage, graduated_stage());
            assert_eq!(next, today + Duration::days(GRADUATED_INTERVAL_DAYS));
        }

        #[test]
        fn graduated_card_stays_graduated() {
            let today = date(2025, 6, 1);
            let (stage, next) = advance_stage(graduated_stage(), today);
            assert_eq!(stage, graduated_stage());
            assert_eq!(next, today + Duration::days(GRADUATED_INTERVAL_DAYS));
        }

        #[test]
        fn next_review_never_before_review_day() {
            let today = date(2025, 6, 1);
            for stage in 0..=graduated_stage() {
                let (_, next) = advance_stage(stage, today);
                assert!(next > today);
            }
        }

        #[test]
        fn interval_for_stage_past_table_is_graduated() {
            assert_eq!(interval_for_stage(0), 1);
            assert_eq!(interval_for_stage(6), 60);
            assert_eq!(interval_for_stage(7), GRADUATED_INTERVAL_DAYS);
        }
    }
}
