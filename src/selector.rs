use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::llm::{CompletionClient, CompletionRequest};
use crate::models::{Catalog, CatalogTopic, SelectedTopic, UserProfile};
use crate::prompts;

// Compiled-in fallback catalog for static mode.
const DEFAULT_CATALOG: &str = include_str!("../data/topics.json");

/// Load the static catalog from `path`, or the compiled-in default when no
/// path is configured or the file does not exist.
pub fn load_catalog(path: Option<&Path>) -> Result<Vec<CatalogTopic>> {
    let raw = match path {
        Some(p) if p.exists() => std::fs::read_to_string(p)
            .map_err(|e| Error::Config(format!("cannot read catalog {}: {}", p.display(), e)))?,
        _ => DEFAULT_CATALOG.to_string(),
    };

    let catalog: Catalog = serde_json::from_str(&raw)
        .map_err(|e| Error::Config(format!("invalid catalog: {}", e)))?;
    Ok(catalog.topics)
}

/// Uniform random draw over catalog entries not yet in `history`.
/// Deterministic for a seeded RNG; fails with ExhaustedCatalog when every
/// entry has been learned.
pub fn select_static<R: Rng>(
    catalog: &[CatalogTopic],
    history: &HashSet<String>,
    rng: &mut R,
) -> Result<SelectedTopic> {
    let unused: Vec<&CatalogTopic> = catalog
        .iter()
        .filter(|t| !history.contains(&t.topic))
        .collect();

    let pick = unused.choose(rng).ok_or(Error::ExhaustedCatalog)?;
    Ok((*pick).clone().into())
}

/// Ask the completion service for a novel topic. The full history rides in
/// the prompt; the reply is re-validated against it locally, and rejected
/// candidates join the exclusion list before each retry. `max_retries`
/// bounds the extra attempts after the first call.
pub fn select_dynamic(
    llm: &dyn CompletionClient,
    history: &HashSet<String>,
    profile: &UserProfile,
    today: NaiveDate,
    max_retries: u32,
) -> Result<SelectedTopic> {
    let mut excluded: Vec<String> = history.iter().cloned().collect();
    excluded.sort();
    excluded.extend(profile.skip_topics.iter().cloned());

    let attempts = max_retries + 1;
    for attempt in 1..=attempts {
        let request = CompletionRequest {
            system: Some(prompts::topic_system_prompt(profile, &excluded)),
            user: prompts::topic_user_prompt(today, profile, history.len()),
            temperature: 0.9,
            max_tokens: 500,
        };

        let reply = llm.complete(&request)?;
        let candidate = parse_topic_reply(&reply)?;

        if excluded.iter().any(|t| t == &candidate.topic) {
            warn!(
                topic = %candidate.topic,
                attempt,
                "service returned an excluded topic, retrying"
            );
            excluded.push(candidate.topic);
            continue;
        }

        info!(topic = %candidate.topic, category = %candidate.category, "selected new topic");
        return Ok(candidate);
    }

    Err(Error::DuplicateTopic { attempts })
}

/// Parse the service's JSON reply, tolerating markdown code fences.
fn parse_topic_reply(reply: &str) -> Result<SelectedTopic> {
    let body = strip_code_fences(reply.trim());
    let topic: SelectedTopic = serde_json::from_str(body)
        .map_err(|e| Error::Service(format!("unparseable topic reply: {}", e)))?;

    if topic.topic.is_empty() {
        return Err(Error::Service("topic reply has an empty topic name".into()));
    }
    Ok(topic)
}

fn strip_code_fences(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\r', '\n']);
    rest.rsplit_once("```").map(|(body, _)| body).unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::FakeClient;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn catalog() -> Vec<CatalogTopic> {
        ["Attention", "LoRA", "KV Cache"]
            .iter()
            .map(|t| CatalogTopic {
                topic: t.to_string(),
                category: "Foundations".into(),
                tags: vec![],
            })
            .collect()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    mod static_tests {
        use super::*;

        #[test]
        fn empty_history_picks_from_catalog() {
            let mut rng = StdRng::seed_from_u64(7);
            let pick = select_static(&catalog(), &HashSet::new(), &mut rng).unwrap();
            assert!(catalog().iter().any(|t| t.topic == pick.topic));
        }

        #[test]
        fn deterministic_under_fixed_seed() {
            let history = HashSet::new();
            let a = select_static(&catalog(), &history, &mut StdRng::seed_from_u64(42)).unwrap();
            let b = select_static(&catalog(), &history, &mut StdRng::seed_from_u64(42)).unwrap();
            assert_eq!(a.topic, b.topic);
        }

        #[test]
        fn learned_topics_are_excluded() {
            let history: HashSet<String> =
                ["Attention".to_string(), "LoRA".to_string()].into_iter().collect();
            let mut rng = StdRng::seed_from_u64(0);
            let pick = select_static(&catalog(), &history, &mut rng).unwrap();
            assert_eq!(pick.topic, "KV Cache");
        }

        #[test]
        fn exhausted_catalog_is_an_error() {
            let history: HashSet<String> = catalog().iter().map(|t| t.topic.clone()).collect();
            let mut rng = StdRng::seed_from_u64(0);
            let result = select_static(&catalog(), &history, &mut rng);
            assert!(matches!(result, Err(Error::ExhaustedCatalog)));
        }

        #[test]
        fn default_catalog_parses() {
            let topics = load_catalog(None).unwrap();
            assert!(!topics.is_empty());
        }
    }

    mod dynamic_tests {
        use super::*;

        fn topic_json(name: &str) -> String {
            format!(
                r#"{{"topic": "{}", "category": "Efficiency", "why": "w", "difficulty": 4, "tags": []}}"#,
                name
            )
        }

        #[test]
        fn novel_topic_accepted_first_try() {
            let fake = FakeClient::with_replies(vec![Ok(topic_json("Flash Attention"))]);
            let pick = select_dynamic(
                &fake,
                &HashSet::new(),
                &UserProfile::default(),
                today(),
                2,
            )
            .unwrap();
            assert_eq!(pick.topic, "Flash Attention");
            assert_eq!(fake.prompts.borrow().len(), 1);
        }

        #[test]
        fn duplicate_then_novel_succeeds_within_retries() {
            let history: HashSet<String> = ["Old Topic".to_string()].into_iter().collect();
            let fake = FakeClient::with_replies(vec![
                Ok(topic_json("Old Topic")),
                Ok(topic_json("New Topic")),
            ]);

            let pick =
                select_dynamic(&fake, &history, &UserProfile::default(), today(), 2).unwrap();
            assert_eq!(pick.topic, "New Topic");
            assert_eq!(fake.prompts.borrow().len(), 2);
        }

        #[test]
        fn rejected_candidate_joins_exclusion_list() {
            let history: HashSet<String> = ["Old Topic".to_string()].into_iter().collect();
            let fake = FakeClient::with_replies(vec![
                Ok(topic_json("Old Topic")),
                Ok(topic_json("New Topic")),
            ]);

            select_dynamic(&fake, &history, &UserProfile::default(), today(), 2).unwrap();

            let prompts = fake.prompts.borrow();
            let second_system = prompts[1].system.as_deref().unwrap();
            assert!(second_system.contains("- Old Topic"));
        }

        #[test]
        fn exceeding_retries_is_duplicate_topic_error() {
            let history: HashSet<String> = ["Old Topic".to_string()].into_iter().collect();
            let fake = FakeClient::with_replies(vec![
                Ok(topic_json("Old Topic")),
                Ok(topic_json("Old Topic")),
                Ok(topic_json("Old Topic")),
            ]);

            let result = select_dynamic(&fake, &history, &UserProfile::default(), today(), 2);
            assert!(matches!(
                result,
                Err(Error::DuplicateTopic { attempts: 3 })
            ));
        }

        #[test]
        fn skip_topics_are_rejected_locally() {
            let profile = UserProfile {
                skip_topics: vec!["Tokenisation".into()],
                ..UserProfile::default()
            };
            let fake = FakeClient::with_replies(vec![
                Ok(topic_json("Tokenisation")),
                Ok(topic_json("Quantisation")),
            ]);

            let pick = select_dynamic(&fake, &HashSet::new(), &profile, today(), 2).unwrap();
            assert_eq!(pick.topic, "Quantisation");
        }

        #[test]
        fn service_failure_propagates() {
            let fake =
                FakeClient::with_replies(vec![Err(Error::Service("timed out".into()))]);
            let result =
                select_dynamic(&fake, &HashSet::new(), &UserProfile::default(), today(), 2);
            assert!(matches!(result, Err(Error::Service(_))));
        }
    }

    mod parse_tests {
        use super::*;

        #[test]
        fn parses_bare_json() {
            let t = parse_topic_reply(r#"{"topic": "MoE", "category": "Architecture"}"#).unwrap();
            assert_eq!(t.topic, "MoE");
        }

        #[test]
        fn parses_fenced_json() {
            let reply = "```json\n{\"topic\": \"MoE\", \"category\": \"Architecture\"}\n```";
            let t = parse_topic_reply(reply).unwrap();
            assert_eq!(t.topic, "MoE");
        }

        #[test]
        fn parses_fence_without_language_tag() {
            let reply = "```\n{\"topic\": \"MoE\", \"category\": \"Architecture\"}\n```";
            let t = parse_topic_reply(reply).unwrap();
            assert_eq!(t.topic, "MoE");
        }

        #[test]
        fn garbage_reply_is_service_error() {
            assert!(matches!(
                parse_topic_reply("I recommend learning about attention."),
                Err(Error::Service(_))
            ));
        }

        #[test]
        fn empty_topic_name_is_rejected() {
            assert!(matches!(
                parse_topic_reply(r#"{"topic": "", "category": "General"}"#),
                Err(Error::Service(_))
            ));
        }
    }
}
