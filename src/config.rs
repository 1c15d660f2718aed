use std::env;
use std::fs;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::models::UserProfile;

const DEFAULT_DB_NAME: &str = "primer.db";

// Content categories with an emoji badge and a one-line description, used
// in prompts and email badges.
pub const CATEGORIES: &[(&str, &str, &str)] = &[
    ("Foundations", "🟢", "Math and first principles"),
    ("Engineering", "🔵", "Systems and production practice"),
    ("Architecture", "🏗️", "Model architecture innovations"),
    ("Training", "⚙️", "Training methods and tricks"),
    ("Alignment", "🎯", "Alignment and safety"),
    ("Efficiency", "⚡", "Efficient inference and deployment"),
    ("Multimodal", "🎨", "Multimodal learning"),
    ("Agent", "🤖", "Agent systems"),
    ("Generation", "✨", "Generative models"),
    ("Application", "💼", "Applied domains"),
    ("Frontier", "🚀", "Frontier topics"),
    ("History", "🟡", "History and industry lore"),
    ("General", "📚", "General knowledge"),
];

pub fn category_emoji(category: &str) -> &'static str {
    CATEGORIES
        .iter()
        .find(|(name, _, _)| *name == category)
        .map(|(_, emoji, _)| *emoji)
        .unwrap_or("📚")
}

pub fn category_description(category: &str) -> &'static str {
    CATEGORIES
        .iter()
        .find(|(name, _, _)| *name == category)
        .map(|(_, _, desc)| *desc)
        .unwrap_or("General knowledge")
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    /// Comma-separated list of recipients.
    pub to: String,
}

/// Immutable run configuration, loaded once from the environment and passed
/// by reference into the pipeline and its collaborators.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub smtp: SmtpConfig,
    pub db_path: PathBuf,
    pub catalog_path: Option<PathBuf>,
    pub profile: UserProfile,
    /// Extra generation attempts when the service returns a duplicate topic.
    pub max_topic_retries: u32,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn default_db_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("primer");

    fs::create_dir_all(&config_dir).ok();
    config_dir.join(DEFAULT_DB_NAME)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let db_path = env::var("PRIMER_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_db_path());

        let catalog_path = env::var("PRIMER_CATALOG").ok().map(PathBuf::from);

        let profile = match env::var("PRIMER_PROFILE") {
            Ok(path) => load_profile(&PathBuf::from(path))?,
            Err(_) => UserProfile::default(),
        };

        let temperature: f64 = env_or("OPENAI_TEMPERATURE", "0.7")
            .parse()
            .map_err(|_| Error::Config("OPENAI_TEMPERATURE is not a number".into()))?;
        let max_tokens: u32 = env_or("OPENAI_MAX_TOKENS", "3000")
            .parse()
            .map_err(|_| Error::Config("OPENAI_MAX_TOKENS is not an integer".into()))?;
        let smtp_port: u16 = env_or("SMTP_PORT", "587")
            .parse()
            .map_err(|_| Error::Config("SMTP_PORT is not a valid port".into()))?;

        Ok(Config {
            llm: LlmConfig {
                api_key: env_or("OPENAI_API_KEY", ""),
                base_url: env_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
                model: env_or("OPENAI_MODEL", "gpt-4o-mini"),
                temperature,
                max_tokens,
            },
            smtp: SmtpConfig {
                server: env_or("SMTP_SERVER", "smtp.gmail.com"),
                port: smtp_port,
                username: env_or("SMTP_USERNAME", ""),
                password: env_or("SMTP_PASSWORD", ""),
                from: env_or("EMAIL_FROM", ""),
                to: env_or("EMAIL_TO", ""),
            },
            db_path,
            catalog_path,
            profile,
            max_topic_retries: 2,
        })
    }

    /// Returns the list of missing or invalid settings. Empty means the
    /// config can reach both external services.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.llm.api_key.is_empty() {
            problems.push("OPENAI_API_KEY is not set".to_string());
        }
        if self.smtp.username.is_empty() || self.smtp.password.is_empty() {
            problems.push("SMTP credentials are not configured".to_string());
        }
        if self.smtp.from.is_empty() || self.smtp.to.is_empty() {
            problems.push("Email addresses are not configured".to_string());
        }

        problems
    }
}

fn load_profile(path: &PathBuf) -> Result<UserProfile> {
    let raw = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read profile {}: {}", path.display(), e)))?;
    serde_json::from_str(&raw)
        .map_err(|e| Error::Config(format!("invalid profile {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    mod category_tests {
        use super::*;

        #[test]
        fn known_category_has_emoji() {
            assert_eq!(category_emoji("Foundations"), "🟢");
            assert_eq!(category_emoji("Efficiency"), "⚡");
        }

        #[test]
        fn unknown_category_falls_back() {
            assert_eq!(category_emoji("Nonsense"), "📚");
            assert_eq!(category_description("Nonsense"), "General knowledge");
        }
    }

    mod validate_tests {
        use super::*;

        fn empty_config() -> Config {
            Config {
                llm: LlmConfig {
                    api_key: String::new(),
                    base_url: "https://api.openai.com/v1".into(),
                    model: "gpt-4o-mini".into(),
                    temperature: 0.7,
                    max_tokens: 3000,
                },
                smtp: SmtpConfig {
                    server: "smtp.gmail.com".into(),
                    port: 587,
                    username: String::new(),
                    password: String::new(),
                    from: String::new(),
                    to: String::new(),
                },
                db_path: PathBuf::from("/tmp/primer.db"),
                catalog_path: None,
                profile: UserProfile::default(),
                max_topic_retries: 2,
            }
        }

        #[test]
        fn empty_config_reports_all_problems() {
            let problems = empty_config().validate();
            assert_eq!(problems.len(), 3);
        }

        #[test]
        fn complete_config_validates() {
            let mut config = empty_config();
            config.llm.api_key = "sk-test".into();
            config.smtp.username = "user".into();
            config.smtp.password = "pass".into();
            config.smtp.from = "a@example.com".into();
            config.smtp.to = "b@example.com".into();
            assert!(config.validate().is_empty());
        }
    }

    mod profile_loading_tests {
        use super::*;

        #[test]
        fn loads_profile_from_file() {
            let mut f = tempfile::NamedTempFile::new().unwrap();
            write!(
                f,
                r#"{{"background": "grad student", "interests": ["inference"],
                    "skip_topics": ["intro to python"], "min_difficulty": 3}}"#
            )
            .unwrap();

            let profile = load_profile(&f.path().to_path_buf()).unwrap();
            assert_eq!(profile.background, "grad student");
            assert_eq!(profile.min_difficulty, 3);
            assert_eq!(profile.max_difficulty, 10);
        }

        #[test]
        fn missing_profile_file_is_config_error() {
            let result = load_profile(&PathBuf::from("/nonexistent/profile.json"));
            assert!(matches!(result, Err(Error::Config(_))));
        }
    }
}
