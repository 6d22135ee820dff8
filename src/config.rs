//! Application-level configuration loaded from the environment.

use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use thiserror::Error;
use tracing::{info, warn};

use crate::{
    dao::quiz_store::supabase::SupabaseConfig,
    judge::OpenAiConfig,
    state::question::PointTable,
    transport::{ChannelId, UserId, discord::DiscordConfig},
};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_TOPICS_PATH: &str = "topics.txt";

/// Failures raised while reading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing or blank.
    #[error("missing environment variable `{var}`")]
    MissingEnvVar {
        /// Variable name.
        var: &'static str,
    },
    /// Variable is present but cannot be parsed.
    #[error("invalid value `{value}` for `{var}`: {reason}")]
    InvalidValue {
        /// Variable name.
        var: &'static str,
        /// Raw value as read.
        value: String,
        /// Parser message.
        reason: String,
    },
}

/// Where quiz topics come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicCatalog {
    /// One topic per line; re-read before every question so edits apply without a restart.
    File(PathBuf),
    /// Fixed list, used by tests and embedders.
    Inline(Vec<String>),
}

impl TopicCatalog {
    /// Current topics, blank lines dropped. Empty when the file cannot be read.
    pub async fn load(&self) -> Vec<String> {
        match self {
            TopicCatalog::Inline(topics) => topics.clone(),
            TopicCatalog::File(path) => match tokio::fs::read_to_string(path).await {
                Ok(contents) => {
                    let topics = parse_topics(&contents);
                    if topics.is_empty() {
                        warn!(path = %path.display(), "topics file contains no topics");
                    }
                    topics
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to read topics file");
                    Vec::new()
                }
            },
        }
    }

    /// Label shown to admins when no topic could be loaded.
    pub fn describe(&self) -> String {
        match self {
            TopicCatalog::File(path) => path.display().to_string(),
            TopicCatalog::Inline(_) => "built-in topic list".into(),
        }
    }
}

fn parse_topics(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Quiz rules: timeouts, attempt budget and scoring.
#[derive(Debug, Clone)]
pub struct QuizRules {
    /// Unresolved questions idle for longer than this are skipped.
    pub inactivity_timeout: Duration,
    /// Period of the inactivity watchdog.
    pub watchdog_interval: Duration,
    /// Answers each player may submit per question.
    pub max_attempts: u32,
    /// Points awarded per difficulty tier.
    pub points: PointTable,
    /// Subtracted from the score on every incorrect answer.
    pub incorrect_penalty: i64,
    /// Rows shown by `/leaderboard`.
    pub leaderboard_limit: usize,
}

impl Default for QuizRules {
    fn default() -> Self {
        Self {
            inactivity_timeout: Duration::from_secs(2 * 3600),
            watchdog_interval: Duration::from_secs(15 * 60),
            max_attempts: 5,
            points: PointTable::default(),
            incorrect_penalty: 2,
            leaderboard_limit: 10,
        }
    }
}

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Chat platform credentials.
    pub discord: DiscordConfig,
    /// Language model settings.
    pub openai: OpenAiConfig,
    /// Score store location and key.
    pub supabase: SupabaseConfig,
    /// Attempts per store call, including the first.
    pub db_max_attempts: u32,
    /// Channel questions are posted to; `None` disables auto-posting.
    pub quiz_channel: Option<ChannelId>,
    /// Users allowed to run privileged commands; empty means owner only.
    pub admin_ids: Vec<UserId>,
    /// Timeouts, attempt budget and scoring.
    pub rules: QuizRules,
    /// Source of quiz topics.
    pub topics: TopicCatalog,
    /// Resume the most recent open session when the store comes up.
    pub restore_open_session: bool,
    /// HTTP listen port.
    pub port: u16,
}

impl AppConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Lookup(lookup);

        let mut discord = DiscordConfig::new(
            vars.required("DISCORD_BOT_TOKEN")?,
            vars.required_parsed::<u64>("DISCORD_APPLICATION_ID")?,
            vars.required("DISCORD_PUBLIC_KEY")?,
        );
        if let Some(api_base) = vars.get("DISCORD_API_BASE") {
            discord = discord.with_api_base(api_base);
        }

        let openai = OpenAiConfig::new(
            vars.required("OPENAI_API_KEY")?,
            vars.get("OPENAI_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            vars.parsed_or("OPENAI_MAX_RETRIES", 10u32)?,
        );

        let supabase = SupabaseConfig::new(
            vars.required("SUPABASE_URL")?,
            vars.required("SUPABASE_KEY")?,
        );

        let defaults = QuizRules::default();
        let rules = QuizRules {
            inactivity_timeout: hours(
                vars.parsed_or("QUESTION_INACTIVITY_TIMEOUT_HOURS", 2.0f64)?,
                "QUESTION_INACTIVITY_TIMEOUT_HOURS",
            )?,
            watchdog_interval: Duration::from_secs(
                vars.parsed_or("WATCHDOG_INTERVAL_MINUTES", 15u64)?.max(1) * 60,
            ),
            max_attempts: vars.parsed_or("MAX_ATTEMPTS_PER_QUESTION", defaults.max_attempts)?,
            points: PointTable {
                easy: vars.parsed_or("POINTS_EASY", defaults.points.easy)?,
                medium: vars.parsed_or("POINTS_MEDIUM", defaults.points.medium)?,
                difficult: vars.parsed_or("POINTS_DIFFICULT", defaults.points.difficult)?,
            },
            incorrect_penalty: vars
                .parsed_or("POINTS_DEDUCTION_INCORRECT", defaults.incorrect_penalty)?,
            leaderboard_limit: vars.parsed_or("LEADERBOARD_LIMIT", defaults.leaderboard_limit)?,
        };

        let quiz_channel = match vars.get("QUIZ_CHANNEL_ID") {
            Some(raw) => match raw.parse::<ChannelId>() {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!(value = %raw, "QUIZ_CHANNEL_ID is invalid; questions will not be posted");
                    None
                }
            },
            None => {
                warn!("QUIZ_CHANNEL_ID is not set; questions will not be posted");
                None
            }
        };

        let admin_ids = parse_admin_ids(vars.get("ADMIN_USER_IDS").as_deref());
        if admin_ids.is_empty() {
            warn!("ADMIN_USER_IDS is not set; privileged commands are restricted to the bot owner");
        }

        let topics = TopicCatalog::File(PathBuf::from(
            vars.get("TOPICS_FILE_PATH")
                .unwrap_or_else(|| DEFAULT_TOPICS_PATH.to_owned()),
        ));

        let port = match vars.get("PORT") {
            Some(_) => vars.parsed_or("PORT", DEFAULT_PORT)?,
            None => vars.parsed_or("SERVER_PORT", DEFAULT_PORT)?,
        };

        let config = Self {
            discord,
            openai,
            supabase,
            db_max_attempts: vars.parsed_or("DB_MAX_RETRIES", 10u32)?,
            quiz_channel,
            admin_ids,
            rules,
            topics,
            restore_open_session: vars.parsed_or("RESTORE_OPEN_SESSION", true)?,
            port,
        };

        info!(
            channel = ?config.quiz_channel,
            admins = config.admin_ids.len(),
            topics = %config.topics.describe(),
            model = %config.openai.model,
            "configuration loaded"
        );
        Ok(config)
    }
}

struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, var: &str) -> Option<String> {
        (self.0)(var)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, var: &'static str) -> Result<String, ConfigError> {
        self.get(var).ok_or(ConfigError::MissingEnvVar { var })
    }

    fn required_parsed<T>(&self, var: &'static str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.required(var)?;
        parse_value(var, raw)
    }

    fn parsed_or<T>(&self, var: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(var) {
            Some(raw) => parse_value(var, raw),
            None => Ok(default),
        }
    }
}

fn parse_value<T>(var: &'static str, raw: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse::<T>().map_err(|err| ConfigError::InvalidValue {
        var,
        reason: err.to_string(),
        value: raw,
    })
}

fn hours(value: f64, var: &'static str) -> Result<Duration, ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
            reason: "must be a positive number of hours".into(),
        });
    }
    Duration::try_from_secs_f64(value * 3600.0).map_err(|err| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
        reason: err.to_string(),
    })
}

fn parse_admin_ids(raw: Option<&str>) -> Vec<UserId> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| match part.parse::<UserId>() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!(value = %part, "ignoring non-numeric admin id");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 6] = [
        ("DISCORD_BOT_TOKEN", "token"),
        ("DISCORD_APPLICATION_ID", "1234"),
        ("DISCORD_PUBLIC_KEY", "abcd"),
        ("OPENAI_API_KEY", "sk-test"),
        ("SUPABASE_URL", "https://example.supabase.co"),
        ("SUPABASE_KEY", "service-key"),
    ];

    #[test]
    fn defaults_apply_when_only_credentials_are_set() {
        let config = AppConfig::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(config.rules.inactivity_timeout, Duration::from_secs(7200));
        assert_eq!(config.rules.watchdog_interval, Duration::from_secs(900));
        assert_eq!(config.rules.max_attempts, 5);
        assert_eq!(config.rules.points, PointTable::default());
        assert_eq!(config.rules.incorrect_penalty, 2);
        assert_eq!(config.openai.model, "gpt-3.5-turbo");
        assert_eq!(config.openai.max_attempts, 10);
        assert_eq!(config.db_max_attempts, 10);
        assert_eq!(config.topics, TopicCatalog::File("topics.txt".into()));
        assert_eq!(config.quiz_channel, None);
        assert!(config.admin_ids.is_empty());
        assert!(config.restore_open_session);
        assert_eq!(config.discord.api_base, crate::transport::discord::DEFAULT_API_BASE);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn missing_credential_is_fatal() {
        let pairs: Vec<_> = REQUIRED
            .into_iter()
            .filter(|(key, _)| *key != "OPENAI_API_KEY")
            .collect();
        let err = AppConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingEnvVar {
                var: "OPENAI_API_KEY"
            }
        ));
    }

    #[test]
    fn malformed_tunable_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("MAX_ATTEMPTS_PER_QUESTION", "five"));
        let err = AppConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                var: "MAX_ATTEMPTS_PER_QUESTION",
                ..
            }
        ));
    }

    #[test]
    fn overrides_and_id_lists_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("QUIZ_CHANNEL_ID", "555"),
            ("ADMIN_USER_IDS", "1, 2,not-a-number,,3"),
            ("QUESTION_INACTIVITY_TIMEOUT_HOURS", "0.5"),
            ("POINTS_DIFFICULT", "8"),
            ("SERVER_PORT", "9000"),
            ("DISCORD_API_BASE", "http://localhost:3001/api"),
        ]);
        let config = AppConfig::from_lookup(lookup(&pairs)).unwrap();

        assert_eq!(config.quiz_channel, Some(ChannelId(555)));
        assert_eq!(config.admin_ids, vec![UserId(1), UserId(2), UserId(3)]);
        assert_eq!(config.rules.inactivity_timeout, Duration::from_secs(1800));
        assert_eq!(config.rules.points.difficult, 8);
        assert_eq!(config.port, 9000);
        assert_eq!(config.discord.api_base, "http://localhost:3001/api");
    }

    #[test]
    fn topics_skip_blank_lines() {
        assert_eq!(
            parse_topics("Bitcoin basics\n\n  Lightning Network  \n"),
            vec!["Bitcoin basics".to_string(), "Lightning Network".to_string()]
        );
    }

    #[tokio::test]
    async fn unreadable_topics_file_yields_no_topics() {
        let catalog = TopicCatalog::File("/definitely/not/here/topics.txt".into());
        assert!(catalog.load().await.is_empty());
    }

    #[tokio::test]
    async fn topics_file_is_read_on_every_load() {
        let path = std::env::temp_dir().join(format!("quiz-topics-{}.txt", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, "Mining\n\n").await.unwrap();
        let catalog = TopicCatalog::File(path.clone());
        assert_eq!(catalog.load().await, vec!["Mining".to_string()]);

        tokio::fs::write(&path, "Mining\nHalving\n").await.unwrap();
        assert_eq!(catalog.load().await.len(), 2);
        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[test]
    fn absurd_inactivity_timeout_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("QUESTION_INACTIVITY_TIMEOUT_HOURS", "1e300"));
        let err = AppConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                var: "QUESTION_INACTIVITY_TIMEOUT_HOURS",
                ..
            }
        ));
    }
}
