use std::{collections::HashMap, env, path::Path, str::FromStr, time::Duration};

use chrono::NaiveTime;

use crate::{
    domain::{ChatTarget, UserId},
    errors::Error,
    ledger::CounterReset,
    Result,
};

pub const DEFAULT_POST_PROMPT: &str =
    "Придумай короткий и ироничный пост в стиле 'Типо живу', на тему усталости, тревоги, жизни.";
pub const DEFAULT_IMAGE_KEYWORDS: [&str; 5] = ["tired", "anxiety", "life", "sadness", "urban"];
pub const DEFAULT_IMAGE_URL: &str = "https://placekitten.com/640/360";
pub const DEFAULT_POST_TIMES: &str = "09:00,12:00,15:00,18:00,21:00";

/// Typed configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    pub channel: ChatTarget,
    pub operator_id: UserId,

    // Text generation (OpenRouter, OpenAI-compatible API)
    pub openrouter_api_key: String,
    pub openrouter_base_url: String,
    pub text_model: String,
    pub post_prompt: String,

    // Images (Unsplash)
    pub unsplash_access_key: String,
    pub image_keywords: Vec<String>,
    pub default_image_url: String,

    // Schedule
    pub post_times: Vec<NaiveTime>,
    pub report_time: NaiveTime,
    pub sweep_interval: Duration,
    pub retention: Duration,
    pub poll_interval: Duration,

    // Runtime
    pub external_timeout: Duration,
    pub counter_reset: CounterReset,
}

impl Config {
    /// Load from the process environment (plus `.env` in the working directory).
    pub fn load() -> Result<Self> {
        Self::load_with_dotenv(Path::new(".env"), |key| env::var(key).ok())
    }

    /// Process variables win over `.env` entries; the process env is never modified.
    pub fn load_with_dotenv(
        dotenv: &Path,
        get: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let file = read_dotenv(dotenv)?;
        Self::from_lookup(|key| get(key).or_else(|| file.get(key).cloned()))
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = |key: &str| get(key).and_then(non_empty);

        // Required
        let telegram_bot_token = lookup("TELEGRAM_BOT_TOKEN")
            .or_else(|| lookup("BOT_TOKEN"))
            .ok_or_else(|| required("TELEGRAM_BOT_TOKEN"))?;
        let channel = lookup("CHANNEL_ID")
            .ok_or_else(|| required("CHANNEL_ID"))?
            .parse::<ChatTarget>()?;
        let operator_id = lookup("OPERATOR_USER_ID")
            .ok_or_else(|| required("OPERATOR_USER_ID"))?
            .trim()
            .parse::<i64>()
            .map(UserId)
            .map_err(|_| Error::Config("OPERATOR_USER_ID must be a numeric user id".to_string()))?;
        let openrouter_api_key = lookup("OPENROUTER_API_KEY")
            .or_else(|| lookup("OPENAI_API_KEY"))
            .ok_or_else(|| required("OPENROUTER_API_KEY"))?;
        let unsplash_access_key =
            lookup("UNSPLASH_ACCESS_KEY").ok_or_else(|| required("UNSPLASH_ACCESS_KEY"))?;

        // Providers
        let openrouter_base_url = lookup("OPENROUTER_BASE_URL")
            .unwrap_or_else(|| "https://openrouter.ai/api/v1".to_string())
            .trim_end_matches('/')
            .to_string();
        let text_model =
            lookup("TEXT_MODEL").unwrap_or_else(|| "mistralai/mixtral-8x7b-instruct".to_string());
        let post_prompt = lookup("POST_PROMPT").unwrap_or_else(|| DEFAULT_POST_PROMPT.to_string());

        let image_keywords = match lookup("IMAGE_KEYWORDS") {
            Some(raw) => parse_csv_lower(&raw),
            None => DEFAULT_IMAGE_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        };
        if image_keywords.is_empty() {
            return Err(Error::Config("IMAGE_KEYWORDS must not be empty".to_string()));
        }
        let default_image_url =
            lookup("DEFAULT_IMAGE_URL").unwrap_or_else(|| DEFAULT_IMAGE_URL.to_string());

        // Schedule
        let post_times =
            parse_times(&lookup("POST_TIMES").unwrap_or_else(|| DEFAULT_POST_TIMES.to_string()))?;
        let report_time = parse_time(&lookup("REPORT_TIME").unwrap_or_else(|| "22:00".to_string()))?;
        let sweep_interval = Duration::from_secs(parsed(&lookup, "SWEEP_INTERVAL_SECS")?.unwrap_or(3600));
        let retention_hours = parsed::<u64>(&lookup, "RETENTION_HOURS")?.unwrap_or(24);
        let retention = retention_hours
            .checked_mul(3600)
            .map(Duration::from_secs)
            .ok_or_else(|| {
                Error::Config(format!("RETENTION_HOURS is too large: {retention_hours}"))
            })?;
        let poll_interval =
            Duration::from_millis(parsed(&lookup, "POLL_INTERVAL_MS")?.unwrap_or(1000));
        if sweep_interval.is_zero() || poll_interval.is_zero() {
            return Err(Error::Config(
                "SWEEP_INTERVAL_SECS and POLL_INTERVAL_MS must be > 0".to_string(),
            ));
        }

        // Runtime
        let external_timeout =
            Duration::from_secs(parsed(&lookup, "EXTERNAL_TIMEOUT_SECS")?.unwrap_or(20));
        if external_timeout.is_zero() {
            return Err(Error::Config("EXTERNAL_TIMEOUT_SECS must be > 0".to_string()));
        }
        let counter_reset = parsed(&lookup, "COUNTER_RESET")?.unwrap_or_default();

        Ok(Self {
            telegram_bot_token,
            channel,
            operator_id,
            openrouter_api_key,
            openrouter_base_url,
            text_model,
            post_prompt,
            unsplash_access_key,
            image_keywords,
            default_image_url,
            post_times,
            report_time,
            sweep_interval,
            retention,
            poll_interval,
            external_timeout,
            counter_reset,
        })
    }
}

fn required(key: &str) -> Error {
    Error::Config(format!("{key} environment variable is required"))
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key} has an invalid value: {raw}")))
}

/// Parse `HH:MM` (24h clock).
pub fn parse_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| Error::Config(format!("invalid time of day (want HH:MM): {raw}")))
}

/// Parse a comma-separated list of `HH:MM` slots, sorted and deduplicated.
pub fn parse_times(raw: &str) -> Result<Vec<NaiveTime>> {
    let mut out = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_time)
        .collect::<Result<Vec<_>>>()?;
    out.sort();
    out.dedup();
    Ok(out)
}

fn read_dotenv(path: &Path) -> Result<HashMap<String, String>> {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) if e.not_found() => return Ok(HashMap::new()),
        Err(e) => return Err(Error::Config(format!("{}: {e}", path.display()))),
    };
    iter.map(|item| item.map_err(|e| Error::Config(format!("{}: {e}", path.display()))))
        .collect()
}

fn parse_csv_lower(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
