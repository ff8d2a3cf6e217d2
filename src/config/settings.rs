// src/config/settings.rs
use anyhow::{anyhow, Context, Result};
use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::providers::news_api::DEFAULT_NEWS_API_URL;
use crate::ingest::providers::topic_search::DEFAULT_TOPIC_SEARCH_URL;

pub const ENV_CONFIG_PATH: &str = "BRIEFING_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/briefing.toml";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageSettings {
    pub topics_path: PathBuf,
    pub sources_path: PathBuf,
    pub cache_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            topics_path: PathBuf::from("data/topics.json"),
            sources_path: PathBuf::from("data/news_sources.json"),
            cache_path: PathBuf::from("data/news_cache.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FetchSettings {
    pub news_api_url: String,
    pub topic_search_url: String,
    pub timeout_secs: u64,
    pub validate_timeout_secs: u64,
    /// Secret; environment only.
    #[serde(skip)]
    pub news_api_key: Option<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            news_api_url: DEFAULT_NEWS_API_URL.to_string(),
            topic_search_url: DEFAULT_TOPIC_SEARCH_URL.to_string(),
            timeout_secs: 10,
            validate_timeout_secs: 5,
            news_api_key: None,
        }
    }
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate_timeout(&self) -> Duration {
        Duration::from_secs(self.validate_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EmailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub timeout_secs: u64,
    #[serde(skip)]
    pub user: Option<String>,
    #[serde(skip)]
    pub password: Option<String>,
    #[serde(skip)]
    pub receiver: Option<String>,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            timeout_secs: 30,
            user: None,
            password: None,
            receiver: None,
        }
    }
}

/// Sender, secret and recipient; present only when all three are set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailCredentials {
    pub user: String,
    pub password: String,
    pub receiver: String,
}

impl EmailSettings {
    pub fn credentials(&self) -> Option<MailCredentials> {
        Some(MailCredentials {
            user: self.user.clone()?,
            password: self.password.clone()?,
            receiver: self.receiver.clone()?,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScheduleSettings {
    pub enabled: bool,
    pub hour: u32,
    pub minute: u32,
    pub timezone: String,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            hour: 8,
            minute: 0,
            timezone: "US/Eastern".to_string(),
        }
    }
}

impl ScheduleSettings {
    pub fn time_of_day(&self) -> Result<NaiveTime> {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0)
            .ok_or_else(|| anyhow!("invalid digest time {:02}:{:02}", self.hour, self.minute))
    }

    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("invalid digest timezone {:?}: {e}", self.timezone))
    }

    /// Run time and zone, or `None` (logged) when either is invalid.
    pub fn resolve(&self) -> Option<(NaiveTime, Tz)> {
        match (self.time_of_day(), self.tz()) {
            (Ok(at), Ok(tz)) => Some((at, tz)),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(target: "digest", error = %e, "invalid digest schedule, scheduler disabled");
                None
            }
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub storage: StorageSettings,
    pub fetch: FetchSettings,
    pub email: EmailSettings,
    pub schedule: ScheduleSettings,
}

impl Settings {
    /// Defaults, then the TOML file, then the process environment.
    /// `.env` is loaded first when present.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut s = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
                }
                Self::from_file(&pb)?
            }
            Err(_) => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        s.apply_env(|k| std::env::var(k).ok());
        Ok(s)
    }

    /// [`Settings::load`] for startup: a missing or invalid file is logged
    /// and the defaults are used, with the environment still applied.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(target: "config", error = ?e, "settings file rejected, using defaults");
            let mut s = Self::default();
            s.apply_env(|k| std::env::var(k).ok());
            s
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Applies overrides from `lookup` (the environment in production).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("BRIEFING_TOPICS_PATH") {
            self.storage.topics_path = v.into();
        }
        if let Some(v) = get("BRIEFING_SOURCES_PATH") {
            self.storage.sources_path = v.into();
        }
        if let Some(v) = get("BRIEFING_CACHE_PATH") {
            self.storage.cache_path = v.into();
        }
        if let Some(v) = get("NEWSAPI_URL") {
            self.fetch.news_api_url = v;
        }
        if let Some(v) = get("TOPIC_SEARCH_URL") {
            self.fetch.topic_search_url = v;
        }
        parse_into(get("FETCH_TIMEOUT_SECS"), "FETCH_TIMEOUT_SECS", &mut self.fetch.timeout_secs);
        if let Some(v) = get("SMTP_HOST") {
            self.email.smtp_host = v;
        }
        parse_into(get("SMTP_PORT"), "SMTP_PORT", &mut self.email.smtp_port);
        parse_into(get("DIGEST_HOUR"), "DIGEST_HOUR", &mut self.schedule.hour);
        parse_into(get("DIGEST_MINUTE"), "DIGEST_MINUTE", &mut self.schedule.minute);
        if let Some(v) = get("DIGEST_TIMEZONE") {
            self.schedule.timezone = v;
        }
        if let Some(v) = get("DIGEST_SCHEDULER") {
            self.schedule.enabled = !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "off");
        }

        self.fetch.news_api_key = read_secret("NEWSAPI_KEY", &lookup);
        self.email.user = read_secret("EMAIL_USER", &lookup);
        self.email.password = read_secret("EMAIL_PASSWORD", &lookup);
        self.email.receiver = read_secret("EMAIL_RECEIVER", &lookup);
    }
}

fn parse_into<T: std::str::FromStr>(raw: Option<String>, key: &str, slot: &mut T) {
    if let Some(v) = raw {
        match v.parse() {
            Ok(parsed) => *slot = parsed,
            Err(_) => tracing::warn!(key, value = %v, "ignoring unparseable setting"),
        }
    }
}

/// `VAR` itself, else the contents of the file named by `VAR_FILE`.
pub fn read_secret<F>(var: &str, lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup(var).map(|v| v.trim().to_string()) {
        if !v.is_empty() {
            return Some(v);
        }
    }
    let path = lookup(&format!("{var}_FILE"))?;
    match fs::read_to_string(path.trim()) {
        Ok(content) => Some(content.trim().to_string()).filter(|s| !s.is_empty()),
        Err(e) => {
            tracing::warn!(var, path = %path, error = %e, "secret file unreadable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::env;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_match_service_contract() {
        let s = Settings::default();
        assert_eq!(s.fetch.timeout_secs, 10);
        assert_eq!(s.fetch.validate_timeout_secs, 5);
        assert_eq!(s.email.smtp_port, 587);
        assert_eq!(s.email.timeout_secs, 30);
        assert_eq!(s.schedule.time_of_day().unwrap(), NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(s.schedule.tz().unwrap(), chrono_tz::US::Eastern);
        assert!(s.email.credentials().is_none());
    }

    #[test]
    fn toml_overrides_only_given_keys() {
        let s = Settings::from_toml_str(
            r#"
[schedule]
hour = 7
timezone = "Europe/Prague"

[storage]
cache_path = "/tmp/c.json"
"#,
        )
        .unwrap();
        assert_eq!(s.schedule.hour, 7);
        assert_eq!(s.schedule.minute, 0);
        assert_eq!(s.storage.cache_path, PathBuf::from("/tmp/c.json"));
        assert_eq!(s.storage.topics_path, PathBuf::from("data/topics.json"));
    }

    #[test]
    fn env_wins_and_bad_numbers_are_ignored() {
        let mut s = Settings::default();
        s.apply_env(lookup_from(&[
            ("SMTP_PORT", "2525"),
            ("DIGEST_HOUR", "nine"),
            ("DIGEST_SCHEDULER", "off"),
            ("EMAIL_USER", " me@x.test "),
            ("EMAIL_PASSWORD", "pw"),
            ("EMAIL_RECEIVER", "you@x.test"),
        ]));
        assert_eq!(s.email.smtp_port, 2525);
        assert_eq!(s.schedule.hour, 8);
        assert!(!s.schedule.enabled);
        let c = s.email.credentials().unwrap();
        assert_eq!(c.user, "me@x.test");
    }

    #[test]
    fn secret_falls_back_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("key");
        fs::write(&p, "abc123\n").unwrap();
        let path = p.display().to_string();
        let lookup = lookup_from(&[("NEWSAPI_KEY", "  "), ("NEWSAPI_KEY_FILE", path.as_str())]);
        assert_eq!(read_secret("NEWSAPI_KEY", &lookup).as_deref(), Some("abc123"));

        let missing = lookup_from(&[("NEWSAPI_KEY_FILE", "/nonexistent/key")]);
        assert!(read_secret("NEWSAPI_KEY", &missing).is_none());
    }

    #[serial_test::serial]
    #[test]
    fn load_uses_env_path_then_default_file() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_CONFIG_PATH);

        let s = Settings::load().unwrap();
        assert_eq!(s.storage, StorageSettings::default());

        fs::create_dir_all(tmp.path().join("config")).unwrap();
        fs::write(
            tmp.path().join(DEFAULT_CONFIG_PATH),
            "[fetch]\ntimeout_secs = 3\n",
        )
        .unwrap();
        assert_eq!(Settings::load().unwrap().fetch.timeout_secs, 3);

        env::set_var(ENV_CONFIG_PATH, tmp.path().join("nope.toml"));
        assert!(Settings::load().is_err());
        env::remove_var(ENV_CONFIG_PATH);

        env::set_current_dir(&old).unwrap();
    }

    #[serial_test::serial]
    #[test]
    fn malformed_file_falls_back_to_defaults_with_env() {
        let tmp = tempfile::tempdir().unwrap();
        let bad = tmp.path().join("briefing.toml");
        fs::write(&bad, "[schedule\nhour = ").unwrap();
        env::set_var(ENV_CONFIG_PATH, &bad);
        env::set_var("SMTP_PORT", "2526");

        assert!(Settings::load().is_err());
        let s = Settings::load_or_default();
        assert_eq!(s.email.smtp_port, 2526);
        assert_eq!(s.schedule, ScheduleSettings::default());

        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var("SMTP_PORT");
    }

    #[test]
    fn invalid_schedule_resolves_to_none() {
        let ok = ScheduleSettings::default();
        let (at, tz) = ok.resolve().unwrap();
        assert_eq!(at, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(tz, chrono_tz::US::Eastern);

        let bad_zone = ScheduleSettings {
            timezone: "Mars/Olympus".into(),
            ..ScheduleSettings::default()
        };
        assert!(bad_zone.resolve().is_none());

        let bad_time = ScheduleSettings {
            hour: 25,
            ..ScheduleSettings::default()
        };
        assert!(bad_time.resolve().is_none());
    }
}
