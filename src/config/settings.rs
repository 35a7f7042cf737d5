use anyhow::{Context, Result, anyhow, bail};
use chrono::{NaiveDate, NaiveTime};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 2, 1).unwrap_or_default()
}
fn default_unlock_time() -> NaiveTime {
    NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default()
}
fn default_timezone_offset() -> i32 {
    330
}
fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}
fn default_token_ttl_hours() -> i64 {
    24
}
fn default_practice_endpoint() -> String {
    "https://leetcode.com/graphql".to_string()
}
fn default_practice_timeout() -> u64 {
    10
}
fn default_tick_ms() -> u64 {
    1000
}

/// `HH:MM` on disk, `NaiveTime` in memory.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(raw.trim(), "%H:%M")
            .map_err(|e| serde::de::Error::custom(format!("bad unlock time '{}': {}", raw, e)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeConfig {
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,
    #[serde(default = "default_unlock_time", with = "hhmm")]
    pub unlock_time: NaiveTime,
    #[serde(default = "default_timezone_offset")]
    pub timezone_offset: i32, // minutes east of UTC
    /// Syllabus JSON. Defaults to `challenge.json` in the data directory.
    #[serde(default)]
    pub dataset_path: Option<PathBuf>,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            start_date: default_start_date(),
            unlock_time: default_unlock_time(),
            timezone_offset: default_timezone_offset(),
            dataset_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Overridden by the `JWT_SECRET` environment variable.
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    #[serde(default)]
    pub secure_cookies: bool,
    #[serde(default)]
    pub admin_emails: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            jwt_secret: String::new(),
            token_ttl_hours: default_token_ttl_hours(),
            secure_cookies: false,
            admin_emails: vec![],
        }
    }
}

impl ServerConfig {
    pub fn is_admin(&self, email: &str) -> bool {
        self.admin_emails.iter().any(|a| a.eq_ignore_ascii_case(email))
    }
}

/// Single sign-on is terminated by a proxy in front of the server; it
/// forwards the verified email in a header.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IdentityConfig {
    #[serde(default)]
    pub proxy_email_header: Option<String>,
    #[serde(default)]
    pub proxy_name_header: Option<String>,
    #[serde(default)]
    pub allowed_email_domain: Option<String>,
}

impl IdentityConfig {
    pub fn email_allowed(&self, email: &str) -> bool {
        match &self.allowed_email_domain {
            None => true,
            Some(domain) => email
                .rsplit_once('@')
                .is_some_and(|(_, d)| d.eq_ignore_ascii_case(domain)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeConfig {
    #[serde(default = "default_practice_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_practice_timeout")]
    pub timeout_secs: u64,
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            endpoint: default_practice_endpoint(),
            timeout_secs: default_practice_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// SAP ID opened when no subcommand is given.
    #[serde(default)]
    pub student: Option<String>,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            student: None,
            tick_ms: default_tick_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub challenge: ChallengeConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub practice: PracticeConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl AppConfig {
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("", "", "hundred-days")
            .context("Could not determine project directories")
    }

    pub fn config_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn data_dir() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.data_dir().to_path_buf())
    }

    pub fn db_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("hundred-days.db"))
    }

    pub fn dataset_path(&self) -> Result<PathBuf> {
        match &self.challenge.dataset_path {
            Some(p) => Ok(p.clone()),
            None => Ok(Self::data_dir()?.join("challenge.json")),
        }
    }

    /// Load `path`, falling back to defaults when the file is absent.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content =
                std::fs::read_to_string(path).with_context(|| format!("Reading {:?}", path))?;
            toml::from_str::<AppConfig>(&content).context("Parsing config.toml")?
        } else {
            Self::default()
        };
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            config.server.jwt_secret = secret;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).context("Serializing config")?;
        std::fs::write(path, content).with_context(|| format!("Writing {:?}", path))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        // chrono's FixedOffset accepts strictly less than a day either way
        if self.challenge.timezone_offset.abs() >= 24 * 60 {
            bail!(
                "challenge.timezone_offset {} is out of range",
                self.challenge.timezone_offset
            );
        }
        if self.server.token_ttl_hours <= 0 {
            return Err(anyhow!("server.token_ttl_hours must be positive"));
        }
        Ok(())
    }

    pub fn ensure_data_dir() -> Result<PathBuf> {
        let dir = Self::data_dir()?;
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.challenge.unlock_time, NaiveTime::from_hms_opt(7, 0, 0).unwrap());
        assert_eq!(config.challenge.timezone_offset, 330);
        assert_eq!(config.server.token_ttl_hours, 24);
    }

    #[test]
    fn parses_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[challenge]
start_date = "2025-03-10"
unlock_time = "18:30"

[server]
admin_emails = ["Mentor@upes.ac.in"]

[identity]
proxy_email_header = "x-auth-request-email"
allowed_email_domain = "upes.ac.in"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.challenge.start_date, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(config.challenge.unlock_time, NaiveTime::from_hms_opt(18, 30, 0).unwrap());
        assert!(config.server.is_admin("mentor@UPES.ac.in"));
        assert!(config.identity.email_allowed("ana@upes.ac.in"));
        assert!(!config.identity.email_allowed("ana@gmail.com"));
        assert_eq!(config.practice.endpoint, "https://leetcode.com/graphql");
    }

    #[test]
    fn rejects_bad_unlock_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[challenge]\nunlock_time = \"25:00\"\n").unwrap();
        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn save_then_load_keeps_unlock_time_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = AppConfig::default();
        config.challenge.unlock_time = NaiveTime::from_hms_opt(6, 45, 0).unwrap();
        config.save(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("unlock_time = \"06:45\""));
        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.challenge.unlock_time, config.challenge.unlock_time);
    }
}
