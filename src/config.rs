use anyhow::{Context, Result, anyhow};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_JWT_SECRET: &str = "supersecret_change_me";
pub const DEFAULT_JWT_EXPIRES_IN: &str = "7d";
pub const DEFAULT_BCRYPT_COST: u32 = 10;
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Settings read from `config.toml`, then overridden by the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_path: PathBuf,
    pub jwt_secret: String,
    pub jwt_expires_in: String,
    pub bcrypt_cost: u32,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_expires_in: DEFAULT_JWT_EXPIRES_IN.to_string(),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = match config_dir() {
            Some(dir) => Self::from_file(&dir.join("config.toml"))?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.token_ttl()?;
        Ok(config)
    }

    /// Missing file yields defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(path) = var("JOBTRACK_DB") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(secret) = var("JWT_SECRET") {
            self.jwt_secret = secret;
        }
        if let Some(expires) = var("JWT_EXPIRES_IN") {
            self.jwt_expires_in = expires;
        }
        if let Some(cost) = var("JOBTRACK_BCRYPT_COST") {
            self.bcrypt_cost = cost
                .parse()
                .with_context(|| format!("Invalid JOBTRACK_BCRYPT_COST: {}", cost))?;
        }
        if let Some(level) = var("JOBTRACK_LOG") {
            self.log_level = level;
        }
        Ok(())
    }

    /// Token lifetime; must still land inside chrono's range when added to now.
    pub fn token_ttl(&self) -> Result<Duration> {
        let ttl = parse_duration(&self.jwt_expires_in)?;
        chrono::Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(|| anyhow!("JWT expiry '{}' is too far in the future", self.jwt_expires_in))?;
        Ok(ttl)
    }
}

/// Parses `<n>s`, `<n>m`, `<n>h` or `<n>d`.
pub fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let invalid = || anyhow!("Invalid duration '{}', expected e.g. 30m, 12h or 7d", raw);

    let unit = raw.chars().last().ok_or_else(invalid)?;
    let amount: i64 = raw[..raw.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| invalid())?;
    if amount <= 0 {
        return Err(invalid());
    }
    let duration = match unit {
        's' => Duration::try_seconds(amount),
        'm' => Duration::try_minutes(amount),
        'h' => Duration::try_hours(amount),
        'd' => Duration::try_days(amount),
        _ => None,
    };
    duration.ok_or_else(invalid)
}

pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "jobtrack").map(|dirs| dirs.config_dir().to_path_buf())
}

fn default_database_path() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobtrack") {
        proj_dirs.data_dir().join("jobtrack.db")
    } else {
        PathBuf::from("jobtrack.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("7d").unwrap(), Duration::days(7));
        assert_eq!(parse_duration("12h").unwrap(), Duration::hours(12));
        assert_eq!(parse_duration("30m").unwrap(), Duration::minutes(30));
        assert_eq!(parse_duration("3600s").unwrap(), Duration::seconds(3600));
        assert!(parse_duration("7").is_err());
        assert!(parse_duration("d").is_err());
        assert!(parse_duration("0h").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("1w").is_err());
    }

    #[test]
    fn test_out_of_range_durations_are_errors() {
        assert!(parse_duration("200000000000d").is_err());
        assert!(parse_duration("9223372036854775807s").is_err());

        // representable as a duration, but not once added to the current time
        assert!(parse_duration("100000000d").is_ok());
        let config = Config {
            jwt_expires_in: "100000000d".to_string(),
            ..Config::default()
        };
        assert!(config.token_ttl().is_err());
    }

    #[test]
    fn test_from_file_partial_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "jwt_expires_in = \"12h\"\nbcrypt_cost = 6\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.jwt_expires_in, "12h");
        assert_eq!(config.bcrypt_cost, 6);
        assert_eq!(config.jwt_secret, DEFAULT_JWT_SECRET);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_file(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.jwt_expires_in, DEFAULT_JWT_EXPIRES_IN);
        assert_eq!(config.token_ttl().unwrap(), Duration::days(7));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("JOBTRACK_DB", "/tmp/other.db"),
            ("JWT_SECRET", "s3cret"),
            ("JOBTRACK_BCRYPT_COST", "4"),
        ]);
        let mut config = Config::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.bcrypt_cost, 4);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_bad_bcrypt_cost_is_rejected() {
        let mut config = Config::default();
        let result = config.apply_env(|key| (key == "JOBTRACK_BCRYPT_COST").then(|| "lots".to_string()));
        assert!(result.is_err());
    }
}
