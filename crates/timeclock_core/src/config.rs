//! Environment-driven runtime configuration.
//!
//! # Responsibility
//! - Resolve the active profile, database location, logging and audit actor.
//! - Open a ready `Session` for the resolved configuration.
//!
//! # Invariants
//! - The production profile always names a database file.
//! - Configuration loading never panics; malformed input is a `ConfigError`.

use crate::db::{open_db, open_db_in_memory, DbError, Session};
use crate::logging::default_log_level;
use crate::model::audit::{ClockAuditHook, DEFAULT_ACTOR};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_PROFILE: &str = "TIMECLOCK_PROFILE";
pub const ENV_DB_PATH: &str = "TIMECLOCK_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "TIMECLOCK_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TIMECLOCK_LOG_DIR";
pub const ENV_ACTOR: &str = "TIMECLOCK_ACTOR";

/// Deployment profile selecting the storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// In-memory database unless a path is configured.
    Development,
    /// File database; a path is mandatory.
    Production,
}

impl Profile {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "dev" | "development" => Ok(Self::Development),
            "prod" | "production" => Ok(Self::Production),
            other => Err(ConfigError::UnknownProfile(other.to_string())),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    UnknownProfile(String),
    /// Production profile without `TIMECLOCK_DB_PATH`.
    MissingDatabasePath,
    /// A variable is set but blank.
    BlankValue(&'static str),
    Db(DbError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownProfile(value) => write!(
                f,
                "unknown profile `{value}`; expected development|production"
            ),
            Self::MissingDatabasePath => {
                write!(f, "{ENV_DB_PATH} is required for the production profile")
            }
            Self::BlankValue(name) => write!(f, "{name} must not be blank"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for ConfigError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub profile: Profile,
    /// `None` selects an in-memory database.
    pub db_path: Option<PathBuf>,
    pub log_level: String,
    /// Logging stays disabled when unset.
    pub log_dir: Option<String>,
    /// Actor stamped into audit records.
    pub actor: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            profile: Profile::Development,
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            actor: DEFAULT_ACTOR.to_string(),
        }
    }
}

impl CoreConfig {
    /// Loads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let profile = match lookup(ENV_PROFILE) {
            Some(value) => Profile::parse(&value)?,
            None => Profile::Development,
        };
        let db_path = non_blank(ENV_DB_PATH, lookup(ENV_DB_PATH))?.map(PathBuf::from);
        if profile == Profile::Production && db_path.is_none() {
            return Err(ConfigError::MissingDatabasePath);
        }

        let defaults = Self::default();
        Ok(Self {
            profile,
            db_path,
            log_level: non_blank(ENV_LOG_LEVEL, lookup(ENV_LOG_LEVEL))?
                .unwrap_or(defaults.log_level),
            log_dir: non_blank(ENV_LOG_DIR, lookup(ENV_LOG_DIR))?,
            actor: non_blank(ENV_ACTOR, lookup(ENV_ACTOR))?.unwrap_or(defaults.actor),
        })
    }

    /// Opens a migrated session with the configured audit actor.
    pub fn open_session(&self) -> Result<Session, ConfigError> {
        let conn = match &self.db_path {
            Some(path) => open_db(path)?,
            None => open_db_in_memory()?,
        };
        Ok(Session::try_new(conn)?.with_audit_hook(ClockAuditHook::new(self.actor.clone())))
    }
}

fn non_blank(name: &'static str, value: Option<String>) -> Result<Option<String>, ConfigError> {
    match value {
        Some(value) if value.trim().is_empty() => Err(ConfigError::BlankValue(name)),
        Some(value) => Ok(Some(value.trim().to_string())),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, Profile, ENV_ACTOR, ENV_DB_PATH, ENV_PROFILE};
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn empty_environment_selects_in_memory_development() {
        let config = CoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.profile, Profile::Development);
        assert!(config.db_path.is_none());
    }

    #[test]
    fn production_requires_database_path() {
        let err = CoreConfig::from_lookup(lookup(&[(ENV_PROFILE, "production")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingDatabasePath));

        let config = CoreConfig::from_lookup(lookup(&[
            (ENV_PROFILE, "PROD"),
            (ENV_DB_PATH, "/var/lib/timeclock.db"),
        ]))
        .unwrap();
        assert_eq!(config.profile, Profile::Production);
        assert_eq!(
            config.db_path.as_deref(),
            Some(std::path::Path::new("/var/lib/timeclock.db"))
        );
    }

    #[test]
    fn blank_and_unknown_values_are_rejected() {
        let err = CoreConfig::from_lookup(lookup(&[(ENV_ACTOR, "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::BlankValue(name) if name == ENV_ACTOR));

        let err = CoreConfig::from_lookup(lookup(&[(ENV_PROFILE, "staging")])).unwrap_err();
        assert!(err.to_string().contains("staging"));
    }

    #[test]
    fn open_session_uses_in_memory_database_by_default() {
        let session = CoreConfig::default().open_session().unwrap();
        assert!(!session.is_closed());
    }
}
