//! Configuration loading for factdrill.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.factdrill/config.toml`)
//! 3. User config (`~/.factdrill/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The system runs with sensible defaults
//! when no config exists.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{Ledger, Tier, DEFAULT_DAILY_GOAL, DEFAULT_TARGET_ACCURACY};
use crate::error::{DrillError, FailOpen, Result};

/// Main configuration struct for factdrill.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Per-learner defaults.
    pub learner: LearnerConfig,
    /// Session composition settings.
    pub session: SessionConfig,
}

/// Per-learner defaults, applied when a learner has no ledger yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LearnerConfig {
    /// Tier used when a command doesn't pass `--tier`.
    pub default_tier: Tier,
    /// Target accuracy stored on fresh ledgers (percent).
    pub target_accuracy: f64,
    /// Attempts per day the learner aims for.
    pub daily_goal: u32,
}

impl LearnerConfig {
    /// Target accuracy must be a finite percentage.
    pub fn is_valid_target_accuracy(value: f64) -> bool {
        value.is_finite() && (0.0..=100.0).contains(&value)
    }
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            default_tier: Tier::Basic,
            target_accuracy: DEFAULT_TARGET_ACCURACY,
            daily_goal: DEFAULT_DAILY_GOAL,
        }
    }
}

/// Session composition settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Questions per Basic session.
    pub basic_length: usize,
    /// Questions per Advanced session.
    pub advanced_length: usize,
    /// Fixed RNG seed for reproducible sessions. Unset means random.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Minimum valid session length.
pub const MIN_SESSION_LENGTH: usize = 1;

impl SessionConfig {
    pub fn is_valid_length(value: usize) -> bool {
        value >= MIN_SESSION_LENGTH
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            basic_length: Tier::Basic.session_length(),
            advanced_length: Tier::Advanced.session_length(),
            seed: None,
        }
    }
}

impl Config {
    /// Load configuration with full precedence chain.
    ///
    /// Precedence (highest to lowest):
    /// 1. Environment variables
    /// 2. Project config (`.factdrill/config.toml` in cwd)
    /// 3. User config (`~/.factdrill/config.toml`)
    /// 4. Defaults
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    fn load_user_config() -> Option<Config> {
        let home = factdrill_home()?;
        Self::load_optional(&home.join("config.toml"))
    }

    fn load_project_config(cwd: &Path) -> Option<Config> {
        Self::load_optional(&project_dir(cwd).join("config.toml"))
    }

    /// A missing file is silent; an unreadable or invalid one is warned about.
    fn load_optional(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("Ignoring config at {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| DrillError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| DrillError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // FACTDRILL_TIER
        if let Ok(val) = env::var("FACTDRILL_TIER") {
            match val.parse::<Tier>() {
                Ok(tier) => self.learner.default_tier = tier,
                Err(_) => eprintln!(
                    "Warning: Invalid FACTDRILL_TIER value '{}'. \
                    Valid values: [\"basic\", \"advanced\"]. Using '{}'.",
                    val, self.learner.default_tier
                ),
            }
        }

        // FACTDRILL_DAILY_GOAL
        if let Ok(val) = env::var("FACTDRILL_DAILY_GOAL") {
            match val.parse::<u32>() {
                Ok(n) => self.learner.daily_goal = n,
                Err(_) => eprintln!(
                    "Warning: Invalid FACTDRILL_DAILY_GOAL value '{}'. \
                    Expected a non-negative integer. Using '{}'.",
                    val, self.learner.daily_goal
                ),
            }
        }

        // FACTDRILL_BASIC_SESSION_LENGTH
        if let Some(n) =
            parse_length_env("FACTDRILL_BASIC_SESSION_LENGTH", self.session.basic_length)
        {
            self.session.basic_length = n;
        }

        // FACTDRILL_ADVANCED_SESSION_LENGTH
        if let Some(n) = parse_length_env(
            "FACTDRILL_ADVANCED_SESSION_LENGTH",
            self.session.advanced_length,
        ) {
            self.session.advanced_length = n;
        }

        // FACTDRILL_SEED
        if let Ok(val) = env::var("FACTDRILL_SEED") {
            match val.parse::<u64>() {
                Ok(n) => self.session.seed = Some(n),
                Err(_) => eprintln!(
                    "Warning: Invalid FACTDRILL_SEED value '{}'. \
                    Expected an unsigned integer. Sessions stay random.",
                    val
                ),
            }
        }
    }

    /// Merge another config into this one.
    ///
    /// The `other` config takes precedence for every field it sets to a
    /// non-default value.
    ///
    /// # Limitation
    ///
    /// A layer cannot reset a field back to its default once a lower layer
    /// changed it. Each layer only needs to list its customizations.
    fn merge(mut self, other: Config) -> Self {
        let default_learner = LearnerConfig::default();
        if other.learner.default_tier != default_learner.default_tier {
            self.learner.default_tier = other.learner.default_tier;
        }
        if other.learner.target_accuracy != default_learner.target_accuracy {
            if LearnerConfig::is_valid_target_accuracy(other.learner.target_accuracy) {
                self.learner.target_accuracy = other.learner.target_accuracy;
            } else {
                tracing::warn!(
                    "Ignoring target_accuracy {}: must be within [0, 100]",
                    other.learner.target_accuracy
                );
            }
        }
        if other.learner.daily_goal != default_learner.daily_goal {
            self.learner.daily_goal = other.learner.daily_goal;
        }

        let default_session = SessionConfig::default();
        if other.session.basic_length != default_session.basic_length
            && SessionConfig::is_valid_length(other.session.basic_length)
        {
            self.session.basic_length = other.session.basic_length;
        }
        if other.session.advanced_length != default_session.advanced_length
            && SessionConfig::is_valid_length(other.session.advanced_length)
        {
            self.session.advanced_length = other.session.advanced_length;
        }
        if other.session.seed.is_some() {
            self.session.seed = other.session.seed;
        }

        self
    }

    /// Load config with fail-open behavior.
    ///
    /// If loading fails for any reason, returns defaults.
    pub fn load_fail_open() -> Self {
        let result: Result<Self> = Ok(Self::load());
        result.fail_open_default("loading config")
    }

    /// Session length configured for a tier.
    pub fn session_length_for(&self, tier: Tier) -> usize {
        match tier {
            Tier::Basic => self.session.basic_length,
            Tier::Advanced => self.session.advanced_length,
        }
    }

    /// An empty ledger carrying this config's learner targets.
    pub fn fresh_ledger(&self) -> Ledger {
        Ledger::new(self.learner.target_accuracy, self.learner.daily_goal)
    }
}

fn parse_length_env(name: &str, current: usize) -> Option<usize> {
    let val = env::var(name).ok()?;
    match val.parse::<usize>() {
        Ok(n) if SessionConfig::is_valid_length(n) => Some(n),
        Ok(n) => {
            eprintln!(
                "Warning: Invalid {} value '{}'. Must be >= {}. Using '{}'.",
                name, n, MIN_SESSION_LENGTH, current
            );
            None
        }
        Err(_) => {
            eprintln!(
                "Warning: Invalid {} value '{}'. \
                Expected a positive integer. Using '{}'.",
                name, val, current
            );
            None
        }
    }
}

/// Get the factdrill home directory.
///
/// Checks `FACTDRILL_HOME` first, then falls back to `~/.factdrill`. An empty
/// `FACTDRILL_HOME` is ignored.
pub fn factdrill_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("FACTDRILL_HOME") {
        if home.is_empty() {
            tracing::warn!("FACTDRILL_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("FACTDRILL_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(".factdrill"));
    }

    let fallback = env::temp_dir().join("factdrill");
    tracing::warn!(
        "HOME not set, using fallback location: {}",
        fallback.display()
    );
    Some(fallback)
}

/// `<home>/ledgers/`
pub fn ledgers_dir() -> Option<PathBuf> {
    factdrill_home().map(|h| h.join("ledgers"))
}

/// `<home>/attempts/`
pub fn attempts_dir() -> Option<PathBuf> {
    factdrill_home().map(|h| h.join("attempts"))
}

/// `<home>/crash.log`
pub fn crash_log_path() -> Option<PathBuf> {
    factdrill_home().map(|h| h.join("crash.log"))
}

/// Project-level config directory: `<cwd>/.factdrill/`.
pub fn project_dir(cwd: &Path) -> PathBuf {
    cwd.join(".factdrill")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    const ENV_VARS: &[&str] = &[
        "FACTDRILL_TIER",
        "FACTDRILL_DAILY_GOAL",
        "FACTDRILL_BASIC_SESSION_LENGTH",
        "FACTDRILL_ADVANCED_SESSION_LENGTH",
        "FACTDRILL_SEED",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.learner.default_tier, Tier::Basic);
        assert!((config.learner.target_accuracy - 90.0).abs() < f64::EPSILON);
        assert_eq!(config.learner.daily_goal, 20);

        assert_eq!(config.session.basic_length, 20);
        assert_eq!(config.session.advanced_length, 25);
        assert_eq!(config.session.seed, None);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");

        let toml_content = r#"
[learner]
default_tier = "advanced"
daily_goal = 40

[session]
advanced_length = 30
seed = 7
"#;
        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();

        assert_eq!(config.learner.default_tier, Tier::Advanced);
        assert_eq!(config.learner.daily_goal, 40);
        assert_eq!(config.session.advanced_length, 30);
        assert_eq!(config.session.seed, Some(7));

        // Other fields should be defaults
        assert_eq!(config.session.basic_length, 20);
        assert!((config.learner.target_accuracy - 90.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_from_file_missing() {
        let result = Config::load_from_file(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "this is not valid toml [[[").unwrap();

        let err = Config::load_from_file(&config_path).unwrap_err();
        assert!(matches!(err, DrillError::Config { .. }));
    }

    #[test]
    fn test_unknown_tier_in_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[learner]\ndefault_tier = \"expert\"\n").unwrap();

        assert!(Config::load_from_file(&config_path).is_err());
    }

    #[test]
    #[serial]
    fn test_project_config_precedence() {
        clear_env();
        let home = TempDir::new().unwrap();
        env::set_var("FACTDRILL_HOME", home.path());

        let dir = TempDir::new().unwrap();
        let project = project_dir(dir.path());
        fs::create_dir_all(&project).unwrap();
        fs::write(project.join("config.toml"), "[session]\nbasic_length = 12\n").unwrap();

        let config = Config::load_from_cwd(dir.path());

        assert_eq!(config.session.basic_length, 12);
        assert_eq!(config.session.advanced_length, 25);

        env::remove_var("FACTDRILL_HOME");
    }

    #[test]
    #[serial]
    fn test_user_then_project_layering() {
        clear_env();
        let home = TempDir::new().unwrap();
        env::set_var("FACTDRILL_HOME", home.path());
        fs::write(
            home.path().join("config.toml"),
            "[learner]\ndaily_goal = 50\n\n[session]\nbasic_length = 15\n",
        )
        .unwrap();

        let dir = TempDir::new().unwrap();
        let project = project_dir(dir.path());
        fs::create_dir_all(&project).unwrap();
        fs::write(project.join("config.toml"), "[session]\nbasic_length = 10\n").unwrap();

        let config = Config::load_from_cwd(dir.path());

        // User value survives where the project is silent
        assert_eq!(config.learner.daily_goal, 50);
        // Project wins where both speak
        assert_eq!(config.session.basic_length, 10);

        env::remove_var("FACTDRILL_HOME");
    }

    #[test]
    #[serial]
    fn test_env_var_precedence() {
        clear_env();
        let home = TempDir::new().unwrap();
        env::set_var("FACTDRILL_HOME", home.path());

        let dir = TempDir::new().unwrap();
        let project = project_dir(dir.path());
        fs::create_dir_all(&project).unwrap();
        fs::write(project.join("config.toml"), "[learner]\ndaily_goal = 30\n").unwrap();

        env::set_var("FACTDRILL_DAILY_GOAL", "45");

        let config = Config::load_from_cwd(dir.path());
        assert_eq!(config.learner.daily_goal, 45);

        clear_env();
        env::remove_var("FACTDRILL_HOME");
    }

    #[test]
    #[serial]
    fn test_env_var_overrides() {
        clear_env();
        env::set_var("FACTDRILL_TIER", "advanced");
        env::set_var("FACTDRILL_DAILY_GOAL", "35");
        env::set_var("FACTDRILL_BASIC_SESSION_LENGTH", "8");
        env::set_var("FACTDRILL_ADVANCED_SESSION_LENGTH", "40");
        env::set_var("FACTDRILL_SEED", "1234");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.learner.default_tier, Tier::Advanced);
        assert_eq!(config.learner.daily_goal, 35);
        assert_eq!(config.session.basic_length, 8);
        assert_eq!(config.session.advanced_length, 40);
        assert_eq!(config.session.seed, Some(1234));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_var_invalid_values_ignored() {
        clear_env();
        env::set_var("FACTDRILL_TIER", "expert");
        env::set_var("FACTDRILL_DAILY_GOAL", "lots");
        env::set_var("FACTDRILL_BASIC_SESSION_LENGTH", "0");
        env::set_var("FACTDRILL_ADVANCED_SESSION_LENGTH", "-3");
        env::set_var("FACTDRILL_SEED", "abc");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config, Config::default());

        clear_env();
    }

    #[test]
    fn test_merge_configs() {
        let base = Config::default();
        let override_config = Config {
            session: SessionConfig {
                basic_length: 10,
                advanced_length: 25,
                seed: Some(99),
            },
            ..Config::default()
        };

        let merged = base.merge(override_config);

        assert_eq!(merged.session.basic_length, 10);
        assert_eq!(merged.session.advanced_length, 25);
        assert_eq!(merged.session.seed, Some(99));
        assert_eq!(merged.learner, LearnerConfig::default());
    }

    #[test]
    fn test_merge_field_by_field_preserves_non_default_values() {
        let base = Config {
            learner: LearnerConfig {
                default_tier: Tier::Advanced,
                target_accuracy: 90.0,
                daily_goal: 20,
            },
            ..Config::default()
        };
        let override_config = Config {
            learner: LearnerConfig {
                default_tier: Tier::Basic, // same as default
                target_accuracy: 85.0,
                daily_goal: 20,
            },
            ..Config::default()
        };

        let merged = base.merge(override_config);

        assert_eq!(merged.learner.default_tier, Tier::Advanced);
        assert!((merged.learner.target_accuracy - 85.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_merge_rejects_invalid_values() {
        let override_config = Config {
            learner: LearnerConfig {
                target_accuracy: 140.0,
                ..LearnerConfig::default()
            },
            session: SessionConfig {
                basic_length: 0,
                ..SessionConfig::default()
            },
        };

        let merged = Config::default().merge(override_config);

        assert!((merged.learner.target_accuracy - 90.0).abs() < f64::EPSILON);
        assert_eq!(merged.session.basic_length, 20);
    }

    #[test]
    fn test_session_length_for() {
        let config = Config {
            session: SessionConfig {
                basic_length: 12,
                advanced_length: 30,
                seed: None,
            },
            ..Config::default()
        };

        assert_eq!(config.session_length_for(Tier::Basic), 12);
        assert_eq!(config.session_length_for(Tier::Advanced), 30);
    }

    #[test]
    fn test_fresh_ledger_uses_learner_targets() {
        let config = Config {
            learner: LearnerConfig {
                default_tier: Tier::Basic,
                target_accuracy: 80.0,
                daily_goal: 15,
            },
            ..Config::default()
        };

        let ledger = config.fresh_ledger();
        assert!((ledger.target_accuracy - 80.0).abs() < f64::EPSILON);
        assert_eq!(ledger.daily_goal, 15);
        assert!(ledger.is_fresh());
    }

    #[test]
    #[serial]
    fn test_factdrill_home_with_env() {
        let dir = TempDir::new().unwrap();
        env::set_var("FACTDRILL_HOME", dir.path().to_str().unwrap());

        assert_eq!(factdrill_home().unwrap(), dir.path());
        assert_eq!(ledgers_dir().unwrap(), dir.path().join("ledgers"));
        assert_eq!(attempts_dir().unwrap(), dir.path().join("attempts"));
        assert_eq!(crash_log_path().unwrap(), dir.path().join("crash.log"));

        env::remove_var("FACTDRILL_HOME");
    }

    #[test]
    #[serial]
    fn test_factdrill_home_empty_env() {
        env::set_var("FACTDRILL_HOME", "");

        let home = factdrill_home();
        assert!(home.is_some());
        assert!(home.unwrap().ends_with(".factdrill"));

        env::remove_var("FACTDRILL_HOME");
    }

    #[test]
    fn test_project_dir() {
        assert_eq!(
            project_dir(Path::new("/some/classroom")),
            PathBuf::from("/some/classroom/.factdrill")
        );
    }

    #[test]
    #[serial]
    fn test_load_fail_open() {
        clear_env();
        let home = TempDir::new().unwrap();
        env::set_var("FACTDRILL_HOME", home.path());

        let config = Config::load_fail_open();
        assert_eq!(config.session.advanced_length, 25);

        env::remove_var("FACTDRILL_HOME");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("[session]\nbasic_length = 5\n").unwrap();

        assert_eq!(config.session.basic_length, 5);
        assert_eq!(config.session.advanced_length, 25);
        assert_eq!(config.learner, LearnerConfig::default());
    }
}
