// Configuration loading and parsing (config/prode.toml).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use prode_core::bracket::Round;
use prode_core::rules::{RoundPoints, ScoringRules, TierMode};
use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub pool: PoolConfig,
    pub db_path: String,
    /// Bracket template path, resolved against the base directory.
    pub template_path: PathBuf,
    pub scoring: ScoringRules,
}

// ---------------------------------------------------------------------------
// prode.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire prode.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    pool: PoolConfig,
    database: DatabaseSection,
    bracket: BracketSection,
    #[serde(default)]
    scoring: ScoringSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    pub name: String,
    /// Edition label shown in reports; the template carries its own too.
    #[serde(default)]
    pub edition: String,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
struct BracketSection {
    template: String,
}

fn default_champion_bonus() -> u32 {
    ScoringRules::default().champion_bonus
}

fn default_runner_up_bonus() -> u32 {
    ScoringRules::default().runner_up_bonus
}

/// `[scoring]` section. Every key is optional; rounds not listed keep the
/// published point table.
#[derive(Debug, Clone, Deserialize)]
struct ScoringSection {
    #[serde(default)]
    tier_mode: TierMode,
    #[serde(default = "default_champion_bonus")]
    champion_bonus: u32,
    #[serde(default = "default_runner_up_bonus")]
    runner_up_bonus: u32,
    #[serde(default)]
    rounds: BTreeMap<Round, RoundPoints>,
}

impl Default for ScoringSection {
    fn default() -> Self {
        ScoringSection {
            tier_mode: TierMode::default(),
            champion_bonus: default_champion_bonus(),
            runner_up_bonus: default_runner_up_bonus(),
            rounds: BTreeMap::new(),
        }
    }
}

impl ScoringSection {
    fn into_rules(self) -> ScoringRules {
        let mut rules = ScoringRules {
            tier_mode: self.tier_mode,
            champion_bonus: self.champion_bonus,
            runner_up_bonus: self.runner_up_bonus,
            ..ScoringRules::default()
        };
        rules.rounds.extend(self.rounds);
        rules
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/prode.toml` relative to
/// `base_dir`. Does not copy defaults; see `load_config()`.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_path = base_dir.join("config").join("prode.toml");
    let text = read_file(&config_path)?;
    let file: ConfigFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: config_path.clone(),
        source: e,
    })?;

    let template_path = {
        let raw = PathBuf::from(&file.bracket.template);
        if raw.is_absolute() {
            raw
        } else {
            base_dir.join(raw)
        }
    };

    let config = Config {
        pool: file.pool,
        db_path: file.database.path,
        template_path,
        scoring: file.scoring.into_rules(),
    };

    validate(&config, &file.bracket.template)?;
    Ok(config)
}

/// Files the pool needs under `config/`, seeded from `defaults/`.
const SEEDED_FILES: [&str; 2] = ["prode.toml", "bracket.toml"];

/// Seed `config/` with the pool config and the edition's bracket template
/// from `defaults/`. A file already under `config/` is never overwritten, so
/// local edits survive. Returns the files that were copied.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.is_dir() {
        if config_dir.is_dir() {
            return Ok(vec![]);
        }
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "no defaults/ or config/ directory in {}; run from the prode crate root",
                base_dir.display()
            ),
        });
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create {}: {e}", config_dir.display()),
    })?;

    let mut copied = Vec::new();
    for name in SEEDED_FILES {
        let source = defaults_dir.join(name);
        let target = config_dir.join(name);
        if target.exists() || !source.is_file() {
            continue;
        }
        std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to seed {} from {}: {e}", target.display(), source.display()),
        })?;
        copied.push(target);
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config, raw_template: &str) -> Result<(), ConfigError> {
    if config.pool.name.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "pool.name".into(),
            message: "must not be empty".into(),
        });
    }

    if config.db_path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "database.path".into(),
            message: "must not be empty".into(),
        });
    }

    if raw_template.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "bracket.template".into(),
            message: "must not be empty".into(),
        });
    }

    // A better prediction must never be worth less than a worse one.
    for round in Round::ALL {
        let p = config.scoring.points(round);
        if p.exact < p.difference || p.difference < p.sign {
            return Err(ConfigError::ValidationError {
                field: format!("scoring.rounds.{}", round.key()),
                message: format!(
                    "points must satisfy exact >= difference >= sign, got {}/{}/{}",
                    p.exact, p.difference, p.sign
                ),
            });
        }
    }

    // The Final is settled by the champion and runner-up bonuses instead.
    let final_points = config.scoring.points(Round::Final);
    if final_points.qualifier != 0 {
        return Err(ConfigError::ValidationError {
            field: "scoring.rounds.final.qualifier".into(),
            message: format!(
                "the Final has no qualifier bonus (got {}); use champion_bonus and runner_up_bonus",
                final_points.qualifier
            ),
        });
    }

    Ok(())
}
