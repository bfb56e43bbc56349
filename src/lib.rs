//! Team-level feature derivation for rugby match prediction
//!
//! Turns a table of match results (one row per match, columns doubled for
//! the two teams) into one row per team and match, with leakage-safe rolling
//! history features ready for model training.

pub mod data;
pub mod features;
pub mod pipeline;

use polars::prelude::PolarsError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One of the two participant positions within a match row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeamSlot {
    First,
    Second,
}

impl TeamSlot {
    pub const ALL: [TeamSlot; 2] = [TeamSlot::First, TeamSlot::Second];

    pub fn name(&self) -> &'static str {
        match self {
            TeamSlot::First => "team_1",
            TeamSlot::Second => "team_2",
        }
    }

    /// Column name of an attribute in this slot, e.g. `team_1_score`
    pub fn column(&self, attribute: &str) -> String {
        format!("{}_{}", self.name(), attribute)
    }

    pub fn opposing(&self) -> TeamSlot {
        match self {
            TeamSlot::First => TeamSlot::Second,
            TeamSlot::Second => TeamSlot::First,
        }
    }
}

impl fmt::Display for TeamSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TeamSlot {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "team_1" => Ok(TeamSlot::First),
            "team_2" => Ok(TeamSlot::Second),
            other => Err(FeatureError::InvalidAttributeName(other.to_string())),
        }
    }
}

/// Crate-wide errors
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Invalid grouping key {0}: column is absent or entirely null")]
    InvalidGroupingKey(String),

    #[error("Join key {key} matches {count} records, expected exactly one")]
    AmbiguousJoinKey { key: String, count: usize },

    #[error("Invalid team attribute name {0}: must be one of \"team_1\" or \"team_2\"")]
    InvalidAttributeName(String),

    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, FeatureError>;

/// Pipeline configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub columns: ColumnConfig,
    pub competitions: CompetitionConfig,
    pub rolling: RollingConfig,
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnConfig {
    /// Per-team attributes, stored as `team_1_<attr>` / `team_2_<attr>`
    pub team_attributes: Vec<String>,
    /// Match-level columns copied onto both team rows
    pub core: Vec<String>,
    /// Columns identifying a single match
    pub join_keys: Vec<String>,
    /// Team attribute holding points scored
    pub score: String,
    /// Team attribute holding the win/draw/loss label
    pub result: String,
    pub competition: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitionConfig {
    pub international: Vec<String>,
    pub club: Vec<String>,
    /// Competitions removed before anything else runs
    pub excluded: Vec<String>,
    /// Remove the raw competition name once it is categorised
    pub drop_original: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollingConfig {
    pub window: usize,
    pub grouping_key: String,
    pub sorting_key: String,
    pub impute: bool,
    /// Team-level columns that get a rolling history feature
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Context features; category flags and rolling features are added
    /// automatically
    pub features: Vec<String>,
    pub target: String,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            columns: ColumnConfig {
                team_attributes: strings(&["id", "home_away", "score", "winner"]),
                core: strings(&[
                    "match_id",
                    "unique_id",
                    "match_date",
                    "venue",
                    "city",
                    "state",
                    "neutral_site",
                    "indoor",
                    "competition",
                    "season",
                ]),
                join_keys: strings(&["unique_id"]),
                score: "score".to_string(),
                result: "winner".to_string(),
                competition: "competition".to_string(),
            },
            competitions: CompetitionConfig {
                international: strings(&[
                    "Six Nations",
                    "African CAR Championship",
                    "Rugby Championship",
                    "IRB Pacific Nations Cup",
                    "International Test Match",
                    "FIRA Championship D2",
                    "Rugby World Cup",
                    "Asia Rugby Championship - Top 3",
                    "Asian 5 Nations - Divisio",
                    "IRB Nations Cup",
                    "South American Championship",
                    "Americas Rugby Trophy",
                    "Wales tour 2016",
                    "Ireland tour 2016",
                    "Scotland tour 2016",
                    "Australia tour 2016",
                    "Argentina tour 2016",
                    "South Africa tour 2016",
                    "Canada tour 2016",
                    "Fiji tour 2016",
                    "New Zealand tour 2016",
                    " tour 2016",
                    "British and Irish Lions Tour",
                    "2020 Tri Nations",
                    "Autumn Nations Cup",
                    "Rugby World Cup Qualifier",
                ]),
                club: strings(&[
                    "Gallagher Premiership",
                    "Super Rugby Pacific",
                    "Bunnings Warehouse NPC",
                    "United Rugby Championship",
                    "Top 14 Orange",
                    "Anglo-Welsh Cup",
                    "European Rugby Challenge Cup",
                    "European Rugby Champions Cup",
                    "Currie Cup",
                    "Super Rugby Aotearoa",
                    "Super Rugby AU",
                    "Super Rugby Trans-Tasman",
                    "URBA Top 12",
                    "National Rugby Championship 2015",
                ]),
                // formats that play differently to men's 15s
                excluded: strings(&[
                    "Women's Rugby World Cup",
                    "Olympic Women's 7s",
                    "Olympic Men's 7s",
                ]),
                drop_original: true,
            },
            rolling: RollingConfig {
                window: 5,
                grouping_key: "id".to_string(),
                sorting_key: "match_date".to_string(),
                impute: true,
                attributes: strings(&["score", "score_opposition"]),
            },
            model: ModelConfig {
                features: strings(&["home_away", "neutral_site", "indoor"]),
                target: "winner".to_string(),
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FeatureError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| FeatureError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FeatureError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings no pipeline run could succeed with
    pub fn validate(&self) -> Result<()> {
        if self.rolling.window == 0 {
            return Err(FeatureError::Config(
                "rolling.window must be at least 1".to_string(),
            ));
        }
        if self.columns.join_keys.is_empty() {
            return Err(FeatureError::Config(
                "columns.join_keys must name at least one column".to_string(),
            ));
        }
        if !self.columns.team_attributes.contains(&self.columns.score) {
            return Err(FeatureError::Config(format!(
                "score attribute {} is not listed in columns.team_attributes",
                self.columns.score
            )));
        }
        Ok(())
    }
}
