//! Report configuration from environment variables.
//!
//! | Variable           | Required | Default                 | Description                              |
//! |--------------------|----------|-------------------------|------------------------------------------|
//! | `FIXTURE_PATH`     | no       | `fixtures/sample.json`  | JSON fixture loaded into the backend     |
//! | `LEADERBOARD_SORT` | no       | `score`                 | `score`, `liver`, `kosher` or `mortality`|
//! | `TREND_YEAR`       | no       | --                      | Restrict the trend chart to one year     |

use std::path::PathBuf;

use poultry_core::leaderboard::SortKey;

use crate::error::ConfigError;

pub const DEFAULT_FIXTURE_PATH: &str = "fixtures/sample.json";

#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    pub fixture_path: PathBuf,
    pub sort_key: SortKey,
    pub trend_year: Option<i32>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            fixture_path: PathBuf::from(DEFAULT_FIXTURE_PATH),
            sort_key: SortKey::default(),
            trend_year: None,
        }
    }
}

impl ReportConfig {
    /// Read the configuration from the process environment. Call
    /// `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`. Unset and blank variables
    /// take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let fixture_path = var("FIXTURE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FIXTURE_PATH));

        let sort_key = match var("LEADERBOARD_SORT") {
            Some(raw) => raw
                .parse::<SortKey>()
                .map_err(|e| ConfigError::InvalidValue {
                    name: "LEADERBOARD_SORT",
                    value: raw.clone(),
                    reason: e.user_message(),
                })?,
            None => SortKey::default(),
        };

        let trend_year = match var("TREND_YEAR") {
            Some(raw) => Some(raw.parse::<i32>().map_err(|e| ConfigError::InvalidValue {
                name: "TREND_YEAR",
                value: raw.clone(),
                reason: e.to_string(),
            })?),
            None => None,
        };

        Ok(Self {
            fixture_path,
            sort_key,
            trend_year,
        })
    }
}
