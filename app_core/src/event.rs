//! Event-wide configuration: one key/value table per database.

use crate::{Core, CoreError, CoreResult, DbpConfig};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// well-known configuration keys
pub mod config_keys {
    pub const NAME: &str = "name";
    pub const DATE: &str = "date";
    pub const CURRENT_DAY: &str = "current_day";
    pub const JUDGE: &str = "judge";
    pub const SECRETARY: &str = "secretary";
    pub const PLACE: &str = "place";
    /// JSON list of control codes excluded from analysis
    pub const IGNORE_CONTROLS: &str = "ignore_controls";
    /// JSON map of day number to the list of scheduler seeds ever used
    pub const START_SEEDS: &str = "start_seeds";
}

/// typed configuration value; the store persists (key, value, type)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigValue {
    Str(String),
    Int(i64),
    Date(NaiveDate),
}

impl ConfigValue {
    /// type tag as persisted in the config table
    pub fn type_tag(&self) -> &'static str {
        match self {
            ConfigValue::Str(_) => "str",
            ConfigValue::Int(_) => "int",
            ConfigValue::Date(_) => "date",
        }
    }

    /// stored textual representation
    pub fn to_stored(&self) -> String {
        match self {
            ConfigValue::Str(s) => s.clone(),
            ConfigValue::Int(i) => i.to_string(),
            ConfigValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    /// Rebuild a value from its stored (value, type) pair.
    pub fn from_stored(value: &str, type_tag: &str) -> CoreResult<ConfigValue> {
        match type_tag {
            "str" => Ok(ConfigValue::Str(value.to_string())),
            "int" => value
                .parse()
                .map(ConfigValue::Int)
                .map_err(|_| CoreError::Parsing(format!("bad int config value: {value}"))),
            "date" => NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(ConfigValue::Date)
                .map_err(|_| CoreError::Parsing(format!("bad date config value: {value}"))),
            other => Err(CoreError::Parsing(format!("unknown config type: {other}"))),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            _ => None,
        }
    }
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            ConfigValue::Date(d) => Some(*d),
            _ => None,
        }
    }
}

/// parameters of a fresh event database
#[derive(Debug, Clone)]
pub struct EventSetup {
    pub name: String,
    pub start_date: NaiveDate,
    pub judge: String,
    pub secretary: String,
    pub place: String,
}

/// API of the event configuration
impl Core {
    /// Write the base configuration of a new event and point `current_day`
    /// at day 1.
    pub async fn create_event(&self, setup: &EventSetup) -> CoreResult<()> {
        let db = &self.database;
        db.set_config(config_keys::NAME, ConfigValue::Str(setup.name.clone()))
            .await?;
        db.set_config(config_keys::DATE, ConfigValue::Date(setup.start_date))
            .await?;
        db.set_config(config_keys::JUDGE, ConfigValue::Str(setup.judge.clone()))
            .await?;
        db.set_config(
            config_keys::SECRETARY,
            ConfigValue::Str(setup.secretary.clone()),
        )
        .await?;
        db.set_config(config_keys::PLACE, ConfigValue::Str(setup.place.clone()))
            .await?;
        db.set_config(config_keys::CURRENT_DAY, ConfigValue::Int(1)).await?;
        Ok(())
    }

    pub async fn get_config_str(&self, key: &str) -> CoreResult<Option<String>> {
        Ok(self
            .database
            .get_config(key)
            .await?
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    pub async fn get_config_date(&self, key: &str) -> CoreResult<Option<NaiveDate>> {
        Ok(self.database.get_config(key).await?.and_then(|v| v.as_date()))
    }

    /// The competition day every readout is processed against.
    pub async fn current_day(&self) -> CoreResult<u32> {
        let day = self
            .database
            .get_config(config_keys::CURRENT_DAY)
            .await?
            .and_then(|v| v.as_int())
            .ok_or_else(|| CoreError::Integrity("current_day is not configured".into()))?;
        u32::try_from(day)
            .ok()
            .filter(|d| *d >= 1)
            .ok_or_else(|| CoreError::Integrity(format!("current_day out of range: {day}")))
    }

    pub async fn set_current_day(&self, day: u32) -> CoreResult<()> {
        self.database
            .set_config(config_keys::CURRENT_DAY, ConfigValue::Int(day as i64))
            .await?;
        Ok(())
    }

    /// Control codes removed from the required list before analysis.
    pub async fn ignore_controls(&self) -> CoreResult<HashSet<i32>> {
        let Some(value) = self.database.get_config(config_keys::IGNORE_CONTROLS).await? else {
            return Ok(HashSet::new());
        };
        let raw = value
            .as_str()
            .ok_or_else(|| CoreError::Parsing("ignore_controls must be a str config".into()))?
            .to_string();
        serde_json::from_str(&raw)
            .map_err(|e| CoreError::Parsing(format!("ignore_controls: {e}")))
    }

    pub async fn set_ignore_controls(&self, codes: &[i32]) -> CoreResult<()> {
        let raw = serde_json::to_string(codes)
            .map_err(|e| CoreError::Parsing(format!("ignore_controls: {e}")))?;
        self.database
            .set_config(config_keys::IGNORE_CONTROLS, ConfigValue::Str(raw))
            .await?;
        Ok(())
    }

    /// Scheduler seeds ever used, per day, oldest first.
    pub async fn start_seeds(&self) -> CoreResult<BTreeMap<u32, Vec<u64>>> {
        let Some(value) = self.database.get_config(config_keys::START_SEEDS).await? else {
            return Ok(BTreeMap::new());
        };
        let raw = value
            .as_str()
            .ok_or_else(|| CoreError::Parsing("start_seeds must be a str config".into()))?
            .to_string();
        serde_json::from_str(&raw).map_err(|e| CoreError::Parsing(format!("start_seeds: {e}")))
    }

    /// Append a seed to the day's history so an assignment can be replayed.
    pub async fn log_start_seed(&self, day: u32, seed: u64) -> CoreResult<()> {
        let mut seeds = self.start_seeds().await?;
        seeds.entry(day).or_default().push(seed);
        let raw = serde_json::to_string(&seeds)
            .map_err(|e| CoreError::Parsing(format!("start_seeds: {e}")))?;
        self.database
            .set_config(config_keys::START_SEEDS, ConfigValue::Str(raw))
            .await?;
        Ok(())
    }
}
