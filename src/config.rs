use crate::engine::charges::{FeeScheduleTable, ScheduleError};
use crate::engine::BucketPeriod;
use chrono_tz::Tz;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    /// Day boundaries for intraday/delivery classification.
    pub exchange_timezone: Tz,
    /// Bucket boundaries and labels.
    pub display_timezone: Tz,
    pub bucket_period: BucketPeriod,
    pub fee_schedule_path: Option<String>,
    pub auto_charges: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let exchange_timezone = parse_timezone(&env_map, "EXCHANGE_TIMEZONE", "Asia/Kolkata")?;
        let display_timezone = parse_timezone(&env_map, "DISPLAY_TIMEZONE", "UTC")?;

        let bucket_period = env_map
            .get("BUCKET_PERIOD")
            .map(|s| s.as_str())
            .unwrap_or("daily")
            .parse::<BucketPeriod>()
            .map_err(|e| ConfigError::InvalidValue("BUCKET_PERIOD".to_string(), e))?;

        let fee_schedule_path = env_map
            .get("FEE_SCHEDULE_PATH")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let auto_charges = match env_map
            .get("AUTO_CHARGES")
            .map(|s| s.as_str())
            .unwrap_or("true")
        {
            "true" | "1" => true,
            "false" | "0" => false,
            other => {
                return Err(ConfigError::InvalidValue(
                    "AUTO_CHARGES".to_string(),
                    format!("must be true or false, got {}", other),
                ))
            }
        };

        Ok(Config {
            exchange_timezone,
            display_timezone,
            bucket_period,
            fee_schedule_path,
            auto_charges,
        })
    }

    /// The configured schedule file, or the built-in table when none is set.
    pub fn load_fee_schedules(&self) -> Result<FeeScheduleTable, ConfigError> {
        match &self.fee_schedule_path {
            Some(path) => {
                let table = FeeScheduleTable::from_path(path)?;
                tracing::info!(path = %path, entries = table.len(), "Loaded fee schedules");
                Ok(table)
            }
            None => Ok(FeeScheduleTable::builtin()),
        }
    }
}

fn parse_timezone(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<Tz, ConfigError> {
    let value = env_map.get(key).map(|s| s.as_str()).unwrap_or(default);
    value.parse::<Tz>().map_err(|_| {
        ConfigError::InvalidValue(
            key.to_string(),
            format!("unknown IANA timezone {}", value),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(HashMap::new()).unwrap();
        assert_eq!(config.exchange_timezone, chrono_tz::Asia::Kolkata);
        assert_eq!(config.display_timezone, chrono_tz::UTC);
        assert_eq!(config.bucket_period, BucketPeriod::Daily);
        assert!(config.fee_schedule_path.is_none());
        assert!(config.auto_charges);
    }

    #[test]
    fn test_invalid_exchange_timezone() {
        let mut env_map = HashMap::new();
        env_map.insert("EXCHANGE_TIMEZONE".to_string(), "Mars/Olympus".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "EXCHANGE_TIMEZONE"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_bucket_period() {
        let mut env_map = HashMap::new();
        env_map.insert("BUCKET_PERIOD".to_string(), "hourly".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "BUCKET_PERIOD"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_auto_charges() {
        let mut env_map = HashMap::new();
        env_map.insert("AUTO_CHARGES".to_string(), "maybe".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "AUTO_CHARGES"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_display_timezone_override() {
        let mut env_map = HashMap::new();
        env_map.insert("DISPLAY_TIMEZONE".to_string(), "America/New_York".to_string());
        env_map.insert("AUTO_CHARGES".to_string(), "false".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.display_timezone, chrono_tz::America::New_York);
        assert!(!config.auto_charges);
    }

    #[test]
    fn test_builtin_schedules_without_path() {
        let config = Config::from_env_map(HashMap::new()).unwrap();
        let table = config.load_fee_schedules().unwrap();
        assert_eq!(table, FeeScheduleTable::builtin());
    }

    #[test]
    fn test_schedules_loaded_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"broker":"acme","instrument":"equity","day_kind":"delivery","schedule":{{"stt_sell_pct":0.1}}}}]"#
        )
        .unwrap();

        let mut env_map = HashMap::new();
        env_map.insert(
            "FEE_SCHEDULE_PATH".to_string(),
            file.path().to_string_lossy().to_string(),
        );
        let config = Config::from_env_map(env_map).unwrap();
        let table = config.load_fee_schedules().unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_missing_schedule_file() {
        let mut env_map = HashMap::new();
        env_map.insert(
            "FEE_SCHEDULE_PATH".to_string(),
            "/nonexistent/fees.json".to_string(),
        );
        let config = Config::from_env_map(env_map).unwrap();
        assert!(matches!(
            config.load_fee_schedules(),
            Err(ConfigError::Schedule(ScheduleError::Io(_)))
        ));
    }
}
