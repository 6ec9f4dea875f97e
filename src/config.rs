use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use tracing::{info, warn};

use crate::{error::Error, history::DEFAULT_HISTORY_LIMIT};

pub const PORT: &str = "STRESSCHECK_PORT";
pub const DATA: &str = "STRESSCHECK_DATA";
pub const HISTORY_LIMIT: &str = "STRESSCHECK_HISTORY_LIMIT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    /// CSV file the results are appended to.
    pub data_path: PathBuf,
    /// History rows and chart points returned when the request names no limit.
    pub history_limit: usize,
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let config = Self {
            port: try_load(&lookup, PORT, "5001")?,
            data_path: try_load(&lookup, DATA, "data/results.csv")?,
            history_limit: try_load(&lookup, HISTORY_LIMIT, &DEFAULT_HISTORY_LIMIT.to_string())?,
        };
        if config.history_limit == 0 {
            return Err(Error::Config(format!("{HISTORY_LIMIT} must be at least 1")));
        }
        Ok(config)
    }
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T, Error>
where
    T::Err: Display,
{
    lookup(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            Error::Config(format!("invalid {key}: {e}"))
        })
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(
            config,
            Config {
                port: 5001,
                data_path: PathBuf::from("data/results.csv"),
                history_limit: 10,
            }
        );
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            (PORT, "8080"),
            (DATA, "/var/lib/stresscheck/results.csv"),
            (HISTORY_LIMIT, "5"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.data_path,
            PathBuf::from("/var/lib/stresscheck/results.csv")
        );
        assert_eq!(config.history_limit, 5);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            Config::from_lookup(lookup(&[(PORT, "not-a-port")])),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[(HISTORY_LIMIT, "0")])),
            Err(Error::Config(_))
        ));
    }
}
