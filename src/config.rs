use std::time::Duration;

use anyhow::Context;

pub const DEFAULT_ANALYSIS_DELAY_MS: u64 = 2000;
pub const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TOP_MEMBERS: usize = 5;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Knobs the review desk itself reads.
#[derive(Debug, Clone)]
pub struct DeskSettings {
    pub analysis_timeout: Duration,
    pub top_members: usize,
    pub skills_per_member: usize,
}

impl Default for DeskSettings {
    fn default() -> Self {
        Self {
            analysis_timeout: Duration::from_secs(DEFAULT_ANALYSIS_TIMEOUT_SECS),
            top_members: DEFAULT_TOP_MEMBERS,
            skills_per_member: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub analysis_delay: Duration,
    pub desk: DeskSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            analysis_delay: Duration::from_millis(DEFAULT_ANALYSIS_DELAY_MS),
            desk: DeskSettings::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        config.database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        if let Some(value) = lookup("TASKFLOW_MAX_CONNECTIONS") {
            config.max_connections = value
                .parse()
                .context("TASKFLOW_MAX_CONNECTIONS must be a positive integer")?;
        }
        if let Some(value) = lookup("TASKFLOW_ANALYSIS_DELAY_MS") {
            let ms: u64 = value
                .parse()
                .context("TASKFLOW_ANALYSIS_DELAY_MS must be milliseconds")?;
            config.analysis_delay = Duration::from_millis(ms);
        }
        if let Some(value) = lookup("TASKFLOW_ANALYSIS_TIMEOUT_SECS") {
            let secs: u64 = value
                .parse()
                .context("TASKFLOW_ANALYSIS_TIMEOUT_SECS must be seconds")?;
            config.desk.analysis_timeout = Duration::from_secs(secs);
        }
        if let Some(value) = lookup("TASKFLOW_TOP_MEMBERS") {
            config.desk.top_members = value
                .parse()
                .context("TASKFLOW_TOP_MEMBERS must be a positive integer")?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
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
    fn defaults_use_memory_store() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert!(config.database_url.is_none());
        assert_eq!(config.analysis_delay, Duration::from_millis(2000));
        assert_eq!(config.desk.top_members, 5);
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/taskflow"),
            ("TASKFLOW_ANALYSIS_DELAY_MS", "0"),
            ("TASKFLOW_TOP_MEMBERS", "3"),
        ]))
        .unwrap();
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/taskflow")
        );
        assert!(config.analysis_delay.is_zero());
        assert_eq!(config.desk.top_members, 3);
    }

    #[test]
    fn blank_database_url_is_ignored() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "  ")])).unwrap();
        assert!(config.database_url.is_none());
    }

    #[test]
    fn malformed_numbers_are_errors() {
        assert!(Config::from_lookup(lookup(&[("TASKFLOW_TOP_MEMBERS", "many")])).is_err());
    }
}
