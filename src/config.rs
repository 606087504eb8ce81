use anyhow::{bail, Context};
use log::info;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::models::ProcessName;

pub const DEFAULT_SAMPLING_INTERVAL: u64 = 5;

fn default_sampling_interval() -> u64 {
    DEFAULT_SAMPLING_INTERVAL
}

/// 监控配置文件
///
/// ```json
/// { "sampling_interval": 5, "processes": ["nginx", "Chrome"] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MonitorConfig {
    /// 采样间隔（秒），必须为正数
    #[serde(default = "default_sampling_interval")]
    pub sampling_interval: u64,

    /// 需要监控的进程名（大小写不敏感）
    #[serde(default)]
    pub processes: Vec<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sampling_interval: DEFAULT_SAMPLING_INTERVAL,
            processes: Vec::new(),
        }
    }
}

impl MonitorConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        info!("Loading configuration from {}", path.display());
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_json(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        info!("Loaded config: {:?}", config);
        Ok(config)
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(raw).context("malformed JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Replaces the file's interval with a command-line value.
    pub fn with_sampling_interval(mut self, interval: Option<u64>) -> anyhow::Result<Self> {
        if let Some(interval) = interval {
            self.sampling_interval = interval;
            self.validate()?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sampling_interval == 0 {
            bail!("sampling_interval must be a positive number of seconds");
        }
        self.watchlist()?;
        Ok(())
    }

    /// Normalized process names, in file order.
    pub fn watchlist(&self) -> anyhow::Result<Vec<ProcessName>> {
        self.processes
            .iter()
            .map(|raw| {
                ProcessName::parse(raw).with_context(|| format!("invalid process name {:?}", raw))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"sampling_interval": 2, "processes": ["Python", "Bash"]}}"#).unwrap();

        let config = MonitorConfig::load(file.path()).unwrap();
        assert_eq!(config.sampling_interval, 2);
        let names: Vec<_> = config.watchlist().unwrap();
        assert_eq!(names[0].as_str(), "python");
        assert_eq!(names[1].as_str(), "bash");
    }

    #[test]
    fn test_defaults_apply() {
        let config = MonitorConfig::from_json("{}").unwrap();
        assert_eq!(config, MonitorConfig::default());
        assert_eq!(config.sampling_interval, 5);
        assert!(config.processes.is_empty());
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let config = MonitorConfig::from_json(r#"{"processes": ["a"], "port": 1}"#).unwrap();
        assert_eq!(config.processes, vec!["a"]);
    }

    #[test]
    fn test_rejects_bad_documents() {
        assert!(MonitorConfig::from_json("not json").is_err());
        assert!(MonitorConfig::from_json(r#"{"sampling_interval": 0}"#).is_err());
        assert!(MonitorConfig::from_json(r#"{"sampling_interval": -3}"#).is_err());
        assert!(MonitorConfig::from_json(r#"{"sampling_interval": "5"}"#).is_err());
        assert!(MonitorConfig::from_json(r#"{"processes": "nginx"}"#).is_err());
        assert!(MonitorConfig::from_json(r#"{"processes": [""]}"#).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = MonitorConfig::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to read config file"));
    }

    #[test]
    fn test_interval_override() {
        let config = MonitorConfig::default().with_sampling_interval(Some(1)).unwrap();
        assert_eq!(config.sampling_interval, 1);
        let config = config.with_sampling_interval(None).unwrap();
        assert_eq!(config.sampling_interval, 1);
        assert!(MonitorConfig::default().with_sampling_interval(Some(0)).is_err());
    }
}
