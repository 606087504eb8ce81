use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::InvalidProcessName;
use crate::models::sample::ProcessSample;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// 进程名称的最大长度
pub const MAX_NAME_LEN: usize = 255;

/// 被监控进程的名称（统一为小写）
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessName(String);

impl ProcessName {
    /// Trims and lowercases `raw`, rejecting names that can never match a process.
    pub fn parse(raw: &str) -> Result<Self, InvalidProcessName> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidProcessName::Empty);
        }
        if trimmed.chars().count() > MAX_NAME_LEN {
            return Err(InvalidProcessName::TooLong { max: MAX_NAME_LEN });
        }
        if trimmed.chars().any(char::is_control) {
            return Err(InvalidProcessName::ControlCharacters(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ProcessName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// 单个进程的最新采样结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct ProcessMetrics {
    /// 是否正在运行
    pub running: bool,
    /// CPU 使用率 (百分比)
    pub cpu_percent: f64,
    /// 常驻内存 (MB)
    pub memory_mb: f64,
    /// 线程数
    pub num_threads: u64,
    /// 运行时长 (秒)
    pub lifetime_sec: u64,
}

impl ProcessMetrics {
    /// Zeroed entry for a watched name with no live process.
    pub fn not_running() -> Self {
        Self::default()
    }

    /// Metrics for a live process, with `now` in unix seconds.
    pub fn from_sample(sample: &ProcessSample, now: u64) -> Self {
        let cpu = f64::from(sample.cpu_percent);
        Self {
            running: true,
            cpu_percent: if cpu.is_finite() && cpu > 0.0 { cpu } else { 0.0 },
            memory_mb: sample.rss_bytes as f64 / BYTES_PER_MB,
            num_threads: sample.num_threads,
            lifetime_sec: now.saturating_sub(sample.start_time),
        }
    }
}

/// 已发布的状态表，按进程名排序
pub type StatusTable = BTreeMap<ProcessName, ProcessMetrics>;
