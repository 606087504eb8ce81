use log::info;
use std::sync::Arc;
use std::time::Duration;

use crate::config::MonitorConfig;
use crate::error::InvalidProcessName;
use crate::models::{ProcessName, StatusTable};
use crate::services::process_source::{ProcessSource, SysinfoSource};
use crate::services::sampler::{Sampler, SamplingCycle};
use crate::state::{AddOutcome, RemoveOutcome, WatchState};

/// Watched processes, their latest status, and the sampler that keeps it fresh.
///
/// Built once in `main` and shared with the HTTP handlers; `main` owns the
/// start/stop lifecycle.
pub struct ProcessMonitor {
    state: Arc<WatchState>,
    sampler: Sampler,
}

impl ProcessMonitor {
    pub fn new(config: &MonitorConfig, source: Box<dyn ProcessSource>) -> anyhow::Result<Self> {
        let state = Arc::new(WatchState::new(config.watchlist()?));
        let interval = Duration::from_secs(config.sampling_interval);
        let sampler = Sampler::new(SamplingCycle::new(state.clone(), source), interval);

        info!(
            "Initialized process monitor with sampling_interval={}s and processes={:?}",
            config.sampling_interval,
            state.watchlist().iter().map(ProcessName::as_str).collect::<Vec<_>>()
        );

        Ok(Self { state, sampler })
    }

    /// Monitor that samples the real process table.
    pub fn from_config(config: &MonitorConfig) -> anyhow::Result<Self> {
        Self::new(config, Box::new(SysinfoSource::new()))
    }

    pub fn start(&self) -> bool {
        self.sampler.start()
    }

    pub async fn stop(&self) -> bool {
        self.sampler.stop().await
    }

    pub fn is_running(&self) -> bool {
        self.sampler.is_running()
    }

    pub fn sampling_interval(&self) -> Duration {
        self.sampler.interval()
    }

    pub fn get_status(&self) -> StatusTable {
        self.state.get_status()
    }

    pub fn watchlist(&self) -> Vec<ProcessName> {
        self.state.watchlist()
    }

    /// Starts watching `name`; its status shows up after the next cycle.
    pub fn add_process(&self, name: &str) -> Result<AddOutcome, InvalidProcessName> {
        let name = ProcessName::parse(name)?;
        let outcome = self.state.add(name.clone());
        match outcome {
            AddOutcome::Added => info!("Added process '{}' to monitoring", name),
            AddOutcome::AlreadyMonitored => info!("Process '{}' is already monitored", name),
        }
        Ok(outcome)
    }

    /// Stops watching `name` and drops its status entry right away.
    pub fn remove_process(&self, name: &str) -> Result<RemoveOutcome, InvalidProcessName> {
        let name = ProcessName::parse(name)?;
        let outcome = self.state.remove(&name);
        match outcome {
            RemoveOutcome::Removed => info!("Removed process '{}' from monitoring", name),
            RemoveOutcome::NotMonitored => info!("Process '{}' is not monitored", name),
        }
        Ok(outcome)
    }
}
