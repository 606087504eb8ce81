use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::watch;
use tokio::task::{self, JoinHandle};

use crate::metrics::METRICS;
use crate::models::{ProcessMetrics, ProcessName, StatusTable};
use crate::services::process_source::{Enumeration, ProcessSource};
use crate::state::WatchState;

/// Extra time `stop` waits on top of one interval before aborting the task.
const STOP_GRACE: Duration = Duration::from_secs(2);

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Matches one enumeration against the watchlist.
///
/// Every watched name ends up in the table: live matches carry their metrics
/// (the last matching process wins), everything else is zeroed as not running.
pub fn build_status_table(
    watchlist: &[ProcessName],
    processes: Enumeration,
    now: u64,
) -> StatusTable {
    let watched: HashMap<&str, &ProcessName> =
        watchlist.iter().map(|name| (name.as_str(), name)).collect();
    let mut table = StatusTable::new();

    for entry in processes {
        let sample = match entry {
            Ok(sample) => sample,
            Err(e) => {
                debug!("Skipping process: {}", e);
                continue;
            }
        };

        let lowered = sample.name.to_lowercase();
        if let Some(name) = watched.get(lowered.as_str()) {
            let metrics = ProcessMetrics::from_sample(&sample, now);
            debug!(
                "Process '{}' (PID {}) is running: CPU={:.2}%, MEM={:.2}MB, Threads={}, Lifetime={}s",
                name, sample.pid, metrics.cpu_percent, metrics.memory_mb,
                metrics.num_threads, metrics.lifetime_sec
            );
            table.insert((*name).clone(), metrics);
        }
    }

    for name in watchlist {
        if !table.contains_key(name) {
            debug!("Process '{}' not found, marked as not running", name);
            table.insert(name.clone(), ProcessMetrics::not_running());
        }
    }

    table
}

/// One enumerate-match-publish pass over shared state.
#[derive(Clone)]
pub struct SamplingCycle {
    state: Arc<WatchState>,
    source: Arc<Mutex<Box<dyn ProcessSource>>>,
}

impl SamplingCycle {
    pub fn new(state: Arc<WatchState>, source: Box<dyn ProcessSource>) -> Self {
        Self {
            state,
            source: Arc::new(Mutex::new(source)),
        }
    }

    fn source(&self) -> MutexGuard<'_, Box<dyn ProcessSource>> {
        self.source.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn run(&self) -> anyhow::Result<usize> {
        self.run_at(unix_now())
    }

    /// Runs a cycle with `now` as the reference time and returns the number of
    /// entries read from the watchlist. On error nothing is published.
    pub fn run_at(&self, now: u64) -> anyhow::Result<usize> {
        let watchlist = self.state.watchlist();
        let processes = self.source().snapshot()?;

        let table = build_status_table(&watchlist, processes, now);
        let published = table.len();
        self.state.replace(table);
        Ok(published)
    }
}

struct RunningTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Background loop that runs a [`SamplingCycle`] every interval.
pub struct Sampler {
    cycle: SamplingCycle,
    interval: Duration,
    task: Mutex<Option<RunningTask>>,
}

impl Sampler {
    pub fn new(cycle: SamplingCycle, interval: Duration) -> Self {
        Self {
            cycle,
            interval,
            task: Mutex::new(None),
        }
    }

    fn task(&self) -> MutexGuard<'_, Option<RunningTask>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.task()
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /// Spawns the loop on the current tokio runtime. Returns `false` when a
    /// loop is already running.
    pub fn start(&self) -> bool {
        let mut task = self.task();
        if task.as_ref().is_some_and(|running| !running.handle.is_finished()) {
            warn!("Sampler is already running");
            return false;
        }

        let (shutdown, signal) = watch::channel(false);
        let handle = tokio::spawn(sampling_loop(self.cycle.clone(), self.interval, signal));
        *task = Some(RunningTask { shutdown, handle });

        info!("Starting process sampler (interval {:?})", self.interval);
        true
    }

    /// Signals the loop and waits for it, at most one interval plus a grace
    /// period. Returns `false` when nothing was running.
    pub async fn stop(&self) -> bool {
        let running = self.task().take();
        let Some(RunningTask { shutdown, mut handle }) = running else {
            return false;
        };

        info!("Stopping process sampler...");
        let _ = shutdown.send(true);

        let limit = self.interval.saturating_add(STOP_GRACE);
        match tokio::time::timeout(limit, &mut handle).await {
            Ok(Ok(())) => info!("Process sampler stopped"),
            Ok(Err(e)) => warn!("Process sampler ended abnormally: {}", e),
            Err(_) => {
                warn!("Process sampler did not stop within {:?}, aborting", limit);
                handle.abort();
            }
        }
        true
    }
}

async fn sampling_loop(cycle: SamplingCycle, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    loop {
        let stopping = *shutdown.borrow();
        if stopping {
            break;
        }

        // 周期体在阻塞线程池中执行，panic 只会变成 JoinError；
        // 循环其余部分不会 panic，若出现则由 stop() 通过 JoinHandle 记录
        let job = cycle.clone();
        match task::spawn_blocking(move || job.run()).await {
            Ok(Ok(published)) => {
                METRICS.sampling_cycles.inc();
                debug!("Sampling cycle published {} entries", published);
            }
            Ok(Err(e)) => {
                METRICS.sampling_failures.inc();
                warn!("Sampling cycle failed, retrying in {:?}: {:#}", interval, e);
            }
            Err(e) => {
                METRICS.sampling_failures.inc();
                error!("Sampling cycle panicked: {}", e);
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    debug!("Sampling loop exited");
}
