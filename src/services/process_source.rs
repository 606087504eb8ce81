use sysinfo::{Pid, Process, ProcessRefreshKind, ProcessesToUpdate, System};

use crate::error::ProcessQueryError;
use crate::models::ProcessSample;

/// 单次枚举的结果：每个进程要么采样成功，要么在读取期间失败
pub type Enumeration = Vec<Result<ProcessSample, ProcessQueryError>>;

/// Lists every live OS process.
///
/// An `Err` from [`ProcessSource::snapshot`] means the listing itself is
/// unavailable; failures reading one process are reported per entry instead.
pub trait ProcessSource: Send {
    fn snapshot(&mut self) -> anyhow::Result<Enumeration>;
}

/// Snapshot source backed by a long-lived `sysinfo::System`.
///
/// Keeping the same `System` between cycles lets sysinfo compute CPU usage
/// from the delta since the previous refresh.
pub struct SysinfoSource {
    system: System,
}

impl SysinfoSource {
    pub fn new() -> Self {
        let mut system = System::new();
        // 预热一次，第一个周期即可得到 CPU 增量
        system.refresh_processes_specifics(ProcessesToUpdate::All, true, refresh_kind());
        Self { system }
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

fn refresh_kind() -> ProcessRefreshKind {
    ProcessRefreshKind::nothing()
        .with_cpu()
        .with_memory()
        .with_tasks()
}

impl ProcessSource for SysinfoSource {
    fn snapshot(&mut self) -> anyhow::Result<Enumeration> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            anyhow::bail!("process enumeration is not supported on this platform");
        }

        self.system
            .refresh_processes_specifics(ProcessesToUpdate::All, true, refresh_kind());

        let samples = self
            .system
            .processes()
            .iter()
            // Linux 下线程也会作为独立条目出现
            .filter(|(_, process)| process.thread_kind().is_none())
            .map(|(pid, process)| sample_process(*pid, process))
            .collect();

        Ok(samples)
    }
}

fn sample_process(pid: Pid, process: &Process) -> Result<ProcessSample, ProcessQueryError> {
    let pid = pid.as_u32();
    let name = process.name().to_string_lossy();

    // sysinfo 读不到 /proc 条目时会留下空名称和零启动时间
    if name.is_empty() {
        return Err(ProcessQueryError::AccessDenied { pid });
    }
    if process.start_time() == 0 {
        return Err(ProcessQueryError::Vanished { pid });
    }

    // tasks() 不包含主线程本身
    let num_threads = process
        .tasks()
        .map(|tasks| tasks.len() + 1)
        .unwrap_or(1);

    Ok(ProcessSample {
        pid,
        name: name.into_owned(),
        cpu_percent: process.cpu_usage(),
        rss_bytes: process.memory(),
        num_threads: num_threads as u64,
        start_time: process.start_time(),
    })
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeInner {
        processes: Enumeration,
        unavailable: bool,
        panicking: bool,
        calls: usize,
    }

    /// In-memory source whose listing tests can change between cycles.
    #[derive(Clone, Default)]
    pub struct FakeSource {
        inner: Arc<Mutex<FakeInner>>,
    }

    impl FakeSource {
        pub fn with_processes(processes: Vec<ProcessSample>) -> Self {
            let source = Self::default();
            source.set_processes(processes);
            source
        }

        pub fn set_processes(&self, processes: Vec<ProcessSample>) {
            self.inner.lock().unwrap().processes = processes.into_iter().map(Ok).collect();
        }

        pub fn push_error(&self, error: ProcessQueryError) {
            self.inner.lock().unwrap().processes.push(Err(error));
        }

        pub fn set_unavailable(&self, unavailable: bool) {
            self.inner.lock().unwrap().unavailable = unavailable;
        }

        pub fn set_panicking(&self, panicking: bool) {
            self.inner.lock().unwrap().panicking = panicking;
        }

        pub fn calls(&self) -> usize {
            self.inner.lock().unwrap().calls
        }
    }

    impl ProcessSource for FakeSource {
        fn snapshot(&mut self) -> anyhow::Result<Enumeration> {
            let mut inner = self.inner.lock().unwrap();
            inner.calls += 1;
            if inner.panicking {
                // release the lock first so the panic does not poison it
                drop(inner);
                panic!("process table exploded");
            }
            if inner.unavailable {
                anyhow::bail!("process table unavailable");
            }
            Ok(inner.processes.clone())
        }
    }

    pub fn sample(name: &str, cpu: f32, rss_mib: u64, threads: u64, start_time: u64) -> ProcessSample {
        ProcessSample {
            pid: 1000,
            name: name.to_string(),
            cpu_percent: cpu,
            rss_bytes: rss_mib * 1024 * 1024,
            num_threads: threads,
            start_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sysinfo_source_finds_current_process() {
        let mut source = SysinfoSource::new();
        let samples = source.snapshot().unwrap();
        let current = std::process::id();

        let own = samples
            .iter()
            .filter_map(|s| s.as_ref().ok())
            .find(|s| s.pid == current)
            .expect("current process should be listed");

        assert!(!own.name.is_empty());
        assert!(own.rss_bytes > 0);
        assert!(own.num_threads >= 1);
        assert!(own.start_time > 0);
    }

    #[cfg(target_os = "linux")]
    fn kernel_thread_count() -> u64 {
        std::fs::read_to_string("/proc/self/status")
            .unwrap()
            .lines()
            .find_map(|line| line.strip_prefix("Threads:"))
            .and_then(|value| value.trim().parse().ok())
            .expect("Threads line in /proc/self/status")
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_thread_count_includes_main_thread() {
        use std::sync::mpsc;

        let (release, parked) = mpsc::channel::<()>();
        let parked = std::sync::Arc::new(std::sync::Mutex::new(parked));
        let workers: Vec<_> = (0..3)
            .map(|_| {
                let parked = parked.clone();
                std::thread::spawn(move || {
                    let _ = parked.lock().unwrap().recv();
                })
            })
            .collect();

        let mut source = SysinfoSource::new();
        let current = std::process::id();
        let mut observed = Vec::new();

        // other tests spawn threads in parallel; retry until the count holds still
        for _ in 0..20 {
            let before = kernel_thread_count();
            let sampled = source
                .snapshot()
                .unwrap()
                .into_iter()
                .filter_map(Result::ok)
                .find(|s| s.pid == current)
                .expect("current process should be listed")
                .num_threads;
            let after = kernel_thread_count();

            if before == after && sampled == before {
                break;
            }
            observed.push((before, sampled, after));
        }
        assert!(observed.len() < 20, "sampled thread count never matched the kernel: {:?}", observed);

        drop(release);
        for worker in workers {
            worker.join().unwrap();
        }
    }
}
