use prometheus::{
    Encoder, Gauge, GaugeVec, IntCounter, Opts, Registry, TextEncoder,
    register_gauge_vec_with_registry, register_gauge_with_registry,
    register_int_counter_with_registry,
};
use lazy_static::lazy_static;
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::StatusTable;

pub struct MetricsRegistry {
    registry: Registry,

    // 同一时刻只允许一次抓取重建并渲染 per-process gauges
    scrape: Mutex<()>,

    // Per-process gauges, rebuilt from the status table on each scrape
    pub process_up: GaugeVec,
    pub process_cpu_usage: GaugeVec,
    pub process_memory_mb: GaugeVec,
    pub process_thread_count: GaugeVec,
    pub process_lifetime_seconds: GaugeVec,

    // Sampler health
    pub watched_processes: Gauge,
    pub sampling_cycles: IntCounter,
    pub sampling_failures: IntCounter,
}

impl MetricsRegistry {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let labels = &["name"];

        let process_up = register_gauge_vec_with_registry!(
            Opts::new("process_up", "Process is running (1) or down (0)"),
            labels,
            registry
        )?;

        let process_cpu_usage = register_gauge_vec_with_registry!(
            Opts::new("process_cpu_usage_percent", "Process CPU usage percentage"),
            labels,
            registry
        )?;

        let process_memory_mb = register_gauge_vec_with_registry!(
            Opts::new("process_memory_mb", "Process resident memory in MiB"),
            labels,
            registry
        )?;

        let process_thread_count = register_gauge_vec_with_registry!(
            Opts::new("process_thread_count", "Number of threads"),
            labels,
            registry
        )?;

        let process_lifetime_seconds = register_gauge_vec_with_registry!(
            Opts::new("process_lifetime_seconds", "Seconds since the process started"),
            labels,
            registry
        )?;

        let watched_processes = register_gauge_with_registry!(
            Opts::new("process_monitor_watched_processes", "Number of entries in the status table"),
            registry
        )?;

        let sampling_cycles = register_int_counter_with_registry!(
            Opts::new("process_monitor_sampling_cycles_total", "Completed sampling cycles"),
            registry
        )?;

        let sampling_failures = register_int_counter_with_registry!(
            Opts::new("process_monitor_sampling_failures_total", "Sampling cycles that failed"),
            registry
        )?;

        Ok(Self {
            registry,
            scrape: Mutex::new(()),
            process_up,
            process_cpu_usage,
            process_memory_mb,
            process_thread_count,
            process_lifetime_seconds,
            watched_processes,
            sampling_cycles,
            sampling_failures,
        })
    }

    /// Rebuilds the per-process series from `status` and renders the registry.
    ///
    /// Concurrent scrapes are serialized so one scrape's reset never lands
    /// between another's rebuild and render.
    pub fn update_and_render(&self, status: &StatusTable) -> anyhow::Result<String> {
        let _scrape = self.scrape.lock().unwrap_or_else(PoisonError::into_inner);
        self.update(status);
        self.render()
    }

    fn update(&self, status: &StatusTable) {
        self.process_up.reset();
        self.process_cpu_usage.reset();
        self.process_memory_mb.reset();
        self.process_thread_count.reset();
        self.process_lifetime_seconds.reset();

        for (name, metrics) in status {
            let labels = &[name.as_str()];
            self.process_up
                .with_label_values(labels)
                .set(if metrics.running { 1.0 } else { 0.0 });

            // 只有进程运行时才输出资源 metrics
            if metrics.running {
                self.process_cpu_usage.with_label_values(labels).set(metrics.cpu_percent);
                self.process_memory_mb.with_label_values(labels).set(metrics.memory_mb);
                self.process_thread_count
                    .with_label_values(labels)
                    .set(metrics.num_threads as f64);
                self.process_lifetime_seconds
                    .with_label_values(labels)
                    .set(metrics.lifetime_sec as f64);
            }
        }

        self.watched_processes.set(status.len() as f64);
    }

    fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

lazy_static! {
    pub static ref METRICS: Arc<MetricsRegistry> =
        Arc::new(MetricsRegistry::new().expect("metric definitions are valid"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProcessMetrics, ProcessName};

    fn table() -> StatusTable {
        let mut table = StatusTable::new();
        table.insert(
            ProcessName::parse("alpha").unwrap(),
            ProcessMetrics {
                running: true,
                cpu_percent: 2.5,
                memory_mb: 50.0,
                num_threads: 4,
                lifetime_sec: 10,
            },
        );
        table.insert(ProcessName::parse("beta").unwrap(), ProcessMetrics::not_running());
        table
    }

    #[test]
    fn test_render_status_table() {
        let metrics = MetricsRegistry::new().unwrap();
        let text = metrics.update_and_render(&table()).unwrap();

        assert!(text.contains(r#"process_up{name="alpha"} 1"#));
        assert!(text.contains(r#"process_up{name="beta"} 0"#));
        assert!(text.contains(r#"process_memory_mb{name="alpha"} 50"#));
        assert!(text.contains(r#"process_thread_count{name="alpha"} 4"#));
        assert!(!text.contains(r#"process_cpu_usage_percent{name="beta"}"#));
        assert!(text.contains("process_monitor_watched_processes 2"));
    }

    #[test]
    fn test_removed_names_disappear() {
        let metrics = MetricsRegistry::new().unwrap();
        metrics.update_and_render(&table()).unwrap();
        let text = metrics.update_and_render(&StatusTable::new()).unwrap();

        assert!(!text.contains(r#"name="alpha""#));
        assert!(text.contains("process_monitor_watched_processes 0"));
    }

    #[test]
    fn test_concurrent_scrapes_see_full_table() {
        let metrics = Arc::new(MetricsRegistry::new().unwrap());
        let status = Arc::new(table());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = metrics.clone();
                let status = status.clone();
                std::thread::spawn(move || {
                    let mut incomplete = 0usize;
                    for _ in 0..1000 {
                        let text = metrics.update_and_render(&status).unwrap();
                        if !text.contains(r#"process_up{name="alpha"} 1"#)
                            || !text.contains(r#"process_up{name="beta"} 0"#)
                        {
                            incomplete += 1;
                        }
                    }
                    incomplete
                })
            })
            .collect();

        let incomplete: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(incomplete, 0);
    }
}
