pub mod monitor;
pub mod process_source;
pub mod sampler;

pub use monitor::ProcessMonitor;
