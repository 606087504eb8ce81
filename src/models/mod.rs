pub mod process;
pub mod sample;

pub use process::{ProcessMetrics, ProcessName, StatusTable};
pub use sample::ProcessSample;
