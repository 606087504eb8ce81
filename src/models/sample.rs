/// One live OS process as reported by a snapshot source.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSample {
    pub pid: u32,

    /// 进程名（未归一化）
    pub name: String,

    /// CPU 使用率 (百分比)
    pub cpu_percent: f32,

    /// 常驻内存 (字节)
    pub rss_bytes: u64,

    /// 线程数
    pub num_threads: u64,

    /// 启动时间（Unix 秒）
    pub start_time: u64,
}
