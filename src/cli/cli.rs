use clap::Parser;
use std::path::PathBuf;

/// Process Monitor - 进程存活与资源占用监控
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// 监听端口
    #[arg(short, long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// 监听地址
    #[arg(short = 'a', long, env = "ADDRESS", default_value = "0.0.0.0")]
    pub address: String,

    /// 配置文件路径 (JSON)
    #[arg(short, long, env = "CONFIG_PATH", default_value = "config.json")]
    pub config: PathBuf,

    /// 覆盖配置文件中的采样间隔（秒）
    #[arg(short = 'i', long, env = "SAMPLING_INTERVAL")]
    pub sampling_interval: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides() {
        let args = CommandArgs::try_parse_from([
            "process-monitor", "-p", "9000", "-c", "/etc/monitor.json", "-i", "2",
        ])
        .unwrap();
        assert_eq!(args.port, 9000);
        assert_eq!(args.config, PathBuf::from("/etc/monitor.json"));
        assert_eq!(args.sampling_interval, Some(2));
    }
}
