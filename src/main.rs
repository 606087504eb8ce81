use actix_web::{web, App, HttpServer};
use anyhow::Context;
use clap::Parser;
use std::sync::Arc;

mod api;
mod cli;
mod config;
mod error;
mod metrics;
mod models;
mod services;
mod state;

use cli::CommandArgs;
use config::MonitorConfig;
use services::ProcessMonitor;
use state::AppState;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CommandArgs::parse();
    let bind_address = format!("{}:{}", args.address, args.port);

    // 配置错误直接退出，不允许半初始化启动
    let config = MonitorConfig::load(&args.config)
        .and_then(|config| config.with_sampling_interval(args.sampling_interval))
        .context("failed to load monitor configuration")?;

    let monitor: AppState = Arc::new(ProcessMonitor::from_config(&config)?);

    let data = web::Data::new(monitor.clone());
    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .configure(api::configure)
    })
        .bind(&bind_address)
        .with_context(|| format!("failed to bind {}", bind_address))?
        .run();

    monitor.start();
    print_banner(&args, config.sampling_interval, monitor.watchlist().len());

    let result = server.await.context("HTTP server failed");
    monitor.stop().await;
    result
}

fn print_banner(args: &CommandArgs, sampling_interval: u64, watched: usize) {
    println!("╔═══════════════════════════════════════════════════════════╗");
    println!("║      Process Monitor v{:<36}║", env!("CARGO_PKG_VERSION"));
    println!("╚═══════════════════════════════════════════════════════════╝");
    println!();
    println!("🚀 Server starting on http://{}:{}", args.address, args.port);
    println!("⏱  Sampling every {}s, watching {} process(es)", sampling_interval, watched);
    println!();
    println!("📋 Available endpoints:");
    println!("  GET    /dashboard        - HTML status table");
    println!("  GET    /status           - Status table (JSON)");
    println!("  GET    /processes        - Watched process names");
    println!("  POST   /add_process      - Start watching a process");
    println!("  DELETE /delete_process   - Stop watching a process");
    println!("  GET    /metrics          - Prometheus metrics");
    println!("  GET    /health           - Health check");
    println!("═══════════════════════════════════════════════════════════");
}
