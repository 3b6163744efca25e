//! ATRIVA遥测控制台主程序

mod app;
mod config;

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use crate::app::ConsoleApp;
use crate::config::load_config;

/// 控制台命令行参数
#[derive(Parser, Debug)]
#[command(name = "atriva-console")]
#[command(about = "ATRIVA 实时临床遥测监控台")]
struct Args {
    /// 后端主机（覆盖配置）
    #[arg(long)]
    host: Option<String>,

    /// 后端端口（覆盖配置）
    #[arg(long)]
    port: Option<u16>,

    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 日志级别
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// 操作员账号
    #[arg(short, long)]
    username: String,

    /// 操作员密码
    #[arg(long)]
    password: String,

    /// 启动前执行批量离线推理的文件
    #[arg(long, num_args = 1..)]
    upload: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(args.log_level.as_str())
        .init();

    info!("启动ATRIVA遥测控制台...");

    let mut config = load_config(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.backend.host = host;
    }
    if let Some(port) = args.port {
        config.backend.port = port;
    }

    info!("控制台配置:");
    info!("  REST端点: {}", config.backend.http_base());
    info!("  遥测端点: {}", config.backend.telemetry_url());
    info!("  重连延迟: {}s", config.stream.reconnect_delay_secs);

    let app = ConsoleApp::new(&config);
    app.start(&args.username, &args.password).await?;

    if !args.upload.is_empty() {
        app.upload(&args.upload).await;
    }

    app.run().await
}
