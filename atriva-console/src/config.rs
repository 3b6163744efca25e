//! 配置管理
//!
//! 配置来源分层：内置默认值 < 配置文件 < ATRIVA_ 环境变量。

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use atriva_core::{AtrivaError, Result};

/// 控制台完整配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// 后端服务配置
    pub backend: BackendConfig,
    /// 流连接配置
    pub stream: StreamSettings,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 后端服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// 后端主机
    pub host: String,
    /// 后端端口
    pub port: u16,
}

impl BackendConfig {
    /// REST端点基址
    pub fn http_base(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// 遥测WebSocket端点
    pub fn telemetry_url(&self) -> String {
        format!("ws://{}:{}/telemetry", self.host, self.port)
    }
}

/// 流连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSettings {
    /// 断线重连延迟（秒）
    pub reconnect_delay_secs: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别过滤
    pub level: String,
}

/// 加载配置
///
/// 配置文件可选；环境变量形如 ATRIVA_BACKEND__HOST。
pub fn load_config(path: Option<&str>) -> Result<ConsoleConfig> {
    let mut builder = Config::builder()
        .set_default("backend.host", "localhost")
        .and_then(|b| b.set_default("backend.port", 8000_i64))
        .and_then(|b| b.set_default("stream.reconnect_delay_secs", 3_i64))
        .and_then(|b| b.set_default("logging.level", "info"))
        .map_err(|e| AtrivaError::Config(e.to_string()))?;

    if let Some(path) = path {
        builder = builder.add_source(File::with_name(path));
    }

    builder
        .add_source(Environment::with_prefix("ATRIVA").separator("__"))
        .build()
        .and_then(|config| config.try_deserialize())
        .map_err(|e| AtrivaError::Config(e.to_string()))
}
