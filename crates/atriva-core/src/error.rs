//! 错误定义模块

use thiserror::Error;

/// ATRIVA客户端统一错误类型
#[derive(Error, Debug)]
pub enum AtrivaError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("传输错误: {0}")]
    Transport(String),

    #[error("认证失败: {0}")]
    Auth(String),

    #[error("访问被拒绝: {0}")]
    AccessDenied(String),

    #[error("请求失败: {0}")]
    Request(String),

    #[error("帧解析错误: {0}")]
    Frame(String),

    #[error("音频合成资源不可用: {0}")]
    Audio(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("系统内部错误: {0}")]
    Internal(String),
}

/// ATRIVA客户端统一结果类型
pub type Result<T> = std::result::Result<T, AtrivaError>;
