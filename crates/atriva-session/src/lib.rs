//! # ATRIVA Session
//!
//! 会话与访问控制层：登录认证、持有者凭证注入、
//! 以及对后端各REST端点的统一客户端封装。

pub mod client;
pub mod session;

pub use client::{ApiClient, UploadFile};
pub use session::{PatientAccess, SessionController};
