//! 会话控制器
//!
//! 独占持有当前认证会话；同一时间至多一个会话，
//! 会话缺失时患者数据访问由上游闸控。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{info, warn};

use atriva_core::{BatchOutcome, ClinicalContext, PatientFetch, Result, Session};

use crate::client::{ApiClient, UploadFile};

/// 患者数据访问接口
///
/// 绑定器通过该接口发起授权请求，凭证注入对调用方透明。
#[async_trait]
pub trait PatientAccess: Send + Sync {
    /// 通知后端切换场景（失败记录日志，不致命）
    async fn notify_scenario(&self, scenario: &str) -> Result<()>;

    /// 授权获取患者档案
    async fn fetch_patient(&self, patient_key: &str) -> Result<PatientFetch>;

    /// 生成临床记录
    async fn generate_note(&self, context: &ClinicalContext) -> Result<String>;

    /// 批量离线推理
    async fn upload_batch(&self, files: Vec<UploadFile>) -> Result<BatchOutcome>;
}

/// 会话控制器
#[derive(Clone)]
pub struct SessionController {
    api: Arc<ApiClient>,
    session_tx: Arc<watch::Sender<Option<Session>>>,
}

impl SessionController {
    pub fn new(api: Arc<ApiClient>) -> Self {
        let (session_tx, _) = watch::channel(None);
        Self {
            api,
            session_tx: Arc::new(session_tx),
        }
    }

    /// 订阅会话变化
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session_tx.subscribe()
    }

    /// 当前会话快照
    pub fn current(&self) -> Option<Session> {
        self.session_tx.borrow().clone()
    }

    /// 当前持有者凭证
    pub fn bearer_token(&self) -> Option<String> {
        self.session_tx
            .borrow()
            .as_ref()
            .map(|session| session.access_token.clone())
    }

    /// 登录并安装会话
    ///
    /// 认证失败逐字上报，不重试。
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        match self.api.login(username, password).await {
            Ok(session) => {
                info!("User logged in: {}", session.user.username);
                self.session_tx.send_replace(Some(session.clone()));
                Ok(session)
            }
            Err(e) => {
                warn!("Login failed: {}", e);
                Err(e)
            }
        }
    }

    /// 清除会话
    ///
    /// 患者档案与场景的级联复位由绑定器的注销路径完成，
    /// 二者必须在同一注销流程中依次执行。
    pub fn clear(&self) {
        if self.session_tx.borrow().is_some() {
            info!("Session cleared");
        }
        self.session_tx.send_replace(None);
    }
}

#[async_trait]
impl PatientAccess for SessionController {
    async fn notify_scenario(&self, scenario: &str) -> Result<()> {
        self.api.notify_scenario(scenario).await
    }

    async fn fetch_patient(&self, patient_key: &str) -> Result<PatientFetch> {
        let token = self.bearer_token();
        self.api.fetch_patient(patient_key, token.as_deref()).await
    }

    async fn generate_note(&self, context: &ClinicalContext) -> Result<String> {
        self.api.generate_note(context).await
    }

    async fn upload_batch(&self, files: Vec<UploadFile>) -> Result<BatchOutcome> {
        self.api.upload_batch(files).await
    }
}
