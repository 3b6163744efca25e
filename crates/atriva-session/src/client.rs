//! 后端REST客户端
//!
//! 封装全部HTTP端点调用；授权响应的分类在这里完成：
//! 200 -> 负载；401/403 -> 拒绝原因；其余 -> 档案缺失。

use reqwest::header;
use reqwest::StatusCode;
use tracing::{debug, warn};

use atriva_core::{
    AtrivaError, BatchOutcome, ClinicalContext, DenialPayload, LoginRequest, NoteResponse,
    PatientFetch, PatientRecord, Result, Session,
};

/// 待上传的批量分析文件
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// ATRIVA后端HTTP客户端
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// 创建客户端，base_url形如 http://localhost:8000
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 用户登录
    ///
    /// 非200响应的detail逐字保留为认证错误，不重试。
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };

        let response = self
            .http
            .post(format!("{}/api/login", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| AtrivaError::Request(e.to_string()))?;

        if response.status().is_success() {
            response
                .json::<Session>()
                .await
                .map_err(|e| AtrivaError::Request(e.to_string()))
        } else {
            let detail = denial_detail(response, "Login failed").await;
            Err(AtrivaError::Auth(detail))
        }
    }

    /// 获取患者档案
    ///
    /// 存在会话时附加Bearer凭证；无会话的调用由上游闸控。
    pub async fn fetch_patient(
        &self,
        patient_key: &str,
        token: Option<&str>,
    ) -> Result<PatientFetch> {
        let mut request = self
            .http
            .get(format!("{}/api/patient/{}", self.base_url, patient_key));
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| AtrivaError::Request(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {
                let record = response
                    .json::<PatientRecord>()
                    .await
                    .map_err(|e| AtrivaError::Request(e.to_string()))?;
                Ok(PatientFetch::Record(record))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let reason = denial_detail(response, "Access denied").await;
                Ok(PatientFetch::Denied { reason })
            }
            status => {
                warn!("Patient fetch for {} returned {}", patient_key, status);
                Ok(PatientFetch::Absent)
            }
        }
    }

    /// 通知场景切换
    ///
    /// 任意非异常响应均视为成功。
    pub async fn notify_scenario(&self, scenario: &str) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/api/scenario/{}", self.base_url, scenario))
            .send()
            .await
            .map_err(|e| AtrivaError::Request(e.to_string()))?;

        debug!("Scenario control {} -> {}", scenario, response.status());
        Ok(())
    }

    /// 生成临床记录
    pub async fn generate_note(&self, context: &ClinicalContext) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/api/generate_clinical_note/", self.base_url))
            .json(context)
            .send()
            .await
            .map_err(|e| AtrivaError::Request(e.to_string()))?;

        if response.status().is_success() {
            let payload = response
                .json::<NoteResponse>()
                .await
                .map_err(|e| AtrivaError::Request(e.to_string()))?;
            Ok(payload.note)
        } else {
            Err(AtrivaError::Request(format!(
                "Clinical note synthesis returned {}",
                response.status()
            )))
        }
    }

    /// 批量离线推理上传
    pub async fn upload_batch(&self, files: Vec<UploadFile>) -> Result<BatchOutcome> {
        let mut form = reqwest::multipart::Form::new();
        for file in files {
            let part = reqwest::multipart::Part::bytes(file.bytes).file_name(file.filename);
            form = form.part("files", part);
        }

        let response = self
            .http
            .post(format!("{}/api/upload_predict", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AtrivaError::Request(e.to_string()))?;

        if response.status().is_success() {
            response
                .json::<BatchOutcome>()
                .await
                .map_err(|e| AtrivaError::Request(e.to_string()))
        } else {
            Err(AtrivaError::Request(format!(
                "Batch upload returned {}",
                response.status()
            )))
        }
    }
}

/// 从拒绝响应提取detail字段，缺失时退回默认文案
async fn denial_detail(response: reqwest::Response, fallback: &str) -> String {
    match response.json::<DenialPayload>().await {
        Ok(payload) => payload.detail,
        Err(_) => fallback.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_endpoint_construction() {
        let client = ApiClient::new("http://localhost:8000");
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_login_request_wire_shape() {
        let request = LoginRequest {
            username: "dr_chen".to_string(),
            password: "s3cret".to_string(),
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["username"], "dr_chen");
        assert_eq!(body["password"], "s3cret");
    }
}
