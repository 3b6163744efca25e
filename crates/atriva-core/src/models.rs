//! 核心数据模型定义

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 危重风险阈值：融合风险评分高于该值即进入危重状态
pub const CRITICAL_RISK_THRESHOLD: f32 = 0.8;

/// 尚无遥测帧时的默认风险评分
pub const DEFAULT_RISK_SCORE: f32 = 0.15;

/// 实时生命体征数值
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    #[serde(rename = "HR")]
    pub hr: i32, // 心率 (bpm)
    #[serde(rename = "SpO2")]
    pub spo2: i32, // 血氧饱和度 (%)
    #[serde(rename = "MAP")]
    pub map: i32, // 平均动脉压 (mmHg)
    #[serde(rename = "RESP")]
    pub resp: i32, // 呼吸频率 (rpm)
}

/// AI融合推理结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AiInsight {
    pub fusion_risk_score: f32, // 融合风险评分 [0,1]
    #[serde(default)]
    pub cardiac_contractility: f32,
    #[serde(default)]
    pub respiratory_efficiency: f32,
}

/// 单帧遥测快照
///
/// 每帧完整替换上一帧，不做部分合并。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    #[serde(default)]
    pub timestamp: f64, // 流内相对时间 (秒)
    #[serde(default)]
    pub ecg_wave: Vec<f32>, // 高频ECG波形片段
    #[serde(default)]
    pub pleth_wave: Vec<f32>, // 脉搏容积波片段
    pub vitals: Vitals,
    pub ai_insight: AiInsight,
}

impl TelemetrySnapshot {
    /// 快照中的融合风险评分
    pub fn risk_score(&self) -> f32 {
        self.ai_insight.fusion_risk_score
    }
}

/// 用药记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub name: String,
    pub dosage: String,
    pub time_administered: String,
}

/// 患者档案
///
/// 按场景获取，仅由绑定器整体替换。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub patient_id: String,
    pub name: String,
    pub age: i32,
    pub sex: String,
    pub blood_group: String,
    pub allergies: String,
    pub admitted: NaiveDateTime, // 入院时间
    pub device: String,          // 监护设备编号
    pub ward: String,            // 病区
    pub dat_link: String,
    pub csv_link: String,
    #[serde(default)]
    pub medications: Vec<Medication>,
}

/// 登录请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// 用户信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub username: String,
    pub role: String,
    #[serde(default)]
    pub assigned_patients: Option<String>,
}

/// 认证会话
///
/// 登录成功后创建，注销或不可恢复的认证失败时销毁。
/// 同一时间最多存在一个会话，缺失时禁止访问患者数据。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    pub user: UserInfo,
}

/// 认证/授权失败时服务端返回的负载
#[derive(Debug, Clone, Deserialize)]
pub struct DenialPayload {
    pub detail: String,
}

/// 患者档案获取结果
///
/// 200 -> Record; 401/403 -> Denied(原因逐字保留); 其他状态 -> Absent。
#[derive(Debug, Clone, PartialEq)]
pub enum PatientFetch {
    Record(PatientRecord),
    Denied { reason: String },
    Absent,
}

/// 临床记录生成请求上下文
#[derive(Debug, Clone, Serialize)]
pub struct ClinicalContext {
    pub patient_id: String,
    pub name: String,
    pub age: i32,
    pub sex: String,
    pub device: String,
    pub ward: String,
    pub risk_score: f32,
    pub is_critical: bool,
    pub medications: Vec<Medication>,
    pub vitals_snapshot: serde_json::Value,
}

/// 临床记录生成响应
#[derive(Debug, Clone, Deserialize)]
pub struct NoteResponse {
    pub note: String,
}

/// 批量离线推理的单文件结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub filename: String,
    #[serde(default)]
    pub status: String,
    pub fusion_risk_score: f32,
    #[serde(default)]
    pub counterfactual: String,
    #[serde(default)]
    pub concept_drift_detected: bool,
    #[serde(default)]
    pub alert: String,
    pub is_critical: bool,
}

/// 批量离线推理响应
///
/// 结果单独持有，不并入患者档案。
#[derive(Debug, Clone, Deserialize)]
pub struct BatchOutcome {
    pub results: Vec<BatchResult>,
    #[serde(default)]
    pub federated_node: String,
}
