//! 场景/患者绑定器
//!
//! 维护"谁在登录、选中哪个场景、可见哪些数据"三者的一致性。
//! 场景切换必须在发起任何异步请求之前，同步完成
//! 场景作用域状态（静音、临床记录、拒绝原因）的清除。

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use atriva_core::utils::{
    self, filename_stem, is_numeric_id, CRITICAL_PATIENT_KEY, SCENARIO_STABLE,
};
use atriva_core::{
    BatchOutcome, BatchResult, ClinicalContext, PatientFetch, PatientRecord, Result, Session,
    TelemetrySnapshot, CRITICAL_RISK_THRESHOLD,
};
use atriva_session::{PatientAccess, UploadFile};

/// 临床记录生成失败时的占位文案
const NOTE_FALLBACK: &str = "Error: Could not synthesize clinical note.";

/// 场景/患者绑定器
///
/// 各状态单元均为单写者：仅本绑定器整体替换患者档案。
pub struct ScenarioBinder {
    access: Arc<dyn PatientAccess>,
    session_rx: watch::Receiver<Option<Session>>,
    scenario_tx: watch::Sender<String>,
    patient_tx: watch::Sender<Option<PatientRecord>>,
    access_error_tx: watch::Sender<Option<String>>,
    muted_tx: watch::Sender<bool>,
    note_tx: watch::Sender<Option<String>>,
}

impl ScenarioBinder {
    pub fn new(
        access: Arc<dyn PatientAccess>,
        session_rx: watch::Receiver<Option<Session>>,
    ) -> Self {
        let (scenario_tx, _) = watch::channel(SCENARIO_STABLE.to_string());
        let (patient_tx, _) = watch::channel(None);
        let (access_error_tx, _) = watch::channel(None);
        let (muted_tx, _) = watch::channel(false);
        let (note_tx, _) = watch::channel(None);

        Self {
            access,
            session_rx,
            scenario_tx,
            patient_tx,
            access_error_tx,
            muted_tx,
            note_tx,
        }
    }

    /// 订阅活动场景
    pub fn scenario(&self) -> watch::Receiver<String> {
        self.scenario_tx.subscribe()
    }

    /// 订阅患者档案
    pub fn patient(&self) -> watch::Receiver<Option<PatientRecord>> {
        self.patient_tx.subscribe()
    }

    /// 订阅用户可见的拒绝原因
    pub fn access_error(&self) -> watch::Receiver<Option<String>> {
        self.access_error_tx.subscribe()
    }

    /// 订阅静音标志
    pub fn muted(&self) -> watch::Receiver<bool> {
        self.muted_tx.subscribe()
    }

    /// 订阅临床记录
    pub fn clinical_note(&self) -> watch::Receiver<Option<String>> {
        self.note_tx.subscribe()
    }

    /// 当前活动场景
    pub fn current_scenario(&self) -> String {
        self.scenario_tx.borrow().clone()
    }

    /// 确认（静音）告警：Armed -> Acknowledged 的唯一途径
    pub fn acknowledge_alarm(&self) {
        self.muted_tx.send_replace(true);
    }

    /// 选择场景
    ///
    /// 并发调用合法：各次获取的结果按完成顺序应用，后完成者生效。
    /// 沿用源系统行为，未加单调序号防护（见DESIGN.md）。
    pub async fn select_scenario(&self, id_or_name: &str) {
        // 1. 立即设置活动场景（乐观更新）
        self.scenario_tx.send_replace(id_or_name.to_string());

        // 2. 同步清除场景作用域状态，不得泄漏到新场景
        self.muted_tx.send_replace(false);
        self.note_tx.send_replace(None);
        self.access_error_tx.send_replace(None);

        // 3. 通知场景控制服务；失败不致命
        if let Err(e) = self.access.notify_scenario(id_or_name).await {
            warn!("Scenario control notification failed: {}", e);
        }

        // 4. 解析患者档案键（全映射）
        let patient_key = utils::resolve_patient_key(id_or_name);

        // 5. 会话缺失时不发起授权请求
        if self.session_rx.borrow().is_none() {
            debug!("No active session, skipping patient fetch for {}", patient_key);
            self.patient_tx.send_replace(None);
            return;
        }

        match self.access.fetch_patient(&patient_key).await {
            Ok(PatientFetch::Record(record)) => {
                info!("Patient record bound: {}", record.patient_id);
                self.patient_tx.send_replace(Some(record));
            }
            Ok(PatientFetch::Denied { reason }) => {
                warn!("Patient access denied: {}", reason);
                self.access_error_tx
                    .send_replace(Some(format!("[ACCESS DENIED] {}", reason)));
                // 拒绝后绝不保留旧档案
                self.patient_tx.send_replace(None);
            }
            Ok(PatientFetch::Absent) => {
                self.patient_tx.send_replace(None);
            }
            Err(e) => {
                warn!("Patient fetch failed: {}", e);
                self.patient_tx.send_replace(None);
            }
        }
    }

    /// 批量上传驱动的重绑定
    ///
    /// 由首个结果的文件名词干决定直播流场景，
    /// 批量结果本身单独持有，不并入患者档案。
    pub async fn rebind_from_batch(&self, results: &[BatchResult]) {
        let Some(first) = results.first() else {
            return;
        };

        let stem = filename_stem(&first.filename);
        if is_numeric_id(&stem) {
            self.select_scenario(&stem).await;
        } else if stem.contains("critical") || stem.contains("200") || stem.contains("231") {
            self.select_scenario(CRITICAL_PATIENT_KEY).await;
        } else {
            self.select_scenario(SCENARIO_STABLE).await;
        }
    }

    /// 上传批量文件并据此重绑定直播流
    ///
    /// 上传失败原样上抛，由调用方向用户呈现阻断性提示。
    pub async fn upload_and_rebind(&self, files: Vec<UploadFile>) -> Result<BatchOutcome> {
        let outcome = self.access.upload_batch(files).await?;
        self.rebind_from_batch(&outcome.results).await;
        Ok(outcome)
    }

    /// 生成临床记录
    ///
    /// 需要已绑定的患者档案与一帧遥测快照；
    /// 生成失败退化为占位文案，不上抛。
    pub async fn synthesize_note(
        &self,
        telemetry: Option<&TelemetrySnapshot>,
    ) -> Option<String> {
        let patient = self.patient_tx.borrow().clone()?;
        let telemetry = telemetry?;

        let risk = telemetry.risk_score();
        let context = ClinicalContext {
            patient_id: patient.patient_id.clone(),
            name: patient.name.clone(),
            age: patient.age,
            sex: patient.sex.clone(),
            device: patient.device.clone(),
            ward: patient.ward.clone(),
            risk_score: risk,
            is_critical: risk > CRITICAL_RISK_THRESHOLD,
            medications: patient.medications.clone(),
            vitals_snapshot: serde_json::to_value(telemetry.vitals).unwrap_or_default(),
        };

        let note = match self.access.generate_note(&context).await {
            Ok(note) => note,
            Err(e) => {
                warn!("Clinical note synthesis failed: {}", e);
                NOTE_FALLBACK.to_string()
            }
        };

        self.note_tx.send_replace(Some(note.clone()));
        Some(note)
    }

    /// 注销级联复位
    ///
    /// 会话缺失绝不允许残留患者档案；场景回到安全默认值。
    pub fn reset_for_logout(&self) {
        self.patient_tx.send_replace(None);
        self.scenario_tx.send_replace(SCENARIO_STABLE.to_string());
        self.muted_tx.send_replace(false);
        self.note_tx.send_replace(None);
        self.access_error_tx.send_replace(None);
        info!("Patient binding reset to safe defaults");
    }
}
