//! 控制台运行时装配
//!
//! 把流、会话、绑定器与告警调度器接成一个监督循环：
//! 遥测与静音标志的变化驱动告警状态机，
//! Ctrl-C触发有序停机（告警 -> 流 -> 会话）。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use atriva_alarm::{AlarmScheduler, TracingToneSink};
use atriva_core::utils::{format_uptime, DEFAULT_PATIENT_KEY};
use atriva_core::{Result, DEFAULT_RISK_SCORE};
use atriva_session::{ApiClient, SessionController, UploadFile};
use atriva_stream::{ConnectionState, StreamConfig, StreamHandle};
use atriva_workflow::{AlertLog, ScenarioBinder};

use crate::config::ConsoleConfig;

/// 状态行输出间隔
const STATUS_INTERVAL: Duration = Duration::from_secs(5);

/// 控制台应用
pub struct ConsoleApp {
    session: SessionController,
    binder: Arc<ScenarioBinder>,
    stream: StreamHandle,
    alarm: AlarmScheduler,
    alerts: AlertLog,
}

impl ConsoleApp {
    pub fn new(config: &ConsoleConfig) -> Self {
        let api = Arc::new(ApiClient::new(config.backend.http_base()));
        let session = SessionController::new(api);
        let binder = Arc::new(ScenarioBinder::new(
            Arc::new(session.clone()),
            session.subscribe(),
        ));

        let stream_config = StreamConfig {
            url: config.backend.telemetry_url(),
            reconnect_delay: Duration::from_secs(config.stream.reconnect_delay_secs),
        };
        let stream = StreamHandle::spawn(stream_config);

        let alarm = AlarmScheduler::new(Arc::new(TracingToneSink));

        Self {
            session,
            binder,
            stream,
            alarm,
            alerts: AlertLog::new(),
        }
    }

    /// 登录并绑定初始患者
    pub async fn start(&self, username: &str, password: &str) -> Result<()> {
        self.session.login(username, password).await?;
        // 认证就绪后的初始加载
        self.binder.select_scenario(DEFAULT_PATIENT_KEY).await;
        Ok(())
    }

    /// 启动前的批量离线推理
    ///
    /// 上传失败向用户呈现阻断性提示；成功结果仅展示，
    /// 直播流的重绑定由绑定器按首个文件名词干完成。
    pub async fn upload(&self, paths: &[PathBuf]) {
        let mut files = Vec::new();
        for path in paths {
            match tokio::fs::read(path).await {
                Ok(bytes) => files.push(UploadFile {
                    filename: path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string()),
                    bytes,
                }),
                Err(e) => {
                    error!("Cannot read upload file {}: {}", path.display(), e);
                    return;
                }
            }
        }

        match self.binder.upload_and_rebind(files).await {
            Ok(outcome) => {
                for result in &outcome.results {
                    info!(
                        "Batch analysis {} -> {} (risk {:.1}%)",
                        result.filename,
                        result.alert,
                        result.fusion_risk_score * 100.0
                    );
                    if !result.counterfactual.is_empty() {
                        info!("  Counterfactual: {}", result.counterfactual);
                    }
                }
            }
            Err(e) => {
                error!("Upload failed. Ensure backend is running. ({})", e);
            }
        }
    }

    /// 主监督循环
    pub async fn run(mut self) -> anyhow::Result<()> {
        let started = std::time::Instant::now();
        let mut telemetry_rx = self.stream.telemetry();
        let mut state_rx = self.stream.connection_state();
        let mut muted_rx = self.binder.muted();
        let mut scenario_rx = self.binder.scenario();
        let mut error_rx = self.binder.access_error();
        let mut status_tick = tokio::time::interval(STATUS_INTERVAL);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown requested");
                    break;
                }
                changed = telemetry_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let risk = current_risk(&telemetry_rx);
                    let muted = *muted_rx.borrow();
                    self.alarm.update(risk, muted);
                    self.alerts.observe_risk(risk);
                }
                _ = muted_rx.changed() => {
                    let risk = current_risk(&telemetry_rx);
                    let muted = *muted_rx.borrow();
                    self.alarm.update(risk, muted);
                }
                _ = scenario_rx.changed() => {
                    let scenario = scenario_rx.borrow().clone();
                    info!("Stream source: {}", scenario);
                    self.alerts.observe_scenario(&scenario);
                }
                _ = error_rx.changed() => {
                    if let Some(reason) = error_rx.borrow().as_deref() {
                        warn!("{}", reason);
                    }
                }
                _ = state_rx.changed() => {
                    let live = *state_rx.borrow() == ConnectionState::Open;
                    info!("Telemetry link {}", if live { "LIVE" } else { "OFFLINE" });
                }
                _ = status_tick.tick() => {
                    self.print_status(started.elapsed().as_secs(), &telemetry_rx);
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    fn print_status(
        &self,
        uptime_secs: u64,
        telemetry_rx: &tokio::sync::watch::Receiver<Option<atriva_core::TelemetrySnapshot>>,
    ) {
        let snapshot = telemetry_rx.borrow().clone();
        match snapshot {
            Some(t) => info!(
                "HR {:>3} | SpO2 {:>3} | MAP {:>3} | RESP {:>2} | risk {:>4.0}% | alarm {:?} | up {}",
                t.vitals.hr,
                t.vitals.spo2,
                t.vitals.map,
                t.vitals.resp,
                t.risk_score() * 100.0,
                self.alarm.current(),
                format_uptime(uptime_secs)
            ),
            None => info!(
                "Awaiting telemetry | risk {:>4.0}% | up {}",
                DEFAULT_RISK_SCORE * 100.0,
                format_uptime(uptime_secs)
            ),
        }
    }

    /// 有序停机
    ///
    /// 告警先于流释放；会话清除后绑定器级联复位，
    /// 不留下无会话的陈旧患者档案。
    async fn shutdown(mut self) {
        self.alarm.teardown();
        self.stream.close().await;
        self.session.clear();
        self.binder.reset_for_logout();
        info!("Console shut down cleanly");
    }
}

/// 当前风险评分；尚无遥测时使用默认低风险值
fn current_risk(
    telemetry_rx: &tokio::sync::watch::Receiver<Option<atriva_core::TelemetrySnapshot>>,
) -> f32 {
    telemetry_rx
        .borrow()
        .as_ref()
        .map(|t| t.risk_score())
        .unwrap_or(DEFAULT_RISK_SCORE)
}
