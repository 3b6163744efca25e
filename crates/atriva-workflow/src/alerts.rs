//! 派生告警日志
//!
//! 由风险评分与场景的变化沿生成有界告警历史，仅供展示。

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use atriva_core::CRITICAL_RISK_THRESHOLD;

/// 告警历史上限，超出后淘汰最旧条目
pub const ALERT_HISTORY_CAP: usize = 256;

/// 告警严重级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

/// 告警条目
#[derive(Debug, Clone, Serialize)]
pub struct AlertEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub severity: AlertSeverity,
    pub message: String,
    pub source: String,
}

/// 有界告警日志
#[derive(Debug)]
pub struct AlertLog {
    entries: VecDeque<AlertEntry>,
    critical_active: bool,
    cap: usize,
}

impl AlertLog {
    pub fn new() -> Self {
        Self::with_capacity(ALERT_HISTORY_CAP)
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            critical_active: false,
            cap,
        }
    }

    /// 观察一次风险评分，在危重沿变化处追加告警
    ///
    /// 持续处于危重不重复记录；回落记录一条解除信息。
    pub fn observe_risk(&mut self, risk: f32) {
        let critical = risk > CRITICAL_RISK_THRESHOLD;
        if critical && !self.critical_active {
            self.push(
                AlertSeverity::Critical,
                "High probability of Code Blue in next 6hrs.",
                "FusionNet (ECG + Vitals)",
            );
        } else if !critical && self.critical_active {
            self.push(
                AlertSeverity::Info,
                "Critical condition resolved.",
                "FusionNet (ECG + Vitals)",
            );
        }
        self.critical_active = critical;
    }

    /// 观察场景切换，追加场景相关预警
    pub fn observe_scenario(&mut self, scenario: &str) {
        if scenario == "rapid_descent" {
            self.push(
                AlertSeverity::Warning,
                "Rapid SpO2 desaturation detected.",
                "VitalsGRU",
            );
        }
    }

    /// 当前是否处于危重
    pub fn critical_active(&self) -> bool {
        self.critical_active
    }

    /// 顺序快照（旧条目在前）
    pub fn snapshot(&self) -> Vec<AlertEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, severity: AlertSeverity, message: &str, source: &str) {
        self.entries.push_back(AlertEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            severity,
            message: message.to_string(),
            source: source.to_string(),
        });
        while self.entries.len() > self.cap {
            self.entries.pop_front();
        }
    }
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new()
    }
}
