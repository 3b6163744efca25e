//! 告警状态机
//!
//! 状态不独立存储，每次(风险评分, 静音标志)变化时重新派生。

use atriva_core::CRITICAL_RISK_THRESHOLD;

/// 告警状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmState {
    /// 风险未越限
    Idle,
    /// 越限且未静音：发声+视觉指示
    Armed,
    /// 越限但已确认：仅视觉指示
    Acknowledged,
}

impl AlarmState {
    /// 由当前输入派生告警状态
    pub fn derive(risk: f32, muted: bool) -> Self {
        if risk <= CRITICAL_RISK_THRESHOLD {
            AlarmState::Idle
        } else if muted {
            AlarmState::Acknowledged
        } else {
            AlarmState::Armed
        }
    }

    /// 视觉危重指示：Armed与Acknowledged均点亮
    pub fn is_critical(&self) -> bool {
        !matches!(self, AlarmState::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_transitions() {
        assert_eq!(AlarmState::derive(0.85, false), AlarmState::Armed);
        assert_eq!(AlarmState::derive(0.85, true), AlarmState::Acknowledged);
        assert_eq!(AlarmState::derive(0.15, false), AlarmState::Idle);
        // 静音只对越限状态有意义
        assert_eq!(AlarmState::derive(0.15, true), AlarmState::Idle);
    }

    #[test]
    fn test_threshold_boundary_is_exclusive() {
        assert_eq!(AlarmState::derive(0.8, false), AlarmState::Idle);
        assert_eq!(AlarmState::derive(0.800_1, false), AlarmState::Armed);
    }

    #[test]
    fn test_visual_indicator() {
        assert!(AlarmState::Armed.is_critical());
        assert!(AlarmState::Acknowledged.is_critical());
        assert!(!AlarmState::Idle.is_critical());
    }
}
