//! # ATRIVA Workflow
//!
//! 场景/患者绑定流程：场景选择、授权档案获取的一致性维护、
//! 批量上传驱动的重绑定，以及派生的告警日志。

pub mod alerts;
pub mod binder;

pub use alerts::{AlertEntry, AlertLog, AlertSeverity, ALERT_HISTORY_CAP};
pub use binder::ScenarioBinder;
