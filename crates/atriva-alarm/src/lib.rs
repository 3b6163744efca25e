//! # ATRIVA Alarm
//!
//! 风险驱动的告警调度：由(风险评分, 静音标志)派生告警状态，
//! Armed期间以固定节拍合成双音告警，并保证音频资源的有序释放。

pub mod scheduler;
pub mod state;
pub mod synth;
pub mod tone;

pub use scheduler::{AlarmScheduler, BEEP_PERIOD, DOUBLE_BEEP_GAP};
pub use state::AlarmState;
pub use synth::{AudioContext, ToneSink, TracingToneSink};
pub use tone::{render_pulse, PULSE_MS, TONE_FREQ_HZ};
