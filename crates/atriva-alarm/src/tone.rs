//! 告警音脉冲合成
//!
//! 880Hz正弦脉冲，线性起落包络，避免突然通断产生的爆音。

/// 告警音频率
pub const TONE_FREQ_HZ: f32 = 880.0;
/// 包络峰值增益
pub const PEAK_GAIN: f32 = 0.15;
/// 起音时长（到达峰值）
pub const ATTACK_MS: u32 = 20;
/// 衰减结束时刻（回到静音）
pub const DECAY_END_MS: u32 = 150;
/// 脉冲总时长
pub const PULSE_MS: u32 = 200;
/// 合成采样率
pub const SAMPLE_RATE_HZ: u32 = 44_100;

/// t时刻（秒）的包络增益
///
/// 20ms线性上升到峰值，之后线性衰减，150ms起静音。
pub fn envelope(t: f32) -> f32 {
    let attack = ATTACK_MS as f32 / 1000.0;
    let decay_end = DECAY_END_MS as f32 / 1000.0;

    if t < 0.0 {
        0.0
    } else if t < attack {
        PEAK_GAIN * t / attack
    } else if t < decay_end {
        PEAK_GAIN * (1.0 - (t - attack) / (decay_end - attack))
    } else {
        0.0
    }
}

/// 渲染一个完整脉冲的PCM样本
pub fn render_pulse(sample_rate: u32) -> Vec<f32> {
    let total = (sample_rate as u64 * PULSE_MS as u64 / 1000) as usize;
    let mut samples = Vec::with_capacity(total);
    for i in 0..total {
        let t = i as f32 / sample_rate as f32;
        let phase = 2.0 * std::f32::consts::PI * TONE_FREQ_HZ * t;
        samples.push(envelope(t) * phase.sin());
    }
    samples
}
