//! ECG波形环形缓冲
//!
//! 把高频信号片段按固定抽取率压入定长显示窗口。

use std::collections::VecDeque;

/// 显示窗口长度（样本数）
pub const WINDOW_LEN: usize = 300;
/// 抽取率：源采样率约为显示速率的5倍
pub const DECIMATION: usize = 5;
/// 初始基线值
pub const BASELINE: f32 = -1.5;

/// 定长抽取缓冲
///
/// 严格FIFO：每接纳一个样本即淘汰最旧样本，长度恒为 [`WINDOW_LEN`]。
/// 重连时不清空，旧样本自然老化，避免人为的平线断点。
#[derive(Debug, Clone)]
pub struct WaveformBuffer {
    window: VecDeque<f32>,
}

impl WaveformBuffer {
    /// 创建基线填充的缓冲
    pub fn new() -> Self {
        let mut window = VecDeque::with_capacity(WINDOW_LEN);
        window.resize(WINDOW_LEN, BASELINE);
        Self { window }
    }

    /// 接纳一个波形片段，返回刷新后的窗口
    ///
    /// 取片段中第 0、5、10…个样本；不插值、不补隙，
    /// 空片段不更新窗口。
    pub fn admit(&mut self, fragment: &[f32]) -> Vec<f32> {
        for sample in fragment.iter().step_by(DECIMATION) {
            self.window.pop_front();
            self.window.push_back(*sample);
        }
        self.snapshot()
    }

    /// 当前窗口的顺序快照（旧样本在前）
    pub fn snapshot(&self) -> Vec<f32> {
        self.window.iter().copied().collect()
    }

    /// 窗口长度，恒为 [`WINDOW_LEN`]
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}

impl Default for WaveformBuffer {
    fn default() -> Self {
        Self::new()
    }
}
