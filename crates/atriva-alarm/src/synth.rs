//! 音频合成上下文
//!
//! 作用域资源：进入Armed时获取，退出时恰好释放一次。
//! 释放分两步：先同步挂起让硬件休眠，再异步关闭。

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tracing::debug;

use atriva_core::{AtrivaError, Result};

use crate::tone::{render_pulse, SAMPLE_RATE_HZ};

const STATE_RUNNING: u8 = 0;
const STATE_SUSPENDED: u8 = 1;
const STATE_CLOSED: u8 = 2;

/// 音频输出落点
///
/// 脉冲在进程内渲染为PCM后交给落点；默认落点仅记录日志，
/// 实际声卡驱动可在同一接口后替换。
pub trait ToneSink: Send + Sync {
    /// 合成是否可用；不可用时上下文获取失败
    fn available(&self) -> bool {
        true
    }

    /// 输出一段渲染好的PCM脉冲
    fn emit(&self, pcm: &[f32]);

    /// 硬件休眠（同步完成）
    fn suspend(&self) {}

    /// 释放底层资源（允许异步完成）
    fn close(&self) {}
}

/// 默认落点：记录脉冲发出事件
pub struct TracingToneSink;

impl ToneSink for TracingToneSink {
    fn emit(&self, pcm: &[f32]) {
        debug!("Alarm tone pulse emitted ({} samples)", pcm.len());
    }
}

/// 音频合成上下文
pub struct AudioContext {
    sink: Arc<dyn ToneSink>,
    sample_rate: u32,
    state: AtomicU8,
}

impl AudioContext {
    /// 获取上下文
    ///
    /// 合成不可用时返回错误；调用方降级为纯视觉告警。
    pub fn acquire(sink: Arc<dyn ToneSink>) -> Result<Arc<Self>> {
        if !sink.available() {
            return Err(AtrivaError::Audio("synthesis blocked or unsupported".to_string()));
        }
        Ok(Arc::new(Self {
            sink,
            sample_rate: SAMPLE_RATE_HZ,
            state: AtomicU8::new(STATE_RUNNING),
        }))
    }

    /// 播放一个脉冲；挂起或已关闭的上下文不发声
    pub fn play_pulse(&self) {
        if self.state.load(Ordering::SeqCst) != STATE_RUNNING {
            return;
        }
        let pcm = render_pulse(self.sample_rate);
        self.sink.emit(&pcm);
    }

    /// 同步挂起，让硬件先行休眠
    pub fn suspend(&self) {
        if self
            .state
            .compare_exchange(
                STATE_RUNNING,
                STATE_SUSPENDED,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
        {
            self.sink.suspend();
        }
    }

    /// 关闭并释放；重复关闭为空操作
    pub fn close(&self) {
        if self.state.swap(STATE_CLOSED, Ordering::SeqCst) != STATE_CLOSED {
            self.sink.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.load(Ordering::SeqCst) == STATE_CLOSED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingSink {
        events: Mutex<Vec<&'static str>>,
        usable: bool,
    }

    impl RecordingSink {
        fn new(usable: bool) -> Arc<Self> {
            Arc::new(Self {
                events: Mutex::new(Vec::new()),
                usable,
            })
        }

        fn events(&self) -> Vec<&'static str> {
            self.events.lock().unwrap().clone()
        }
    }

    impl ToneSink for RecordingSink {
        fn available(&self) -> bool {
            self.usable
        }

        fn emit(&self, _pcm: &[f32]) {
            self.events.lock().unwrap().push("emit");
        }

        fn suspend(&self) {
            self.events.lock().unwrap().push("suspend");
        }

        fn close(&self) {
            self.events.lock().unwrap().push("close");
        }
    }

    #[test]
    fn test_acquire_fails_when_unavailable() {
        let sink = RecordingSink::new(false);
        assert!(AudioContext::acquire(sink).is_err());
    }

    #[test]
    fn test_play_after_suspend_is_silent() {
        let sink = RecordingSink::new(true);
        let context = AudioContext::acquire(sink.clone()).unwrap();

        context.play_pulse();
        context.suspend();
        context.play_pulse();

        assert_eq!(sink.events(), vec!["emit", "suspend"]);
    }

    #[test]
    fn test_release_is_suspend_then_close_exactly_once() {
        let sink = RecordingSink::new(true);
        let context = AudioContext::acquire(sink.clone()).unwrap();

        context.suspend();
        context.close();
        // 重复释放为空操作
        context.suspend();
        context.close();

        assert_eq!(sink.events(), vec!["suspend", "close"]);
        assert!(context.is_closed());
    }
}
