//! 告警调度器
//!
//! 进入Armed后每秒发出一组双音：先一拍，200ms后补第二拍。
//! 两级定时都在触发点检查活性标志——第二拍是嵌套延迟任务，
//! 仅靠取消定时器无法覆盖已入队的拍。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::state::AlarmState;
use crate::synth::{AudioContext, ToneSink};

/// 双音组的重复周期
pub const BEEP_PERIOD: Duration = Duration::from_millis(1000);
/// 组内第二拍相对第一拍的延迟
pub const DOUBLE_BEEP_GAP: Duration = Duration::from_millis(200);

/// 一次Armed期间的发声周期
struct ArmedCycle {
    live: Arc<AtomicBool>,
    task: JoinHandle<()>,
    context: Arc<AudioContext>,
}

/// 告警调度器
///
/// 单写者持有告警状态；音频上下文与Armed状态同生命周期，
/// 无论哪条转换触发退出，释放都恰好执行一次。
pub struct AlarmScheduler {
    sink: Arc<dyn ToneSink>,
    state_tx: watch::Sender<AlarmState>,
    cycle: Option<ArmedCycle>,
}

impl AlarmScheduler {
    pub fn new(sink: Arc<dyn ToneSink>) -> Self {
        let (state_tx, _) = watch::channel(AlarmState::Idle);
        Self {
            sink,
            state_tx,
            cycle: None,
        }
    }

    /// 订阅告警状态
    pub fn state(&self) -> watch::Receiver<AlarmState> {
        self.state_tx.subscribe()
    }

    /// 当前告警状态
    pub fn current(&self) -> AlarmState {
        *self.state_tx.borrow()
    }

    /// 按新的(风险评分, 静音标志)输入推进状态机
    ///
    /// 同态输入为空操作：重复确认Armed不得复制周期任务。
    pub fn update(&mut self, risk: f32, muted: bool) {
        let next = AlarmState::derive(risk, muted);
        let prev = self.current();
        if next == prev {
            return;
        }

        if next == AlarmState::Armed {
            self.enter_armed();
        } else if prev == AlarmState::Armed {
            self.exit_armed();
        }

        info!("Alarm state {:?} -> {:?}", prev, next);
        self.state_tx.send_replace(next);
    }

    /// 组件停机：停止发声并释放资源
    pub fn teardown(&mut self) {
        self.exit_armed();
        self.state_tx.send_replace(AlarmState::Idle);
    }

    fn enter_armed(&mut self) {
        if self.cycle.is_some() {
            return;
        }

        let context = match AudioContext::acquire(self.sink.clone()) {
            Ok(context) => context,
            Err(e) => {
                // 获取失败不致命：无声降级，视觉告警不受影响
                warn!("Audio synthesis unavailable, alarm degrades to visual only: {}", e);
                return;
            }
        };

        let live = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(armed_cycle(context.clone(), live.clone()));
        self.cycle = Some(ArmedCycle {
            live,
            task,
            context,
        });
    }

    fn exit_armed(&mut self) {
        if let Some(cycle) = self.cycle.take() {
            // 周期任务必须先于资源释放停止，防止拍向已释放的上下文
            cycle.live.store(false, Ordering::SeqCst);
            cycle.task.abort();
            // 先同步挂起硬件，再异步关闭
            cycle.context.suspend();
            cycle.context.close();
        }
    }
}

impl Drop for AlarmScheduler {
    fn drop(&mut self) {
        self.exit_armed();
    }
}

/// Armed期间的发声循环
async fn armed_cycle(context: Arc<AudioContext>, live: Arc<AtomicBool>) {
    loop {
        tokio::time::sleep(BEEP_PERIOD).await;
        // 活性标志在每个触发点检查，不依赖定时器取消
        if !live.load(Ordering::SeqCst) {
            return;
        }
        context.play_pulse();

        let live = live.clone();
        let context = context.clone();
        tokio::spawn(async move {
            tokio::time::sleep(DOUBLE_BEEP_GAP).await;
            // 嵌套延迟的第二拍同样必须尊重停机
            if live.load(Ordering::SeqCst) {
                context.play_pulse();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::time::{sleep, Duration, Instant};

    #[derive(Debug, Clone, PartialEq)]
    enum SinkEvent {
        Pulse(Duration),
        Suspend,
        Close,
    }

    struct RecordingSink {
        started: Instant,
        events: Mutex<Vec<SinkEvent>>,
        usable: bool,
    }

    impl RecordingSink {
        fn new(usable: bool) -> Arc<Self> {
            Arc::new(Self {
                started: Instant::now(),
                events: Mutex::new(Vec::new()),
                usable,
            })
        }

        fn events(&self) -> Vec<SinkEvent> {
            self.events.lock().unwrap().clone()
        }

        fn pulse_offsets(&self) -> Vec<Duration> {
            self.events()
                .into_iter()
                .filter_map(|event| match event {
                    SinkEvent::Pulse(at) => Some(at),
                    _ => None,
                })
                .collect()
        }
    }

    impl ToneSink for RecordingSink {
        fn available(&self) -> bool {
            self.usable
        }

        fn emit(&self, _pcm: &[f32]) {
            let offset = Instant::now() - self.started;
            self.events.lock().unwrap().push(SinkEvent::Pulse(offset));
        }

        fn suspend(&self) {
            self.events.lock().unwrap().push(SinkEvent::Suspend);
        }

        fn close(&self) {
            self.events.lock().unwrap().push(SinkEvent::Close);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_armed_emits_double_beep_every_second() {
        let sink = RecordingSink::new(true);
        let mut scheduler = AlarmScheduler::new(sink.clone());

        scheduler.update(0.85, false);
        assert_eq!(scheduler.current(), AlarmState::Armed);

        sleep(Duration::from_millis(2_500)).await;

        let offsets = sink.pulse_offsets();
        assert_eq!(
            offsets,
            vec![
                Duration::from_millis(1_000),
                Duration::from_millis(1_200),
                Duration::from_millis(2_000),
                Duration::from_millis(2_200),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearming_does_not_duplicate_cycle() {
        let sink = RecordingSink::new(true);
        let mut scheduler = AlarmScheduler::new(sink.clone());

        scheduler.update(0.85, false);
        // 新快照再次确认危重
        scheduler.update(0.90, false);
        scheduler.update(0.95, false);

        sleep(Duration::from_millis(1_500)).await;

        assert_eq!(sink.pulse_offsets().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mute_halts_pending_second_beep() {
        let sink = RecordingSink::new(true);
        let mut scheduler = AlarmScheduler::new(sink.clone());

        scheduler.update(0.85, false);
        // 第一拍已发出，第二拍已入队
        sleep(Duration::from_millis(1_050)).await;
        scheduler.update(0.85, true);

        sleep(Duration::from_secs(3)).await;

        assert_eq!(scheduler.current(), AlarmState::Acknowledged);
        // 已入队的200ms第二拍也必须被抑制
        assert_eq!(sink.pulse_offsets(), vec![Duration::from_millis(1_000)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_mid_armed_suppresses_all_tones() {
        let sink = RecordingSink::new(true);
        let mut scheduler = AlarmScheduler::new(sink.clone());

        scheduler.update(0.85, false);
        sleep(Duration::from_millis(1_050)).await;

        scheduler.teardown();
        sleep(Duration::from_secs(5)).await;

        assert_eq!(scheduler.current(), AlarmState::Idle);
        assert_eq!(sink.pulse_offsets(), vec![Duration::from_millis(1_000)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exit_releases_audio_suspend_before_close() {
        let sink = RecordingSink::new(true);
        let mut scheduler = AlarmScheduler::new(sink.clone());

        scheduler.update(0.85, false);
        scheduler.update(0.30, false);

        assert_eq!(scheduler.current(), AlarmState::Idle);
        assert_eq!(sink.events(), vec![SinkEvent::Suspend, SinkEvent::Close]);

        // 再次越限重新获取上下文
        scheduler.update(0.90, false);
        sleep(Duration::from_millis(1_050)).await;
        assert_eq!(sink.pulse_offsets().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acknowledged_releases_audio_but_stays_critical() {
        let sink = RecordingSink::new(true);
        let mut scheduler = AlarmScheduler::new(sink.clone());

        scheduler.update(0.85, false);
        scheduler.update(0.85, true);

        assert_eq!(scheduler.current(), AlarmState::Acknowledged);
        assert!(scheduler.current().is_critical());
        assert_eq!(sink.events(), vec![SinkEvent::Suspend, SinkEvent::Close]);

        // 静音期间风险波动不重新发声
        scheduler.update(0.95, true);
        sleep(Duration::from_secs(2)).await;
        assert!(sink.pulse_offsets().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquisition_failure_degrades_to_visual_only() {
        let sink = RecordingSink::new(false);
        let mut scheduler = AlarmScheduler::new(sink.clone());

        scheduler.update(0.85, false);

        // 视觉告警状态不受音频失败影响
        assert_eq!(scheduler.current(), AlarmState::Armed);

        sleep(Duration::from_secs(3)).await;
        assert!(sink.pulse_offsets().is_empty());

        // 退出Armed不会触碰从未获取成功的资源
        scheduler.update(0.10, false);
        assert_eq!(scheduler.current(), AlarmState::Idle);
        assert!(sink.events().is_empty());
    }
}
