//! 遥测流连接管理
//!
//! 负责持久连接的完整生命周期：建立、断线后的固定延迟重连、
//! 帧解析分发与有序停机。状态由本模块独占持有，
//! 通过watch通道发布给消费方。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{error, info, warn};

use atriva_core::{AtrivaError, Result, TelemetrySnapshot};

use crate::waveform::WaveformBuffer;

/// 断线后的固定重连延迟
///
/// 有界简单重试，不做指数退避：后端假定能快速恢复。
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// 连接状态
///
/// 由流管理器独占持有；`Open`即"在线"指示。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// 流连接配置
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// 遥测WebSocket端点，如 ws://localhost:8000/telemetry
    pub url: String,
    /// 重连延迟
    pub reconnect_delay: Duration,
}

impl StreamConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_delay: RECONNECT_DELAY,
        }
    }
}

/// 单条已建立连接上的帧源
#[async_trait]
pub trait FrameSource: Send {
    /// 下一帧文本；`None`表示对端关闭
    async fn next_frame(&mut self) -> Option<Result<String>>;

    /// 主动关闭本条连接
    async fn close(&mut self);
}

/// 流传输层接口
#[async_trait]
pub trait StreamTransport: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn FrameSource>>;
}

/// 基于tokio-tungstenite的默认传输层
pub struct WsTransport;

#[async_trait]
impl StreamTransport for WsTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn FrameSource>> {
        let (socket, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| AtrivaError::Transport(e.to_string()))?;
        Ok(Box::new(WsFrameSource { socket }))
    }
}

struct WsFrameSource {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FrameSource for WsFrameSource {
    async fn next_frame(&mut self) -> Option<Result<String>> {
        while let Some(item) = self.socket.next().await {
            match item {
                Ok(message) if message.is_text() => {
                    return Some(
                        message
                            .into_text()
                            .map_err(|e| AtrivaError::Transport(e.to_string())),
                    );
                }
                Ok(message) if message.is_close() => return None,
                // ping/pong等控制帧不携带遥测数据
                Ok(_) => continue,
                Err(e) => return Some(Err(AtrivaError::Transport(e.to_string()))),
            }
        }
        None
    }

    async fn close(&mut self) {
        let _ = self.socket.close(None).await;
    }
}

/// 流管理器句柄
///
/// 持有监督任务与全部发布通道。`close`是唯一的终止途径，
/// 会取消待触发的重连定时器——停机后不得再有重连。
pub struct StreamHandle {
    state_rx: watch::Receiver<ConnectionState>,
    telemetry_rx: watch::Receiver<Option<TelemetrySnapshot>>,
    window_rx: watch::Receiver<Vec<f32>>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl StreamHandle {
    /// 启动流管理器（默认WebSocket传输层）
    pub fn spawn(config: StreamConfig) -> Self {
        Self::spawn_with_transport(config, Arc::new(WsTransport))
    }

    /// 以指定传输层启动流管理器
    pub fn spawn_with_transport(config: StreamConfig, transport: Arc<dyn StreamTransport>) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (telemetry_tx, telemetry_rx) = watch::channel(None);
        let (window_tx, window_rx) = watch::channel(WaveformBuffer::new().snapshot());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(supervise(
            config,
            transport,
            state_tx,
            telemetry_tx,
            window_tx,
            shutdown_rx,
        ));

        Self {
            state_rx,
            telemetry_rx,
            window_rx,
            shutdown_tx,
            task,
        }
    }

    /// 订阅连接状态
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// 订阅最新遥测快照
    pub fn telemetry(&self) -> watch::Receiver<Option<TelemetrySnapshot>> {
        self.telemetry_rx.clone()
    }

    /// 订阅波形显示窗口
    pub fn waveform(&self) -> watch::Receiver<Vec<f32>> {
        self.window_rx.clone()
    }

    /// 当前是否在线
    pub fn is_live(&self) -> bool {
        *self.state_rx.borrow() == ConnectionState::Open
    }

    /// 有序停机：关闭连接并取消待触发的重连
    pub async fn close(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }
}

/// 连接监督循环
///
/// 单循环结构保证任意时刻至多一个重连定时器在等待，
/// 反复断线不会叠加并发重连。
async fn supervise(
    config: StreamConfig,
    transport: Arc<dyn StreamTransport>,
    state_tx: watch::Sender<ConnectionState>,
    telemetry_tx: watch::Sender<Option<TelemetrySnapshot>>,
    window_tx: watch::Sender<Vec<f32>>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    // 缓冲跨连接存活：重连后旧样本自然老化而非清零
    let mut buffer = WaveformBuffer::new();

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        state_tx.send_replace(ConnectionState::Connecting);

        let attempt = tokio::select! {
            result = transport.connect(&config.url) => result,
            _ = shutdown_rx.changed() => break,
        };

        match attempt {
            Ok(mut source) => {
                info!("Telemetry stream connected: {}", config.url);
                state_tx.send_replace(ConnectionState::Open);

                let deliberate = read_frames(
                    &mut *source,
                    &mut buffer,
                    &telemetry_tx,
                    &window_tx,
                    &mut shutdown_rx,
                )
                .await;

                state_tx.send_replace(ConnectionState::Closed);
                if deliberate {
                    source.close().await;
                    return;
                }
            }
            Err(e) => {
                warn!("Telemetry connection failed: {}", e);
                state_tx.send_replace(ConnectionState::Closed);
            }
        }

        // 固定延迟后重连；停机信号可在延迟期间取消重连
        tokio::select! {
            _ = tokio::time::sleep(config.reconnect_delay) => {}
            _ = shutdown_rx.changed() => break,
        }
    }

    state_tx.send_replace(ConnectionState::Closed);
}

/// 读取一条连接上的全部帧
///
/// 返回true表示因停机信号退出（不再重连），false表示传输层断开。
async fn read_frames(
    source: &mut dyn FrameSource,
    buffer: &mut WaveformBuffer,
    telemetry_tx: &watch::Sender<Option<TelemetrySnapshot>>,
    window_tx: &watch::Sender<Vec<f32>>,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> bool {
    loop {
        let frame = tokio::select! {
            frame = source.next_frame() => frame,
            _ = shutdown_rx.changed() => return true,
        };

        match frame {
            Some(Ok(text)) => dispatch_frame(&text, buffer, telemetry_tx, window_tx),
            Some(Err(e)) => {
                warn!("Telemetry transport error: {}", e);
                return false;
            }
            None => {
                info!("Telemetry stream closed by peer");
                return false;
            }
        }
    }
}

/// 解析并分发单帧
///
/// 畸形帧仅丢弃并记录，不断开连接；
/// 快照整帧覆盖发布（last-write-wins，连接内按到达顺序处理）。
fn dispatch_frame(
    text: &str,
    buffer: &mut WaveformBuffer,
    telemetry_tx: &watch::Sender<Option<TelemetrySnapshot>>,
    window_tx: &watch::Sender<Vec<f32>>,
) {
    let snapshot: TelemetrySnapshot = match serde_json::from_str(text) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("Dropping malformed telemetry frame: {}", e);
            return;
        }
    };

    if !snapshot.ecg_wave.is_empty() {
        let window = buffer.admit(&snapshot.ecg_wave);
        window_tx.send_replace(window);
    }

    telemetry_tx.send_replace(Some(snapshot));
}
