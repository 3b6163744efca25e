//! # ATRIVA Stream
//!
//! 遥测流接入层：维护到后端的持久WebSocket连接，
//! 把高频波形片段抽取进固定长度的显示窗口，并发布最新遥测快照。

pub mod connection;
pub mod waveform;

pub use connection::{
    ConnectionState, FrameSource, StreamConfig, StreamHandle, StreamTransport, WsTransport,
};
pub use waveform::{WaveformBuffer, BASELINE, DECIMATION, WINDOW_LEN};
