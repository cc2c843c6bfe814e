//! 通知渠道定义
//!
//! 渠道是通知的实际出口。渠道实现必须把自身故障折叠进
//! `ChannelResult`，不得让错误冒泡中断其他渠道的发送。

use async_trait::async_trait;

use super::types::{ChannelResult, Notification, RenderedContent};
use crate::error::Result;

pub mod email;

pub use email::EmailChannel;

/// 渠道配置
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// 是否启用
    pub enabled: bool,
    /// 发送超时（毫秒）
    pub timeout_ms: u64,
}

impl ChannelConfig {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timeout_ms: 5000,
        }
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// 通知渠道接口
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// 渠道名称（用于日志与结果标注）
    fn name(&self) -> &str;

    /// 渠道对该通知是否可用（禁用、收件人缺少地址等情况返回 false）
    async fn is_available(&self, notification: &Notification) -> bool;

    /// 发送通知
    ///
    /// 发送失败以 `ChannelResult::failed` 返回而非 Err，
    /// Err 只保留给渠道自身不可恢复的内部错误
    async fn send(
        &self,
        notification: &Notification,
        content: &RenderedContent,
    ) -> Result<ChannelResult>;
}
