//! 通知服务
//!
//! 渲染模板并将通知分发到所有可用渠道。
//! 单渠道失败不影响其他渠道；所有渠道结果聚合为一个
//! `NotificationResult` 返回给调用方。

use std::sync::Arc;

use tracing::{instrument, warn};

use super::channels::{EmailChannel, NotificationChannel};
use super::template::TemplateEngine;
use super::types::{Notification, NotificationResult, SendStatus};
use crate::error::Result;

/// 通知服务
pub struct NotificationService {
    engine: TemplateEngine,
    channels: Vec<Arc<dyn NotificationChannel>>,
}

impl NotificationService {
    pub fn new(engine: TemplateEngine, channels: Vec<Arc<dyn NotificationChannel>>) -> Self {
        Self { engine, channels }
    }

    /// 使用默认配置创建：内置模板 + Email 渠道
    pub fn with_defaults() -> Self {
        Self::new(
            TemplateEngine::with_defaults(),
            vec![Arc::new(EmailChannel::with_defaults())],
        )
    }

    /// 发送通知到所有可用渠道
    #[instrument(skip(self, notification), fields(notification_id = %notification.notification_id, kind = notification.kind.as_str()))]
    pub async fn send(&self, notification: Notification) -> Result<NotificationResult> {
        let content = self.engine.render(&notification);

        let mut channel_results = Vec::with_capacity(self.channels.len());

        for channel in &self.channels {
            match channel.send(&notification, &content).await {
                Ok(result) => channel_results.push(result),
                // 渠道内部错误同样折叠为失败结果，不中断其余渠道
                Err(e) => {
                    warn!(
                        channel = channel.name(),
                        error = %e,
                        "渠道发送出现内部错误"
                    );
                    channel_results.push(super::types::ChannelResult::failed(
                        channel.name(),
                        e.to_string(),
                        0,
                    ));
                }
            }
        }

        let attempted: Vec<_> = channel_results
            .iter()
            .filter(|r| r.status != SendStatus::Skipped)
            .collect();
        let success =
            !attempted.is_empty() && attempted.iter().all(|r| r.status == SendStatus::Success);

        Ok(NotificationResult {
            notification_id: notification.notification_id,
            success,
            channel_results,
        })
    }
}
