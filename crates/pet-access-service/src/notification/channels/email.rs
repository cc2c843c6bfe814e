//! Email 邮件通知渠道
//!
//! 当前为模拟实现，生产环境需要接入真实的邮件服务（如 SendGrid、AWS SES）。

use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{ChannelConfig, NotificationChannel};
use crate::error::Result;
use crate::notification::types::{ChannelResult, Notification, RenderedContent};

/// Email 邮件通知渠道
pub struct EmailChannel {
    config: ChannelConfig,
    /// 发件人地址
    from_address: String,
}

impl EmailChannel {
    pub fn new(config: ChannelConfig, from_address: String) -> Self {
        Self {
            config,
            from_address,
        }
    }

    /// 使用默认配置创建
    pub fn with_defaults() -> Self {
        Self::new(
            ChannelConfig::new(true).with_timeout(10_000),
            "noreply@petpass.app".to_string(),
        )
    }

    /// 模拟发送邮件（生产环境应接入真实邮件服务）
    async fn send_email(
        &self,
        notification: &Notification,
        content: &RenderedContent,
    ) -> Result<String> {
        // 模拟网络延迟
        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;

        debug!(
            notification_id = %notification.notification_id,
            to = %notification.recipient_email,
            from = %self.from_address,
            subject = %content.subject,
            body_length = content.body.len(),
            "Email 发送中..."
        );

        // 模拟发送失败
        #[cfg(test)]
        if notification.recipient_email.contains("fail_email") {
            return Err(crate::error::AccessError::Internal(
                "模拟 Email 发送失败".to_string(),
            ));
        }

        let message_id = format!("email_{}", Uuid::new_v4());

        info!(
            notification_id = %notification.notification_id,
            message_id = %message_id,
            "Email 发送成功"
        );

        Ok(message_id)
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &str {
        "Email"
    }

    async fn is_available(&self, notification: &Notification) -> bool {
        if !self.config.enabled {
            warn!(
                notification_id = %notification.notification_id,
                "Email 渠道已禁用"
            );
            return false;
        }

        if notification.recipient_email.is_empty() {
            warn!(
                notification_id = %notification.notification_id,
                "收件人邮箱为空，跳过 Email"
            );
            return false;
        }

        true
    }

    async fn send(
        &self,
        notification: &Notification,
        content: &RenderedContent,
    ) -> Result<ChannelResult> {
        let start = Instant::now();

        if !self.is_available(notification).await {
            return Ok(ChannelResult::skipped(
                self.name(),
                "收件人邮箱缺失或渠道已禁用",
            ));
        }

        match self.send_email(notification, content).await {
            Ok(message_id) => Ok(ChannelResult::success(
                self.name(),
                Some(message_id),
                start.elapsed().as_millis() as u64,
            )),
            Err(e) => Ok(ChannelResult::failed(
                self.name(),
                e.to_string(),
                start.elapsed().as_millis() as u64,
            )),
        }
    }
}
