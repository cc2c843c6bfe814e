//! 通知发送器
//!
//! 提供业务侧发送通知的便捷接口。
//!
//! ## 设计说明
//!
//! `NotificationSender` 是 `NotificationService` 的轻量封装，可被注入到
//! 扫描任务与 Web 请求路径中。所有发送都是 fire-and-forget：
//! 慢速或故障的通知传输永远不会阻塞触发它的业务操作，
//! 失败只记录日志，不回滚任何已提交的授权或记录变更。

use std::sync::Arc;

use petpass_shared::observability::metrics;
use tracing::{error, info, warn};

use super::service::NotificationService;
use super::types::{ExamReportNotice, ExpiryNotice, Notification, NotificationKind};
use crate::models::RecordType;

/// 通知发送器
#[derive(Clone)]
pub struct NotificationSender {
    service: Arc<NotificationService>,
}

impl NotificationSender {
    pub fn new(service: Arc<NotificationService>) -> Self {
        Self { service }
    }

    /// 发送记录到期提醒
    ///
    /// 由到期扫描任务按 (记录, 主人) 调用
    pub fn send_expiry_notice(&self, record_type: RecordType, notice: ExpiryNotice) {
        let kind = match record_type {
            RecordType::Vaccination => NotificationKind::VaccinationExpiry,
            RecordType::Medication => NotificationKind::MedicationExpiry,
        };

        metrics::record_expiry_notices(record_type.as_str(), 1);
        self.send_async(Notification::expiry(kind, &notice));
    }

    /// 发送检查报告通知
    ///
    /// 由外部的检查录入流程在记录创建后调用
    pub fn send_exam_report(&self, notice: ExamReportNotice) {
        self.send_async(Notification::exam_report(&notice));
    }

    /// 同步发送并返回结果（集成测试用）
    pub async fn send_sync(
        &self,
        notification: Notification,
    ) -> crate::error::Result<super::types::NotificationResult> {
        self.service.send(notification).await
    }

    /// 异步发送通知（fire-and-forget）
    fn send_async(&self, notification: Notification) {
        let service = self.service.clone();
        let notification_id = notification.notification_id.clone();
        let recipient = notification.recipient_email.clone();
        let kind = notification.kind;

        tokio::spawn(async move {
            match service.send(notification).await {
                Ok(result) => {
                    if result.success {
                        info!(
                            notification_id = %notification_id,
                            recipient = %recipient,
                            kind = kind.as_str(),
                            "通知发送成功"
                        );
                    } else if result.is_partial_success() {
                        warn!(
                            notification_id = %notification_id,
                            recipient = %recipient,
                            success_count = result.success_count(),
                            failure_count = result.failure_count(),
                            "通知部分发送成功"
                        );
                    } else {
                        error!(
                            notification_id = %notification_id,
                            recipient = %recipient,
                            "通知发送失败"
                        );
                    }
                }
                Err(e) => {
                    error!(
                        notification_id = %notification_id,
                        recipient = %recipient,
                        error = %e,
                        "通知发送异常"
                    );
                }
            }
        });
    }
}
