//! 通知类型定义

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 通知种类
///
/// 决定模板选择与指标维度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    /// 疫苗即将到期
    VaccinationExpiry,
    /// 用药/驱虫即将到期
    MedicationExpiry,
    /// 检查报告（由外部录入流程触发）
    ExamReport,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VaccinationExpiry => "vaccination_expiry",
            Self::MedicationExpiry => "medication_expiry",
            Self::ExamReport => "exam_report",
        }
    }
}

/// 到期提醒载荷
///
/// 每个 (记录, 主人) 组合一条，语言取主人偏好
#[derive(Debug, Clone)]
pub struct ExpiryNotice {
    pub recipient_email: String,
    pub recipient_name: String,
    pub language: String,
    pub pet_name: String,
    /// 疫苗名或药品名
    pub item_name: String,
    pub expiry_date: NaiveDate,
    /// 人类可读的剩余时间标签（如 "in 1 week"）
    pub time_left: String,
}

/// 检查报告通知载荷
///
/// 诊所录入检查记录后向主人发送，由外部录入流程调用
#[derive(Debug, Clone)]
pub struct ExamReportNotice {
    pub recipient_email: String,
    pub recipient_name: String,
    pub language: String,
    pub pet_name: String,
    pub clinic_name: String,
    pub exam_date: NaiveDate,
}

/// 待发送通知
///
/// 模板参数以键值对承载，渲染在发送时完成
#[derive(Debug, Clone)]
pub struct Notification {
    pub notification_id: String,
    pub kind: NotificationKind,
    pub recipient_email: String,
    pub language: String,
    pub params: HashMap<String, String>,
}

impl Notification {
    pub fn new(kind: NotificationKind, recipient_email: &str, language: &str) -> Self {
        Self {
            notification_id: Uuid::new_v4().to_string(),
            kind,
            recipient_email: recipient_email.to_string(),
            language: language.to_string(),
            params: HashMap::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// 从到期提醒载荷构建通知
    pub fn expiry(kind: NotificationKind, notice: &ExpiryNotice) -> Self {
        Self::new(kind, &notice.recipient_email, &notice.language)
            .with_param("recipient_name", notice.recipient_name.clone())
            .with_param("pet_name", notice.pet_name.clone())
            .with_param("item_name", notice.item_name.clone())
            .with_param("expiry_date", notice.expiry_date.format("%Y-%m-%d").to_string())
            .with_param("time_left", notice.time_left.clone())
    }

    /// 从检查报告载荷构建通知
    pub fn exam_report(notice: &ExamReportNotice) -> Self {
        Self::new(
            NotificationKind::ExamReport,
            &notice.recipient_email,
            &notice.language,
        )
        .with_param("recipient_name", notice.recipient_name.clone())
        .with_param("pet_name", notice.pet_name.clone())
        .with_param("clinic_name", notice.clinic_name.clone())
        .with_param("exam_date", notice.exam_date.format("%Y-%m-%d").to_string())
    }
}

/// 渲染后的通知内容
#[derive(Debug, Clone)]
pub struct RenderedContent {
    pub subject: String,
    pub body: String,
}

/// 发送状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SendStatus {
    Success,
    Failed,
    Skipped,
}

/// 单渠道发送结果
#[derive(Debug, Clone)]
pub struct ChannelResult {
    pub channel: String,
    pub status: SendStatus,
    pub external_message_id: Option<String>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl ChannelResult {
    pub fn success(channel: &str, external_message_id: Option<String>, duration_ms: u64) -> Self {
        Self {
            channel: channel.to_string(),
            status: SendStatus::Success,
            external_message_id,
            error: None,
            duration_ms,
        }
    }

    pub fn failed(channel: &str, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            channel: channel.to_string(),
            status: SendStatus::Failed,
            external_message_id: None,
            error: Some(error.into()),
            duration_ms,
        }
    }

    pub fn skipped(channel: &str, reason: impl Into<String>) -> Self {
        Self {
            channel: channel.to_string(),
            status: SendStatus::Skipped,
            external_message_id: None,
            error: Some(reason.into()),
            duration_ms: 0,
        }
    }
}

/// 通知发送总结果
#[derive(Debug, Clone)]
pub struct NotificationResult {
    pub notification_id: String,
    /// 是否所有实际尝试的渠道都发送成功
    pub success: bool,
    pub channel_results: Vec<ChannelResult>,
}

impl NotificationResult {
    pub fn success_count(&self) -> usize {
        self.channel_results
            .iter()
            .filter(|r| r.status == SendStatus::Success)
            .count()
    }

    pub fn failure_count(&self) -> usize {
        self.channel_results
            .iter()
            .filter(|r| r.status == SendStatus::Failed)
            .count()
    }

    pub fn is_partial_success(&self) -> bool {
        self.success_count() > 0 && self.failure_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_notice() -> ExpiryNotice {
        ExpiryNotice {
            recipient_email: "owner@example.com".to_string(),
            recipient_name: "Maria Ivanova".to_string(),
            language: "en".to_string(),
            pet_name: "Rex".to_string(),
            item_name: "Nobivac Rabies".to_string(),
            expiry_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            time_left: "in 1 week".to_string(),
        }
    }

    #[test]
    fn test_notification_from_expiry_notice() {
        let notice = create_test_notice();
        let notification = Notification::expiry(NotificationKind::VaccinationExpiry, &notice);

        assert_eq!(notification.kind, NotificationKind::VaccinationExpiry);
        assert_eq!(notification.recipient_email, "owner@example.com");
        assert_eq!(notification.language, "en");
        assert_eq!(notification.params["pet_name"], "Rex");
        assert_eq!(notification.params["expiry_date"], "2026-09-01");
        assert_eq!(notification.params["time_left"], "in 1 week");
    }

    #[test]
    fn test_notification_ids_are_unique() {
        let notice = create_test_notice();
        let a = Notification::expiry(NotificationKind::VaccinationExpiry, &notice);
        let b = Notification::expiry(NotificationKind::VaccinationExpiry, &notice);
        assert_ne!(a.notification_id, b.notification_id);
    }

    #[test]
    fn test_result_counts() {
        let result = NotificationResult {
            notification_id: "n-1".to_string(),
            success: false,
            channel_results: vec![
                ChannelResult::success("Email", Some("email_1".into()), 10),
                ChannelResult::failed("Email", "timeout", 30),
                ChannelResult::skipped("Email", "no address"),
            ],
        };

        assert_eq!(result.success_count(), 1);
        assert_eq!(result.failure_count(), 1);
        assert!(result.is_partial_success());
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(NotificationKind::VaccinationExpiry.as_str(), "vaccination_expiry");
        assert_eq!(NotificationKind::MedicationExpiry.as_str(), "medication_expiry");
        assert_eq!(NotificationKind::ExamReport.as_str(), "exam_report");
    }
}
