//! 通知模块
//!
//! 面向主人与诊所的通知发送，当前只有邮件渠道。
//!
//! ## 功能特性
//!
//! - **模板引擎**：按通知种类与收件人语言选择模板，支持变量替换
//! - **异步发送**：fire-and-forget，不阻塞扫描任务或 Web 请求
//! - **部分失败容忍**：单渠道失败不影响其他渠道，发送失败只记日志
//!
//! 邮件传输本身（SMTP 等）是外部协作方，`EmailChannel` 为模拟实现。

pub mod channels;
pub mod sender;
pub mod service;
pub mod template;
pub mod types;

pub use channels::{ChannelConfig, EmailChannel, NotificationChannel};
pub use sender::NotificationSender;
pub use service::NotificationService;
pub use template::TemplateEngine;
pub use types::{
    ChannelResult, ExamReportNotice, ExpiryNotice, Notification, NotificationKind,
    NotificationResult, RenderedContent, SendStatus,
};
