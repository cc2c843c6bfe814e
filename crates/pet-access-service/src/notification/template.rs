//! 通知模板引擎
//!
//! 按 (通知种类, 语言) 选择模板并做 `{placeholder}` 变量替换。
//! 未覆盖的语言回退到英文模板。

use std::collections::HashMap;

use tracing::warn;

use super::types::{Notification, RenderedContent};

/// 回退语言
const FALLBACK_LANGUAGE: &str = "en";

/// 单个模板：主题 + 正文
#[derive(Debug, Clone)]
struct Template {
    subject: &'static str,
    body: &'static str,
}

/// 通知模板引擎
pub struct TemplateEngine {
    templates: HashMap<(&'static str, &'static str), Template>,
}

impl TemplateEngine {
    /// 创建带内置模板的引擎
    pub fn with_defaults() -> Self {
        let mut templates = HashMap::new();

        // ==================== 疫苗到期 ====================
        templates.insert(
            ("vaccination_expiry", "en"),
            Template {
                subject: "Vaccine Expiration Notice for {pet_name}",
                body: "Hello {recipient_name},\n\n\
                       The vaccine {item_name} for {pet_name} expires {time_left}, \
                       on {expiry_date}.\n\n\
                       Please schedule a visit to your veterinary clinic to keep \
                       {pet_name}'s protection up to date.",
            },
        );
        templates.insert(
            ("vaccination_expiry", "bg"),
            Template {
                subject: "Напомняне за изтичаща ваксина на {pet_name}",
                body: "Здравейте, {recipient_name},\n\n\
                       Ваксината {item_name} на {pet_name} изтича {time_left} — \
                       на {expiry_date}.\n\n\
                       Моля, запазете час във ветеринарната клиника, за да поддържате \
                       защитата на {pet_name} актуална.",
            },
        );

        // ==================== 用药到期 ====================
        templates.insert(
            ("medication_expiry", "en"),
            Template {
                subject: "Treatment Expiration Notice for {pet_name}",
                body: "Hello {recipient_name},\n\n\
                       The treatment {item_name} for {pet_name} expires {time_left}, \
                       on {expiry_date}.\n\n\
                       Please plan the next application in time.",
            },
        );
        templates.insert(
            ("medication_expiry", "bg"),
            Template {
                subject: "Напомняне за изтичащо лечение на {pet_name}",
                body: "Здравейте, {recipient_name},\n\n\
                       Третирането {item_name} на {pet_name} изтича {time_left} — \
                       на {expiry_date}.\n\n\
                       Моля, планирайте следващото приложение навреме.",
            },
        );

        // ==================== 检查报告 ====================
        templates.insert(
            ("exam_report", "en"),
            Template {
                subject: "Medical Examination Report for {pet_name} - {exam_date}",
                body: "Hello {recipient_name},\n\n\
                       {clinic_name} has recorded a medical examination for {pet_name} \
                       on {exam_date}. You can review the full report in \
                       {pet_name}'s medical record.",
            },
        );
        templates.insert(
            ("exam_report", "bg"),
            Template {
                subject: "Доклад от медицински преглед на {pet_name} - {exam_date}",
                body: "Здравейте, {recipient_name},\n\n\
                       {clinic_name} записа медицински преглед на {pet_name} \
                       на {exam_date}. Пълният доклад е наличен в медицинския \
                       картон на {pet_name}.",
            },
        );

        Self { templates }
    }

    /// 渲染通知的主题与正文
    pub fn render(&self, notification: &Notification) -> RenderedContent {
        let kind = notification.kind.as_str();

        let template = self
            .templates
            .get(&(kind, notification.language.as_str()))
            .or_else(|| {
                if notification.language != FALLBACK_LANGUAGE {
                    warn!(
                        notification_id = %notification.notification_id,
                        language = %notification.language,
                        "通知语言无模板，回退到英文"
                    );
                }
                self.templates.get(&(kind, FALLBACK_LANGUAGE))
            });

        // 内置模板覆盖所有 NotificationKind，空内容分支只是兜底
        match template {
            Some(t) => RenderedContent {
                subject: substitute(t.subject, &notification.params),
                body: substitute(t.body, &notification.params),
            },
            None => RenderedContent {
                subject: "Notification".to_string(),
                body: String::new(),
            },
        }
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// 变量替换：将 `{key}` 替换为对应值
fn substitute(template: &str, params: &HashMap<String, String>) -> String {
    let mut rendered = template.to_string();
    for (key, value) in params {
        rendered = rendered.replace(&format!("{{{}}}", key), value);
    }
    rendered
}
