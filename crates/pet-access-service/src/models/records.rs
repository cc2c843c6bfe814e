//! 医疗记录实体定义
//!
//! 疫苗与用药记录由诊所录入流程（外部协作方）写入，
//! 本服务只读：到期扫描按 `valid_until` 精确匹配日期。

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 记录类型（用于扫描与指标打点）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Vaccination,
    Medication,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vaccination => "vaccination",
            Self::Medication => "medication",
        }
    }
}

/// 疫苗接种记录
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VaccinationRecord {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub vaccine_name: String,
    pub manufacturer: String,
    pub batch_number: String,
    pub date_of_vaccination: NaiveDate,
    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// 用药记录
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MedicationRecord {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub medication_name: String,
    pub manufacturer: String,
    pub date: NaiveDate,
    pub valid_until: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// 到期扫描的查询结果行
///
/// 疫苗与用药记录的公共投影，附带宠物名用于通知正文。
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DueRecord {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub pet_name: String,
    /// 疫苗名或药品名
    pub item_name: String,
    pub valid_until: NaiveDate,
}
