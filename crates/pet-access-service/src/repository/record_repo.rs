//! 医疗记录仓储
//!
//! 到期扫描的只读查询：按 `valid_until` 精确匹配日期，
//! 附带宠物名，避免扫描时逐条回查。

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use super::traits::RecordRepositoryTrait;
use crate::error::Result;
use crate::models::DueRecord;

/// 医疗记录仓储
pub struct RecordRepository {
    pool: PgPool,
}

impl RecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 查询恰好在给定日期到期的疫苗记录
    pub async fn vaccinations_due(&self, on: NaiveDate) -> Result<Vec<DueRecord>> {
        let records = sqlx::query_as::<_, DueRecord>(
            r#"
            SELECT r.id, r.pet_id, p.name AS pet_name, r.vaccine_name AS item_name,
                   r.valid_until
            FROM vaccination_records r
            JOIN pets p ON p.id = r.pet_id
            WHERE r.valid_until = $1
            ORDER BY r.id ASC
            "#,
        )
        .bind(on)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// 查询恰好在给定日期到期的用药记录
    pub async fn medications_due(&self, on: NaiveDate) -> Result<Vec<DueRecord>> {
        let records = sqlx::query_as::<_, DueRecord>(
            r#"
            SELECT r.id, r.pet_id, p.name AS pet_name, r.medication_name AS item_name,
                   r.valid_until
            FROM medication_records r
            JOIN pets p ON p.id = r.pet_id
            WHERE r.valid_until = $1
            ORDER BY r.id ASC
            "#,
        )
        .bind(on)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

#[async_trait]
impl RecordRepositoryTrait for RecordRepository {
    async fn vaccinations_due(&self, on: NaiveDate) -> Result<Vec<DueRecord>> {
        self.vaccinations_due(on).await
    }

    async fn medications_due(&self, on: NaiveDate) -> Result<Vec<DueRecord>> {
        self.medications_due(on).await
    }
}
