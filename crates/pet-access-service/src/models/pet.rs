//! 宠物相关实体定义
//!
//! 宠物是所有授权与记录的身份锚点。标识（芯片/纹身）与宠物一对一，
//! 删除宠物时数据库级联清理其标识、记录和授权。

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 宠物性别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum PetSex {
    Male,
    Female,
}

/// 宠物
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: Uuid,
    pub name: String,
    pub species: String,
    pub breed: String,
    pub sex: PetSex,
    pub date_of_birth: NaiveDate,
    /// 护照号，全局唯一
    pub passport_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pet {
    /// 计算给定日期时的年龄描述
    ///
    /// 沿用「年 / 月 / 天」的粗粒度算法，仅用于展示。
    pub fn age_on(&self, today: NaiveDate) -> String {
        let days = (today - self.date_of_birth).num_days().max(0);
        let years = days / 365;
        let months = days % 365 / 30;
        let rest = days % 365 % 30;
        format!("{} years, {} months and {} days", years, months, rest)
    }
}

/// 标识类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum MarkingKind {
    /// 皮下芯片
    Transponder,
    /// 纹身
    Tattoo,
}

/// 宠物标识（芯片或纹身），与宠物一对一
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Marking {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub kind: MarkingKind,
    pub code: String,
    pub location: String,
    #[sqlx(default)]
    pub applied_on: Option<NaiveDate>,
}

/// 主人摘要（对诊所展示）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
}

/// 宠物摘要
///
/// 访问码验证成功后返回给诊所的视图，可整体缓存。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetSummary {
    pub pet_id: Uuid,
    pub name: String,
    pub species: String,
    pub age: String,
    pub owners: Vec<OwnerSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_pet(date_of_birth: NaiveDate) -> Pet {
        Pet {
            id: Uuid::new_v4(),
            name: "Rex".to_string(),
            species: "Dog".to_string(),
            breed: "Mixed".to_string(),
            sex: PetSex::Male,
            date_of_birth,
            passport_number: "BG0123456789".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_age_on_exact_years() {
        let born = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let pet = create_test_pet(born);

        // 730 天 = 2 年整
        let today = born + chrono::Duration::days(730);
        assert_eq!(pet.age_on(today), "2 years, 0 months and 0 days");
    }

    #[test]
    fn test_age_on_mixed() {
        let born = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let pet = create_test_pet(born);

        // 400 天 = 1 年 + 35 天 = 1 年 1 个月 5 天
        let today = born + chrono::Duration::days(400);
        assert_eq!(pet.age_on(today), "1 years, 1 months and 5 days");
    }

    #[test]
    fn test_age_on_future_birth_date_clamps_to_zero() {
        let born = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let pet = create_test_pet(born);

        let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(pet.age_on(today), "0 years, 0 months and 0 days");
    }
}
