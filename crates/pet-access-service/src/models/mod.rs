//! 领域模型定义
//!
//! 包含身份、宠物、访问授权与医疗记录实体。
//! 所有实体同时支持数据库（sqlx）和 JSON（serde）序列化。

pub mod grants;
pub mod identity;
pub mod pet;
pub mod records;

pub use grants::{AccessCode, GrantSource, ShareToken, TokenKind, VetAccessToken, VetPetAccess};
pub use identity::{Identity, IdentityRole};
pub use pet::{Marking, MarkingKind, OwnerSummary, Pet, PetSex, PetSummary};
pub use records::{DueRecord, MedicationRecord, RecordType, VaccinationRecord};
