//! 数据库仓储层
//!
//! 按聚合划分仓储，非事务读写走实例方法，
//! 事务内的行级锁操作走以 `_in_tx` 结尾的静态方法。

pub mod grant_repo;
pub mod identity_repo;
pub mod pet_repo;
pub mod record_repo;
pub mod traits;

pub use grant_repo::GrantRepository;
pub use identity_repo::IdentityRepository;
pub use pet_repo::PetRepository;
pub use record_repo::RecordRepository;
pub use traits::{
    GrantRepositoryTrait, IdentityRepositoryTrait, PetRepositoryTrait, RecordRepositoryTrait,
};

#[cfg(test)]
pub use traits::{
    MockGrantRepositoryTrait, MockIdentityRepositoryTrait, MockPetRepositoryTrait,
    MockRecordRepositoryTrait,
};
