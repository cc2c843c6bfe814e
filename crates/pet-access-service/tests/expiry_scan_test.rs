//! ExpiryScanWorker 集成测试
//!
//! 使用真实 PostgreSQL 测试到期扫描的日期精确匹配语义。
//! 通知走默认的模拟邮件渠道，断言以扫描返回的发出数量为准。
//!
//! ## 运行方式
//!
//! ```bash
//! DATABASE_URL=postgres://... cargo test --test expiry_scan_test -- --ignored
//! ```

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use petpass_shared::config::ScannerConfig;
use sqlx::PgPool;
use uuid::Uuid;

use pet_access::notification::{NotificationSender, NotificationService};
use pet_access::repository::{PetRepository, RecordRepository};
use pet_access::worker::ExpiryScanWorker;

// ==================== 辅助函数 ====================

async fn setup_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");
    let pool = PgPool::connect(&url).await.expect("数据库连接失败");
    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .expect("迁移执行失败");
    pool
}

async fn seed_owner(pool: &PgPool) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO identities (email, first_name, last_name, role, language)
        VALUES ($1, 'Maria', 'Ivanova', 'owner', 'bg')
        RETURNING id
        "#,
    )
    .bind(format!("owner+{}@example.com", Uuid::new_v4().simple()))
    .fetch_one(pool)
    .await
    .expect("插入测试主人失败")
}

async fn seed_pet_with_owner(pool: &PgPool, name: &str) -> Uuid {
    let owner_id = seed_owner(pool).await;
    let pet_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO pets (name, species, breed, sex, date_of_birth, passport_number)
        VALUES ($1, 'Cat', 'Siamese', 'female', '2021-05-01', $2)
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(format!("T{:011}", Uuid::new_v4().as_u128() % 100_000_000_000))
    .fetch_one(pool)
    .await
    .expect("插入测试宠物失败");

    sqlx::query("INSERT INTO pet_owners (pet_id, identity_id) VALUES ($1, $2)")
        .bind(pet_id)
        .bind(owner_id)
        .execute(pool)
        .await
        .expect("绑定主人失败");

    pet_id
}

async fn seed_vaccination(pool: &PgPool, pet_id: Uuid, valid_until: NaiveDate) {
    sqlx::query(
        r#"
        INSERT INTO vaccination_records
            (pet_id, vaccine_name, manufacturer, batch_number,
             date_of_vaccination, valid_from, valid_until)
        VALUES ($1, 'Nobivac Rabies', 'MSD', 'A113B05', $2, $3, $4)
        "#,
    )
    .bind(pet_id)
    .bind(valid_until - Duration::days(365))
    .bind(valid_until - Duration::days(344))
    .bind(valid_until)
    .execute(pool)
    .await
    .expect("插入疫苗记录失败");
}

async fn seed_medication(pool: &PgPool, pet_id: Uuid, valid_until: NaiveDate) {
    sqlx::query(
        r#"
        INSERT INTO medication_records
            (pet_id, medication_name, manufacturer, date, valid_until)
        VALUES ($1, 'Bravecto', 'MSD', $2, $3)
        "#,
    )
    .bind(pet_id)
    .bind(valid_until - Duration::days(90))
    .bind(valid_until)
    .execute(pool)
    .await
    .expect("插入用药记录失败");
}

fn build_worker(pool: &PgPool) -> ExpiryScanWorker<RecordRepository, PetRepository> {
    ExpiryScanWorker::new(
        Arc::new(RecordRepository::new(pool.clone())),
        Arc::new(PetRepository::new(pool.clone())),
        NotificationSender::new(Arc::new(NotificationService::with_defaults())),
        &ScannerConfig::default(),
    )
}

/// 远离其他测试数据的基准日，保证日期精确匹配不受并行测试干扰
fn isolated_today() -> NaiveDate {
    let offset = (Uuid::new_v4().as_u128() % 3650) as i64;
    Utc::now().date_naive() + Duration::days(3650 + offset)
}

// ==================== 测试 ====================

/// valid_until = today + 7 的疫苗记录：今天扫描恰好一条；明天扫描零条
#[tokio::test]
#[ignore]
async fn test_scan_hits_exact_date_only() {
    let pool = setup_pool().await;
    let pet_id = seed_pet_with_owner(&pool, "ScanPet").await;

    let today = isolated_today();
    seed_vaccination(&pool, pet_id, today + Duration::days(7)).await;

    let worker = build_worker(&pool);

    let count = worker.scan_once(today).await.unwrap();
    assert_eq!(count, 1, "7 天 horizon 恰好命中一条");

    // 明天扫描：记录变为 6 天后到期，任何 horizon 都不命中
    let count = worker.scan_once(today + Duration::days(1)).await.unwrap();
    assert_eq!(count, 0);
}

/// 疫苗四个 horizon 全部命中 + 用药两个 horizon 全部命中
#[tokio::test]
#[ignore]
async fn test_scan_covers_all_configured_horizons() {
    let pool = setup_pool().await;
    let pet_id = seed_pet_with_owner(&pool, "HorizonPet").await;

    let today = isolated_today();
    for days in [28, 14, 7, 1] {
        seed_vaccination(&pool, pet_id, today + Duration::days(days)).await;
    }
    for days in [7, 1] {
        seed_medication(&pool, pet_id, today + Duration::days(days)).await;
    }

    let worker = build_worker(&pool);

    let count = worker.scan_once(today).await.unwrap();
    assert_eq!(count, 6, "4 条疫苗 + 2 条用药各发一条");
}

/// 两位主人：每条命中记录按主人数发出
#[tokio::test]
#[ignore]
async fn test_scan_fans_out_per_owner() {
    let pool = setup_pool().await;
    let pet_id = seed_pet_with_owner(&pool, "FanoutPet").await;

    // 追加第二位主人
    let second_owner = seed_owner(&pool).await;
    sqlx::query("INSERT INTO pet_owners (pet_id, identity_id) VALUES ($1, $2)")
        .bind(pet_id)
        .bind(second_owner)
        .execute(&pool)
        .await
        .unwrap();

    let today = isolated_today();
    seed_medication(&pool, pet_id, today + Duration::days(1)).await;

    let worker = build_worker(&pool);

    let count = worker.scan_once(today).await.unwrap();
    assert_eq!(count, 2, "一条记录、两位主人，各一条提醒");
}

/// 无主宠物的记录不产生提醒，也不影响其他记录
#[tokio::test]
#[ignore]
async fn test_scan_skips_ownerless_pets() {
    let pool = setup_pool().await;

    // 无主宠物
    let orphan: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO pets (name, species, breed, sex, date_of_birth, passport_number)
        VALUES ('Orphan', 'Dog', 'Mixed', 'male', '2020-01-01', $1)
        RETURNING id
        "#,
    )
    .bind(format!("T{:011}", Uuid::new_v4().as_u128() % 100_000_000_000))
    .fetch_one(&pool)
    .await
    .unwrap();

    let owned = seed_pet_with_owner(&pool, "OwnedPet").await;

    let today = isolated_today();
    seed_vaccination(&pool, orphan, today + Duration::days(14)).await;
    seed_vaccination(&pool, owned, today + Duration::days(14)).await;

    let worker = build_worker(&pool);

    let count = worker.scan_once(today).await.unwrap();
    assert_eq!(count, 1, "无主宠物跳过，有主宠物正常发出");
}
