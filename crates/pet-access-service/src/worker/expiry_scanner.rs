//! 记录到期扫描 Worker
//!
//! 每日扫描疫苗与用药记录，对 `valid_until` 恰好落在配置的
//! 提前量（horizon）上的记录，向宠物的每位主人发出一条提醒。
//!
//! ## 幂等性契约
//!
//! 匹配按日期精确相等：一条记录对每个 horizon 只会在唯一的
//! 一个日历日上命中，任务每天运行一次时天然做到每
//! (记录, horizon) 至多一次。同一天内重复触发会重复发送——
//! 调度方必须保证每日至多一次；没有额外的去重台账。
//!
//! ## 失败隔离
//!
//! 单个主人/记录的通知失败只记日志，不中断剩余记录的处理。
//! 扫描对记录存储只读，不做任何变更。

use std::str::FromStr;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use cron::Schedule;
use petpass_shared::config::ScannerConfig;
use petpass_shared::observability::metrics;
use tracing::{error, info, instrument, warn};

use crate::error::Result;
use crate::models::{DueRecord, RecordType};
use crate::notification::{ExpiryNotice, NotificationSender};
use crate::repository::{PetRepositoryTrait, RecordRepositoryTrait};

/// 提前量表：天数 -> 人类可读标签
#[derive(Debug, Clone)]
pub struct HorizonTable {
    horizons: Vec<(u32, String)>,
}

impl HorizonTable {
    /// 从天数列表构建，标签按惯用说法生成
    pub fn from_days(days: &[u32]) -> Self {
        let horizons = days
            .iter()
            .map(|&d| (d, horizon_label(d)))
            .collect();
        Self { horizons }
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.horizons.iter().map(|(d, label)| (*d, label.as_str()))
    }
}

/// 天数对应的人类可读标签
fn horizon_label(days: u32) -> String {
    match days {
        1 => "tomorrow".to_string(),
        7 => "in 1 week".to_string(),
        14 => "in 2 weeks".to_string(),
        28 => "in 4 weeks".to_string(),
        d if d % 7 == 0 => format!("in {} weeks", d / 7),
        d => format!("in {} days", d),
    }
}

/// 记录到期扫描 Worker
pub struct ExpiryScanWorker<RR, PR>
where
    RR: RecordRepositoryTrait,
    PR: PetRepositoryTrait,
{
    record_repo: Arc<RR>,
    pet_repo: Arc<PR>,
    sender: NotificationSender,
    schedule: String,
    vaccination_horizons: HorizonTable,
    medication_horizons: HorizonTable,
}

impl<RR, PR> ExpiryScanWorker<RR, PR>
where
    RR: RecordRepositoryTrait,
    PR: PetRepositoryTrait,
{
    pub fn new(
        record_repo: Arc<RR>,
        pet_repo: Arc<PR>,
        sender: NotificationSender,
        config: &ScannerConfig,
    ) -> Self {
        Self {
            record_repo,
            pet_repo,
            sender,
            schedule: config.schedule.clone(),
            vaccination_horizons: HorizonTable::from_days(&config.vaccination_horizons),
            medication_horizons: HorizonTable::from_days(&config.medication_horizons),
        }
    }

    /// 主循环：按 cron 表达式每日触发扫描，直到进程退出
    pub async fn run(&self) {
        let schedule = match Schedule::from_str(&self.schedule) {
            Ok(s) => s,
            Err(e) => {
                error!(schedule = %self.schedule, error = %e, "扫描调度表达式无效，Worker 退出");
                return;
            }
        };

        info!(schedule = %self.schedule, "ExpiryScanWorker 已启动");

        loop {
            let Some(next) = schedule.upcoming(Utc).next() else {
                error!("扫描调度无后续触发时间，Worker 退出");
                return;
            };

            let wait = (next - Utc::now()).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            let today = Utc::now().date_naive();
            match self.scan_once(today).await {
                Ok(count) => info!(%today, count, "到期扫描完成"),
                Err(e) => error!(%today, error = %e, "到期扫描出错"),
            }

            metrics::set_worker_last_run("expiry_scan");
        }
    }

    /// 执行一轮扫描，返回发出的提醒数量
    ///
    /// 可独立于调度机制直接调用（cron、systemd timer 或测试）
    #[instrument(skip(self))]
    pub async fn scan_once(&self, today: NaiveDate) -> Result<u32> {
        let mut notices = 0u32;

        notices += self
            .scan_record_type(RecordType::Vaccination, today)
            .await?;
        notices += self.scan_record_type(RecordType::Medication, today).await?;

        info!(%today, notices, "本轮到期扫描共发出提醒");
        Ok(notices)
    }

    /// 扫描单一记录类型的全部 horizon
    async fn scan_record_type(&self, record_type: RecordType, today: NaiveDate) -> Result<u32> {
        let horizons = match record_type {
            RecordType::Vaccination => &self.vaccination_horizons,
            RecordType::Medication => &self.medication_horizons,
        };

        let mut notices = 0u32;

        for (offset, label) in horizons.iter() {
            let target_date = today + Duration::days(offset as i64);

            let records = match record_type {
                RecordType::Vaccination => self.record_repo.vaccinations_due(target_date).await?,
                RecordType::Medication => self.record_repo.medications_due(target_date).await?,
            };

            if records.is_empty() {
                continue;
            }

            info!(
                record_type = record_type.as_str(),
                %target_date,
                label,
                count = records.len(),
                "发现即将到期的记录"
            );

            for record in &records {
                notices += self.notify_owners(record_type, record, label).await;
            }
        }

        Ok(notices)
    }

    /// 向记录所属宠物的每位主人发送提醒，返回发出数量
    ///
    /// 单条失败（如主人查询出错）不影响其余记录
    async fn notify_owners(
        &self,
        record_type: RecordType,
        record: &DueRecord,
        label: &str,
    ) -> u32 {
        let owners = match self.pet_repo.list_owners(record.pet_id).await {
            Ok(owners) => owners,
            Err(e) => {
                error!(
                    record_id = %record.id,
                    pet_id = %record.pet_id,
                    error = %e,
                    "查询宠物主人失败，跳过该记录"
                );
                return 0;
            }
        };

        if owners.is_empty() {
            warn!(
                record_id = %record.id,
                pet_id = %record.pet_id,
                "宠物没有主人，跳过提醒"
            );
            return 0;
        }

        let mut sent = 0u32;
        for owner in owners {
            self.sender.send_expiry_notice(
                record_type,
                ExpiryNotice {
                    recipient_email: owner.email.clone(),
                    recipient_name: owner.full_name(),
                    language: owner.language.clone(),
                    pet_name: record.pet_name.clone(),
                    item_name: record.item_name.clone(),
                    expiry_date: record.valid_until,
                    time_left: label.to_string(),
                },
            );
            sent += 1;
        }

        sent
    }
}
