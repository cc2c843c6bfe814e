//! 令牌清理 Worker
//!
//! 周期删除过期且未使用的一次性令牌（分享令牌与诊所令牌）。
//! 已使用的令牌保留——它们是所有权变更与访问授予的事实依据；
//! 窗口内的新鲜令牌不受影响。删除按批进行，避免大表长锁。

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use petpass_shared::config::{CleanupConfig, GrantConfig};
use petpass_shared::observability::metrics;
use tracing::{error, info, instrument};

use crate::error::Result;
use crate::models::TokenKind;
use crate::repository::GrantRepositoryTrait;

/// 令牌清理 Worker
pub struct TokenCleanupWorker<GR>
where
    GR: GrantRepositoryTrait,
{
    grant_repo: Arc<GR>,
    poll_interval: Duration,
    batch_size: i64,
    /// 令牌有效窗口：只清理早于 now - token_ttl 的未使用行
    token_ttl_seconds: i64,
}

impl<GR> TokenCleanupWorker<GR>
where
    GR: GrantRepositoryTrait,
{
    pub fn new(grant_repo: Arc<GR>, cleanup: &CleanupConfig, grants: &GrantConfig) -> Self {
        Self {
            grant_repo,
            poll_interval: Duration::from_secs(cleanup.poll_interval_seconds),
            batch_size: cleanup.batch_size,
            token_ttl_seconds: grants.token_ttl_seconds,
        }
    }

    /// 主循环：按固定间隔清理，直到进程退出
    pub async fn run(&self) {
        info!(
            poll_interval = ?self.poll_interval,
            batch_size = self.batch_size,
            "TokenCleanupWorker 已启动"
        );

        loop {
            match self.purge_once().await {
                Ok(purged) if purged > 0 => info!(purged, "过期令牌清理完成"),
                Ok(_) => {}
                Err(e) => error!(error = %e, "过期令牌清理出错"),
            }

            metrics::set_worker_last_run("token_cleanup");

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// 执行一轮清理，返回删除总数
    ///
    /// 可独立于调度机制直接调用
    #[instrument(skip(self))]
    pub async fn purge_once(&self) -> Result<u64> {
        let older_than = Utc::now() - ChronoDuration::seconds(self.token_ttl_seconds);
        let mut total = 0u64;

        for kind in [TokenKind::Share, TokenKind::VetAccess] {
            let purged = self
                .grant_repo
                .purge_expired_unused(kind, older_than, self.batch_size)
                .await?;

            if purged > 0 {
                metrics::record_tokens_purged(kind.as_str(), purged);
                info!(kind = kind.as_str(), purged, "删除过期未使用令牌");
            }

            total += purged;
        }

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockGrantRepositoryTrait;

    fn test_worker(
        grant_repo: MockGrantRepositoryTrait,
    ) -> TokenCleanupWorker<MockGrantRepositoryTrait> {
        TokenCleanupWorker::new(
            Arc::new(grant_repo),
            &CleanupConfig::default(),
            &GrantConfig::default(),
        )
    }

    /// 两种令牌各清理一次，总数相加
    #[tokio::test]
    async fn test_purge_once_covers_both_kinds() {
        let mut grant_repo = MockGrantRepositoryTrait::new();
        grant_repo
            .expect_purge_expired_unused()
            .withf(|kind, _, batch| *kind == TokenKind::Share && *batch == 1000)
            .times(1)
            .returning(|_, _, _| Ok(3));
        grant_repo
            .expect_purge_expired_unused()
            .withf(|kind, _, _| *kind == TokenKind::VetAccess)
            .times(1)
            .returning(|_, _, _| Ok(2));

        let worker = test_worker(grant_repo);
        let total = worker.purge_once().await.unwrap();
        assert_eq!(total, 5);
    }

    /// 清理阈值是 now - 600 秒：新鲜令牌不会被纳入删除范围
    #[tokio::test]
    async fn test_purge_threshold_respects_token_ttl() {
        let before = Utc::now();

        let mut grant_repo = MockGrantRepositoryTrait::new();
        grant_repo
            .expect_purge_expired_unused()
            .times(2)
            .withf(move |_, older_than, _| {
                let delta = before - *older_than;
                // 阈值应为约 600 秒前
                delta >= ChronoDuration::seconds(599) && delta <= ChronoDuration::seconds(602)
            })
            .returning(|_, _, _| Ok(0));

        let worker = test_worker(grant_repo);
        let total = worker.purge_once().await.unwrap();
        assert_eq!(total, 0);
    }
}
