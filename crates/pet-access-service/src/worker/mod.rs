//! 后台任务
//!
//! 两个相互独立的周期任务，核心逻辑均为可单独调用的同步入口
//! （`scan_once` / `purge_once`），与调度机制解耦：
//! - `ExpiryScanWorker`：每日扫描即将到期的疫苗/用药记录并发出提醒
//! - `TokenCleanupWorker`：周期清理过期且未使用的一次性令牌

pub mod cleanup_worker;
pub mod expiry_scanner;

pub use cleanup_worker::TokenCleanupWorker;
pub use expiry_scanner::{ExpiryScanWorker, HorizonTable};
