//! 宠物医疗记录访问授权服务入口
//!
//! 提供访问授权 REST API，并运行到期扫描与令牌清理后台任务。

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use petpass_shared::{cache::Cache, config::AppConfig, database::Database, observability};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use pet_access::notification::{NotificationSender, NotificationService};
use pet_access::repository::{
    GrantRepository, IdentityRepository, PetRepository, RecordRepository,
};
use pet_access::service::{GrantIssueService, GrantRedeemService};
use pet_access::state::AppState;
use pet_access::worker::{ExpiryScanWorker, TokenCleanupWorker};
use pet_access::routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 统一加载配置：config/{service_name}.toml + PETPASS_ 环境变量
    let config = AppConfig::load("pet-access-service").unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    // 2. 初始化可观测性（日志 + Prometheus 指标）
    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!("Starting pet-access-service on {}", config.server_addr());
    info!(environment = %config.environment, "Configuration loaded");

    // 3. 初始化基础设施
    let db = Database::connect(&config.database).await?;
    db.run_migrations().await?;
    let pool = db.pool().clone();
    info!("Database connection established");

    let cache = Arc::new(Cache::new(&config.redis)?);
    if let Err(e) = cache.health_check().await {
        // 缓存只是加速层，不可用时降级运行
        warn!(error = %e, "Redis unavailable at startup, running without cache acceleration");
    } else {
        info!("Redis connection established");
    }

    // 4. 创建仓储
    let pet_repo = Arc::new(PetRepository::new(pool.clone()));
    let identity_repo = Arc::new(IdentityRepository::new(pool.clone()));
    let grant_repo = Arc::new(GrantRepository::new(pool.clone()));
    let record_repo = Arc::new(RecordRepository::new(pool.clone()));
    info!("Repositories initialized");

    // 5. 创建服务
    let issue_service = Arc::new(GrantIssueService::new(
        pet_repo.clone(),
        grant_repo.clone(),
        pool.clone(),
        config.grants.clone(),
    ));

    let redeem_service = Arc::new(GrantRedeemService::new(
        pet_repo.clone(),
        issue_service.clone(),
        pool.clone(),
        cache.clone(),
        config.grants.clone(),
    ));

    let notification_service = Arc::new(NotificationService::with_defaults());
    let sender = NotificationSender::new(notification_service);
    info!("Services initialized");

    // 6. 启动后台任务
    // 到期扫描：每日一次。重复触发会重复发送提醒，
    // 调度以此处的单实例 cron 循环为准，不要再叠加外部调度。
    let scan_worker = ExpiryScanWorker::new(
        record_repo.clone(),
        pet_repo.clone(),
        sender.clone(),
        &config.scanner,
    );
    tokio::spawn(async move {
        scan_worker.run().await;
    });

    // 令牌清理：高频轮询，批量删除避免长锁
    let cleanup_worker =
        TokenCleanupWorker::new(grant_repo.clone(), &config.cleanup, &config.grants);
    tokio::spawn(async move {
        cleanup_worker.run().await;
    });
    info!("Background workers started");

    // 7. CORS 配置：通过 PETPASS_CORS_ORIGINS 环境变量控制允许的来源
    let allowed_origins = std::env::var("PETPASS_CORS_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:5173".to_string());

    let cors = if allowed_origins == "*" {
        if config.is_production() {
            warn!("PETPASS_CORS_ORIGINS=\"*\" is unsafe in production");
        }
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = allowed_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // 8. 组装路由并启动服务
    let state = AppState::new(
        pool,
        cache,
        identity_repo,
        pet_repo,
        issue_service,
        redeem_service,
    );

    let app = Router::new()
        .nest("/api", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(std::time::Duration::from_secs(30)))
        .layer(cors)
        .with_state(state);

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 优雅关闭：收到 SIGTERM 或 Ctrl+C 时停止接收新连接，
    // 等待已有请求处理完毕；未提交的事务整体回滚
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// 优雅关闭信号处理
///
/// 监听 Ctrl+C 和 SIGTERM 信号
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        }
    }
}
