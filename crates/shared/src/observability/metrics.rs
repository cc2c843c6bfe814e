//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let builder = PrometheusBuilder::new();
    let handle = builder.install_recorder()?;

    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    register_common_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 注册通用指标（预定义的业务指标）
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!(
        "access_codes_issued_total",
        "Total number of pet access codes issued or reused"
    );
    metrics::describe_counter!(
        "access_code_verifications_total",
        "Total number of access code verification attempts"
    );
    metrics::describe_counter!(
        "tokens_issued_total",
        "Total number of one-shot tokens issued"
    );
    metrics::describe_counter!(
        "token_redemptions_total",
        "Total number of one-shot token redemption attempts"
    );
    metrics::describe_counter!(
        "expiry_notices_total",
        "Total number of record expiry notices emitted"
    );
    metrics::describe_counter!(
        "tokens_purged_total",
        "Total number of stale unused tokens deleted by cleanup"
    );
    metrics::describe_gauge!(
        "worker_last_run_timestamp",
        "Unix timestamp of the last completed worker iteration"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 获取全局 Prometheus handle（用于自定义渲染）
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录访问码发放
///
/// `reused` 区分幂等复用与新生成
#[inline]
pub fn record_code_issued(reused: bool) {
    metrics::counter!(
        "access_codes_issued_total",
        "reused" => reused.to_string()
    )
    .increment(1);
}

/// 记录访问码验证结果
#[inline]
pub fn record_code_verification(status: &str) {
    metrics::counter!(
        "access_code_verifications_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录一次性令牌发放
#[inline]
pub fn record_token_issued(kind: &str) {
    metrics::counter!(
        "tokens_issued_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// 记录一次性令牌兑换结果
#[inline]
pub fn record_token_redemption(kind: &str, status: &str) {
    metrics::counter!(
        "token_redemptions_total",
        "kind" => kind.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录到期提醒发出数量
#[inline]
pub fn record_expiry_notices(record_type: &str, count: u64) {
    metrics::counter!(
        "expiry_notices_total",
        "record_type" => record_type.to_string()
    )
    .increment(count);
}

/// 记录清理任务删除的令牌数量
#[inline]
pub fn record_tokens_purged(kind: &str, count: u64) {
    metrics::counter!(
        "tokens_purged_total",
        "kind" => kind.to_string()
    )
    .increment(count);
}

/// 记录 Worker 最近一次完成时间，供存活告警使用
#[inline]
pub fn set_worker_last_run(worker: &str) {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);

    metrics::gauge!(
        "worker_last_run_timestamp",
        "worker" => worker.to_string()
    )
    .set(now);
}
