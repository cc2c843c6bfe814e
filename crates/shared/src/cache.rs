//! Redis 缓存管理模块
//!
//! 提供 Redis 连接管理和 JSON 值的读写封装。
//! 缓存仅作为加速层使用，任何缓存失败都不应阻断主业务流程。

use crate::config::RedisConfig;
use crate::error::{Result, SharedError};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{info, instrument};

/// Redis 缓存客户端
#[derive(Clone)]
pub struct Cache {
    client: Client,
}

impl Cache {
    /// 创建 Redis 客户端
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        info!("Redis client created");
        Ok(Self { client })
    }

    /// 获取连接
    async fn get_conn(&self) -> Result<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(SharedError::from)
    }

    /// 健康检查
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.get_conn().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(SharedError::from)
    }

    /// 获取值
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.get_conn().await?;
        let value: Option<String> = conn.get(key).await?;

        match value {
            Some(v) => {
                let parsed: T = serde_json::from_str(&v)
                    .map_err(|e| SharedError::CacheSerialization(e.to_string()))?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    /// 设置值并指定 TTL
    #[instrument(skip(self, value))]
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let mut conn = self.get_conn().await?;
        let serialized = serde_json::to_string(value)
            .map_err(|e| SharedError::CacheSerialization(e.to_string()))?;

        let _: () = conn.set_ex(key, serialized, ttl.as_secs()).await?;
        Ok(())
    }

    /// 删除值
    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.get_conn().await?;
        let _: () = conn.del(key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // 需要 Redis 连接
    async fn test_cache_roundtrip() {
        let cache = Cache::new(&RedisConfig::default()).unwrap();
        cache.health_check().await.unwrap();

        let key = format!("test:roundtrip:{}", uuid::Uuid::new_v4());
        cache
            .set(&key, &"value".to_string(), Duration::from_secs(30))
            .await
            .unwrap();

        let got: Option<String> = cache.get(&key).await.unwrap();
        assert_eq!(got.as_deref(), Some("value"));

        cache.delete(&key).await.unwrap();
        let gone: Option<String> = cache.get(&key).await.unwrap();
        assert!(gone.is_none());
    }
}
