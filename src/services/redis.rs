//! Redis-backed session store

use async_trait::async_trait;
use redis::{AsyncCommands, Client};

use crate::error::{AppError, AppResult};

use super::sessions::{SessionData, SessionStore};

#[derive(Clone)]
pub struct RedisService {
    client: Client,
}

impl RedisService {
    /// Create a new Redis service
    pub async fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Session(format!("Failed to create Redis client: {}", e)))?;

        // Test connection
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Session(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Session(format!("Redis connection test failed: {}", e)))?;

        Ok(Self { client })
    }

    fn key(id: &str) -> String {
        format!("sess:{}", id)
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Session(format!("Failed to get Redis connection: {}", e)))
    }
}

#[async_trait]
impl SessionStore for RedisService {
    async fn load(&self, id: &str) -> AppResult<Option<SessionData>> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn.get(Self::key(id)).await?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, id: &str, data: &SessionData, ttl_seconds: u64) -> AppResult<()> {
        let mut conn = self.connection().await?;
        let json = serde_json::to_string(data)?;
        conn.set_ex::<_, _, ()>(Self::key(id), json, ttl_seconds).await?;
        Ok(())
    }

    async fn destroy(&self, id: &str) -> AppResult<()> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(Self::key(id)).await?;
        Ok(())
    }
}
