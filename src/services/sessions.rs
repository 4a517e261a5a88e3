//! Session records and the stores that keep them
//!
//! A session holds the logged-in user id and one-shot flash messages. The
//! store only persists and expires records; cookie handling lives in
//! `api::session`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

use crate::error::AppResult;

/// Flash message category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Error,
    Success,
}

/// Messages kept until the next page that displays them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    #[serde(default)]
    pub error: Vec<String>,
    #[serde(default)]
    pub success: Vec<String>,
}

impl Flash {
    pub fn is_empty(&self) -> bool {
        self.error.is_empty() && self.success.is_empty()
    }

    pub fn push(&mut self, kind: FlashKind, message: impl Into<String>) {
        match kind {
            FlashKind::Error => self.error.push(message.into()),
            FlashKind::Success => self.success.push(message.into()),
        }
    }
}

/// Persisted content of one session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    /// Authenticated user, if any
    #[serde(default)]
    pub user_id: Option<i32>,
    #[serde(default)]
    pub flash: Flash,
}

impl SessionData {
    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.flash.is_empty()
    }
}

/// Backing store for session records
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, id: &str) -> AppResult<Option<SessionData>>;

    /// Insert or replace a record, resetting its expiry
    async fn save(&self, id: &str, data: &SessionData, ttl_seconds: u64) -> AppResult<()>;

    async fn destroy(&self, id: &str) -> AppResult<()>;
}

/// Session store kept in process memory
#[derive(Default)]
pub struct MemorySessionStore {
    records: RwLock<HashMap<String, (SessionData, DateTime<Utc>)>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &str) -> AppResult<Option<SessionData>> {
        let records = self.records.read().await;
        Ok(records
            .get(id)
            .filter(|(_, expires_at)| *expires_at > Utc::now())
            .map(|(data, _)| data.clone()))
    }

    async fn save(&self, id: &str, data: &SessionData, ttl_seconds: u64) -> AppResult<()> {
        let expires_at = Utc::now() + Duration::seconds(ttl_seconds as i64);
        let mut records = self.records.write().await;
        records.retain(|_, (_, exp)| *exp > Utc::now());
        records.insert(id.to_string(), (data.clone(), expires_at));
        Ok(())
    }

    async fn destroy(&self, id: &str) -> AppResult<()> {
        self.records.write().await.remove(id);
        Ok(())
    }
}

/// Session store handle plus record lifetime
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    ttl_seconds: u64,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>, ttl_seconds: u64) -> Self {
        Self { store, ttl_seconds }
    }

    /// Fresh random session id
    pub fn new_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    pub async fn load(&self, id: &str) -> AppResult<Option<SessionData>> {
        self.store.load(id).await
    }

    pub async fn save(&self, id: &str, data: &SessionData) -> AppResult<()> {
        self.store.save(id, data, self.ttl_seconds).await
    }

    pub async fn destroy(&self, id: &str) -> AppResult<()> {
        self.store.destroy(id).await
    }
}
