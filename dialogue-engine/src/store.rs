use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use redis::{aio::ConnectionManager, AsyncCommands};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{SessionError, SessionResult};
use crate::session::{DialogueSession, SessionSeed};

/// Keyed store of live dialogue sessions, one per call id.
///
/// `update` never recreates a session: once the call-end callback has
/// deleted it, late writes from an in-flight turn fail with
/// [`SessionError::NotFound`] and are dropped by the caller.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The call's session, created from `seed` if this is the first webhook
    async fn get_or_create(&self, seed: SessionSeed) -> SessionResult<DialogueSession>;

    async fn get(&self, call_id: &str) -> SessionResult<Option<DialogueSession>>;

    async fn update(&self, session: DialogueSession) -> SessionResult<()>;

    /// Returns whether a session was removed
    async fn delete(&self, call_id: &str) -> SessionResult<bool>;

    /// Drop sessions idle for longer than `ttl`; returns how many went
    async fn purge_expired(&self, ttl: Duration) -> SessionResult<usize>;

    fn backend_name(&self) -> &'static str;

    async fn health_check(&self) -> bool {
        true
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Single-node store; every webhook for a call must reach this process
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, DialogueSession>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_or_create(&self, seed: SessionSeed) -> SessionResult<DialogueSession> {
        let entry = self
            .sessions
            .entry(seed.call_id.clone())
            .or_insert_with(|| DialogueSession::new(seed));
        Ok(entry.value().clone())
    }

    async fn get(&self, call_id: &str) -> SessionResult<Option<DialogueSession>> {
        Ok(self.sessions.get(call_id).map(|s| s.value().clone()))
    }

    async fn update(&self, mut session: DialogueSession) -> SessionResult<()> {
        match self.sessions.get_mut(&session.call_id) {
            Some(mut slot) => {
                session.touch();
                *slot = session;
                Ok(())
            }
            None => Err(SessionError::NotFound(session.call_id)),
        }
    }

    async fn delete(&self, call_id: &str) -> SessionResult<bool> {
        Ok(self.sessions.remove(call_id).is_some())
    }

    async fn purge_expired(&self, ttl: Duration) -> SessionResult<usize> {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now().checked_sub_signed(ttl);
        let Some(cutoff) = cutoff else {
            return Ok(0);
        };

        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.updated_at >= cutoff);
        Ok(before.saturating_sub(self.sessions.len()))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

// ============================================================================
// Redis store
// ============================================================================

const KEY_PREFIX: &str = "mediconnect:session:";

/// Shared store for multi-node deployments; Redis expiry bounds leaked sessions
#[derive(Clone)]
pub struct RedisSessionStore {
    redis: ConnectionManager,
    ttl_secs: u64,
}

impl RedisSessionStore {
    pub async fn connect(redis_url: &str, ttl: Duration) -> SessionResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;
        info!("Connected to Redis session store");
        Ok(Self {
            redis,
            ttl_secs: ttl.as_secs().max(1),
        })
    }

    fn key(call_id: &str) -> String {
        format!("{KEY_PREFIX}{call_id}")
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get_or_create(&self, seed: SessionSeed) -> SessionResult<DialogueSession> {
        let key = Self::key(&seed.call_id);
        let fresh = DialogueSession::new(seed);
        let json = serde_json::to_string(&fresh)?;

        let mut conn = self.redis.clone();
        let created: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(json)
            .arg("NX")
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async(&mut conn)
            .await?;
        if created.is_some() {
            return Ok(fresh);
        }

        // Lost the NX race to an earlier webhook for the same call
        let existing: Option<String> = conn.get(&key).await?;
        match existing {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(fresh),
        }
    }

    async fn get(&self, call_id: &str) -> SessionResult<Option<DialogueSession>> {
        let mut conn = self.redis.clone();
        let json: Option<String> = conn.get(Self::key(call_id)).await?;
        json.map(|j| serde_json::from_str(&j))
            .transpose()
            .map_err(SessionError::from)
    }

    async fn update(&self, mut session: DialogueSession) -> SessionResult<()> {
        session.touch();
        let json = serde_json::to_string(&session)?;

        let mut conn = self.redis.clone();
        // XX: only overwrite a live session, never resurrect a deleted one
        let written: Option<String> = redis::cmd("SET")
            .arg(Self::key(&session.call_id))
            .arg(json)
            .arg("XX")
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async(&mut conn)
            .await?;
        match written {
            Some(_) => Ok(()),
            None => Err(SessionError::NotFound(session.call_id)),
        }
    }

    async fn delete(&self, call_id: &str) -> SessionResult<bool> {
        let mut conn = self.redis.clone();
        let removed: i64 = conn.del(Self::key(call_id)).await?;
        Ok(removed > 0)
    }

    async fn purge_expired(&self, _ttl: Duration) -> SessionResult<usize> {
        // Keys carry their own expiry
        Ok(0)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.redis.clone();
        match redis::cmd("PING").query_async::<_, String>(&mut conn).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Redis session store health check failed");
                false
            }
        }
    }
}

/// Periodically drop sessions whose call-end callback never arrived
pub fn spawn_purge_task(
    store: Arc<dyn SessionStore>,
    ttl: Duration,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match store.purge_expired(ttl).await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "Purged abandoned dialogue sessions"),
                Err(e) => warn!(error = %e, "Session purge failed"),
            }
            debug!(backend = store.backend_name(), "Session purge pass finished");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DialogueState;
    use schedule_store::Language;

    fn seed(call_id: &str) -> SessionSeed {
        SessionSeed {
            call_id: call_id.into(),
            hospital_id: None,
            hospital_name: None,
            caller_number: "9876543210".into(),
            language: Language::English,
        }
    }

    #[tokio::test]
    async fn get_or_create_returns_the_same_session() {
        let store = InMemorySessionStore::new();
        let mut first = store.get_or_create(seed("CA1")).await.unwrap();
        first.transition(DialogueState::Listening);
        store.update(first).await.unwrap();

        let again = store.get_or_create(seed("CA1")).await.unwrap();
        assert_eq!(again.state, DialogueState::Listening);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn update_after_delete_does_not_resurrect() {
        let store = InMemorySessionStore::new();
        let session = store.get_or_create(seed("CA2")).await.unwrap();
        assert!(store.delete("CA2").await.unwrap());

        let err = store.update(session).await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound(id) if id == "CA2"));
        assert!(store.get("CA2").await.unwrap().is_none());
        assert!(!store.delete("CA2").await.unwrap());
    }

    #[tokio::test]
    async fn purge_drops_only_idle_sessions() {
        let store = InMemorySessionStore::new();
        let mut stale = store.get_or_create(seed("old")).await.unwrap();
        store.get_or_create(seed("new")).await.unwrap();

        stale.updated_at = Utc::now() - chrono::Duration::hours(2);
        store.sessions.insert("old".into(), stale);

        let purged = store.purge_expired(Duration::from_secs(1800)).await.unwrap();
        assert_eq!(purged, 1);
        assert!(store.get("old").await.unwrap().is_none());
        assert!(store.get("new").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn purge_task_runs_on_its_interval() {
        let store = Arc::new(InMemorySessionStore::new());
        let mut stale = store.get_or_create(seed("old")).await.unwrap();
        stale.updated_at = Utc::now() - chrono::Duration::hours(2);
        store.sessions.insert("old".into(), stale);

        let handle = spawn_purge_task(
            store.clone(),
            Duration::from_secs(1800),
            Duration::from_secs(60),
        );
        tokio::time::sleep(Duration::from_secs(61)).await;
        handle.abort();

        assert!(store.is_empty());
    }
}
