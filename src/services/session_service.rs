use async_trait::async_trait;
use moka::future::Cache;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{error, info};

use crate::clients::app_service_client::AppServiceClient;
use crate::models::DocError;

/// The learning-session service, as seen by the document core
#[async_trait]
pub trait SessionDirectory: Send + Sync {
    async fn session_exists(&self, session_id: i64) -> Result<bool, DocError>;

    async fn is_authorized(&self, user_id: &str, session_id: i64) -> Result<bool, DocError>;
}

/// Fail with `SessionNotFound` or `Forbidden` unless the user may use the session.
pub async fn ensure_session_access(
    sessions: &dyn SessionDirectory,
    user_id: &str,
    session_id: i64,
) -> Result<(), DocError> {
    if !sessions.session_exists(session_id).await? {
        return Err(DocError::SessionNotFound(session_id));
    }
    if !sessions.is_authorized(user_id, session_id).await? {
        return Err(DocError::Forbidden(session_id));
    }
    Ok(())
}

/// Session directory backed by the app service, with answers cached briefly
pub struct HttpSessionDirectory {
    client: AppServiceClient,
    sessions: Cache<i64, bool>,
    participants: Cache<(i64, String), bool>,
}

impl HttpSessionDirectory {
    pub fn new(client: AppServiceClient, ttl: Duration) -> Self {
        let sessions = Cache::builder()
            .max_capacity(100_000)
            .time_to_live(ttl)
            .build();
        let participants = Cache::builder()
            .max_capacity(100_000)
            .time_to_live(ttl)
            .build();
        info!("Session directory cache initialized (ttl {:?})", ttl);
        Self { client, sessions, participants }
    }
}

#[async_trait]
impl SessionDirectory for HttpSessionDirectory {
    async fn session_exists(&self, session_id: i64) -> Result<bool, DocError> {
        if let Some(exists) = self.sessions.get(&session_id).await {
            return Ok(exists);
        }

        info!("Session cache miss for {}. Asking app service.", session_id);
        let exists = self.client.session_exists(session_id).await.map_err(|e| {
            error!("Failed to look up session {}: {}", session_id, e);
            DocError::SessionLookup(e.to_string())
        })?;

        self.sessions.insert(session_id, exists).await;
        Ok(exists)
    }

    async fn is_authorized(&self, user_id: &str, session_id: i64) -> Result<bool, DocError> {
        let key = (session_id, user_id.to_string());
        if let Some(allowed) = self.participants.get(&key).await {
            return Ok(allowed);
        }

        let allowed = self.client.is_participant(session_id, user_id).await.map_err(|e| {
            error!("Failed to check participant {} of session {}: {}", user_id, session_id, e);
            DocError::SessionLookup(e.to_string())
        })?;

        self.participants.insert(key, allowed).await;
        Ok(allowed)
    }
}

/// Fixed session table. `open()` accepts every session and user.
pub struct StaticSessionDirectory {
    sessions: Option<HashMap<i64, HashSet<String>>>,
}

impl StaticSessionDirectory {
    pub fn open() -> Self {
        Self { sessions: None }
    }

    pub fn new() -> Self {
        Self { sessions: Some(HashMap::new()) }
    }

    pub fn with_session<I, S>(mut self, session_id: i64, participants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sessions
            .get_or_insert_with(HashMap::new)
            .insert(session_id, participants.into_iter().map(Into::into).collect());
        self
    }
}

#[async_trait]
impl SessionDirectory for StaticSessionDirectory {
    async fn session_exists(&self, session_id: i64) -> Result<bool, DocError> {
        Ok(match &self.sessions {
            None => true,
            Some(table) => table.contains_key(&session_id),
        })
    }

    async fn is_authorized(&self, user_id: &str, session_id: i64) -> Result<bool, DocError> {
        Ok(match &self.sessions {
            None => true,
            Some(table) => table
                .get(&session_id)
                .map_or(false, |users| users.contains(user_id)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_directory_checks_membership() {
        let sessions = StaticSessionDirectory::new().with_session(42, ["ada", "alan"]);
        assert!(ensure_session_access(&sessions, "ada", 42).await.is_ok());
        assert!(matches!(
            ensure_session_access(&sessions, "eve", 42).await,
            Err(DocError::Forbidden(42))
        ));
        assert!(matches!(
            ensure_session_access(&sessions, "ada", 7).await,
            Err(DocError::SessionNotFound(7))
        ));
    }

    #[tokio::test]
    async fn open_directory_allows_everything() {
        let sessions = StaticSessionDirectory::open();
        assert!(sessions.session_exists(123).await.unwrap());
        assert!(sessions.is_authorized("anyone", 123).await.unwrap());
    }

    #[tokio::test]
    async fn unreachable_app_service_is_a_lookup_failure() {
        // Nothing listens on port 9 locally
        let client = AppServiceClient::new(
            "http://127.0.0.1:9".to_string(),
            "secret".to_string(),
            "session-doc".to_string(),
        )
        .unwrap();
        let sessions = HttpSessionDirectory::new(client, Duration::from_secs(60));
        let err = sessions.session_exists(1).await.unwrap_err();
        assert!(matches!(err, DocError::SessionLookup(_)));
        assert!(err.is_retryable());
    }
}
