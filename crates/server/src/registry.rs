//! Active session lookup.
//!
//! The registry maps session ids to live sessions. It never touches a
//! session's counter; it only resolves ids for the tracker's commands.

use std::collections::HashMap;
use std::sync::Arc;

use motion::ProfileRegistry;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::error::{Result, TrackerError};
use crate::session::{SessionId, TrackingSession};

#[derive(Debug)]
pub struct SessionRegistry {
    profiles: Arc<ProfileRegistry>,
    config: SessionConfig,
    sessions: RwLock<HashMap<SessionId, Arc<TrackingSession>>>,
}

impl SessionRegistry {
    pub fn new(profiles: Arc<ProfileRegistry>, config: SessionConfig) -> Self {
        Self {
            profiles,
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve `exercise` and register a new session under `id`.
    ///
    /// Nothing is registered when the exercise is unknown.
    pub fn create(&self, id: SessionId, exercise: &str) -> Result<Arc<TrackingSession>> {
        let profile = self.profiles.lookup(exercise).map_err(|e| {
            warn!("Rejected session start: {}", e);
            TrackerError::UnknownExercise(exercise.to_string())
        })?;

        let mut sessions = self.sessions.write();
        if sessions.contains_key(&id) {
            return Err(TrackerError::DuplicateSession(id));
        }
        let session = Arc::new(TrackingSession::new(id, profile, &self.config));
        sessions.insert(id, Arc::clone(&session));
        debug!(session = %id, exercise, active = sessions.len(), "Session registered");
        Ok(session)
    }

    pub fn get(&self, id: SessionId) -> Result<Arc<TrackingSession>> {
        self.sessions
            .read()
            .get(&id)
            .cloned()
            .ok_or(TrackerError::UnknownSession(id))
    }

    /// Unregister a session; the session itself stays alive while referenced
    pub fn remove(&self, id: SessionId) -> Result<Arc<TrackingSession>> {
        let removed = self.sessions.write().remove(&id);
        removed.ok_or(TrackerError::UnknownSession(id))
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    pub fn profiles(&self) -> &Arc<ProfileRegistry> {
        &self.profiles
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}
