use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    credentials::{self, Credential, CredentialSource},
    models::{Condition, ItemPhoto, Platform},
    presenter::Presentation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Idle,
    Ready,
    Pending,
    Displayed,
    ErrorDisplayed,
}

/// One user's form state. Created on session start and dropped on session end.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub status: Status,
    pub condition: Condition,
    pub platform: Platform,
    pub photo: Option<ItemPhoto>,
    /// Sticky once set.
    pub use_custom_key: bool,
    pub typed_key: Option<String>,
    pub last_result: Option<Presentation>,
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            last_active: now,
            status: Status::Idle,
            condition: Condition::default(),
            platform: Platform::default(),
            photo: None,
            use_custom_key: false,
            typed_key: None,
            last_result: None,
        }
    }

    fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    pub fn upload(&mut self, photo: ItemPhoto) {
        self.photo = Some(photo);
        self.last_result = None;
        if self.status != Status::Pending {
            self.status = Status::Ready;
        }
        self.touch();
    }

    pub fn select(&mut self, condition: Option<Condition>, platform: Option<Platform>) {
        if let Some(condition) = condition {
            self.condition = condition;
        }
        if let Some(platform) = platform {
            self.platform = platform;
        }
        self.touch();
    }

    pub fn request_override(&mut self) {
        self.use_custom_key = true;
        self.touch();
    }

    pub fn set_typed_key(&mut self, key: String) {
        self.typed_key = Some(key);
        self.touch();
    }

    pub fn credential(&self, stored: Option<&str>) -> Option<(Credential, CredentialSource)> {
        credentials::resolve(stored, self.use_custom_key, self.typed_key.as_deref())
    }

    /// Which control the sidebar should show.
    pub fn key_source(&self, stored: Option<&str>) -> CredentialSource {
        let stored_present = stored.is_some_and(|s| !s.trim().is_empty());
        if stored_present && !self.use_custom_key {
            CredentialSource::Stored
        } else {
            CredentialSource::UserSupplied
        }
    }

    pub fn start_generation(&mut self) {
        self.status = Status::Pending;
        self.touch();
    }

    pub fn finish(&mut self, presentation: Presentation) {
        self.status = if presentation.is_success() { Status::Displayed } else { Status::ErrorDisplayed };
        self.last_result = Some(presentation);
        self.touch();
    }

    pub fn view(&self, stored: Option<&str>) -> SessionView {
        SessionView {
            id: self.id,
            created_at: self.created_at,
            status: self.status,
            condition: self.condition,
            platform: self.platform.clone(),
            photo: self.photo.as_ref().map(|p| PhotoView {
                file_name: p.file_name.clone(),
                mime_type: p.mime_type.clone(),
                width: p.width,
                height: p.height,
                data_url: p.data_url(),
            }),
            key_source: self.key_source(stored),
            has_typed_key: self.typed_key.as_deref().is_some_and(|k| !k.trim().is_empty()),
            result: self.last_result.clone(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct PhotoView {
    pub file_name: String,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub data_url: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct SessionView {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub status: Status,
    pub condition: Condition,
    pub platform: Platform,
    pub photo: Option<PhotoView>,
    pub key_source: CredentialSource,
    pub has_typed_key: bool,
    pub result: Option<Presentation>,
}

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl SessionStore {
    pub fn create(&self) -> Session {
        let session = Session::new();
        self.inner.write().insert(session.id, session.clone());
        session
    }

    pub fn get(&self, id: &Uuid) -> Option<Session> {
        self.inner.read().get(id).cloned()
    }

    /// Runs `f` against the session under the write lock.
    pub fn update<T>(&self, id: &Uuid, f: impl FnOnce(&mut Session) -> T) -> Option<T> {
        self.inner.write().get_mut(id).map(f)
    }

    pub fn end(&self, id: &Uuid) -> bool {
        self.inner.write().remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Watches a session that was just moved to `Pending`. Dropping the guard
    /// without calling [`PendingGuard::complete`] marks the attempt as failed.
    pub fn guard_pending(&self, id: Uuid) -> PendingGuard {
        PendingGuard { store: self.clone(), id, completed: false }
    }

    /// Drops sessions idle for longer than `max_idle`.
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        let Ok(max_idle) = chrono::Duration::from_std(max_idle) else {
            return 0;
        };
        let cutoff = Utc::now() - max_idle;
        let mut guard = self.inner.write();
        let before = guard.len();
        guard.retain(|_, s| s.last_active >= cutoff);
        before - guard.len()
    }
}

pub struct PendingGuard {
    store: SessionStore,
    id: Uuid,
    completed: bool,
}

impl PendingGuard {
    /// Returns `false` if the session ended while the call was in flight.
    pub fn complete(mut self, presentation: Presentation) -> bool {
        self.completed = true;
        self.store.update(&self.id, |s| s.finish(presentation)).is_some()
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        let released = self.store.update(&self.id, |s| {
            if s.status == Status::Pending {
                s.finish(Presentation::interrupted());
            }
        });
        if released.is_some() {
            warn!("⚠️ Generation for session {} was interrupted", self.id);
        }
    }
}
