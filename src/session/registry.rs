//! Concurrency-safe registry of live controller sessions.
//!
//! Two indexes (id to session, name to id) live under a single async gate.
//! Guard drop releases the gate exactly once on every path, found or not, and
//! a caller whose future is dropped while waiting leaves no side effects.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::session::controller::ControllerSession;

/// How a caller names an instance: by numeric id or by name.
///
/// `Id(0)` and blank names are the unset sentinels; they match nothing and are
/// answered without taking the gate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstanceSelector {
    Id(u32),
    Name(String),
}

impl std::fmt::Display for InstanceSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstanceSelector::Id(id) => write!(f, "id {id}"),
            InstanceSelector::Name(name) => write!(f, "name '{name}'"),
        }
    }
}

#[derive(Default)]
struct Indexes {
    by_id: HashMap<u32, Arc<ControllerSession>>,
    by_name: HashMap<String, u32>,
}

/// The shared session table. No two live entries ever share an id or a name.
#[derive(Default)]
pub struct InstanceRegistry {
    inner: Mutex<Indexes>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session. Returns false without mutating anything when the id
    /// or the name collides with a live entry; concurrent colliding adds are
    /// ordered by the gate, so exactly one wins.
    pub async fn add(&self, session: Arc<ControllerSession>) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.by_id.contains_key(&session.id()) || inner.by_name.contains_key(session.name()) {
            return false;
        }
        inner.by_name.insert(session.name().to_string(), session.id());
        inner.by_id.insert(session.id(), session);
        true
    }

    pub async fn find_by_id(&self, id: u32) -> Option<Arc<ControllerSession>> {
        if id == 0 {
            return None;
        }
        self.inner.lock().await.by_id.get(&id).cloned()
    }

    pub async fn find_by_name(&self, name: &str) -> Option<Arc<ControllerSession>> {
        if name.trim().is_empty() {
            return None;
        }
        let inner = self.inner.lock().await;
        let id = inner.by_name.get(name)?;
        inner.by_id.get(id).cloned()
    }

    pub async fn resolve(&self, selector: &InstanceSelector) -> Option<Arc<ControllerSession>> {
        match selector {
            InstanceSelector::Id(id) => self.find_by_id(*id).await,
            InstanceSelector::Name(name) => self.find_by_name(name).await,
        }
    }

    /// Remove both index entries and hand the session back to the caller.
    pub async fn remove(&self, selector: &InstanceSelector) -> Option<Arc<ControllerSession>> {
        let mut inner = self.inner.lock().await;
        let id = match selector {
            InstanceSelector::Id(0) => return None,
            InstanceSelector::Id(id) => *id,
            InstanceSelector::Name(name) => {
                if name.trim().is_empty() {
                    return None;
                }
                *inner.by_name.get(name)?
            }
        };
        let session = inner.by_id.remove(&id)?;
        inner.by_name.remove(session.name());
        Some(session)
    }

    /// Consistent (id, name) listing taken under the gate.
    pub async fn snapshot(&self) -> Vec<(u32, String)> {
        let inner = self.inner.lock().await;
        let mut entries: Vec<_> = inner
            .by_id
            .values()
            .map(|s| (s.id(), s.name().to_string()))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }
}
