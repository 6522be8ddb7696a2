//! Registry of per-job broadcasters

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use super::broadcaster::ProgressBroadcaster;

/// Maps job ids to their broadcasters. Entries are registered at
/// submission and removed after the terminal snapshot is published; from
/// then on observers are served from the durable job record instead.
#[derive(Default)]
pub struct ProgressHub {
    inner: RwLock<HashMap<Uuid, Arc<ProgressBroadcaster>>>,
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, job_id: Uuid) -> Arc<ProgressBroadcaster> {
        let broadcaster = Arc::new(ProgressBroadcaster::default());
        self.inner
            .write()
            .unwrap()
            .insert(job_id, broadcaster.clone());
        broadcaster
    }

    pub fn get(&self, job_id: Uuid) -> Option<Arc<ProgressBroadcaster>> {
        self.inner.read().unwrap().get(&job_id).cloned()
    }

    pub fn remove(&self, job_id: Uuid) {
        self.inner.write().unwrap().remove(&job_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let hub = ProgressHub::new();
        let job_id = Uuid::new_v4();
        let broadcaster = hub.register(job_id);

        let fetched = hub.get(job_id).unwrap();
        assert!(Arc::ptr_eq(&broadcaster, &fetched));
    }

    #[test]
    fn test_remove_clears_entry() {
        let hub = ProgressHub::new();
        let job_id = Uuid::new_v4();
        hub.register(job_id);
        hub.remove(job_id);
        assert!(hub.get(job_id).is_none());
    }

    #[test]
    fn test_unknown_job_is_none() {
        let hub = ProgressHub::new();
        assert!(hub.get(Uuid::new_v4()).is_none());
    }
}
