use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use adportal_core::Entity;

/// Keyed record store with a serial id sequence.
///
/// Records are returned in id order. Ids come from [`EntityStore::next_id`]
/// and are never reused, even after a removal.
pub trait EntityStore<T: Entity>: Send + Sync {
    fn next_id(&self) -> T::Id;
    fn get(&self, id: T::Id) -> Option<T>;
    fn upsert(&self, record: T);
    fn remove(&self, id: T::Id) -> Option<T>;
    fn list(&self) -> Vec<T>;
}

impl<T, S> EntityStore<T> for Arc<S>
where
    T: Entity,
    S: EntityStore<T> + ?Sized,
{
    fn next_id(&self) -> T::Id {
        (**self).next_id()
    }

    fn get(&self, id: T::Id) -> Option<T> {
        (**self).get(id)
    }

    fn upsert(&self, record: T) {
        (**self).upsert(record)
    }

    fn remove(&self, id: T::Id) -> Option<T> {
        (**self).remove(id)
    }

    fn list(&self) -> Vec<T> {
        (**self).list()
    }
}

/// In-memory entity store.
#[derive(Debug)]
pub struct InMemoryEntityStore<T: Entity> {
    inner: RwLock<BTreeMap<T::Id, T>>,
    sequence: AtomicI64,
}

impl<T: Entity> InMemoryEntityStore<T> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
            sequence: AtomicI64::new(0),
        }
    }

    /// Records matching `pred`, in id order.
    pub fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T>
    where
        T: Clone,
    {
        match self.inner.read() {
            Ok(map) => map.values().filter(|r| pred(r)).cloned().collect(),
            Err(_) => vec![],
        }
    }
}

impl<T: Entity> Default for InMemoryEntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EntityStore<T> for InMemoryEntityStore<T>
where
    T: Entity + Clone + Send + Sync + 'static,
    T::Id: From<i64> + Into<i64> + Send + Sync,
{
    fn next_id(&self) -> T::Id {
        T::Id::from(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn get(&self, id: T::Id) -> Option<T> {
        let map = self.inner.read().ok()?;
        map.get(&id).cloned()
    }

    fn upsert(&self, record: T) {
        let id = record.id();
        // Records inserted with an explicit id must not collide with later allocations.
        self.sequence.fetch_max(id.into(), Ordering::SeqCst);
        if let Ok(mut map) = self.inner.write() {
            map.insert(id, record);
        }
    }

    fn remove(&self, id: T::Id) -> Option<T> {
        self.inner.write().ok()?.remove(&id)
    }

    fn list(&self) -> Vec<T> {
        match self.inner.read() {
            Ok(map) => map.values().cloned().collect(),
            Err(_) => vec![],
        }
    }
}
