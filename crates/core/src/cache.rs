use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Injected cache port. Lifecycle is explicit: the owning service decides
/// the TTL and the write-side collaborators call `invalidate`; nothing
/// observes writes implicitly. Reads are non-linearizable: a reader in
/// another process may see a stale value until TTL expiry or explicit
/// invalidation, and that is accepted.
pub trait TtlCache<V: Clone + Send + Sync>: Send + Sync {
    fn get(&self, key: &str) -> Option<V>;
    fn put(&self, key: &str, value: V, ttl: Duration);
    fn invalidate(&self, key: &str);
    fn invalidate_all(&self);
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Process-local cache backing the default deployment.
pub struct MemoryTtlCache<V> {
    entries: Mutex<HashMap<String, Entry<V>>>,
}

impl<V> Default for MemoryTtlCache<V> {
    fn default() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }
}

impl<V> MemoryTtlCache<V> {
    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry<V>>> {
        // A poisoned map still holds valid entries; keep serving them.
        match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<V: Clone + Send + Sync> TtlCache<V> for MemoryTtlCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: &str, value: V, ttl: Duration) {
        self.entries().insert(key.to_string(), Entry { value, expires_at: Instant::now() + ttl });
    }

    fn invalidate(&self, key: &str) {
        self.entries().remove(key);
    }

    fn invalidate_all(&self) {
        self.entries().clear();
    }
}
