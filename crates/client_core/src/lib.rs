use std::{collections::HashMap, fmt, str::FromStr, sync::Arc, task::Poll};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use shared::domain::{Item, ItemId, ItemPatch, NewItem};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

pub mod config;
pub mod error;
pub mod gateway;

pub use config::Settings;
pub use error::StoreError;
pub use gateway::{GraphqlItemGateway, ItemGateway};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How local state is reconciled with the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPolicy {
    /// Merge toggles after the backend confirms; roll back failed creates.
    #[default]
    Confirmed,
    /// Apply before confirmation; failed writes stay applied locally.
    Optimistic,
}

impl SyncPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Optimistic => "optimistic",
        }
    }
}

impl fmt::Display for SyncPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncPolicy {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "confirmed" => Ok(Self::Confirmed),
            "optimistic" => Ok(Self::Optimistic),
            other => Err(format!(
                "unknown sync policy '{other}' (expected 'confirmed' or 'optimistic')"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub enum StoreEvent {
    ItemsLoaded { count: usize },
    ItemCreated { item: Item },
    ItemUpdated { item: Item },
    Error(String),
}

/// Identifies a local entry independently of its (possibly unset) backend id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LocalKey(u64);

#[derive(Debug, Clone)]
struct Entry {
    key: LocalKey,
    item: Item,
}

#[derive(Default)]
struct StoreState {
    entries: Vec<Entry>,
    next_key: u64,
}

impl StoreState {
    fn allocate_key(&mut self) -> LocalKey {
        self.next_key += 1;
        LocalKey(self.next_key)
    }

    fn push(&mut self, item: Item) -> LocalKey {
        let key = self.allocate_key();
        self.entries.push(Entry { key, item });
        key
    }

    fn replace_all(&mut self, items: Vec<Item>) {
        self.entries.clear();
        for item in items {
            self.push(item);
        }
    }

    fn find(&self, id: &ItemId) -> Option<&Item> {
        self.entries
            .iter()
            .map(|entry| &entry.item)
            .find(|item| item.has_id(id))
    }

    fn replace_key(&mut self, key: LocalKey, item: Item) -> bool {
        match self.entries.iter_mut().find(|entry| entry.key == key) {
            Some(entry) => {
                entry.item = item;
                true
            }
            None => false,
        }
    }

    fn remove_key(&mut self, key: LocalKey) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.key != key);
        self.entries.len() != before
    }

    fn set_completed(&mut self, id: &ItemId, completed: bool) {
        for entry in self.entries.iter_mut().filter(|entry| entry.item.has_id(id)) {
            entry.item.completed = completed;
        }
    }

    fn replace_matching(&mut self, id: &ItemId, item: &Item) -> usize {
        let mut replaced = 0;
        for entry in self.entries.iter_mut().filter(|entry| entry.item.has_id(id)) {
            entry.item = item.clone();
            replaced += 1;
        }
        replaced
    }
}

/// In-memory, insertion-ordered view of the backend's items that applies
/// writes locally ahead of the backend.
///
/// Failures are logged, broadcast as [`StoreEvent::Error`] and returned as
/// [`StoreError`]; nothing is retried.
pub struct OptimisticItemStore {
    gateway: Arc<dyn ItemGateway>,
    policy: SyncPolicy,
    inner: Mutex<StoreState>,
    item_locks: Mutex<HashMap<ItemId, Arc<Mutex<()>>>>,
    events: broadcast::Sender<StoreEvent>,
}

impl OptimisticItemStore {
    pub fn new(gateway: Arc<dyn ItemGateway>) -> Arc<Self> {
        Self::with_policy(gateway, SyncPolicy::default())
    }

    pub fn with_policy(gateway: Arc<dyn ItemGateway>, policy: SyncPolicy) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            gateway,
            policy,
            inner: Mutex::new(StoreState::default()),
            item_locks: Mutex::new(HashMap::new()),
            events,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Arc<Self>> {
        let gateway = GraphqlItemGateway::new(settings)?;
        Ok(Self::with_policy(Arc::new(gateway), settings.sync_policy))
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> Vec<Item> {
        let guard = self.inner.lock().await;
        guard.entries.iter().map(|entry| entry.item.clone()).collect()
    }

    pub async fn get(&self, id: &ItemId) -> Option<Item> {
        self.inner.lock().await.find(id).cloned()
    }

    /// Replaces local state with the backend's collection, dropping any
    /// unconfirmed local items.
    pub async fn load(&self) -> std::result::Result<usize, StoreError> {
        match self.gateway.list_items().await {
            Ok(items) => {
                let count = items.len();
                self.inner.lock().await.replace_all(items);
                info!(count, "store: loaded items");
                let _ = self.events.send(StoreEvent::ItemsLoaded { count });
                Ok(count)
            }
            Err(source) => Err(self.fail(StoreError::Fetch { source })),
        }
    }

    /// Returns `Ok(None)` without touching anything when either field is
    /// empty.
    pub async fn create(
        &self,
        name: &str,
        description: &str,
    ) -> std::result::Result<Option<Item>, StoreError> {
        let Some(input) = NewItem::new(name, description) else {
            debug!("store: skipping create with an empty name or description");
            return Ok(None);
        };

        let key = self.inner.lock().await.push(input.to_pending_item());
        debug!(name = %input.name, "store: appended unconfirmed item");

        match self.gateway.create_item(input.clone()).await {
            Ok(created) => {
                if !self.inner.lock().await.replace_key(key, created.clone()) {
                    debug!(
                        item_id = ?created.id,
                        "store: created item is no longer tracked locally; next load picks it up"
                    );
                }
                info!(item_id = ?created.id, "store: item created");
                let _ = self.events.send(StoreEvent::ItemCreated {
                    item: created.clone(),
                });
                Ok(Some(created))
            }
            Err(source) => {
                if self.policy == SyncPolicy::Confirmed
                    && self.inner.lock().await.remove_key(key)
                {
                    debug!(name = %input.name, "store: rolled back unconfirmed item");
                }
                Err(self.fail(StoreError::Create {
                    name: input.name,
                    source,
                }))
            }
        }
    }

    /// Flips `completed` on the item with `id`. Toggles on the same id are
    /// serialized so concurrent callers never lose an update.
    pub async fn toggle(&self, id: &ItemId) -> std::result::Result<Item, StoreError> {
        let lock = self.item_lock(id).await;
        let result = {
            let _serialized = lock.lock().await;
            self.toggle_serialized(id).await
        };
        self.release_item_lock(id, lock).await;
        result
    }

    async fn toggle_serialized(&self, id: &ItemId) -> std::result::Result<Item, StoreError> {
        let current = self.inner.lock().await.find(id).map(|item| item.completed);
        let Some(current) = current else {
            return Err(self.fail(StoreError::NotFound { id: id.clone() }));
        };

        let completed = !current;
        let patch = ItemPatch {
            id: id.clone(),
            completed,
        };

        let outcome = match self.policy {
            SyncPolicy::Confirmed => self.gateway.update_item(patch).await,
            SyncPolicy::Optimistic => {
                // Drive the write to its first suspension point so the request
                // is on its way before the local merge.
                let mut request = self.gateway.update_item(patch);
                let first_poll = futures::poll!(&mut request);
                self.inner.lock().await.set_completed(id, completed);
                match first_poll {
                    Poll::Ready(outcome) => outcome,
                    Poll::Pending => request.await,
                }
            }
        };

        match outcome {
            Ok(updated) => {
                let replaced = self.inner.lock().await.replace_matching(id, &updated);
                if replaced == 0 {
                    debug!(item_id = %id, "store: updated item vanished locally before merge");
                }
                info!(
                    item_id = %id,
                    completed = updated.completed,
                    "store: item updated"
                );
                let _ = self.events.send(StoreEvent::ItemUpdated {
                    item: updated.clone(),
                });
                Ok(updated)
            }
            Err(source) => Err(self.fail(StoreError::Update {
                id: id.clone(),
                source,
            })),
        }
    }

    async fn item_lock(&self, id: &ItemId) -> Arc<Mutex<()>> {
        let mut locks = self.item_locks.lock().await;
        Arc::clone(locks.entry(id.clone()).or_default())
    }

    async fn release_item_lock(&self, id: &ItemId, lock: Arc<Mutex<()>>) {
        let mut locks = self.item_locks.lock().await;
        // Held only by the map and `lock`: no other toggle is queued.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(id);
        }
    }

    fn fail(&self, err: StoreError) -> StoreError {
        warn!(error = %err, "store: operation failed");
        let _ = self.events.send(StoreEvent::Error(err.to_string()));
        err
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
