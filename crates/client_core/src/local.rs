//! In-process backend used when no document store is configured.

use std::sync::Arc;

use async_trait::async_trait;
use shared::domain::{Item, ItemDraft, ItemId, PrincipalId};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::{
    clock::Clock,
    error::StoreError,
    store::{BackendMode, ItemStore, Snapshot, SnapshotEvent, Subscription, WriteAck},
};

const MOCK_ITEMS: &[(&str, u32, bool)] = &[
    ("Leite", 2, true),
    ("Pão de Forma", 1, false),
    ("Ovos", 12, false),
];

pub struct LocalStore {
    clock: Arc<dyn Clock>,
    inner: Mutex<LocalState>,
}

struct LocalState {
    items: Vec<Item>,
    next_id: i64,
    revision: u64,
    subscriber: Option<mpsc::UnboundedSender<SnapshotEvent>>,
}

impl LocalState {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            revision: self.revision,
            items: self.items.clone(),
        }
    }

    /// Bumps the revision and pushes the full set to the live subscriber.
    fn commit(&mut self) -> u64 {
        self.revision += 1;
        let event = SnapshotEvent::Snapshot(self.snapshot());
        if let Some(tx) = &self.subscriber {
            if tx.send(event).is_err() {
                debug!("local store: subscriber went away");
                self.subscriber = None;
            }
        }
        self.revision
    }
}

impl LocalStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_items(Vec::new(), clock)
    }

    /// Seeds the store. Fresh ids are allocated above the highest numeric id
    /// present in `items`.
    pub fn with_items(items: Vec<Item>, clock: Arc<dyn Clock>) -> Self {
        let highest = items
            .iter()
            .filter_map(|item| match item.id {
                ItemId::Local(id) => Some(id),
                ItemId::Remote(_) => None,
            })
            .max()
            .unwrap_or(0);
        Self {
            clock,
            inner: Mutex::new(LocalState {
                items,
                next_id: highest + 1,
                revision: 0,
                subscriber: None,
            }),
        }
    }

    pub fn with_mock_data(clock: Arc<dyn Clock>) -> Self {
        let now = clock.now_millis();
        let items = MOCK_ITEMS
            .iter()
            .enumerate()
            .map(|(idx, (name, quantity, is_purchased))| Item {
                id: ItemId::Local(idx as i64 + 1),
                name: (*name).to_string(),
                quantity: *quantity,
                price: 0.0,
                is_purchased: *is_purchased,
                created_at: now - 60_000 * (MOCK_ITEMS.len() - idx) as i64,
                owner_id: PrincipalId::local(),
            })
            .collect();
        Self::with_items(items, clock)
    }

    pub async fn items(&self) -> Vec<Item> {
        self.inner.lock().await.items.clone()
    }
}

#[async_trait]
impl ItemStore for LocalStore {
    fn mode(&self) -> BackendMode {
        BackendMode::Local
    }

    async fn create(&self, draft: ItemDraft) -> Result<WriteAck<Item>, StoreError> {
        let draft = draft.validate()?;
        let now = self.clock.now_millis();
        let mut state = self.inner.lock().await;
        let id = ItemId::Local(state.next_id);
        state.next_id += 1;
        let item = Item::from_document(id, draft.into_document(now));
        state.items.push(item.clone());
        debug!(item_id = %item.id, "local store: item created");
        let revision = state.commit();
        Ok(WriteAck::new(item, Some(revision)))
    }

    async fn toggle(&self, id: &ItemId) -> Result<WriteAck, StoreError> {
        let mut state = self.inner.lock().await;
        let Some(item) = state.items.iter_mut().find(|item| &item.id == id) else {
            debug!(item_id = %id, "local store: toggle target absent");
            return Ok(WriteAck::unchanged());
        };
        item.is_purchased = !item.is_purchased;
        let revision = state.commit();
        Ok(WriteAck::new((), Some(revision)))
    }

    async fn delete(&self, id: &ItemId) -> Result<WriteAck, StoreError> {
        let mut state = self.inner.lock().await;
        let before = state.items.len();
        state.items.retain(|item| &item.id != id);
        if state.items.len() == before {
            debug!(item_id = %id, "local store: delete target absent");
            return Ok(WriteAck::unchanged());
        }
        let revision = state.commit();
        Ok(WriteAck::new((), Some(revision)))
    }

    async fn subscribe(&self) -> Result<Subscription, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.inner.lock().await;
        // The receiver is still alive here, so the send cannot fail.
        let _ = tx.send(SnapshotEvent::Snapshot(state.snapshot()));
        state.subscriber = Some(tx);
        Ok(Subscription::new(rx))
    }
}

#[cfg(test)]
#[path = "tests/local_tests.rs"]
mod tests;
