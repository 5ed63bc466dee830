use std::{
    pin::Pin,
    task::{Context, Poll},
};

use async_trait::async_trait;
use futures::Stream;
use shared::domain::{Item, ItemDraft, ItemId};
use tokio::sync::mpsc;

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    Local,
    Remote,
}

/// The complete item set of a backend at one revision.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub revision: u64,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotEvent {
    Snapshot(Snapshot),
    Error(StoreError),
}

/// A write the backend accepted. `revision` is the snapshot revision that
/// first carries the write, when the backend reports one; `None` means no
/// snapshot was produced (an absent target, or a backend without revisions).
#[derive(Debug, Clone, PartialEq)]
pub struct WriteAck<T = ()> {
    pub value: T,
    pub revision: Option<u64>,
}

impl<T> WriteAck<T> {
    pub fn new(value: T, revision: Option<u64>) -> Self {
        Self { value, revision }
    }
}

impl WriteAck {
    pub fn unchanged() -> Self {
        Self::new((), None)
    }
}

/// Mutation/query contract shared by every backend.
#[async_trait]
pub trait ItemStore: Send + Sync {
    fn mode(&self) -> BackendMode;

    /// Validates and persists `draft`, returning the stored item.
    async fn create(&self, draft: ItemDraft) -> Result<WriteAck<Item>, StoreError>;

    /// Flips `is_purchased` on the item. Absent ids are either a no-op or
    /// [`StoreError::NotFound`], depending on the backend.
    async fn toggle(&self, id: &ItemId) -> Result<WriteAck, StoreError>;

    /// Removes the item. Absent ids are a no-op.
    async fn delete(&self, id: &ItemId) -> Result<WriteAck, StoreError>;

    /// Opens the live feed of full snapshots. The first event carries the
    /// current set. Only one subscription per store is expected to be live.
    async fn subscribe(&self) -> Result<Subscription, StoreError>;
}

type CancelFn = Box<dyn FnOnce() + Send>;

/// Live feed of snapshot events. Dropping it (or calling
/// [`Subscription::unsubscribe`]) releases the backend resources behind it.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<SnapshotEvent>,
    cancel: Option<CancelFn>,
}

impl Subscription {
    pub fn new(rx: mpsc::UnboundedReceiver<SnapshotEvent>) -> Self {
        Self { rx, cancel: None }
    }

    pub fn with_cancel(mut self, cancel: impl FnOnce() + Send + 'static) -> Self {
        self.cancel = Some(Box::new(cancel));
        self
    }

    pub async fn next_event(&mut self) -> Option<SnapshotEvent> {
        self.rx.recv().await
    }

    /// Returns an already delivered event without waiting.
    pub fn try_next_event(&mut self) -> Option<SnapshotEvent> {
        self.rx.try_recv().ok()
    }

    pub fn unsubscribe(self) {}
}

impl Stream for Subscription {
    type Item = SnapshotEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.rx.close();
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}
