use super::*;
use std::sync::atomic::{AtomicI64, Ordering};

struct StepClock(AtomicI64);

impl StepClock {
    fn starting_at(millis: i64) -> Arc<Self> {
        Arc::new(Self(AtomicI64::new(millis)))
    }
}

impl Clock for StepClock {
    fn now_millis(&self) -> i64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}

fn draft(name: &str, quantity: u32) -> ItemDraft {
    ItemDraft::new(name, quantity, PrincipalId::local())
}

fn next_snapshot(subscription: &mut Subscription) -> Snapshot {
    match subscription.try_next_event() {
        Some(SnapshotEvent::Snapshot(snapshot)) => snapshot,
        other => panic!("expected a snapshot, got {other:?}"),
    }
}

#[tokio::test]
async fn subscribe_delivers_current_items_first() {
    let store = LocalStore::with_mock_data(StepClock::starting_at(1_000_000));
    let mut subscription = store.subscribe().await.expect("subscribe");

    let snapshot = next_snapshot(&mut subscription);
    assert_eq!(snapshot.revision, 0);
    let names: Vec<_> = snapshot.items.iter().map(|item| item.name.as_str()).collect();
    assert_eq!(names, vec!["Leite", "Pão de Forma", "Ovos"]);
    assert!(snapshot.items[0].is_purchased);
    assert_eq!(snapshot.items[2].quantity, 12);
    assert!(subscription.try_next_event().is_none());
}

#[tokio::test]
async fn mock_items_are_ordered_oldest_first_by_creation() {
    let store = LocalStore::with_mock_data(StepClock::starting_at(1_000_000));
    let items = store.items().await;
    assert!(items[0].created_at < items[1].created_at);
    assert!(items[1].created_at < items[2].created_at);
    assert!(items.iter().all(|item| item.owner_id == PrincipalId::local()));
}

#[tokio::test]
async fn create_assigns_next_numeric_id_and_emits() {
    let store = LocalStore::with_mock_data(StepClock::starting_at(5_000));
    let mut subscription = store.subscribe().await.expect("subscribe");
    let _ = next_snapshot(&mut subscription);

    let ack = store
        .create(draft("  Arroz ", 3).with_created_at(9_999))
        .await
        .expect("create");
    assert_eq!(ack.revision, Some(1));
    let item = ack.value;
    assert_eq!(item.id, ItemId::Local(4));
    assert_eq!(item.name, "Arroz");
    assert_eq!(item.created_at, 9_999);
    assert!(!item.is_purchased);
    assert_eq!(item.price, 0.0);

    let snapshot = next_snapshot(&mut subscription);
    assert_eq!(snapshot.revision, 1);
    assert_eq!(snapshot.items.len(), 4);
    assert!(snapshot.items.contains(&item));
}

#[tokio::test]
async fn create_without_timestamp_uses_clock() {
    let store = LocalStore::new(StepClock::starting_at(42));
    let item = store.create(draft("Café", 1)).await.expect("create").value;
    assert_eq!(item.id, ItemId::Local(1));
    assert_eq!(item.created_at, 42);
}

#[tokio::test]
async fn create_rejects_invalid_drafts_without_emitting() {
    let store = LocalStore::new(StepClock::starting_at(0));
    let mut subscription = store.subscribe().await.expect("subscribe");
    let _ = next_snapshot(&mut subscription);

    let err = store.create(draft("   ", 2)).await.expect_err("empty name");
    assert!(matches!(err, StoreError::Validation(_)));
    let err = store.create(draft("Arroz", 0)).await.expect_err("zero quantity");
    assert!(matches!(err, StoreError::Validation(_)));

    assert!(store.items().await.is_empty());
    assert!(subscription.try_next_event().is_none());
}

#[tokio::test]
async fn toggle_flips_purchase_flag_and_back() {
    let store = LocalStore::with_mock_data(StepClock::starting_at(0));
    let mut subscription = store.subscribe().await.expect("subscribe");
    let _ = next_snapshot(&mut subscription);

    store.toggle(&ItemId::Local(2)).await.expect("toggle");
    let snapshot = next_snapshot(&mut subscription);
    let bread = snapshot
        .items
        .iter()
        .find(|item| item.id == ItemId::Local(2))
        .expect("bread");
    assert!(bread.is_purchased);

    let ack = store.toggle(&ItemId::Local(2)).await.expect("toggle back");
    assert_eq!(ack.revision, Some(2));
    let snapshot = next_snapshot(&mut subscription);
    assert_eq!(snapshot.revision, 2);
    assert!(snapshot
        .items
        .iter()
        .all(|item| item.id != ItemId::Local(2) || !item.is_purchased));
}

#[tokio::test]
async fn toggle_and_delete_of_absent_id_are_silent() {
    let store = LocalStore::with_mock_data(StepClock::starting_at(0));
    let mut subscription = store.subscribe().await.expect("subscribe");
    let _ = next_snapshot(&mut subscription);

    let toggled = store.toggle(&ItemId::Local(99)).await.expect("toggle absent");
    let deleted = store.delete(&ItemId::Local(99)).await.expect("delete absent");
    assert_eq!(toggled, WriteAck::unchanged());
    assert_eq!(deleted, WriteAck::unchanged());

    assert!(subscription.try_next_event().is_none());
    assert_eq!(store.items().await.len(), 3);
}

#[tokio::test]
async fn delete_removes_item_and_emits() {
    let store = LocalStore::with_mock_data(StepClock::starting_at(0));
    let mut subscription = store.subscribe().await.expect("subscribe");
    let _ = next_snapshot(&mut subscription);

    let ack = store.delete(&ItemId::Local(1)).await.expect("delete");
    let snapshot = next_snapshot(&mut subscription);
    assert_eq!(ack.revision, Some(snapshot.revision));
    assert_eq!(snapshot.items.len(), 2);
    assert!(snapshot.items.iter().all(|item| item.name != "Leite"));
}

#[tokio::test]
async fn ids_keep_increasing_after_delete() {
    let store = LocalStore::new(StepClock::starting_at(0));
    let first = store.create(draft("A", 1)).await.expect("create a").value;
    store.delete(&first.id).await.expect("delete a");
    let second = store.create(draft("B", 1)).await.expect("create b").value;
    assert_eq!(first.id, ItemId::Local(1));
    assert_eq!(second.id, ItemId::Local(2));
}

#[tokio::test]
async fn writes_after_subscription_dropped_still_apply() {
    let store = LocalStore::new(StepClock::starting_at(0));
    let subscription = store.subscribe().await.expect("subscribe");
    subscription.unsubscribe();

    store.create(draft("Sal", 1)).await.expect("create");
    assert_eq!(store.items().await.len(), 1);
}
