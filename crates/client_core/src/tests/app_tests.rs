use super::*;
use std::sync::Mutex as StdMutex;

use shared::domain::{Aggregates, Item};

use crate::{
    orchestrator::{InputForm, IntentOutcome},
    status::Severity,
};

#[derive(Default)]
struct RecordingSink {
    renders: StdMutex<Vec<Vec<String>>>,
    statuses: StdMutex<Vec<Status>>,
}

impl RenderSink for RecordingSink {
    fn render(&self, sorted_items: &[Item], _aggregates: Aggregates) {
        self.renders
            .lock()
            .expect("renders")
            .push(sorted_items.iter().map(|item| item.name.clone()).collect());
    }

    fn render_status(&self, status: &Status) {
        self.statuses.lock().expect("statuses").push(status.clone());
    }
}

impl RecordingSink {
    fn statuses(&self) -> Vec<Status> {
        self.statuses.lock().expect("statuses").clone()
    }

    fn last_render(&self) -> Option<Vec<String>> {
        self.renders.lock().expect("renders").last().cloned()
    }
}

async fn submit(orchestrator: &ListOrchestrator, name: &str, quantity: &str) -> IntentOutcome {
    orchestrator
        .set_form(InputForm {
            name: name.to_string(),
            quantity: quantity.to_string(),
        })
        .await;
    orchestrator.add_item().await
}

async fn wait_for<F: Fn() -> bool>(check: F) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn local_start_seeds_mock_items() {
    let sink = Arc::new(RecordingSink::default());
    let list = start(&ListConfig::default(), Arc::clone(&sink) as Arc<dyn RenderSink>)
        .await
        .expect("start");

    assert_eq!(list.principal, PrincipalId::local());
    assert_eq!(list.collection, "default-app-id/items");
    assert_eq!(list.orchestrator.mode(), BackendMode::Local);
    assert_eq!(sink.statuses()[0], Status::info(INITIALIZING_MESSAGE));

    wait_for(|| sink.last_render().is_some()).await;
    assert_eq!(
        sink.last_render(),
        Some(vec![
            "Ovos".to_string(),
            "Pão de Forma".to_string(),
            "Leite".to_string()
        ])
    );
    list.shutdown();
}

#[tokio::test]
async fn local_start_without_mock_data_is_empty() {
    let sink = Arc::new(RecordingSink::default());
    let config = ListConfig {
        seed_mock_data: false,
        ..ListConfig::default()
    };
    let list = start(&config, Arc::clone(&sink) as Arc<dyn RenderSink>)
        .await
        .expect("start");

    wait_for(|| sink.last_render().is_some()).await;
    assert_eq!(sink.last_render(), Some(Vec::new()));

    let outcome = submit(&list.orchestrator, "Café", "1").await;
    assert_eq!(outcome, IntentOutcome::Settled);
    wait_for(|| sink.last_render() == Some(vec!["Café".to_string()])).await;
    list.shutdown();
}

#[tokio::test]
async fn unreachable_remote_reports_initialization_error() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let sink = Arc::new(RecordingSink::default());
    let config = ListConfig {
        backend: BackendConfig::Remote {
            server_url: format!("http://{addr}"),
            auth_token: None,
        },
        ..ListConfig::default()
    };
    let err = start(&config, Arc::clone(&sink) as Arc<dyn RenderSink>)
        .await
        .err()
        .expect("start must fail");

    assert!(matches!(err, StoreError::Auth(_)));
    let last = sink.statuses().last().cloned().expect("status");
    assert_eq!(last.severity, Severity::Error);
    assert!(last.text.starts_with("Initialization error:"));
    assert!(sink.last_render().is_none());
}

#[tokio::test]
async fn start_with_store_marks_session_ready() {
    let sink = Arc::new(RecordingSink::default());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(LocalStore::new(Arc::clone(&clock)));
    let list = start_with_store(
        PrincipalId::local(),
        "default-app-id/items".to_string(),
        store,
        Arc::clone(&sink) as Arc<dyn RenderSink>,
        clock,
    )
    .await
    .expect("start");

    let outcome = submit(&list.orchestrator, "Sal", "1").await;
    assert_eq!(outcome, IntentOutcome::Settled);
    list.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn confirmations_win_over_the_pumped_snapshot() {
    for _ in 0..50 {
        let sink = Arc::new(RecordingSink::default());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = Arc::new(LocalStore::new(Arc::clone(&clock)));
        let list = start_with_store(
            PrincipalId::local(),
            "default-app-id/items".to_string(),
            store,
            Arc::clone(&sink) as Arc<dyn RenderSink>,
            clock,
        )
        .await
        .expect("start");
        let orchestrator = Arc::clone(&list.orchestrator);

        assert_eq!(submit(&orchestrator, "Arroz", "2").await, IntentOutcome::Settled);
        wait_for(|| sink.last_render().is_some_and(|names| names.len() == 1)).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert_eq!(
            orchestrator.current_status().await,
            Status::info("Item 'Arroz' added successfully!")
        );

        let item = orchestrator.items().await.remove(0);
        assert_eq!(
            orchestrator.remove_item(&item.id, &item.name).await,
            IntentOutcome::Settled
        );
        wait_for(|| sink.last_render().is_some_and(|names| names.is_empty())).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert_eq!(
            orchestrator.current_status().await,
            Status::info("Item 'Arroz' deleted.")
        );
        list.shutdown();
    }
}
