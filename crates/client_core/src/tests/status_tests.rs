use super::*;
use shared::domain::{ItemId, PrincipalId};

fn item(id: i64, purchased: bool) -> Item {
    Item {
        id: ItemId::Local(id),
        name: format!("item-{id}"),
        quantity: 1,
        price: 0.0,
        is_purchased: purchased,
        created_at: id,
        owner_id: PrincipalId::local(),
    }
}

#[test]
fn remote_summary_counts_purchases() {
    let status = derive_status(&[item(1, true), item(2, false)], None, BackendMode::Remote);
    assert_eq!(status, Status::info("List OK: 1 of 2 items purchased."));
}

#[test]
fn remote_empty_list_is_a_warning() {
    let status = derive_status(&[], None, BackendMode::Remote);
    assert_eq!(status.severity, Severity::Warning);
    assert_eq!(status.text, EMPTY_LIST_MESSAGE);
}

#[test]
fn local_mode_reports_summary_even_when_empty() {
    let status = derive_status(&[], None, BackendMode::Local);
    assert_eq!(status, Status::info("Local mode: 0 of 0 items purchased."));

    let status = derive_status(&[item(1, true), item(2, false), item(3, true)], None, BackendMode::Local);
    assert_eq!(status.text, "Local mode: 2 of 3 items purchased.");
}

#[test]
fn transient_message_wins_over_summary() {
    let status = derive_status(&[], Some("Adding item..."), BackendMode::Remote);
    assert_eq!(status, Status::info("Adding item..."));

    let status = derive_status(&[item(1, false)], Some("Deleting 'x'..."), BackendMode::Local);
    assert_eq!(status.text, "Deleting 'x'...");
}

#[test]
fn connection_error_overrides_everything() {
    let status = derive_status_with_connection(
        &[item(1, false)],
        Some("Adding item..."),
        BackendMode::Remote,
        Some("socket closed"),
    );
    assert_eq!(status.severity, Severity::Error);
    assert_eq!(status.text, "Fatal connection error: socket closed");
}

#[test]
fn without_connection_error_falls_back_to_summary() {
    let status = derive_status_with_connection(&[item(1, true)], None, BackendMode::Remote, None);
    assert_eq!(status.text, "List OK: 1 of 1 items purchased.");
}

#[test]
fn intent_messages_quote_the_item_name() {
    assert_eq!(adding_message(), "Adding item...");
    assert_eq!(added_message("Arroz"), "Item 'Arroz' added successfully!");
    assert_eq!(deleting_message("Leite"), "Deleting 'Leite'...");
    assert_eq!(deleted_message("Leite"), "Item 'Leite' deleted.");
}
