use std::io::Write;

use client_core::{BackendMode, InputForm, RenderSink, Severity, Status};
use shared::domain::{Aggregates, Item, PrincipalId};

/// Writes the list and the status line to stdout.
pub struct TerminalSink;

pub fn format_item(position: usize, item: &Item) -> String {
    let marker = if item.is_purchased { "x" } else { " " };
    let price = if item.price > 0.0 {
        format!("Price: {:.2}", item.price)
    } else {
        "Price: N/A".to_string()
    };
    format!(
        "{position:>3}. [{marker}] {} (Qty: {}) {price}",
        item.name, item.quantity
    )
}

pub fn format_status(status: &Status) -> String {
    let label = match status.severity {
        Severity::Info => "info",
        Severity::Warning => "warn",
        Severity::Error => "error",
    };
    format!("[{label}] {}", status.text)
}

pub fn format_banner(principal: &PrincipalId, collection: &str, mode: BackendMode) -> String {
    let mode = match mode {
        BackendMode::Local => "local",
        BackendMode::Remote => "remote",
    };
    format!("UID: {principal}\nCollection: {collection} ({mode})")
}

/// Input prompt; shows how many toggles and deletes are still waiting on the
/// backend.
pub fn format_prompt(pending: usize) -> String {
    match pending {
        0 => "> ".to_string(),
        n => format!("[{n} pending] > "),
    }
}

pub fn format_kept_form(form: &InputForm) -> String {
    format!(
        "Kept input: name '{}', quantity '{}'. Type 'add' to retry it.",
        form.name, form.quantity
    )
}

impl RenderSink for TerminalSink {
    fn render(&self, sorted_items: &[Item], aggregates: Aggregates) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out);
        for (idx, item) in sorted_items.iter().enumerate() {
            let _ = writeln!(out, "{}", format_item(idx + 1, item));
        }
        let _ = writeln!(
            out,
            "Total: {} | Purchased: {}",
            aggregates.total, aggregates.purchased_count
        );
    }

    fn render_status(&self, status: &Status) {
        let _ = writeln!(std::io::stdout().lock(), "{}", format_status(status));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::ItemId;

    fn item(price: f64, purchased: bool) -> Item {
        Item {
            id: ItemId::Local(1),
            name: "Leite".to_string(),
            quantity: 2,
            price,
            is_purchased: purchased,
            created_at: 0,
            owner_id: PrincipalId::local(),
        }
    }

    #[test]
    fn zero_price_shows_not_available() {
        assert_eq!(
            format_item(1, &item(0.0, true)),
            "  1. [x] Leite (Qty: 2) Price: N/A"
        );
        assert_eq!(
            format_item(12, &item(4.5, false)),
            " 12. [ ] Leite (Qty: 2) Price: 4.50"
        );
    }

    #[test]
    fn banner_names_principal_and_collection() {
        assert_eq!(
            format_banner(&PrincipalId::local(), "default-app-id/items", BackendMode::Local),
            format!("UID: {}\nCollection: default-app-id/items (local)", PrincipalId::local())
        );
    }

    #[test]
    fn prompt_shows_pending_requests() {
        assert_eq!(format_prompt(0), "> ");
        assert_eq!(format_prompt(2), "[2 pending] > ");
    }

    #[test]
    fn kept_form_echoes_raw_input() {
        let form = InputForm {
            name: "Arroz".to_string(),
            quantity: "dois".to_string(),
        };
        assert_eq!(
            format_kept_form(&form),
            "Kept input: name 'Arroz', quantity 'dois'. Type 'add' to retry it."
        );
    }

    #[test]
    fn status_carries_severity_label() {
        assert_eq!(format_status(&Status::warning("careful")), "[warn] careful");
        assert_eq!(format_status(&Status::error("boom")), "[error] boom");
    }
}
