use client_core::{NotificationContext, StatementSurface};
use tracing::debug;

/// Terminal rendering of the bound-surface contract: values and the
/// confirmation notice go to stdout, alerts to stderr, enablement flips
/// to the debug log (a terminal has no buttons to gray out).
pub struct TerminalSurface;

impl StatementSurface for TerminalSurface {
    fn display_value(&self, rendered: &str) {
        println!("Current PnL statement: {rendered}");
    }

    fn set_submit_enabled(&self, enabled: bool) {
        debug!("submit control {}", if enabled { "armed" } else { "disarmed" });
    }

    fn set_form_enabled(&self, enabled: bool) {
        debug!("form {}", if enabled { "enabled" } else { "disabled" });
    }

    fn show_notification(&self, context: &NotificationContext) {
        println!(
            "✔ {} called add_statement on {} at {}",
            context.account_id,
            context.contract_account,
            context.shown_at.format("%H:%M:%S UTC"),
        );
        println!("  signer:   {}", context.signer_explorer_url());
        println!("  contract: {}", context.contract_explorer_url());
    }

    fn hide_notification(&self) {
        println!("(confirmation notice dismissed)");
    }

    fn alert(&self, message: &str) {
        eprintln!("{message}");
    }
}
