use crate::domain::invoice::InvoiceDetail;
use crate::domain::ports::{CapturePage, Notifier};
use tracing::info;

/// Writes operator notifications to the log.
#[derive(Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        info!(target: "pos_invoices::notice", "{message}");
    }
}

/// Logs capture page navigation for headless runs.
#[derive(Default, Clone, Copy)]
pub struct LogCapturePage;

impl CapturePage for LogCapturePage {
    fn open(&self, detail: InvoiceDetail) {
        info!(
            position = detail.position,
            invoice_no = %detail.invoice_no,
            customer = %detail.customer_name,
            amount = %detail.amount.value(),
            "opening card entry page"
        );
    }

    fn close(&self, position: usize) {
        info!(position, "closing card entry page");
    }
}
