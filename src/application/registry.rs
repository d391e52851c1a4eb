use crate::domain::invoice::{Invoice, InvoiceSeed, default_seed};
use crate::domain::payment::{ChargeResult, ChargeStatus};
use crate::error::{Result, WorkflowError};
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tracing::{debug, info, warn};

/// What `apply_result` did with a charge result.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ApplyOutcome {
    Applied,
    NotSucceeded,
    OutOfRange,
    AlreadyPaid,
}

/// Owns the ordered invoice collection.
///
/// Cloning shares the underlying collection. Reads return snapshots; the only
/// mutation is `apply_result`, which the workflow context invokes from its
/// single result subscriber.
#[derive(Clone)]
pub struct InvoiceRegistry {
    invoices: Arc<RwLock<Vec<Invoice>>>,
    refresh: Arc<watch::Sender<u64>>,
}

impl InvoiceRegistry {
    /// Builds a registry, assigning positions in seed order.
    pub fn new(seeds: Vec<InvoiceSeed>) -> Self {
        let invoices = seeds
            .into_iter()
            .enumerate()
            .map(|(position, seed)| seed.into_invoice(position))
            .collect();
        let (refresh, _) = watch::channel(0);
        Self {
            invoices: Arc::new(RwLock::new(invoices)),
            refresh: Arc::new(refresh),
        }
    }

    /// Builds a registry from the built-in invoice list.
    pub fn with_default_seed() -> Self {
        Self::new(default_seed())
    }

    /// Snapshot of all invoices in display order.
    pub async fn list_invoices(&self) -> Vec<Invoice> {
        self.invoices.read().await.clone()
    }

    /// Number of invoices held.
    pub async fn len(&self) -> usize {
        self.invoices.read().await.len()
    }

    /// Whether the registry holds no invoices.
    pub async fn is_empty(&self) -> bool {
        self.invoices.read().await.is_empty()
    }

    /// Copy of the invoice at `position`, or `OutOfRange`.
    pub async fn select_invoice(&self, position: usize) -> Result<Invoice> {
        let invoices = self.invoices.read().await;
        invoices
            .get(position)
            .cloned()
            .ok_or(WorkflowError::OutOfRange {
                position,
                len: invoices.len(),
            })
    }

    /// Applies a charge result to the invoice at `result.position`.
    ///
    /// Only a succeeded result for an unpaid invoice mutates state; anything
    /// else is logged and ignored, so re-applying a result is harmless.
    pub async fn apply_result(&self, result: &ChargeResult) -> ApplyOutcome {
        if result.status != ChargeStatus::Succeeded {
            info!(
                position = result.position,
                charge_id = %result.charge_id,
                status = ?result.status,
                "ignoring unsuccessful charge result"
            );
            return ApplyOutcome::NotSucceeded;
        }

        let mut invoices = self.invoices.write().await;
        let len = invoices.len();
        let Some(invoice) = invoices.get_mut(result.position) else {
            warn!(
                position = result.position,
                len, "ignoring charge result for unknown invoice position"
            );
            return ApplyOutcome::OutOfRange;
        };

        if !invoice.mark_paid(&result.charge_id) {
            debug!(
                position = result.position,
                charge_id = %result.charge_id,
                "invoice already paid, result ignored"
            );
            return ApplyOutcome::AlreadyPaid;
        }

        info!(
            position = result.position,
            invoice_no = %invoice.invoice_no,
            charge_id = %result.charge_id,
            "invoice marked paid"
        );
        drop(invoices);
        self.refresh.send_modify(|revision| *revision += 1);
        ApplyOutcome::Applied
    }

    /// Receives a new revision number each time the display should refresh.
    pub fn subscribe_refresh(&self) -> watch::Receiver<u64> {
        self.refresh.subscribe()
    }
}
