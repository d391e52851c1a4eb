use super::coordinator::PaymentCoordinator;
use super::registry::InvoiceRegistry;
use crate::config::WorkflowConfig;
use crate::domain::payment::ChargeResult;
use crate::domain::ports::{AuthenticatorRef, CapturePageRef, ChargeServiceRef, NotifierRef};
use crate::error::{Result, WorkflowError};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// External collaborators the coordinator talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub charge_service: ChargeServiceRef,
    pub authenticator: AuthenticatorRef,
    pub capture_page: CapturePageRef,
    pub notifier: NotifierRef,
}

/// A published result together with the claim on its invoice position.
struct Settlement {
    result: ChargeResult,
    guard: AttemptGuard,
}

/// State shared by the context and every coordinator it hands out.
pub(crate) struct WorkflowShared {
    pub(crate) config: WorkflowConfig,
    pub(crate) registry: InvoiceRegistry,
    pub(crate) collaborators: Collaborators,
    results: Mutex<Option<mpsc::Sender<Settlement>>>,
    observers: Mutex<Option<broadcast::Sender<ChargeResult>>>,
    in_flight: Mutex<HashSet<usize>>,
}

impl WorkflowShared {
    /// Publishes a result to the registry, in publish order.
    ///
    /// The position stays claimed until the registry has applied the result.
    /// Waits for room when the channel is full; nothing is dropped.
    pub(crate) async fn publish(&self, result: ChargeResult, guard: AttemptGuard) {
        let sender = self
            .results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(sender) = sender else {
            error!(
                position = result.position,
                charge_id = %result.charge_id,
                "workflow context stopped, charge result not applied"
            );
            return;
        };
        if let Err(mpsc::error::SendError(settlement)) =
            sender.send(Settlement { result, guard }).await
        {
            error!(
                position = settlement.result.position,
                charge_id = %settlement.result.charge_id,
                "registry subscriber gone, charge result not applied"
            );
        }
    }

    /// Reserves the invoice position for one attempt.
    pub(crate) fn claim(self: &Arc<Self>, position: usize) -> Result<AttemptGuard> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(position) {
            return Err(WorkflowError::AttemptInProgress { position });
        }
        Ok(AttemptGuard {
            shared: Arc::clone(self),
            position,
        })
    }
}

/// Holds an invoice position for the lifetime of one attempt.
pub(crate) struct AttemptGuard {
    shared: Arc<WorkflowShared>,
    position: usize,
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        self.shared
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.position);
        debug!(position = self.position, "invoice position released");
    }
}

/// Process-wide owner of the result channel and the registry subscriber.
///
/// `start` spawns the task that applies results to the registry; `stop`
/// closes the channel and waits until every published result was applied.
/// Extra observers get each result after the registry has applied it.
pub struct WorkflowContext {
    shared: Arc<WorkflowShared>,
    subscriber: JoinHandle<()>,
}

impl WorkflowContext {
    /// Starts the context. Must be called from within a Tokio runtime.
    pub fn start(
        registry: InvoiceRegistry,
        collaborators: Collaborators,
        config: WorkflowConfig,
    ) -> Self {
        let capacity = config.result_capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        let (observers, _) = broadcast::channel(capacity);
        let subscriber = tokio::spawn(apply_results(
            registry.clone(),
            receiver,
            observers.clone(),
        ));
        let shared = Arc::new(WorkflowShared {
            config,
            registry,
            collaborators,
            results: Mutex::new(Some(sender)),
            observers: Mutex::new(Some(observers)),
            in_flight: Mutex::new(HashSet::new()),
        });
        debug!("workflow context started");
        Self { shared, subscriber }
    }

    /// The registry fed by this context.
    pub fn registry(&self) -> &InvoiceRegistry {
        &self.shared.registry
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.shared.config
    }

    /// A fresh coordinator in the `Idle` state.
    pub fn coordinator(&self) -> PaymentCoordinator {
        PaymentCoordinator::new(Arc::clone(&self.shared))
    }

    /// Adds an observer of applied results.
    ///
    /// Observers that fall behind by more than `result_capacity` results
    /// see `Lagged`; the registry itself never misses a result. Returns
    /// `None` once the context is stopping.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<ChargeResult>> {
        self.shared
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(broadcast::Sender::subscribe)
    }

    /// Positions with an attempt currently in flight.
    pub fn in_flight(&self) -> Vec<usize> {
        let in_flight = self
            .shared
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut positions: Vec<usize> = in_flight.iter().copied().collect();
        positions.sort_unstable();
        positions
    }

    /// Closes the result channel and waits for the registry subscriber to
    /// drain it.
    pub async fn stop(self) {
        let sender = self
            .shared
            .results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(sender);
        let observers = self
            .shared
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(observers);
        if let Err(e) = self.subscriber.await {
            error!("result subscriber terminated abnormally: {e}");
        }
        debug!("workflow context stopped");
    }
}

async fn apply_results(
    registry: InvoiceRegistry,
    mut receiver: mpsc::Receiver<Settlement>,
    observers: broadcast::Sender<ChargeResult>,
) {
    while let Some(Settlement { result, guard }) = receiver.recv().await {
        registry.apply_result(&result).await;
        drop(guard);
        if observers.send(result).is_err() {
            debug!("no observers for applied charge result");
        }
    }
    debug!("result subscriber finished");
}
