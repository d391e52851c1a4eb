use super::context::{AttemptGuard, WorkflowShared};
use crate::domain::invoice::InvoiceDetail;
use crate::domain::payment::{
    Capability, CaptureMethod, ChargeRequest, ChargeResponse, ChargeResult, ChargeStatus,
    PaymentSelection, TokenMessage,
};
use crate::error::{Result, WorkflowError};
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Observable phase of a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    MethodChosen,
    CaptureInProgress,
    Submitting,
    Completed,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "Idle",
            Phase::MethodChosen => "MethodChosen",
            Phase::CaptureInProgress => "CaptureInProgress",
            Phase::Submitting => "Submitting",
            Phase::Completed => "Completed",
            Phase::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// How a capture step ended without an error.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum AttemptOutcome {
    Completed(ChargeResult),
    Cancelled,
}

enum CaptureEvent {
    Token(TokenMessage),
    Dismissed,
}

/// Capture-surface side of the token channel for one attempt.
///
/// Dropping it without sending counts as a dismissal.
#[derive(Debug)]
pub struct TokenSender {
    position: usize,
    sender: oneshot::Sender<CaptureEvent>,
}

impl fmt::Debug for CaptureEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureEvent::Token(_) => f.write_str("Token(..)"),
            CaptureEvent::Dismissed => f.write_str("Dismissed"),
        }
    }
}

impl TokenSender {
    /// Invoice position this sender belongs to.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Delivers a captured token.
    pub fn send(self, token: impl Into<String>) {
        self.deliver(CaptureEvent::Token(TokenMessage {
            token: Some(token.into()),
        }));
    }

    /// Forwards the raw `{"token": "..."}` message posted by the web form.
    pub fn send_json(self, raw: &str) {
        let message = TokenMessage::from_json(raw).unwrap_or(TokenMessage { token: None });
        self.deliver(CaptureEvent::Token(message));
    }

    /// Reports that the capture page was closed without a token.
    pub fn dismiss(self) {
        self.deliver(CaptureEvent::Dismissed);
    }

    fn deliver(self, event: CaptureEvent) {
        if self.sender.send(event).is_err() {
            debug!(
                position = self.position,
                "capture event arrived after the attempt ended"
            );
        }
    }
}

enum State {
    Idle,
    MethodChosen {
        detail: InvoiceDetail,
        guard: AttemptGuard,
    },
    CaptureInProgress {
        selection: PaymentSelection,
        detail: InvoiceDetail,
        guard: AttemptGuard,
        events: Option<oneshot::Receiver<CaptureEvent>>,
    },
    Submitting {
        selection: PaymentSelection,
    },
    Completed {
        result: ChargeResult,
    },
}

impl State {
    fn phase(&self) -> Phase {
        match self {
            State::Idle => Phase::Idle,
            State::MethodChosen { .. } => Phase::MethodChosen,
            State::CaptureInProgress { .. } => Phase::CaptureInProgress,
            State::Submitting { .. } => Phase::Submitting,
            State::Completed { .. } => Phase::Completed,
        }
    }

    fn position(&self) -> Option<usize> {
        match self {
            State::Idle => None,
            State::MethodChosen { detail, .. } => Some(detail.position),
            State::CaptureInProgress { detail, .. } => Some(detail.position),
            State::Submitting { selection } => Some(selection.position),
            State::Completed { result } => Some(result.position),
        }
    }
}

/// Drives one invoice at a time from method selection to a charge result.
///
/// ```text
/// Idle -> MethodChosen -> CaptureInProgress -> Submitting -> Completed
///                                                        \-> Failed -> Idle
/// ```
///
/// Every error returns the coordinator to `Idle` and releases the invoice
/// position, so a new attempt can start right away. The invoice itself is
/// only ever changed by the registry, when it receives a succeeded result.
pub struct PaymentCoordinator {
    shared: Arc<WorkflowShared>,
    state: State,
}

impl PaymentCoordinator {
    pub(crate) fn new(shared: Arc<WorkflowShared>) -> Self {
        Self {
            shared,
            state: State::Idle,
        }
    }

    /// Current phase of the attempt.
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// Invoice position of the current or last completed attempt.
    pub fn position(&self) -> Option<usize> {
        self.state.position()
    }

    /// The selection being captured, once a method has been picked.
    pub fn selection(&self) -> Option<&PaymentSelection> {
        match &self.state {
            State::CaptureInProgress { selection, .. } | State::Submitting { selection } => {
                Some(selection)
            }
            _ => None,
        }
    }

    /// Result of the last completed attempt, until a new one starts.
    pub fn last_result(&self) -> Option<&ChargeResult> {
        match &self.state {
            State::Completed { result } => Some(result),
            _ => None,
        }
    }

    /// Starts an attempt for the invoice at `position` and returns the
    /// capture methods to offer.
    pub async fn on_pay_requested(&mut self, position: usize) -> Result<&'static [CaptureMethod]> {
        if !matches!(self.state, State::Idle | State::Completed { .. }) {
            return Err(WorkflowError::InvalidTransition {
                from: self.phase(),
                event: "request payment",
            });
        }
        self.state = State::Idle;

        // Claim first: a released position has had its result applied.
        let guard = match self.shared.claim(position) {
            Ok(guard) => guard,
            Err(e) => return Err(self.fail(e)),
        };
        let invoice = match self.shared.registry.select_invoice(position).await {
            Ok(invoice) => invoice,
            Err(e) => return Err(self.fail(e)),
        };
        if invoice.is_paid() {
            return Err(self.fail(WorkflowError::AlreadyPaid { position }));
        }

        self.transition(State::MethodChosen {
            detail: invoice.detail(),
            guard,
        });
        Ok(&CaptureMethod::ALL)
    }

    /// Routes the attempt to the capture step for `method`.
    ///
    /// For manual entry the capture page is opened with the invoice snapshot
    /// and the returned sender is handed to the capture surface.
    pub fn choose_method(&mut self, method: CaptureMethod) -> Result<TokenSender> {
        let (detail, guard) = match std::mem::replace(&mut self.state, State::Idle) {
            State::MethodChosen { detail, guard } => (detail, guard),
            other => {
                let from = other.phase();
                self.state = other;
                return Err(WorkflowError::InvalidTransition {
                    from,
                    event: "choose a capture method",
                });
            }
        };

        if method.capability() == Capability::Unsupported {
            info!(position = detail.position, %method, "capture method unsupported on this device");
            drop(guard);
            return Err(self.fail_from(Phase::MethodChosen, WorkflowError::CapabilityUnsupported));
        }

        let position = detail.position;
        let selection = PaymentSelection {
            position,
            invoice_no: detail.invoice_no.clone(),
            method,
        };
        let (sender, receiver) = oneshot::channel();
        self.shared.collaborators.capture_page.open(detail.clone());
        self.transition_from(
            Phase::MethodChosen,
            State::CaptureInProgress {
                selection,
                detail,
                guard,
                events: Some(receiver),
            },
        );
        Ok(TokenSender { position, sender })
    }

    /// Waits for the capture surface to deliver a token or be dismissed.
    pub async fn await_token(&mut self) -> Result<AttemptOutcome> {
        let events = match &mut self.state {
            State::CaptureInProgress { events, .. } => events.take(),
            _ => None,
        };
        let Some(events) = events else {
            return Err(WorkflowError::InvalidTransition {
                from: self.phase(),
                event: "wait for a token",
            });
        };

        match events.await {
            Ok(CaptureEvent::Token(message)) => {
                self.submit(message).await.map(AttemptOutcome::Completed)
            }
            Ok(CaptureEvent::Dismissed) | Err(_) => {
                self.cancel();
                Ok(AttemptOutcome::Cancelled)
            }
        }
    }

    /// Submits a charge for a token that arrived on the token channel.
    pub async fn on_token_received(&mut self, token: impl Into<String>) -> Result<ChargeResult> {
        self.submit(TokenMessage {
            token: Some(token.into()),
        })
        .await
    }

    /// Drops the in-flight attempt without side effects.
    pub fn cancel(&mut self) {
        let from = self.phase();
        if from == Phase::Idle {
            return;
        }
        if let Some(position) = self.position() {
            info!(position, %from, "payment attempt cancelled");
        }
        self.transition(State::Idle);
    }

    async fn submit(&mut self, message: TokenMessage) -> Result<ChargeResult> {
        let (selection, detail, guard) = match std::mem::replace(&mut self.state, State::Idle) {
            State::CaptureInProgress {
                selection,
                detail,
                guard,
                ..
            } => (selection, detail, guard),
            other => {
                let from = other.phase();
                self.state = other;
                return Err(WorkflowError::InvalidTransition {
                    from,
                    event: "submit a token",
                });
            }
        };

        let request = match message.into_token().and_then(|token| {
            ChargeRequest::for_detail(
                &detail,
                &self.shared.config.currency,
                &self.shared.config.channel,
                token,
            )
        }) {
            Ok(request) => request,
            Err(e) => return Err(self.fail_from(Phase::CaptureInProgress, e)),
        };

        let position = selection.position;
        self.transition_from(Phase::CaptureInProgress, State::Submitting { selection });
        let response = match self.charge(&request).await {
            Ok(response) => response,
            Err(e) => return Err(self.fail(e)),
        };

        match response {
            ChargeResponse::Charge { id, status } => {
                let result = ChargeResult {
                    charge_id: id,
                    status: ChargeStatus::from_service(&status),
                    position,
                };
                // The registry releases the position once it has applied the result
                self.shared.publish(result.clone(), guard).await;
                if result.status != ChargeStatus::Succeeded {
                    warn!(position, charge_id = %result.charge_id, %status, "charge not successful");
                    return Err(self.fail(WorkflowError::ChargeDeclined { message: None }));
                }
                info!(position, charge_id = %result.charge_id, amount = request.amount, "charge succeeded");
                self.shared.collaborators.capture_page.close(position);
                self.shared
                    .collaborators
                    .notifier
                    .notify("Payment successfully paid");
                self.transition(State::Completed {
                    result: result.clone(),
                });
                Ok(result)
            }
            ChargeResponse::Error { message } => Err(self.fail(WorkflowError::ChargeDeclined {
                message: Some(message),
            })),
        }
    }

    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeResponse> {
        let collaborators = &self.shared.collaborators;
        let credential = collaborators.authenticator.authenticate().await?;
        tokio::time::timeout(
            self.shared.config.charge_timeout,
            collaborators.charge_service.create_charge(&credential, request),
        )
        .await
        .map_err(|_| WorkflowError::ChargeTimeout)?
    }

    fn transition(&mut self, next: State) {
        let from = self.phase();
        self.transition_from(from, next);
    }

    fn transition_from(&mut self, from: Phase, next: State) {
        let position = next.position().or_else(|| self.state.position());
        debug!(?position, %from, to = %next.phase(), "payment workflow transition");
        self.state = next;
    }

    fn fail(&mut self, error: WorkflowError) -> WorkflowError {
        let from = self.phase();
        self.fail_from(from, error)
    }

    /// Reports the error, passes through `Failed` and lands in `Idle`.
    fn fail_from(&mut self, from: Phase, error: WorkflowError) -> WorkflowError {
        warn!(%from, error = %error, "payment attempt failed");
        debug!(%from, to = %Phase::Failed, "payment workflow transition");
        self.shared
            .collaborators
            .notifier
            .notify(&error.user_message());
        self.state = State::Idle;
        debug!(from = %Phase::Failed, to = %Phase::Idle, "payment workflow transition");
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::context::{Collaborators, WorkflowContext};
    use crate::application::registry::InvoiceRegistry;
    use crate::config::WorkflowConfig;
    use crate::infrastructure::in_memory::{
        RecordingCapturePage, RecordingNotifier, StaticAuthenticator,
    };
    use crate::infrastructure::sandbox::SandboxChargeService;

    fn context() -> WorkflowContext {
        WorkflowContext::start(
            InvoiceRegistry::with_default_seed(),
            Collaborators {
                charge_service: Arc::new(SandboxChargeService::new()),
                authenticator: Arc::new(StaticAuthenticator::new("key")),
                capture_page: Arc::new(RecordingCapturePage::new()),
                notifier: Arc::new(RecordingNotifier::new()),
            },
            WorkflowConfig::default(),
        )
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::CaptureInProgress.to_string(), "CaptureInProgress");
        assert_eq!(Phase::Failed.to_string(), "Failed");
    }

    #[tokio::test]
    async fn test_token_after_coordinator_dropped_is_harmless() {
        let context = context();
        let mut coordinator = context.coordinator();
        coordinator.on_pay_requested(0).await.unwrap();
        let tokens = coordinator.choose_method(CaptureMethod::Manual).unwrap();

        drop(coordinator);
        assert!(context.in_flight().is_empty());
        tokens.send("tok_late");
        context.stop().await;
    }

    #[tokio::test]
    async fn test_direct_token_submission() {
        let context = context();
        let mut coordinator = context.coordinator();
        coordinator.on_pay_requested(1).await.unwrap();
        let _tokens = coordinator.choose_method(CaptureMethod::Manual).unwrap();

        let result = coordinator.on_token_received("tok_direct").await.unwrap();
        assert_eq!(result.position, 1);
        assert_eq!(coordinator.last_result(), Some(&result));
        assert_eq!(coordinator.position(), Some(1));
        context.stop().await;
    }
}
