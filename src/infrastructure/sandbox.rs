use crate::domain::payment::{BearerCredential, ChargeRequest, ChargeResponse};
use crate::domain::ports::ChargeService;
use crate::error::{Result, WorkflowError};
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

/// In-process stand-in for the remote charge API.
///
/// Queued replies are served first, in order. Otherwise tokens in the
/// decline list get `{"message": "card_declined"}` and everything else is
/// approved with a sequential charge id (`ch_1`, `ch_2`, ...).
#[derive(Default, Clone)]
pub struct SandboxChargeService {
    inner: Arc<SandboxInner>,
}

#[derive(Default)]
struct SandboxInner {
    scripted: Mutex<VecDeque<Result<ChargeResponse>>>,
    declined_tokens: Mutex<HashSet<String>>,
    requests: Mutex<Vec<RecordedCharge>>,
    next_id: AtomicU64,
    latency: Mutex<Option<Duration>>,
}

/// A charge as seen by the sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCharge {
    pub authorization: String,
    pub request: ChargeRequest,
}

impl SandboxChargeService {
    /// A sandbox that approves every charge.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declines every charge made with `token`.
    pub fn decline_token(&self, token: impl Into<String>) -> &Self {
        self.inner
            .declined_tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.into());
        self
    }

    /// Queues a reply for the next charge.
    pub fn push_response(&self, response: ChargeResponse) -> &Self {
        self.push(Ok(response))
    }

    /// Queues a transport failure for the next charge.
    pub fn push_failure(&self, reason: impl Into<String>) -> &Self {
        self.push(Err(WorkflowError::ChargeService(reason.into())))
    }

    /// Delays every reply, to exercise timeouts.
    pub fn with_latency(self, latency: Duration) -> Self {
        *self
            .inner
            .latency
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(latency);
        self
    }

    /// Every charge received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedCharge> {
        self.inner
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, reply: Result<ChargeResponse>) -> &Self {
        self.inner
            .scripted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
        self
    }

    fn default_reply(&self, request: &ChargeRequest) -> ChargeResponse {
        let declined = self
            .inner
            .declined_tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&request.token);
        if declined {
            return ChargeResponse::Error {
                message: "card_declined".to_string(),
            };
        }
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        ChargeResponse::Charge {
            id: format!("ch_{id}"),
            status: "succeeded".to_string(),
        }
    }
}

#[async_trait]
impl ChargeService for SandboxChargeService {
    async fn create_charge(
        &self,
        credential: &BearerCredential,
        request: &ChargeRequest,
    ) -> Result<ChargeResponse> {
        let latency = *self
            .inner
            .latency
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        self.inner
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCharge {
                authorization: credential.header_value(),
                request: request.clone(),
            });

        let scripted = self
            .inner
            .scripted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let reply = match scripted {
            Some(reply) => reply,
            None => Ok(self.default_reply(request)),
        };
        debug!(amount = request.amount, currency = %request.currency, ?reply, "sandbox charge");
        reply
    }
}
